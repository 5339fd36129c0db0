//! # form-coach-benchmarks
//!
//! Test-only crate holding the parse-and-render latency smoke test. See
//! `tests/nfr_smoke.rs`.
