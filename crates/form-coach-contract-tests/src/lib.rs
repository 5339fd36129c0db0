//! # form-coach-contract-tests
//!
//! Test-only crate validating the frozen analysis wire contract under
//! `contracts/` against its fixtures. See `tests/contract_validation.rs`.
