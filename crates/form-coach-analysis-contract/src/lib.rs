#![warn(missing_docs)]
//! # form-coach-analysis-contract
//!
//! ## Purpose
//! Defines the analysis service response schema and client-side decoding
//! helpers.
//!
//! ## Responsibilities
//! - Parse per-frame posture analysis payloads.
//! - Decode base64 still frames with per-frame degradation.
//! - Ignore unknown response fields for forward compatibility.
//!
//! ## Data flow
//! Raw response bytes -> [`parse_analysis_response`] -> [`decode_still`] per
//! frame -> results rendering.
//!
//! ## Ownership and lifetimes
//! Parsed values are owned structs to avoid borrowing from transient network
//! buffers.
//!
//! ## Error model
//! Invalid JSON returns [`AnalysisContractError`]. A still frame that fails
//! base64 decoding is not an error; it degrades to
//! [`StillFrame::Unavailable`] so one bad frame never hides the rest of the
//! analysis.
//!
//! ## Security and privacy notes
//! This crate processes only model outputs. Frame bytes are decoded in memory
//! and never logged.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parsed analysis response from the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Analyzed moments in presentation order.
    pub analysis: Vec<AnalysisItem>,
}

/// One analyzed moment of the submitted video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisItem {
    /// Base64-encoded still frame for this moment.
    pub image_base64: String,
    /// Optional `MM:SS` position of the moment in the source video.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Posture findings for this moment.
    pub posture: Posture,
}

/// Posture findings attached to one analyzed moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posture {
    /// Detected form errors in severity order.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Corrective suggestions in presentation order.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Decoded still frame, or its degraded stand-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StillFrame {
    /// Decoded image bytes ready for display.
    Image(Vec<u8>),
    /// The frame could not be decoded; render a placeholder.
    Unavailable,
}

/// Parses raw response bytes into a validated analysis response.
///
/// Unknown fields are ignored so newer service deployments can extend the
/// payload without breaking older clients. A missing `analysis` list is a
/// contract violation, not an empty result.
///
/// # Errors
/// Returns [`AnalysisContractError::Decode`] for invalid JSON or a payload
/// that does not carry the `analysis` list.
pub fn parse_analysis_response(raw: &[u8]) -> Result<AnalysisResponse, AnalysisContractError> {
    serde_json::from_slice(raw).map_err(AnalysisContractError::Decode)
}

/// Decodes one base64 still frame.
///
/// Decoding never fails outward: invalid base64 and empty frames degrade to
/// [`StillFrame::Unavailable`] so the surrounding analysis still renders.
pub fn decode_still(image_base64: &str) -> StillFrame {
    match STANDARD.decode(image_base64.trim()) {
        Ok(bytes) if !bytes.is_empty() => StillFrame::Image(bytes),
        Ok(_) | Err(_) => StillFrame::Unavailable,
    }
}

/// Analysis contract errors.
#[derive(Debug, Error)]
pub enum AnalysisContractError {
    /// JSON decode failure.
    #[error("analysis decode failure: {0}")]
    Decode(#[from] serde_json::Error),
}
