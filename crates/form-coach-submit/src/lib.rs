#![warn(missing_docs)]
//! # form-coach-submit
//!
//! ## Purpose
//! Implements the video submission protocol and report export for
//! `form-coach`.
//!
//! ## Responsibilities
//! - Materialize the selected video source into a multipart request.
//! - Execute exactly one POST per submission attempt, with no automatic
//!   retries.
//! - Enforce at most one submission and one report download in flight.
//! - Categorize failures for user-facing messaging.
//! - Persist downloaded reports atomically.
//!
//! ## Data flow
//! [`form_coach_core::VideoSource`] -> [`SubmissionClient::submit`] ->
//! [`AnalysisTransport`] POST -> parsed
//! [`form_coach_analysis_contract::AnalysisResponse`]. Reports flow through
//! [`ReportDownloader`] to a file on disk.
//!
//! ## Ownership and lifetimes
//! Requests own their payload bytes, copied out of the capture session or
//! read from disk, so a session reset during a slow upload cannot mutate an
//! in-flight request.
//!
//! ## Error model
//! Every failure is a [`SubmitError`] variant. The submission protocol never
//! retries on its own; [`classify_submission_error`] tells callers which
//! failures are worth retrying by hand.
//!
//! ## Security and privacy notes
//! Video bytes are never logged. Log lines carry filenames, byte counts, and
//! idempotency keys only.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use form_coach_analysis_contract::{AnalysisContractError, AnalysisResponse, parse_analysis_response};
use form_coach_core::{CoreError, ResolvedVideo, VideoSource};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

/// Multipart field name the analysis service reads the video from.
pub const VIDEO_FIELD_NAME: &str = "file";

/// Header carrying the client-computed idempotency key.
pub const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

/// Filename used for persisted analysis reports.
pub const REPORT_FILENAME: &str = "analysis_report.json";

/// Fully prepared multipart submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    /// Multipart field name, always [`VIDEO_FIELD_NAME`].
    pub field_name: &'static str,
    /// Filename reported to the service (`video.webm` or `video.mp4`).
    pub filename: String,
    /// MIME type of the payload.
    pub mime_type: String,
    /// Raw video bytes.
    pub bytes: Vec<u8>,
    /// Content digest sent as [`IDEMPOTENCY_HEADER`].
    pub idempotency_key: String,
}

/// Raw reply delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// Abstract wire transport used by submission and report download.
///
/// Implementations report I/O-level failures as [`SubmitError::Transport`]
/// and hand every received status code back unjudged; status policy belongs
/// to the clients.
pub trait AnalysisTransport: Send + Sync {
    /// Posts one multipart video submission.
    ///
    /// # Errors
    /// Returns [`SubmitError::Transport`] when the request cannot be sent or
    /// the reply cannot be read.
    fn post_video(
        &self,
        endpoint: &Url,
        request: &SubmissionRequest,
    ) -> Result<TransportReply, SubmitError>;

    /// Fetches the analysis report.
    ///
    /// # Errors
    /// Returns [`SubmitError::Transport`] when the request cannot be sent or
    /// the reply cannot be read.
    fn fetch_report(&self, endpoint: &Url) -> Result<TransportReply, SubmitError>;
}

/// Executes the submission protocol against the analyze endpoint.
pub struct SubmissionClient {
    endpoint: Url,
    transport: Arc<dyn AnalysisTransport>,
    in_flight: AtomicBool,
}

impl SubmissionClient {
    /// Creates a client for an already-validated analyze endpoint.
    pub fn new(endpoint: Url, transport: Arc<dyn AnalysisTransport>) -> Self {
        Self {
            endpoint,
            transport,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Returns the configured analyze endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns `true` while a submission is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Submits the selected video and returns the parsed analysis.
    ///
    /// The payload is materialized before any network work, so a missing
    /// selection or unreadable source never costs a request. Exactly one POST
    /// is issued per call; there is no automatic retry.
    ///
    /// # Errors
    /// Returns [`SubmitError::NoVideo`] when nothing is selected.
    /// Returns [`SubmitError::VideoRead`] when the source cannot be loaded.
    /// Returns [`SubmitError::SubmissionInFlight`] when another submission is
    /// outstanding.
    /// Returns [`SubmitError::Transport`], [`SubmitError::Upstream`], or
    /// [`SubmitError::MalformedResponse`] for wire-level failures.
    pub fn submit(&self, source: &VideoSource) -> Result<AnalysisResponse, SubmitError> {
        let resolved = ResolvedVideo::try_from(source).map_err(map_source_error)?;
        let payload = resolved.load().map_err(map_source_error)?;
        let request = SubmissionRequest {
            field_name: VIDEO_FIELD_NAME,
            idempotency_key: idempotency_key_for_video(&payload.filename, &payload.bytes),
            filename: payload.filename,
            mime_type: payload.mime_type,
            bytes: payload.bytes,
        };

        let _flight = FlightGuard::acquire(&self.in_flight, SubmitError::SubmissionInFlight)?;

        log::debug!(
            "submitting video: filename={} bytes={} idempotency_key={}",
            request.filename,
            request.bytes.len(),
            request.idempotency_key
        );

        let reply = self.transport.post_video(&self.endpoint, &request)?;
        if reply.status != 200 {
            return Err(SubmitError::Upstream {
                status: reply.status,
            });
        }

        let parsed =
            parse_analysis_response(&reply.body).map_err(SubmitError::MalformedResponse)?;
        log::info!(
            "analysis received: moments={} idempotency_key={}",
            parsed.analysis.len(),
            request.idempotency_key
        );
        Ok(parsed)
    }
}

/// Downloads the analysis report and persists it without partial files.
pub struct ReportDownloader {
    endpoint: Url,
    transport: Arc<dyn AnalysisTransport>,
    in_flight: AtomicBool,
}

impl ReportDownloader {
    /// Creates a downloader for an already-validated report endpoint.
    pub fn new(endpoint: Url, transport: Arc<dyn AnalysisTransport>) -> Self {
        Self {
            endpoint,
            transport,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Returns the configured report endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetches the report and writes it to `dir` as [`REPORT_FILENAME`].
    ///
    /// The body lands in a `.part` file that is renamed into place only after
    /// a complete write, so a failed download never leaves a partial report
    /// under the final name.
    ///
    /// # Errors
    /// Returns [`SubmitError::DownloadInFlight`] when another download is
    /// outstanding.
    /// Returns [`SubmitError::Transport`] or [`SubmitError::Upstream`] for
    /// wire-level failures and [`SubmitError::ReportPersist`] when the file
    /// cannot be written.
    pub fn download_to(&self, dir: &Path) -> Result<PathBuf, SubmitError> {
        let _flight = FlightGuard::acquire(&self.in_flight, SubmitError::DownloadInFlight)?;

        let reply = self.transport.fetch_report(&self.endpoint)?;
        if reply.status != 200 {
            return Err(SubmitError::Upstream {
                status: reply.status,
            });
        }

        let final_path = dir.join(REPORT_FILENAME);
        let part_path = dir.join(format!("{REPORT_FILENAME}.part"));
        let persisted = std::fs::write(&part_path, &reply.body)
            .and_then(|()| std::fs::rename(&part_path, &final_path));

        if let Err(source) = persisted {
            let _ = std::fs::remove_file(&part_path);
            return Err(SubmitError::ReportPersist {
                path: final_path,
                source,
            });
        }

        log::info!(
            "report saved: path={} bytes={}",
            final_path.display(),
            reply.body.len()
        );
        Ok(final_path)
    }
}

/// Failure bucket used for user-facing retry hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Transient; trying again may succeed.
    Retriable,
    /// The user must change something first (select or re-record a video).
    UserCorrectable,
    /// Retrying the same request will fail the same way.
    Permanent,
}

/// Buckets a submission error for user messaging.
///
/// Service-side 5xx statuses and transport failures are worth retrying by
/// hand; 4xx statuses and undecodable replies are not.
pub fn classify_submission_error(error: &SubmitError) -> FailureClass {
    match error {
        SubmitError::Transport(_)
        | SubmitError::SubmissionInFlight
        | SubmitError::DownloadInFlight
        | SubmitError::ReportPersist { .. } => FailureClass::Retriable,
        SubmitError::Upstream { status } if (500..=599).contains(status) => FailureClass::Retriable,
        SubmitError::NoVideo | SubmitError::VideoRead(_) => FailureClass::UserCorrectable,
        SubmitError::Upstream { .. } | SubmitError::MalformedResponse(_) => FailureClass::Permanent,
    }
}

/// Computes the content digest sent as the idempotency key.
///
/// The key is a sha256 hex digest over the wire filename and payload bytes,
/// so re-submitting the same clip yields the same key.
pub fn idempotency_key_for_video(filename: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update([0_u8]);
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn map_source_error(error: CoreError) -> SubmitError {
    match error {
        CoreError::NoVideoSelected => SubmitError::NoVideo,
        other => SubmitError::VideoRead(other),
    }
}

/// Clears an in-flight flag when the guarded operation exits.
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, busy: SubmitError) -> Result<Self, SubmitError> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(busy);
        }
        Ok(Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// HTTP transport backed by a blocking `reqwest` client.
///
/// This is the only code in the workspace that touches the network.
#[derive(Debug, Clone)]
pub struct HttpAnalysisTransport {
    client: reqwest::blocking::Client,
}

impl HttpAnalysisTransport {
    /// Creates a transport with the given whole-request timeout.
    ///
    /// # Errors
    /// Returns [`SubmitError::Transport`] when the HTTP client cannot be
    /// constructed.
    pub fn new(timeout: Duration) -> Result<Self, SubmitError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                SubmitError::Transport(format!("http client construction failed: {error}"))
            })?;
        Ok(Self { client })
    }
}

impl AnalysisTransport for HttpAnalysisTransport {
    fn post_video(
        &self,
        endpoint: &Url,
        request: &SubmissionRequest,
    ) -> Result<TransportReply, SubmitError> {
        let part = reqwest::blocking::multipart::Part::bytes(request.bytes.clone())
            .file_name(request.filename.clone())
            .mime_str(&request.mime_type)
            .map_err(|error| SubmitError::Transport(format!("invalid mime type: {error}")))?;
        let form = reqwest::blocking::multipart::Form::new().part(request.field_name, part);

        let response = self
            .client
            .post(endpoint.clone())
            .header(IDEMPOTENCY_HEADER, request.idempotency_key.as_str())
            .multipart(form)
            .send()
            .map_err(|error| SubmitError::Transport(error.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|error| SubmitError::Transport(error.to_string()))?
            .to_vec();
        Ok(TransportReply { status, body })
    }

    fn fetch_report(&self, endpoint: &Url) -> Result<TransportReply, SubmitError> {
        let response = self
            .client
            .get(endpoint.clone())
            .send()
            .map_err(|error| SubmitError::Transport(error.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|error| SubmitError::Transport(error.to_string()))?
            .to_vec();
        Ok(TransportReply { status, body })
    }
}

/// Submission and report errors.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Submission was attempted with no video selected.
    #[error("no video selected for submission")]
    NoVideo,
    /// The selected video could not be loaded.
    #[error("selected video could not be loaded: {0}")]
    VideoRead(CoreError),
    /// Another submission is outstanding.
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    /// Another report download is outstanding.
    #[error("a report download is already in flight")]
    DownloadInFlight,
    /// The request never produced a status code.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("analysis service returned status {status}")]
    Upstream {
        /// HTTP status code received.
        status: u16,
    },
    /// A success reply carried an undecodable body.
    #[error("analysis response could not be decoded: {0}")]
    MalformedResponse(AnalysisContractError),
    /// The report could not be written to disk.
    #[error("failed to persist report to {}: {source}", .path.display())]
    ReportPersist {
        /// Intended final report path.
        path: PathBuf,
        /// Underlying filesystem error.
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    //! Unit tests for idempotency keys and failure classification.

    use super::*;

    #[test]
    fn idempotency_key_is_stable_for_identical_payloads() {
        let first = idempotency_key_for_video("video.webm", &[1, 2, 3]);
        let second = idempotency_key_for_video("video.webm", &[1, 2, 3]);
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn idempotency_key_differs_by_filename_and_bytes() {
        let recorded = idempotency_key_for_video("video.webm", &[1, 2, 3]);
        let uploaded = idempotency_key_for_video("video.mp4", &[1, 2, 3]);
        let other_bytes = idempotency_key_for_video("video.webm", &[9, 9, 9]);
        assert_ne!(recorded, uploaded);
        assert_ne!(recorded, other_bytes);
    }

    #[test]
    fn classification_separates_retriable_and_permanent() {
        assert_eq!(
            classify_submission_error(&SubmitError::Upstream { status: 503 }),
            FailureClass::Retriable
        );
        assert_eq!(
            classify_submission_error(&SubmitError::Upstream { status: 400 }),
            FailureClass::Permanent
        );
        assert_eq!(
            classify_submission_error(&SubmitError::NoVideo),
            FailureClass::UserCorrectable
        );
        assert_eq!(
            classify_submission_error(&SubmitError::Transport("refused".to_string())),
            FailureClass::Retriable
        );
    }
}
