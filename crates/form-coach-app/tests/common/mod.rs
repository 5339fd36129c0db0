//! Shared fixtures for app integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use form_coach_app::{AnalysisResultStore, ApiConfig, CoachSession};
use form_coach_capture::CameraBackend;
use form_coach_submit::{
    AnalysisTransport, ReportDownloader, SubmissionClient, SubmissionRequest, SubmitError,
    TransportReply,
};
use url::Url;

/// Single-frame analysis body used across submission tests.
pub const SINGLE_FRAME_BODY: &str = r#"{
    "analysis": [
        {
            "image_base64": "AA==",
            "posture": {
                "errors": ["Knees caving in"],
                "suggestions": ["Widen stance"]
            }
        }
    ]
}"#;

/// Transport double answering every request with a fixed reply.
pub struct ScriptedTransport {
    post_status: u16,
    post_body: Vec<u8>,
    fetch_status: u16,
    fetch_body: Vec<u8>,
    post_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new(post_status: u16, post_body: &[u8], fetch_status: u16, fetch_body: &[u8]) -> Self {
        Self {
            post_status,
            post_body: post_body.to_vec(),
            fetch_status,
            fetch_body: fetch_body.to_vec(),
            post_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Answers submissions with a 200 single-frame analysis.
    pub fn succeeding() -> Self {
        Self::new(200, SINGLE_FRAME_BODY.as_bytes(), 200, b"{\"report\":true}")
    }

    /// Answers every request with the given status and an empty body.
    pub fn with_status(status: u16) -> Self {
        Self::new(status, b"", status, b"")
    }

    pub fn post_calls(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

impl AnalysisTransport for ScriptedTransport {
    fn post_video(
        &self,
        _endpoint: &Url,
        _request: &SubmissionRequest,
    ) -> Result<TransportReply, SubmitError> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TransportReply {
            status: self.post_status,
            body: self.post_body.clone(),
        })
    }

    fn fetch_report(&self, _endpoint: &Url) -> Result<TransportReply, SubmitError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TransportReply {
            status: self.fetch_status,
            body: self.fetch_body.clone(),
        })
    }
}

/// Transport double failing every request at the wire level.
pub struct RefusingTransport;

impl AnalysisTransport for RefusingTransport {
    fn post_video(
        &self,
        _endpoint: &Url,
        _request: &SubmissionRequest,
    ) -> Result<TransportReply, SubmitError> {
        Err(SubmitError::Transport("connection refused".to_string()))
    }

    fn fetch_report(&self, _endpoint: &Url) -> Result<TransportReply, SubmitError> {
        Err(SubmitError::Transport("connection refused".to_string()))
    }
}

/// Builds a submission client against the scripted transport.
#[allow(dead_code)]
pub fn test_submission_client(transport: Arc<dyn AnalysisTransport>) -> SubmissionClient {
    let config = ApiConfig::new("http://analysis.test").expect("test base url should be valid");
    SubmissionClient::new(config.analyze_endpoint(), transport)
}

/// Builds a report downloader against the scripted transport.
#[allow(dead_code)]
pub fn test_report_downloader(transport: Arc<dyn AnalysisTransport>) -> ReportDownloader {
    let config = ApiConfig::new("http://analysis.test").expect("test base url should be valid");
    ReportDownloader::new(config.report_endpoint(), transport)
}

/// Builds a full coach session over the given camera backend and transport.
#[allow(dead_code)]
pub fn test_session(
    backend: Arc<dyn CameraBackend>,
    transport: Arc<dyn AnalysisTransport>,
) -> CoachSession {
    test_session_with_store(backend, transport, AnalysisResultStore::new(None))
}

/// Builds a full coach session with a caller-provided result store.
#[allow(dead_code)]
pub fn test_session_with_store(
    backend: Arc<dyn CameraBackend>,
    transport: Arc<dyn AnalysisTransport>,
    store: AnalysisResultStore,
) -> CoachSession {
    let submission = test_submission_client(transport.clone());
    let report = test_report_downloader(transport);
    CoachSession::new(backend, submission, report, store)
}
