#![warn(missing_docs)]
//! # form-coach-app
//!
//! ## Purpose
//! Orchestrates capture, source selection, submission, results, and UI state
//! for `form-coach`.
//!
//! ## Responsibilities
//! - Resolve service endpoints from environment configuration.
//! - Drive one coaching session from recording to rendered results.
//! - Hold the session-scoped analysis result and its fallback document.
//! - Project runtime state for shells and assign log-correlation ids.
//!
//! ## Data flow
//! Camera backend -> capture session -> video source resolver -> submission
//! client -> analysis response -> result store -> results rendering -> UI
//! projection. Reports flow through the report downloader to disk.
//!
//! ## Ownership and lifetimes
//! [`CoachSession`] owns every subsystem for exactly one user session. All
//! analysis state dies with the session; nothing is stashed in globals.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]. Submission failures leave
//! the session on the capture screen in a retryable state; only success
//! navigates forward.
//!
//! ## Security and privacy notes
//! Log lines carry session ids, filenames, and byte counts, never video
//! bytes or decoded frames.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use form_coach_analysis_contract::{AnalysisResponse, parse_analysis_response};
use form_coach_capture::{CameraBackend, CaptureError, MediaCaptureSession, TickOutcome};
use form_coach_core::{RecordedVideo, UploadedVideo, VideoSourceResolver};
use form_coach_submit::{
    ReportDownloader, SubmissionClient, SubmitError, classify_submission_error,
};
use form_coach_ui::{ResultsView, UiState, render_results};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use url::Url;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("FORM_COACH_VERSION");

/// Environment variable naming the analysis service base URL.
pub const API_BASE_ENV: &str = "FORM_COACH_API_BASE";

/// Environment variable naming the fallback analysis document.
pub const FALLBACK_DOCUMENT_ENV: &str = "FORM_COACH_FALLBACK_DOCUMENT";

/// Base URL used when [`API_BASE_ENV`] is unset: the local development
/// service.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Validated analysis service configuration.
///
/// Endpoints are derived from one base URL by trimming trailing slashes and
/// appending the fixed service paths, so `http://host`, `http://host/`, and
/// `http://host/prefix` all derive consistently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base: String,
    analyze_endpoint: Url,
    report_endpoint: Url,
}

impl ApiConfig {
    /// Creates a validated configuration from a base URL.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the base is not an absolute `http`
    /// or `https` URL with a host.
    pub fn new(base: impl Into<String>) -> Result<Self, AppError> {
        let base = base.into().trim().trim_end_matches('/').to_string();
        let parsed = Url::parse(&base)
            .map_err(|error| AppError::Config(format!("invalid api base url: {error}")))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(AppError::Config(
                "api base url must use http or https".to_string(),
            ));
        }

        if parsed.host_str().is_none() {
            return Err(AppError::Config(
                "api base url must include a host".to_string(),
            ));
        }

        let analyze_endpoint = Url::parse(&format!("{base}/analyze-video/"))
            .map_err(|error| AppError::Config(format!("invalid analyze endpoint: {error}")))?;
        let report_endpoint = Url::parse(&format!("{base}/download-report/"))
            .map_err(|error| AppError::Config(format!("invalid report endpoint: {error}")))?;

        Ok(Self {
            base,
            analyze_endpoint,
            report_endpoint,
        })
    }

    /// Creates configuration from [`API_BASE_ENV`], falling back to
    /// [`DEFAULT_API_BASE`].
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the configured value is not a valid
    /// base URL.
    pub fn from_env() -> Result<Self, AppError> {
        match std::env::var(API_BASE_ENV) {
            Ok(value) if !value.trim().is_empty() => Self::new(value),
            _ => Self::new(DEFAULT_API_BASE),
        }
    }

    /// Returns the normalized base URL string.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the video submission endpoint.
    pub fn analyze_endpoint(&self) -> Url {
        self.analyze_endpoint.clone()
    }

    /// Returns the report download endpoint.
    pub fn report_endpoint(&self) -> Url {
        self.report_endpoint.clone()
    }
}

/// What the result store produced for the results screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredAnalysis {
    /// Analysis from a submission in this session.
    Live(AnalysisResponse),
    /// The configured fallback document; no submission happened yet.
    Fallback(AnalysisResponse),
    /// Nothing to show. A valid state, not an error.
    Empty,
}

/// Where a rendered results view came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsOrigin {
    /// Rendered from this session's submission.
    Live,
    /// Rendered from the configured fallback document.
    Fallback,
}

/// Session-scoped holder for the latest analysis response.
///
/// The store keeps at most one response, set by a successful submission and
/// cleared on session reset. When empty, it can serve a fallback document so
/// the results screen has something to show before the first submission.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResultStore {
    current: Option<AnalysisResponse>,
    fallback_document: Option<PathBuf>,
}

impl AnalysisResultStore {
    /// Creates a store with an optional fallback document path.
    pub fn new(fallback_document: Option<PathBuf>) -> Self {
        Self {
            current: None,
            fallback_document,
        }
    }

    /// Creates a store configured from [`FALLBACK_DOCUMENT_ENV`].
    pub fn from_env() -> Self {
        let fallback_document = std::env::var(FALLBACK_DOCUMENT_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        Self::new(fallback_document)
    }

    /// Stores the analysis from a successful submission.
    pub fn persist(&mut self, response: AnalysisResponse) {
        self.current = Some(response);
    }

    /// Drops the stored analysis.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Returns `true` when a submission from this session is stored.
    pub fn has_live_result(&self) -> bool {
        self.current.is_some()
    }

    /// Loads the analysis to show: live result first, fallback document
    /// second, empty last.
    ///
    /// An unreadable or unparseable fallback document degrades to
    /// [`StoredAnalysis::Empty`] with a warning; it never fails the caller.
    pub fn load(&self) -> StoredAnalysis {
        if let Some(current) = &self.current {
            return StoredAnalysis::Live(current.clone());
        }

        if let Some(path) = &self.fallback_document {
            match std::fs::read(path) {
                Ok(bytes) => match parse_analysis_response(&bytes) {
                    Ok(parsed) => return StoredAnalysis::Fallback(parsed),
                    Err(error) => log::warn!(
                        "fallback document {} is not a valid analysis payload: {error}",
                        path.display()
                    ),
                },
                Err(error) => log::warn!(
                    "fallback document {} could not be read: {error}",
                    path.display()
                ),
            }
        }

        StoredAnalysis::Empty
    }
}

/// One user's coaching run, from camera to rendered results.
pub struct CoachSession {
    session_id: String,
    capture: MediaCaptureSession,
    resolver: VideoSourceResolver,
    submission: SubmissionClient,
    report: ReportDownloader,
    store: AnalysisResultStore,
    ui: UiState,
}

impl CoachSession {
    /// Creates a session wiring the camera backend, protocol clients, and
    /// result store together.
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        submission: SubmissionClient,
        report: ReportDownloader,
        store: AnalysisResultStore,
    ) -> Self {
        let session_id = new_session_id();
        log::info!("session {session_id}: created");
        Self {
            session_id,
            capture: MediaCaptureSession::new(backend),
            resolver: VideoSourceResolver::new(),
            submission,
            report,
            store,
            ui: UiState::new(APP_VERSION),
        }
    }

    /// Returns the log-correlation id of this session.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns the UI state snapshot.
    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Returns the capture session.
    pub fn capture(&self) -> &MediaCaptureSession {
        &self.capture
    }

    /// Returns the video source resolver.
    pub fn resolver(&self) -> &VideoSourceResolver {
        &self.resolver
    }

    /// Returns the analysis result store.
    pub fn store(&self) -> &AnalysisResultStore {
        &self.store
    }

    /// Moves the UI to the capture screen.
    pub fn begin_capture(&mut self) {
        self.ui.enter_capture();
    }

    /// Starts recording from the camera backend.
    ///
    /// # Errors
    /// Returns [`AppError::Capture`] when acquisition fails; the capture
    /// session is back in idle state and the user may retry.
    pub fn start_recording(&mut self) -> Result<(), AppError> {
        match self.capture.start_recording() {
            Ok(()) => {
                self.ui.on_recording_started();
                log::info!("session {}: recording started", self.session_id);
                Ok(())
            }
            Err(error) => {
                self.ui.on_capture_failed();
                log::warn!("session {}: recording failed to start: {error}", self.session_id);
                Err(AppError::Capture(error))
            }
        }
    }

    /// Delivers one 1 Hz tick to the capture session.
    ///
    /// # Errors
    /// Returns [`AppError::Capture`] when the device fails mid-recording.
    pub fn tick(&mut self) -> Result<TickOutcome, AppError> {
        match self.capture.on_timer_tick() {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                self.ui.on_capture_failed();
                log::warn!("session {}: device failed mid-recording: {error}", self.session_id);
                Err(AppError::Capture(error))
            }
        }
    }

    /// Stops recording and selects the finalized clip for submission.
    ///
    /// Outside an active recording this is a no-op returning `Ok(None)`.
    ///
    /// # Errors
    /// Returns [`AppError::Capture`] when clip finalization fails.
    pub fn stop_recording(&mut self) -> Result<Option<RecordedVideo>, AppError> {
        match self.capture.stop_recording() {
            Ok(Some(clip)) => {
                self.resolver.select_recorded(clip.clone());
                self.ui.on_recording_stopped();
                log::info!(
                    "session {}: recording stopped at {}",
                    self.session_id,
                    self.capture.elapsed_label()
                );
                Ok(Some(clip))
            }
            Ok(None) => Ok(None),
            Err(error) => {
                self.ui.on_capture_failed();
                log::warn!("session {}: recording failed to stop: {error}", self.session_id);
                Err(AppError::Capture(error))
            }
        }
    }

    /// Abandons an active recording without keeping a clip.
    pub fn abort_capture(&mut self) {
        self.capture.abort();
        self.ui.on_recording_aborted();
    }

    /// Selects a video file from disk, replacing any recorded selection.
    pub fn choose_upload(&mut self, path: impl Into<PathBuf>) {
        let upload = UploadedVideo::new(path);
        log::info!(
            "session {}: upload selected: {}",
            self.session_id,
            upload.path().display()
        );
        self.resolver.select_upload(upload);
    }

    /// Submits the selected video and, on success, stores the analysis and
    /// navigates to results.
    ///
    /// # Errors
    /// Returns [`AppError::Submit`] on any failure. The UI stays on the
    /// capture screen with a classification-driven notice, and the session
    /// remains ready for another attempt.
    pub fn submit(&mut self) -> Result<ResultsView, AppError> {
        self.ui.on_submission_started();
        match self.submission.submit(self.resolver.source()) {
            Ok(response) => {
                let view = render_results(&response);
                self.store.persist(response);
                self.ui.on_submission_succeeded(&view);
                log::info!(
                    "session {}: analysis ready: moments={} issues={}",
                    self.session_id,
                    view.frames.len(),
                    view.total_issues
                );
                Ok(view)
            }
            Err(error) => {
                self.ui.on_submission_failed(submission_notice(&error));
                log::warn!("session {}: submission failed: {error}", self.session_id);
                Err(AppError::Submit(error))
            }
        }
    }

    /// Renders the analysis to show on the results screen.
    ///
    /// Returns `None` when there is neither a live result nor a usable
    /// fallback document.
    pub fn load_results(&self) -> Option<(ResultsView, ResultsOrigin)> {
        match self.store.load() {
            StoredAnalysis::Live(response) => {
                Some((render_results(&response), ResultsOrigin::Live))
            }
            StoredAnalysis::Fallback(response) => {
                Some((render_results(&response), ResultsOrigin::Fallback))
            }
            StoredAnalysis::Empty => None,
        }
    }

    /// Downloads the analysis report into `dir`.
    ///
    /// # Errors
    /// Returns [`AppError::Submit`] when the download or persist fails; no
    /// partial file is left behind.
    pub fn download_report(&mut self, dir: &Path) -> Result<PathBuf, AppError> {
        self.ui.on_report_started();
        match self.report.download_to(dir) {
            Ok(path) => {
                self.ui.on_report_finished(true);
                Ok(path)
            }
            Err(error) => {
                self.ui.on_report_finished(false);
                log::warn!("session {}: report download failed: {error}", self.session_id);
                Err(AppError::Submit(error))
            }
        }
    }

    /// Returns the session to the entry screen, dropping the clip, the
    /// selection, and the stored analysis.
    pub fn reset(&mut self) {
        self.capture.reset();
        self.resolver.clear();
        self.store.clear();
        self.ui.reset_flow();
        log::info!("session {}: reset to entry", self.session_id);
    }
}

/// Consolidated runtime status snapshot for simple shell projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeStatus {
    /// Currently shown screen.
    pub screen: String,
    /// Recording stage status.
    pub capture: String,
    /// Submission stage status.
    pub submission: String,
    /// Report download stage status.
    pub report: String,
    /// Analysis status text.
    pub analysis: String,
    /// Whether a new submission may start.
    pub can_submit: bool,
}

/// Projects UI runtime state into a flat status snapshot.
pub fn project_runtime_status(state: &UiState) -> RuntimeStatus {
    RuntimeStatus {
        screen: format!("{:?}", state.screen),
        capture: format!("{:?}", state.capture),
        submission: format!("{:?}", state.submission),
        report: format!("{:?}", state.report),
        analysis: state.analysis_status.clone(),
        can_submit: state.can_submit(),
    }
}

/// Generates a short log-correlation id for one session.
pub fn new_session_id() -> String {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(seed);
    format!("run-{:016x}", rng.random::<u64>())
}

fn submission_notice(error: &SubmitError) -> String {
    let hint = match classify_submission_error(error) {
        form_coach_submit::FailureClass::Retriable => "try again in a moment",
        form_coach_submit::FailureClass::UserCorrectable => "record a clip or pick a file first",
        form_coach_submit::FailureClass::Permanent => "the request will not succeed as submitted",
    };
    format!("{error}; {hint}")
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),
    /// Capture subsystem error.
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    /// Submission or report subsystem error.
    #[error("submission error: {0}")]
    Submit(#[from] SubmitError),
}
