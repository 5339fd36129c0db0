#![warn(missing_docs)]
//! # form-coach-ui
//!
//! ## Purpose
//! Defines the UI-facing runtime state model and results projection for
//! `form-coach`.
//!
//! ## Responsibilities
//! - Represent the screen flow and per-stage statuses of the coaching run.
//! - Project analysis responses into renderable frame sections.
//! - Enforce that only successful submissions navigate to results.
//!
//! ## Data flow
//! App orchestration events mutate [`UiState`], and parsed analysis responses
//! pass through [`render_results`] into display-ready sections.
//!
//! ## Ownership and lifetimes
//! `UiState` and [`ResultsView`] own all their values to simplify event
//! reducers and keep rendering free of borrows into transport buffers.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors. Rendering never
//! fails; undecodable stills degrade per frame.
//!
//! ## Security and privacy notes
//! UI state holds status text and decoded stills only, never raw submissions
//! or endpoint details.

use form_coach_analysis_contract::{AnalysisResponse, decode_still};
pub use form_coach_analysis_contract::StillFrame;

/// Status line shown when no analysis exists for the session.
pub const NO_ANALYSIS_TEXT: &str = "No analysis data available";

/// Screens of the coaching flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Landing screen before a capture session starts.
    Entry,
    /// Recording and submission screen.
    Capture,
    /// Per-frame analysis results screen.
    Results,
}

/// Generic stage status used for capture/submission/report flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// Stage has not started.
    Idle,
    /// Stage is currently running.
    Running,
    /// Stage completed successfully.
    Healthy,
    /// Stage encountered a non-fatal error.
    Degraded,
}

/// Aggregate UI runtime state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    /// App version string sourced from root `VERSION`.
    pub version: String,
    /// Currently shown screen.
    pub screen: Screen,
    /// Recording stage status.
    pub capture: StageStatus,
    /// Submission stage status.
    pub submission: StageStatus,
    /// Report download stage status.
    pub report: StageStatus,
    /// Human-readable analysis status.
    pub analysis_status: String,
}

impl UiState {
    /// Creates default UI state on the entry screen.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            screen: Screen::Entry,
            capture: StageStatus::Idle,
            submission: StageStatus::Idle,
            report: StageStatus::Idle,
            analysis_status: NO_ANALYSIS_TEXT.to_string(),
        }
    }

    /// Enters the capture screen.
    pub fn enter_capture(&mut self) {
        self.screen = Screen::Capture;
    }

    /// Marks recording as running.
    pub fn on_recording_started(&mut self) {
        self.capture = StageStatus::Running;
    }

    /// Marks recording as finished with a clip.
    pub fn on_recording_stopped(&mut self) {
        self.capture = StageStatus::Healthy;
    }

    /// Marks recording as failed (denied permission or device fault).
    pub fn on_capture_failed(&mut self) {
        self.capture = StageStatus::Degraded;
    }

    /// Marks an active recording as abandoned without a clip.
    pub fn on_recording_aborted(&mut self) {
        self.capture = StageStatus::Idle;
    }

    /// Marks a submission as outstanding.
    pub fn on_submission_started(&mut self) {
        self.submission = StageStatus::Running;
    }

    /// Applies a successful submission: the only transition that navigates to
    /// the results screen.
    pub fn on_submission_succeeded(&mut self, view: &ResultsView) {
        self.submission = StageStatus::Healthy;
        self.screen = Screen::Results;
        self.analysis_status = summarize_results(view);
    }

    /// Applies a failed submission. The screen does not change.
    pub fn on_submission_failed(&mut self, notice: impl Into<String>) {
        self.submission = StageStatus::Degraded;
        self.analysis_status = notice.into();
    }

    /// Marks a report download as outstanding.
    pub fn on_report_started(&mut self) {
        self.report = StageStatus::Running;
    }

    /// Marks the report download finished.
    pub fn on_report_finished(&mut self, succeeded: bool) {
        self.report = if succeeded {
            StageStatus::Healthy
        } else {
            StageStatus::Degraded
        };
    }

    /// Returns `true` when a new submission may be started.
    pub fn can_submit(&self) -> bool {
        self.submission != StageStatus::Running
    }

    /// Returns to the entry screen and clears every stage.
    pub fn reset_flow(&mut self) {
        self.screen = Screen::Entry;
        self.capture = StageStatus::Idle;
        self.submission = StageStatus::Idle;
        self.report = StageStatus::Idle;
        self.analysis_status = NO_ANALYSIS_TEXT.to_string();
    }
}

/// Renderable projection of one analysis response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsView {
    /// Frame sections in response order.
    pub frames: Vec<FrameSection>,
    /// Total issue count across all frames.
    pub total_issues: usize,
}

/// One renderable analyzed moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSection {
    /// 1-based display position of the moment.
    pub position: usize,
    /// Optional `MM:SS` label of the moment in the source video.
    pub timestamp_label: Option<String>,
    /// Decoded still frame or its degraded stand-in.
    pub still: StillFrame,
    /// Detected form errors in severity order.
    pub errors: Vec<String>,
    /// Corrective suggestions in presentation order.
    pub suggestions: Vec<String>,
    /// Issue badge count; absent when the frame has no errors.
    pub issue_badge: Option<usize>,
}

/// Projects an analysis response into display-ready frame sections.
///
/// Rendering is pure and total: every response renders, order is preserved,
/// and frames with no errors carry no issue badge.
pub fn render_results(response: &AnalysisResponse) -> ResultsView {
    let frames: Vec<FrameSection> = response
        .analysis
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let issue_count = item.posture.errors.len();
            FrameSection {
                position: index + 1,
                timestamp_label: item.timestamp.clone(),
                still: decode_still(&item.image_base64),
                errors: item.posture.errors.clone(),
                suggestions: item.posture.suggestions.clone(),
                issue_badge: (issue_count > 0).then_some(issue_count),
            }
        })
        .collect();

    let total_issues = frames.iter().map(|frame| frame.errors.len()).sum();
    ResultsView {
        frames,
        total_issues,
    }
}

fn summarize_results(view: &ResultsView) -> String {
    if view.frames.is_empty() {
        return "Analysis complete: no moments reported".to_string();
    }

    if view.total_issues == 0 {
        return "Analysis complete: no form issues detected".to_string();
    }

    format!(
        "Analysis complete: {} issue(s) across {} moment(s)",
        view.total_issues,
        view.frames.len()
    )
}
