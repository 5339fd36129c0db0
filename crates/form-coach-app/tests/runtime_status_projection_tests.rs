//! Integration tests for the runtime status projection.

use form_coach_app::{app_version, project_runtime_status};
use form_coach_ui::{NO_ANALYSIS_TEXT, UiState};

#[test]
fn runtime_status_projection_tests_reflects_initial_state() {
    let state = UiState::new(app_version());
    let status = project_runtime_status(&state);

    assert_eq!(status.screen, "Entry");
    assert_eq!(status.capture, "Idle");
    assert_eq!(status.submission, "Idle");
    assert_eq!(status.report, "Idle");
    assert_eq!(status.analysis, NO_ANALYSIS_TEXT);
    assert!(status.can_submit);
}

#[test]
fn runtime_status_projection_tests_blocks_submit_while_one_is_running() {
    let mut state = UiState::new(app_version());
    state.enter_capture();
    state.on_submission_started();

    let status = project_runtime_status(&state);
    assert_eq!(status.screen, "Capture");
    assert_eq!(status.submission, "Running");
    assert!(!status.can_submit);
}
