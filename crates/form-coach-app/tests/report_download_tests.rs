//! Integration tests for report download persistence.

mod common;

use std::sync::Arc;

use common::{RefusingTransport, ScriptedTransport, test_report_downloader};
use form_coach_submit::{REPORT_FILENAME, SubmitError};

#[test]
fn report_download_tests_writes_report_under_final_name() {
    let transport = Arc::new(ScriptedTransport::succeeding());
    let downloader = test_report_downloader(transport.clone());
    let dir = tempfile::tempdir().expect("temp dir should be created");

    let path = downloader
        .download_to(dir.path())
        .expect("download should succeed");
    assert_eq!(path, dir.path().join(REPORT_FILENAME));
    assert_eq!(transport.fetch_calls(), 1);

    let saved = std::fs::read(&path).expect("report file should exist");
    assert_eq!(saved, b"{\"report\":true}");
    assert!(!dir.path().join(format!("{REPORT_FILENAME}.part")).exists());
}

#[test]
fn report_download_tests_upstream_failure_leaves_no_file() {
    let transport = Arc::new(ScriptedTransport::with_status(404));
    let downloader = test_report_downloader(transport);
    let dir = tempfile::tempdir().expect("temp dir should be created");

    let error = downloader
        .download_to(dir.path())
        .expect_err("service is failing");
    assert!(matches!(error, SubmitError::Upstream { status: 404 }));
    assert!(!dir.path().join(REPORT_FILENAME).exists());
    assert!(!dir.path().join(format!("{REPORT_FILENAME}.part")).exists());
}

#[test]
fn report_download_tests_transport_failure_leaves_no_file() {
    let downloader = test_report_downloader(Arc::new(RefusingTransport));
    let dir = tempfile::tempdir().expect("temp dir should be created");

    let error = downloader.download_to(dir.path()).expect_err("wire is down");
    assert!(matches!(error, SubmitError::Transport(_)));
    assert!(!dir.path().join(REPORT_FILENAME).exists());
    assert!(!dir.path().join(format!("{REPORT_FILENAME}.part")).exists());
}

#[test]
fn report_download_tests_unwritable_directory_reports_persist_failure() {
    let transport = Arc::new(ScriptedTransport::succeeding());
    let downloader = test_report_downloader(transport);
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let missing = dir.path().join("does-not-exist");

    let error = downloader
        .download_to(&missing)
        .expect_err("target directory is missing");
    assert!(matches!(error, SubmitError::ReportPersist { .. }));
    assert!(!missing.join(REPORT_FILENAME).exists());
}
