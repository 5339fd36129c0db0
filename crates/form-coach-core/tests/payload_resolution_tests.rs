//! Tests payload loading for live, stale, and file-backed selections.

use std::io::Write;
use std::sync::Arc;

use form_coach_core::{CoreError, RecordedVideo, UploadedVideo, VideoSourceResolver};

#[test]
fn payload_resolution_tests_rejects_empty_selection() {
    let resolver = VideoSourceResolver::new();
    let error = resolver.resolve().expect_err("nothing is selected");
    assert!(matches!(error, CoreError::NoVideoSelected));
}

#[test]
fn payload_resolution_tests_loads_live_recording_bytes() {
    let blob = Arc::new(vec![7_u8; 32]);
    let mut resolver = VideoSourceResolver::new();
    resolver.select_recorded(RecordedVideo::new(&blob, 12));

    let payload = resolver
        .resolve()
        .expect("recording should be selected")
        .load()
        .expect("clip bytes should load");
    assert_eq!(payload.filename, "video.webm");
    assert_eq!(payload.mime_type, "video/webm");
    assert_eq!(payload.bytes, vec![7_u8; 32]);
}

#[test]
fn payload_resolution_tests_stale_recording_fails_to_load() {
    let blob = Arc::new(vec![7_u8; 32]);
    let handle = RecordedVideo::new(&blob, 12);
    assert!(handle.is_available());

    drop(blob);
    assert!(!handle.is_available());

    let mut resolver = VideoSourceResolver::new();
    resolver.select_recorded(handle);
    let error = resolver
        .resolve()
        .expect("selection itself is still present")
        .load()
        .expect_err("clip owner is gone");
    assert!(matches!(error, CoreError::RecordingGone));
}

#[test]
fn payload_resolution_tests_reads_upload_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
    file.write_all(&[9_u8; 16]).expect("temp write should work");

    let mut resolver = VideoSourceResolver::new();
    resolver.select_upload(UploadedVideo::new(file.path()));

    let payload = resolver
        .resolve()
        .expect("upload should be selected")
        .load()
        .expect("file bytes should load");
    assert_eq!(payload.filename, "video.mp4");
    assert_eq!(payload.bytes, vec![9_u8; 16]);
}

#[test]
fn payload_resolution_tests_missing_upload_reports_read_error() {
    let mut resolver = VideoSourceResolver::new();
    resolver.select_upload(UploadedVideo::new("/nonexistent/form-coach/clip.mp4"));

    let error = resolver
        .resolve()
        .expect("upload should be selected")
        .load()
        .expect_err("file does not exist");
    assert!(matches!(error, CoreError::UploadRead { .. }));
}
