//! Integration tests for the at-most-one-in-flight submission and download
//! guards.

mod common;

use std::io::Write;
use std::sync::{Arc, Barrier};
use std::thread;

use common::{SINGLE_FRAME_BODY, test_report_downloader, test_submission_client};
use form_coach_core::{UploadedVideo, VideoSource};
use form_coach_submit::{AnalysisTransport, SubmissionRequest, SubmitError, TransportReply};
use url::Url;

/// Transport double that parks inside the request until the test releases it.
struct GatedTransport {
    entered: Arc<Barrier>,
    release: Arc<Barrier>,
}

impl AnalysisTransport for GatedTransport {
    fn post_video(
        &self,
        _endpoint: &Url,
        _request: &SubmissionRequest,
    ) -> Result<TransportReply, SubmitError> {
        self.entered.wait();
        self.release.wait();
        Ok(TransportReply {
            status: 200,
            body: SINGLE_FRAME_BODY.as_bytes().to_vec(),
        })
    }

    fn fetch_report(&self, _endpoint: &Url) -> Result<TransportReply, SubmitError> {
        self.entered.wait();
        self.release.wait();
        Ok(TransportReply {
            status: 200,
            body: b"{\"report\":true}".to_vec(),
        })
    }
}

#[test]
fn single_flight_tests_second_submission_is_rejected_while_first_runs() {
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let transport = Arc::new(GatedTransport {
        entered: entered.clone(),
        release: release.clone(),
    });
    let client = Arc::new(test_submission_client(transport));

    let mut clip = tempfile::NamedTempFile::new().expect("temp file should be created");
    clip.write_all(&[3_u8; 128]).expect("temp write should work");
    let source = VideoSource::Uploaded(UploadedVideo::new(clip.path()));

    let worker_client = Arc::clone(&client);
    let worker_source = source.clone();
    let worker = thread::spawn(move || worker_client.submit(&worker_source));

    // Rendezvous with the worker inside the transport, so the first
    // submission is provably outstanding when the second one is attempted.
    entered.wait();
    assert!(client.is_in_flight());
    let error = client.submit(&source).expect_err("one submission is outstanding");
    assert!(matches!(error, SubmitError::SubmissionInFlight));

    release.wait();
    let response = worker
        .join()
        .expect("worker should not panic")
        .expect("gated submission should succeed");
    assert_eq!(response.analysis.len(), 1);
    assert!(!client.is_in_flight());

    // The guard is released; a fresh submission is allowed again.
    let retry = thread::spawn({
        let client = Arc::clone(&client);
        let source = source.clone();
        move || client.submit(&source)
    });
    entered.wait();
    release.wait();
    retry
        .join()
        .expect("retry should not panic")
        .expect("retry should succeed");
}

#[test]
fn single_flight_tests_second_download_is_rejected_while_first_runs() {
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let transport = Arc::new(GatedTransport {
        entered: entered.clone(),
        release: release.clone(),
    });
    let downloader = Arc::new(test_report_downloader(transport));
    let dir = tempfile::tempdir().expect("temp dir should be created");

    let worker_downloader = Arc::clone(&downloader);
    let worker_dir = dir.path().to_path_buf();
    let worker = thread::spawn(move || worker_downloader.download_to(&worker_dir));

    entered.wait();
    let error = downloader
        .download_to(dir.path())
        .expect_err("one download is outstanding");
    assert!(matches!(error, SubmitError::DownloadInFlight));

    release.wait();
    let path = worker
        .join()
        .expect("worker should not panic")
        .expect("gated download should succeed");
    assert!(path.exists());
}
