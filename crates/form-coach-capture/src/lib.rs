#![warn(missing_docs)]
//! # form-coach-capture
//!
//! ## Purpose
//! Implements the camera recording session and its device abstractions.
//!
//! ## Responsibilities
//! - Model the recording lifecycle (idle, awaiting permission, recording,
//!   stopped) with explicit legal transitions.
//! - Define a backend-agnostic camera trait for host integrations.
//! - Expose deterministic synthetic capture for CI and unit tests.
//! - Expose file-replay capture for running the pipeline without a webcam.
//!
//! ## Data flow
//! App requests recording -> [`CameraBackend`] opens a [`RecorderHandle`] ->
//! 1 Hz ticks drain recorder chunks -> stop finalizes chunks into one clip ->
//! [`form_coach_core::RecordedVideo`] handle enters the video source resolver.
//!
//! ## Ownership and lifetimes
//! The session exclusively owns the recorder handle while recording and owns
//! the finalized clip afterwards. Handles given to callers reference the clip
//! weakly, so a session reset invalidates them.
//!
//! ## Error model
//! Illegal start transitions, permission denials, and device failures are
//! reported as [`CaptureError`] values. Permission denial is recoverable; the
//! session returns to idle and the caller may retry.
//!
//! ## Security and privacy notes
//! Clip bytes never leave the session except through explicit handles.
//! Backends must not persist raw chunks to disk on their own.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use form_coach_capture::{MediaCaptureSession, RecordingState, SyntheticCameraBackend};
//!
//! let backend = Arc::new(SyntheticCameraBackend::granting());
//! let mut session = MediaCaptureSession::new(backend);
//! session.start_recording().expect("synthetic camera grants access");
//! assert_eq!(session.state(), RecordingState::Recording);
//! ```

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use form_coach_core::{ElapsedTimer, RecordedVideo, format_elapsed};
use thiserror::Error;

/// Which camera the recording session asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraFacing {
    /// Front-facing camera, used for form checks.
    #[default]
    User,
    /// Rear-facing camera.
    Environment,
}

/// Stream request passed to camera backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Preferred camera facing.
    pub facing: CameraFacing,
    /// Whether an audio track is requested.
    pub audio: bool,
}

impl StreamConstraints {
    /// Returns the constraints used for exercise capture: user-facing camera,
    /// no audio track.
    pub fn video_only() -> Self {
        Self {
            facing: CameraFacing::User,
            audio: false,
        }
    }
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self::video_only()
    }
}

/// Recording lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// No recording activity.
    Idle,
    /// Camera access has been requested and not yet answered.
    AwaitingPermission,
    /// Chunks are being captured.
    Recording,
    /// A clip has been finalized.
    Stopped,
}

/// What the preview surface should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewFeed {
    /// Nothing to show.
    Inactive,
    /// Live camera stream while recording.
    LiveStream,
    /// Playback of the finalized clip.
    FinalizedRecording,
}

/// Result of delivering one 1 Hz tick to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session is not recording; the tick was dropped.
    Ignored,
    /// The timer advanced to `elapsed_seconds`.
    Advanced {
        /// Total elapsed whole seconds.
        elapsed_seconds: u64,
    },
}

/// Trait implemented by concrete camera providers.
pub trait CameraBackend: Send + Sync {
    /// Requests camera access and starts a recorder.
    ///
    /// # Errors
    /// Returns [`CaptureError::PermissionDenied`] when the user or platform
    /// refuses access.
    /// Returns [`CaptureError::Device`] for hardware or backend failures.
    fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn RecorderHandle>, CaptureError>;
}

/// Live recorder produced by a camera backend.
///
/// The session drives the handle: `poll_chunks` on each tick, `finish` once
/// on stop, `release_tracks` exactly once per acquisition on every exit path.
pub trait RecorderHandle: Send {
    /// Drains chunks buffered since the previous poll.
    ///
    /// # Errors
    /// Returns [`CaptureError::Device`] when the device fails mid-recording.
    fn poll_chunks(&mut self) -> Result<Vec<Vec<u8>>, CaptureError>;

    /// Stops the recorder and returns its final buffered chunks.
    ///
    /// # Errors
    /// Returns [`CaptureError::Device`] when finalization fails.
    fn finish(&mut self) -> Result<Vec<Vec<u8>>, CaptureError>;

    /// Releases the underlying device tracks. Idempotent.
    fn release_tracks(&mut self);

    /// Returns `true` once the device tracks have been released.
    fn tracks_released(&self) -> bool;
}

/// Drives one camera recording from start to finalized clip.
///
/// # State machine
/// ```text
/// Idle -> AwaitingPermission -> Recording -> Stopped -> (reset) -> Idle
///              |                                 ^
///              +---- denied/device error --------+-- abort -> Idle
/// ```
/// `AwaitingPermission` spans the blocking acquisition call; stop and tick
/// requests outside `Recording` are ignored rather than failed.
pub struct MediaCaptureSession {
    backend: Arc<dyn CameraBackend>,
    state: RecordingState,
    preview: PreviewFeed,
    timer: ElapsedTimer,
    recorder: Option<Box<dyn RecorderHandle>>,
    chunks: Vec<Vec<u8>>,
    clip: Option<Arc<Vec<u8>>>,
}

impl MediaCaptureSession {
    /// Creates an idle session on top of `backend`.
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        Self {
            backend,
            state: RecordingState::Idle,
            preview: PreviewFeed::Inactive,
            timer: ElapsedTimer::new(),
            recorder: None,
            chunks: Vec::new(),
            clip: None,
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Returns what the preview surface should show.
    pub fn preview(&self) -> PreviewFeed {
        self.preview
    }

    /// Returns elapsed recording time in whole seconds.
    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.seconds()
    }

    /// Returns elapsed recording time as an `MM:SS` label.
    pub fn elapsed_label(&self) -> String {
        format_elapsed(self.timer.seconds())
    }

    /// Requests camera access and begins recording.
    ///
    /// # Errors
    /// Returns [`CaptureError::NotIdle`] unless the session is idle.
    /// Returns [`CaptureError::PermissionDenied`] or [`CaptureError::Device`]
    /// when acquisition fails; the session is back in idle state and the
    /// caller may retry.
    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        if self.state != RecordingState::Idle {
            return Err(CaptureError::NotIdle(self.state));
        }

        self.state = RecordingState::AwaitingPermission;
        match self.backend.open(&StreamConstraints::video_only()) {
            Ok(recorder) => {
                self.recorder = Some(recorder);
                self.chunks.clear();
                self.timer.reset();
                self.state = RecordingState::Recording;
                self.preview = PreviewFeed::LiveStream;
                Ok(())
            }
            Err(error) => {
                // No partial acquisition survives a failed start.
                self.state = RecordingState::Idle;
                self.preview = PreviewFeed::Inactive;
                Err(error)
            }
        }
    }

    /// Delivers one 1 Hz tick: drains recorder chunks and advances the timer.
    ///
    /// Ticks are only meaningful while recording; in every other state the
    /// tick is dropped and [`TickOutcome::Ignored`] is returned, which makes
    /// late ticks from an already-cancelled ticker harmless.
    ///
    /// # Errors
    /// Returns [`CaptureError::Device`] when the recorder fails mid-capture.
    /// The session releases the tracks and returns to idle with no clip.
    pub fn on_timer_tick(&mut self) -> Result<TickOutcome, CaptureError> {
        if self.state != RecordingState::Recording {
            return Ok(TickOutcome::Ignored);
        }

        let Some(recorder) = self.recorder.as_mut() else {
            return Err(CaptureError::Device(
                "recording state without an active recorder".to_string(),
            ));
        };

        match recorder.poll_chunks() {
            Ok(mut fresh) => {
                self.chunks.append(&mut fresh);
            }
            Err(error) => {
                self.release_acquisition();
                return Err(error);
            }
        }

        let elapsed_seconds = self.timer.advance();
        Ok(TickOutcome::Advanced { elapsed_seconds })
    }

    /// Stops recording and finalizes the clip.
    ///
    /// Outside the recording state this is a no-op returning `Ok(None)`, so
    /// double-stop and stop-before-start are safe.
    ///
    /// # Errors
    /// Returns [`CaptureError::Device`] when the recorder fails to finalize.
    /// Tracks are still released exactly once and the session returns to idle
    /// with no clip.
    pub fn stop_recording(&mut self) -> Result<Option<RecordedVideo>, CaptureError> {
        if self.state != RecordingState::Recording {
            return Ok(None);
        }

        let Some(mut recorder) = self.recorder.take() else {
            return Err(CaptureError::Device(
                "recording state without an active recorder".to_string(),
            ));
        };

        let finalization = recorder.finish();
        recorder.release_tracks();

        let mut chunks = std::mem::take(&mut self.chunks);
        match finalization {
            Ok(mut tail) => chunks.append(&mut tail),
            Err(error) => {
                self.timer.reset();
                self.state = RecordingState::Idle;
                self.preview = PreviewFeed::Inactive;
                return Err(error);
            }
        }

        let total_len = chunks.iter().map(Vec::len).sum();
        let mut blob = Vec::with_capacity(total_len);
        for chunk in chunks {
            blob.extend_from_slice(&chunk);
        }

        let clip = Arc::new(blob);
        let handle = RecordedVideo::new(&clip, self.timer.seconds());
        self.clip = Some(clip);
        self.state = RecordingState::Stopped;
        self.preview = PreviewFeed::FinalizedRecording;
        Ok(Some(handle))
    }

    /// Returns a fresh handle to the finalized clip, if one exists.
    pub fn clip_handle(&self) -> Option<RecordedVideo> {
        self.clip
            .as_ref()
            .map(|clip| RecordedVideo::new(clip, self.timer.seconds()))
    }

    /// Cancels an active recording without producing a clip.
    ///
    /// This is the teardown path for leaving the capture flow mid-recording:
    /// tracks are released, buffered chunks are discarded, and the session
    /// returns to idle. Outside an active recording it does nothing, so an
    /// already-finalized clip survives.
    pub fn abort(&mut self) {
        if self.recorder.is_some() {
            self.release_acquisition();
        }
    }

    /// Returns the session to its initial state, dropping any finalized clip.
    ///
    /// Outstanding [`RecordedVideo`] handles become stale and fail to load.
    pub fn reset(&mut self) {
        self.abort();
        self.clip = None;
        self.chunks.clear();
        self.timer.reset();
        self.state = RecordingState::Idle;
        self.preview = PreviewFeed::Inactive;
    }

    fn release_acquisition(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            recorder.release_tracks();
        }
        self.chunks.clear();
        self.timer.reset();
        self.state = RecordingState::Idle;
        self.preview = PreviewFeed::Inactive;
    }
}

/// Synthetic camera mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyntheticMode {
    Granting,
    Denying,
    FailingAfter(u64),
}

/// Deterministic camera backend for test and CI usage.
///
/// Grant, deny, and mid-stream fault behavior is fixed at construction.
/// Release bookkeeping is observable on the backend, so tests can assert
/// track release after the session has dropped its recorder handle.
#[derive(Debug)]
pub struct SyntheticCameraBackend {
    mode: SyntheticMode,
    chunk_bytes: usize,
    opened: AtomicU64,
    released: Arc<AtomicU64>,
}

impl SyntheticCameraBackend {
    /// Creates a backend that grants camera access.
    pub fn granting() -> Self {
        Self::with_mode(SyntheticMode::Granting)
    }

    /// Creates a backend that denies camera access.
    pub fn denying() -> Self {
        Self::with_mode(SyntheticMode::Denying)
    }

    /// Creates a backend whose recorder fails after `polls` successful polls.
    pub fn failing_after(polls: u64) -> Self {
        Self::with_mode(SyntheticMode::FailingAfter(polls))
    }

    fn with_mode(mode: SyntheticMode) -> Self {
        Self {
            mode,
            chunk_bytes: 256,
            opened: AtomicU64::new(0),
            released: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns how many recorders were opened.
    pub fn open_count(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    /// Returns how many opened recorders have released their tracks.
    pub fn release_count(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// Returns `true` when every opened recorder released its tracks.
    pub fn all_tracks_released(&self) -> bool {
        let opened = self.opened.load(Ordering::SeqCst);
        opened > 0 && opened == self.released.load(Ordering::SeqCst)
    }
}

impl CameraBackend for SyntheticCameraBackend {
    fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn RecorderHandle>, CaptureError> {
        if constraints.audio {
            return Err(CaptureError::Device(
                "audio tracks are not supported".to_string(),
            ));
        }

        match self.mode {
            SyntheticMode::Denying => Err(CaptureError::PermissionDenied(
                "synthetic camera is configured to deny access".to_string(),
            )),
            SyntheticMode::Granting | SyntheticMode::FailingAfter(_) => {
                self.opened.fetch_add(1, Ordering::SeqCst);
                let fail_after = match self.mode {
                    SyntheticMode::FailingAfter(polls) => Some(polls),
                    _ => None,
                };
                Ok(Box::new(SyntheticRecorderHandle {
                    sequence: 0,
                    chunk_bytes: self.chunk_bytes,
                    fail_after,
                    released: false,
                    release_ledger: Arc::clone(&self.released),
                }))
            }
        }
    }
}

struct SyntheticRecorderHandle {
    sequence: u64,
    chunk_bytes: usize,
    fail_after: Option<u64>,
    released: bool,
    release_ledger: Arc<AtomicU64>,
}

impl RecorderHandle for SyntheticRecorderHandle {
    fn poll_chunks(&mut self) -> Result<Vec<Vec<u8>>, CaptureError> {
        if let Some(limit) = self.fail_after
            && self.sequence >= limit
        {
            return Err(CaptureError::Device(
                "synthetic camera fault injected".to_string(),
            ));
        }

        self.sequence += 1;
        let byte = (self.sequence % 251) as u8;
        Ok(vec![vec![byte; self.chunk_bytes]])
    }

    fn finish(&mut self) -> Result<Vec<Vec<u8>>, CaptureError> {
        self.sequence += 1;
        let byte = (self.sequence % 251) as u8;
        Ok(vec![vec![byte; self.chunk_bytes]])
    }

    fn release_tracks(&mut self) {
        if !self.released {
            self.released = true;
            self.release_ledger.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tracks_released(&self) -> bool {
        self.released
    }
}

/// Camera backend that replays a clip file as a timed chunk stream.
///
/// This is the cross-platform way to exercise the full pipeline against a
/// real video container without host camera integration: each tick yields the
/// next slice of the file, and stop finalizes the remainder.
#[derive(Debug, Clone)]
pub struct ReplayCameraBackend {
    path: PathBuf,
    chunk_bytes: usize,
}

impl ReplayCameraBackend {
    /// Creates a replay backend over `path` with 64 KiB chunks.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            chunk_bytes: 64 * 1024,
        }
    }

    /// Creates a replay backend with a caller-chosen chunk size.
    ///
    /// # Errors
    /// Returns [`CaptureError::Device`] when `chunk_bytes == 0`.
    pub fn with_chunk_size(
        path: impl Into<PathBuf>,
        chunk_bytes: usize,
    ) -> Result<Self, CaptureError> {
        if chunk_bytes == 0 {
            return Err(CaptureError::Device(
                "replay chunk size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            path: path.into(),
            chunk_bytes,
        })
    }
}

impl CameraBackend for ReplayCameraBackend {
    fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn RecorderHandle>, CaptureError> {
        if constraints.audio {
            return Err(CaptureError::Device(
                "audio tracks are not supported".to_string(),
            ));
        }

        let bytes = std::fs::read(&self.path).map_err(|error| {
            CaptureError::Device(format!(
                "failed to read replay source {}: {error}",
                self.path.display()
            ))
        })?;

        let chunks = bytes
            .chunks(self.chunk_bytes)
            .map(<[u8]>::to_vec)
            .collect::<VecDeque<_>>();

        Ok(Box::new(ReplayRecorderHandle {
            chunks,
            released: false,
        }))
    }
}

struct ReplayRecorderHandle {
    chunks: VecDeque<Vec<u8>>,
    released: bool,
}

impl RecorderHandle for ReplayRecorderHandle {
    fn poll_chunks(&mut self) -> Result<Vec<Vec<u8>>, CaptureError> {
        Ok(self.chunks.pop_front().into_iter().collect())
    }

    fn finish(&mut self) -> Result<Vec<Vec<u8>>, CaptureError> {
        Ok(std::mem::take(&mut self.chunks).into())
    }

    fn release_tracks(&mut self) {
        self.released = true;
    }

    fn tracks_released(&self) -> bool {
        self.released
    }
}

/// Capture layer error type.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Recording can only start from the idle state.
    #[error("cannot start recording from {0:?} state")]
    NotIdle(RecordingState),
    /// Camera access was refused.
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    /// Camera hardware or backend failure.
    #[error("camera device failure: {0}")]
    Device(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for synthetic camera behavior.

    use super::*;

    #[test]
    fn synthetic_backend_streams_deterministic_chunks() {
        let backend = SyntheticCameraBackend::granting();
        let mut recorder = backend
            .open(&StreamConstraints::video_only())
            .expect("synthetic camera should grant access");

        let first = recorder.poll_chunks().expect("poll should work");
        let second = recorder.poll_chunks().expect("poll should work");
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first[0][0], second[0][0]);

        recorder.release_tracks();
        recorder.release_tracks();
        assert!(recorder.tracks_released());
        assert_eq!(backend.release_count(), 1);
    }

    #[test]
    fn synthetic_backend_denies_when_configured() {
        let backend = SyntheticCameraBackend::denying();
        let error = backend
            .open(&StreamConstraints::video_only())
            .err()
            .expect("denying backend should refuse");
        assert!(matches!(error, CaptureError::PermissionDenied(_)));
    }
}
