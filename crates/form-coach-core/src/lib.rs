#![warn(missing_docs)]
//! # form-coach-core
//!
//! ## Purpose
//! Defines the pure data model used across the `form-coach` workspace.
//!
//! ## Responsibilities
//! - Represent the active video source (recorded clip or uploaded file).
//! - Enforce that at most one video source is selected at a time.
//! - Resolve a selected source into a submission-ready payload.
//! - Track and format elapsed recording time.
//!
//! ## Data flow
//! Capture code emits a [`RecordedVideo`] handle, or the user picks an
//! [`UploadedVideo`] file. Either enters [`VideoSourceResolver`], which yields
//! a [`ResolvedVideo`] that loads bytes into a [`VideoPayload`] at submission
//! time.
//!
//! ## Ownership and lifetimes
//! Recorded clip bytes stay owned by the capture session; [`RecordedVideo`]
//! holds a weak handle so a session reset invalidates stale selections instead
//! of silently resurrecting old footage. Uploaded files are read lazily from
//! disk, so selection never buffers bytes ahead of submission.
//!
//! ## Error model
//! Missing selection, invalidated recordings, and unreadable upload files
//! return [`CoreError`] variants with caller-actionable categorization.
//!
//! ## Security and privacy notes
//! This crate never logs video bytes or file contents. Upload paths appear in
//! errors verbatim because the user chose them.
//!
//! ## Example
//! ```rust
//! use form_coach_core::{UploadedVideo, VideoSourceResolver, format_elapsed};
//!
//! let mut resolver = VideoSourceResolver::new();
//! resolver.select_upload(UploadedVideo::new("squat-set.mp4"));
//! let resolved = resolver.resolve().expect("an upload is selected");
//! assert_eq!(resolved.filename(), "video.mp4");
//! assert_eq!(format_elapsed(65), "01:05");
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use thiserror::Error;

/// Filename presented to the analysis service for recorded clips.
pub const RECORDED_FILENAME: &str = "video.webm";

/// MIME type of recorded clips.
pub const RECORDED_MIME: &str = "video/webm";

/// Filename presented to the analysis service for uploaded files.
pub const UPLOADED_FILENAME: &str = "video.mp4";

/// MIME type of uploaded files.
pub const UPLOADED_MIME: &str = "video/mp4";

/// Whole-second recording timer driven by external 1 Hz ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElapsedTimer {
    seconds: u64,
}

impl ElapsedTimer {
    /// Creates a timer at zero seconds.
    pub fn new() -> Self {
        Self { seconds: 0 }
    }

    /// Resets the timer to zero seconds.
    pub fn reset(&mut self) {
        self.seconds = 0;
    }

    /// Advances the timer by one second and returns the new total.
    pub fn advance(&mut self) -> u64 {
        self.seconds = self.seconds.saturating_add(1);
        self.seconds
    }

    /// Returns elapsed whole seconds.
    pub fn seconds(&self) -> u64 {
        self.seconds
    }
}

/// Formats whole seconds as a zero-padded `MM:SS` label.
///
/// Minutes are not wrapped at the hour, so `3_661` renders as `61:01`.
pub fn format_elapsed(total_seconds: u64) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

/// Handle to a clip finalized by the capture session.
///
/// The handle does not own the clip bytes. It holds a weak reference into the
/// owning session, so resetting the session invalidates every outstanding
/// handle and a later submission fails loudly instead of sending stale
/// footage.
#[derive(Debug, Clone)]
pub struct RecordedVideo {
    blob: Weak<Vec<u8>>,
    duration_seconds: u64,
}

impl RecordedVideo {
    /// Creates a handle borrowing from the session-owned clip buffer.
    pub fn new(blob: &Arc<Vec<u8>>, duration_seconds: u64) -> Self {
        Self {
            blob: Arc::downgrade(blob),
            duration_seconds,
        }
    }

    /// Returns recorded duration in whole seconds.
    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    /// Returns `true` while the owning session still holds the clip.
    pub fn is_available(&self) -> bool {
        self.blob.strong_count() > 0
    }

    fn load_bytes(&self) -> Result<Vec<u8>, CoreError> {
        let blob = self.blob.upgrade().ok_or(CoreError::RecordingGone)?;
        Ok(blob.as_ref().clone())
    }
}

/// Reference to a user-chosen video file on disk.
///
/// The file is read at submission time, never at selection time, so a file
/// that disappears in between surfaces as a read error rather than stale
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedVideo {
    path: PathBuf,
}

impl UploadedVideo {
    /// Creates an upload reference for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the chosen file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_bytes(&self) -> Result<Vec<u8>, CoreError> {
        std::fs::read(&self.path).map_err(|source| CoreError::UploadRead {
            path: self.path.clone(),
            source,
        })
    }
}

/// The video the user currently intends to submit.
#[derive(Debug, Clone, Default)]
pub enum VideoSource {
    /// Nothing selected yet.
    #[default]
    None,
    /// A clip finalized by the capture session.
    Recorded(RecordedVideo),
    /// A file picked from disk.
    Uploaded(UploadedVideo),
}

impl VideoSource {
    /// Returns `true` when a recorded clip or uploaded file is selected.
    pub fn is_selected(&self) -> bool {
        !matches!(self, VideoSource::None)
    }
}

/// Reconciles the recorded-vs-uploaded choice into one submission source.
///
/// Selection is last-write-wins: picking an upload discards a prior recording
/// selection and vice versa. The exclusivity is structural; the resolver
/// stores exactly one [`VideoSource`] value.
#[derive(Debug, Clone, Default)]
pub struct VideoSourceResolver {
    source: VideoSource,
}

impl VideoSourceResolver {
    /// Creates a resolver with no source selected.
    pub fn new() -> Self {
        Self {
            source: VideoSource::None,
        }
    }

    /// Returns the current selection.
    pub fn source(&self) -> &VideoSource {
        &self.source
    }

    /// Selects a recorded clip, replacing any uploaded-file selection.
    pub fn select_recorded(&mut self, recording: RecordedVideo) {
        self.source = VideoSource::Recorded(recording);
    }

    /// Selects an uploaded file, replacing any recorded-clip selection.
    pub fn select_upload(&mut self, upload: UploadedVideo) {
        self.source = VideoSource::Uploaded(upload);
    }

    /// Clears the selection back to [`VideoSource::None`].
    pub fn clear(&mut self) {
        self.source = VideoSource::None;
    }

    /// Resolves the selection into a submission-ready source.
    ///
    /// # Errors
    /// Returns [`CoreError::NoVideoSelected`] when nothing is selected.
    pub fn resolve(&self) -> Result<ResolvedVideo, CoreError> {
        ResolvedVideo::try_from(&self.source)
    }
}

/// A non-empty video selection with its wire identity fixed.
#[derive(Debug, Clone)]
pub enum ResolvedVideo {
    /// Recorded clip, submitted as `video.webm`.
    Recorded(RecordedVideo),
    /// Uploaded file, submitted as `video.mp4`.
    Uploaded(UploadedVideo),
}

impl TryFrom<&VideoSource> for ResolvedVideo {
    type Error = CoreError;

    fn try_from(source: &VideoSource) -> Result<Self, Self::Error> {
        match source {
            VideoSource::None => Err(CoreError::NoVideoSelected),
            VideoSource::Recorded(recording) => Ok(ResolvedVideo::Recorded(recording.clone())),
            VideoSource::Uploaded(upload) => Ok(ResolvedVideo::Uploaded(upload.clone())),
        }
    }
}

impl ResolvedVideo {
    /// Returns the filename attached to the multipart part.
    pub fn filename(&self) -> &'static str {
        match self {
            ResolvedVideo::Recorded(_) => RECORDED_FILENAME,
            ResolvedVideo::Uploaded(_) => UPLOADED_FILENAME,
        }
    }

    /// Returns the MIME type attached to the multipart part.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ResolvedVideo::Recorded(_) => RECORDED_MIME,
            ResolvedVideo::Uploaded(_) => UPLOADED_MIME,
        }
    }

    /// Loads the video bytes into an owned payload.
    ///
    /// # Errors
    /// Returns [`CoreError::RecordingGone`] when the capture session that owns
    /// the clip was reset.
    /// Returns [`CoreError::UploadRead`] when the chosen file cannot be read.
    pub fn load(&self) -> Result<VideoPayload, CoreError> {
        let bytes = match self {
            ResolvedVideo::Recorded(recording) => recording.load_bytes()?,
            ResolvedVideo::Uploaded(upload) => upload.load_bytes()?,
        };

        Ok(VideoPayload {
            filename: self.filename().to_string(),
            mime_type: self.mime_type().to_string(),
            bytes,
        })
    }
}

/// Fully materialized video bytes ready for multipart submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPayload {
    /// Filename reported to the analysis service.
    pub filename: String,
    /// MIME type reported to the analysis service.
    pub mime_type: String,
    /// Raw video container bytes.
    pub bytes: Vec<u8>,
}

/// Error type for video source selection and payload loading.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Submission was attempted with nothing selected.
    #[error("no video selected: record a clip or pick a file first")]
    NoVideoSelected,
    /// The capture session owning the selected clip was reset.
    #[error("recorded clip is no longer available")]
    RecordingGone,
    /// The selected upload file could not be read.
    #[error("failed to read upload {}: {source}", .path.display())]
    UploadRead {
        /// Path of the unreadable file.
        path: PathBuf,
        /// Underlying filesystem error.
        source: std::io::Error,
    },
}
