//! Session controller: tracks one photo from selection to result.
//!
//! A [`Session`] owns the status machine
//!
//! ```text
//! Idle --select--> Reading --read ok--> Generating --call ok--> Success
//!                     |                     |
//!                     +------ failure ------+--> Error
//! ```
//!
//! `reset()` returns to `Idle` from any state and cancels whatever is in
//! flight. Selecting a new file from `Success` or `Error` starts over.

use crate::error::{ProPhotoError, Result, INVALID_FILE_MESSAGE};
use crate::image::{is_image_media_type, media_type_for_path, TransformationResult, UploadedImage};
use crate::transform::Transformer;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// File name used when saving the transformed image.
pub const DOWNLOAD_FILE_NAME: &str = "professional-headshot.png";

/// Where the session is in the transformation flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Nothing selected.
    #[default]
    Idle,
    /// Reading and encoding the selected file.
    Reading,
    /// Waiting on the image model.
    Generating,
    /// A result is available.
    Success,
    /// The last attempt failed.
    Error,
}

impl SessionStatus {
    /// Returns true while an attempt is running.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Reading | Self::Generating)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Reading => write!(f, "reading"),
            Self::Generating => write!(f, "generating"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A file picked by the user.
pub enum FileSelection {
    /// A file on disk; its media type is inferred from the extension.
    Path(PathBuf),
    /// Bytes already in memory with a declared media type.
    Memory {
        /// Display name.
        name: String,
        /// Declared media type.
        media_type: String,
        /// File contents.
        bytes: Vec<u8>,
    },
    /// A stream read to the end when the attempt starts.
    Reader {
        /// Display name.
        name: String,
        /// Declared media type.
        media_type: String,
        /// Source of the file contents.
        reader: Box<dyn AsyncRead + Send + Unpin>,
    },
}

impl std::fmt::Debug for FileSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Memory {
                name,
                media_type,
                bytes,
            } => f
                .debug_struct("Memory")
                .field("name", name)
                .field("media_type", media_type)
                .field("len", &bytes.len())
                .finish(),
            Self::Reader {
                name, media_type, ..
            } => f
                .debug_struct("Reader")
                .field("name", name)
                .field("media_type", media_type)
                .finish_non_exhaustive(),
        }
    }
}

impl FileSelection {
    /// Selects a file on disk.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Selects in-memory bytes.
    pub fn memory(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Memory {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Selects a stream, such as an upload body.
    pub fn reader(
        name: impl Into<String>,
        media_type: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self::Reader {
            name: name.into(),
            media_type: media_type.into(),
            reader: Box::new(reader),
        }
    }

    /// Display name of the file.
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::Memory { name, .. } | Self::Reader { name, .. } => name.clone(),
        }
    }

    /// Declared media type of the file.
    pub fn media_type(&self) -> &str {
        match self {
            Self::Path(path) => media_type_for_path(path),
            Self::Memory { media_type, .. } | Self::Reader { media_type, .. } => media_type,
        }
    }

    async fn read(self) -> Result<UploadedImage> {
        let name = self.name();
        match self {
            Self::Path(path) => {
                let media_type = media_type_for_path(&path);
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| ProPhotoError::ReadFailure(format!("{}: {e}", path.display())))?;
                UploadedImage::new(name, media_type, bytes)
            }
            Self::Memory {
                media_type, bytes, ..
            } => UploadedImage::new(name, media_type, bytes),
            Self::Reader {
                media_type,
                mut reader,
                ..
            } => {
                let mut bytes = Vec::new();
                reader
                    .read_to_end(&mut bytes)
                    .await
                    .map_err(|e| ProPhotoError::ReadFailure(format!("{name}: {e}")))?;
                UploadedImage::new(name, media_type, bytes)
            }
        }
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Current status.
    pub status: SessionStatus,
    /// User-facing error text, set only in `Error`.
    pub error: Option<String>,
    /// Result, set only in `Success`.
    pub result: Option<TransformationResult>,
    /// Name of the selected file, if any.
    pub file_name: Option<String>,
}

#[derive(Default)]
struct SessionState {
    snapshot: SessionSnapshot,
    attempt: u64,
    cancel: Option<CancellationToken>,
}

/// Drives one user's photo through selection, transformation and download.
///
/// Cloning yields another handle to the same session, so a front end can
/// call [`Session::reset`] while [`Session::select_file`] is suspended.
pub struct Session<T> {
    transformer: Arc<T>,
    state: Arc<Mutex<SessionState>>,
    status_tx: Arc<watch::Sender<SessionStatus>>,
}

impl<T> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            transformer: Arc::clone(&self.transformer),
            state: Arc::clone(&self.state),
            status_tx: Arc::clone(&self.status_tx),
        }
    }
}

impl<T: Transformer> Session<T> {
    /// Creates an idle session backed by `transformer`.
    pub fn new(transformer: T) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Idle);
        Self {
            transformer: Arc::new(transformer),
            state: Arc::new(Mutex::new(SessionState::default())),
            status_tx: Arc::new(status_tx),
        }
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.lock().snapshot.status
    }

    /// Copy of the full session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot.clone()
    }

    /// Receiver notified on every status transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// Selects a file and runs it through the transformer.
    ///
    /// Returns once the attempt reaches `Success` or `Error`. The error value
    /// carries the detailed cause; the session itself only keeps the
    /// user-facing message. Fails with [`ProPhotoError::Busy`] without touching
    /// the running attempt if one is in flight, and with
    /// [`ProPhotoError::Cancelled`] if [`Session::reset`] interrupts it.
    pub async fn select_file(&self, file: FileSelection) -> Result<()> {
        let media_type = file.media_type().to_string();
        let (attempt, cancel) = {
            let mut state = self.lock();
            if state.snapshot.status.is_busy() {
                return Err(ProPhotoError::Busy);
            }

            if !is_image_media_type(&media_type) {
                tracing::warn!(media_type = %media_type, "rejected non-image file");
                state.attempt += 1;
                state.cancel = None;
                state.snapshot = SessionSnapshot {
                    status: SessionStatus::Error,
                    error: Some(INVALID_FILE_MESSAGE.to_string()),
                    result: None,
                    file_name: Some(file.name()),
                };
                self.publish(SessionStatus::Error);
                return Err(ProPhotoError::InvalidInput(format!(
                    "unsupported media type '{media_type}'"
                )));
            }

            state.attempt += 1;
            let cancel = CancellationToken::new();
            state.cancel = Some(cancel.clone());
            state.snapshot = SessionSnapshot {
                status: SessionStatus::Reading,
                error: None,
                result: None,
                file_name: Some(file.name()),
            };
            self.publish(SessionStatus::Reading);
            (state.attempt, cancel)
        };

        tracing::info!(attempt, media_type = %media_type, "reading selected file");
        let outcome = self.run_attempt(attempt, &cancel, file, &media_type).await;
        self.finish(attempt, outcome)
    }

    async fn run_attempt(
        &self,
        attempt: u64,
        cancel: &CancellationToken,
        file: FileSelection,
        media_type: &str,
    ) -> Result<TransformationResult> {
        let upload = tokio::select! {
            _ = cancel.cancelled() => return Err(ProPhotoError::Cancelled),
            upload = file.read() => upload?,
        };
        let original = upload.encode();

        {
            let mut state = self.lock();
            if state.attempt != attempt {
                return Err(ProPhotoError::Cancelled);
            }
            state.snapshot.status = SessionStatus::Generating;
            self.publish(SessionStatus::Generating);
        }
        tracing::info!(
            attempt,
            transformer = self.transformer.name(),
            bytes = upload.bytes().len(),
            "generating headshot"
        );

        let transformed = tokio::select! {
            _ = cancel.cancelled() => return Err(ProPhotoError::Cancelled),
            transformed = self.transformer.transform(&original, media_type) => transformed?,
        };
        Ok(TransformationResult::new(original, transformed))
    }

    fn finish(&self, attempt: u64, outcome: Result<TransformationResult>) -> Result<()> {
        let mut state = self.lock();
        if state.attempt != attempt {
            tracing::debug!(attempt, "discarding result of a reset attempt");
            return Err(ProPhotoError::Cancelled);
        }
        state.cancel = None;

        match outcome {
            Ok(result) => {
                state.snapshot.status = SessionStatus::Success;
                state.snapshot.error = None;
                state.snapshot.result = Some(result);
                self.publish(SessionStatus::Success);
                tracing::info!(attempt, "headshot ready");
                Ok(())
            }
            Err(e) => {
                if e.is_external() {
                    tracing::error!(attempt, kind = e.kind(), "transformation failed: {e}");
                } else {
                    tracing::warn!(attempt, kind = e.kind(), "attempt failed: {e}");
                }
                state.snapshot.status = SessionStatus::Error;
                state.snapshot.error = Some(e.user_message().to_string());
                state.snapshot.result = None;
                self.publish(SessionStatus::Error);
                Err(e)
            }
        }
    }

    /// Returns to `Idle`, clearing result and error and cancelling any
    /// in-flight read or request. Always legal.
    pub fn reset(&self) {
        let mut state = self.lock();
        if let Some(cancel) = state.cancel.take() {
            tracing::info!(attempt = state.attempt, "cancelling in-flight attempt");
            cancel.cancel();
        }
        state.attempt += 1;
        state.snapshot = SessionSnapshot::default();
        self.publish(SessionStatus::Idle);
    }

    /// Saves the transformed image into `dir` as [`DOWNLOAD_FILE_NAME`].
    ///
    /// Returns `Ok(None)` when there is no result to save.
    pub async fn download_result(&self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let Some(result) = self.lock().snapshot.result.clone() else {
            return Ok(None);
        };
        let bytes = result.transformed().decode()?;
        let path = dir.as_ref().join(DOWNLOAD_FILE_NAME);
        tokio::fs::write(&path, &bytes).await?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "saved headshot");
        Ok(Some(path))
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, status: SessionStatus) {
        self.status_tx.send_replace(status);
    }
}
