//! Interactive editing session: current image, original image, history.
//!
//! An [`ImageSession`] is what a front end drives while a user works on one
//! picture. It holds three pieces of state:
//!
//! - **current**: the buffer as it looks now
//! - **original**: an independent copy taken at load time, never touched until
//!   the next load
//! - **history**: the transforms successfully applied to `current`, in order,
//!   since the last load or revert
//!
//! Every mutating call (load, apply, revert) ends by notifying the registered
//! [`SessionObserver`], including applies that were skipped, so a UI can
//! redraw and tell the user why nothing happened.
//!
//! Failures (`NoImageLoaded`, decode and encode errors) leave all three slots
//! exactly as they were.
//!
//! ## Replaying over a folder
//!
//! A session never runs the batch itself. [`ImageSession::replay_over_folder`]
//! hands a [`snapshot_history`](ImageSession::snapshot_history) copy and the
//! source folder to a [`BatchReplayer`], which works on freshly decoded
//! buffers. The session stays free to change while a batch is in flight on
//! another thread.

use crate::batch::{BatchEvent, BatchReplayer, BatchReport, CancelToken};
use crate::imaging::{CodecError, ImageBackend, ImageBuffer, RustBackend};
use crate::transform::{SkipReason, TransformName, TransformOutcome, TransformRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No image loaded")]
    NoImageLoaded,
    #[error("Session image was not opened from a file, so it has no folder to replay over")]
    NoSourceFolder,
    #[error("Could not load image: {0}")]
    Decode(#[source] CodecError),
    #[error("Could not save image: {0}")]
    Encode(#[source] CodecError),
}

/// Result of a successful [`ImageSession::apply_transform`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// `current` was replaced and the transform appended to history.
    Applied,
    /// The transform does not fit the current buffer; nothing changed.
    Skipped(SkipReason),
}

/// What a state-change notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Loaded,
    Applied(TransformName),
    Skipped(TransformName, SkipReason),
    Reverted,
}

/// Notification payload: what happened plus everything needed to redraw.
#[derive(Debug, Clone, Copy)]
pub struct StateChange<'a> {
    pub kind: ChangeKind,
    /// The buffer as it looks after the change.
    pub view: &'a ImageBuffer,
    pub history: &'a [TransformName],
}

/// Receives a [`StateChange`] after every load, apply (applied or skipped) and revert.
pub trait SessionObserver: Send {
    fn state_changed(&self, change: &StateChange<'_>);
}

impl<F> SessionObserver for F
where
    F: Fn(&StateChange<'_>) + Send,
{
    fn state_changed(&self, change: &StateChange<'_>) {
        self(change)
    }
}

pub struct ImageSession<B: ImageBackend = RustBackend> {
    backend: B,
    registry: Arc<TransformRegistry>,
    current: Option<ImageBuffer>,
    original: Option<ImageBuffer>,
    history: Vec<TransformName>,
    source: Option<PathBuf>,
    observer: Option<Box<dyn SessionObserver>>,
}

impl ImageSession<RustBackend> {
    pub fn new(registry: Arc<TransformRegistry>) -> Self {
        Self::with_backend(RustBackend::new(), registry)
    }
}

impl<B: ImageBackend> ImageSession<B> {
    /// Create an empty session using a specific codec backend (allows testing with mock).
    pub fn with_backend(backend: B, registry: Arc<TransformRegistry>) -> Self {
        Self {
            backend,
            registry,
            current: None,
            original: None,
            history: Vec::new(),
            source: None,
            observer: None,
        }
    }

    /// Register the observer, replacing any previous one.
    pub fn set_observer(&mut self, observer: impl SessionObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Start over from an already decoded buffer.
    pub fn load(&mut self, buffer: ImageBuffer) {
        self.original = Some(buffer.clone());
        self.current = Some(buffer);
        self.history.clear();
        self.source = None;
        debug!("buffer loaded");
        self.notify(ChangeKind::Loaded);
    }

    /// Decode `path` and load it. On failure the session is left untouched.
    pub fn open(&mut self, path: &Path) -> Result<(), SessionError> {
        let buffer = self.backend.decode(path).map_err(SessionError::Decode)?;
        info!(path = %path.display(), width = buffer.width(), height = buffer.height(), "opened image");
        self.load(buffer);
        self.source = Some(path.to_path_buf());
        Ok(())
    }

    /// Run `name` on the current buffer.
    ///
    /// A skipped transform is `Ok(ApplyOutcome::Skipped(_))`: the buffer and
    /// history are unchanged but the observer is still told about it.
    pub fn apply_transform(&mut self, name: TransformName) -> Result<ApplyOutcome, SessionError> {
        let current = self.current.as_ref().ok_or(SessionError::NoImageLoaded)?;

        match self.registry.apply(name, current) {
            TransformOutcome::Applied(next) => {
                self.current = Some(next);
                self.history.push(name);
                self.notify(ChangeKind::Applied(name));
                Ok(ApplyOutcome::Applied)
            }
            TransformOutcome::Skipped(reason) => {
                self.notify(ChangeKind::Skipped(name, reason));
                Ok(ApplyOutcome::Skipped(reason))
            }
        }
    }

    /// Throw away every applied transform and return to the loaded image.
    pub fn revert(&mut self) -> Result<(), SessionError> {
        let original = self.original.as_ref().ok_or(SessionError::NoImageLoaded)?;
        self.current = Some(original.clone());
        debug!(discarded = self.history.len(), "reverted to original");
        self.history.clear();
        self.notify(ChangeKind::Reverted);
        Ok(())
    }

    /// Encode the current buffer to `path`; the extension picks the format.
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let current = self.current.as_ref().ok_or(SessionError::NoImageLoaded)?;
        self.backend
            .encode(current, path)
            .map_err(SessionError::Encode)?;
        info!(path = %path.display(), "saved image");
        Ok(())
    }

    /// Independent copy of the history, safe to hand to a batch run.
    pub fn snapshot_history(&self) -> Vec<TransformName> {
        self.history.clone()
    }

    /// Replay the current history over every image in the folder the session
    /// image was opened from.
    pub fn replay_over_folder<R: ImageBackend>(
        &self,
        replayer: &BatchReplayer<R>,
        cancel: &CancelToken,
        events: Option<Sender<BatchEvent>>,
    ) -> Result<BatchReport, SessionError> {
        let source = match (&self.source, &self.current) {
            (Some(source), _) => source,
            (None, Some(_)) => return Err(SessionError::NoSourceFolder),
            (None, None) => return Err(SessionError::NoImageLoaded),
        };
        let folder = source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Ok(replayer.run_with(folder, &self.snapshot_history(), cancel, events))
    }

    pub fn current(&self) -> Option<&ImageBuffer> {
        self.current.as_ref()
    }

    pub fn original(&self) -> Option<&ImageBuffer> {
        self.original.as_ref()
    }

    pub fn history(&self) -> &[TransformName] {
        &self.history
    }

    /// File the session image was opened from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    fn notify(&self, kind: ChangeKind) {
        if let (Some(observer), Some(current)) = (&self.observer, &self.current) {
            observer.state_changed(&StateChange {
                kind,
                view: current,
                history: &self.history,
            });
        }
    }
}
