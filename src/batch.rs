//! Batch replay of a transform sequence over a folder.
//!
//! The replayer takes a folder and a list of [`TransformName`]s (usually a
//! session's [`snapshot_history`](crate::session::ImageSession::snapshot_history))
//! and runs the list against every image in the folder. Each image is
//! decoded fresh, transformed through the shared registry and written next to
//! its input under a prefixed name:
//!
//! ```text
//! photos/
//! ├── beach.jpg
//! ├── processed_beach.jpg     ← written by the batch
//! ├── scan.png
//! └── processed_scan.png      ← written by the batch
//! ```
//!
//! ## Failure isolation
//!
//! A file that cannot be decoded or written is recorded as
//! [`FileOutcome::Failed`] and the batch moves on. Nothing a single file does
//! aborts the run, and `run` itself never returns an error: even an
//! unreadable folder comes back as a [`BatchReport`] with `folder_error` set.
//!
//! ## Parallel Processing
//!
//! Files are processed on the rayon pool. Results are collected in input
//! order, so the report is stable regardless of which worker finished first.
//! Progress is streamed as [`BatchEvent`]s over an optional channel while the
//! run is in flight.
//!
//! ## Cancellation
//!
//! A [`CancelToken`] is checked before each file starts. Files that had not
//! started when it fired are reported as [`FileOutcome::Cancelled`]; outputs
//! already written stay on disk.

use crate::imaging::{ImageBackend, RustBackend, is_supported_image};
use crate::naming::{self, DEFAULT_OUTPUT_PREFIX};
use crate::transform::{SkipReason, TransformName, TransformOutcome, TransformRegistry};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    /// Prepended to each input file name to form the output name.
    pub output_prefix: String,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
        }
    }
}

/// Shared stop flag for a running batch. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Which half of the per-file work failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Decode,
    Encode,
}

/// A sequence step that did not fit the image it was replayed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedStep {
    pub transform: TransformName,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileOutcome {
    Succeeded {
        output: PathBuf,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        skipped: Vec<SkippedStep>,
    },
    Failed {
        stage: FailureStage,
        reason: String,
    },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Summary of one batch run. Files appear in enumeration (sorted) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub folder: PathBuf,
    pub sequence: Vec<TransformName>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Skipped steps summed over all succeeded files.
    pub skipped_steps: usize,
    pub files: Vec<FileReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_error: Option<String>,
}

impl BatchReport {
    fn from_files(folder: &Path, sequence: &[TransformName], files: Vec<FileReport>) -> Self {
        let mut report = Self::empty(folder, sequence);
        report.total = files.len();
        for file in &files {
            match &file.outcome {
                FileOutcome::Succeeded { skipped, .. } => {
                    report.succeeded += 1;
                    report.skipped_steps += skipped.len();
                }
                FileOutcome::Failed { .. } => report.failed += 1,
                FileOutcome::Cancelled => report.cancelled += 1,
            }
        }
        report.files = files;
        report
    }

    fn empty(folder: &Path, sequence: &[TransformName]) -> Self {
        Self {
            folder: folder.to_path_buf(),
            sequence: sequence.to_vec(),
            total: 0,
            succeeded: 0,
            failed: 0,
            cancelled: 0,
            skipped_steps: 0,
            files: Vec::new(),
            folder_error: None,
        }
    }

    /// True when every considered file was written.
    pub fn is_clean(&self) -> bool {
        self.folder_error.is_none() && self.failed == 0 && self.cancelled == 0
    }
}

/// Progress notifications for a running batch.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started { total: usize },
    /// `index` is the file's position in the sorted input list.
    FileFinished { index: usize, report: FileReport },
}

pub struct BatchReplayer<B: ImageBackend = RustBackend> {
    backend: B,
    registry: Arc<TransformRegistry>,
    settings: BatchSettings,
}

impl BatchReplayer<RustBackend> {
    pub fn new(registry: Arc<TransformRegistry>, settings: BatchSettings) -> Self {
        Self::with_backend(RustBackend::new(), registry, settings)
    }
}

impl<B: ImageBackend> BatchReplayer<B> {
    /// Create a replayer using a specific codec backend (allows testing with mock).
    pub fn with_backend(backend: B, registry: Arc<TransformRegistry>, settings: BatchSettings) -> Self {
        Self {
            backend,
            registry,
            settings,
        }
    }

    /// Replay `sequence` over every image in `folder`.
    pub fn run(&self, folder: &Path, sequence: &[TransformName]) -> BatchReport {
        self.run_with(folder, sequence, &CancelToken::new(), None)
    }

    /// [`run`](Self::run) with cancellation and progress events.
    ///
    /// The event sender is dropped when the run returns, so a receiver loop
    /// on another thread ends on its own.
    pub fn run_with(
        &self,
        folder: &Path,
        sequence: &[TransformName],
        cancel: &CancelToken,
        events: Option<Sender<BatchEvent>>,
    ) -> BatchReport {
        let inputs = match collect_inputs(folder, &self.settings.output_prefix) {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!(folder = %folder.display(), error = %e, "cannot list batch folder");
                let mut report = BatchReport::empty(folder, sequence);
                report.folder_error = Some(e.to_string());
                return report;
            }
        };

        info!(
            folder = %folder.display(),
            files = inputs.len(),
            steps = sequence.len(),
            "batch started"
        );
        if let Some(tx) = &events {
            tx.send(BatchEvent::Started {
                total: inputs.len(),
            })
            .ok();
        }

        let files: Vec<FileReport> = inputs
            .par_iter()
            .enumerate()
            .map_with(events, |events, (index, input)| {
                let outcome = if cancel.is_cancelled() {
                    debug!(input = %input.display(), "cancelled before start");
                    FileOutcome::Cancelled
                } else {
                    self.replay_file(input, sequence)
                };
                let report = FileReport {
                    input: input.clone(),
                    outcome,
                };
                if let Some(tx) = events {
                    tx.send(BatchEvent::FileFinished {
                        index,
                        report: report.clone(),
                    })
                    .ok();
                }
                report
            })
            .collect();

        let report = BatchReport::from_files(folder, sequence, files);
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            cancelled = report.cancelled,
            "batch finished"
        );
        report
    }

    /// Decode, transform and encode one file.
    fn replay_file(&self, input: &Path, sequence: &[TransformName]) -> FileOutcome {
        let mut buffer = match self.backend.decode(input) {
            Ok(buffer) => buffer,
            Err(e) => return failed(input, FailureStage::Decode, e.to_string()),
        };

        let mut skipped = Vec::new();
        for &name in sequence {
            match self.registry.apply(name, &buffer) {
                TransformOutcome::Applied(next) => buffer = next,
                TransformOutcome::Skipped(reason) => skipped.push(SkippedStep {
                    transform: name,
                    reason,
                }),
            }
        }

        let Some(output) = naming::output_path(input, &self.settings.output_prefix) else {
            return failed(input, FailureStage::Encode, "input has no file name".to_string());
        };
        if let Err(e) = self.backend.encode(&buffer, &output) {
            return failed(input, FailureStage::Encode, e.to_string());
        }

        debug!(input = %input.display(), output = %output.display(), skipped = skipped.len(), "file done");
        FileOutcome::Succeeded { output, skipped }
    }
}

fn failed(input: &Path, stage: FailureStage, reason: String) -> FileOutcome {
    warn!(input = %input.display(), ?stage, %reason, "file failed");
    FileOutcome::Failed { stage, reason }
}

/// Images in `folder` a batch should process, sorted.
///
/// Non-recursive. Only regular files with a supported extension; anything
/// already carrying `prefix` is a prior output and left alone.
pub fn collect_inputs(folder: &Path, prefix: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut inputs: Vec<PathBuf> = fs::read_dir(folder)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_supported_image(p) && !naming::is_prior_output(p, prefix))
        .collect();

    inputs.sort();
    Ok(inputs)
}
