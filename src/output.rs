//! CLI output formatting for sessions and batch runs.
//!
//! # Output Format
//!
//! ## Session
//!
//! One line per state change, as the session reports it:
//!
//! ```text
//! Loaded 1024x768 rgb
//! Applied color-balance → 1024x768 rgb
//! Skipped equalize-histogram: requires a grayscale image
//! Applied grayscale → 1024x768 gray
//! History: color-balance → grayscale
//! ```
//!
//! ## Batch
//!
//! Files lead with their position in the sorted folder listing. Outputs,
//! skipped steps and failures are indented context:
//!
//! ```text
//! Replaying 2 steps over 3 images
//!     001 a.png → processed_a.png
//!     002 b.png
//!         Failed (decode): Failed to decode b.png: ...
//!     003 gray.png → processed_gray.png
//!         Skipped grayscale: image is already grayscale
//!
//! 2 succeeded, 1 failed, 0 cancelled, 1 step skipped
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchReport, FailureStage, FileOutcome, FileReport};
use crate::imaging::{Channels, ImageBuffer};
use crate::session::{ChangeKind, StateChange};
use crate::transform::TransformName;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Four spaces per level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1024x768 rgb`
fn shape(buffer: &ImageBuffer) -> String {
    let layout = match buffer.channels() {
        Channels::Gray => "gray",
        Channels::Rgb => "rgb",
    };
    format!("{}x{} {}", buffer.width(), buffer.height(), layout)
}

/// File name only, falling back to the full path.
fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

// ============================================================================
// Session output
// ============================================================================

/// Format a session state change as display lines.
pub fn format_state_change(change: &StateChange<'_>) -> Vec<String> {
    let line = match change.kind {
        ChangeKind::Loaded => format!("Loaded {}", shape(change.view)),
        ChangeKind::Applied(name) => format!("Applied {} \u{2192} {}", name, shape(change.view)),
        ChangeKind::Skipped(name, reason) => format!("Skipped {name}: {reason}"),
        ChangeKind::Reverted => format!("Reverted to original {}", shape(change.view)),
    };
    vec![line]
}

pub fn format_history(history: &[TransformName]) -> Vec<String> {
    if history.is_empty() {
        return vec!["History: (empty)".to_string()];
    }
    let steps: Vec<&str> = history.iter().map(|t| t.as_str()).collect();
    vec![format!("History: {}", steps.join(" \u{2192} "))]
}

pub fn print_state_change(change: &StateChange<'_>) {
    for line in format_state_change(change) {
        println!("{}", line);
    }
}

pub fn print_history(history: &[TransformName]) {
    for line in format_history(history) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch output
// ============================================================================

/// Format one file's outcome: header line plus indented context.
pub fn format_file_report(index: usize, report: &FileReport) -> Vec<String> {
    let name = file_label(&report.input);
    let header = format!("{}{:03} {}", indent(1), index + 1, name);
    let context = indent(2);

    match &report.outcome {
        FileOutcome::Succeeded { output, skipped } => {
            let mut lines = vec![format!("{header} \u{2192} {}", file_label(output))];
            for step in skipped {
                lines.push(format!(
                    "{context}Skipped {}: {}",
                    step.transform, step.reason
                ));
            }
            lines
        }
        FileOutcome::Failed { stage, reason } => {
            let stage = match stage {
                FailureStage::Decode => "decode",
                FailureStage::Encode => "encode",
            };
            vec![header, format!("{context}Failed ({stage}): {reason}")]
        }
        FileOutcome::Cancelled => vec![header, format!("{context}Cancelled")],
    }
}

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent, steps: usize) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => vec![format!(
            "Replaying {} over {}",
            plural(steps, "step"),
            plural(*total, "image")
        )],
        BatchEvent::FileFinished { index, report } => format_file_report(*index, report),
    }
}

/// Format the closing summary of a batch run.
pub fn format_batch_summary(report: &BatchReport) -> Vec<String> {
    if let Some(error) = &report.folder_error {
        return vec![format!(
            "Cannot read folder {}: {}",
            report.folder.display(),
            error
        )];
    }
    if report.total == 0 {
        return vec![format!("No images found in {}", report.folder.display())];
    }
    vec![format!(
        "{} succeeded, {} failed, {} cancelled, {} skipped",
        report.succeeded,
        report.failed,
        report.cancelled,
        plural(report.skipped_steps, "step")
    )]
}

pub fn print_batch_event(event: &BatchEvent, steps: usize) {
    for line in format_batch_event(event, steps) {
        println!("{}", line);
    }
}

pub fn print_batch_summary(report: &BatchReport) {
    for line in format_batch_summary(report) {
        println!("{}", line);
    }
}
