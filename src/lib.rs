//! # Retouch
//!
//! A photo enhancement engine built around an operation history. You open an
//! image, apply named enhancements one at a time, and the session remembers
//! what you did. That history can be thrown away (revert), saved alongside
//! the result, or replayed over every image in the same folder.
//!
//! # Architecture
//!
//! ```text
//!             ┌─────────────────────┐
//!  open/save  │    ImageSession     │  apply / revert
//!  ─────────► │ current · original  │ ◄──────────────
//!             │ history             │ ──► SessionObserver
//!             └─────────┬───────────┘
//!                       │ snapshot_history()
//!                       ▼
//!             ┌─────────────────────┐
//!             │   BatchReplayer     │  folder → processed_* files
//!             └─────────┬───────────┘
//!                       │
//!             ┌─────────▼───────────┐
//!             │  TransformRegistry  │  shared, read-only
//!             └─────────────────────┘
//! ```
//!
//! The session and the batch replayer hold the same `Arc<TransformRegistry>`,
//! so an interactive result and its batch replay run identical code with
//! identical parameters. The batch never touches a live session: it receives
//! a copy of the history and decodes every file itself.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Buffers, codec backend, and the pixel operations behind each transform |
//! | [`transform`] | Transform names, skip reasons, and the registry that applies them |
//! | [`session`] | Interactive session: load, apply, revert, save, observer notifications |
//! | [`batch`] | Replays a transform sequence over a folder with per-file error isolation |
//! | [`naming`] | Output file naming (`processed_` prefix) and prior-output detection |
//! | [`config`] | Optional `retouch.toml` loading and validation |
//! | [`output`] | CLI output formatting for session changes and batch progress |
//!
//! # Design Decisions
//!
//! ## Skips Are Outcomes, Not Errors
//!
//! Some transforms only make sense for one channel layout: histogram
//! equalisation needs a grayscale buffer, the L\*a\*b\* based corrections need
//! colour. Running one on the wrong layout is reported as
//! [`TransformOutcome::Skipped`](transform::TransformOutcome::Skipped) with a
//! reason. The buffer and history stay as they were, and a batch keeps going.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding use the `image` crate; histogram equalisation and
//! median filtering come from `imageproc`. Everything else (colour space
//! conversion, CLAHE, dilation, edge-preserving smoothing) lives in
//! [`imaging::operations`]. There are no system dependencies.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod session;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_helpers;
