//! Output naming for batch replay.
//!
//! A batch writes each result next to its input with a fixed prefix:
//! `beach.jpg` → `processed_beach.jpg`. The same prefix marks a file as a
//! prior output, so running a batch twice over one folder never feeds its own
//! results back in.
//!
//! The extension is kept as is, which means the output format always matches
//! the input format.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Prefix used when no configuration overrides it.
pub const DEFAULT_OUTPUT_PREFIX: &str = "processed_";

/// Path the batch writes the result for `input` to.
///
/// Returns `None` when `input` has no file name component (e.g. `..`).
pub fn output_path(input: &Path, prefix: &str) -> Option<PathBuf> {
    let name = input.file_name()?;
    let mut prefixed = OsString::from(prefix);
    prefixed.push(name);
    Some(input.with_file_name(prefixed))
}

/// Whether `path` looks like something a previous batch wrote.
pub fn is_prior_output(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_sits_next_to_input() {
        let out = output_path(Path::new("/photos/beach.jpg"), DEFAULT_OUTPUT_PREFIX).unwrap();
        assert_eq!(out, PathBuf::from("/photos/processed_beach.jpg"));
    }

    #[test]
    fn output_keeps_extension_and_case() {
        let out = output_path(Path::new("scans/IMG_0001.PNG"), "fixed-").unwrap();
        assert_eq!(out, PathBuf::from("scans/fixed-IMG_0001.PNG"));
    }

    #[test]
    fn output_for_bare_file_name() {
        let out = output_path(Path::new("a.bmp"), DEFAULT_OUTPUT_PREFIX).unwrap();
        assert_eq!(out, PathBuf::from("processed_a.bmp"));
    }

    #[test]
    fn no_output_without_file_name() {
        assert_eq!(output_path(Path::new("/photos/.."), DEFAULT_OUTPUT_PREFIX), None);
    }

    #[test]
    fn prior_output_detected_by_prefix() {
        assert!(is_prior_output(
            Path::new("/photos/processed_beach.jpg"),
            DEFAULT_OUTPUT_PREFIX
        ));
        assert!(!is_prior_output(
            Path::new("/photos/beach.jpg"),
            DEFAULT_OUTPUT_PREFIX
        ));
    }

    #[test]
    fn prefix_only_checked_on_file_name() {
        assert!(!is_prior_output(
            Path::new("/processed_photos/beach.jpg"),
            DEFAULT_OUTPUT_PREFIX
        ));
    }

    #[test]
    fn output_of_output_is_still_prior_output() {
        let once = output_path(Path::new("x.png"), DEFAULT_OUTPUT_PREFIX).unwrap();
        assert!(is_prior_output(&once, DEFAULT_OUTPUT_PREFIX));
    }
}
