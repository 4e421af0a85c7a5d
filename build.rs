//! Stamps the build with git state for `retouch --version`.
//!
//! `GIT_HASH` is the short commit hash (empty outside a checkout) and
//! `ON_RELEASE_TAG` is `true` when HEAD is exactly a tag. Release builds print
//! the crate version, everything else prints `dev@<hash>`.

use std::process::{Command, Output};

fn git(args: &[&str]) -> Option<Output> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
}

fn main() {
    for path in [".git/HEAD", ".git/refs/", ".git/packed-refs"] {
        println!("cargo:rerun-if-changed={path}");
    }

    let hash = git(&["rev-parse", "--short", "HEAD"])
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_default();
    let on_release_tag = git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some();

    println!("cargo:rustc-env=GIT_HASH={hash}");
    println!("cargo:rustc-env=ON_RELEASE_TAG={on_release_tag}");
}
