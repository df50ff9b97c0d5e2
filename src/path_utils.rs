// src/path_utils.rs

//! Path helpers shared by the compiler and the event sources.
//!
//! Every relative path the pipeline hands out (manifest keys and values,
//! watch events, include predicate arguments) uses `/` as separator,
//! whatever the host platform.

use std::path::{Path, PathBuf};

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
///
/// Returns `None` if the path cannot be reasonably related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    // Notify may report paths under a different absolute prefix for the
    // same directory (macOS /private/var, symlinked roots).
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    None
}

/// `base.join(rel)` that leaves `base` untouched for an empty `rel`.
///
/// `Path::join("")` would append a trailing separator.
pub fn join_relative(base: &Path, rel: &str) -> PathBuf {
    if rel.is_empty() {
        base.to_path_buf()
    } else {
        rel.split('/').fold(base.to_path_buf(), |acc, seg| acc.join(seg))
    }
}

/// Output path of `name` inside `rel_dir`, relative to the output root.
///
/// `.` segments are dropped and `..` cancels the segment before it, so a
/// name that steps out of `rel_dir` yields the path the file actually lands
/// at. Leading `..` segments that leave the output root are kept.
pub fn output_relative(rel_dir: &str, name: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for seg in rel_dir.split('/').chain(name.split('/')) {
        match seg {
            "" | "." => {}
            ".." if segments.last().is_some_and(|last| *last != "..") => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Parent directory of `path`, or the empty path for a bare file name.
pub fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
