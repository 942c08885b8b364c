//! Filesystem helpers for relation file lookup.
//!
//! A TOASTed value names the side relation by filenode; the side relation's
//! segment file sits in the same directory as the file being dumped.

use std::path::{Path, PathBuf};

/// Path of a sibling relation file, by filenode, next to `main_file`.
pub fn sibling_relation_path(main_file: &Path, filenode: u32) -> PathBuf {
    match main_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(filenode.to_string()),
        _ => PathBuf::from(filenode.to_string()),
    }
}
