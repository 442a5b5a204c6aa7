//! Source file discovery.
//!
//! Walks a directory honoring `.gitignore` and hidden-file conventions, keeps
//! only files in a supported language, and returns them sorted so batch
//! results do not depend on directory iteration order.

use crate::core::Language;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Find analyzable source files under `root`. A single file path is returned
/// as-is when its language is supported.
pub fn find_source_files(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return match Language::from_path(root) {
            Some(_) => vec![root.to_path_buf()],
            None => Vec::new(),
        };
    }

    let mut files: Vec<PathBuf> = WalkBuilder::new(root)
        .follow_links(false)
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| Language::from_path(path).is_some())
        .collect();
    files.sort();
    files
}
