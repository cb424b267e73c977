// Source file discovery under search roots

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;

/// File-name filter built from a glob such as `*.{h,cpp}`.
///
/// Several globs may be given separated by `;`. Matching is case-insensitive
/// and applies to the file name only.
#[derive(Debug, Clone)]
pub struct FileFilter {
    set: GlobSet,
}

impl FileFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for glob in pattern.split(';').map(str::trim).filter(|g| !g.is_empty()) {
            let mut gb = GlobBuilder::new(glob);
            gb.case_insensitive(true);
            builder.add(gb.build()?);
        }
        Ok(Self { set: builder.build()? })
    }

    pub fn headers() -> Result<Self> {
        Self::new("*.h")
    }

    pub fn sources() -> Result<Self> {
        Self::new("*.cpp")
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| self.set.is_match(name))
    }
}

/// Files under `root` accepted by `filter`, in a stable order.
///
/// Unreadable directory entries are skipped.
pub fn walk_files<'a>(root: &Path, filter: &'a FileFilter) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(move |path| filter.matches(path))
}

/// Read a file as text, replacing invalid UTF-8.
pub fn read_source(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}
