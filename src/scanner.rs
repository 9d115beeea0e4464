use std::io;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::ScannerConfig;
use crate::error::{CodefixError, Result};

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Descend into symlinked directories. Cycles are reported and skipped.
    pub follow_symlinks: bool,
    /// Directory names whose subtrees are left out of the listing.
    pub skip_dirs: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&ScannerConfig::default())
    }
}

impl From<&ScannerConfig> for ScanOptions {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            follow_symlinks: config.follow_symlinks,
            skip_dirs: config.skip_dirs.clone(),
        }
    }
}

/// Enumerates the regular files below a directory.
///
/// Paths come back relative to the scanned root with `/` separators, in
/// depth-first traversal order. The order of siblings is whatever the
/// filesystem yields, so callers must not rely on it being sorted.
#[derive(Debug, Clone, Default)]
pub struct FileTreeScanner {
    options: ScanOptions,
}

impl FileTreeScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    pub fn scan(&self, root: &Path) -> Result<Vec<String>> {
        let metadata = std::fs::metadata(root).map_err(|e| {
            io::Error::new(e.kind(), format!("cannot read {}: {}", root.display(), e))
        })?;
        if !metadata.is_dir() {
            return Err(CodefixError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            )));
        }

        let walker = WalkDir::new(root)
            .follow_links(self.options.follow_symlinks)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_skipped_dir(entry));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.loop_ancestor().is_some() => {
                    warn!(path = ?err.path(), "Skipping symlink cycle");
                    continue;
                }
                Err(err) => {
                    let message = err.to_string();
                    return Err(CodefixError::Io(
                        err.into_io_error()
                            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message)),
                    ));
                }
            };

            if !Self::is_listed_file(&entry) {
                continue;
            }

            if let Ok(relative) = entry.path().strip_prefix(root) {
                files.push(normalize_relative(relative));
            }
        }

        debug!(root = %root.display(), files = files.len(), "Scanned file tree");
        Ok(files)
    }

    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .map(|name| self.options.skip_dirs.iter().any(|skip| skip == name))
                .unwrap_or(false)
    }

    fn is_listed_file(entry: &DirEntry) -> bool {
        let file_type = entry.file_type();
        if file_type.is_file() {
            return true;
        }
        // Unfollowed symlinks count when they point at a regular file
        if file_type.is_symlink() {
            return std::fs::metadata(entry.path())
                .map(|m| m.is_file())
                .unwrap_or(false);
        }
        false
    }
}

fn normalize_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
