use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::error::{CodefixError, Result};

/// Keyed store of repository slots: one directory per repository name under
/// a shared root.
///
/// All filesystem access to slots goes through here. Callers that mutate or
/// read a slot hold its [`RepoStore::lock`] guard for the duration, which
/// serializes clone, delete and read on the same name within this process.
#[derive(Debug)]
pub struct RepoStore {
    root: PathBuf,
    locks: Arc<LockTable>,
    hidden_dirs: Vec<String>,
}

type LockTable = DashMap<String, Arc<Mutex<()>>>;

/// Exclusive access to one slot name.
///
/// The table entry for the name is dropped together with the last guard or
/// waiter, so the table only holds names that are currently in use.
#[derive(Debug)]
pub struct SlotGuard {
    name: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockTable>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        // Release the mutex first so its Arc no longer counts.
        self.guard.take();
        self.locks
            .remove_if(&self.name, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl RepoStore {
    /// Open (creating if needed) the repositories root.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            io::Error::new(e.kind(), format!("cannot create {}: {}", root.display(), e))
        })?;
        Ok(Self {
            root,
            locks: Arc::new(DashMap::new()),
            hidden_dirs: Vec::new(),
        })
    }

    /// Directory names inside a slot whose files cannot be resolved or read,
    /// typically the same list the scanner skips.
    pub fn with_hidden_dirs(mut self, dirs: Vec<String>) -> Self {
        self.hidden_dirs = dirs;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path for `name`. The name must already be a safe single segment.
    pub fn slot_path(&self, name: &str) -> Result<PathBuf> {
        validate_repo_name(name)?;
        Ok(self.root.join(name))
    }

    pub async fn lock(&self, name: &str) -> SlotGuard {
        let mutex = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        SlotGuard {
            name: name.to_string(),
            guard: Some(guard),
            locks: self.locks.clone(),
        }
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.slot_path(name)?;
        Ok(fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false))
    }

    /// Remove the slot if present. Returns whether anything was removed.
    pub async fn clear(&self, name: &str) -> Result<bool> {
        let path = self.slot_path(name)?;
        match fs::symlink_metadata(&path).await {
            Ok(meta) if meta.is_dir() => {
                fs::remove_dir_all(&path).await?;
                debug!(repo = name, "Removed repository slot");
                Ok(true)
            }
            Ok(_) => {
                fs::remove_file(&path).await?;
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the slot, failing with `NotFound` when there is none.
    pub async fn delete(&self, name: &str) -> Result<()> {
        if !self.exists(name).await? {
            return Err(CodefixError::not_found(format!("Repository not found: {}", name)));
        }
        self.clear(name).await?;
        info!(repo = name, "Deleted repository");
        Ok(())
    }

    /// Names of all slots, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Resolve `file_path` inside the slot for `name`.
    ///
    /// The result is canonical and guaranteed to lie under the slot, so
    /// `..` segments, absolute paths and symlinks pointing outside are all
    /// reported as missing files.
    pub async fn resolve_file(&self, name: &str, file_path: &str) -> Result<PathBuf> {
        if file_path.trim().is_empty() {
            return Err(CodefixError::validation("File path is required"));
        }

        let slot = self.slot_path(name)?;
        let slot = fs::canonicalize(&slot)
            .await
            .map_err(|_| CodefixError::not_found(format!("Repository not found: {}", name)))?;

        let missing = || CodefixError::not_found(format!("File not found: {}", file_path));

        let full = fs::canonicalize(slot.join(file_path)).await.map_err(|_| missing())?;
        let relative = full.strip_prefix(&slot).map_err(|_| {
            debug!(repo = name, file = file_path, "Rejected path outside repository");
            missing()
        })?;
        if self.is_hidden(relative) {
            debug!(repo = name, file = file_path, "Rejected path inside a hidden directory");
            return Err(missing());
        }
        let meta = fs::metadata(&full).await.map_err(|_| missing())?;
        if !meta.is_file() {
            return Err(missing());
        }
        Ok(full)
    }

    fn is_hidden(&self, relative: &Path) -> bool {
        relative.components().any(|component| match component {
            Component::Normal(part) => self.hidden_dirs.iter().any(|dir| part == dir.as_str()),
            _ => false,
        })
    }

    /// Read a file inside the slot as UTF-8 text.
    pub async fn read_file(&self, name: &str, file_path: &str) -> Result<String> {
        let full = self.resolve_file(name, file_path).await?;
        let bytes = fs::read(&full).await?;
        String::from_utf8(bytes).map_err(|_| {
            CodefixError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is not valid UTF-8 text", file_path),
            ))
        })
    }
}

/// A repository name is used verbatim as a directory name, so it has to be a
/// single, ordinary path segment.
pub fn validate_repo_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CodefixError::validation("Repository name is required"));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(CodefixError::validation(format!("Invalid repository name: {}", name)));
    }
    Ok(())
}
