use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use git2::{build::RepoBuilder, AutotagOption, FetchOptions};
use tracing::{debug, info, warn};

use crate::config::AcquirePolicy;
use crate::error::{CodefixError, Result};
use crate::storage::{validate_repo_name, RepoStore};

/// Transfers a remote repository into a local directory.
#[async_trait]
pub trait RemoteCloner: Send + Sync {
    /// Clone `url` into `destination`, which does not exist yet.
    async fn clone_repository(&self, url: &str, destination: &Path) -> Result<()>;
}

/// libgit2-backed cloner. Accepts anything libgit2 does: https, ssh, `file://`
/// and plain local paths.
#[derive(Debug, Clone, Default)]
pub struct Git2Cloner;

impl Git2Cloner {
    pub fn new() -> Self {
        Self
    }

    fn perform_clone(url: &str, destination: &Path) -> Result<()> {
        let mut fetch_options = FetchOptions::new();
        fetch_options.download_tags(AutotagOption::None);

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);
        builder
            .clone(url, destination)
            .map_err(|e| CodefixError::Acquisition(e.message().to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl RemoteCloner for Git2Cloner {
    async fn clone_repository(&self, url: &str, destination: &Path) -> Result<()> {
        let url = url.to_string();
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || Self::perform_clone(&url, &destination))
            .await
            .map_err(|e| CodefixError::Acquisition(format!("clone task failed: {}", e)))?
    }
}

/// Where a repository landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredRepository {
    pub repo_name: String,
    pub local_path: PathBuf,
}

/// Derive the slot name for a repository URL.
///
/// The name is the last `/`-separated segment with one trailing `.git`
/// removed; case is preserved.
pub fn derive_repo_name(source_url: &str) -> Result<String> {
    let trimmed = source_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(CodefixError::validation("Repository URL is required"));
    }

    let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let name = segment.strip_suffix(".git").unwrap_or(segment);

    validate_repo_name(name).map_err(|_| {
        CodefixError::validation(format!("Cannot derive a repository name from '{}'", source_url))
    })?;
    Ok(name.to_string())
}

/// Clones repositories into their slots.
///
/// With [`AcquirePolicy::Replace`] an occupied slot is wiped before cloning:
/// the newest clone always wins and nothing is merged.
pub struct RepositoryAcquirer {
    store: Arc<RepoStore>,
    cloner: Arc<dyn RemoteCloner>,
    policy: AcquirePolicy,
}

impl RepositoryAcquirer {
    pub fn new(store: Arc<RepoStore>, cloner: Arc<dyn RemoteCloner>, policy: AcquirePolicy) -> Self {
        Self { store, cloner, policy }
    }

    pub fn store(&self) -> &Arc<RepoStore> {
        &self.store
    }

    /// Derive the name, take the slot lock and clone.
    pub async fn acquire(&self, source_url: &str) -> Result<AcquiredRepository> {
        let repo_name = derive_repo_name(source_url)?;
        let _guard = self.store.lock(&repo_name).await;
        self.acquire_into(&repo_name, source_url).await
    }

    /// Clone `source_url` into the slot for `repo_name`.
    ///
    /// The caller must hold the slot lock for `repo_name`.
    pub async fn acquire_into(&self, repo_name: &str, source_url: &str) -> Result<AcquiredRepository> {
        let local_path = self.store.slot_path(repo_name)?;

        match self.policy {
            AcquirePolicy::Replace => {
                if self.store.clear(repo_name).await? {
                    info!(repo = repo_name, "Replacing existing clone");
                }
            }
            AcquirePolicy::FailIfExists => {
                if self.store.exists(repo_name).await? {
                    return Err(CodefixError::validation(format!(
                        "Repository {} already exists",
                        repo_name
                    )));
                }
            }
        }

        info!(repo = repo_name, url = source_url, "Cloning repository");

        if let Err(e) = self.cloner.clone_repository(source_url, &local_path).await {
            warn!(repo = repo_name, error = %e, "Clone failed");
            // A failed clone must not leave a half-written slot behind
            if let Err(cleanup) = self.store.clear(repo_name).await {
                warn!(repo = repo_name, error = %cleanup, "Failed to remove partial clone");
            }
            return Err(match e {
                CodefixError::Acquisition(_) => e,
                other => CodefixError::Acquisition(other.to_string()),
            });
        }

        debug!(repo = repo_name, path = %local_path.display(), "Clone completed");

        Ok(AcquiredRepository {
            repo_name: repo_name.to_string(),
            local_path,
        })
    }
}
