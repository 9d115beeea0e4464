use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::analysis::{AnalysisRequester, TextGenerator};
use crate::config::{AcquirePolicy, Settings};
use crate::error::{CodefixError, Result};
use crate::gemini::GeminiClient;
use crate::git::{Git2Cloner, RemoteCloner, RepositoryAcquirer};
use crate::scanner::{FileTreeScanner, ScanOptions};
use crate::services::{AnalysisService, IngestionService, ProjectCatalog};
use crate::storage::{open_project_store, ProjectStore, RepoStore};

/// The wired-up ingestion and analysis pipeline.
///
/// Cheap to clone; every service is shared.
#[derive(Clone)]
pub struct Codefix {
    pub ingestion: Arc<IngestionService>,
    pub analysis: Arc<AnalysisService>,
    pub catalog: Arc<ProjectCatalog>,
    repos: Arc<RepoStore>,
}

impl Codefix {
    pub fn builder() -> CodefixBuilder {
        CodefixBuilder::default()
    }

    /// Build the production pipeline: libgit2 cloning, Gemini, and the
    /// configured record backend.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let gemini = GeminiClient::from_config(&settings.ai)?;
        if !gemini.has_api_key() {
            warn!("No Gemini API key configured; analysis requests will fail");
        }

        let builder = Self::builder()
            .repositories_root(settings.storage.repositories_root.clone())
            .acquire_policy(settings.storage.acquire_policy)
            .scan_options(ScanOptions::from(&settings.scanner))
            .max_content_bytes(settings.ai.max_content_bytes)
            .generator(Arc::new(gemini));

        let builder = match open_project_store(&settings.storage)? {
            Some(store) => builder.record_store(store),
            None => builder.without_records(),
        };

        let codefix = builder.build()?;
        info!(
            backend = ?settings.storage.backend,
            root = %settings.storage.repositories_root.display(),
            model = %settings.ai.model,
            "Pipeline initialized"
        );
        Ok(codefix)
    }

    pub fn repos(&self) -> &Arc<RepoStore> {
        &self.repos
    }

    pub fn has_records(&self) -> bool {
        self.catalog.has_records()
    }
}

pub struct CodefixBuilder {
    repositories_root: Option<PathBuf>,
    records: Option<Arc<dyn ProjectStore>>,
    cloner: Arc<dyn RemoteCloner>,
    generator: Option<Arc<dyn TextGenerator>>,
    scan_options: ScanOptions,
    acquire_policy: AcquirePolicy,
    max_content_bytes: Option<usize>,
}

impl Default for CodefixBuilder {
    fn default() -> Self {
        Self {
            repositories_root: None,
            records: None,
            cloner: Arc::new(Git2Cloner::new()),
            generator: None,
            scan_options: ScanOptions::default(),
            acquire_policy: AcquirePolicy::Replace,
            max_content_bytes: None,
        }
    }
}

impl CodefixBuilder {
    pub fn repositories_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.repositories_root = Some(root.into());
        self
    }

    /// Use rich project records.
    pub fn record_store(mut self, store: Arc<dyn ProjectStore>) -> Self {
        self.records = Some(store);
        self
    }

    /// Projects are plain directories under the repositories root.
    pub fn without_records(mut self) -> Self {
        self.records = None;
        self
    }

    pub fn cloner(mut self, cloner: Arc<dyn RemoteCloner>) -> Self {
        self.cloner = cloner;
        self
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn scan_options(mut self, options: ScanOptions) -> Self {
        self.scan_options = options;
        self
    }

    pub fn acquire_policy(mut self, policy: AcquirePolicy) -> Self {
        self.acquire_policy = policy;
        self
    }

    pub fn max_content_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_content_bytes = limit;
        self
    }

    pub fn build(self) -> Result<Codefix> {
        let root = self
            .repositories_root
            .ok_or_else(|| CodefixError::Config("repositories root is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| CodefixError::Config("a text generator is required".to_string()))?;

        let repos = Arc::new(RepoStore::new(root)?.with_hidden_dirs(self.scan_options.skip_dirs.clone()));
        let scanner = FileTreeScanner::new(self.scan_options);
        let acquirer = Arc::new(RepositoryAcquirer::new(
            repos.clone(),
            self.cloner,
            self.acquire_policy,
        ));
        let requester = AnalysisRequester::new(generator).with_max_content_bytes(self.max_content_bytes);

        Ok(Codefix {
            ingestion: Arc::new(IngestionService::new(acquirer, scanner.clone(), self.records.clone())),
            analysis: Arc::new(AnalysisService::new(repos.clone(), requester, self.records.clone())),
            catalog: Arc::new(ProjectCatalog::new(repos.clone(), scanner, self.records)),
            repos,
        })
    }
}
