use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::analysis::AnalysisRequester;
use crate::error::{CodefixError, Result};
use crate::git::{derive_repo_name, RepositoryAcquirer};
use crate::scanner::FileTreeScanner;
use crate::storage::{validate_repo_name, ProjectMetadata, ProjectRecord, ProjectStore, RepoStore};

async fn scan_slot(scanner: &FileTreeScanner, repos: &RepoStore, repo_name: &str) -> Result<Vec<String>> {
    let scanner = scanner.clone();
    let path = repos.slot_path(repo_name)?;
    tokio::task::spawn_blocking(move || scanner.scan(&path)).await?
}

fn require(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CodefixError::validation(message));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub repo_url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tasks: Vec<Value>,
}

impl IngestRequest {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tasks(mut self, tasks: Vec<Value>) -> Self {
        self.tasks = tasks;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub repo_name: String,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ProjectRecord>,
}

/// Clone, scan and (with a record store) persist a project.
pub struct IngestionService {
    acquirer: Arc<RepositoryAcquirer>,
    scanner: FileTreeScanner,
    records: Option<Arc<dyn ProjectStore>>,
}

impl IngestionService {
    pub fn new(
        acquirer: Arc<RepositoryAcquirer>,
        scanner: FileTreeScanner,
        records: Option<Arc<dyn ProjectStore>>,
    ) -> Self {
        Self {
            acquirer,
            scanner,
            records,
        }
    }

    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome> {
        let metadata = match &self.records {
            Some(_) => {
                let title = request.title.as_deref().unwrap_or_default();
                if request.repo_url.trim().is_empty() || title.trim().is_empty() {
                    return Err(CodefixError::validation(
                        "Repository URL and project title are required",
                    ));
                }
                Some(ProjectMetadata {
                    title: title.to_string(),
                    description: request.description.clone(),
                    tasks: request.tasks.clone(),
                })
            }
            None => {
                require(&request.repo_url, "Repository URL is required")?;
                None
            }
        };

        let repo_url = request.repo_url.trim();
        let repo_name = derive_repo_name(repo_url)?;
        let repos = self.acquirer.store();
        let _guard = repos.lock(&repo_name).await;

        let acquired = self.acquirer.acquire_into(&repo_name, repo_url).await?;

        let files = scan_slot(&self.scanner, repos, &acquired.repo_name)
            .await
            .map_err(|e| {
                warn!(repo = %acquired.repo_name, error = %e, "Scan failed after clone, slot left on disk");
                e
            })?;

        let record = match (&self.records, metadata) {
            (Some(store), Some(metadata)) => {
                let record = ProjectRecord::new(metadata, acquired.repo_name.clone(), files.clone());
                if let Err(e) = store.insert(&record).await {
                    warn!(repo = %acquired.repo_name, error = %e, "Persisting project failed, slot left on disk");
                    return Err(e);
                }
                Some(record)
            }
            _ => None,
        };

        info!(
            repo = %acquired.repo_name,
            files = files.len(),
            project_id = record.as_ref().map(|r| r.id.as_str()).unwrap_or("-"),
            "Repository ingested"
        );

        Ok(IngestOutcome {
            repo_name: acquired.repo_name,
            files,
            record,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    pub file_content: String,
    pub debugged_result: String,
}

/// Reads repository files and asks the model about them.
pub struct AnalysisService {
    repos: Arc<RepoStore>,
    requester: AnalysisRequester,
    records: Option<Arc<dyn ProjectStore>>,
}

impl AnalysisService {
    pub fn new(
        repos: Arc<RepoStore>,
        requester: AnalysisRequester,
        records: Option<Arc<dyn ProjectStore>>,
    ) -> Self {
        Self {
            repos,
            requester,
            records,
        }
    }

    /// Analyze a file of a recorded project and store the result on the record.
    pub async fn analyze_project(&self, project_id: &str, file_path: &str) -> Result<FileAnalysis> {
        if project_id.trim().is_empty() || file_path.trim().is_empty() {
            return Err(CodefixError::validation("Project ID and file path are required"));
        }
        let store = self
            .records
            .as_ref()
            .ok_or_else(|| CodefixError::not_found("Project not found"))?;
        let mut record = store
            .get(project_id)
            .await?
            .ok_or_else(|| CodefixError::not_found("Project not found"))?;

        let content = self.read_locked(&record.repo_name, file_path).await?;
        let diagnosis = self.requester.diagnose(&content).await?;

        record.record_analysis(file_path, &content, diagnosis.prompt, &diagnosis.text);
        match store.update(&record).await {
            Ok(()) => {}
            Err(CodefixError::NotFound(_)) => {
                warn!(project_id, "Project deleted during analysis, result not stored");
            }
            Err(e) => return Err(e),
        }

        Ok(FileAnalysis {
            file_content: content,
            debugged_result: diagnosis.text,
        })
    }

    /// Analyze a file addressed by repository name. Nothing is persisted.
    pub async fn analyze_repo_file(&self, repo_name: &str, file_path: &str) -> Result<FileAnalysis> {
        let content = self.read_file(repo_name, file_path).await?;
        let debugged_result = self.requester.analyze(&content).await?;
        Ok(FileAnalysis {
            file_content: content,
            debugged_result,
        })
    }

    pub async fn read_file(&self, repo_name: &str, file_path: &str) -> Result<String> {
        if repo_name.trim().is_empty() || file_path.trim().is_empty() {
            return Err(CodefixError::validation("Repository name and file path are required"));
        }
        validate_repo_name(repo_name)?;
        self.read_locked(repo_name, file_path).await
    }

    /// Stateless analysis of caller-supplied content.
    pub async fn analyze_content(&self, content: &str) -> Result<String> {
        self.requester.analyze(content).await
    }

    async fn read_locked(&self, repo_name: &str, file_path: &str) -> Result<String> {
        let _guard = self.repos.lock(repo_name).await;
        self.repos.read_file(repo_name, file_path).await
    }
}

/// `GET /` body: full records, or bare names when projects are plain directories.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProjectListing {
    Records(Vec<ProjectRecord>),
    Repositories { projects: Vec<String> },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySummary {
    pub repo_name: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProjectDetails {
    Record(ProjectRecord),
    Repository(RepositorySummary),
}

/// List, fetch and delete projects under either identity scheme.
pub struct ProjectCatalog {
    repos: Arc<RepoStore>,
    scanner: FileTreeScanner,
    records: Option<Arc<dyn ProjectStore>>,
}

impl ProjectCatalog {
    pub fn new(repos: Arc<RepoStore>, scanner: FileTreeScanner, records: Option<Arc<dyn ProjectStore>>) -> Self {
        Self {
            repos,
            scanner,
            records,
        }
    }

    pub fn has_records(&self) -> bool {
        self.records.is_some()
    }

    pub async fn list(&self) -> Result<ProjectListing> {
        match &self.records {
            Some(store) => Ok(ProjectListing::Records(store.list().await?)),
            None => Ok(ProjectListing::Repositories {
                projects: self.repos.list().await?,
            }),
        }
    }

    /// Fetch a record by id, or (directory scheme) summarize the slot named `id`.
    pub async fn get(&self, id: &str) -> Result<ProjectDetails> {
        match &self.records {
            Some(store) => store
                .get(id)
                .await?
                .map(ProjectDetails::Record)
                .ok_or_else(|| CodefixError::not_found("Project not found")),
            None => {
                if validate_repo_name(id).is_err() {
                    return Err(CodefixError::not_found("Project not found"));
                }
                let _guard = self.repos.lock(id).await;
                if !self.repos.exists(id).await? {
                    return Err(CodefixError::not_found("Project not found"));
                }
                let files = scan_slot(&self.scanner, &self.repos, id).await?;
                Ok(ProjectDetails::Repository(RepositorySummary {
                    repo_name: id.to_string(),
                    files,
                }))
            }
        }
    }

    /// Delete a project. With records, the record goes first and its slot follows.
    pub async fn delete(&self, id: &str) -> Result<()> {
        match &self.records {
            Some(store) => {
                let record = store
                    .delete(id)
                    .await?
                    .ok_or_else(|| CodefixError::not_found("Project not found"))?;
                let _guard = self.repos.lock(&record.repo_name).await;
                self.repos.clear(&record.repo_name).await?;
                info!(project_id = id, repo = %record.repo_name, "Deleted project");
                Ok(())
            }
            None => self.delete_repository(id).await,
        }
    }

    /// Delete a repository slot by name, regardless of records.
    pub async fn delete_repository(&self, repo_name: &str) -> Result<()> {
        require(repo_name, "Repository name is required")?;
        if validate_repo_name(repo_name).is_err() {
            return Err(CodefixError::not_found(format!("Repository not found: {}", repo_name)));
        }
        let _guard = self.repos.lock(repo_name).await;
        self.repos.delete(repo_name).await
    }
}
