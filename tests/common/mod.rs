#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use codefix::config::{StorageBackend, StorageConfig};
use codefix::storage::open_project_store;
use codefix::{Codefix, CodefixError, GenerationOutcome, MemoryProjectStore, Result, TextGenerator};
use tempfile::TempDir;

/// Create a git repository named `name` under `parent` with one commit of `files`.
pub fn source_repo(parent: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = parent.join(name);
    fs::create_dir_all(&dir).unwrap();
    let repo = git2::Repository::init(&dir).unwrap();
    for (relative, content) in files {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature = git2::Signature::now("Test", "test@example.com").unwrap();
    repo.commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])
        .unwrap();
    dir
}

/// Returns a fixed outcome and remembers every prompt it was given.
pub struct ScriptedGenerator {
    outcome: Result<GenerationOutcome>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn text(text: &str) -> Arc<Self> {
        Self::with(Ok(GenerationOutcome::Text(text.to_string())))
    }

    pub fn empty() -> Arc<Self> {
        Self::with(Ok(GenerationOutcome::EmptyCandidate))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::with(Err(CodefixError::ExternalService(message.to_string())))
    }

    fn with(outcome: Result<GenerationOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<GenerationOutcome> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.outcome {
            Ok(outcome) => Ok(outcome.clone()),
            Err(e) => Err(CodefixError::ExternalService(e.to_string())),
        }
    }
}

/// A pipeline rooted in a fresh temp dir. Keep the `TempDir` alive for the test.
pub struct Fixture {
    pub workspace: TempDir,
    pub codefix: Codefix,
}

impl Fixture {
    pub fn with_records(generator: Arc<dyn TextGenerator>) -> Self {
        let workspace = TempDir::new().unwrap();
        let codefix = Codefix::builder()
            .repositories_root(workspace.path().join("repos"))
            .record_store(Arc::new(MemoryProjectStore::new()))
            .generator(generator)
            .build()
            .unwrap();
        Self { workspace, codefix }
    }

    /// Records in a SQLite file, opened the way `serve` opens the default backend.
    pub fn with_sqlite(generator: Arc<dyn TextGenerator>) -> Self {
        let workspace = TempDir::new().unwrap();
        let storage = StorageConfig {
            backend: StorageBackend::Sqlite,
            repositories_root: workspace.path().join("repos"),
            database_path: workspace.path().join("data").join("codefix.db"),
            ..StorageConfig::default()
        };
        let store = open_project_store(&storage).unwrap().expect("sqlite backend has records");
        let codefix = Codefix::builder()
            .repositories_root(storage.repositories_root.clone())
            .record_store(store)
            .generator(generator)
            .build()
            .unwrap();
        Self { workspace, codefix }
    }

    pub fn directories_only(generator: Arc<dyn TextGenerator>) -> Self {
        let workspace = TempDir::new().unwrap();
        let codefix = Codefix::builder()
            .repositories_root(workspace.path().join("repos"))
            .without_records()
            .generator(generator)
            .build()
            .unwrap();
        Self { workspace, codefix }
    }

    /// Directory for source repositories, outside the repositories root.
    pub fn sources(&self) -> PathBuf {
        let dir = self.workspace.path().join("sources");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn sample_repo(&self) -> String {
        source_repo(
            &self.sources(),
            "sample-repo",
            &[
                ("README.md", "# Sample"),
                ("src/main.js", "console.log('hi'"),
                ("src/util/math.js", "export const add = (a, b) => a - b;"),
            ],
        )
        .to_string_lossy()
        .into_owned()
    }
}
