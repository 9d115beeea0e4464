use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CodefixError, Result};

/// Client-supplied metadata for a new project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub title: String,
    pub description: Option<String>,
    pub tasks: Vec<Value>,
}

/// Persisted description of an ingested repository.
///
/// `files` is the listing taken right after the clone and is never refreshed.
/// The analysis fields hold only the most recent result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tasks: Vec<Value>,
    pub repo_name: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub last_analyzed_file: Option<String>,
    #[serde(default)]
    pub last_analyzed_content: String,
    #[serde(default)]
    pub debugged_result: String,
    #[serde(default)]
    pub token_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectRecord {
    pub fn new(metadata: ProjectMetadata, repo_name: String, files: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: metadata.title,
            description: metadata.description,
            tasks: metadata.tasks,
            repo_name,
            files,
            prompt: String::new(),
            response: String::new(),
            last_analyzed_file: None,
            last_analyzed_content: String::new(),
            debugged_result: String::new(),
            token_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the single-slot analysis history.
    pub fn record_analysis(&mut self, file_path: &str, content: &str, prompt: String, result: &str) {
        self.last_analyzed_file = Some(file_path.to_string());
        self.last_analyzed_content = content.to_string();
        self.prompt = prompt;
        self.debugged_result = result.to_string();
        self.updated_at = Utc::now();
    }
}

/// Document store for project records.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn insert(&self, record: &ProjectRecord) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<ProjectRecord>>;

    /// Replace a stored record. Fails with `NotFound` if it was deleted meanwhile.
    async fn update(&self, record: &ProjectRecord) -> Result<()>;

    /// Remove a record, returning it if it existed.
    async fn delete(&self, id: &str) -> Result<Option<ProjectRecord>>;

    /// All records in creation order.
    async fn list(&self) -> Result<Vec<ProjectRecord>>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    repo_name TEXT NOT NULL,
    document TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_projects_repo_name ON projects(repo_name);
";

/// Records stored as JSON documents in a SQLite table.
#[derive(Clone)]
pub struct SqliteProjectStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteProjectStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let pool = Pool::new(SqliteConnectionManager::file(path))?;
        let store = Self { pool };
        store.init_schema()?;
        debug!(path = %path.display(), "Opened project database");
        Ok(store)
    }

    /// Private in-memory database. One connection, so every call sees the same data.
    pub fn in_memory() -> Result<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())?;
        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await?
    }
}

fn decode(document: String) -> Result<ProjectRecord> {
    Ok(serde_json::from_str(&document)?)
}

#[async_trait]
impl ProjectStore for SqliteProjectStore {
    async fn insert(&self, record: &ProjectRecord) -> Result<()> {
        let document = serde_json::to_string(record)?;
        let id = record.id.clone();
        let repo_name = record.repo_name.clone();
        let created_at = record.created_at;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO projects (id, repo_name, document, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id, repo_name, document, created_at],
            )?;
            Ok(())
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<ProjectRecord>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let document: Option<String> = conn
                .query_row("SELECT document FROM projects WHERE id = ?1", params![id], |row| row.get(0))
                .optional()?;
            document.map(decode).transpose()
        })
        .await
    }

    async fn update(&self, record: &ProjectRecord) -> Result<()> {
        let document = serde_json::to_string(record)?;
        let id = record.id.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE projects SET document = ?1 WHERE id = ?2",
                params![document, id],
            )?;
            if changed == 0 {
                return Err(CodefixError::not_found("Project not found"));
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<Option<ProjectRecord>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let tx = conn.unchecked_transaction()?;
            let document: Option<String> = tx
                .query_row("SELECT document FROM projects WHERE id = ?1", params![id], |row| row.get(0))
                .optional()?;
            if document.is_some() {
                tx.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
            }
            tx.commit()?;
            document.map(decode).transpose()
        })
        .await
    }

    async fn list(&self) -> Result<Vec<ProjectRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT document FROM projects ORDER BY rowid")?;
            let documents = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            documents.into_iter().map(decode).collect()
        })
        .await
    }
}
