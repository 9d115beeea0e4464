use async_trait::async_trait;
use tokio::sync::RwLock;

use super::records::{ProjectRecord, ProjectStore};
use crate::error::{CodefixError, Result};

/// In-process record store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    records: RwLock<Vec<ProjectRecord>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn insert(&self, record: &ProjectRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(CodefixError::Storage(format!("duplicate project id {}", record.id)));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ProjectRecord>> {
        Ok(self.records.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn update(&self, record: &ProjectRecord) -> Result<()> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(CodefixError::not_found("Project not found")),
        }
    }

    async fn delete(&self, id: &str) -> Result<Option<ProjectRecord>> {
        let mut records = self.records.write().await;
        Ok(records
            .iter()
            .position(|r| r.id == id)
            .map(|index| records.remove(index)))
    }

    async fn list(&self) -> Result<Vec<ProjectRecord>> {
        Ok(self.records.read().await.clone())
    }
}
