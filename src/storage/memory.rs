use crate::{
    error::{Error, Result},
    models::ImageRecord,
    storage::traits::ImageStore,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryImageStore {
    records: RwLock<HashMap<String, ImageRecord>>,
}

impl InMemoryImageStore {
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
impl ImageStore for InMemoryImageStore {
    async fn get(&self, id: &str) -> Result<Option<ImageRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn insert(&self, record: &ImageRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(Error::DuplicateError(record.id.clone()));
        }
        if records.values().any(|r| r.filename == record.filename) {
            return Err(Error::DuplicateError(record.filename.clone()));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
