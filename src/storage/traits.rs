use crate::{error::Result, models::ImageRecord};
use async_trait::async_trait;

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<ImageRecord>>;

    /// Inserts and commits in one transaction. A duplicate id yields
    /// `Error::DuplicateError` and leaves the store unchanged.
    async fn insert(&self, record: &ImageRecord) -> Result<()>;

    async fn health_check(&self) -> Result<bool>;

    async fn close(&self) {}
}
