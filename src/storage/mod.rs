pub mod memory;
pub mod postgres;
pub mod traits;

use crate::{
    config::Config,
    error::{Error, Result},
};
use std::sync::Arc;

pub use memory::InMemoryImageStore;
pub use postgres::PostgresImageStore;
pub use traits::ImageStore;

/// Builds the backend selected by `config.use_psql`.
pub async fn connect(config: &Config) -> Result<Arc<dyn ImageStore>> {
    let backend: Arc<dyn ImageStore> = if config.use_psql {
        #[cfg(feature = "postgres")]
        {
            let postgres_config = config
                .postgres
                .clone()
                .ok_or_else(|| Error::ConfigError("PostgreSQL config required".into()))?;
            Arc::new(PostgresImageStore::new(postgres_config).await?)
        }
        #[cfg(not(feature = "postgres"))]
        {
            return Err(Error::ConfigError("PostgreSQL feature not enabled".into()));
        }
    } else {
        log::warn!("USE_PSQL is not set, image metadata is kept in memory only");
        Arc::new(InMemoryImageStore::new())
    };

    if !backend.health_check().await? {
        return Err(Error::StorageError("Database connection failed".into()));
    }

    Ok(backend)
}
