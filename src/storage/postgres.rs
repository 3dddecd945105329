#[cfg(feature = "postgres")]
use crate::{
    config::PostgresConfig,
    error::{Error, Result},
    models::ImageRecord,
    storage::traits::ImageStore,
};

#[cfg(feature = "postgres")]
use async_trait::async_trait;
#[cfg(feature = "postgres")]
use deadpool_postgres::{Config, Pool, Runtime};
#[cfg(feature = "postgres")]
use std::str::FromStr;
#[cfg(feature = "postgres")]
use tokio_postgres::{config::Host, error::SqlState, NoTls, Row};

#[cfg(feature = "postgres")]
pub struct PostgresImageStore {
    pool: Pool,
}

#[cfg(feature = "postgres")]
fn storage_error(context: &str, e: tokio_postgres::Error) -> Error {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        return Error::DuplicateError(e.to_string());
    }
    Error::StorageError(format!("{}: {}", context, e))
}

#[cfg(feature = "postgres")]
fn record_from_row(row: &Row) -> ImageRecord {
    ImageRecord {
        id: row.get("id"),
        filename: row.get("filename"),
        original_filename: row.get("original_filename"),
        file_path: row.get("file_path"),
        url: row.get("url"),
        content_type: row.get("content_type"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Builds the pool settings. Connection details come from the URL when one is
/// set; discrete fields fill or override them.
#[cfg(feature = "postgres")]
fn pool_config(config: PostgresConfig) -> Result<Config> {
    let mut cfg = Config::new();

    if let Some(url) = config.url.as_deref() {
        let parsed = tokio_postgres::Config::from_str(url)
            .map_err(|e| Error::ConfigError(format!("Invalid DATABASE_URL: {}", e)))?;
        cfg.host = parsed.get_hosts().first().map(|host| match host {
            Host::Tcp(name) => name.clone(),
            #[cfg(unix)]
            Host::Unix(path) => path.to_string_lossy().into_owned(),
        });
        cfg.port = parsed.get_ports().first().copied();
        cfg.user = parsed.get_user().map(str::to_string);
        cfg.password = parsed
            .get_password()
            .map(|p| String::from_utf8_lossy(p).into_owned());
        cfg.dbname = parsed.get_dbname().map(str::to_string);
    }

    if config.host.is_some() {
        cfg.host = config.host;
    }
    if config.port.is_some() {
        cfg.port = config.port;
    }
    if config.username.is_some() {
        cfg.user = config.username;
    }
    if config.password.is_some() {
        cfg.password = config.password;
    }
    if config.database.is_some() {
        cfg.dbname = config.database;
    }

    Ok(cfg)
}

#[cfg(feature = "postgres")]
impl PostgresImageStore {
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        let pool = pool_config(config)?
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| Error::ConfigError(format!("Failed to create pool: {}", e)))?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::StorageError(format!("Failed to get connection: {}", e)))
    }

    pub async fn initialize_schema(&self) -> Result<()> {
        let client = self.client().await?;

        client
            .execute(
                "CREATE TABLE IF NOT EXISTS images (
                id VARCHAR(36) PRIMARY KEY,
                filename TEXT NOT NULL,
                original_filename TEXT NOT NULL,
                file_path TEXT NOT NULL,
                url TEXT NOT NULL,
                content_type TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
                &[],
            )
            .await
            .map_err(|e| storage_error("Failed to create images table", e))?;

        client
            .execute(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_images_filename ON images(filename)",
                &[],
            )
            .await
            .map_err(|e| storage_error("Failed to create filename index", e))?;

        log::info!("PostgreSQL image storage schema initialized");
        Ok(())
    }
}

#[cfg(feature = "postgres")]
#[async_trait]
impl ImageStore for PostgresImageStore {
    async fn get(&self, id: &str) -> Result<Option<ImageRecord>> {
        let client = self.client().await?;

        let stmt = client
            .prepare(
                "SELECT id, filename, original_filename, file_path, url, content_type,
                    created_at, updated_at
             FROM images WHERE id = $1",
            )
            .await
            .map_err(|e| storage_error("Failed to prepare get statement", e))?;

        let row = client
            .query_opt(&stmt, &[&id])
            .await
            .map_err(|e| storage_error("Failed to execute get query", e))?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn insert(&self, record: &ImageRecord) -> Result<()> {
        let mut client = self.client().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| storage_error("Failed to begin transaction", e))?;

        // Dropping `tx` on an early return rolls the transaction back.
        tx.execute(
            "INSERT INTO images
                (id, filename, original_filename, file_path, url, content_type, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            &[
                &record.id,
                &record.filename,
                &record.original_filename,
                &record.file_path,
                &record.url,
                &record.content_type,
                &record.created_at,
                &record.updated_at,
            ],
        )
        .await
        .map_err(|e| storage_error("Failed to insert image", e))?;

        tx.commit()
            .await
            .map_err(|e| storage_error("Failed to commit image", e))?;

        log::debug!("Stored image record {}", record.id);
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|_| Error::StorageError("Failed to get connection".into()))?;

        client
            .execute("SELECT 1", &[])
            .await
            .map_err(|_| Error::StorageError("Health check query failed".into()))?;

        Ok(true)
    }

    async fn close(&self) {
        self.pool.close();
        log::info!("PostgreSQL pool closed");
    }
}

#[cfg(not(feature = "postgres"))]
pub struct PostgresImageStore;

#[cfg(not(feature = "postgres"))]
impl PostgresImageStore {
    pub async fn new(_config: crate::config::PostgresConfig) -> crate::error::Result<Self> {
        Err(crate::error::Error::ConfigError(
            "PostgreSQL feature not enabled".into(),
        ))
    }
}
