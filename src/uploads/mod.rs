use crate::{
    config::StorageConfig,
    error::Error,
    models::{file_extension, FileUpload, ImageRecord, UploadResponse},
    storage::ImageStore,
};
use chrono::Utc;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error as ThisError;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, ThisError)]
pub enum UploadError {
    #[error("Invalid image id: {0}")]
    InvalidId(String),
    #[error("File type not allowed. Allowed types: {allowed}")]
    InvalidExtension { allowed: String },
    #[error("File too large. Maximum size is {max} bytes")]
    FileTooLarge { max: usize },
    #[error("Invalid upload: {0}")]
    InvalidPayload(String),
    #[error("Image with id {0} already exists")]
    AlreadyExists(String),
    #[error("Error uploading image: {0}")]
    Internal(#[from] Error),
}

impl UploadError {
    pub fn status_code(&self) -> u16 {
        match self {
            UploadError::InvalidId(_)
            | UploadError::InvalidExtension { .. }
            | UploadError::FileTooLarge { .. }
            | UploadError::InvalidPayload(_)
            | UploadError::AlreadyExists(_) => 400,
            UploadError::Internal(_) => 500,
        }
    }
}

pub type UploadResult<T> = std::result::Result<T, UploadError>;

/// Validates uploads, writes them to disk and records them in the store.
#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn ImageStore>,
    config: StorageConfig,
}

impl UploadService {
    pub fn new(store: Arc<dyn ImageStore>, config: StorageConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ImageStore> {
        &self.store
    }

    pub fn parse_id(&self, id: &str) -> UploadResult<String> {
        Uuid::parse_str(id)
            .map(|uuid| uuid.to_string())
            .map_err(|_| UploadError::InvalidId(id.to_string()))
    }

    /// Returns the lowercased extension if the filename is acceptable.
    pub fn check_extension(&self, filename: &str) -> UploadResult<String> {
        match file_extension(filename) {
            Some(ext) if self.config.is_allowed(&ext) => Ok(ext),
            _ => Err(UploadError::InvalidExtension {
                allowed: self
                    .config
                    .allowed_extensions
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    pub fn check_size(&self, size: usize) -> UploadResult<()> {
        if size > self.config.max_file_size {
            return Err(UploadError::FileTooLarge {
                max: self.config.max_file_size,
            });
        }
        Ok(())
    }

    pub async fn upload(&self, id: &str, file: FileUpload) -> UploadResult<UploadResponse> {
        let id = self.parse_id(id)?;
        let extension = self.check_extension(&file.filename)?;
        self.check_size(file.content.len())?;

        if self.store.get(&id).await?.is_some() {
            log::warn!("Rejected upload, image {} already exists", id);
            return Err(UploadError::AlreadyExists(id));
        }

        tokio::fs::create_dir_all(&self.config.upload_dir)
            .await
            .map_err(Error::from)?;

        let filename = format!("{}.{}", id, extension);
        let file_path = self.config.upload_dir.join(&filename);
        write_new_file(&file_path, &file.content)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    log::warn!("Rejected upload, {} is already on disk", file_path.display());
                    UploadError::AlreadyExists(id.clone())
                }
                _ => UploadError::Internal(Error::from(e)),
            })?;

        let now = Utc::now();
        let record = ImageRecord {
            id: id.clone(),
            filename: filename.clone(),
            original_filename: file.filename,
            file_path: file_path.to_string_lossy().into_owned(),
            url: self.config.public_url(&filename),
            content_type: file.content_type,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.store.insert(&record).await {
            remove_orphan(&file_path).await;
            return Err(match e {
                Error::DuplicateError(_) => UploadError::AlreadyExists(id),
                other => UploadError::Internal(other),
            });
        }

        log::info!(
            "Stored upload {} as {} ({} bytes)",
            record.id,
            record.filename,
            file.content.len()
        );
        Ok(UploadResponse::from(&record))
    }
}

/// Creates `path` exclusively, so a file another upload already owns is never
/// overwritten or later removed by this one.
async fn write_new_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut out = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    let written = async {
        out.write_all(content).await?;
        out.flush().await
    }
    .await;
    if let Err(e) = written {
        drop(out);
        remove_orphan(path).await;
        return Err(e);
    }
    Ok(())
}

async fn remove_orphan(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => log::warn!("Removed orphaned file {}", path.display()),
        Err(e) => log::error!("Failed to remove orphaned file {}: {}", path.display(), e),
    }
}
