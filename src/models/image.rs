use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata row for one uploaded image (table `images`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub filename: String,
    pub original_filename: String,
    pub file_path: String,
    pub url: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returned by `POST /v1/upload/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: String,
    pub url: String,
    pub filename: String,
}

impl From<&ImageRecord> for UploadResponse {
    fn from(record: &ImageRecord) -> Self {
        UploadResponse {
            id: record.id.clone(),
            url: record.url.clone(),
            filename: record.filename.clone(),
        }
    }
}

/// A file received from a client, fully buffered.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl FileUpload {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    pub fn extension(&self) -> Option<String> {
        file_extension(&self.filename)
    }
}

/// Lowercased extension of `filename`, if it has one. Dotfiles such as
/// `.png` have no extension.
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(
            FileUpload::new("Photo.PNG", "image/png", vec![]).extension(),
            Some("png".to_string())
        );
        assert_eq!(
            FileUpload::new("archive.tar.gz", "application/gzip", vec![]).extension(),
            Some("gz".to_string())
        );
        assert_eq!(FileUpload::new("README", "text/plain", vec![]).extension(), None);
        assert_eq!(FileUpload::new("trailing.", "text/plain", vec![]).extension(), None);
        assert_eq!(FileUpload::new(".png", "image/png", vec![]).extension(), None);
    }
}
