pub mod config;
pub mod error;
pub mod flux;
pub mod logger;
pub mod models;
pub mod server;
pub mod storage;
pub mod uploads;

pub use config::{Config, FluxConfig, PostgresConfig, ServerConfig, StorageConfig};
pub use error::{Error, Result};
pub use flux::{FluxClient, GenerationOutcome};
pub use models::*;
pub use server::AppState;
pub use storage::{ImageStore, InMemoryImageStore, PostgresImageStore};
pub use uploads::{UploadError, UploadService};
