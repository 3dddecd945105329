use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_FLUX_BASE_URL: &str = "https://api.bfl.ml/v1";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 300;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 15;
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(Error::ConfigError(format!(
                "Unknown ENVIRONMENT '{}', expected local, staging or production",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        ServerConfig {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.port),
        }
    }
}

/// Settings for the text-to-image provider and the poll loop driving it.
#[derive(Debug, Clone)]
pub struct FluxConfig {
    pub api_key: String,
    pub base_url: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl FluxConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        FluxConfig {
            api_key: api_key.into(),
            base_url: DEFAULT_FLUX_BASE_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("FLUX_API_KEY")
            .map_err(|_| Error::ConfigError("FLUX_API_KEY must be set".into()))?;

        let mut config = FluxConfig::new(api_key);
        if let Ok(base_url) = env::var("FLUX_API_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Some(ms) = env::var("FLUX_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Ok(value) = env::var("FLUX_MAX_POLL_ATTEMPTS") {
            config.max_poll_attempts = parse_poll_attempts(&value)?;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `max_attempts` is raised to 1; a generation always polls at least once.
    pub fn with_polling(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts.max(1);
        self
    }
}

fn parse_poll_attempts(value: &str) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(attempts) if attempts > 0 => Ok(attempts),
        _ => Err(Error::ConfigError(format!(
            "FLUX_MAX_POLL_ATTEMPTS must be a positive integer, got '{}'",
            value
        ))),
    }
}

/// Where uploads land on disk and how they are exposed.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub max_file_size: usize,
    pub allowed_extensions: BTreeSet<String>,
    pub base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            upload_dir: PathBuf::from("./uploads"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: ["png", "jpg", "jpeg", "gif"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = env::var("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(size) = env::var("MAX_FILE_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            config.max_file_size = size;
        }
        if let Ok(list) = env::var("ALLOWED_EXTENSIONS") {
            config = config.with_allowed_extensions(list.split(','));
        }
        if let Ok(base_url) = env::var("BASE_URL") {
            config = config.with_base_url(base_url);
        }
        config
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    pub fn with_max_file_size(mut self, bytes: usize) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    pub fn is_allowed(&self, extension: &str) -> bool {
        self.allowed_extensions
            .contains(&extension.to_ascii_lowercase())
    }

    pub fn public_url(&self, filename: &str) -> String {
        format!("{}/uploads/{}", self.base_url, filename)
    }
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        PostgresConfig {
            url: None,
            host: None,
            port: None,
            username: None,
            password: None,
            database: None,
        }
    }
}

impl PostgresConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        PostgresConfig {
            url: env::var("DATABASE_URL").ok(),
            host: env::var("POSTGRES_HOST").ok(),
            port: env::var("POSTGRES_PORT").ok().and_then(|s| s.parse().ok()),
            username: env::var("POSTGRES_USERNAME").ok(),
            password: env::var("POSTGRES_PASSWORD").ok(),
            database: env::var("POSTGRES_DATABASE").ok(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_connection_info(
        mut self,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Self {
        self.host = Some(host.into());
        self.port = Some(port);
        self.database = Some(database.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub server: ServerConfig,
    pub flux: FluxConfig,
    pub storage: StorageConfig,
    pub use_psql: bool,
    pub postgres: Option<PostgresConfig>,
}

impl Config {
    pub fn new(flux: FluxConfig) -> Self {
        Config {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Local,
            server: ServerConfig::default(),
            flux,
            storage: StorageConfig::default(),
            use_psql: false,
            postgres: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        let environment = match env::var("ENVIRONMENT") {
            Ok(value) => value.parse()?,
            Err(_) => Environment::Local,
        };
        let use_psql = env::var("USE_PSQL")
            .ok()
            .map_or(false, |val| val == "true");

        let mut config = Config::new(FluxConfig::from_env()?);
        config.environment = environment;
        config.server = ServerConfig::from_env();
        config.storage = StorageConfig::from_env();
        if let Ok(name) = env::var("APP_NAME") {
            config.app_name = name;
        }
        if let Ok(version) = env::var("APP_VERSION") {
            config.app_version = version;
        }
        if use_psql {
            config = config.with_postgres(PostgresConfig::from_env());
        }
        Ok(config)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_postgres(mut self, config: PostgresConfig) -> Self {
        self.postgres = Some(config);
        self.use_psql = true;
        self
    }
}
