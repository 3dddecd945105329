use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_DIMENSION: u32 = 64;
pub const MAX_DIMENSION: u32 = 2048;
pub const MAX_SAFETY_TOLERANCE: u8 = 3;

/// Flux model identifiers accepted by the provider's submission endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FluxModel {
    #[default]
    #[serde(rename = "flux-pro-1.1")]
    FluxPro11,
    #[serde(rename = "flux-pro")]
    FluxPro,
    #[serde(rename = "flux-dev")]
    FluxDev,
    #[serde(rename = "flux-pro-1.1-ultra")]
    FluxPro11Ultra,
    #[serde(rename = "flux-pro-1.0-fill")]
    FluxPro10Fill,
    #[serde(rename = "flux-pro-1.0-canny")]
    FluxPro10Canny,
    #[serde(rename = "flux-pro-1.0-depth")]
    FluxPro10Depth,
}

impl FluxModel {
    pub const ALL: [FluxModel; 7] = [
        FluxModel::FluxPro11,
        FluxModel::FluxPro,
        FluxModel::FluxDev,
        FluxModel::FluxPro11Ultra,
        FluxModel::FluxPro10Fill,
        FluxModel::FluxPro10Canny,
        FluxModel::FluxPro10Depth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FluxModel::FluxPro11 => "flux-pro-1.1",
            FluxModel::FluxPro => "flux-pro",
            FluxModel::FluxDev => "flux-dev",
            FluxModel::FluxPro11Ultra => "flux-pro-1.1-ultra",
            FluxModel::FluxPro10Fill => "flux-pro-1.0-fill",
            FluxModel::FluxPro10Canny => "flux-pro-1.0-canny",
            FluxModel::FluxPro10Depth => "flux-pro-1.0-depth",
        }
    }
}

impl fmt::Display for FluxModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FluxModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FluxModel::ALL
            .iter()
            .copied()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| format!("Unknown model: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

fn default_width() -> u32 {
    1024
}

fn default_height() -> u32 {
    768
}

fn default_safety_tolerance() -> u8 {
    2
}

/// Body of `POST /v1/generate-image`, forwarded as-is to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub prompt_upsampling: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_safety_tolerance")]
    pub safety_tolerance: u8,
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: default_width(),
            height: default_height(),
            prompt_upsampling: false,
            seed: None,
            safety_tolerance: default_safety_tolerance(),
            output_format: OutputFormat::default(),
        }
    }

    /// Checks the field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("prompt must not be empty".to_string());
        }
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
                return Err(format!(
                    "{} must be between {} and {}, got {}",
                    name, MIN_DIMENSION, MAX_DIMENSION, value
                ));
            }
        }
        if self.safety_tolerance > MAX_SAFETY_TOLERANCE {
            return Err(format!(
                "safety_tolerance must be between 0 and {}, got {}",
                MAX_SAFETY_TOLERANCE, self.safety_tolerance
            ));
        }
        Ok(())
    }
}

/// Query string of `POST /v1/generate-image`.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct GenerationQuery {
    #[serde(default)]
    pub model: FluxModel,
}

/// Status values reported by `get_result`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "Ready")]
    Ready,
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Error")]
    Error,
    #[serde(rename = "Task not found")]
    TaskNotFound,
    #[serde(rename = "Request Moderated")]
    RequestModerated,
    #[serde(rename = "Content Moderated")]
    ContentModerated,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskSample {
    pub sample: Option<String>,
}

/// One poll of a provider task.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "unknown_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub result: Option<TaskSample>,
}

fn unknown_status() -> TaskStatus {
    TaskStatus::Unknown
}

impl TaskResult {
    pub fn sample_url(&self) -> Option<&str> {
        self.result.as_ref().and_then(|r| r.sample.as_deref())
    }
}
