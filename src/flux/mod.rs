pub mod client;

pub use client::FluxClient;

/// Terminal result of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Image {
        bytes: Vec<u8>,
        content_type: &'static str,
    },
    Failed,
    TaskNotFound,
    RequestModerated,
    ContentModerated,
    TimedOut,
}

impl GenerationOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            GenerationOutcome::Image { .. } => 200,
            GenerationOutcome::Failed => 500,
            GenerationOutcome::TaskNotFound => 404,
            GenerationOutcome::RequestModerated | GenerationOutcome::ContentModerated => 400,
            GenerationOutcome::TimedOut => 408,
        }
    }

    /// Plain-text body for the non-image outcomes.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            GenerationOutcome::Image { .. } => None,
            GenerationOutcome::Failed => Some("Image generation failed"),
            GenerationOutcome::TaskNotFound => Some("Task not found"),
            GenerationOutcome::RequestModerated => {
                Some("Request was moderated due to content policy")
            }
            GenerationOutcome::ContentModerated => {
                Some("Generated content was moderated due to content policy")
            }
            GenerationOutcome::TimedOut => Some("Timeout waiting for image generation"),
        }
    }
}
