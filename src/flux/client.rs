use crate::{
    config::FluxConfig,
    error::{Error, Result},
    flux::GenerationOutcome,
    logger,
    models::{FluxModel, GenerationRequest, TaskResult, TaskStatus},
};
use reqwest::Client;
use serde_json::Value;

const API_KEY_HEADER: &str = "X-Key";

/// Client for one generation call: submit, poll, fetch.
#[derive(Clone)]
pub struct FluxClient {
    client: Client,
    config: FluxConfig,
}

impl FluxClient {
    pub fn new(config: FluxConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Submits the request and returns the provider task id.
    pub async fn submit(&self, model: FluxModel, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/{}", self.config.base_url, model);
        log::info!("Submitting image generation to {}", url);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(request)
            .send()
            .await?;

        let raw = response.text().await?;
        let body: Value = serde_json::from_str(&raw)
            .map_err(|e| Error::ResponseError(format!("Invalid submission response: {}", e)))?;

        match body.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => {
                log::debug!("Provider accepted task {}", id);
                Ok(id.to_string())
            }
            _ => Err(Error::MissingTaskId(body.to_string())),
        }
    }

    pub async fn get_result(&self, task_id: &str) -> Result<TaskResult> {
        let url = format!("{}/get_result", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .query(&[("id", task_id)])
            .send()
            .await?;

        let raw = response.text().await?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::ResponseError(format!("Invalid result response: {}", e)))
    }

    pub async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::ResponseError(format!(
                "Image download returned {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Drives one request from submission to a terminal outcome.
    ///
    /// Polls at most `max_poll_attempts` times, sleeping `poll_interval`
    /// between polls. Statuses other than the terminal ones consume an
    /// attempt just like `Pending`.
    pub async fn generate(
        &self,
        model: FluxModel,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome> {
        let _timer = logger::timer(&format!("generate-image {}", model));
        let task_id = self.submit(model, request).await?;
        let max_attempts = self.config.max_poll_attempts;

        for attempt in 1..=max_attempts {
            let result = self.get_result(&task_id).await?;
            log::info!(
                "Task {} status {:?} (attempt {}/{})",
                task_id,
                result.status,
                attempt,
                max_attempts
            );

            match result.status {
                TaskStatus::Ready => {
                    let sample = result.sample_url().ok_or_else(|| {
                        Error::ResponseError(format!("Task {} is ready but has no sample", task_id))
                    })?;
                    let bytes = self.fetch_image(sample).await?;
                    return Ok(GenerationOutcome::Image {
                        bytes,
                        content_type: request.output_format.content_type(),
                    });
                }
                TaskStatus::Error => return Ok(GenerationOutcome::Failed),
                TaskStatus::TaskNotFound => return Ok(GenerationOutcome::TaskNotFound),
                TaskStatus::RequestModerated => return Ok(GenerationOutcome::RequestModerated),
                TaskStatus::ContentModerated => return Ok(GenerationOutcome::ContentModerated),
                TaskStatus::Pending | TaskStatus::Unknown => {
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.poll_interval).await;
                    }
                }
            }
        }

        log::warn!(
            "Task {} still pending after {} attempts, giving up",
            task_id,
            max_attempts
        );
        Ok(GenerationOutcome::TimedOut)
    }
}
