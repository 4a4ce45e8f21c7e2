// Client seam for the generation endpoint.

use async_trait::async_trait;
use tracing::debug;

use crate::models::GenerateImageResponse;
use crate::pipeline::PipelineError;
use crate::types::{GeneratedAsset, ImageVariant};

#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        variant: ImageVariant,
    ) -> Result<GeneratedAsset, PipelineError>;
}

/// Talks to the `/api/generate-image` endpoint over HTTP. This is the
/// production client used when the orchestration runs outside the server
/// process (demos, integration tests, embedding applications).
pub struct HttpGenerationClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGenerationClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn generate(
        &self,
        prompt: &str,
        variant: ImageVariant,
    ) -> Result<GeneratedAsset, PipelineError> {
        let url = format!("{}/api/generate-image", self.base_url);
        let body = serde_json::json!({
            "prompt": prompt,
            "imageType": variant.as_str(),
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Http {
                variant,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Transport {
                variant,
                status: status.as_u16(),
            });
        }

        let parsed: GenerateImageResponse =
            response.json().await.map_err(|e| PipelineError::Http {
                variant,
                detail: e.to_string(),
            })?;

        if parsed.image.base64.is_empty() {
            return Err(PipelineError::MissingImage { variant });
        }

        debug!(%variant, bytes = parsed.image.base64.len(), "variant received");

        Ok(GeneratedAsset {
            variant,
            base64: parsed.image.base64,
            source_url: parsed.image.url,
            style_template: Some(parsed.image.project_template),
            derived_prompt: Some(parsed.image.optimized_prompt),
        })
    }
}
