use std::sync::Arc;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ai::{OpenAiClient, StylePlanner};
use crate::config::Config;
use crate::payment::FulfillmentLedger;
use crate::routes::frame::{FrameVerifier, HubVerifier};
use crate::types::{AppError, MAX_PROMPT_CHARS};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub openai: Arc<OpenAiClient>,
    pub planner: Arc<StylePlanner>,
    pub ledger: Arc<FulfillmentLedger>,
    pub verifier: Arc<dyn FrameVerifier>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let openai = Arc::new(OpenAiClient::from_config(&config.openai));
        let planner = Arc::new(StylePlanner::new(
            openai.clone(),
            config.payment.variant_set,
        ));
        let verifier: Arc<dyn FrameVerifier> =
            Arc::new(HubVerifier::new(http.clone(), &config.frame.hub_url));

        Ok(Self {
            config,
            openai,
            planner,
            ledger: Arc::new(FulfillmentLedger::new()),
            verifier,
            http,
        })
    }
}

// API Request/Response types

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageRequest {
    #[validate(length(max = 300, message = "prompt exceeds 300 characters"))]
    pub prompt: Option<String>,
    pub image_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateImageResponse {
    pub image: ImageEnvelope,
}

/// Wire shape of one generated image, camelCase per the endpoint contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEnvelope {
    pub url: Option<String>,
    pub base64: String,
    #[serde(rename = "type")]
    pub variant: String,
    pub original_prompt: String,
    pub project_template: String,
    pub optimized_prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

/// Validate an incoming prompt against the intake rules shared by the HTTP
/// endpoint and the client-side controller.
pub fn validated_prompt(prompt: Option<&str>) -> Result<String, AppError> {
    let prompt = prompt.map(str::trim).unwrap_or_default();
    if prompt.is_empty() {
        return Err(AppError::InvalidRequest("prompt is required".to_string()));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(AppError::InvalidRequest(format!(
            "prompt exceeds {MAX_PROMPT_CHARS} characters"
        )));
    }
    Ok(prompt.to_string())
}
