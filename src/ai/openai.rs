// OpenAI adapter implementation
// Chat completions drive prompt derivation; the Images API renders the assets.
// API Reference: https://platform.openai.com/docs/api-reference

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("OpenAI API key not configured")]
    NoApiKey,

    #[error("OpenAI request failed: {0}")]
    Request(String),

    #[error("OpenAI API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("failed to parse OpenAI response: {0}")]
    Parse(String),

    #[error("OpenAI returned an empty completion")]
    Empty,
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    image_model: String,
}

// Request types for the chat completions API
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

// Request types for the image generations API
#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    quality: &'a str,
    response_format: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// Image bytes as returned by the upstream service. The API prefers inline
/// base64 but can respond with a hosted URL instead; callers handle both.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub b64_json: Option<String>,
    pub url: Option<String>,
    pub revised_prompt: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_key: &str, chat_model: &str, image_model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: OPENAI_API_BASE.to_string(),
            chat_model: chat_model.to_string(),
            image_model: image_model.to_string(),
        }
    }

    /// Point the client at a different API base (tests, proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn from_config(config: &crate::config::OpenAiConfig) -> Self {
        let client = Self::new(&config.api_key, &config.chat_model, &config.image_model);
        match &config.api_base {
            Some(base) => client.with_base_url(base),
            None => client,
        }
    }

    fn require_key(&self) -> Result<(), AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::NoApiKey);
        }
        Ok(())
    }

    async fn read_error(status: reqwest::StatusCode, response: reqwest::Response) -> AiError {
        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(parsed) => parsed.error.message,
            Err(_) => body,
        };
        AiError::Api {
            status: status.as_u16(),
            detail,
        }
    }

    /// Run a single system+user chat completion and return the assistant text.
    pub async fn chat(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, AiError> {
        self.require_key()?;

        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::read_error(status, response).await);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(AiError::Empty)?;

        debug!(chars = content.len(), "chat completion received");
        Ok(content)
    }

    /// Generate one 1024x1024 standard-quality image for the given prompt,
    /// requesting inline base64 output.
    pub async fn generate_image(&self, prompt: &str) -> Result<ImagePayload, AiError> {
        self.require_key()?;

        let url = format!("{}/images/generations", self.base_url);
        let request = ImageRequest {
            model: &self.image_model,
            prompt,
            n: 1,
            size: "1024x1024",
            quality: "standard",
            response_format: "b64_json",
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::read_error(status, response).await);
        }

        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        let first = parsed.data.into_iter().next().ok_or(AiError::Empty)?;

        Ok(ImagePayload {
            b64_json: first.b64_json,
            url: first.url,
            revised_prompt: first.revised_prompt,
        })
    }
}
