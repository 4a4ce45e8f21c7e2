//! Farcaster frame endpoints
//!
//! Implements the frame embedding contract: a GET that advertises the frame
//! (image plus two buttons), a signed POST callback dispatching on button
//! index, and the static frame image. Signed interactions are validated
//! against a Farcaster hub before any action is taken.

use async_trait::async_trait;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::AppState;
use crate::types::AppError;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame payload is missing signed message bytes")]
    MissingSignature,

    #[error("frame signature rejected by hub")]
    InvalidSignature,

    #[error("malformed frame payload: {0}")]
    Malformed(String),

    #[error("hub validation failed: {0}")]
    Hub(String),
}

/// Signed frame interaction as posted by Farcaster clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameActionPayload {
    pub untrusted_data: Option<UntrustedData>,
    pub trusted_data: Option<TrustedData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UntrustedData {
    pub button_index: Option<u32>,
    pub fid: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedData {
    pub message_bytes: String,
}

/// A validated interaction.
#[derive(Debug, Clone, Copy)]
pub struct FrameAction {
    pub button_index: u32,
    pub fid: Option<u64>,
}

/// Validates a signed frame payload before the server acts on it.
#[async_trait]
pub trait FrameVerifier: Send + Sync {
    async fn verify(&self, payload: &FrameActionPayload) -> Result<FrameAction, FrameError>;
}

/// Verifier backed by a Farcaster hub's `validateMessage` endpoint.
pub struct HubVerifier {
    http: reqwest::Client,
    hub_url: String,
}

#[derive(Deserialize)]
struct ValidateMessageResponse {
    valid: bool,
    message: Option<ValidatedMessage>,
}

#[derive(Deserialize)]
struct ValidatedMessage {
    data: Option<ValidatedMessageData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidatedMessageData {
    fid: Option<u64>,
    frame_action_body: Option<FrameActionBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameActionBody {
    button_index: Option<u32>,
}

impl HubVerifier {
    pub fn new(http: reqwest::Client, hub_url: &str) -> Self {
        Self {
            http,
            hub_url: hub_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl FrameVerifier for HubVerifier {
    async fn verify(&self, payload: &FrameActionPayload) -> Result<FrameAction, FrameError> {
        let trusted = payload
            .trusted_data
            .as_ref()
            .ok_or(FrameError::MissingSignature)?;

        let raw = trusted.message_bytes.trim_start_matches("0x");
        let bytes =
            hex::decode(raw).map_err(|e| FrameError::Malformed(format!("bad hex: {e}")))?;

        let url = format!("{}/v1/validateMessage", self.hub_url);
        let response = self
            .http
            .post(&url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| FrameError::Hub(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FrameError::Hub(format!(
                "hub returned {}",
                response.status()
            )));
        }

        let validated: ValidateMessageResponse = response
            .json()
            .await
            .map_err(|e| FrameError::Hub(format!("unreadable hub response: {e}")))?;

        if !validated.valid {
            return Err(FrameError::InvalidSignature);
        }

        let data = validated
            .message
            .and_then(|m| m.data)
            .ok_or_else(|| FrameError::Malformed("validated message missing data".to_string()))?;
        let button_index = data
            .frame_action_body
            .and_then(|b| b.button_index)
            .ok_or_else(|| FrameError::Malformed("missing button index".to_string()))?;

        debug!(button_index, fid = ?data.fid, "frame interaction validated");
        Ok(FrameAction {
            button_index,
            fid: data.fid,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/frame", get(frame_index).post(frame_action))
        .route("/api/frame/image", get(frame_image))
        .with_state(state)
}

async fn frame_index(State(state): State<AppState>) -> Html<String> {
    let base = &state.config.app.public_base_url;
    Html(frame_document(
        base,
        "ToolForge",
        "Create visual assets for Base and Farcaster mini apps",
        ["Open ToolForge", "Learn More"],
    ))
}

async fn frame_action(
    State(state): State<AppState>,
    Json(payload): Json<FrameActionPayload>,
) -> Result<Response, AppError> {
    let action = state.verifier.verify(&payload).await.map_err(|e| {
        warn!(error = %e, "frame interaction rejected");
        AppError::Frame(e)
    })?;

    let base = &state.config.app.public_base_url;
    match action.button_index {
        1 => Ok(Html(frame_document(
            base,
            "ToolForge - Asset Creator",
            "Create visual assets for your Base and Farcaster mini apps!",
            ["Create Assets", "Learn More"],
        ))
        .into_response()),
        2 => Ok(Redirect::temporary(base).into_response()),
        other => Err(AppError::InvalidRequest(format!(
            "unsupported frame button: {other}"
        ))),
    }
}

async fn frame_image() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        FRAME_SVG,
    )
}

fn frame_document(base: &str, title: &str, blurb: &str, buttons: [&str; 2]) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta property="fc:frame" content="vNext" />
    <meta property="fc:frame:image" content="{base}/api/frame/image" />
    <meta property="fc:frame:button:1" content="{b1}" />
    <meta property="fc:frame:button:2" content="{b2}" />
    <meta property="fc:frame:post_url" content="{base}/api/frame" />
  </head>
  <body>
    <h1>{title}</h1>
    <p>{blurb}</p>
  </body>
</html>
"#,
        b1 = buttons[0],
        b2 = buttons[1],
    )
}

const FRAME_SVG: &str = r##"<svg width="1200" height="630" viewBox="0 0 1200 630" xmlns="http://www.w3.org/2000/svg">
  <defs>
    <linearGradient id="bg" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" style="stop-color:#3B82F6;stop-opacity:1" />
      <stop offset="100%" style="stop-color:#1E40AF;stop-opacity:1" />
    </linearGradient>
  </defs>
  <rect width="1200" height="630" fill="url(#bg)"/>
  <g transform="translate(100, 100)">
    <rect x="0" y="0" width="120" height="120" rx="20" fill="white" opacity="0.9"/>
    <text x="60" y="78" font-family="Arial, sans-serif" font-size="60" font-weight="bold" text-anchor="middle" fill="#3B82F6">TF</text>
    <text x="160" y="60" font-family="Arial, sans-serif" font-size="48" font-weight="bold" fill="white">ToolForge</text>
    <text x="160" y="100" font-family="Arial, sans-serif" font-size="24" fill="white" opacity="0.9">Base &amp; Farcaster Mini App Asset Creator</text>
    <g transform="translate(0, 150)">
      <text x="0" y="0" font-family="Arial, sans-serif" font-size="20" fill="white" opacity="0.8">Create Icons, Splash Screens, Banners</text>
      <text x="0" y="35" font-family="Arial, sans-serif" font-size="20" fill="white" opacity="0.8">Optimized for Base &amp; Farcaster</text>
      <text x="0" y="70" font-family="Arial, sans-serif" font-size="20" fill="white" opacity="0.8">Perfect Mini App Assets</text>
    </g>
    <rect x="0" y="280" width="300" height="60" rx="30" fill="white" opacity="0.2"/>
    <text x="150" y="320" font-family="Arial, sans-serif" font-size="24" font-weight="bold" text-anchor="middle" fill="white">Start Creating Assets</text>
  </g>
  <circle cx="1000" cy="100" r="50" fill="white" opacity="0.1"/>
  <circle cx="1100" cy="200" r="30" fill="white" opacity="0.1"/>
  <circle cx="1050" cy="400" r="40" fill="white" opacity="0.1"/>
</svg>
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_document_meta_tags() {
        let doc = frame_document(
            "https://forge.example",
            "ToolForge",
            "blurb",
            ["One", "Two"],
        );
        assert!(doc.contains(r#"content="https://forge.example/api/frame/image""#));
        assert!(doc.contains(r#"content="https://forge.example/api/frame""#));
        assert!(doc.contains(r#"fc:frame:button:1" content="One""#));
        assert!(doc.contains(r#"fc:frame:button:2" content="Two""#));
    }

    #[test]
    fn test_payload_parses_client_shape() {
        let payload: FrameActionPayload = serde_json::from_str(
            r#"{"untrustedData":{"buttonIndex":1,"fid":42},"trustedData":{"messageBytes":"0xdead"}}"#,
        )
        .unwrap();
        assert_eq!(payload.untrusted_data.unwrap().button_index, Some(1));
        assert_eq!(payload.trusted_data.unwrap().message_bytes, "0xdead");
    }

    #[tokio::test]
    async fn test_hub_verifier_requires_signed_bytes() {
        let verifier = HubVerifier::new(reqwest::Client::new(), "http://localhost:2281");
        let payload = FrameActionPayload {
            untrusted_data: Some(UntrustedData {
                button_index: Some(1),
                fid: None,
            }),
            trusted_data: None,
        };
        let err = verifier.verify(&payload).await.unwrap_err();
        assert!(matches!(err, FrameError::MissingSignature));
    }

    #[tokio::test]
    async fn test_hub_verifier_accepts_valid_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/validateMessage")
            .with_status(200)
            .with_body(
                r#"{"valid":true,"message":{"data":{"fid":42,"frameActionBody":{"buttonIndex":2}}}}"#,
            )
            .create_async()
            .await;

        let verifier = HubVerifier::new(reqwest::Client::new(), &server.url());
        let payload = FrameActionPayload {
            untrusted_data: None,
            trusted_data: Some(TrustedData {
                message_bytes: "0xdeadbeef".to_string(),
            }),
        };
        let action = verifier.verify(&payload).await.unwrap();
        assert_eq!(action.button_index, 2);
        assert_eq!(action.fid, Some(42));
    }

    #[tokio::test]
    async fn test_hub_verifier_rejects_invalid_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/validateMessage")
            .with_status(200)
            .with_body(r#"{"valid":false,"message":null}"#)
            .create_async()
            .await;

        let verifier = HubVerifier::new(reqwest::Client::new(), &server.url());
        let payload = FrameActionPayload {
            untrusted_data: None,
            trusted_data: Some(TrustedData {
                message_bytes: "deadbeef".to_string(),
            }),
        };
        let err = verifier.verify(&payload).await.unwrap_err();
        assert!(matches!(err, FrameError::InvalidSignature));
    }
}
