use std::str::FromStr;

use axum::extract::State;
use axum::response::Json as ResponseJson;
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::{info, warn};
use validator::Validate;

use crate::models::{
    validated_prompt, AppState, GenerateImageRequest, GenerateImageResponse, ImageEnvelope,
};
use crate::types::{AppError, ImageVariant};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate-image", post(generate_image))
        .with_state(state)
}

/// Generate one image variant for a prompt.
///
/// Input is fully validated before anything is sent upstream. Derivation
/// failures degrade to fallback prompts, so only the image generation step
/// itself can fail the request.
pub async fn generate_image(
    State(state): State<AppState>,
    Json(request): Json<GenerateImageRequest>,
) -> Result<ResponseJson<GenerateImageResponse>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
    let prompt = validated_prompt(request.prompt.as_deref())?;

    let tag = request
        .image_type
        .as_deref()
        .ok_or_else(|| AppError::UnknownVariant("<missing>".to_string()))?;
    let variant = ImageVariant::from_str(tag)?;
    let set = state.planner.variant_set();
    if !set.contains(variant) {
        return Err(AppError::UnknownVariant(tag.to_string()));
    }

    info!(%variant, prompt_chars = prompt.chars().count(), "generation request");

    let plan = state.planner.plan(&prompt).await;
    let optimized = plan
        .prompts
        .get(&variant)
        .cloned()
        .ok_or_else(|| AppError::Internal(format!("no derived prompt for {variant}")))?;

    let payload = state
        .openai
        .generate_image(&optimized)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    // Prefer inline base64; fall back to fetching the hosted URL.
    let base64 = match payload.b64_json {
        Some(b64) if !b64.is_empty() => b64,
        _ => match &payload.url {
            Some(url) => fetch_and_encode(&state.http, url).await?,
            None => {
                warn!(%variant, "upstream returned neither base64 nor url");
                return Err(AppError::NoImagePayload);
            }
        },
    };

    Ok(Json(GenerateImageResponse {
        image: ImageEnvelope {
            url: payload.url,
            base64,
            variant: variant.to_string(),
            original_prompt: prompt,
            project_template: plan.template.clone(),
            optimized_prompt: optimized,
        },
    }))
}

async fn fetch_and_encode(http: &reqwest::Client, url: &str) -> Result<String, AppError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("image fetch failed: {e}")))?;

    if !response.status().is_success() {
        warn!(status = %response.status(), "hosted image fetch failed");
        return Err(AppError::NoImagePayload);
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::Upstream(format!("image read failed: {e}")))?;

    Ok(BASE64.encode(&bytes))
}
