// Type definitions and enums

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::payment::{LedgerError, PaymentError};
use crate::pipeline::PipelineError;
use crate::routes::frame::FrameError;

/// Upper bound on user prompt length, in characters.
pub const MAX_PROMPT_CHARS: usize = 300;

/// Purpose label for a generated image, matching the wire tags used by the
/// generation endpoint (`icon`, `hero`, `og`, `splash`, `screenshot`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageVariant {
    Icon,
    Hero,
    Og,
    Splash,
    Screenshot,
}

impl ImageVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageVariant::Icon => "icon",
            ImageVariant::Hero => "hero",
            ImageVariant::Og => "og",
            ImageVariant::Splash => "splash",
            ImageVariant::Screenshot => "screenshot",
        }
    }
}

impl std::fmt::Display for ImageVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImageVariant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "icon" => Ok(ImageVariant::Icon),
            "hero" => Ok(ImageVariant::Hero),
            "og" => Ok(ImageVariant::Og),
            "splash" => Ok(ImageVariant::Splash),
            "screenshot" => Ok(ImageVariant::Screenshot),
            other => Err(AppError::UnknownVariant(other.to_string())),
        }
    }
}

/// Which set of asset variants a deployment produces. `Standard` is the
/// canonical 4-image manifest; `Extended` adds a screenshot for the older
/// 5-image contract. The pipeline always generates in the declared order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantSet {
    Standard,
    Extended,
}

impl VariantSet {
    pub fn variants(&self) -> &'static [ImageVariant] {
        match self {
            VariantSet::Standard => &[
                ImageVariant::Icon,
                ImageVariant::Hero,
                ImageVariant::Og,
                ImageVariant::Splash,
            ],
            VariantSet::Extended => &[
                ImageVariant::Icon,
                ImageVariant::Screenshot,
                ImageVariant::Hero,
                ImageVariant::Og,
                ImageVariant::Splash,
            ],
        }
    }

    pub fn contains(&self, variant: ImageVariant) -> bool {
        self.variants().contains(&variant)
    }

    pub fn len(&self) -> usize {
        self.variants().len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants().is_empty()
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(VariantSet::Standard),
            "extended" => Some(VariantSet::Extended),
            _ => None,
        }
    }
}

/// Where the payment flow currently stands. Transitions are driven by
/// externally observed transaction receipts, never by a durable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentPhase {
    AwaitingApproval,
    ApprovalPending,
    AwaitingPayment,
    PaymentPending,
    Confirmed,
    Failed,
}

impl std::fmt::Display for PaymentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentPhase::AwaitingApproval => "awaiting-approval",
            PaymentPhase::ApprovalPending => "approval-pending",
            PaymentPhase::AwaitingPayment => "awaiting-payment",
            PaymentPhase::PaymentPending => "payment-pending",
            PaymentPhase::Confirmed => "confirmed",
            PaymentPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A single prompt submission. Held only in transient state, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub id: String,
    pub prompt: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: format!("req_{}", uuid::Uuid::new_v4().simple()),
            prompt: prompt.into(),
            created_at: chrono::Utc::now(),
        }
    }
}

/// One generated image plus the derivation artifacts that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedAsset {
    pub variant: ImageVariant,
    pub base64: String,
    pub source_url: Option<String>,
    pub style_template: Option<String>,
    pub derived_prompt: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown image type: {0}")]
    UnknownVariant(String),

    #[error("upstream generation error: {0}")]
    Upstream(String),

    #[error("no image payload returned by upstream")]
    NoImagePayload,

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) | AppError::UnknownVariant(_) => StatusCode::BAD_REQUEST,
            AppError::NoImagePayload => StatusCode::BAD_GATEWAY,
            AppError::Frame(FrameError::InvalidSignature)
            | AppError::Frame(FrameError::MissingSignature) => StatusCode::UNAUTHORIZED,
            AppError::Frame(FrameError::Malformed(_)) => StatusCode::BAD_REQUEST,
            AppError::Ledger(LedgerError::AlreadyClaimed { .. }) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
