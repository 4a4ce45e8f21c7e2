//! API Routes
//!
//! This module organizes all HTTP endpoints for the application:
//! - `/api/generate-image` - Payment-gated image generation
//! - `/api/frame` - Farcaster frame contract (GET document, signed POST)
//! - `/api/frame/image` - Static frame image (SVG)
//! - `/api/health` - Health checks

pub mod frame;
pub mod generate;
pub mod health;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors::apply_cors;
use crate::models::AppState;

/// Create the main application router. API routes are prefixed with `/api/`.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let router = Router::new()
        .merge(generate::router(state.clone()))
        .merge(frame::router(state))
        .merge(health::router())
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &cors_origins)
}
