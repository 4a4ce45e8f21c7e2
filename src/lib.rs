// ToolForge - payment-gated AI asset generator for Base and Farcaster mini apps

pub mod ai;
pub mod config;
pub mod middleware;
pub mod models;
pub mod payment;
pub mod pipeline;
pub mod routes;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
// Note: Import specific items from types module instead of glob to avoid name conflicts
// e.g., use toolforge::types::{ImageVariant, PaymentPhase, AppResult};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
