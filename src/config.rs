use anyhow::Result;
use serde::Deserialize;
use std::env;

use crate::types::VariantSet;

// USDC deployments on the supported networks (6 decimals on both).
pub const USDC_BASE_MAINNET: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
pub const USDC_BASE_SEPOLIA: &str = "0x036CbD53842c5426634e7929541eC2318f3dCF7e";

/// One dollar in USDC base units (6 decimals).
pub const DEFAULT_PRICE_BASE_UNITS: u64 = 1_000_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub openai: OpenAiConfig,
    pub payment: PaymentConfig,
    pub frame: FrameConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Public base URL used when building frame callback links.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    /// May be empty; generation requests fail at request time, not at startup.
    pub api_key: String,
    pub chat_model: String,
    pub image_model: String,
    /// Override for tests and proxies; defaults to the public API.
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// `base` (canonical) or `base-sepolia`.
    pub network: String,
    pub rpc_url: String,
    /// Explicit USDC address; falls back to the per-network default.
    pub token_address: Option<String>,
    pub contract_address: Option<String>,
    pub wallet_private_key: Option<String>,
    pub price_base_units: u64,
    pub confirmation_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub variant_set: VariantSet,
}

impl PaymentConfig {
    pub fn chain_id(&self) -> u64 {
        match self.network.as_str() {
            "base-sepolia" => 84532,
            _ => 8453,
        }
    }

    pub fn token_address(&self) -> &str {
        match &self.token_address {
            Some(addr) => addr,
            None => match self.network.as_str() {
                "base-sepolia" => USDC_BASE_SEPOLIA,
                _ => USDC_BASE_MAINNET,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameConfig {
    /// Farcaster hub used to validate signed frame interactions.
    pub hub_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let network = env::var("PAYMENT_NETWORK").unwrap_or_else(|_| "base".to_string());
        let default_rpc = match network.as_str() {
            "base-sepolia" => "https://sepolia.base.org",
            _ => "https://mainnet.base.org",
        };

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "*".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            app: AppConfig {
                public_base_url: env::var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            openai: OpenAiConfig {
                api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                chat_model: env::var("OPENAI_CHAT_MODEL").unwrap_or_else(|_| "gpt-4".to_string()),
                image_model: env::var("OPENAI_IMAGE_MODEL")
                    .unwrap_or_else(|_| "dall-e-3".to_string()),
                api_base: env::var("OPENAI_API_BASE").ok(),
            },
            payment: PaymentConfig {
                rpc_url: env::var("RPC_URL").unwrap_or_else(|_| default_rpc.to_string()),
                token_address: env::var("USDC_ADDRESS").ok(),
                contract_address: env::var("PAYMENT_CONTRACT_ADDRESS").ok(),
                wallet_private_key: env::var("WALLET_PRIVATE_KEY").ok(),
                price_base_units: env::var("PAYMENT_PRICE_BASE_UNITS")
                    .unwrap_or_else(|_| DEFAULT_PRICE_BASE_UNITS.to_string())
                    .parse()?,
                confirmation_timeout_secs: env::var("CONFIRMATION_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "180".to_string())
                    .parse()?,
                poll_interval_ms: env::var("RECEIPT_POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse()?,
                variant_set: env::var("VARIANT_SET")
                    .ok()
                    .and_then(|s| VariantSet::parse(&s))
                    .unwrap_or(VariantSet::Standard),
                network,
            },
            frame: FrameConfig {
                hub_url: env::var("FARCASTER_HUB_URL")
                    .unwrap_or_else(|_| "https://hub.pinata.cloud".to_string()),
            },
        })
    }
}
