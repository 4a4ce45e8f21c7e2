//! Image pipeline
//!
//! After a confirmed payment, one generation request is issued per image
//! variant, strictly in the declared order, with a fixed pacing delay between
//! requests to stay under upstream rate limits. The first failure aborts the
//! run; assets already retrieved stay in the transient state. There is no
//! cancellation and no resume.

pub mod client;
pub mod controller;

pub use client::{GenerationClient, HttpGenerationClient};
pub use controller::GenerationController;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::types::{GeneratedAsset, ImageVariant, PaymentPhase, VariantSet};

/// Delay between consecutive variant requests.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("generation request for {variant} failed with status {status}")]
    Transport { variant: ImageVariant, status: u16 },

    #[error("no image payload for {variant}")]
    MissingImage { variant: ImageVariant },

    #[error("generation request for {variant} failed: {detail}")]
    Http {
        variant: ImageVariant,
        detail: String,
    },
}

/// The explicit finite-state record for one submission, owned by the
/// controller and updated in place by the runner.
#[derive(Debug, Clone)]
pub struct GenerationState {
    pub request_id: String,
    pub prompt: String,
    pub payment_phase: PaymentPhase,
    pub progress: usize,
    pub status: String,
    pub images: Vec<GeneratedAsset>,
}

impl GenerationState {
    pub fn new(request_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            prompt: prompt.into(),
            payment_phase: PaymentPhase::AwaitingApproval,
            progress: 0,
            status: String::new(),
            images: Vec::new(),
        }
    }
}

pub struct PipelineRunner {
    client: Arc<dyn GenerationClient>,
    set: VariantSet,
    pacing: Duration,
}

impl PipelineRunner {
    pub fn new(client: Arc<dyn GenerationClient>, set: VariantSet) -> Self {
        Self {
            client,
            set,
            pacing: DEFAULT_PACING,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Generate every variant in order. On failure the partial `state.images`
    /// list is left intact and the status string records where the run died.
    pub async fn run(&self, state: &mut GenerationState) -> Result<(), PipelineError> {
        let variants = self.set.variants();
        let total = variants.len();

        state.progress = 0;
        state.images.clear();
        state.status = "Starting image generation...".to_string();

        for (i, variant) in variants.iter().enumerate() {
            state.status = format!("Generating {variant} image... ({}/{total})", i + 1);
            info!(request_id = %state.request_id, %variant, "requesting variant");

            match self.client.generate(&state.prompt, *variant).await {
                Ok(asset) => {
                    state.images.push(asset);
                    state.progress = i + 1;
                    state.status = format!("{variant} image completed ({}/{total})", i + 1);
                }
                Err(e) => {
                    warn!(request_id = %state.request_id, %variant, error = %e, "variant failed, aborting run");
                    state.status = format!("image generation failed at {variant}");
                    return Err(e);
                }
            }

            if i + 1 < total {
                sleep(self.pacing).await;
            }
        }

        state.status = "All images generated".to_string();
        info!(request_id = %state.request_id, total, "pipeline complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Client double that fails at a chosen variant and records call order.
    struct ScriptedClient {
        fail_at: Option<ImageVariant>,
        requested: Mutex<Vec<ImageVariant>>,
    }

    impl ScriptedClient {
        fn new(fail_at: Option<ImageVariant>) -> Self {
            Self {
                fail_at,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedClient {
        async fn generate(
            &self,
            _prompt: &str,
            variant: ImageVariant,
        ) -> Result<GeneratedAsset, PipelineError> {
            self.requested.lock().unwrap().push(variant);
            if self.fail_at == Some(variant) {
                return Err(PipelineError::Transport {
                    variant,
                    status: 500,
                });
            }
            Ok(GeneratedAsset {
                variant,
                base64: format!("payload-{variant}"),
                source_url: None,
                style_template: None,
                derived_prompt: None,
            })
        }
    }

    fn runner(client: Arc<ScriptedClient>) -> PipelineRunner {
        PipelineRunner::new(client, VariantSet::Standard).with_pacing(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_variants_generated_in_declared_order() {
        let client = Arc::new(ScriptedClient::new(None));
        let mut state = GenerationState::new("req_1", "a sunset over mountains");

        runner(client.clone()).run(&mut state).await.unwrap();

        assert_eq!(
            client.requested.lock().unwrap().as_slice(),
            VariantSet::Standard.variants()
        );
        assert_eq!(state.progress, 4);
        assert_eq!(state.images.len(), 4);
        assert_eq!(state.status, "All images generated");

        let tags: Vec<ImageVariant> = state.images.iter().map(|a| a.variant).collect();
        assert_eq!(tags.as_slice(), VariantSet::Standard.variants());
    }

    #[tokio::test]
    async fn test_first_failure_aborts_and_keeps_partial_results() {
        let client = Arc::new(ScriptedClient::new(Some(ImageVariant::Og)));
        let mut state = GenerationState::new("req_1", "a sunset over mountains");

        let err = runner(client.clone()).run(&mut state).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Transport {
                variant: ImageVariant::Og,
                status: 500
            }
        ));

        // icon and hero were requested before the failure, splash never was.
        assert_eq!(
            client.requested.lock().unwrap().as_slice(),
            &[ImageVariant::Icon, ImageVariant::Hero, ImageVariant::Og]
        );
        assert_eq!(state.progress, 2);
        assert_eq!(state.images.len(), 2);
        assert_eq!(state.status, "image generation failed at og");
    }
}
