// Session controller: prompt intake, then payment, then the pipeline.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::models::validated_prompt;
use crate::payment::{
    FulfillmentLedger, FulfillmentStatus, PaymentCoordinator, WalletProvider,
};
use crate::pipeline::{GenerationState, PipelineRunner};
use crate::types::{AppError, AppResult, GenerationRequest, PaymentPhase};

/// Owns the [`GenerationState`] for one submission and drives it through
/// payment and generation. One controller, one request; nothing survives a
/// reset beyond whatever transactions are already on-chain.
pub struct GenerationController {
    coordinator: PaymentCoordinator,
    runner: PipelineRunner,
    ledger: Arc<FulfillmentLedger>,
    state: GenerationState,
}

impl GenerationController {
    /// Prompt intake. Rejects empty, whitespace-only, and over-length
    /// prompts before any payment or network activity can happen.
    pub fn submit(prompt: &str) -> AppResult<GenerationRequest> {
        let prompt = validated_prompt(Some(prompt))?;
        Ok(GenerationRequest::new(prompt))
    }

    pub fn new(
        request: GenerationRequest,
        coordinator: PaymentCoordinator,
        runner: PipelineRunner,
        ledger: Arc<FulfillmentLedger>,
    ) -> Self {
        let state = GenerationState::new(request.id, request.prompt);
        Self {
            coordinator,
            runner,
            ledger,
            state,
        }
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    /// Collect payment and, once confirmed, run the image pipeline. The
    /// confirmed payment hash is claimed in the ledger first, so a hash that
    /// already gated a run cannot gate another.
    pub async fn run(
        &mut self,
        wallet: &dyn WalletProvider,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        let phase = self.coordinator.phase();
        let request_id = self.state.request_id.clone();

        let collected = self
            .coordinator
            .collect(wallet, cancel, |receipt| {
                info!(
                    %request_id,
                    payment_tx = ?receipt.payment_tx,
                    "payment confirmed, starting generation"
                );
            })
            .await;
        self.state.payment_phase = *phase.borrow();

        let receipt = match collected {
            Ok(receipt) => receipt,
            Err(e) => {
                self.state.status = format!("payment failed: {e}");
                return Err(AppError::Payment(e));
            }
        };

        self.ledger.claim(receipt.payment_tx, &self.state.request_id)?;
        let _ = self
            .ledger
            .mark(receipt.payment_tx, FulfillmentStatus::Generating);

        match self.runner.run(&mut self.state).await {
            Ok(()) => {
                let _ = self
                    .ledger
                    .mark(receipt.payment_tx, FulfillmentStatus::Delivered);
                Ok(())
            }
            Err(e) => {
                let _ = self
                    .ledger
                    .mark(receipt.payment_tx, FulfillmentStatus::Failed);
                self.state.status = format!("image generation failed: {e}");
                self.state.payment_phase = PaymentPhase::Failed;
                Err(AppError::Pipeline(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_enforces_prompt_bounds() {
        assert!(GenerationController::submit("").is_err());
        assert!(GenerationController::submit("   \n\t").is_err());
        assert!(GenerationController::submit(&"x".repeat(301)).is_err());

        let request = GenerationController::submit("a sunset over mountains").unwrap();
        assert_eq!(request.prompt, "a sunset over mountains");
        assert!(request.id.starts_with("req_"));
    }
}
