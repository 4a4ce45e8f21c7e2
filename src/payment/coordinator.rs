// Two-phase payment state machine: approve, confirm, pay, confirm, signal.

use std::time::Duration;

use ethers::types::{Address, H256, U256};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::payment::wallet::{TxStatus, WalletProvider};
use crate::payment::PaymentError;
use crate::types::PaymentPhase;

/// Hashes of the two confirmed transactions backing a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub payer: Address,
    pub approval_tx: H256,
    pub payment_tx: H256,
}

/// Drives the approve-then-pay flow against a [`WalletProvider`].
///
/// The success callback fires exactly once, and only after the approval and
/// the payment have both confirmed, in that order. A rejected, reverted, or
/// unconfirmed transaction restores the phase to its pre-transaction step;
/// retrying is the caller's decision, never automatic.
pub struct PaymentCoordinator {
    amount: U256,
    confirmation_timeout: Duration,
    phase: watch::Sender<PaymentPhase>,
}

impl PaymentCoordinator {
    pub fn new(amount: U256, confirmation_timeout: Duration) -> Self {
        let (phase, _) = watch::channel(PaymentPhase::AwaitingApproval);
        Self {
            amount,
            confirmation_timeout,
            phase,
        }
    }

    /// Observe phase transitions as they happen.
    pub fn phase(&self) -> watch::Receiver<PaymentPhase> {
        self.phase.subscribe()
    }

    pub fn current_phase(&self) -> PaymentPhase {
        *self.phase.borrow()
    }

    fn set_phase(&self, phase: PaymentPhase) {
        self.phase.send_replace(phase);
    }

    /// Run the full flow. `on_confirmed` is invoked exactly once with the
    /// receipt iff the payment confirmed after the approval did.
    pub async fn collect<F>(
        &self,
        wallet: &dyn WalletProvider,
        cancel: &CancellationToken,
        on_confirmed: F,
    ) -> Result<PaymentReceipt, PaymentError>
    where
        F: FnOnce(&PaymentReceipt),
    {
        let Some(payer) = wallet.address() else {
            // No state transition: the flow never started.
            return Err(PaymentError::WalletNotConnected);
        };

        self.set_phase(PaymentPhase::AwaitingApproval);
        info!(%payer, amount = %self.amount, "requesting allowance approval");

        let approval_tx = match wallet.submit_approval(self.amount).await {
            Ok(tx) => tx,
            Err(e) => {
                warn!(error = %e, "approval submission rejected");
                return Err(PaymentError::ApprovalStep { source: Box::new(e) });
            }
        };

        self.set_phase(PaymentPhase::ApprovalPending);
        match wallet
            .wait_for_confirmation(approval_tx, self.confirmation_timeout, cancel)
            .await
        {
            Ok(TxStatus::Confirmed) => {}
            Ok(TxStatus::Reverted) => {
                self.set_phase(PaymentPhase::AwaitingApproval);
                return Err(PaymentError::ApprovalStep {
                    source: Box::new(PaymentError::Reverted { tx: approval_tx }),
                });
            }
            Err(e) => {
                self.set_phase(PaymentPhase::AwaitingApproval);
                return Err(PaymentError::ApprovalStep { source: Box::new(e) });
            }
        }

        self.set_phase(PaymentPhase::AwaitingPayment);
        info!(approval_tx = ?approval_tx, "approval confirmed, requesting payment");

        let payment_tx = match wallet.submit_payment().await {
            Ok(tx) => tx,
            Err(e) => {
                warn!(error = %e, "payment submission rejected");
                return Err(PaymentError::PaymentStep { source: Box::new(e) });
            }
        };

        self.set_phase(PaymentPhase::PaymentPending);
        match wallet
            .wait_for_confirmation(payment_tx, self.confirmation_timeout, cancel)
            .await
        {
            Ok(TxStatus::Confirmed) => {}
            Ok(TxStatus::Reverted) => {
                self.set_phase(PaymentPhase::AwaitingPayment);
                return Err(PaymentError::PaymentStep {
                    source: Box::new(PaymentError::Reverted { tx: payment_tx }),
                });
            }
            Err(e) => {
                self.set_phase(PaymentPhase::AwaitingPayment);
                return Err(PaymentError::PaymentStep { source: Box::new(e) });
            }
        }

        self.set_phase(PaymentPhase::Confirmed);
        info!(payment_tx = ?payment_tx, "payment confirmed");

        let receipt = PaymentReceipt {
            payer,
            approval_tx,
            payment_tx,
        };
        on_confirmed(&receipt);
        Ok(receipt)
    }
}
