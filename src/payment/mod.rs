//! On-chain payment flow (Base / USDC)
//!
//! A purchase is two strictly sequential transactions from the buyer's
//! wallet: an ERC-20 allowance approval for the payment contract, then the
//! contract's zero-argument `payForImages()` call. The coordinator observes
//! both confirmations before it signals success, and the fulfillment ledger
//! ties each confirmed payment to exactly one generation run.

pub mod coordinator;
pub mod ledger;
pub mod wallet;

pub use coordinator::{PaymentCoordinator, PaymentReceipt};
pub use ledger::{Fulfillment, FulfillmentLedger, FulfillmentStatus, LedgerError};
pub use wallet::{EthersWallet, TxStatus, WalletProvider};

use ethers::types::H256;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("wallet is not connected")]
    WalletNotConnected,

    #[error("transaction submission rejected: {0}")]
    Rejected(String),

    #[error("transaction {tx:#x} reverted on-chain")]
    Reverted { tx: H256 },

    #[error("transaction {tx:#x} unconfirmed after {waited:?}")]
    ConfirmationTimeout { tx: H256, waited: Duration },

    #[error("payment flow cancelled")]
    Cancelled,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("payment not configured: {0}")]
    NotConfigured(&'static str),

    #[error("approval step failed: {source}")]
    ApprovalStep {
        #[source]
        source: Box<PaymentError>,
    },

    #[error("payment step failed: {source}")]
    PaymentStep {
        #[source]
        source: Box<PaymentError>,
    },
}
