// In-memory fulfillment ledger: one confirmed payment, one generation run.
//
// The ledger is intentionally not durable; restarting the process forgets
// past fulfillments. It exists to stop a confirmed transaction hash from
// gating more than one run within a process lifetime.

use std::collections::HashMap;
use std::sync::Mutex;

use ethers::types::H256;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("payment {tx:#x} already claimed by request {existing}")]
    AlreadyClaimed { tx: H256, existing: String },

    #[error("payment {tx:#x} is not recorded")]
    Unknown { tx: H256 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentStatus {
    Paid,
    Generating,
    Delivered,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Fulfillment {
    pub request_id: String,
    pub status: FulfillmentStatus,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Default)]
pub struct FulfillmentLedger {
    inner: Mutex<HashMap<H256, Fulfillment>>,
}

impl FulfillmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a confirmed payment to a request. Fails if the transaction was
    /// already claimed, by this request or any other.
    pub fn claim(&self, tx: H256, request_id: &str) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().expect("fulfillment ledger poisoned");
        if let Some(existing) = inner.get(&tx) {
            return Err(LedgerError::AlreadyClaimed {
                tx,
                existing: existing.request_id.clone(),
            });
        }
        inner.insert(
            tx,
            Fulfillment {
                request_id: request_id.to_string(),
                status: FulfillmentStatus::Paid,
                recorded_at: chrono::Utc::now(),
            },
        );
        debug!(tx = ?tx, request_id, "payment claimed");
        Ok(())
    }

    pub fn mark(&self, tx: H256, status: FulfillmentStatus) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().expect("fulfillment ledger poisoned");
        match inner.get_mut(&tx) {
            Some(fulfillment) => {
                fulfillment.status = status;
                Ok(())
            }
            None => Err(LedgerError::Unknown { tx }),
        }
    }

    pub fn get(&self, tx: H256) -> Option<Fulfillment> {
        self.inner
            .lock()
            .expect("fulfillment ledger poisoned")
            .get(&tx)
            .cloned()
    }
}
