// Wallet seam and the ethers-backed implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::middleware::{Middleware, SignerMiddleware};
use ethers::providers::{Http, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256, U256};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::PaymentConfig;
use crate::payment::PaymentError;

abigen!(
    Erc20Token,
    r#"[
        function approve(address spender, uint256 amount) external returns (bool)
        function allowance(address owner, address spender) external view returns (uint256)
    ]"#
);

abigen!(
    AssetPaymentContract,
    r#"[
        function payForImages() external
    ]"#
);

/// Terminal state of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Confirmed,
    Reverted,
}

/// The seam between the payment coordinator and an actual wallet. Test
/// doubles script the same interface; production uses [`EthersWallet`].
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Connected account, or `None` when no wallet is available.
    fn address(&self) -> Option<Address>;

    /// Submit the ERC-20 allowance approval for the payment contract.
    async fn submit_approval(&self, amount: U256) -> Result<H256, PaymentError>;

    /// Submit the payment contract call.
    async fn submit_payment(&self) -> Result<H256, PaymentError>;

    /// Wait until the transaction is mined, bounded by `wait` and the
    /// cancellation token. Reorg handling is out of scope: the first
    /// observed receipt is final.
    async fn wait_for_confirmation(
        &self,
        tx: H256,
        wait: Duration,
        cancel: &CancellationToken,
    ) -> Result<TxStatus, PaymentError>;
}

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Wallet backed by a JSON-RPC provider and a local signing key.
pub struct EthersWallet {
    client: Arc<SignerClient>,
    token: Address,
    contract: Address,
    poll_interval: Duration,
}

impl EthersWallet {
    pub fn from_config(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let key = config
            .wallet_private_key
            .as_deref()
            .ok_or(PaymentError::NotConfigured("WALLET_PRIVATE_KEY"))?;
        let contract = config
            .contract_address
            .as_deref()
            .ok_or(PaymentError::NotConfigured("PAYMENT_CONTRACT_ADDRESS"))?;

        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| PaymentError::Provider(e.to_string()))?;
        let signer: LocalWallet = key
            .parse()
            .map_err(|e| PaymentError::Provider(format!("invalid wallet key: {e}")))?;
        let signer = signer.with_chain_id(config.chain_id());

        let token = config
            .token_address()
            .parse::<Address>()
            .map_err(|e| PaymentError::Provider(format!("invalid token address: {e}")))?;
        let contract = contract
            .parse::<Address>()
            .map_err(|e| PaymentError::Provider(format!("invalid contract address: {e}")))?;

        info!(network = %config.network, %token, %contract, "ethers wallet initialized");

        Ok(Self {
            client: Arc::new(SignerMiddleware::new(provider, signer)),
            token,
            contract,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    /// Current allowance granted to the payment contract by the buyer.
    pub async fn allowance(&self) -> Result<U256, PaymentError> {
        let owner = self.client.signer().address();
        let erc20 = Erc20Token::new(self.token, self.client.clone());
        erc20
            .allowance(owner, self.contract)
            .call()
            .await
            .map_err(|e| PaymentError::Provider(e.to_string()))
    }
}

#[async_trait]
impl WalletProvider for EthersWallet {
    fn address(&self) -> Option<Address> {
        Some(self.client.signer().address())
    }

    async fn submit_approval(&self, amount: U256) -> Result<H256, PaymentError> {
        let erc20 = Erc20Token::new(self.token, self.client.clone());
        let call = erc20.approve(self.contract, amount);
        let pending = call
            .send()
            .await
            .map_err(|e| PaymentError::Rejected(e.to_string()))?;
        let tx = *pending;
        debug!(tx = ?tx, %amount, "approval transaction submitted");
        Ok(tx)
    }

    async fn submit_payment(&self) -> Result<H256, PaymentError> {
        let contract = AssetPaymentContract::new(self.contract, self.client.clone());
        let call = contract.pay_for_images();
        let pending = call
            .send()
            .await
            .map_err(|e| PaymentError::Rejected(e.to_string()))?;
        let tx = *pending;
        debug!(tx = ?tx, "payment transaction submitted");
        Ok(tx)
    }

    async fn wait_for_confirmation(
        &self,
        tx: H256,
        wait: Duration,
        cancel: &CancellationToken,
    ) -> Result<TxStatus, PaymentError> {
        let poll = async {
            loop {
                match self.client.get_transaction_receipt(tx).await {
                    Ok(Some(receipt)) => {
                        let status = if receipt.status == Some(1.into()) {
                            TxStatus::Confirmed
                        } else {
                            TxStatus::Reverted
                        };
                        return Ok(status);
                    }
                    Ok(None) => sleep(self.poll_interval).await,
                    Err(e) => return Err(PaymentError::Provider(e.to_string())),
                }
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(PaymentError::Cancelled),
            outcome = tokio::time::timeout(wait, poll) => match outcome {
                Ok(result) => result,
                Err(_) => Err(PaymentError::ConfirmationTimeout { tx, waited: wait }),
            },
        }
    }
}
