//! Signing, sending, and awaiting transactions

use std::{str::FromStr, time::Duration};

use alloy::{
    network::{EthereumWallet, ReceiptResponse},
    primitives::TxHash,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use tracing::debug;

use crate::errors::{ClientError, TxError};

/// The default interval between receipt polls
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The outcome of a mined transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiptSummary {
    /// Whether the transaction executed without reverting
    pub success: bool,
    /// The block the transaction was included in
    pub block_number: Option<u64>,
}

/// A wallet able to sign & send transactions
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Sign & send the transaction, returning its hash
    ///
    /// Fails with `TransactionRejected` if the wallet refuses.
    async fn send(&self, tx: TransactionRequest) -> Result<TxHash, TxError>;

    /// Wait until the transaction is mined
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<ReceiptSummary, TxError>;
}

/// A wallet backed by a local key & an HTTP provider
pub struct AlloyWallet {
    /// The signing provider
    provider: DynProvider,
    /// The interval between receipt polls
    poll_interval: Duration,
}

impl AlloyWallet {
    /// Wrap a provider that can sign for its sender
    pub fn new(provider: DynProvider) -> Self {
        Self { provider, poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL }
    }

    /// Connect to the node at `rpc_url`, signing with `private_key`
    pub fn connect(rpc_url: &str, private_key: &str) -> Result<Self, ClientError> {
        let url = Url::parse(rpc_url).map_err(|e| ClientError::Rpc(e.to_string()))?;
        let signer =
            PrivateKeySigner::from_str(private_key).map_err(|e| ClientError::Rpc(e.to_string()))?;

        let provider =
            ProviderBuilder::new().wallet(EthereumWallet::from(signer)).on_http(url);
        Ok(Self::new(DynProvider::new(provider)))
    }

    /// Set the interval between receipt polls
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// The underlying provider
    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// The latest block number
    pub async fn latest_block(&self) -> Result<u64, ClientError> {
        self.provider.get_block_number().await.map_err(|e| ClientError::Rpc(e.to_string()))
    }
}

#[async_trait]
impl Wallet for AlloyWallet {
    async fn send(&self, tx: TransactionRequest) -> Result<TxHash, TxError> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| TxError::TransactionRejected(e.to_string()))?;

        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<ReceiptSummary, TxError> {
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| TxError::Receipt(e.to_string()))?;

            if let Some(receipt) = receipt {
                return Ok(ReceiptSummary {
                    success: receipt.status(),
                    block_number: receipt.block_number,
                });
            }

            debug!("transaction {} not yet mined", hash);
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
