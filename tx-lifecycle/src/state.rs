//! The lifecycle of a single user-initiated transaction
//!
//! A tracker holds at most one transaction at a time. Submitting moves it
//! through signing & pending to a terminal success or error, publishing each
//! state on a watch channel.

use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    calls::ContractCall,
    errors::{SubmitRejected, TxError},
    wallet::Wallet,
};

/// The state of the tracked transaction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TxState {
    /// No transaction has been submitted
    #[default]
    Idle,
    /// Waiting for the wallet to sign & send
    Signing,
    /// Sent, waiting to be mined
    Pending(TxHash),
    /// Mined & executed successfully
    Success,
    /// Rejected, reverted, or lost, with a message for the user
    Error(String),
}

impl TxState {
    /// Whether a transaction is being signed or awaiting its receipt
    pub fn in_flight(&self) -> bool {
        matches!(self, TxState::Signing | TxState::Pending(_))
    }
}

/// The number of confirmations of a transaction mined in `receipt_block`,
/// given the chain head is at `latest_block`
///
/// A head behind the receipt block, e.g. from a lagging node, counts as zero.
pub fn confirmations(latest_block: u64, receipt_block: u64) -> u64 {
    if latest_block < receipt_block {
        return 0;
    }

    (latest_block - receipt_block).saturating_add(1)
}

/// Work done after a transaction succeeds, so the client stops showing stale
/// chain data
#[async_trait]
pub trait RefreshHooks: Send + Sync {
    /// Re-fetch the deployment & drop cached contract reads
    async fn refresh(&self);
}

/// The blocks used to count confirmations
#[derive(Clone, Copy, Debug, Default)]
struct BlockTracking {
    /// The block the tracked transaction was mined in
    receipt_block: Option<u64>,
    /// The latest observed chain head
    head: Option<u64>,
}

/// Drives one transaction at a time from submission to a terminal state
pub struct TxTracker {
    /// Signs & sends the transactions
    wallet: Arc<dyn Wallet>,
    /// Run on every success
    hooks: Arc<dyn RefreshHooks>,
    /// The current state, published to subscribers
    state_tx: watch::Sender<TxState>,
    /// The blocks used to count confirmations
    blocks: Mutex<BlockTracking>,
}

impl TxTracker {
    /// Construct an idle tracker
    pub fn new(wallet: Arc<dyn Wallet>, hooks: Arc<dyn RefreshHooks>) -> Self {
        let (state_tx, _) = watch::channel(TxState::Idle);
        Self { wallet, hooks, state_tx, blocks: Mutex::new(BlockTracking::default()) }
    }

    /// The current state
    pub fn state(&self) -> TxState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<TxState> {
        self.state_tx.subscribe()
    }

    /// Send `call` to `proxy` & follow it to a terminal state
    ///
    /// Refused without any state change if no proxy is known or another
    /// transaction is in flight. Otherwise returns the terminal state.
    pub async fn submit(
        &self,
        proxy: Option<Address>,
        call: ContractCall,
    ) -> Result<TxState, SubmitRejected> {
        let proxy = proxy.ok_or(SubmitRejected::NoTarget)?;

        let mut in_flight = false;
        self.state_tx.send_if_modified(|state| {
            if state.in_flight() {
                in_flight = true;
                return false;
            }

            *state = TxState::Signing;
            true
        });
        if in_flight {
            return Err(SubmitRejected::InFlight);
        }

        self.set_receipt_block(None);
        info!("submitting {} to {}", call, proxy);

        let terminal = match self.execute(proxy, &call).await {
            Ok(()) => TxState::Success,
            Err(e) => {
                warn!("{} failed: {}", call, e);
                TxState::Error(e.to_string())
            }
        };
        self.state_tx.send_replace(terminal.clone());

        if terminal == TxState::Success {
            self.hooks.refresh().await;
        }
        Ok(terminal)
    }

    /// Record the latest chain head
    pub fn observe_head(&self, block: u64) {
        if let Ok(mut blocks) = self.blocks.lock() {
            blocks.head = Some(block);
        }
    }

    /// The confirmations of the tracked transaction, zero until it is mined
    /// & a head has been observed
    pub fn confirmations(&self) -> u64 {
        match self.blocks.lock().map(|b| *b) {
            Ok(BlockTracking { receipt_block: Some(receipt), head: Some(head) }) => {
                confirmations(head, receipt)
            }
            _ => 0,
        }
    }

    /// Sign, send, & await the transaction
    async fn execute(&self, proxy: Address, call: &ContractCall) -> Result<(), TxError> {
        let hash = self.wallet.send(call.to_request(proxy)).await?;
        self.state_tx.send_replace(TxState::Pending(hash));

        let receipt = self.wallet.wait_for_receipt(hash).await?;
        self.set_receipt_block(receipt.block_number);

        if receipt.success {
            Ok(())
        } else {
            Err(TxError::TransactionReverted)
        }
    }

    /// Record the block the tracked transaction was mined in
    fn set_receipt_block(&self, block: Option<u64>) {
        if let Ok(mut blocks) = self.blocks.lock() {
            blocks.receipt_block = block;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use alloy::{
        primitives::{address, b256, Address, TxHash},
        rpc::types::TransactionRequest,
    };
    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::{confirmations, RefreshHooks, TxState, TxTracker};
    use crate::{
        calls::ContractCall,
        errors::{SubmitRejected, TxError},
        wallet::{ReceiptSummary, Wallet},
    };

    const PROXY: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
    const HASH: TxHash = b256!("1111111111111111111111111111111111111111111111111111111111111111");

    /// A wallet with a fixed response to every request
    struct FakeWallet {
        /// The response to `send`
        send: Result<TxHash, TxError>,
        /// The response to `wait_for_receipt`
        receipt: Result<ReceiptSummary, TxError>,
        /// Awaited before the receipt is returned, when set
        receipt_gate: Option<Arc<Notify>>,
        /// The number of receipt waits
        receipt_waits: AtomicUsize,
        /// The requests sent
        sent: Mutex<Vec<TransactionRequest>>,
    }

    impl FakeWallet {
        fn new(
            send: Result<TxHash, TxError>,
            receipt: Result<ReceiptSummary, TxError>,
        ) -> Self {
            Self {
                send,
                receipt,
                receipt_gate: None,
                receipt_waits: AtomicUsize::new(0),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn mined(success: bool, block: u64) -> Self {
            Self::new(Ok(HASH), Ok(ReceiptSummary { success, block_number: Some(block) }))
        }
    }

    #[async_trait]
    impl Wallet for FakeWallet {
        async fn send(&self, tx: TransactionRequest) -> Result<TxHash, TxError> {
            self.sent.lock().unwrap().push(tx);
            self.send.clone()
        }

        async fn wait_for_receipt(&self, _hash: TxHash) -> Result<ReceiptSummary, TxError> {
            self.receipt_waits.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.receipt_gate {
                gate.notified().await;
            }
            self.receipt.clone()
        }
    }

    /// Counts refreshes
    #[derive(Default)]
    struct CountingHooks(AtomicUsize);

    #[async_trait]
    impl RefreshHooks for CountingHooks {
        async fn refresh(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tracker(wallet: FakeWallet) -> (TxTracker, Arc<FakeWallet>, Arc<CountingHooks>) {
        let wallet = Arc::new(wallet);
        let hooks = Arc::new(CountingHooks::default());
        (TxTracker::new(wallet.clone(), hooks.clone()), wallet, hooks)
    }

    #[test]
    fn test_confirmations() {
        assert_eq!(confirmations(105, 100), 6);
        assert_eq!(confirmations(100, 100), 1);
        assert_eq!(confirmations(99, 100), 0);
        assert_eq!(confirmations(0, u64::MAX), 0);
    }

    #[tokio::test]
    async fn test_success_refreshes_once() {
        let (tracker, wallet, hooks) = tracker(FakeWallet::mined(true, 100));
        let mut states = tracker.subscribe();

        let state = tracker.submit(Some(PROXY), ContractCall::Pause).await.unwrap();

        assert_eq!(state, TxState::Success);
        assert_eq!(tracker.state(), TxState::Success);
        assert_eq!(hooks.0.load(Ordering::SeqCst), 1);
        assert_eq!(wallet.sent.lock().unwrap().len(), 1);
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), TxState::Success);
    }

    #[tokio::test]
    async fn test_revert() {
        let (tracker, _, hooks) = tracker(FakeWallet::mined(false, 100));

        let state = tracker.submit(Some(PROXY), ContractCall::Unpause).await.unwrap();

        assert_eq!(state, TxState::Error("Transaction reverted".to_string()));
        assert_eq!(hooks.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejection_skips_receipt() {
        let wallet = FakeWallet::new(
            Err(TxError::TransactionRejected("User denied transaction signature".to_string())),
            Ok(ReceiptSummary { success: true, block_number: Some(1) }),
        );
        let (tracker, wallet, hooks) = tracker(wallet);

        let state = tracker.submit(Some(PROXY), ContractCall::Pause).await.unwrap();

        assert_eq!(state, TxState::Error("User denied transaction signature".to_string()));
        assert_eq!(wallet.receipt_waits.load(Ordering::SeqCst), 0);
        assert_eq!(hooks.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejection_without_message() {
        let wallet = FakeWallet::new(
            Err(TxError::TransactionRejected(String::new())),
            Ok(ReceiptSummary { success: true, block_number: Some(1) }),
        );
        let (tracker, _, _) = tracker(wallet);

        let state = tracker.submit(Some(PROXY), ContractCall::Pause).await.unwrap();
        assert_eq!(state, TxState::Error("Transaction rejected".to_string()));
    }

    #[tokio::test]
    async fn test_receipt_failure() {
        let wallet =
            FakeWallet::new(Ok(HASH), Err(TxError::Receipt("connection reset".to_string())));
        let (tracker, _, _) = tracker(wallet);

        let state = tracker.submit(Some(PROXY), ContractCall::Pause).await.unwrap();
        assert_eq!(state, TxState::Error("connection reset".to_string()));
    }

    #[tokio::test]
    async fn test_no_target() {
        let (tracker, wallet, _) = tracker(FakeWallet::mined(true, 100));

        let res = tracker.submit(None, ContractCall::Pause).await;

        assert_eq!(res, Err(SubmitRejected::NoTarget));
        assert_eq!(tracker.state(), TxState::Idle);
        assert!(wallet.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_rejected() {
        let gate = Arc::new(Notify::new());
        let mut wallet = FakeWallet::mined(true, 100);
        wallet.receipt_gate = Some(gate.clone());
        let (tracker, wallet, hooks) = tracker(wallet);
        let tracker = Arc::new(tracker);

        let first = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.submit(Some(PROXY), ContractCall::Pause).await }
        });

        // Wait until the first transaction is pending
        let mut states = tracker.subscribe();
        states.wait_for(|s| matches!(s, TxState::Pending(_))).await.unwrap();

        let second = tracker.submit(Some(PROXY), ContractCall::Unpause).await;
        assert_eq!(second, Err(SubmitRejected::InFlight));
        assert_eq!(tracker.state(), TxState::Pending(HASH));

        gate.notify_one();
        assert_eq!(first.await.unwrap(), Ok(TxState::Success));
        assert_eq!(wallet.sent.lock().unwrap().len(), 1);
        assert_eq!(hooks.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resubmit_after_terminal() {
        let (tracker, wallet, hooks) = tracker(FakeWallet::mined(true, 100));

        tracker.submit(Some(PROXY), ContractCall::Pause).await.unwrap();
        tracker.submit(Some(PROXY), ContractCall::Unpause).await.unwrap();

        assert_eq!(wallet.sent.lock().unwrap().len(), 2);
        assert_eq!(hooks.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_tracker_confirmations() {
        let (tracker, _, _) = tracker(FakeWallet::mined(true, 100));
        tracker.observe_head(100);
        assert_eq!(tracker.confirmations(), 0);

        tracker.submit(Some(PROXY), ContractCall::Pause).await.unwrap();
        assert_eq!(tracker.confirmations(), 1);

        tracker.observe_head(105);
        assert_eq!(tracker.confirmations(), 6);

        tracker.observe_head(99);
        assert_eq!(tracker.confirmations(), 0);
    }
}
