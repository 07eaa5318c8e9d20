//! Cached reads of the token's on-chain state

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use alloy::{
    primitives::{Address, B256, U256},
    providers::{DynProvider, Provider},
};
use async_trait::async_trait;
use deploy_common::{
    constants::{IMPLEMENTATION_STORAGE_SLOT, V1_VERSION, V2_VERSION},
    solidity::AssetToken,
    storage::address_from_storage_word,
};

use crate::errors::ClientError;

/// Identifies a cached read
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReadKey {
    /// `paused()`
    Paused,
    /// `getInitializedVersion()`
    Version,
    /// `balanceOf(account)`
    BalanceOf(Address),
    /// `hasRole(role, account)`
    HasRole(B256, Address),
    /// The EIP-1967 implementation slot of the proxy
    ImplementationSlot,
}

/// The result of a cached read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadValue {
    /// A boolean result
    Bool(bool),
    /// An initialized version
    Version(u64),
    /// A token amount
    Amount(U256),
    /// An address, absent for an empty slot
    Address(Option<Address>),
}

/// A cache of contract reads, invalidated wholesale after every successful
/// transaction
#[derive(Debug, Default)]
pub struct ReadCache {
    /// The cached values
    entries: Mutex<HashMap<ReadKey, ReadValue>>,
}

impl ReadCache {
    /// An empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value of `key`
    pub fn get(&self, key: &ReadKey) -> Option<ReadValue> {
        self.entries.lock().ok()?.get(key).copied()
    }

    /// Cache `value` under `key`
    pub fn insert(&self, key: ReadKey, value: ReadValue) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, value);
        }
    }

    /// Drop every cached value
    pub fn invalidate_all(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// The number of cached values
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads the token's state from the chain
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Perform the read identified by `key` against `proxy`
    async fn read(&self, proxy: Address, key: ReadKey) -> Result<ReadValue, ClientError>;
}

/// Reads through an alloy provider using the contract bindings
pub struct RpcReader {
    /// The RPC client
    provider: DynProvider,
}

impl RpcReader {
    /// A reader over `provider`
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ChainReader for RpcReader {
    async fn read(&self, proxy: Address, key: ReadKey) -> Result<ReadValue, ClientError> {
        let rpc_err = |e: alloy::contract::Error| ClientError::Rpc(e.to_string());
        let token = AssetToken::new(proxy, self.provider.clone());

        let value = match key {
            ReadKey::Paused => ReadValue::Bool(token.paused().call().await.map_err(rpc_err)?._0),
            ReadKey::Version => {
                ReadValue::Version(token.getInitializedVersion().call().await.map_err(rpc_err)?._0)
            }
            ReadKey::BalanceOf(account) => {
                ReadValue::Amount(token.balanceOf(account).call().await.map_err(rpc_err)?._0)
            }
            ReadKey::HasRole(role, account) => {
                ReadValue::Bool(token.hasRole(role, account).call().await.map_err(rpc_err)?._0)
            }
            ReadKey::ImplementationSlot => {
                let word = self
                    .provider
                    .get_storage_at(proxy, U256::from_be_bytes(IMPLEMENTATION_STORAGE_SLOT.0))
                    .await
                    .map_err(|e| ClientError::Rpc(e.to_string()))?;
                ReadValue::Address(address_from_storage_word(word))
            }
        };

        Ok(value)
    }
}

/// Whether the proxy has been initialized & upgraded, derived from its
/// initialized version
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionFlags {
    /// V1 has been initialized
    pub deployed: bool,
    /// The proxy has been upgraded to V2
    pub upgraded: bool,
}

impl VersionFlags {
    /// The flags for an initialized version
    pub fn from_version(version: u64) -> Self {
        Self { deployed: version >= V1_VERSION, upgraded: version == V2_VERSION }
    }
}

/// The result of comparing the implementation slot with the orchestrator's
/// record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImplementationCheck {
    /// The slot holds the reported implementation
    Match,
    /// The slot holds a different implementation
    Mismatch {
        /// The implementation in the slot
        on_chain: Address,
        /// The implementation reported by the orchestrator
        reported: Address,
    },
    /// One side is unknown
    Unknown,
}

impl ImplementationCheck {
    /// Compare the slot contents with the reported implementation
    pub fn compare(on_chain: Option<Address>, reported: Option<Address>) -> Self {
        match (on_chain, reported) {
            (Some(on_chain), Some(reported)) if on_chain == reported => Self::Match,
            (Some(on_chain), Some(reported)) => Self::Mismatch { on_chain, reported },
            _ => Self::Unknown,
        }
    }
}

/// Cached, typed reads of the token behind the proxy
pub struct TokenReader {
    /// Performs uncached reads
    reader: Arc<dyn ChainReader>,
    /// The cache shared with the session
    cache: Arc<ReadCache>,
}

impl TokenReader {
    /// A reader caching into `cache`
    pub fn new(reader: Arc<dyn ChainReader>, cache: Arc<ReadCache>) -> Self {
        Self { reader, cache }
    }

    /// Whether transfers are paused
    pub async fn paused(&self, proxy: Option<Address>) -> Result<bool, ClientError> {
        match self.read(proxy, ReadKey::Paused).await? {
            ReadValue::Bool(paused) => Ok(paused),
            other => Err(unexpected(ReadKey::Paused, other)),
        }
    }

    /// The initialized version of the proxy
    pub async fn initialized_version(&self, proxy: Option<Address>) -> Result<u64, ClientError> {
        match self.read(proxy, ReadKey::Version).await? {
            ReadValue::Version(version) => Ok(version),
            other => Err(unexpected(ReadKey::Version, other)),
        }
    }

    /// The deployment flags derived from the initialized version
    pub async fn version_flags(&self, proxy: Option<Address>) -> Result<VersionFlags, ClientError> {
        self.initialized_version(proxy).await.map(VersionFlags::from_version)
    }

    /// The token balance of `account`
    pub async fn balance_of(
        &self,
        proxy: Option<Address>,
        account: Address,
    ) -> Result<U256, ClientError> {
        let key = ReadKey::BalanceOf(account);
        match self.read(proxy, key).await? {
            ReadValue::Amount(balance) => Ok(balance),
            other => Err(unexpected(key, other)),
        }
    }

    /// Whether `account` holds `role`
    pub async fn has_role(
        &self,
        proxy: Option<Address>,
        role: B256,
        account: Address,
    ) -> Result<bool, ClientError> {
        let key = ReadKey::HasRole(role, account);
        match self.read(proxy, key).await? {
            ReadValue::Bool(has_role) => Ok(has_role),
            other => Err(unexpected(key, other)),
        }
    }

    /// The implementation the proxy currently delegates to
    pub async fn implementation(
        &self,
        proxy: Option<Address>,
    ) -> Result<Option<Address>, ClientError> {
        match self.read(proxy, ReadKey::ImplementationSlot).await? {
            ReadValue::Address(implementation) => Ok(implementation),
            other => Err(unexpected(ReadKey::ImplementationSlot, other)),
        }
    }

    /// Compare the implementation slot with the implementation reported by
    /// the orchestrator
    pub async fn check_implementation(
        &self,
        proxy: Option<Address>,
        reported: Option<Address>,
    ) -> Result<ImplementationCheck, ClientError> {
        let on_chain = self.implementation(proxy).await?;
        Ok(ImplementationCheck::compare(on_chain, reported))
    }

    /// Read through the cache, refusing when no proxy is known
    async fn read(&self, proxy: Option<Address>, key: ReadKey) -> Result<ReadValue, ClientError> {
        let proxy = proxy.ok_or(ClientError::NotDeployed)?;
        if let Some(value) = self.cache.get(&key) {
            return Ok(value);
        }

        let value = self.reader.read(proxy, key).await?;
        self.cache.insert(key, value);
        Ok(value)
    }
}

/// The error for a cached value of the wrong shape
fn unexpected(key: ReadKey, value: ReadValue) -> ClientError {
    ClientError::Decode(format!("unexpected value {:?} for {:?}", value, key))
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use alloy::primitives::{address, Address, U256};
    use async_trait::async_trait;
    use deploy_common::{constants::DEFAULT_ADMIN_ROLE, storage::minter_role};

    use super::{
        ChainReader, ImplementationCheck, ReadCache, ReadKey, ReadValue, TokenReader,
        VersionFlags,
    };
    use crate::errors::ClientError;

    const PROXY: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
    const ADMIN: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");

    /// Answers every read with a fixed state & counts the reads
    #[derive(Default)]
    struct FakeChain {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl ChainReader for FakeChain {
        async fn read(&self, _proxy: Address, key: ReadKey) -> Result<ReadValue, ClientError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(match key {
                ReadKey::Paused => ReadValue::Bool(false),
                ReadKey::Version => ReadValue::Version(2),
                ReadKey::BalanceOf(_) => ReadValue::Amount(U256::from(1000)),
                ReadKey::HasRole(role, account) => {
                    ReadValue::Bool(role == DEFAULT_ADMIN_ROLE && account == ADMIN)
                }
                ReadKey::ImplementationSlot => {
                    ReadValue::Address(Some(address!("cccccccccccccccccccccccccccccccccccccccc")))
                }
            })
        }
    }

    fn reader() -> (TokenReader, Arc<FakeChain>, Arc<ReadCache>) {
        let chain = Arc::new(FakeChain::default());
        let cache = Arc::new(ReadCache::new());
        (TokenReader::new(chain.clone(), cache.clone()), chain, cache)
    }

    #[test]
    fn test_version_flags() {
        let flags = |deployed, upgraded| VersionFlags { deployed, upgraded };
        assert_eq!(VersionFlags::from_version(0), flags(false, false));
        assert_eq!(VersionFlags::from_version(1), flags(true, false));
        assert_eq!(VersionFlags::from_version(2), flags(true, true));
    }

    #[test]
    fn test_implementation_check() {
        let a = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        let c = address!("cccccccccccccccccccccccccccccccccccccccc");

        assert_eq!(ImplementationCheck::compare(Some(a), Some(a)), ImplementationCheck::Match);
        assert_eq!(
            ImplementationCheck::compare(Some(c), Some(a)),
            ImplementationCheck::Mismatch { on_chain: c, reported: a }
        );
        assert_eq!(ImplementationCheck::compare(None, Some(a)), ImplementationCheck::Unknown);
        assert_eq!(ImplementationCheck::compare(Some(a), None), ImplementationCheck::Unknown);
    }

    #[tokio::test]
    async fn test_reads_are_cached() {
        let (reader, chain, cache) = reader();

        assert!(!reader.paused(Some(PROXY)).await.unwrap());
        assert!(!reader.paused(Some(PROXY)).await.unwrap());
        assert_eq!(chain.reads.load(Ordering::SeqCst), 1);

        cache.invalidate_all();
        assert!(!reader.paused(Some(PROXY)).await.unwrap());
        assert_eq!(chain.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reads_keyed_by_arguments() {
        let (reader, chain, _) = reader();

        assert!(reader.has_role(Some(PROXY), DEFAULT_ADMIN_ROLE, ADMIN).await.unwrap());
        assert!(!reader.has_role(Some(PROXY), minter_role(), ADMIN).await.unwrap());
        assert_eq!(chain.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reads_require_proxy() {
        let (reader, chain, _) = reader();

        assert_eq!(reader.initialized_version(None).await, Err(ClientError::NotDeployed));
        assert_eq!(chain.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_check_implementation() {
        let (reader, _, _) = reader();

        let check = reader
            .check_implementation(
                Some(PROXY),
                Some(address!("cccccccccccccccccccccccccccccccccccccccc")),
            )
            .await
            .unwrap();
        assert_eq!(check, ImplementationCheck::Match);

        let flags = reader.version_flags(Some(PROXY)).await.unwrap();
        assert!(flags.upgraded);
    }
}
