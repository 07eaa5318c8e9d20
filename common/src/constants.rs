//! Constants shared by the orchestrator and its clients

use alloy::primitives::{b256, B256};

/// The storage slot containing the implementation contract address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#logic-contract-address
pub const IMPLEMENTATION_STORAGE_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The identifier of the `DEFAULT_ADMIN_ROLE` in OpenZeppelin's `AccessControl`
pub const DEFAULT_ADMIN_ROLE: B256 = B256::ZERO;

/// The name hashed into the minter role identifier
pub const MINTER_ROLE_NAME: &str = "MINTER_ROLE";

/// The initialized version reported by the proxy once V1 has been initialized
pub const V1_VERSION: u64 = 1;

/// The initialized version reported by the proxy once it has been upgraded to V2
pub const V2_VERSION: u64 = 2;

// -------------
// | Endpoints |
// -------------

/// The route deploying the V1 implementation behind a fresh proxy
pub const DEPLOY_V1_ROUTE: &str = "/deploy-v1";

/// The route upgrading the proxy to the V2 implementation
pub const UPGRADE_TO_V2_ROUTE: &str = "/upgrade-to-v2";

/// The route returning the active proxy & implementation addresses
pub const ADDRESSES_ROUTE: &str = "/addresses";

/// The route returning chain health, build status, and the active deployment
pub const STATUS_ROUTE: &str = "/status";

// ------------
// | Messages |
// ------------

/// The message returned after a successful V1 deployment
pub const V1_DEPLOYED_MESSAGE: &str = "V1 deployed";

/// The message returned after a successful upgrade
pub const UPGRADED_MESSAGE: &str = "Upgraded to V2";
