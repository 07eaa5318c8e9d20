//! Constants used by the orchestrator

/// The default port on which the HTTP API is served
pub const DEFAULT_PORT: u16 = 4004;

/// The default RPC URL of the chain the contracts are deployed to
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// The default path of the deployment record
pub const DEFAULT_PROXY_FILE_PATH: &str = "deployment.json";

/// The default interval between chain health probes, in milliseconds
pub const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 5000;

/// The address the HTTP server binds to
pub const BIND_ALL_INTERFACES: &str = "0.0.0.0";

// ---------
// | Forge |
// ---------

/// The name of the Forge command
pub const FORGE_COMMAND: &str = "forge";

/// The flag printing the Forge version
pub const VERSION_FLAG: &str = "--version";

/// The name of the build command
pub const BUILD_COMMAND: &str = "build";

/// The name of the script command
pub const SCRIPT_COMMAND: &str = "script";

/// The flag selecting the RPC URL of a script run
pub const RPC_URL_FLAG: &str = "--rpc-url";

/// The flag making a script broadcast its transactions
pub const BROADCAST_FLAG: &str = "--broadcast";

/// The flag passing the deployer's private key to a script run
pub const PRIVATE_KEY_FLAG: &str = "--private-key";

/// The directory Forge writes compiled artifacts to
pub const OUT_DIR: &str = "out";

/// The directory Forge writes its compilation cache to
pub const CACHE_DIR: &str = "cache";

/// The environment variable through which the upgrade script receives the proxy address
pub const PROXY_ADDRESS_ENV_VAR: &str = "PROXY_ADDRESS";

// -----------
// | Parsing |
// -----------

/// The label preceding the implementation address in the deploy script output
pub const IMPLEMENTATION_LABEL: &str = "AssetToken Implementation";

/// The label preceding the proxy address in the deploy script output
pub const PROXY_LABEL: &str = "AssetToken Proxy";

/// The label preceding the new implementation address in the upgrade script output
pub const NEW_IMPLEMENTATION_LABEL: &str = "New implementation";

