//! Bindings for the `AssetToken` contract that sits behind the proxy

#![allow(missing_docs)]

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface AssetToken {
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function mint(address to, uint256 amount) external;

        function pause() external;
        function unpause() external;
        function paused() external view returns (bool);

        function hasRole(bytes32 role, address account) external view returns (bool);
        function grantRole(bytes32 role, address account) external;
        function revokeRole(bytes32 role, address account) external;

        function getInitializedVersion() external view returns (uint64);
        function upgradeToAndCall(address newImplementation, bytes data) external payable;

        #[derive(Debug, PartialEq, Eq)]
        event Upgraded(address indexed implementation);
    }
}
