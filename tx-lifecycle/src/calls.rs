//! The state-changing actions a client can take against the proxy

use std::fmt::{self, Display};

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, B256, U256},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use deploy_common::solidity::AssetToken;

/// A call to the token behind the proxy
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractCall {
    /// Mint `amount` tokens to `to`
    Mint {
        /// The recipient
        to: Address,
        /// The amount, in base units
        amount: U256,
    },
    /// Transfer `amount` of the sender's tokens to `to`
    Transfer {
        /// The recipient
        to: Address,
        /// The amount, in base units
        amount: U256,
    },
    /// Pause transfers
    Pause,
    /// Resume transfers
    Unpause,
    /// Grant `role` to `account`
    GrantRole {
        /// The role identifier
        role: B256,
        /// The grantee
        account: Address,
    },
    /// Revoke `role` from `account`
    RevokeRole {
        /// The role identifier
        role: B256,
        /// The account losing the role
        account: Address,
    },
    /// Point the proxy at a new implementation, then call it with `data`
    UpgradeToAndCall {
        /// The new implementation
        new_implementation: Address,
        /// Calldata forwarded to the new implementation, may be empty
        data: Bytes,
    },
}

impl ContractCall {
    /// The ABI-encoded calldata
    pub fn calldata(&self) -> Bytes {
        let data = match self {
            ContractCall::Mint { to, amount } => {
                AssetToken::mintCall { to: *to, amount: *amount }.abi_encode()
            }
            ContractCall::Transfer { to, amount } => {
                AssetToken::transferCall { to: *to, amount: *amount }.abi_encode()
            }
            ContractCall::Pause => AssetToken::pauseCall {}.abi_encode(),
            ContractCall::Unpause => AssetToken::unpauseCall {}.abi_encode(),
            ContractCall::GrantRole { role, account } => {
                AssetToken::grantRoleCall { role: *role, account: *account }.abi_encode()
            }
            ContractCall::RevokeRole { role, account } => {
                AssetToken::revokeRoleCall { role: *role, account: *account }.abi_encode()
            }
            ContractCall::UpgradeToAndCall { new_implementation, data } => {
                AssetToken::upgradeToAndCallCall {
                    newImplementation: *new_implementation,
                    data: data.clone(),
                }
                .abi_encode()
            }
        };

        data.into()
    }

    /// The transaction sending this call to `proxy`
    pub fn to_request(&self, proxy: Address) -> TransactionRequest {
        TransactionRequest::default().with_to(proxy).with_input(self.calldata())
    }
}

impl Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractCall::Mint { to, amount } => write!(f, "mint {} to {}", amount, to),
            ContractCall::Transfer { to, amount } => write!(f, "transfer {} to {}", amount, to),
            ContractCall::Pause => write!(f, "pause"),
            ContractCall::Unpause => write!(f, "unpause"),
            ContractCall::GrantRole { role, account } => {
                write!(f, "grant role {} to {}", role, account)
            }
            ContractCall::RevokeRole { role, account } => {
                write!(f, "revoke role {} from {}", role, account)
            }
            ContractCall::UpgradeToAndCall { new_implementation, .. } => {
                write!(f, "upgrade to {}", new_implementation)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, hex, Bytes, TxKind, U256};
    use deploy_common::storage::minter_role;

    use super::ContractCall;

    #[test]
    fn test_mint_calldata() {
        let call = ContractCall::Mint {
            to: address!("70997970c51812dc3a010c7d01b50e0d17dc79c8"),
            amount: U256::from(1000),
        };

        let data = call.calldata();
        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(&data[..4], hex!("40c10f19"));
        assert_eq!(&data[16..36], hex!("70997970c51812dc3a010c7d01b50e0d17dc79c8"));
        assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(1000));
    }

    #[test]
    fn test_selectors() {
        let account = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
        let cases = [
            (ContractCall::Transfer { to: account, amount: U256::from(1) }, hex!("a9059cbb")),
            (ContractCall::Pause, hex!("8456cb59")),
            (ContractCall::Unpause, hex!("3f4ba83a")),
            (ContractCall::GrantRole { role: minter_role(), account }, hex!("2f2ff15d")),
            (ContractCall::RevokeRole { role: minter_role(), account }, hex!("d547741f")),
            (
                ContractCall::UpgradeToAndCall {
                    new_implementation: account,
                    data: Bytes::new(),
                },
                hex!("4f1ef286"),
            ),
        ];

        for (call, selector) in cases {
            assert_eq!(&call.calldata()[..4], selector, "{}", call);
        }
    }

    #[test]
    fn test_request_targets_proxy() {
        let proxy = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
        let request = ContractCall::Pause.to_request(proxy);

        assert_eq!(request.to, Some(TxKind::Call(proxy)));
        assert_eq!(request.input.input().cloned(), Some(ContractCall::Pause.calldata()));
    }
}
