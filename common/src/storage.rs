//! Helpers for interpreting raw proxy storage and role identifiers

use alloy::primitives::{keccak256, Address, B256, U256};

use crate::constants::{MINTER_ROLE_NAME, NUM_BYTES_ADDRESS, NUM_BYTES_STORAGE_SLOT};

/// Extract the address held in the low 20 bytes of a storage word.
///
/// Returns `None` for an empty slot, i.e. a proxy that was never initialized
pub fn address_from_storage_word(word: U256) -> Option<Address> {
    let bytes: [u8; NUM_BYTES_STORAGE_SLOT] = word.to_be_bytes();
    let address = Address::from_slice(
        &bytes[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..NUM_BYTES_STORAGE_SLOT],
    );

    (!address.is_zero()).then_some(address)
}

/// The identifier of the minter role, `keccak256("MINTER_ROLE")`
pub fn minter_role() -> B256 {
    keccak256(MINTER_ROLE_NAME.as_bytes())
}
