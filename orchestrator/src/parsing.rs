//! Extraction of contract addresses from Forge script output
//!
//! The deploy & upgrade scripts log their results as human-readable lines of
//! the form `<label>: 0x<40 hex digits>`. All knowledge of that format lives
//! here.

use std::str::FromStr;

use alloy::primitives::Address;
use regex::Regex;

use crate::constants::{IMPLEMENTATION_LABEL, NEW_IMPLEMENTATION_LABEL, PROXY_LABEL};

/// The addresses logged by the deploy script
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeployedAddresses {
    /// The proxy contract
    pub proxy: Address,
    /// The V1 implementation contract
    pub implementation: Address,
}

/// Find the first address following `<label>:` in the output
pub fn find_labeled_address(output: &str, label: &str) -> Option<Address> {
    let pattern = format!(r"{}:\s*(0x[a-fA-F0-9]{{40}})", regex::escape(label));
    let re = Regex::new(&pattern).ok()?;

    let captures = re.captures(output)?;
    Address::from_str(captures.get(1)?.as_str()).ok()
}

/// Parse the proxy & implementation addresses from the deploy script output
pub fn parse_deploy_output(output: &str) -> Option<DeployedAddresses> {
    let implementation = find_labeled_address(output, IMPLEMENTATION_LABEL)?;
    let proxy = find_labeled_address(output, PROXY_LABEL)?;

    Some(DeployedAddresses { proxy, implementation })
}

/// Parse the new implementation address from the upgrade script output
pub fn parse_upgrade_output(output: &str) -> Option<Address> {
    find_labeled_address(output, NEW_IMPLEMENTATION_LABEL)
}
