//! Types shared between the deployment orchestrator and its clients

#![deny(missing_docs)]

pub mod constants;
pub mod solidity;
pub mod storage;
pub mod types;
