//! Orchestrates the deployment & upgrade of the `AssetToken` proxy, serving
//! the operations over HTTP.

#![deny(missing_docs)]

pub mod build_gate;
pub mod cli;
pub mod commands;
pub mod constants;
pub mod errors;
pub mod health;
pub mod parsing;
pub mod registry;
pub mod runner;
pub mod server;
pub mod store;
