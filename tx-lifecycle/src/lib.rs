//! The client side of the deployment lifecycle: talking to the orchestrator,
//! reading the token, & driving user transactions to completion.

#![deny(missing_docs)]

pub mod calls;
pub mod client;
pub mod errors;
pub mod reads;
pub mod session;
pub mod state;
pub mod wallet;
