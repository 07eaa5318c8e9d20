//! Definitions of errors surfaced to the client

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// The message shown when the wallet rejects without an explanation
pub const DEFAULT_REJECTION_MESSAGE: &str = "Transaction rejected";

/// The message shown when a mined transaction reverted
pub const REVERTED_MESSAGE: &str = "Transaction reverted";

/// Errors that end a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    /// The wallet refused to sign or send, with its message if it gave one
    TransactionRejected(String),
    /// The transaction was mined but reverted
    TransactionReverted,
    /// Error waiting for the receipt
    Receipt(String),
}

impl Display for TxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TxError::TransactionRejected(msg) if msg.is_empty() => {
                write!(f, "{}", DEFAULT_REJECTION_MESSAGE)
            }
            TxError::TransactionRejected(msg) => write!(f, "{}", msg),
            TxError::TransactionReverted => write!(f, "{}", REVERTED_MESSAGE),
            TxError::Receipt(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error for TxError {}

/// Reasons a submission is refused without touching the tracked transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    /// No proxy is known to send the transaction to
    NoTarget,
    /// A transaction is already being signed or awaiting its receipt
    InFlight,
}

impl Display for SubmitRejected {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SubmitRejected::NoTarget => write!(f, "no proxy deployed"),
            SubmitRejected::InFlight => write!(f, "a transaction is already in flight"),
        }
    }
}

impl Error for SubmitRejected {}

/// Errors talking to the orchestrator or reading the contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The request could not be sent or its response not read
    Http(String),
    /// The orchestrator answered with an error
    Api {
        /// The HTTP status
        status: u16,
        /// The `error` field of the response body
        error: String,
    },
    /// Error decoding a response
    Decode(String),
    /// Error reading from the chain
    Rpc(String),
    /// No proxy is known to read from
    NotDeployed,
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Http(s) => write!(f, "http error: {}", s),
            ClientError::Api { error, .. } => write!(f, "{}", error),
            ClientError::Decode(s) => write!(f, "error decoding response: {}", s),
            ClientError::Rpc(s) => write!(f, "rpc error: {}", s),
            ClientError::NotDeployed => write!(f, "Not deployed"),
        }
    }
}

impl Error for ClientError {}

#[cfg(test)]
mod tests {
    use super::TxError;

    #[test]
    fn test_rejection_message() {
        assert_eq!(TxError::TransactionRejected(String::new()).to_string(), "Transaction rejected");
        assert_eq!(
            TxError::TransactionRejected("User denied transaction signature".to_string())
                .to_string(),
            "User denied transaction signature"
        );
        assert_eq!(TxError::TransactionReverted.to_string(), "Transaction reverted");
    }
}
