//! Error types for txkv
//!
//! Provides a unified error type for all operations, plus the classification
//! the session uses to decide how a failure is reported to the client.

use thiserror::Error;

/// Result type alias using TxkvError
pub type Result<T> = std::result::Result<T, TxkvError>;

/// Unified error type for txkv operations
#[derive(Debug, Error)]
pub enum TxkvError {
    // -------------------------------------------------------------------------
    // I/O and Communication Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Communication error: {0}")]
    Communication(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    // -------------------------------------------------------------------------
    // Operation Errors (recoverable, reported as FAILED)
    // -------------------------------------------------------------------------
    #[error("Operand stack is empty")]
    StackEmpty,

    #[error("Table '{0}' does not exist")]
    TableNotFound(String),

    #[error("Key '{key}' not found in table '{table}'")]
    KeyNotFound { table: String, key: String },

    #[error("Operand is not an integer: {0}")]
    InvalidOperand(String),

    #[error("Division by zero.")]
    DivisionByZero,

    #[error("Arithmetic overflow")]
    Overflow,

    // -------------------------------------------------------------------------
    // Transaction Errors
    // -------------------------------------------------------------------------
    #[error("Transaction failed: {0}")]
    FailedTransaction(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Client-side Reply Errors
    // -------------------------------------------------------------------------
    #[error("Server replied FAILED: {0}")]
    ReplyFailed(String),

    #[error("Server replied ERROR: {0}")]
    ReplyError(String),
}

/// How a failure is surfaced on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or out-of-order message: reply ERROR, close the connection
    Protocol,

    /// Socket failure: reply ERROR (best effort), close the connection
    Communication,

    /// Recoverable command failure: reply FAILED, keep going
    Operation,

    /// Transaction aborted: roll back, reply ERROR, keep going
    Transaction,

    /// Anything else: reply ERROR, close the connection
    Unexpected,
}

impl TxkvError {
    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            TxkvError::InvalidMessage(_) => ErrorClass::Protocol,
            TxkvError::Io(_) | TxkvError::Communication(_) => ErrorClass::Communication,
            TxkvError::StackEmpty
            | TxkvError::TableNotFound(_)
            | TxkvError::KeyNotFound { .. }
            | TxkvError::InvalidOperand(_)
            | TxkvError::DivisionByZero
            | TxkvError::Overflow => ErrorClass::Operation,
            TxkvError::FailedTransaction(_) => ErrorClass::Transaction,
            TxkvError::Config(_) | TxkvError::ReplyFailed(_) | TxkvError::ReplyError(_) => {
                ErrorClass::Unexpected
            }
        }
    }
}
