//! Operand Stack
//!
//! Per-connection LIFO of string values used as the interpreter's working
//! memory. Never shared between connections.

use crate::error::{Result, TxkvError};

/// Stack of opaque string values
#[derive(Debug, Default, Clone)]
pub struct ValueStack {
    values: Vec<String>,
}

impl ValueStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: impl Into<String>) {
        self.values.push(value.into());
    }

    /// Remove and discard the top value
    pub fn pop(&mut self) -> Result<()> {
        self.values.pop().map(|_| ()).ok_or(TxkvError::StackEmpty)
    }

    /// Remove and return the top value
    pub fn take(&mut self) -> Result<String> {
        self.values.pop().ok_or(TxkvError::StackEmpty)
    }

    /// The top value, left in place
    pub fn top(&self) -> Result<&str> {
        self.values
            .last()
            .map(String::as_str)
            .ok_or(TxkvError::StackEmpty)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}
