//! Session Module
//!
//! The per-connection protocol state machine and command interpreter.
//!
//! ## States
//! ```text
//! AwaitingLogin ──LOGIN──▶ Active ──BYE / fatal error──▶ Terminated
//!                            │
//!                            └─ in_transaction: BEGIN sets, COMMIT or rollback clears
//! ```
//!
//! ## Failure handling
//! | Class         | Outside a transaction | Inside a transaction         |
//! |---------------|-----------------------|------------------------------|
//! | Operation     | FAILED, continue      | rollback, ERROR, continue    |
//! | Transaction   | n/a                   | rollback, ERROR, continue    |
//! | Protocol      | ERROR, close          | rollback, ERROR, close       |
//! | Communication | ERROR, close          | rollback, ERROR, close       |

mod transaction;

pub use transaction::Transaction;

use std::sync::Arc;

use crate::error::{ErrorClass, Result, TxkvError};
use crate::protocol::{decode, Message, MessageType};
use crate::stack::ValueStack;
use crate::store::{Registry, Table};

/// Longest reason text carried by a FAILED or ERROR reply
const MAX_REASON_CHARS: usize = 256;

/// Where a session is in its conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing but LOGIN is accepted
    AwaitingLogin,

    /// Logged in and processing commands
    Active { username: String },

    /// BYE received or a fatal error occurred
    Terminated,
}

/// What to do after processing one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Send the reply and read the next message
    Continue(Message),

    /// Send the reply, then close the connection
    Close(Message),
}

impl Outcome {
    pub fn reply(&self) -> &Message {
        match self {
            Outcome::Continue(reply) | Outcome::Close(reply) => reply,
        }
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Outcome::Close(_))
    }
}

/// Binary arithmetic on the operand stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn apply(self, left: i64, right: i64) -> Result<i64> {
        match self {
            ArithOp::Add => left.checked_add(right).ok_or(TxkvError::Overflow),
            ArithOp::Sub => left.checked_sub(right).ok_or(TxkvError::Overflow),
            ArithOp::Mul => left.checked_mul(right).ok_or(TxkvError::Overflow),
            ArithOp::Div => {
                if right == 0 {
                    return Err(TxkvError::DivisionByZero);
                }
                left.checked_div(right).ok_or(TxkvError::Overflow)
            }
        }
    }
}

/// One client's conversation with the server
///
/// Owns the operand stack and the open transaction, if any. Every exit path
/// (BYE, fatal error, drop) rolls the transaction back and releases its locks.
pub struct Session {
    registry: Arc<Registry>,
    stack: ValueStack,
    state: SessionState,
    transaction: Option<Transaction>,
    peer: String,
}

impl Session {
    /// Create a session bound to a registry
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_peer(registry, "local")
    }

    /// Create a session that tags its log lines with the peer address
    pub fn with_peer(registry: Arc<Registry>, peer: impl Into<String>) -> Self {
        Self {
            registry,
            stack: ValueStack::new(),
            state: SessionState::AwaitingLogin,
            transaction: None,
            peer: peer.into(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn username(&self) -> Option<&str> {
        match &self.state {
            SessionState::Active { username } => Some(username),
            _ => None,
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    pub fn stack(&self) -> &ValueStack {
        &self.stack
    }

    /// Names of the tables locked by the open transaction
    pub fn touched_tables(&self) -> Vec<String> {
        self.transaction
            .as_ref()
            .map(|txn| txn.touched().map(str::to_string).collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Decode and process one raw line
    pub fn handle_line(&mut self, line: &str) -> Outcome {
        match decode(line) {
            Ok(request) => self.handle(request),
            Err(e) => self.fail(e),
        }
    }

    /// Process one decoded message
    pub fn handle(&mut self, request: Message) -> Outcome {
        if self.is_terminated() {
            return Outcome::Close(Message::error("Session has ended"));
        }

        match self.dispatch(request) {
            Ok(reply) if self.is_terminated() => Outcome::Close(reply),
            Ok(reply) => Outcome::Continue(reply),
            Err(e) => self.fail(e),
        }
    }

    /// Turn a failure into the reply its class calls for
    ///
    /// Also used by the connection for errors raised while reading.
    pub fn fail(&mut self, err: TxkvError) -> Outcome {
        let reason = reason_text(&err);

        match err.class() {
            ErrorClass::Operation if self.transaction.is_none() => {
                tracing::debug!("Command from {} failed: {}", self.peer, err);
                Outcome::Continue(Message::failed(reason))
            }
            ErrorClass::Operation => {
                tracing::warn!("Transaction of {} aborted: {}", self.peer, err);
                self.abort_transaction();
                Outcome::Continue(Message::error(format!("Transaction rolled back: {}", reason)))
            }
            ErrorClass::Transaction => {
                tracing::warn!("Transaction of {} aborted: {}", self.peer, err);
                self.abort_transaction();
                Outcome::Continue(Message::error(reason))
            }
            ErrorClass::Protocol | ErrorClass::Communication | ErrorClass::Unexpected => {
                tracing::warn!("Closing session with {}: {}", self.peer, err);
                self.terminate();
                Outcome::Close(Message::error(reason))
            }
        }
    }

    /// End the session, rolling back any open transaction
    pub fn terminate(&mut self) {
        self.abort_transaction();
        self.state = SessionState::Terminated;
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn dispatch(&mut self, request: Message) -> Result<Message> {
        tracing::trace!("Processing {:?} from {}", request, self.peer);

        if !request.is_valid() {
            return Err(TxkvError::InvalidMessage(format!(
                "{} message has invalid arguments",
                request.message_type()
            )));
        }

        let message_type = request.message_type();
        if self.state == SessionState::AwaitingLogin {
            if message_type != MessageType::Login {
                return Err(TxkvError::InvalidMessage(
                    "First message must be LOGIN".to_string(),
                ));
            }
            return self.handle_login(&request);
        }

        match message_type {
            MessageType::Create => self.handle_create(&request),
            MessageType::Push => self.handle_push(&request),
            MessageType::Pop => self.handle_pop(),
            MessageType::Top => self.handle_top(),
            MessageType::Get => self.handle_get(&request),
            MessageType::Set => self.handle_set(&request),
            MessageType::Add => self.handle_arithmetic(ArithOp::Add),
            MessageType::Sub => self.handle_arithmetic(ArithOp::Sub),
            MessageType::Mul => self.handle_arithmetic(ArithOp::Mul),
            MessageType::Div => self.handle_arithmetic(ArithOp::Div),
            MessageType::Begin => self.handle_begin(),
            MessageType::Commit => self.handle_commit(),
            MessageType::Bye => self.handle_bye(),
            MessageType::Login => Err(TxkvError::InvalidMessage("Already logged in".to_string())),
            MessageType::Ok | MessageType::Failed | MessageType::Error | MessageType::Data => {
                Err(TxkvError::InvalidMessage(format!(
                    "Unexpected {} message from client",
                    message_type
                )))
            }
        }
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    fn handle_login(&mut self, request: &Message) -> Result<Message> {
        let username = required(request.username(), "username")?;
        tracing::info!("{} logged in as '{}'", self.peer, username);
        self.state = SessionState::Active {
            username: username.to_string(),
        };
        Ok(Message::ok())
    }

    fn handle_create(&mut self, request: &Message) -> Result<Message> {
        let name = required(request.table(), "table")?;
        self.registry.create_table(name);
        Ok(Message::ok())
    }

    fn handle_push(&mut self, request: &Message) -> Result<Message> {
        let value = required(request.value(), "value")?;
        self.stack.push(value);
        Ok(Message::ok())
    }

    fn handle_pop(&mut self) -> Result<Message> {
        self.stack.pop()?;
        Ok(Message::ok())
    }

    fn handle_top(&mut self) -> Result<Message> {
        Ok(Message::data(self.stack.top()?))
    }

    fn handle_get(&mut self, request: &Message) -> Result<Message> {
        let table_name = required(request.table(), "table")?;
        let key = required(request.key(), "key")?;
        let table = self.find_table(table_name)?;

        let value = match self.transaction.as_mut() {
            Some(txn) => txn.acquire(&table)?.get(key)?,
            None => {
                let guard = table.lock();
                let value = guard.get(key);
                guard.unlock();
                value?
            }
        };

        self.stack.push(value);
        Ok(Message::ok())
    }

    fn handle_set(&mut self, request: &Message) -> Result<Message> {
        let table_name = required(request.table(), "table")?;
        let key = required(request.key(), "key")?;

        if self.stack.is_empty() {
            return Err(TxkvError::StackEmpty);
        }
        let table = self.find_table(table_name)?;

        match self.transaction.as_mut() {
            Some(txn) => {
                let guard = txn.acquire(&table)?;
                let value = self.stack.take()?;
                guard.set(key, value);
            }
            None => {
                let mut guard = table.lock();
                let value = self.stack.take()?;
                guard.set(key, value);
                guard.unlock();
            }
        }

        Ok(Message::ok())
    }

    fn handle_arithmetic(&mut self, op: ArithOp) -> Result<Message> {
        let right = self.stack.take()?;
        let left = self.stack.take()?;

        let right = parse_operand(&right)?;
        let left = parse_operand(&left)?;
        let result = op.apply(left, right)?;

        self.stack.push(result.to_string());
        Ok(Message::ok())
    }

    fn handle_begin(&mut self) -> Result<Message> {
        if self.transaction.is_some() {
            return Err(TxkvError::FailedTransaction(
                "A transaction is already ongoing".to_string(),
            ));
        }

        tracing::debug!("{} began a transaction", self.peer);
        self.transaction = Some(Transaction::new());
        Ok(Message::ok())
    }

    fn handle_commit(&mut self) -> Result<Message> {
        let txn = self.transaction.take().ok_or_else(|| {
            TxkvError::InvalidMessage("No transaction has been started".to_string())
        })?;

        tracing::debug!("{} committing {} table(s)", self.peer, txn.len());
        txn.commit();
        Ok(Message::ok())
    }

    fn handle_bye(&mut self) -> Result<Message> {
        tracing::debug!("{} said BYE", self.peer);
        self.terminate();
        Ok(Message::ok())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn find_table(&self, name: &str) -> Result<Arc<Table>> {
        self.registry
            .find_table(name)
            .ok_or_else(|| TxkvError::TableNotFound(name.to_string()))
    }

    fn abort_transaction(&mut self) {
        if let Some(txn) = self.transaction.take() {
            tracing::debug!("{} rolling back {} table(s)", self.peer, txn.len());
            txn.rollback();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.abort_transaction();
    }
}

fn required<'a>(arg: Option<&'a str>, what: &str) -> Result<&'a str> {
    arg.ok_or_else(|| TxkvError::InvalidMessage(format!("Missing {}", what)))
}

fn parse_operand(operand: &str) -> Result<i64> {
    operand.parse::<i64>().map_err(|_| {
        TxkvError::InvalidOperand(operand.chars().take(32).collect())
    })
}

/// Error text fit for a quoted reply argument
fn reason_text(err: &TxkvError) -> String {
    let text: String = err
        .to_string()
        .chars()
        .map(|c| match c {
            '"' => '\'',
            '\n' | '\r' => ' ',
            c => c,
        })
        .take(MAX_REASON_CHARS)
        .collect();

    if text.trim().is_empty() {
        "Unknown error".to_string()
    } else {
        text
    }
}
