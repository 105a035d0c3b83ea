//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format
//!
//! Text, one message per newline-terminated line, at most
//! [`MAX_ENCODED_LEN`] bytes.
//!
//! ### Requests
//! - `LOGIN <username>`  - must be the first message of a session
//! - `CREATE <table>`
//! - `PUSH <value>` / `POP` / `TOP`
//! - `GET <table> <key>` - push the stored value
//! - `SET <table> <key>` - pop a value and store it
//! - `ADD` / `SUB` / `MUL` / `DIV`
//! - `BEGIN` / `COMMIT`
//! - `BYE`
//!
//! ### Responses
//! - `OK`
//! - `DATA <value>`
//! - `FAILED "<reason>"` - the command failed, session continues
//! - `ERROR "<reason>"`  - protocol or transaction error

mod message;
mod codec;

pub use message::{
    is_valid_identifier, is_valid_quoted_text, is_valid_value, ArgGrammar, Message, MessageType,
};
pub use codec::{decode, encode, read_line, read_message, write_message, MAX_ENCODED_LEN};
