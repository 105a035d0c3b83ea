//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! One message per line:
//! ```text
//! KEYWORD[ arg]*\n
//! ```
//!
//! Arguments are separated by a single space on encode and by any run of
//! whitespace on decode. FAILED and ERROR carry one argument written between
//! double quotes, which may itself contain spaces:
//! ```text
//! FAILED "Division by zero."\n
//! ```

use std::io::{BufRead, Read, Write};

use crate::error::{Result, TxkvError};
use super::{ArgGrammar, Message, MessageType};

/// Maximum encoded message length in bytes, newline included
pub const MAX_ENCODED_LEN: usize = 4096;

// =============================================================================
// Message Encoding/Decoding
// =============================================================================

/// Encode a message to a single newline-terminated line
///
/// Fails if the message does not satisfy its type's grammar or if the
/// encoded line would exceed `MAX_ENCODED_LEN`.
pub fn encode(message: &Message) -> Result<String> {
    if !message.is_valid() {
        return Err(TxkvError::InvalidMessage(format!(
            "{} message has invalid arguments",
            message.message_type()
        )));
    }

    let quoted = message.message_type().grammar() == ArgGrammar::QuotedText;

    let mut line = String::from(message.message_type().keyword());
    for arg in message.args() {
        line.push(' ');
        if quoted {
            line.push('"');
            line.push_str(arg);
            line.push('"');
        } else {
            line.push_str(arg);
        }
    }
    line.push('\n');

    if line.len() > MAX_ENCODED_LEN {
        return Err(TxkvError::InvalidMessage(format!(
            "Encoded message too long: {} bytes (max {})",
            line.len(),
            MAX_ENCODED_LEN
        )));
    }

    Ok(line)
}

/// Decode a single newline-terminated line into a message
pub fn decode(line: &str) -> Result<Message> {
    if line.is_empty() {
        return Err(TxkvError::InvalidMessage("Empty message".to_string()));
    }
    if line.len() > MAX_ENCODED_LEN {
        return Err(TxkvError::InvalidMessage(format!(
            "Message too long: {} bytes (max {})",
            line.len(),
            MAX_ENCODED_LEN
        )));
    }

    let body = line.strip_suffix('\n').ok_or_else(|| {
        TxkvError::InvalidMessage("Message must end with a newline".to_string())
    })?;
    let body = body.strip_suffix('\r').unwrap_or(body).trim_start();

    // Split off the keyword, keep the rest verbatim for quoted text
    let (keyword, rest) = match body.find(char::is_whitespace) {
        Some(idx) => body.split_at(idx),
        None => (body, ""),
    };

    let message_type = MessageType::from_keyword(keyword).ok_or_else(|| {
        TxkvError::InvalidMessage(format!("Unknown message type: {:?}", keyword))
    })?;

    let args = match message_type.grammar() {
        ArgGrammar::Empty => decode_tokens(message_type, rest, 0)?,
        ArgGrammar::Identifier | ArgGrammar::Value => decode_tokens(message_type, rest, 1)?,
        ArgGrammar::TableKey => decode_tokens(message_type, rest, 2)?,
        ArgGrammar::QuotedText => vec![decode_quoted_text(message_type, rest)?],
    };

    let message = Message::new(message_type, args);
    if !message.is_valid() {
        return Err(TxkvError::InvalidMessage(format!(
            "{} message has invalid arguments",
            message_type
        )));
    }

    Ok(message)
}

/// Split whitespace-separated arguments, requiring exactly `expected` of them
fn decode_tokens(message_type: MessageType, rest: &str, expected: usize) -> Result<Vec<String>> {
    let tokens: Vec<&str> = rest.split_whitespace().collect();

    if tokens.len() < expected {
        return Err(TxkvError::InvalidMessage(format!(
            "{} message: expected {} argument(s), got {}",
            message_type,
            expected,
            tokens.len()
        )));
    }
    if tokens.len() > expected {
        return Err(TxkvError::InvalidMessage(format!(
            "{} message: too many arguments",
            message_type
        )));
    }

    Ok(tokens.into_iter().map(str::to_string).collect())
}

/// Extract the text between a leading and a trailing double quote
fn decode_quoted_text(message_type: MessageType, rest: &str) -> Result<String> {
    let rest = rest.trim();

    let inner = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .ok_or_else(|| {
            TxkvError::InvalidMessage(format!("{} message: expected quoted text", message_type))
        })?;

    // A quote inside the text means the closing quote came early and
    // something trails it
    if inner.contains('"') {
        return Err(TxkvError::InvalidMessage(format!(
            "{} message: unexpected input after quoted text",
            message_type
        )));
    }

    Ok(inner.to_string())
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one raw line (newline included) from a stream
///
/// Reads at most `MAX_ENCODED_LEN + 1` bytes so an oversized line is detected
/// without buffering it whole. Returns an `UnexpectedEof` I/O error when the
/// peer has closed the stream before sending anything.
pub fn read_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut buf = Vec::new();
    let n = reader
        .by_ref()
        .take(MAX_ENCODED_LEN as u64 + 1)
        .read_until(b'\n', &mut buf)?;

    if n == 0 {
        return Err(TxkvError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed",
        )));
    }
    if buf.len() > MAX_ENCODED_LEN {
        return Err(TxkvError::InvalidMessage(format!(
            "Message too long (max {} bytes)",
            MAX_ENCODED_LEN
        )));
    }

    String::from_utf8(buf)
        .map_err(|_| TxkvError::InvalidMessage("Message is not valid UTF-8".to_string()))
}

/// Read and decode one message from a stream
pub fn read_message<R: BufRead>(reader: &mut R) -> Result<Message> {
    let line = read_line(reader)?;
    decode(&line)
}

/// Encode and write one message to a stream
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> Result<()> {
    let line = encode(message)?;
    writer.write_all(line.as_bytes())?;
    writer.flush()?;
    Ok(())
}
