//! Codec Tests
//!
//! Tests for message encoding/decoding and the stream helpers.

use std::io::Cursor;

use txkv::protocol::{
    decode, encode, read_line, read_message, write_message, Message, MessageType,
    MAX_ENCODED_LEN,
};
use txkv::{ErrorClass, TxkvError};

fn assert_invalid(line: &str) {
    match decode(line) {
        Err(e) => assert_eq!(e.class(), ErrorClass::Protocol, "{:?} gave {:?}", line, e),
        Ok(m) => panic!("Expected {:?} to be rejected, decoded {:?}", line, m),
    }
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_login() {
    let msg = Message::new(MessageType::Login, ["alice"]);
    assert_eq!(encode(&msg).unwrap(), "LOGIN alice\n");
}

#[test]
fn test_encode_set() {
    let msg = Message::new(MessageType::Set, ["accounts", "balance"]);
    assert_eq!(encode(&msg).unwrap(), "SET accounts balance\n");
}

#[test]
fn test_encode_no_args() {
    assert_eq!(encode(&Message::bare(MessageType::Add)).unwrap(), "ADD\n");
    assert_eq!(encode(&Message::ok()).unwrap(), "OK\n");
}

#[test]
fn test_encode_quotes_failed_and_error() {
    assert_eq!(
        encode(&Message::failed("Division by zero.")).unwrap(),
        "FAILED \"Division by zero.\"\n"
    );
    assert_eq!(
        encode(&Message::error("Could not lock table")).unwrap(),
        "ERROR \"Could not lock table\"\n"
    );
}

#[test]
fn test_encode_rejects_invalid_message() {
    let msg = Message::new(MessageType::Get, ["accounts"]);
    assert!(encode(&msg).is_err());

    let msg = Message::new(MessageType::Login, ["9lives"]);
    assert!(encode(&msg).is_err());
}

#[test]
fn test_encode_rejects_too_long() {
    let msg = Message::data("x".repeat(MAX_ENCODED_LEN));
    assert!(matches!(encode(&msg), Err(TxkvError::InvalidMessage(_))));

    // "DATA " + value + "\n" fits exactly
    let msg = Message::data("x".repeat(MAX_ENCODED_LEN - 6));
    assert_eq!(encode(&msg).unwrap().len(), MAX_ENCODED_LEN);
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_get() {
    let msg = decode("GET accounts balance\n").unwrap();
    assert_eq!(msg.message_type(), MessageType::Get);
    assert_eq!(msg.table(), Some("accounts"));
    assert_eq!(msg.key(), Some("balance"));
}

#[test]
fn test_decode_tolerates_extra_whitespace() {
    let msg = decode("  PUSH    42  \r\n").unwrap();
    assert_eq!(msg.message_type(), MessageType::Push);
    assert_eq!(msg.value(), Some("42"));
}

#[test]
fn test_decode_quoted_text_keeps_spaces() {
    let msg = decode("FAILED \"Division  by zero.\"\n").unwrap();
    assert_eq!(msg.message_type(), MessageType::Failed);
    assert_eq!(msg.quoted_text(), Some("Division  by zero."));
}

#[test]
fn test_decode_unknown_type() {
    assert_invalid("FOO\n");
    assert_invalid("login alice\n");
}

#[test]
fn test_decode_wrong_arg_count() {
    assert_invalid("GET t\n");
    assert_invalid("GET t k extra\n");
    assert_invalid("LOGIN\n");
    assert_invalid("POP now\n");
    assert_invalid("BYE x\n");
}

#[test]
fn test_decode_requires_newline() {
    assert_invalid("LOGIN alice");
    assert_invalid("");
    assert_invalid("\n");
}

#[test]
fn test_decode_rejects_bad_identifiers() {
    assert_invalid("LOGIN 1alice\n");
    assert_invalid("CREATE my-table\n");
    assert_invalid("GET accounts bal$nce\n");
    assert_invalid("SET _t k\n");
}

#[test]
fn test_decode_accepts_identifier_with_digits_and_underscores() {
    let msg = decode("SET t_1 key_2\n").unwrap();
    assert_eq!(msg.table(), Some("t_1"));
    assert_eq!(msg.key(), Some("key_2"));
}

#[test]
fn test_decode_rejects_bad_quoted_text() {
    assert_invalid("ERROR oops\n");
    assert_invalid("ERROR \"unterminated\n");
    assert_invalid("ERROR \"\"\n");
    assert_invalid("FAILED \"a\" trailing\n");
    assert_invalid("FAILED\n");
}

#[test]
fn test_decode_too_long() {
    let line = format!("PUSH {}\n", "9".repeat(MAX_ENCODED_LEN));
    assert_invalid(&line);
}

#[test]
fn test_round_trip_every_type() {
    let messages = vec![
        Message::new(MessageType::Login, ["alice"]),
        Message::new(MessageType::Create, ["accounts"]),
        Message::new(MessageType::Push, ["-17"]),
        Message::bare(MessageType::Pop),
        Message::bare(MessageType::Top),
        Message::new(MessageType::Set, ["accounts", "balance"]),
        Message::new(MessageType::Get, ["accounts", "balance"]),
        Message::bare(MessageType::Add),
        Message::bare(MessageType::Sub),
        Message::bare(MessageType::Mul),
        Message::bare(MessageType::Div),
        Message::bare(MessageType::Begin),
        Message::bare(MessageType::Commit),
        Message::bare(MessageType::Bye),
        Message::ok(),
        Message::failed("Operand stack is empty"),
        Message::error("  leading and trailing  "),
        Message::data("7"),
    ];
    assert_eq!(messages.len(), MessageType::ALL.len());

    for msg in messages {
        let line = encode(&msg).unwrap();
        assert_eq!(decode(&line).unwrap(), msg, "round trip of {:?}", line);
    }
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_write_then_read_messages() {
    let mut buf = Vec::new();
    write_message(&mut buf, &Message::new(MessageType::Login, ["bob"])).unwrap();
    write_message(&mut buf, &Message::bare(MessageType::Bye)).unwrap();

    let mut reader = Cursor::new(buf);
    let first = read_message(&mut reader).unwrap();
    let second = read_message(&mut reader).unwrap();

    assert_eq!(first.username(), Some("bob"));
    assert_eq!(second.message_type(), MessageType::Bye);
}

#[test]
fn test_read_line_eof() {
    let mut reader = Cursor::new(Vec::new());
    match read_line(&mut reader) {
        Err(TxkvError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("Expected EOF error, got {:?}", other),
    }
}

#[test]
fn test_read_line_stops_at_limit() {
    let mut data = vec![b'9'; MAX_ENCODED_LEN * 2];
    data.push(b'\n');
    let mut reader = Cursor::new(data);

    assert!(matches!(
        read_line(&mut reader),
        Err(TxkvError::InvalidMessage(_))
    ));
}

#[test]
fn test_read_line_rejects_invalid_utf8() {
    let mut reader = Cursor::new(vec![b'P', b'U', b'S', b'H', b' ', 0xFF, b'\n']);
    assert!(matches!(
        read_line(&mut reader),
        Err(TxkvError::InvalidMessage(_))
    ));
}
