//! Message definitions
//!
//! A message is a type keyword plus an ordered list of string arguments.
//! The same type is used for client requests and server responses.

use std::fmt;

/// Message types, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Login,
    Create,
    Push,
    Pop,
    Top,
    Set,
    Get,
    Add,
    Sub,
    Mul,
    Div,
    Begin,
    Commit,
    Bye,
    Ok,
    Failed,
    Error,
    Data,
}

/// Shape of the arguments a message type carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgGrammar {
    /// No arguments
    Empty,

    /// One identifier (username or table)
    Identifier,

    /// One value token
    Value,

    /// Two identifiers (table, key)
    TableKey,

    /// One run of free text delimited by double quotes
    QuotedText,
}

impl MessageType {
    /// Every message type
    pub const ALL: [MessageType; 18] = [
        MessageType::Login,
        MessageType::Create,
        MessageType::Push,
        MessageType::Pop,
        MessageType::Top,
        MessageType::Set,
        MessageType::Get,
        MessageType::Add,
        MessageType::Sub,
        MessageType::Mul,
        MessageType::Div,
        MessageType::Begin,
        MessageType::Commit,
        MessageType::Bye,
        MessageType::Ok,
        MessageType::Failed,
        MessageType::Error,
        MessageType::Data,
    ];

    /// The wire keyword for this type
    pub fn keyword(&self) -> &'static str {
        match self {
            MessageType::Login => "LOGIN",
            MessageType::Create => "CREATE",
            MessageType::Push => "PUSH",
            MessageType::Pop => "POP",
            MessageType::Top => "TOP",
            MessageType::Set => "SET",
            MessageType::Get => "GET",
            MessageType::Add => "ADD",
            MessageType::Sub => "SUB",
            MessageType::Mul => "MUL",
            MessageType::Div => "DIV",
            MessageType::Begin => "BEGIN",
            MessageType::Commit => "COMMIT",
            MessageType::Bye => "BYE",
            MessageType::Ok => "OK",
            MessageType::Failed => "FAILED",
            MessageType::Error => "ERROR",
            MessageType::Data => "DATA",
        }
    }

    /// Look up a type by its wire keyword (case-sensitive)
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.keyword() == keyword)
    }

    /// The argument grammar for this type
    pub fn grammar(&self) -> ArgGrammar {
        match self {
            MessageType::Login | MessageType::Create => ArgGrammar::Identifier,
            MessageType::Push | MessageType::Data => ArgGrammar::Value,
            MessageType::Set | MessageType::Get => ArgGrammar::TableKey,
            MessageType::Failed | MessageType::Error => ArgGrammar::QuotedText,
            MessageType::Pop
            | MessageType::Top
            | MessageType::Add
            | MessageType::Sub
            | MessageType::Mul
            | MessageType::Div
            | MessageType::Begin
            | MessageType::Commit
            | MessageType::Bye
            | MessageType::Ok => ArgGrammar::Empty,
        }
    }

    /// Whether this is a server-to-client response type
    pub fn is_response(&self) -> bool {
        matches!(
            self,
            MessageType::Ok | MessageType::Failed | MessageType::Error | MessageType::Data
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    message_type: MessageType,
    args: Vec<String>,
}

impl Message {
    /// Create a message with the given arguments
    pub fn new<I, S>(message_type: MessageType, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message_type,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a message with no arguments
    pub fn bare(message_type: MessageType) -> Self {
        Self {
            message_type,
            args: Vec::new(),
        }
    }

    // =========================================================================
    // Response constructors
    // =========================================================================

    pub fn ok() -> Self {
        Self::bare(MessageType::Ok)
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(MessageType::Failed, [reason.into()])
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::new(MessageType::Error, [reason.into()])
    }

    pub fn data(value: impl Into<String>) -> Self {
        Self::new(MessageType::Data, [value.into()])
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn push_arg(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    /// Username carried by LOGIN
    pub fn username(&self) -> Option<&str> {
        match self.message_type {
            MessageType::Login => self.arg(0),
            _ => None,
        }
    }

    /// Table name carried by CREATE, GET and SET
    pub fn table(&self) -> Option<&str> {
        match self.message_type {
            MessageType::Create | MessageType::Get | MessageType::Set => self.arg(0),
            _ => None,
        }
    }

    /// Key carried by GET and SET
    pub fn key(&self) -> Option<&str> {
        match self.message_type {
            MessageType::Get | MessageType::Set => self.arg(1),
            _ => None,
        }
    }

    /// Value carried by PUSH and DATA
    pub fn value(&self) -> Option<&str> {
        match self.message_type {
            MessageType::Push | MessageType::Data => self.arg(0),
            _ => None,
        }
    }

    /// Reason text carried by FAILED and ERROR
    pub fn quoted_text(&self) -> Option<&str> {
        match self.message_type {
            MessageType::Failed | MessageType::Error => self.arg(0),
            _ => None,
        }
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check argument count and argument syntax against the type's grammar
    pub fn is_valid(&self) -> bool {
        match self.message_type.grammar() {
            ArgGrammar::Empty => self.args.is_empty(),
            ArgGrammar::Identifier => self.args.len() == 1 && is_valid_identifier(&self.args[0]),
            ArgGrammar::Value => self.args.len() == 1 && is_valid_value(&self.args[0]),
            ArgGrammar::TableKey => {
                self.args.len() == 2
                    && is_valid_identifier(&self.args[0])
                    && is_valid_identifier(&self.args[1])
            }
            ArgGrammar::QuotedText => self.args.len() == 1 && is_valid_quoted_text(&self.args[0]),
        }
    }
}

/// Identifier: an ASCII letter followed by ASCII letters, digits or underscores
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Value: non-empty, no whitespace
pub fn is_valid_value(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(char::is_whitespace)
}

/// Quoted text: non-empty, no quote characters or line breaks
pub fn is_valid_quoted_text(s: &str) -> bool {
    !s.is_empty() && !s.contains(['"', '\n', '\r'])
}
