//! Blocking protocol client
//!
//! One request, one reply. Used by `txkv-cli` and by the integration tests.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{Result, TxkvError};
use crate::protocol::{read_message, write_message, Message, MessageType};

/// A connection to a txkv server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Open a TCP connection (no LOGIN is sent)
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send one message and read the reply
    ///
    /// FAILED and ERROR replies come back as `ReplyFailed` / `ReplyError`.
    pub fn request(&mut self, message: &Message) -> Result<Message> {
        write_message(&mut self.writer, message)?;
        let reply = read_message(&mut self.reader)?;

        match reply.message_type() {
            MessageType::Ok | MessageType::Data => Ok(reply),
            MessageType::Failed => Err(TxkvError::ReplyFailed(
                reply.quoted_text().unwrap_or_default().to_string(),
            )),
            MessageType::Error => Err(TxkvError::ReplyError(
                reply.quoted_text().unwrap_or_default().to_string(),
            )),
            other => Err(TxkvError::Communication(format!(
                "Unexpected {} reply",
                other
            ))),
        }
    }

    fn expect_ok(&mut self, message: Message) -> Result<()> {
        let reply = self.request(&message)?;
        if reply.message_type() != MessageType::Ok {
            return Err(TxkvError::Communication(format!(
                "Expected OK for {}, got {}",
                message.message_type(),
                reply.message_type()
            )));
        }
        Ok(())
    }

    // =========================================================================
    // One call per request type
    // =========================================================================

    pub fn login(&mut self, username: &str) -> Result<()> {
        self.expect_ok(Message::new(MessageType::Login, [username]))
    }

    pub fn create(&mut self, table: &str) -> Result<()> {
        self.expect_ok(Message::new(MessageType::Create, [table]))
    }

    pub fn push(&mut self, value: &str) -> Result<()> {
        self.expect_ok(Message::new(MessageType::Push, [value]))
    }

    pub fn pop(&mut self) -> Result<()> {
        self.expect_ok(Message::bare(MessageType::Pop))
    }

    /// Read the top of the operand stack
    pub fn top(&mut self) -> Result<String> {
        let reply = self.request(&Message::bare(MessageType::Top))?;
        reply
            .value()
            .map(str::to_string)
            .ok_or_else(|| TxkvError::Communication("Expected DATA reply to TOP".to_string()))
    }

    /// Push `table.key` onto the operand stack
    pub fn get(&mut self, table: &str, key: &str) -> Result<()> {
        self.expect_ok(Message::new(MessageType::Get, [table, key]))
    }

    /// Pop the operand stack into `table.key`
    pub fn set(&mut self, table: &str, key: &str) -> Result<()> {
        self.expect_ok(Message::new(MessageType::Set, [table, key]))
    }

    pub fn add(&mut self) -> Result<()> {
        self.expect_ok(Message::bare(MessageType::Add))
    }

    pub fn sub(&mut self) -> Result<()> {
        self.expect_ok(Message::bare(MessageType::Sub))
    }

    pub fn mul(&mut self) -> Result<()> {
        self.expect_ok(Message::bare(MessageType::Mul))
    }

    pub fn div(&mut self) -> Result<()> {
        self.expect_ok(Message::bare(MessageType::Div))
    }

    pub fn begin(&mut self) -> Result<()> {
        self.expect_ok(Message::bare(MessageType::Begin))
    }

    pub fn commit(&mut self) -> Result<()> {
        self.expect_ok(Message::bare(MessageType::Commit))
    }

    /// Say goodbye; the server closes the connection after replying
    pub fn bye(mut self) -> Result<()> {
        self.expect_ok(Message::bare(MessageType::Bye))
    }

    // =========================================================================
    // Multi-request flows
    // =========================================================================

    /// Fetch a stored value (GET, then TOP)
    pub fn get_value(&mut self, table: &str, key: &str) -> Result<String> {
        self.get(table, key)?;
        self.top()
    }

    /// Store a value (PUSH, then SET)
    pub fn set_value(&mut self, table: &str, key: &str, value: &str) -> Result<()> {
        self.push(value)?;
        self.set(table, key)
    }

    /// Add one to a stored integer, optionally inside BEGIN/COMMIT
    pub fn incr_value(&mut self, table: &str, key: &str, transactional: bool) -> Result<()> {
        if transactional {
            self.begin()?;
        }

        self.get(table, key)?;
        self.push("1")?;
        self.add()?;
        self.set(table, key)?;

        if transactional {
            self.commit()?;
        }
        Ok(())
    }
}
