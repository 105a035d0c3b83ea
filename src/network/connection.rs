//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TxkvError};
use crate::protocol::{read_line, write_message, Message};
use crate::session::Session;
use crate::store::Registry;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for line reads)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered, flushed after every reply)
    writer: BufWriter<TcpStream>,

    /// Protocol state for this client
    session: Session,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and a fresh session
    pub fn new(stream: TcpStream, registry: Arc<Registry>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // One small reply per request, don't let Nagle hold it back
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            session: Session::with_peer(registry, peer_addr.clone()),
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 leaves a direction without one)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads one line at a time and replies before reading the next.
    /// Whatever ends the loop, the session is terminated before returning so
    /// no table stays locked by this client.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let result = self.serve();
        self.session.terminate();

        tracing::debug!("Connection with {} closed", self.peer_addr);
        result
    }

    fn serve(&mut self) -> Result<()> {
        loop {
            let outcome = match read_line(&mut self.reader) {
                Ok(line) => {
                    tracing::trace!("Received from {}: {:?}", self.peer_addr, line);
                    self.session.handle_line(&line)
                }
                Err(TxkvError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    self.session.fail(e)
                }
            };

            tracing::trace!("Replying to {}: {:?}", self.peer_addr, outcome.reply());

            if let Err(e) = self.send(outcome.reply()) {
                // The client left before the reply went out; not a server fault
                if let TxkvError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before reply could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }

            if outcome.is_close() {
                return Ok(());
            }
        }
    }

    /// Send a reply to the client
    fn send(&mut self, reply: &Message) -> Result<()> {
        write_message(&mut self.writer, reply)
    }
}

/// I/O error kinds that mean the peer is gone or idle past the timeout
fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
