//! TCP Server
//!
//! Accepts connections and runs each one on its own worker thread.

use std::io::BufWriter;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{write_message, Message};
use crate::store::Registry;

use super::Connection;

/// TCP server for txkv
///
/// ## Concurrency Model: Thread per Connection
///
/// - The accept loop runs on the caller's thread
/// - Each accepted socket gets a detached worker thread that owns its
///   `Connection` and `Session` for the socket's whole lifetime
/// - Workers share only the `Registry`; tables are locked per operation or
///   per transaction by the sessions themselves
pub struct Server {
    config: Config,
    registry: Arc<Registry>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
    active_connections: Arc<AtomicUsize>,
    next_connection_id: AtomicU64,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, registry: Arc<Registry>) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(&config.listen_addr)?;

        Ok(Self {
            config,
            registry,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            active_connections: Arc::new(AtomicUsize::new(0)),
            next_connection_id: AtomicU64::new(1),
        })
    }

    /// The address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The registry shared by all connections
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    /// A handle that can stop `run` from another thread
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        Ok(ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            addr: self.local_addr()?,
        })
    }

    /// Run the accept loop (blocking)
    ///
    /// Accept failures are logged and the loop carries on. Returns once a
    /// shutdown has been requested.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match stream {
                Ok(stream) => self.dispatch(stream),
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                    continue;
                }
            }
        }

        tracing::info!("Server stopped accepting connections");
        Ok(())
    }

    /// Hand an accepted socket to a new worker thread
    fn dispatch(&self, stream: TcpStream) {
        if self.active_connections() >= self.config.max_connections {
            tracing::warn!(
                "Rejecting connection: {} connections already open",
                self.config.max_connections
            );
            reject(stream, "Too many connections");
            return;
        }

        let slot = ConnectionSlot::acquire(Arc::clone(&self.active_connections));
        let registry = Arc::clone(&self.registry);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        let spawned = thread::Builder::new()
            .name(format!("txkv-conn-{}", id))
            .spawn(move || {
                let _slot = slot;
                serve_connection(stream, registry, read_ms, write_ms);
            });

        if let Err(e) = spawned {
            tracing::error!("Could not spawn worker for connection {}: {}", id, e);
        }
    }
}

/// Worker body: run one connection to completion
fn serve_connection(stream: TcpStream, registry: Arc<Registry>, read_ms: u64, write_ms: u64) {
    run_contained(stream, move |stream| {
        let mut connection = Connection::new(stream, registry)?;
        connection.set_timeouts(read_ms, write_ms)?;
        connection.handle()
    });
}

/// Run `serve` on a socket, containing any panic it raises
///
/// Unwinding drops whatever session `serve` owns, which rolls back its
/// transaction and releases its table locks. The client then gets a
/// best-effort `ERROR "Internal server error"` before the socket closes.
pub fn run_contained<F>(stream: TcpStream, serve: F)
where
    F: FnOnce(TcpStream) -> Result<()>,
{
    let reply_stream = stream.try_clone();
    let result = panic::catch_unwind(AssertUnwindSafe(|| serve(stream)));

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Connection ended with error: {}", e),
        Err(_) => {
            tracing::error!("Connection worker panicked");
            match reply_stream {
                Ok(stream) => reject(stream, "Internal server error"),
                Err(e) => tracing::debug!("No socket left to report the panic on: {}", e),
            }
        }
    }
}

/// Best-effort ERROR reply to a socket we will not serve
fn reject(stream: TcpStream, reason: &str) {
    let mut writer = BufWriter::new(stream);
    if let Err(e) = write_message(&mut writer, &Message::error(reason)) {
        tracing::debug!("Could not send rejection: {}", e);
    }
}

/// Counts a live connection for as long as it exists
struct ConnectionSlot {
    counter: Arc<AtomicUsize>,
}

impl ConnectionSlot {
    fn acquire(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Stops a running server's accept loop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ShutdownHandle {
    /// Signal the server to stop accepting connections
    ///
    /// Connections already being served run until their clients leave.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);

        // The accept loop is blocked in accept(); a throwaway connection
        // wakes it so it can see the flag
        let mut wake_addr = self.addr;
        if wake_addr.ip().is_unspecified() {
            let loopback = match wake_addr.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            };
            wake_addr.set_ip(loopback);
        }
        if let Err(e) = TcpStream::connect(wake_addr) {
            tracing::debug!("Shutdown wake-up connection failed: {}", e);
        }
    }
}
