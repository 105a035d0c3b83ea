//! txkv Server Binary
//!
//! Starts the TCP server for txkv.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use txkv::{Config, Registry, Server};

/// txkv Server
#[derive(Parser, Debug)]
#[command(name = "txkv-server")]
#[command(about = "Transactional in-memory key-value server")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the port of --listen)
    port: Option<u16>,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Read timeout in milliseconds (0 = none)
    #[arg(long, default_value = "0")]
    read_timeout_ms: u64,

    /// Write timeout in milliseconds (0 = none)
    #[arg(long, default_value = "5000")]
    write_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,txkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let listen_addr = match args.port {
        Some(port) => with_port(&args.listen, port),
        None => args.listen.clone(),
    };

    tracing::info!("txkv Server v{}", txkv::VERSION);
    tracing::info!("Listen address: {}", listen_addr);

    let config = Config::builder()
        .listen_addr(listen_addr)
        .max_connections(args.max_connections)
        .read_timeout_ms(args.read_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .build();

    let registry = Arc::new(Registry::new());

    let server = match Server::bind(config, registry) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Replace the port of a `host:port` string
fn with_port(listen: &str, port: u16) -> String {
    let host = listen
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or(listen);
    format!("{}:{}", host, port)
}
