//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One worker thread per connection
//! - Each worker drives a `Session` against the shared `Registry`

mod server;
mod connection;

pub use server::{run_contained, Server, ShutdownHandle};
pub use connection::Connection;
