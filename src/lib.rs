//! # txkv
//!
//! A transactional, in-memory key-value store with:
//! - Multiple independently locked tables
//! - A line-oriented text protocol over TCP
//! - A per-connection operand stack interpreter (PUSH/POP/TOP, ADD/SUB/MUL/DIV)
//! - BEGIN/COMMIT transactions that roll back on any failure
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │               (one thread per connection)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ lines
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Wire Codec                                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Message
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Session (per connection)                     │
//! │        LOGIN gate · operand stack · transaction              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ lock / try_lock
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Table A   │   ...    │   Table N   │
//!   │ (committed/ │          │ (committed/ │
//!   │  tentative) │          │  tentative) │
//!   └─────────────┘          └─────────────┘
//!          ▲                         ▲
//!          └──────── Registry ───────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod stack;
pub mod store;
pub mod session;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorClass, Result, TxkvError};
pub use config::Config;
pub use client::Client;
pub use network::Server;
pub use session::Session;
pub use store::Registry;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of txkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
