//! Server configuration
//!
//! Only the network side of txkv is tunable. Tables live in memory and the
//! line length limit is part of the protocol, so neither appears here.

use crate::error::{Result, TxkvError};

/// Settings for a txkv server
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the accept loop binds, as `host:port`
    pub listen_addr: String,

    /// Sessions served at once; further clients get `ERROR "Too many connections"`
    pub max_connections: usize,

    /// Idle limit between two requests of one client, in milliseconds (0 = none)
    ///
    /// A client may sit inside a transaction between commands, so the default
    /// waits forever. When it fires the session ends as if the client had
    /// hung up, and its transaction is rolled back.
    pub read_timeout_ms: u64,

    /// Limit on sending one reply, in milliseconds (0 = none)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7878".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(TxkvError::Config("listen address is empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(TxkvError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`Config`], starting from the defaults
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
