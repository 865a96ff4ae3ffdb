//! Configuration for the game server SDK.
//!
//! The agent hands a game server its settings in one of two ways:
//!
//! - **Environment variables** (`HEARTBEAT_ENDPOINT`, `SESSION_HOST_ID`, ...)
//! - **A JSON file** whose path is in `GSDK_CONFIG_FILE`
//!
//! Both resolve to the same [`Configuration`] value. Which source was used
//! doesn't matter after that; the engine only sees the resolved settings.
//!
//! ```rust
//! use gsdk_config::Configuration;
//!
//! let config = Configuration::from_env_with(|name| match name {
//!     "HEARTBEAT_ENDPOINT" => Some("127.0.0.1:56001".into()),
//!     "SESSION_HOST_ID" => Some("host-1".into()),
//!     _ => None,
//! });
//! assert!(config.validate().is_ok());
//! ```

mod configuration;
mod error;
pub mod keys;

pub use configuration::{Configuration, GamePort, GameServerConnectionInfo};
pub use error::ConfigError;
