//! Unified error type for the SDK.

use gsdk_config::ConfigError;
use gsdk_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Only engine construction returns it. Once the heartbeat thread is
/// running, every failure is logged and absorbed there.
#[derive(Debug, thiserror::Error)]
pub enum GsdkError {
    /// Missing or unreadable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be set up.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The heartbeat thread or its I/O runtime could not be started.
    #[error("cannot start heartbeat thread: {0}")]
    Runtime(#[source] std::io::Error),

    /// The SDK log file could not be created.
    #[error("cannot create log file: {0}")]
    Logging(#[source] std::io::Error),
}
