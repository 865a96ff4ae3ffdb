use std::path::PathBuf;

/// Errors that can occur while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A setting the engine cannot run without is absent or empty.
    #[error("required setting `{0}` is missing or empty")]
    MissingSetting(&'static str),

    /// The agent's configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The agent's configuration file is not the expected JSON document.
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
