//! The resolved [`Configuration`] and its two loaders.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::ConfigError;
use crate::keys::{self, env};

// ---------------------------------------------------------------------------
// Connection info
// ---------------------------------------------------------------------------

/// One named port mapping for this server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GamePort {
    /// Name given to the port in the build configuration.
    pub name: String,
    /// Port the game server process should listen on.
    pub server_listening_port: u16,
    /// Public port clients connect to; maps onto `server_listening_port`.
    pub client_connection_port: u16,
}

/// How clients reach this server from outside.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameServerConnectionInfo {
    // The agent has always spelled this key with a single "d".
    #[serde(rename = "publicIpV4Adress", alias = "publicIpV4Address")]
    pub public_ipv4_address: String,
    pub game_ports_configuration: Vec<GamePort>,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Every setting the engine consumes at construction.
///
/// Only `heartbeat_endpoint` and `server_id` are required (see
/// [`validate`](Self::validate)); everything else may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// `host:port` of the agent's heartbeat listener.
    pub heartbeat_endpoint: String,
    /// This server's session host id; the last path segment of the
    /// heartbeat URL.
    pub server_id: String,
    pub vm_id: String,
    pub log_folder: String,
    pub shared_content_folder: String,
    pub certificate_folder: String,
    /// Certificate name → path under `certificate_folder`.
    pub game_certificates: BTreeMap<String, String>,
    pub title_id: String,
    pub build_id: String,
    pub region: String,
    pub build_metadata: BTreeMap<String, String>,
    /// Port name → port number, as text.
    pub game_ports: BTreeMap<String, String>,
    pub public_ipv4_address: String,
    pub fully_qualified_domain_name: String,
    pub connection_info: Option<GameServerConnectionInfo>,

    /// Write SDK logs to a file under `log_folder`. Default: `true`.
    pub should_log: bool,
    /// Run the heartbeat thread at all. Default: `true`. Turning this off
    /// is only useful for running a game server without an agent.
    pub should_heartbeat: bool,
    /// Floor for the heartbeat interval; the agent can never ask for a
    /// shorter one. Default: 1 s.
    pub minimum_heartbeat_interval: Duration,
    /// Consecutive unexpected operations tolerated before the engine
    /// shuts itself down. Default: 100.
    pub max_unexpected_operations: u32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            heartbeat_endpoint: String::new(),
            server_id: String::new(),
            vm_id: String::new(),
            log_folder: String::new(),
            shared_content_folder: String::new(),
            certificate_folder: String::new(),
            game_certificates: BTreeMap::new(),
            title_id: String::new(),
            build_id: String::new(),
            region: String::new(),
            build_metadata: BTreeMap::new(),
            game_ports: BTreeMap::new(),
            public_ipv4_address: String::new(),
            fully_qualified_domain_name: String::new(),
            connection_info: None,
            should_log: true,
            should_heartbeat: true,
            minimum_heartbeat_interval: Self::DEFAULT_MINIMUM_HEARTBEAT_INTERVAL,
            max_unexpected_operations: Self::DEFAULT_MAX_UNEXPECTED_OPERATIONS,
        }
    }
}

impl Configuration {
    pub const DEFAULT_MINIMUM_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1000);
    pub const DEFAULT_MAX_UNEXPECTED_OPERATIONS: u32 = 100;

    /// A configuration with just the two required settings.
    pub fn new(heartbeat_endpoint: impl Into<String>, server_id: impl Into<String>) -> Self {
        Self {
            heartbeat_endpoint: heartbeat_endpoint.into(),
            server_id: server_id.into(),
            ..Default::default()
        }
    }

    // -- Loaders ------------------------------------------------------------

    /// Resolves configuration from `GSDK_CONFIG_FILE` if it names an
    /// existing file, otherwise from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(process_env)
    }

    /// [`load`](Self::load) with an explicit variable lookup.
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(env::CONFIG_FILE).filter(|path| Path::new(path).is_file()) {
            Some(path) => {
                debug!(%path, "loading configuration from file");
                Self::from_json_file_with(path, lookup)
            }
            None => {
                debug!("loading configuration from environment");
                Ok(Self::from_env_with(lookup))
            }
        }
    }

    /// Reads every setting from environment variables.
    pub fn from_env() -> Self {
        Self::from_env_with(process_env)
    }

    /// [`from_env`](Self::from_env) with an explicit variable lookup.
    /// Missing variables become empty strings.
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).unwrap_or_default();
        Self {
            heartbeat_endpoint: var(env::HEARTBEAT_ENDPOINT),
            server_id: var(env::SERVER_ID),
            log_folder: var(env::LOG_FOLDER),
            shared_content_folder: var(env::SHARED_CONTENT_FOLDER),
            title_id: var(env::TITLE_ID),
            build_id: var(env::BUILD_ID),
            region: var(env::REGION),
            ..Default::default()
        }
    }

    /// Reads the agent's JSON configuration file. Title, build and region
    /// still come from the environment; the file never carries them.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_file_with(path, process_env)
    }

    /// [`from_json_file`](Self::from_json_file) with an explicit variable
    /// lookup.
    pub fn from_json_file_with<P, F>(path: P, lookup: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: AgentFile =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let var = |name: &str| lookup(name).unwrap_or_default();
        Ok(Self {
            heartbeat_endpoint: file.heartbeat_endpoint,
            server_id: file.session_host_id,
            vm_id: file.vm_id,
            log_folder: file.log_folder,
            shared_content_folder: file.shared_content_folder,
            certificate_folder: file.certificate_folder,
            game_certificates: stringify_values(file.game_certificates),
            title_id: var(env::TITLE_ID),
            build_id: var(env::BUILD_ID),
            region: var(env::REGION),
            build_metadata: stringify_values(file.build_metadata),
            game_ports: stringify_values(file.game_ports),
            public_ipv4_address: file.public_ip_v4_address,
            fully_qualified_domain_name: file.fully_qualified_domain_name,
            connection_info: file.game_server_connection_info,
            ..Default::default()
        })
    }

    // -- Checks -------------------------------------------------------------

    /// Fails if either required setting is empty.
    ///
    /// # Errors
    /// [`ConfigError::MissingSetting`] naming the first empty setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_endpoint.trim().is_empty() {
            return Err(ConfigError::MissingSetting("heartbeat_endpoint"));
        }
        if self.server_id.trim().is_empty() {
            return Err(ConfigError::MissingSetting("server_id"));
        }
        Ok(())
    }

    /// Replaces values the engine cannot run with. A zero heartbeat floor
    /// would let the agent spin the heartbeat thread, so it falls back to
    /// the default.
    pub fn validated(mut self) -> Self {
        if self.minimum_heartbeat_interval.is_zero() {
            warn!(
                default = ?Self::DEFAULT_MINIMUM_HEARTBEAT_INTERVAL,
                "minimum_heartbeat_interval is zero, using default"
            );
            self.minimum_heartbeat_interval = Self::DEFAULT_MINIMUM_HEARTBEAT_INTERVAL;
        }
        self
    }

    /// The config map the engine starts from.
    ///
    /// Certificates, build metadata and ports go in first; the fixed keys
    /// from [`keys`] are written last and win on collision.
    pub fn config_map(&self) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = self
            .game_certificates
            .iter()
            .chain(&self.build_metadata)
            .chain(&self.game_ports)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let fixed = [
            (keys::HEARTBEAT_ENDPOINT_KEY, &self.heartbeat_endpoint),
            (keys::SERVER_ID_KEY, &self.server_id),
            (keys::VM_ID_KEY, &self.vm_id),
            (keys::LOG_FOLDER_KEY, &self.log_folder),
            (keys::SHARED_CONTENT_FOLDER_KEY, &self.shared_content_folder),
            (keys::CERTIFICATE_FOLDER_KEY, &self.certificate_folder),
            (keys::TITLE_ID_KEY, &self.title_id),
            (keys::BUILD_ID_KEY, &self.build_id),
            (keys::REGION_KEY, &self.region),
            (keys::PUBLIC_IPV4_ADDRESS_KEY, &self.public_ipv4_address),
            (
                keys::FULLY_QUALIFIED_DOMAIN_NAME_KEY,
                &self.fully_qualified_domain_name,
            ),
        ];
        for (key, value) in fixed {
            map.insert(key.to_owned(), value.clone());
        }
        map
    }

    /// `http://{endpoint}/v1/sessionHosts/{server_id}`
    pub fn heartbeat_url(&self) -> String {
        format!(
            "http://{}/v1/sessionHosts/{}",
            self.heartbeat_endpoint, self.server_id
        )
    }
}

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

/// The agent's configuration document, as written to disk.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AgentFile {
    heartbeat_endpoint: String,
    session_host_id: String,
    vm_id: String,
    log_folder: String,
    shared_content_folder: String,
    certificate_folder: String,
    game_certificates: BTreeMap<String, Value>,
    build_metadata: BTreeMap<String, Value>,
    game_ports: BTreeMap<String, Value>,
    public_ip_v4_address: String,
    fully_qualified_domain_name: String,
    game_server_connection_info: Option<GameServerConnectionInfo>,
}

/// Keeps strings as-is and renders numbers and booleans as text. Nested
/// values and nulls are dropped.
fn stringify_values(map: BTreeMap<String, Value>) -> BTreeMap<String, String> {
    map.into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key, s)),
            Value::Number(n) => Some((key, n.to_string())),
            Value::Bool(b) => Some((key, b.to_string())),
            _ => {
                warn!(%key, "ignoring non-scalar config value");
                None
            }
        })
        .collect()
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

// =========================================================================
// Tests
// =========================================================================
