//! Names shared with the agent: environment variables it sets and keys of
//! the config map the engine exposes to the game.

/// Environment variables read by the loaders.
pub mod env {
    /// Path of the agent's JSON configuration file.
    pub const CONFIG_FILE: &str = "GSDK_CONFIG_FILE";
    pub const HEARTBEAT_ENDPOINT: &str = "HEARTBEAT_ENDPOINT";
    pub const SERVER_ID: &str = "SESSION_HOST_ID";
    pub const LOG_FOLDER: &str = "GSDK_LOG_FOLDER";
    pub const SHARED_CONTENT_FOLDER: &str = "SHARED_CONTENT_FOLDER";
    pub const TITLE_ID: &str = "PF_TITLE_ID";
    pub const BUILD_ID: &str = "PF_BUILD_ID";
    pub const REGION: &str = "PF_REGION";
}

// Config map keys. These are part of the public contract with game code,
// which reads them back through `GameServerSdk::config_value`.

pub const HEARTBEAT_ENDPOINT_KEY: &str = "gsmsBaseUrl";
pub const SERVER_ID_KEY: &str = "instanceId";
pub const VM_ID_KEY: &str = "vmId";
pub const LOG_FOLDER_KEY: &str = "logFolder";
pub const SHARED_CONTENT_FOLDER_KEY: &str = "sharedContentFolder";
pub const CERTIFICATE_FOLDER_KEY: &str = "certificateFolder";
pub const TITLE_ID_KEY: &str = "titleId";
pub const BUILD_ID_KEY: &str = "buildId";
pub const REGION_KEY: &str = "region";
pub const PUBLIC_IPV4_ADDRESS_KEY: &str = "publicIpV4Address";
pub const FULLY_QUALIFIED_DOMAIN_NAME_KEY: &str = "fullyQualifiedDomainName";

/// Delivered by the agent inside `sessionConfig` after allocation.
pub const SESSION_COOKIE_KEY: &str = "sessionCookie";
/// Delivered by the agent inside `sessionConfig` after allocation.
pub const SESSION_ID_KEY: &str = "sessionId";
