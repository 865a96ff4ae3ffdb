//! Integration tests for the file-based loaders.
//!
//! Each test writes an agent configuration document into a temporary
//! directory and resolves it through the public API. Environment lookups
//! are passed in explicitly, so the process environment is never touched.

use std::collections::HashMap;
use std::io::Write;

use gsdk_config::{ConfigError, Configuration, GamePort};

const AGENT_FILE: &str = r#"{
    "heartbeatEndpoint": "10.0.0.4:56001",
    "sessionHostId": "host-42",
    "vmId": "vm-9",
    "logFolder": "/gsdk/logs",
    "sharedContentFolder": "/gsdk/shared",
    "certificateFolder": "/gsdk/certs",
    "gameCertificates": { "tls": "/gsdk/certs/tls.pfx" },
    "buildMetadata": { "mode": "ranked", "maxPlayers": 8 },
    "gamePorts": { "game_port": 7777, "query_port": "7778" },
    "publicIpV4Address": "20.1.2.3",
    "fullyQualifiedDomainName": "host-42.example.net",
    "gameServerConnectionInfo": {
        "publicIpV4Adress": "20.1.2.3",
        "gamePortsConfiguration": [
            { "name": "game_port", "serverListeningPort": 7777, "clientConnectionPort": 30000 }
        ]
    }
}"#;

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn lookup(pairs: Vec<(&'static str, String)>) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<&'static str, String> = pairs.into_iter().collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn test_from_json_file_with_reads_agent_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "gsdkConfig.json", AGENT_FILE);

    let config = Configuration::from_json_file_with(
        &path,
        lookup(vec![
            ("PF_TITLE_ID", "ABCD".into()),
            ("PF_BUILD_ID", "build-1".into()),
            ("PF_REGION", "EastUs".into()),
        ]),
    )
    .expect("file should load");

    assert_eq!(config.heartbeat_endpoint, "10.0.0.4:56001");
    assert_eq!(config.server_id, "host-42");
    assert_eq!(config.vm_id, "vm-9");
    assert_eq!(config.log_folder, "/gsdk/logs");
    assert_eq!(config.certificate_folder, "/gsdk/certs");
    assert_eq!(config.game_certificates["tls"], "/gsdk/certs/tls.pfx");
    assert_eq!(config.build_metadata["mode"], "ranked");
    assert_eq!(config.build_metadata["maxPlayers"], "8");
    assert_eq!(config.game_ports["game_port"], "7777");
    assert_eq!(config.game_ports["query_port"], "7778");
    assert_eq!(config.fully_qualified_domain_name, "host-42.example.net");
    assert_eq!(config.title_id, "ABCD");
    assert_eq!(config.build_id, "build-1");
    assert_eq!(config.region, "EastUs");

    let info = config
        .connection_info
        .as_ref()
        .expect("connection info present");
    assert_eq!(info.public_ipv4_address, "20.1.2.3");
    assert_eq!(
        info.game_ports_configuration,
        vec![GamePort {
            name: "game_port".into(),
            server_listening_port: 7777,
            client_connection_port: 30000,
        }]
    );

    assert!(config.should_heartbeat);
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_json_file_with_minimal_document_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "min.json",
        r#"{"heartbeatEndpoint":"127.0.0.1:56001","sessionHostId":"h"}"#,
    );

    let config = Configuration::from_json_file_with(&path, lookup(vec![])).unwrap();
    assert_eq!(config.server_id, "h");
    assert!(config.game_ports.is_empty());
    assert!(config.connection_info.is_none());
    assert_eq!(config.title_id, "");
}

#[test]
fn test_from_json_file_with_missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let result =
        Configuration::from_json_file_with(dir.path().join("absent.json"), lookup(vec![]));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn test_from_json_file_with_malformed_file_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "bad.json", "{ this is not json");

    let result = Configuration::from_json_file_with(&path, lookup(vec![]));
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn test_load_with_existing_config_file_uses_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "gsdkConfig.json", AGENT_FILE);

    let config = Configuration::load_with(lookup(vec![
        ("GSDK_CONFIG_FILE", path.display().to_string()),
        ("HEARTBEAT_ENDPOINT", "ignored:1".into()),
    ]))
    .unwrap();

    assert_eq!(config.heartbeat_endpoint, "10.0.0.4:56001");
    assert_eq!(config.server_id, "host-42");
}

#[test]
fn test_load_with_missing_config_file_falls_back_to_env() {
    let dir = tempfile::tempdir().unwrap();
    let absent = dir.path().join("nope.json");

    let config = Configuration::load_with(lookup(vec![
        ("GSDK_CONFIG_FILE", absent.display().to_string()),
        ("HEARTBEAT_ENDPOINT", "127.0.0.1:56001".into()),
        ("SESSION_HOST_ID", "env-host".into()),
    ]))
    .unwrap();

    assert_eq!(config.heartbeat_endpoint, "127.0.0.1:56001");
    assert_eq!(config.server_id, "env-host");
}

#[test]
fn test_load_with_nothing_set_fails_validation() {
    let config = Configuration::load_with(lookup(vec![])).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingSetting(_))
    ));
}
