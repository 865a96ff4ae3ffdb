//! The agent's heartbeat response and its lenient parser.
//!
//! The agent may send any subset of the top-level fields, and newer agents
//! may send values this SDK has never seen. So instead of deriving
//! `Deserialize` for the whole document (where one odd field would reject
//! everything), we parse into a `serde_json::Value` and pick each field out
//! on its own. A field with an unexpected shape is skipped and noted in
//! [`HeartbeatResponse::skipped`]; the rest of the document still counts.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::{MaintenanceSchedule, Operation, ProtocolError};

/// Top-level keys of a heartbeat response.
const SESSION_CONFIG: &str = "sessionConfig";
const NEXT_MAINTENANCE: &str = "nextScheduledMaintenanceUtc";
const MAINTENANCE_SCHEDULE: &str = "maintenanceSchedule";
const OPERATION: &str = "operation";
const NEXT_INTERVAL: &str = "nextHeartbeatIntervalMs";

/// Keys nested inside `sessionConfig`.
const INITIAL_PLAYERS: &str = "initialPlayers";
const METADATA: &str = "metadata";

/// The `operation` field as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedOperation {
    /// The name matched the fixed operation table.
    Known(Operation),
    /// Anything else, kept verbatim for logging.
    Unknown(String),
}

/// The `sessionConfig` object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Every string-valued child of `sessionConfig`, by key. This is where
    /// `sessionId` and `sessionCookie` end up.
    pub values: BTreeMap<String, String>,

    /// `initialPlayers`, when present as an array. Non-string entries are
    /// dropped.
    pub initial_players: Option<Vec<String>>,

    /// String-valued children of the nested `metadata` object.
    pub metadata: BTreeMap<String, String>,
}

impl SessionConfig {
    fn from_object(object: &Map<String, Value>) -> Self {
        let mut config = Self {
            values: string_children(object),
            ..Self::default()
        };

        if let Some(Value::Array(players)) = object.get(INITIAL_PLAYERS) {
            config.initial_players = Some(
                players
                    .iter()
                    .filter_map(|p| p.as_str().map(str::to_owned))
                    .collect(),
            );
        }

        if let Some(Value::Object(metadata)) = object.get(METADATA) {
            config.metadata = string_children(metadata);
        }

        config
    }

    /// All config entries this object contributes, in merge order:
    /// plain values first, then metadata (metadata wins on collision).
    pub fn config_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .chain(self.metadata.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A decoded heartbeat response. Every field is optional.
///
/// ```json
/// {
///   "operation": "Active",
///   "nextHeartbeatIntervalMs": 5000,
///   "nextScheduledMaintenanceUtc": "2030-01-01T00:00:00Z",
///   "sessionConfig": {
///     "sessionId": "abc",
///     "initialPlayers": ["p1", "p2"],
///     "metadata": { "map": "forest" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeartbeatResponse {
    pub session_config: Option<SessionConfig>,
    pub next_scheduled_maintenance_utc: Option<DateTime<Utc>>,
    pub maintenance_schedule: Option<MaintenanceSchedule>,
    pub operation: Option<ReceivedOperation>,
    pub next_heartbeat_interval_ms: Option<u64>,

    /// Human-readable notes about fields that were present but ignored
    /// because of their shape (wrong type, unparsable timestamp, ...).
    pub skipped: Vec<String>,
}

impl HeartbeatResponse {
    /// Parses a response body.
    ///
    /// # Errors
    /// - [`ProtocolError::Decode`] if the body is not JSON at all.
    /// - [`ProtocolError::InvalidMessage`] if the top level is not an object.
    pub fn parse(body: &[u8]) -> Result<Self, ProtocolError> {
        let document: Value =
            serde_json::from_slice(body).map_err(ProtocolError::Decode)?;

        let Value::Object(fields) = document else {
            return Err(ProtocolError::InvalidMessage(format!(
                "heartbeat response must be a JSON object, got {}",
                kind(&document)
            )));
        };

        let mut response = Self::default();

        match fields.get(SESSION_CONFIG) {
            None | Some(Value::Null) => {}
            Some(Value::Object(object)) => {
                response.session_config = Some(SessionConfig::from_object(object));
            }
            Some(other) => response.skip(SESSION_CONFIG, other),
        }

        match fields.get(NEXT_MAINTENANCE) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s.trim().is_empty() => {}
            Some(Value::String(s)) => match parse_utc_timestamp(s) {
                Ok(at) => response.next_scheduled_maintenance_utc = Some(at),
                Err(e) => response
                    .skipped
                    .push(format!("{NEXT_MAINTENANCE}: cannot parse {s:?}: {e}")),
            },
            Some(other) => response.skip(NEXT_MAINTENANCE, other),
        }

        match fields.get(MAINTENANCE_SCHEDULE) {
            None | Some(Value::Null) => {}
            Some(value) => {
                match serde_json::from_value::<MaintenanceSchedule>(value.clone()) {
                    Ok(schedule) => response.maintenance_schedule = Some(schedule),
                    Err(e) => response
                        .skipped
                        .push(format!("{MAINTENANCE_SCHEDULE}: {e}")),
                }
            }
        }

        match fields.get(OPERATION) {
            None | Some(Value::Null) => {}
            Some(Value::String(name)) => {
                response.operation = Some(match Operation::from_name(name) {
                    Some(op) => ReceivedOperation::Known(op),
                    None => ReceivedOperation::Unknown(name.clone()),
                });
            }
            // A number or object where a name belongs is still "an
            // operation we don't understand", not a missing one.
            Some(other) => {
                response.operation =
                    Some(ReceivedOperation::Unknown(other.to_string()));
            }
        }

        match fields.get(NEXT_INTERVAL) {
            None | Some(Value::Null) => {}
            Some(value) => match interval_ms(value) {
                Some(ms) => response.next_heartbeat_interval_ms = Some(ms),
                None => response.skip(NEXT_INTERVAL, value),
            },
        }

        Ok(response)
    }

    fn skip(&mut self, field: &str, value: &Value) {
        self.skipped
            .push(format!("{field}: unexpected {}", kind(value)));
    }
}

/// Parses an ISO-8601 timestamp as UTC.
///
/// Accepts RFC 3339 with any offset (converted to UTC) and, since some
/// agents omit the zone designator, a bare `YYYY-MM-DDTHH:MM:SS[.fff]`
/// which is taken to be UTC already.
///
/// # Errors
/// Returns the `chrono` parse error from the RFC 3339 attempt when neither
/// form matches.
pub fn parse_utc_timestamp(
    text: &str,
) -> Result<DateTime<Utc>, chrono::ParseError> {
    let text = text.trim();
    match DateTime::parse_from_rfc3339(text) {
        Ok(at) => Ok(at.with_timezone(&Utc)),
        Err(e) => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| e),
    }
}

fn string_children(object: &Map<String, Value>) -> BTreeMap<String, String> {
    object
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_owned())))
        .collect()
}

/// Non-negative whole milliseconds; fractions are truncated.
fn interval_ms(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map(|ms| ms as u64)
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use chrono::{Datelike, TimeZone, Timelike};

    use super::*;

    fn parse(json: &str) -> HeartbeatResponse {
        HeartbeatResponse::parse(json.as_bytes()).expect("should parse")
    }

    // =====================================================================
    // Document-level failures
    // =====================================================================

    #[test]
    fn test_parse_invalid_json_returns_decode_error() {
        let result = HeartbeatResponse::parse(b"{\"operation\": ");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_parse_top_level_array_returns_invalid_message() {
        let result = HeartbeatResponse::parse(b"[1, 2, 3]");
        assert!(matches!(result, Err(ProtocolError::InvalidMessage(_))));
    }

    #[test]
    fn test_parse_empty_object_has_no_fields() {
        let response = parse("{}");
        assert_eq!(response, HeartbeatResponse::default());
    }

    // =====================================================================
    // operation
    // =====================================================================

    #[test]
    fn test_parse_known_operation() {
        let response = parse(r#"{"operation":"Active"}"#);
        assert_eq!(
            response.operation,
            Some(ReceivedOperation::Known(Operation::Active))
        );
    }

    #[test]
    fn test_parse_unknown_operation_kept_verbatim() {
        let response = parse(r#"{"operation":"Reticulate"}"#);
        assert_eq!(
            response.operation,
            Some(ReceivedOperation::Unknown("Reticulate".into()))
        );
    }

    #[test]
    fn test_parse_non_string_operation_is_unknown() {
        let response = parse(r#"{"operation":7}"#);
        assert_eq!(
            response.operation,
            Some(ReceivedOperation::Unknown("7".into()))
        );
    }

    // =====================================================================
    // sessionConfig
    // =====================================================================

    #[test]
    fn test_parse_session_config_collects_string_children() {
        let response = parse(
            r#"{"sessionConfig":{
                "sessionId":"eca7e870-da2e-45f9-bb66-30d89064313a",
                "sessionCookie":"OreoCookie",
                "maxPlayers": 8,
                "initialPlayers":["p1","p2"],
                "metadata":{"map":"forest","round":3}
            }}"#,
        );

        let config = response.session_config.expect("sessionConfig present");
        assert_eq!(config.values.len(), 2);
        assert_eq!(config.values["sessionCookie"], "OreoCookie");
        assert_eq!(
            config.values["sessionId"],
            "eca7e870-da2e-45f9-bb66-30d89064313a"
        );
        assert_eq!(
            config.initial_players,
            Some(vec!["p1".to_string(), "p2".to_string()])
        );
        assert_eq!(config.metadata.len(), 1);
        assert_eq!(config.metadata["map"], "forest");
    }

    #[test]
    fn test_config_entries_metadata_comes_last() {
        let response = parse(
            r#"{"sessionConfig":{"map":"desert","metadata":{"map":"forest"}}}"#,
        );
        let config = response.session_config.unwrap();

        let entries: Vec<_> = config.config_entries().collect();
        assert_eq!(entries, vec![("map", "desert"), ("map", "forest")]);
    }

    #[test]
    fn test_parse_session_config_without_initial_players_is_none() {
        let response = parse(r#"{"sessionConfig":{"sessionCookie":"c"}}"#);
        assert_eq!(response.session_config.unwrap().initial_players, None);
    }

    #[test]
    fn test_parse_session_config_wrong_type_is_skipped() {
        let response = parse(r#"{"sessionConfig":"oops","operation":"Continue"}"#);
        assert!(response.session_config.is_none());
        assert_eq!(response.skipped.len(), 1);
        assert!(response.operation.is_some());
    }

    // =====================================================================
    // Maintenance
    // =====================================================================

    #[test]
    fn test_parse_next_maintenance_utc() {
        let response =
            parse(r#"{"nextScheduledMaintenanceUtc":"2030-05-06T07:08:09Z"}"#);
        assert_eq!(
            response.next_scheduled_maintenance_utc,
            Some(Utc.with_ymd_and_hms(2030, 5, 6, 7, 8, 9).unwrap())
        );
    }

    #[test]
    fn test_parse_next_maintenance_garbage_is_skipped() {
        let response =
            parse(r#"{"nextScheduledMaintenanceUtc":"next tuesday"}"#);
        assert_eq!(response.next_scheduled_maintenance_utc, None);
        assert_eq!(response.skipped.len(), 1);
    }

    #[test]
    fn test_parse_next_maintenance_blank_is_ignored() {
        let response = parse(r#"{"nextScheduledMaintenanceUtc":"  "}"#);
        assert_eq!(response.next_scheduled_maintenance_utc, None);
        assert!(response.skipped.is_empty());
    }

    #[test]
    fn test_parse_maintenance_schedule_full_event() {
        let response = parse(
            r#"{"maintenanceSchedule":{
                "DocumentIncarnation":"IncarnationID",
                "Events":[{
                    "EventId":"eventID",
                    "EventType":"Reboot",
                    "ResourceType":"VirtualMachine",
                    "Resources":["resourceName"],
                    "EventStatus":"Scheduled",
                    "NotBefore":"2018-04-12T16:58:30.1458776Z",
                    "Description":"eventDescription",
                    "EventSource":"Platform",
                    "DurationInSeconds":3600
                }]
            }}"#,
        );

        let schedule = response.maintenance_schedule.expect("schedule present");
        assert_eq!(schedule.document_incarnation, "IncarnationID");
        assert_eq!(schedule.events.len(), 1);

        let event = &schedule.events[0];
        assert_eq!(event.event_id, "eventID");
        assert_eq!(event.event_type, "Reboot");
        assert_eq!(event.resource_type, "VirtualMachine");
        assert_eq!(event.resources, vec!["resourceName".to_string()]);
        assert_eq!(event.event_status, "Scheduled");
        assert_eq!(event.description, "eventDescription");
        assert_eq!(event.event_source, "Platform");
        assert_eq!(event.duration_in_seconds, 3600);

        let not_before = event.not_before.expect("NotBefore present");
        assert_eq!(not_before.timestamp(), 1_523_552_310);
        assert_eq!(not_before.nanosecond(), 145_877_600);
    }

    // =====================================================================
    // nextHeartbeatIntervalMs
    // =====================================================================

    #[test]
    fn test_parse_interval_integer() {
        let response = parse(r#"{"nextHeartbeatIntervalMs":30000}"#);
        assert_eq!(response.next_heartbeat_interval_ms, Some(30_000));
    }

    #[test]
    fn test_parse_interval_fraction_truncates() {
        let response = parse(r#"{"nextHeartbeatIntervalMs":1500.9}"#);
        assert_eq!(response.next_heartbeat_interval_ms, Some(1500));
    }

    #[test]
    fn test_parse_interval_negative_is_skipped() {
        let response = parse(r#"{"nextHeartbeatIntervalMs":-5}"#);
        assert_eq!(response.next_heartbeat_interval_ms, None);
        assert_eq!(response.skipped.len(), 1);
    }

    // =====================================================================
    // parse_utc_timestamp
    // =====================================================================

    #[test]
    fn test_parse_utc_timestamp_converts_offset() {
        let at = parse_utc_timestamp("2030-01-01T02:00:00+02:00").unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_utc_timestamp_without_zone_is_utc() {
        let at = parse_utc_timestamp("2030-01-01T12:30:00.25").unwrap();
        assert_eq!(at.year(), 2030);
        assert_eq!(at.hour(), 12);
        assert_eq!(at.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_parse_utc_timestamp_rejects_garbage() {
        assert!(parse_utc_timestamp("yesterday").is_err());
    }
}
