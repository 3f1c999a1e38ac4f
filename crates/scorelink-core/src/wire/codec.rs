//! Encoding and decoding of peer messages
//!
//! The transport only carries string-keyed maps of primitives, arrays and
//! nested maps. [`WireMessage`] is the typed view of such a map: one
//! variant per message kind, validated in full at decode time.
//!
//! ## Key schema
//!
//! ```text
//! { "teams": [ { "name", "color", "score": [ { "time", "value" } ] } ],
//!   "intervals": [ { "name", "date", "teamSnapshots": [ { "teamName", "teamColor", "totalScore" } ] } ],
//!   "preferences": { <name>: <bool> } }          -- optional
//! { "preferences": { <name>: <bool> } }
//! { "command": "resetScores" | "reinitializeApp" }
//! { "notification": "dataChanged" }
//! ```
//!
//! Timestamps are epoch seconds as floating-point numbers.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::payload::{IntervalData, SyncPayload, TeamData};
use super::WireMap;
use crate::domain::{
    ColorHex, Command, Notification, PreferenceSet, ScoreEvent, TeamSnapshot,
};

pub const KEY_TEAMS: &str = "teams";
pub const KEY_INTERVALS: &str = "intervals";
pub const KEY_PREFERENCES: &str = "preferences";
pub const KEY_COMMAND: &str = "command";
pub const KEY_NOTIFICATION: &str = "notification";

/// Why an incoming map could not be decoded
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    /// None of the top-level message keys is present
    #[error("unrecognized message (keys: {0:?})")]
    UnrecognizedMessage(Vec<String>),

    /// A required key is absent
    #[error("missing key `{key}` in {context}")]
    MissingKey { context: &'static str, key: String },

    /// A key holds a value of the wrong type
    #[error("key `{key}` in {context} is not {expected}")]
    InvalidType {
        context: &'static str,
        key: String,
        expected: &'static str,
    },

    /// A timestamp is not representable
    #[error("invalid timestamp {value} in {context}")]
    InvalidTimestamp { context: &'static str, value: f64 },

    /// The command name is not known
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The notification name is not known
    #[error("unknown notification: {0}")]
    UnknownNotification(String),
}

/// A decoded peer message
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    Sync(SyncPayload),
    Preferences(PreferenceSet),
    Command(Command),
    Notification(Notification),
}

impl WireMessage {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Sync(_) => "sync",
            WireMessage::Preferences(_) => "preferences",
            WireMessage::Command(_) => "command",
            WireMessage::Notification(_) => "notification",
        }
    }

    /// Encodes the message into the transport's map shape
    pub fn encode(&self) -> WireMap {
        let mut map = Map::new();
        match self {
            WireMessage::Sync(payload) => {
                map.insert(
                    KEY_TEAMS.to_string(),
                    Value::Array(payload.teams.iter().map(encode_team).collect()),
                );
                map.insert(
                    KEY_INTERVALS.to_string(),
                    Value::Array(payload.intervals.iter().map(encode_interval).collect()),
                );
                if let Some(prefs) = &payload.preferences {
                    map.insert(KEY_PREFERENCES.to_string(), encode_preferences(prefs));
                }
            }
            WireMessage::Preferences(prefs) => {
                map.insert(KEY_PREFERENCES.to_string(), encode_preferences(prefs));
            }
            WireMessage::Command(cmd) => {
                map.insert(KEY_COMMAND.to_string(), Value::from(cmd.as_str()));
            }
            WireMessage::Notification(n) => {
                map.insert(KEY_NOTIFICATION.to_string(), Value::from(n.as_str()));
            }
        }
        map
    }

    /// Decodes a map received from the transport
    ///
    /// The first matching key decides the kind, checked in the order
    /// `command`, `notification`, `teams`, `preferences`. Any malformed
    /// element rejects the whole message.
    pub fn decode(map: &WireMap) -> Result<WireMessage, DecodeError> {
        if let Some(value) = map.get(KEY_COMMAND) {
            let name = value.as_str().ok_or_else(|| DecodeError::InvalidType {
                context: "message",
                key: KEY_COMMAND.to_string(),
                expected: "a string",
            })?;
            return Command::from_wire(name)
                .map(WireMessage::Command)
                .ok_or_else(|| DecodeError::UnknownCommand(name.to_string()));
        }

        if let Some(value) = map.get(KEY_NOTIFICATION) {
            let name = value.as_str().ok_or_else(|| DecodeError::InvalidType {
                context: "message",
                key: KEY_NOTIFICATION.to_string(),
                expected: "a string",
            })?;
            return Notification::from_wire(name)
                .map(WireMessage::Notification)
                .ok_or_else(|| DecodeError::UnknownNotification(name.to_string()));
        }

        if map.contains_key(KEY_TEAMS) {
            return decode_sync(map).map(WireMessage::Sync);
        }

        if let Some(value) = map.get(KEY_PREFERENCES) {
            return decode_preferences(value).map(WireMessage::Preferences);
        }

        Err(DecodeError::UnrecognizedMessage(map.keys().cloned().collect()))
    }
}

impl SyncPayload {
    /// Encodes this payload as a sync message
    pub fn to_wire_map(&self) -> WireMap {
        WireMessage::Sync(self.clone()).encode()
    }

    /// Decodes a sync message, returning `None` for anything else
    ///
    /// Callers treat `None` as "ignore this message".
    pub fn from_wire_map(map: &WireMap) -> Option<SyncPayload> {
        match WireMessage::decode(map) {
            Ok(WireMessage::Sync(payload)) => Some(payload),
            _ => None,
        }
    }
}

// ============================================================================
// Encoding helpers
// ============================================================================

fn encode_timestamp(ts: DateTime<Utc>) -> Value {
    json!(ts.timestamp_millis() as f64 / 1000.0)
}

fn encode_team(team: &TeamData) -> Value {
    let score: Vec<Value> = team
        .score
        .iter()
        .map(|e| json!({ "time": encode_timestamp(e.timestamp()), "value": e.delta() }))
        .collect();
    json!({
        "name": team.name,
        "color": team.color.as_str(),
        "score": score,
    })
}

fn encode_interval(interval: &IntervalData) -> Value {
    let snapshots: Vec<Value> = interval
        .team_snapshots
        .iter()
        .map(|s| {
            json!({
                "teamName": s.team_name,
                "teamColor": s.team_color.as_str(),
                "totalScore": s.total_score,
            })
        })
        .collect();
    json!({
        "name": interval.name,
        "date": encode_timestamp(interval.date),
        "teamSnapshots": snapshots,
    })
}

fn encode_preferences(prefs: &PreferenceSet) -> Value {
    let map: Map<String, Value> = prefs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::Bool(v)))
        .collect();
    Value::Object(map)
}

// ============================================================================
// Decoding helpers
// ============================================================================

fn field<'a>(
    obj: &'a Map<String, Value>,
    context: &'static str,
    key: &str,
) -> Result<&'a Value, DecodeError> {
    obj.get(key).ok_or_else(|| DecodeError::MissingKey {
        context,
        key: key.to_string(),
    })
}

fn invalid(context: &'static str, key: &str, expected: &'static str) -> DecodeError {
    DecodeError::InvalidType {
        context,
        key: key.to_string(),
        expected,
    }
}

fn as_object<'a>(
    value: &'a Value,
    context: &'static str,
    key: &str,
) -> Result<&'a Map<String, Value>, DecodeError> {
    value.as_object().ok_or_else(|| invalid(context, key, "a map"))
}

fn as_array<'a>(
    value: &'a Value,
    context: &'static str,
    key: &str,
) -> Result<&'a Vec<Value>, DecodeError> {
    value.as_array().ok_or_else(|| invalid(context, key, "an array"))
}

fn string_field(
    obj: &Map<String, Value>,
    context: &'static str,
    key: &str,
) -> Result<String, DecodeError> {
    field(obj, context, key)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(context, key, "a string"))
}

fn int_field(obj: &Map<String, Value>, context: &'static str, key: &str) -> Result<i64, DecodeError> {
    field(obj, context, key)?
        .as_i64()
        .ok_or_else(|| invalid(context, key, "an integer"))
}

fn timestamp_field(
    obj: &Map<String, Value>,
    context: &'static str,
    key: &str,
) -> Result<DateTime<Utc>, DecodeError> {
    let secs = field(obj, context, key)?
        .as_f64()
        .ok_or_else(|| invalid(context, key, "a number"))?;
    if !secs.is_finite() {
        return Err(DecodeError::InvalidTimestamp { context, value: secs });
    }
    let millis = (secs * 1000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return Err(DecodeError::InvalidTimestamp { context, value: secs });
    }
    DateTime::from_timestamp_millis(millis as i64)
        .ok_or(DecodeError::InvalidTimestamp { context, value: secs })
}

fn decode_sync(map: &WireMap) -> Result<SyncPayload, DecodeError> {
    let teams = as_array(field(map, "message", KEY_TEAMS)?, "message", KEY_TEAMS)?
        .iter()
        .map(decode_team)
        .collect::<Result<Vec<_>, _>>()?;

    let intervals = match map.get(KEY_INTERVALS) {
        Some(value) => as_array(value, "message", KEY_INTERVALS)?
            .iter()
            .map(decode_interval)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let preferences = match map.get(KEY_PREFERENCES) {
        Some(value) => Some(decode_preferences(value)?),
        None => None,
    };

    Ok(SyncPayload {
        teams,
        intervals,
        preferences,
    })
}

fn decode_team(value: &Value) -> Result<TeamData, DecodeError> {
    const CTX: &str = "team";
    let obj = as_object(value, "message", KEY_TEAMS)?;
    let name = string_field(obj, CTX, "name")?;
    let color = ColorHex::from_wire(string_field(obj, CTX, "color")?);
    let score = match obj.get("score") {
        Some(v) => as_array(v, CTX, "score")?
            .iter()
            .map(decode_score)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    Ok(TeamData { name, color, score })
}

fn decode_score(value: &Value) -> Result<ScoreEvent, DecodeError> {
    const CTX: &str = "score event";
    let obj = as_object(value, "team", "score")?;
    let time = timestamp_field(obj, CTX, "time")?;
    let delta = int_field(obj, CTX, "value")?;
    let delta = i32::try_from(delta).map_err(|_| invalid(CTX, "value", "a 32-bit integer"))?;
    Ok(ScoreEvent::new(time, delta))
}

fn decode_interval(value: &Value) -> Result<IntervalData, DecodeError> {
    const CTX: &str = "interval";
    let obj = as_object(value, "message", KEY_INTERVALS)?;
    let name = string_field(obj, CTX, "name")?;
    let date = timestamp_field(obj, CTX, "date")?;
    let team_snapshots = match obj.get("teamSnapshots") {
        Some(v) => as_array(v, CTX, "teamSnapshots")?
            .iter()
            .map(decode_snapshot)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    Ok(IntervalData {
        name,
        date,
        team_snapshots,
    })
}

fn decode_snapshot(value: &Value) -> Result<TeamSnapshot, DecodeError> {
    const CTX: &str = "team snapshot";
    let obj = as_object(value, "interval", "teamSnapshots")?;
    Ok(TeamSnapshot {
        team_name: string_field(obj, CTX, "teamName")?,
        team_color: ColorHex::from_wire(string_field(obj, CTX, "teamColor")?),
        total_score: int_field(obj, CTX, "totalScore")?,
    })
}

fn decode_preferences(value: &Value) -> Result<PreferenceSet, DecodeError> {
    const CTX: &str = "preferences";
    as_object(value, "message", KEY_PREFERENCES)?
        .iter()
        .map(|(k, v)| {
            v.as_bool()
                .map(|b| (k.clone(), b))
                .ok_or_else(|| invalid(CTX, k, "a boolean"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::preferences::{ALLOW_NEGATIVE_POINTS, INTERVALS_ENABLED};

    fn ts(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn team(name: &str, deltas: &[i32]) -> TeamData {
        TeamData {
            name: name.to_string(),
            color: ColorHex::new("A1B2C3").unwrap(),
            score: deltas
                .iter()
                .enumerate()
                .map(|(i, d)| ScoreEvent::new(ts(1_760_000_000_123 + i as i64 * 1_001), *d))
                .collect(),
        }
    }

    fn as_map(value: Value) -> WireMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_roundtrip_empty_single_and_mixed_scores() {
        let payload = SyncPayload::new(
            vec![team("Empty", &[]), team("Single", &[1]), team("Mixed", &[1, -1, 1, 1])],
            vec![IntervalData {
                name: "Q1".to_string(),
                date: ts(1_760_000_100_500),
                team_snapshots: vec![TeamSnapshot {
                    team_name: "Mixed".to_string(),
                    team_color: ColorHex::new("A1B2C3").unwrap(),
                    total_score: 2,
                }],
            }],
        )
        .with_preferences(PreferenceSet::new().with(ALLOW_NEGATIVE_POINTS, true));

        let decoded = SyncPayload::from_wire_map(&payload.to_wire_map());
        assert_eq!(decoded, Some(payload));
    }

    #[test]
    fn test_timestamps_encode_as_epoch_seconds() {
        let map = SyncPayload::new(vec![team("A", &[1])], vec![]).to_wire_map();
        let time = &map["teams"][0]["score"][0]["time"];
        assert_eq!(time.as_f64(), Some(1_760_000_000.123));
    }

    #[test]
    fn test_command_and_notification_roundtrip() {
        for msg in [
            WireMessage::Command(Command::ResetScores),
            WireMessage::Command(Command::ReinitializeApp),
            WireMessage::Notification(Notification::DataChanged),
        ] {
            assert_eq!(WireMessage::decode(&msg.encode()), Ok(msg));
        }
    }

    #[test]
    fn test_preferences_message() {
        let prefs = PreferenceSet::new()
            .with(ALLOW_NEGATIVE_POINTS, false)
            .with(INTERVALS_ENABLED, true);
        let map = WireMessage::Preferences(prefs.clone()).encode();
        assert_eq!(map.len(), 1);
        assert_eq!(
            WireMessage::decode(&map),
            Ok(WireMessage::Preferences(prefs))
        );
    }

    #[test]
    fn test_command_wins_over_other_keys() {
        let map = as_map(json!({ "command": "resetScores", "teams": [] }));
        assert_eq!(
            WireMessage::decode(&map),
            Ok(WireMessage::Command(Command::ResetScores))
        );
        assert_eq!(SyncPayload::from_wire_map(&map), None);
    }

    #[test]
    fn test_unknown_command() {
        let map = as_map(json!({ "command": "explode" }));
        assert_eq!(
            WireMessage::decode(&map),
            Err(DecodeError::UnknownCommand("explode".to_string()))
        );
    }

    #[test]
    fn test_unrecognized_message() {
        let map = as_map(json!({ "hello": 1 }));
        assert!(matches!(
            WireMessage::decode(&map),
            Err(DecodeError::UnrecognizedMessage(keys)) if keys == vec!["hello".to_string()]
        ));
    }

    #[test]
    fn test_missing_team_name_rejects_whole_message() {
        let map = as_map(json!({
            "teams": [
                { "name": "A", "color": "FF0000", "score": [] },
                { "color": "00FF00", "score": [] }
            ],
            "intervals": []
        }));
        assert_eq!(
            WireMessage::decode(&map),
            Err(DecodeError::MissingKey {
                context: "team",
                key: "name".to_string()
            })
        );
        assert_eq!(SyncPayload::from_wire_map(&map), None);
    }

    #[test]
    fn test_score_value_must_be_integer() {
        let map = as_map(json!({
            "teams": [ { "name": "A", "color": "FF0000", "score": [ { "time": 1.5, "value": "1" } ] } ]
        }));
        assert!(matches!(
            WireMessage::decode(&map),
            Err(DecodeError::InvalidType { key, .. }) if key == "value"
        ));
    }

    #[test]
    fn test_missing_intervals_decodes_as_empty() {
        let map = as_map(json!({
            "teams": [ { "name": "A", "color": "FF0000", "score": [] } ]
        }));
        let payload = SyncPayload::from_wire_map(&map).unwrap();
        assert_eq!(payload.teams.len(), 1);
        assert!(payload.intervals.is_empty());
        assert!(payload.preferences.is_none());
    }

    #[test]
    fn test_non_boolean_preference_rejected() {
        let map = as_map(json!({ "preferences": { "hasEnabledIntervals": "yes" } }));
        assert!(matches!(
            WireMessage::decode(&map),
            Err(DecodeError::InvalidType { context: "preferences", .. })
        ));
    }

    #[test]
    fn test_integer_timestamp_accepted() {
        let map = as_map(json!({
            "teams": [ { "name": "A", "color": "FF0000", "score": [ { "time": 1760000000, "value": 1 } ] } ]
        }));
        let payload = SyncPayload::from_wire_map(&map).unwrap();
        assert_eq!(payload.teams[0].score[0].timestamp(), ts(1_760_000_000_000));
    }
}
