use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::topic::validate_topic;

/// Classification of a packet, carried under the JSON key `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PacketType {
    /// Something happened; no reply expected.
    #[default]
    Event,
    /// Request for the receiver to act.
    Command,
    /// Snapshot of producer state.
    State,
    /// Bus-level control traffic (ready, register, ...).
    Control,
    /// Reply to a command.
    Response,
}

impl PacketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Command => "command",
            Self::State => "state",
            Self::Control => "control",
            Self::Response => "response",
        }
    }
}

impl std::str::FromStr for PacketType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(Self::Event),
            "command" => Ok(Self::Command),
            "state" => Ok(Self::State),
            "control" => Ok(Self::Control),
            "response" => Ok(Self::Response),
            other => Err(ProtocolError::UnknownPacketType(other.to_string())),
        }
    }
}

impl std::fmt::Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The wire unit of the Terrain bus.
///
/// Packets are JSON objects crossing the frame boundary. The topic is fixed
/// at construction; the only field that changes while a packet travels is
/// `trace`, which collects the identity of every frame it passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub topic: String,
    #[serde(rename = "type", default)]
    pub kind: PacketType,
    #[serde(default = "empty_payload")]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub source: String,
    #[serde(default = "now_secs")]
    pub timestamp: f64,
    #[serde(default)]
    pub trace: Vec<String>,
}

impl Packet {
    /// Build a packet stamped with the current time and an empty trace.
    ///
    /// Fails if the topic is empty, has empty segments, or contains a
    /// wildcard segment.
    pub fn new(
        topic: impl Into<String>,
        kind: PacketType,
        payload: serde_json::Value,
        source: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        let topic = topic.into();
        validate_topic(&topic)?;
        Ok(Self {
            topic,
            kind,
            payload,
            source: source.into(),
            timestamp: now_secs(),
            trace: Vec::new(),
        })
    }

    /// Copy of this packet with `identity` appended to the trace.
    pub fn with_hop(&self, identity: &str) -> Self {
        let mut next = self.clone();
        next.trace.push(identity.to_string());
        next
    }

    /// Append `identity` unless it is already the most recent hop.
    pub fn stamp_hop(&mut self, identity: &str) {
        if self.trace.last().map(String::as_str) != Some(identity) {
            self.trace.push(identity.to_string());
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a canonical packet and check its topic.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        let packet: Packet = serde_json::from_str(json)?;
        validate_topic(&packet.topic)?;
        Ok(packet)
    }
}

pub(crate) fn empty_payload() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Seconds since the Unix epoch with millisecond resolution.
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_serializes_type_key() {
        let packet = Packet::new(
            "terrain/env/acme/dev",
            PacketType::State,
            serde_json::json!({"env": "dev"}),
            "tsm",
        )
        .unwrap();
        let json = packet.to_json().unwrap();
        assert!(json.contains("\"type\":\"state\""));

        let parsed = Packet::from_json(&json).unwrap();
        assert_eq!(parsed.kind, PacketType::State);
        assert_eq!(parsed.topic, "terrain/env/acme/dev");
    }

    #[test]
    fn test_packet_rejects_wildcard_topic() {
        let result = Packet::new("a/+/c", PacketType::Event, empty_payload(), "x");
        assert!(matches!(result, Err(ProtocolError::InvalidTopic { .. })));
        assert!(Packet::new("", PacketType::Event, empty_payload(), "x").is_err());
    }

    #[test]
    fn test_from_json_defaults_missing_fields() {
        let parsed = Packet::from_json(r#"{"topic":"a/b"}"#).unwrap();
        assert_eq!(parsed.kind, PacketType::Event);
        assert_eq!(parsed.payload, serde_json::json!({}));
        assert!(parsed.trace.is_empty());
        assert!(parsed.timestamp > 0.0);
    }

    #[test]
    fn test_with_hop_leaves_original_untouched() {
        let packet = Packet::new("a/b", PacketType::Event, empty_payload(), "x").unwrap();
        let hopped = packet.with_hop("hub");
        assert!(packet.trace.is_empty());
        assert_eq!(hopped.trace, vec!["hub".to_string()]);
    }

    #[test]
    fn test_stamp_hop_skips_repeated_identity() {
        let mut packet = Packet::new("a/b", PacketType::Event, empty_payload(), "x").unwrap();
        packet.stamp_hop("leaf");
        packet.stamp_hop("hub");
        packet.stamp_hop("hub");
        assert_eq!(packet.trace, vec!["leaf".to_string(), "hub".to_string()]);
    }

    #[test]
    fn test_packet_type_roundtrip() {
        for kind in [
            PacketType::Event,
            PacketType::Command,
            PacketType::State,
            PacketType::Control,
            PacketType::Response,
        ] {
            assert_eq!(kind.as_str().parse::<PacketType>().unwrap(), kind);
        }
        assert!(matches!(
            "bogus".parse::<PacketType>(),
            Err(ProtocolError::UnknownPacketType(_))
        ));
    }
}
