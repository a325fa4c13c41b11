//! Normalization of inbound messages into canonical packets.
//!
//! Frames have spoken several message dialects over time. Every inbound
//! object is classified by an ordered rule table (first match wins) into a
//! [`RawMessage`], and the classified shape is then turned into a
//! [`Packet`]. Objects that match no rule are dropped; unrelated
//! `postMessage` traffic lands here routinely, so this is not an error.
//!
//! Rule order:
//! 1. `canonical`  - already has a string `topic`
//! 2. `panel`      - `type` + `from`, no `source`
//! 3. `game`       - `source` starts with the game prefix, has `type`
//! 4. `system`     - `source == "terrain"`, has `type`
//! 5. `game_state` - `type` starts with `game_`, `player_`, `state_` or `input_`
//! 6. `custom`     - any other scalar `type` (numbers and booleans are stringified)

use serde_json::{Map, Value};

use crate::constants::*;
use crate::packet::{empty_payload, now_secs, Packet, PacketType};
use crate::topic::{validate_topic, TerrainTopics};

/// Identity of the frame doing the normalization.
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    pub identity: String,
}

impl NormalizeContext {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }
}

/// An inbound message after classification, before packet construction.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMessage {
    /// Already a packet.
    Canonical(Packet),
    /// Panel event: `{type, from, ...}`.
    Panel {
        from: String,
        kind: String,
        raw: Map<String, Value>,
    },
    /// Game frame message: `{source: "pja-...", type, data}`.
    Game {
        game_id: String,
        kind: String,
        data: Value,
    },
    /// Parent window message: `{source: "terrain", type, data}`.
    System { kind: String, data: Value },
    /// Bare engine message: `{type: "game_*" | "player_*" | ..., gameId?}`.
    GameState {
        game_id: String,
        kind: String,
        payload: Value,
    },
    /// Anything else that at least carried a `type`.
    Custom {
        kind: String,
        raw: Map<String, Value>,
    },
}

type Classifier = fn(&Map<String, Value>) -> Option<RawMessage>;

struct Rule {
    name: &'static str,
    classify: Classifier,
}

const RULES: &[Rule] = &[
    Rule {
        name: "canonical",
        classify: classify_canonical,
    },
    Rule {
        name: "panel",
        classify: classify_panel,
    },
    Rule {
        name: "game",
        classify: classify_game,
    },
    Rule {
        name: "system",
        classify: classify_system,
    },
    Rule {
        name: "game_state",
        classify: classify_game_state,
    },
    Rule {
        name: "custom",
        classify: classify_custom,
    },
];

impl RawMessage {
    /// Run the rule table. Returns the matching rule name with the shape.
    pub fn classify(raw: &Value) -> Option<(&'static str, RawMessage)> {
        let object = raw.as_object()?;
        RULES
            .iter()
            .find_map(|rule| (rule.classify)(object).map(|shape| (rule.name, shape)))
    }

    /// Build the canonical packet for this shape.
    ///
    /// Returns `None` when the resulting topic is not a valid packet topic
    /// (e.g. an empty `type`).
    pub fn into_packet(self, ctx: &NormalizeContext) -> Option<Packet> {
        let (topic, kind, payload, source, trace) = match self {
            RawMessage::Canonical(packet) => {
                if let Err(e) = validate_topic(&packet.topic) {
                    tracing::debug!(error = %e, "Dropping packet with invalid topic");
                    return None;
                }
                return Some(packet.with_hop(&ctx.identity));
            }
            RawMessage::Panel { from, kind, raw } => (
                TerrainTopics::panel(&from, &kind),
                PacketType::Event,
                Value::Object(raw),
                from.clone(),
                vec![from],
            ),
            RawMessage::Game {
                game_id,
                kind,
                data,
            } => (
                TerrainTopics::game(&game_id, &kind.to_lowercase().replace('_', "-")),
                PacketType::Event,
                data,
                game_id.clone(),
                vec![game_id],
            ),
            RawMessage::System { kind, data } => {
                let kind = kind.to_lowercase();
                let class = if kind.contains("change") {
                    PacketType::Command
                } else {
                    PacketType::Event
                };
                (
                    TerrainTopics::system(&kind),
                    class,
                    data,
                    PARENT_IDENTITY.to_string(),
                    vec![PARENT_IDENTITY.to_string()],
                )
            }
            RawMessage::GameState {
                game_id,
                kind,
                payload,
            } => {
                let class = if kind.to_lowercase().contains("state") {
                    PacketType::State
                } else {
                    PacketType::Event
                };
                (
                    TerrainTopics::game(&game_id, &kind),
                    class,
                    payload,
                    game_id,
                    Vec::new(),
                )
            }
            RawMessage::Custom { kind, raw } => (
                TerrainTopics::custom(&kind),
                PacketType::Event,
                Value::Object(raw),
                UNKNOWN_SOURCE.to_string(),
                Vec::new(),
            ),
        };

        match Packet::new(topic, kind, payload, source) {
            Ok(mut packet) => {
                packet.trace = trace;
                Some(packet)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Dropping legacy message with unusable topic");
                None
            }
        }
    }
}

/// Normalize an inbound object into a canonical packet, or `None` to drop it.
pub fn normalize(raw: &Value, ctx: &NormalizeContext) -> Option<Packet> {
    let Some((rule, shape)) = RawMessage::classify(raw) else {
        tracing::trace!("Ignoring unrecognized message");
        return None;
    };
    let packet = shape.into_packet(ctx)?;
    if rule != "canonical" {
        tracing::debug!(rule, topic = %packet.topic, "Normalized legacy message");
    }
    Some(packet)
}

fn str_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

fn scalar_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn data_or_empty(object: &Map<String, Value>) -> Value {
    object.get("data").cloned().unwrap_or_else(empty_payload)
}

fn classify_canonical(object: &Map<String, Value>) -> Option<RawMessage> {
    let topic = str_field(object, "topic")?;
    let kind = str_field(object, "type")
        .and_then(|t| t.parse::<PacketType>().ok())
        .unwrap_or_default();
    let trace = object
        .get("trace")
        .and_then(Value::as_array)
        .map(|hops| {
            hops.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Some(RawMessage::Canonical(Packet {
        topic: topic.to_string(),
        kind,
        payload: object.get("payload").cloned().unwrap_or_else(empty_payload),
        source: str_field(object, "source").unwrap_or_default().to_string(),
        timestamp: object
            .get("timestamp")
            .and_then(Value::as_f64)
            .unwrap_or_else(now_secs),
        trace,
    }))
}

fn classify_panel(object: &Map<String, Value>) -> Option<RawMessage> {
    if object.contains_key("source") {
        return None;
    }
    let kind = str_field(object, "type")?;
    let from = str_field(object, "from")?;
    Some(RawMessage::Panel {
        from: from.to_string(),
        kind: kind.to_string(),
        raw: object.clone(),
    })
}

fn classify_game(object: &Map<String, Value>) -> Option<RawMessage> {
    let source = str_field(object, "source")?;
    if !source.starts_with(GAME_SOURCE_PREFIX) {
        return None;
    }
    let kind = str_field(object, "type")?;
    let data = data_or_empty(object);
    let game_id = data
        .get("gameId")
        .or_else(|| data.get("game_id"))
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_GAME_ID)
        .to_string();
    Some(RawMessage::Game {
        game_id,
        kind: kind.to_string(),
        data,
    })
}

fn classify_system(object: &Map<String, Value>) -> Option<RawMessage> {
    if str_field(object, "source")? != TERRAIN_SOURCE {
        return None;
    }
    let kind = str_field(object, "type")?;
    Some(RawMessage::System {
        kind: kind.to_string(),
        data: data_or_empty(object),
    })
}

fn classify_game_state(object: &Map<String, Value>) -> Option<RawMessage> {
    let kind = str_field(object, "type")?;
    if !GAME_TYPE_PREFIXES.iter().any(|p| kind.starts_with(p)) {
        return None;
    }
    let data = object.get("data");
    let game_id = str_field(object, "gameId")
        .or_else(|| data.and_then(|d| d.get("gameId")).and_then(Value::as_str))
        .unwrap_or(DEFAULT_GAME_ID)
        .to_string();
    let payload = match data {
        Some(d) if d.is_object() => d.clone(),
        _ => Value::Object(object.clone()),
    };
    Some(RawMessage::GameState {
        game_id,
        kind: kind.to_string(),
        payload,
    })
}

fn classify_custom(object: &Map<String, Value>) -> Option<RawMessage> {
    let kind = scalar_field(object, "type")?;
    Some(RawMessage::Custom {
        kind,
        raw: object.clone(),
    })
}
