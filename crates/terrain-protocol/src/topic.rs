//! Hierarchical topic matching and the canonical topic namespaces.
//!
//! Matching follows MQTT semantics:
//! - `#` matches the rest of the topic (any number of segments, including none)
//! - `+` matches exactly one segment
//! - any other segment must be equal
//!
//! Wildcards are only meaningful in subscription patterns. Packet topics
//! carrying them are rejected by [`validate_topic`].

use crate::constants::*;
use crate::error::ProtocolError;

/// Returns true if `topic` is matched by the subscription `pattern`.
pub fn matches(topic: &str, pattern: &str) -> bool {
    if pattern == WILDCARD_MULTI || topic == pattern {
        return true;
    }

    let mut topic_segments = topic.split(TOPIC_SEPARATOR);
    for segment in pattern.split(TOPIC_SEPARATOR) {
        match segment {
            WILDCARD_MULTI => return true,
            WILDCARD_SINGLE => {
                if topic_segments.next().is_none() {
                    return false;
                }
            }
            literal => {
                if topic_segments.next() != Some(literal) {
                    return false;
                }
            }
        }
    }

    // Pattern consumed without `#`: segment counts must agree.
    topic_segments.next().is_none()
}

/// Check that a concrete (non-pattern) topic is well formed.
pub fn validate_topic(topic: &str) -> Result<(), ProtocolError> {
    if topic.is_empty() {
        return Err(invalid(topic, "topic is empty"));
    }
    for segment in topic.split(TOPIC_SEPARATOR) {
        if segment.is_empty() {
            return Err(invalid(topic, "empty segment"));
        }
        if segment == WILDCARD_SINGLE || segment == WILDCARD_MULTI {
            return Err(invalid(topic, "wildcards are only valid in patterns"));
        }
    }
    Ok(())
}

fn invalid(topic: &str, reason: &'static str) -> ProtocolError {
    ProtocolError::InvalidTopic {
        topic: topic.to_string(),
        reason,
    }
}

/// Builders for the topic namespaces used across the dashboard.
pub struct TerrainTopics;

impl TerrainTopics {
    /// Org/env selection broadcast by the top-level frame.
    pub fn env(org: &str, env: &str) -> String {
        format!("{}/env/{}/{}", TERRAIN_PREFIX, org, env)
    }

    /// Event raised by a named panel.
    pub fn panel(from: &str, kind: &str) -> String {
        format!("{}/panel/{}/{}", TERRAIN_PREFIX, from, kind)
    }

    /// System message from the parent window.
    pub fn system(kind: &str) -> String {
        format!("{}/system/{}", TERRAIN_PREFIX, kind)
    }

    /// Message scoped to one game instance.
    pub fn game(game_id: &str, kind: &str) -> String {
        format!("{}/{}/{}", GAME_PREFIX, game_id, kind)
    }

    /// Catch-all for messages that only carried a type.
    pub fn custom(kind: &str) -> String {
        format!("{}/{}", CUSTOM_PREFIX, kind)
    }

    /// Pattern matching everything a panel emits.
    pub fn panel_pattern(from: &str) -> String {
        format!("{}/panel/{}/{}", TERRAIN_PREFIX, from, WILDCARD_MULTI)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_wildcard_matches_everything() {
        for topic in ["a", "a/b", "terrain/env/acme/dev"] {
            assert!(matches(topic, "#"), "{topic}");
        }
    }

    #[test]
    fn test_exact_match() {
        assert!(matches("a/b/c", "a/b/c"));
        assert!(!matches("a/b/c", "a/b/d"));
    }

    #[test]
    fn test_single_wildcard() {
        assert!(matches("a/b/c", "a/+/c"));
        assert!(!matches("a/b", "a/+/c"));
        assert!(!matches("a/b/c/d", "a/+/c"));
        assert!(matches("a/b", "+/+"));
        assert!(!matches("a", "a/+"));
    }

    #[test]
    fn test_trailing_multi_wildcard() {
        assert!(matches("a/b/c/d", "a/#"));
        assert!(matches("a", "a/#"));
        assert!(!matches("b/c", "a/#"));
        assert!(matches("a/b/c", "a/+/#"));
    }

    #[test]
    fn test_segment_count_must_agree_without_multi() {
        assert!(!matches("a/b/c", "a/b"));
        assert!(!matches("a/b", "a/b/c"));
    }

    #[test]
    fn test_validate_topic() {
        assert!(validate_topic("terrain/env/acme/dev").is_ok());
        assert!(validate_topic("").is_err());
        assert!(validate_topic("a//b").is_err());
        assert!(validate_topic("a/+/b").is_err());
        assert!(validate_topic("a/#").is_err());
    }

    #[test]
    fn test_namespaced_topics() {
        assert_eq!(TerrainTopics::env("acme", "dev"), "terrain/env/acme/dev");
        assert_eq!(TerrainTopics::panel("tsm", "refresh"), "terrain/panel/tsm/refresh");
        assert_eq!(TerrainTopics::system("env_change"), "terrain/system/env_change");
        assert_eq!(TerrainTopics::game("g1", "score"), "pja/game/g1/score");
        assert_eq!(TerrainTopics::custom("ping"), "custom/unknown/ping");
        assert!(matches(
            &TerrainTopics::panel("tsm", "refresh"),
            &TerrainTopics::panel_pattern("tsm")
        ));
    }
}
