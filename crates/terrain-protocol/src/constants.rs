/// Hierarchy separator inside topics and patterns.
pub const TOPIC_SEPARATOR: char = '/';

/// Matches exactly one topic segment. Only valid in subscription patterns.
pub const WILDCARD_SINGLE: &str = "+";

/// Matches the remaining topic suffix. Only valid in subscription patterns.
pub const WILDCARD_MULTI: &str = "#";

/// Namespace for dashboard-level topics.
pub const TERRAIN_PREFIX: &str = "terrain";

/// Namespace for game-engine topics.
pub const GAME_PREFIX: &str = "pja/game";

/// Namespace for messages that only carried a `type`.
pub const CUSTOM_PREFIX: &str = "custom/unknown";

/// `source` prefix used by game frames in the older message format.
pub const GAME_SOURCE_PREFIX: &str = "pja-";

/// `source` value the parent window used before topics existed.
pub const TERRAIN_SOURCE: &str = "terrain";

/// `type` prefixes emitted by the game engine without any envelope.
pub const GAME_TYPE_PREFIXES: &[&str] = &["game_", "player_", "state_", "input_"];

/// Trace identity given to messages that came from the parent window.
pub const PARENT_IDENTITY: &str = "parent";

/// Fallback game id when a game message does not name one.
pub const UNKNOWN_GAME_ID: &str = "unknown";

/// Fallback game id for engine messages without a `gameId`.
pub const DEFAULT_GAME_ID: &str = "game";

/// Fallback source for messages with no recognizable origin.
pub const UNKNOWN_SOURCE: &str = "unknown";
