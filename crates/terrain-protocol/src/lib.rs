//! Terrain Protocol - Core packet types and topic routing
//!
//! Implements the Terrain cross-frame message format: a canonical
//! [`Packet`] addressed by a `/`-separated topic, MQTT-style wildcard
//! matching for subscriptions, and the normalizer that folds older
//! ad hoc message shapes into packets.

pub mod constants;
pub mod error;
pub mod normalize;
pub mod packet;
pub mod topic;

pub use constants::*;
pub use error::*;
pub use normalize::{normalize, NormalizeContext, RawMessage};
pub use packet::*;
pub use topic::{matches, validate_topic, TerrainTopics};
