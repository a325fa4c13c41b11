use thiserror::Error;

/// Errors raised while building or decoding packets.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: &'static str },

    #[error("Unknown packet type: {0}")]
    UnknownPacketType(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
