use terrain_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("Frame is closed: {0}")]
    FrameClosed(String),

    #[error("Delivery to {frame} failed: {reason}")]
    Delivery { frame: String, reason: String },

    #[error("Operation requires hub mode (bus '{0}' is a leaf)")]
    NotHub(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
