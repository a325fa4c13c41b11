use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Unsupported sample format: {bits}-bit {format}")]
    UnsupportedFormat { bits: u16, format: &'static str },

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("Recording contains no samples")]
    Empty,
}
