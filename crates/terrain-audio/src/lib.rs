//! Terrain Audio - waveform analysis and onset editing
//!
//! Decodes WAV recordings to mono PCM, computes a windowed RMS envelope,
//! segments it into voice-active regions and provides the onset editor
//! the recording panels use to split a take into chunks.

pub mod analyzer;
pub mod decode;
pub mod error;
pub mod onset;
pub mod rms;
pub mod vad;

pub use analyzer::{
    column_peaks, Analysis, AnalyzerConfig, AudioAnalysis, WaveformAnalyzer, WaveformState,
};
pub use decode::{decode_wav, decode_wav_reader, PcmBuffer};
pub use error::AudioError;
pub use onset::{onsets_to_chunks, OnsetEditor, PointerAction, Viewport, DEFAULT_SNAP_RADIUS_PX};
pub use rms::{hop_samples, rms_envelope};
pub use vad::{detect_segments, Segment, VadConfig};
