//! Waveform analysis: decode, envelope, voice activity, initial onsets.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decode::{decode_wav, PcmBuffer};
use crate::error::AudioError;
use crate::onset::onsets_to_chunks;
use crate::rms::{hop_samples, rms_envelope};
use crate::vad::{detect_segments, Segment, VadConfig};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// RMS window length in milliseconds.
    pub hop_ms: u32,
    pub vad: VadConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            hop_ms: 20,
            vad: VadConfig::default(),
        }
    }
}

/// Envelope and voice-active segments of a sample buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub rms: Vec<f32>,
    pub vad: Vec<Segment>,
}

/// Everything a recording panel needs to draw and split a take.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioAnalysis {
    pub duration: f64,
    pub sample_rate: u32,
    /// Seconds covered by one `rms_envelope` entry.
    pub hop_secs: f64,
    pub rms_envelope: Vec<f32>,
    pub vad_segments: Vec<Segment>,
    /// Initial onsets: the start of every voice-active segment.
    pub onsets: Vec<f64>,
}

impl AudioAnalysis {
    pub fn chunks(&self) -> Vec<Segment> {
        onsets_to_chunks(&self.onsets, self.duration)
    }
}

/// Result of loading a recording for display.
#[derive(Debug, Clone, PartialEq)]
pub enum WaveformState {
    Ready(AudioAnalysis),
    /// Decoding failed; the panel shows `reason` instead of a waveform.
    Unavailable { reason: String },
}

impl WaveformState {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaveformState::Ready(_))
    }

    pub fn analysis(&self) -> Option<&AudioAnalysis> {
        match self {
            WaveformState::Ready(analysis) => Some(analysis),
            WaveformState::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WaveformAnalyzer {
    config: AnalyzerConfig,
}

impl WaveformAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Seconds per envelope entry at `sample_rate`.
    pub fn hop_secs(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        hop_samples(sample_rate, self.config.hop_ms) as f64 / sample_rate as f64
    }

    pub fn analyze(&self, samples: &[f32], sample_rate: u32) -> Result<Analysis, AudioError> {
        let rms = rms_envelope(samples, sample_rate, self.config.hop_ms)?;
        let duration = samples.len() as f64 / sample_rate as f64;
        let vad = detect_segments(&rms, self.hop_secs(sample_rate), duration, &self.config.vad);
        Ok(Analysis { rms, vad })
    }

    pub fn analyze_pcm(&self, pcm: &PcmBuffer) -> Result<AudioAnalysis, AudioError> {
        if pcm.samples.is_empty() {
            return Err(AudioError::Empty);
        }
        let Analysis { rms, vad } = self.analyze(&pcm.samples, pcm.sample_rate)?;
        let onsets = vad.iter().map(|segment| segment.start).collect();

        Ok(AudioAnalysis {
            duration: pcm.duration(),
            sample_rate: pcm.sample_rate,
            hop_secs: self.hop_secs(pcm.sample_rate),
            rms_envelope: rms,
            vad_segments: vad,
            onsets,
        })
    }

    /// Decode and analyze a WAV file. Failures become
    /// [`WaveformState::Unavailable`].
    pub fn load(&self, path: impl AsRef<Path>) -> WaveformState {
        let path = path.as_ref();
        match decode_wav(path).and_then(|pcm| self.analyze_pcm(&pcm)) {
            Ok(analysis) => {
                tracing::info!(
                    path = %path.display(),
                    duration = analysis.duration,
                    segments = analysis.vad_segments.len(),
                    "Waveform analyzed"
                );
                WaveformState::Ready(analysis)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Waveform unavailable");
                WaveformState::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Min/max sample per drawing column.
pub fn column_peaks(samples: &[f32], columns: usize) -> Vec<(f32, f32)> {
    let len = samples.len();
    if len == 0 || columns == 0 {
        return Vec::new();
    }

    (0..columns)
        .map(|col| {
            let start = col * len / columns;
            let end = ((col + 1) * len / columns).max(start + 1).min(len);
            samples[start..end]
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &s| {
                    (min.min(s), max.max(s))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_has_no_segments() {
        let analyzer = WaveformAnalyzer::default();
        let analysis = analyzer.analyze(&vec![0.0; 8000], 8000).unwrap();
        assert_eq!(analysis.rms.len(), 50);
        assert!(analysis.vad.is_empty());
    }

    #[test]
    fn test_burst_produces_onset() {
        // 1 s at 1 kHz: silence, 0.4 s burst from 0.3 s, silence
        let mut samples = vec![0.0f32; 1000];
        for s in &mut samples[300..700] {
            *s = 0.5;
        }
        let analysis = WaveformAnalyzer::default()
            .analyze_pcm(&PcmBuffer::new(samples, 1000))
            .unwrap();

        assert_eq!(analysis.vad_segments.len(), 1);
        let segment = analysis.vad_segments[0];
        assert!((segment.start - 0.25).abs() < 1e-9);
        assert!((segment.end - 0.75).abs() < 1e-9);
        assert_eq!(analysis.onsets, vec![segment.start]);
        assert_eq!(analysis.chunks(), vec![Segment::new(segment.start, 1.0)]);
    }

    #[test]
    fn test_empty_pcm_rejected() {
        let result = WaveformAnalyzer::default().analyze_pcm(&PcmBuffer::new(Vec::new(), 8000));
        assert!(matches!(result, Err(AudioError::Empty)));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let state = WaveformAnalyzer::default().load("/nonexistent/take.wav");
        assert!(!state.is_ready());
        assert!(matches!(state, WaveformState::Unavailable { .. }));
    }

    #[test]
    fn test_column_peaks() {
        let samples = [0.1, -0.4, 0.9, 0.2, -0.1, 0.0];
        assert_eq!(column_peaks(&samples, 3), vec![(-0.4, 0.1), (0.2, 0.9), (-0.1, 0.0)]);
        assert_eq!(column_peaks(&samples, 12).len(), 12);
        assert!(column_peaks(&[], 4).is_empty());
    }
}
