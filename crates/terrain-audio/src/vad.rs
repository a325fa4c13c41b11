//! Energy-based voice activity detection over an RMS envelope.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// A window is active when its RMS is strictly above this.
    pub threshold: f32,
    /// Seconds added on both sides of each active run.
    pub padding: f64,
    /// Padded runs shorter than this (seconds) are discarded.
    pub min_duration: f64,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: 0.02,
            padding: 0.05,
            min_duration: 0.1,
        }
    }
}

/// A time range in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Voice-active segments of a recording, sorted and non-overlapping.
///
/// `rms[i]` covers `[i * hop_secs, (i + 1) * hop_secs)`. A run still
/// active at the final window ends at `duration`.
pub fn detect_segments(
    rms: &[f32],
    hop_secs: f64,
    duration: f64,
    config: &VadConfig,
) -> Vec<Segment> {
    if hop_secs <= 0.0 || duration <= 0.0 {
        return Vec::new();
    }

    let mut runs = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, &level) in rms.iter().enumerate() {
        let active = level > config.threshold;
        match (active, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                runs.push(Segment::new(
                    start as f64 * hop_secs,
                    (i as f64 * hop_secs).min(duration),
                ));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        runs.push(Segment::new(start as f64 * hop_secs, duration));
    }

    let candidates = runs.into_iter().filter_map(|run| {
        let padded = Segment::new(
            (run.start - config.padding).max(0.0),
            (run.end + config.padding).min(duration),
        );
        (padded.duration() >= config.min_duration).then_some(padded)
    });

    let mut merged: Vec<Segment> = Vec::new();
    for segment in candidates {
        match merged.last_mut() {
            Some(prev) if segment.start <= prev.end => prev.end = prev.end.max(segment.end),
            _ => merged.push(segment),
        }
    }

    tracing::trace!(segments = merged.len(), "Voice activity detected");
    merged
}
