use crate::error::AudioError;

/// Samples per analysis window for `hop_ms` at `sample_rate` (at least 1).
pub fn hop_samples(sample_rate: u32, hop_ms: u32) -> usize {
    ((sample_rate as u64 * hop_ms as u64) / 1000).max(1) as usize
}

/// Root-mean-square level of each consecutive window.
///
/// The last window may be shorter than the rest.
pub fn rms_envelope(
    samples: &[f32],
    sample_rate: u32,
    hop_ms: u32,
) -> Result<Vec<f32>, AudioError> {
    if sample_rate == 0 {
        return Err(AudioError::InvalidSampleRate(sample_rate));
    }
    let window = hop_samples(sample_rate, hop_ms);
    Ok(samples.chunks(window).map(window_rms).collect())
}

fn window_rms(window: &[f32]) -> f32 {
    let sum: f64 = window.iter().map(|&s| s as f64 * s as f64).sum();
    (sum / window.len() as f64).sqrt() as f32
}
