//! WAV decoding to mono `f32` PCM.

use std::io::Read;
use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::error::AudioError;

/// Mono samples in `[-1, 1]` plus their rate.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

pub fn decode_wav(path: impl AsRef<Path>) -> Result<PcmBuffer, AudioError> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let pcm = decode(reader)?;
    tracing::debug!(
        path = %path.display(),
        sample_rate = pcm.sample_rate,
        duration = pcm.duration(),
        "Decoded WAV"
    );
    Ok(pcm)
}

pub fn decode_wav_reader<R: Read>(reader: R) -> Result<PcmBuffer, AudioError> {
    decode(WavReader::new(reader)?)
}

fn decode<R: Read>(mut reader: WavReader<R>) -> Result<PcmBuffer, AudioError> {
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(AudioError::InvalidSampleRate(0));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => {
            if spec.bits_per_sample != 32 {
                return Err(AudioError::UnsupportedFormat {
                    bits: spec.bits_per_sample,
                    format: "float",
                });
            }
            reader.samples::<f32>().collect::<Result<_, _>>()?
        }
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if bits == 0 || bits > 32 {
                return Err(AudioError::UnsupportedFormat {
                    bits,
                    format: "int",
                });
            }
            let full_scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(PcmBuffer::new(
        downmix(&interleaved, spec.channels as usize),
        spec.sample_rate,
    ))
}

/// Average interleaved frames down to one channel.
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
