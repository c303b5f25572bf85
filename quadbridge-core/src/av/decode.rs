//! Sound decoding.
//!
//! Encoded sound bytes (WAV, PCM 8/16/24/32-bit integer or 32-bit float, mono or
//! stereo) are decoded into interleaved stereo i16 at the file's own sample rate.
//! The mixer resamples on the fly.

use std::io::Cursor;

use hound::SampleFormat;
use thiserror::Error;

use super::utils::to_i16;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to decode audio buffer: {0}")]
    Decode(#[from] hound::Error),

    #[error("unsupported channel count {0}")]
    UnsupportedChannels(u16),
}

/// Decoded PCM ready for mixing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedSound {
    pub sample_rate: u32,
    /// Interleaved L/R.
    pub pcm_stereo: Vec<i16>,
}

impl DecodedSound {
    /// Number of stereo frames.
    pub fn frames(&self) -> usize {
        self.pcm_stereo.len() / 2
    }
}

pub fn decode_wav(bytes: &[u8]) -> Result<DecodedSound, AudioError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    if !matches!(spec.channels, 1 | 2) {
        return Err(AudioError::UnsupportedChannels(spec.channels));
    }

    // Collect samples as i16, converting from the stored format.
    let samples: Vec<i16> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| to_i16(v, bits)))
                .collect::<Result<_, _>>()?
        }
    };

    // Mono: duplicate to stereo.
    let pcm_stereo = if spec.channels == 1 {
        samples.into_iter().flat_map(|s| [s, s]).collect()
    } else {
        samples
    };

    Ok(DecodedSound {
        sample_rate: spec.sample_rate,
        pcm_stereo,
    })
}
