//! Audio for quadbridge-core.
//!
//! - `audio`: sound cache under integer keys plus the reusable playback pool.
//! - `decode`: WAV decoding into interleaved stereo i16 via `hound`.
//! - `utils`: sample arithmetic shared by the decoder and the mixer.
//!
//! Output is pulled by the embedder with `AudioEngine::render`; nothing here talks
//! to an audio device.

pub mod audio;
pub mod decode;
pub mod utils;


pub use audio::AudioEngine;
pub use decode::{AudioError, DecodedSound, decode_wav};
