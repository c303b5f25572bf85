//! Sound cache and playback pool.
//!
//! Sounds live under keys handed out synchronously by `add_buffer`; the decode
//! itself runs on a worker thread and lands later through the session's completion
//! channel (`finish_decode`). Playbacks run in a pool of reusable slots: a slot
//! whose `sound_key` is 0 is free and is reused before the pool grows. Every `play`
//! issues a fresh playback key even when it recycles a slot.
//!
//! `render` mixes every active slot into interleaved stereo i16 at the output rate.

use std::collections::HashMap;
use std::sync::Arc;

use super::decode::{AudioError, DecodedSound, decode_wav};
use super::utils::{apply_gain, sat_add_i16};
use crate::state::{Completion, CompletionSender};

#[derive(Clone, Debug)]
enum SoundEntry {
    Pending,
    Loaded(Arc<DecodedSound>),
    Failed,
}

#[derive(Clone, Debug, Default)]
struct PlaybackSlot {
    /// 0 when the slot is free.
    sound_key: u32,
    playback_key: u32,
    volume: f32,
    looping: bool,
    /// Read position in source frames.
    position: f64,
    sound: Option<Arc<DecodedSound>>,
}

impl PlaybackSlot {
    fn is_free(&self) -> bool {
        self.sound_key == 0
    }

    fn stop(&mut self) {
        self.sound_key = 0;
        self.playback_key = 0;
        self.sound = None;
        self.position = 0.0;
    }
}

#[derive(Debug)]
pub struct AudioEngine {
    ready: bool,
    output_rate: u32,
    next_sound_key: u32,
    next_playback_key: u32,
    sounds: HashMap<u32, SoundEntry>,
    slots: Vec<PlaybackSlot>,
}

impl AudioEngine {
    pub fn new(output_rate: u32) -> Self {
        Self {
            ready: false,
            output_rate: output_rate.max(1),
            next_sound_key: 1,
            next_playback_key: 1,
            sounds: HashMap::new(),
            slots: Vec::new(),
        }
    }

    /// `audio_init`. Idempotent.
    pub fn init(&mut self) {
        if !self.ready {
            tracing::debug!(rate = self.output_rate, "audio output ready");
            self.ready = true;
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Reserve a key for `bytes` and decode them on a worker thread.
    pub fn add_buffer(&mut self, bytes: Vec<u8>, completions: &CompletionSender) -> u32 {
        let sound_key = self.reserve_sound();
        let completions = completions.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("decode-sound-{sound_key}"))
            .spawn(move || {
                let result = decode_wav(&bytes);
                completions.send(Completion::SoundDecoded { sound_key, result });
            });
        if let Err(err) = spawned {
            tracing::error!(sound_key, "failed to spawn decoder thread: {err}");
            self.sounds.insert(sound_key, SoundEntry::Failed);
        }
        sound_key
    }

    /// Decode on the calling thread. Used where no worker is wanted (tests, tools).
    pub fn add_buffer_blocking(&mut self, bytes: &[u8]) -> u32 {
        let sound_key = self.reserve_sound();
        self.finish_decode(sound_key, decode_wav(bytes));
        sound_key
    }

    fn reserve_sound(&mut self) -> u32 {
        let sound_key = self.next_sound_key;
        self.next_sound_key = self.next_sound_key.wrapping_add(1).max(1);
        self.sounds.insert(sound_key, SoundEntry::Pending);
        sound_key
    }

    /// Apply a decode outcome. Outcomes for deleted or already settled sounds are ignored.
    pub fn finish_decode(&mut self, sound_key: u32, result: Result<DecodedSound, AudioError>) {
        let Some(entry) = self.sounds.get_mut(&sound_key) else {
            tracing::debug!(sound_key, "decode finished for a deleted sound");
            return;
        };
        if !matches!(entry, SoundEntry::Pending) {
            return;
        }
        *entry = match result {
            Ok(sound) => {
                tracing::debug!(
                    sound_key,
                    frames = sound.frames(),
                    rate = sound.sample_rate,
                    "sound decoded"
                );
                SoundEntry::Loaded(Arc::new(sound))
            }
            Err(err) => {
                tracing::error!(sound_key, "Failed to decode audio buffer: {err}");
                SoundEntry::Failed
            }
        };
    }

    pub fn is_loaded(&self, sound_key: u32) -> bool {
        matches!(self.sounds.get(&sound_key), Some(SoundEntry::Loaded(_)))
    }

    pub fn is_failed(&self, sound_key: u32) -> bool {
        matches!(self.sounds.get(&sound_key), Some(SoundEntry::Failed))
    }

    fn recycle_slot(&mut self) -> &mut PlaybackSlot {
        let index = match self.slots.iter().position(PlaybackSlot::is_free) {
            Some(index) => index,
            None => {
                self.slots.push(PlaybackSlot::default());
                self.slots.len() - 1
            }
        };
        &mut self.slots[index]
    }

    /// Start `sound_key` and return a fresh playback key.
    ///
    /// A sound that is not loaded yet still occupies a slot; it produces silence
    /// and ends on the next render. Key 0 names no sound and returns playback key 0
    /// without taking a slot.
    pub fn play(&mut self, sound_key: u32, volume: f32, looping: bool) -> u32 {
        if sound_key == 0 {
            tracing::warn!("play called with sound key 0");
            return 0;
        }
        let playback_key = self.next_playback_key;
        self.next_playback_key = self.next_playback_key.wrapping_add(1).max(1);

        let sound = match self.sounds.get(&sound_key) {
            Some(SoundEntry::Loaded(sound)) => Some(Arc::clone(sound)),
            _ => {
                tracing::warn!(sound_key, "playing a sound that is not loaded");
                None
            }
        };

        let slot = self.recycle_slot();
        slot.sound_key = sound_key;
        slot.playback_key = playback_key;
        slot.volume = volume;
        slot.looping = looping;
        slot.position = 0.0;
        slot.sound = sound;
        playback_key
    }

    /// Set the gain of every playback of `sound_key`.
    pub fn set_sound_volume(&mut self, sound_key: u32, volume: f32) {
        if sound_key == 0 {
            return;
        }
        for slot in self.slots.iter_mut().filter(|s| s.sound_key == sound_key) {
            slot.volume = volume;
        }
    }

    /// Stop every playback of `sound_key`.
    pub fn stop_sound(&mut self, sound_key: u32) {
        if sound_key == 0 {
            return;
        }
        for slot in self.slots.iter_mut().filter(|s| s.sound_key == sound_key) {
            slot.stop();
        }
    }

    /// Stop every playback of `sound_key`, then forget the sound.
    pub fn delete_sound(&mut self, sound_key: u32) {
        self.stop_sound(sound_key);
        self.sounds.remove(&sound_key);
    }

    pub fn stop_playback(&mut self, playback_key: u32) {
        if playback_key == 0 {
            return;
        }
        if let Some(slot) = self.slots.iter_mut().find(|s| s.playback_key == playback_key) {
            slot.stop();
        }
    }

    pub fn set_playback_volume(&mut self, playback_key: u32, volume: f32) {
        if playback_key == 0 {
            return;
        }
        if let Some(slot) = self.slots.iter_mut().find(|s| s.playback_key == playback_key) {
            slot.volume = volume;
        }
    }

    /// Whether `playback_key` is still playing.
    pub fn is_playing(&self, playback_key: u32) -> bool {
        playback_key != 0 && self.slots.iter().any(|s| s.playback_key == playback_key)
    }

    /// Size of the pool, free slots included.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_free()).count()
    }

    /// Stop everything and forget every sound. Keys keep counting.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.stop();
        }
        self.sounds.clear();
    }

    /// Mix every active playback into `out` (interleaved stereo, added on top).
    ///
    /// Slots that reach the end of a non-looping sound are freed.
    pub fn render(&mut self, out: &mut [i16]) {
        let output_rate = f64::from(self.output_rate);
        for slot in self.slots.iter_mut().filter(|s| !s.is_free()) {
            let Some(sound) = slot.sound.clone() else {
                slot.stop();
                continue;
            };
            let frames = sound.frames();
            if frames == 0 {
                slot.stop();
                continue;
            }
            let step = f64::from(sound.sample_rate) / output_rate;

            for frame in out.chunks_exact_mut(2) {
                let mut index = slot.position as usize;
                if index >= frames {
                    if !slot.looping {
                        slot.stop();
                        break;
                    }
                    slot.position %= frames as f64;
                    index = slot.position as usize;
                }
                let l = apply_gain(sound.pcm_stereo[index * 2], slot.volume);
                let r = apply_gain(sound.pcm_stereo[index * 2 + 1], slot.volume);
                frame[0] = sat_add_i16(frame[0], l);
                frame[1] = sat_add_i16(frame[1], r);
                slot.position += step;
            }

            // A sound that ended exactly on the buffer edge is freed now.
            if !slot.is_free() && !slot.looping && slot.position as usize >= frames {
                slot.stop();
            }
        }
    }
}
