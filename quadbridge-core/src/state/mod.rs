//! Per-session host state.
//!
//! `HostState` is the `wasmtime::Store` data: every table the imports touch is
//! owned here by composition, one instance per session. Nothing is global.
//!
//! Work that finishes off the guest's thread (file fetches, sound decodes) comes
//! back as a [`Completion`] over an mpsc channel. Senders carry the session's
//! [`Liveness`] token and drop completions once it is invalidated; the session
//! checks the token again before applying anything it drains.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use crate::av::{AudioEngine, AudioError, DecodedSound};
use crate::config::SessionConfig;
use crate::fs::{FetchError, FileFetcher, FileStore};
use crate::gl::{GlBridge, GraphicsContext};
use crate::input::EventRouter;
use crate::registry::HandleRegistry;
use crate::surface::Surface;

/// Shared flag that is true until the session is torn down.
#[derive(Clone, Debug)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn invalidate(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of asynchronous work, delivered back to the session thread.
#[derive(Debug)]
pub enum Completion {
    FileFetched {
        file_id: u32,
        result: Result<Vec<u8>, FetchError>,
    },
    SoundDecoded {
        sound_key: u32,
        result: Result<DecodedSound, AudioError>,
    },
}

#[derive(Clone, Debug)]
pub struct CompletionSender {
    tx: mpsc::Sender<Completion>,
    liveness: Liveness,
}

impl CompletionSender {
    /// Send unless the session is gone. Returns whether the completion was queued.
    pub fn send(&self, completion: Completion) -> bool {
        if !self.liveness.is_alive() {
            tracing::debug!("session torn down; completion dropped");
            return false;
        }
        self.tx.send(completion).is_ok()
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }
}

#[derive(Debug)]
pub struct CompletionQueue {
    rx: mpsc::Receiver<Completion>,
}

impl CompletionQueue {
    /// Everything that has arrived so far, without blocking.
    pub fn drain(&self) -> Vec<Completion> {
        self.rx.try_iter().collect()
    }

    /// Block for the next completion. `None` on timeout or when every sender is gone.
    pub fn wait(&self, timeout: Duration) -> Option<Completion> {
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => Some(completion),
            Err(mpsc::RecvTimeoutError::Timeout | mpsc::RecvTimeoutError::Disconnected) => None,
        }
    }
}

pub fn completion_channel(liveness: Liveness) -> (CompletionSender, CompletionQueue) {
    let (tx, rx) = mpsc::channel();
    (CompletionSender { tx, liveness }, CompletionQueue { rx })
}

/// Store data for one session.
pub struct HostState {
    pub config: SessionConfig,
    pub registry: HandleRegistry,
    pub gl: GlBridge,
    pub audio: AudioEngine,
    pub files: FileStore,
    pub router: EventRouter,
    pub surface: Box<dyn Surface>,
    pub fetcher: Box<dyn FileFetcher>,
    /// Text offered to the platform on copy/cut (`sapp_set_clipboard`).
    pub clipboard: Option<String>,
    pub completions: CompletionSender,
    pub liveness: Liveness,
}

impl HostState {
    pub fn new(
        config: SessionConfig,
        surface: Box<dyn Surface>,
        graphics: Box<dyn GraphicsContext>,
        fetcher: Box<dyn FileFetcher>,
        completions: CompletionSender,
    ) -> Self {
        let liveness = completions.liveness().clone();
        Self {
            registry: HandleRegistry::new(),
            gl: GlBridge::new(graphics, config.shader_compat),
            audio: AudioEngine::new(config.audio_sample_rate),
            files: FileStore::new(),
            router: EventRouter::new(config.high_dpi),
            surface,
            fetcher,
            clipboard: None,
            completions,
            liveness,
            config,
        }
    }

    /// Drop every table entry and native object. The surface and fetcher stay.
    pub fn clear_tables(&mut self) {
        self.gl.release_all();
        self.registry.clear();
        self.audio.clear();
        self.files.clear();
        self.clipboard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidation_is_shared_by_clones() {
        let liveness = Liveness::new();
        let other = liveness.clone();
        assert!(other.is_alive());
        liveness.invalidate();
        assert!(!other.is_alive());
    }

    #[test]
    fn drain_returns_queued_completions_in_order() {
        let (tx, queue) = completion_channel(Liveness::new());
        for file_id in 0..3 {
            assert!(tx.send(Completion::FileFetched {
                file_id,
                result: Ok(Vec::new()),
            }));
        }
        let ids: Vec<u32> = queue
            .drain()
            .into_iter()
            .map(|c| match c {
                Completion::FileFetched { file_id, .. } => file_id,
                Completion::SoundDecoded { sound_key, .. } => sound_key,
            })
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn wait_times_out_while_senders_live() {
        let (_tx, queue) = completion_channel(Liveness::new());
        assert!(queue.wait(Duration::from_millis(10)).is_none());
    }
}
