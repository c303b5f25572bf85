//! One guest instance bound to one surface.
//!
//! A [`Session`] owns the wasmtime store (and with it every table), the surface,
//! the graphics context and the file fetcher for as long as it lives. The embedder
//! drives it from a single thread:
//!
//! - [`Session::tick`] once per frame callback from the surface,
//! - [`Session::dispatch`] for every surface event,
//! - [`Session::pump_completions`] or [`Session::wait_completions`] whenever
//!   background work may have finished.
//!
//! [`Session::teardown`] hands the backends back. Because it consumes the session,
//! a surface cannot be re-bound until the previous session is gone.

use std::time::Duration;

use anyhow::Context;
use thiserror::Error;
use wasmtime::{Instance, Store, TypedFunc, Val, WasmParams};

use crate::abi::{GuestEntrypoints, MEMORY_EXPORT, MissingExport};
use crate::av::AudioEngine;
use crate::config::SessionConfig;
use crate::fs::{FileFetcher, FileStore};
use crate::gl::{GlBridge, GraphicsContext};
use crate::input::{EventRouter, GuestCall, RoutedEvent, SurfaceEvent};
use crate::loader::LoadError;
use crate::memory::GuestMemory;
use crate::registry::HandleRegistry;
use crate::runtime::WasmtimeRuntime;
use crate::state::{Completion, CompletionQueue, HostState, Liveness, completion_channel};
use crate::surface::Surface;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to instantiate guest module")]
    Instantiate(#[source] wasmtime::Error),

    #[error(transparent)]
    MissingExport(#[from] MissingExport),
}

/// Everything the embedder lends a session.
pub struct HostBackends {
    pub surface: Box<dyn Surface>,
    pub graphics: Box<dyn GraphicsContext>,
    pub fetcher: Box<dyn FileFetcher>,
}

/// Invalidates the liveness token however the session goes away.
struct LivenessGuard(Liveness);

impl Drop for LivenessGuard {
    fn drop(&mut self) {
        self.0.invalidate();
    }
}

pub struct Session {
    runtime: WasmtimeRuntime,
    instance: Instance,
    entrypoints: GuestEntrypoints,
    queue: CompletionQueue,
    liveness: LivenessGuard,
}

impl Session {
    /// Compile, link and instantiate `module_bytes` (binary or WAT), then run the
    /// guest's `main` export if it has one.
    pub fn new(
        module_bytes: &[u8],
        backends: HostBackends,
        config: SessionConfig,
    ) -> anyhow::Result<Self> {
        let liveness = Liveness::new();
        let (completions, queue) = completion_channel(liveness.clone());
        let HostBackends {
            surface,
            graphics,
            fetcher,
        } = backends;
        let state = HostState::new(config, surface, graphics, fetcher, completions);

        let mut runtime = WasmtimeRuntime::new(state)?;
        runtime.define_imports()?;
        let module = runtime.compile(module_bytes).map_err(SessionError::from)?;
        let (instance, entrypoints) = runtime.instantiate(&module)?;
        tracing::info!(?config, "guest instantiated");

        let mut session = Self {
            runtime,
            instance,
            entrypoints,
            queue,
            liveness: LivenessGuard(liveness),
        };
        session.run_main()?;
        Ok(session)
    }

    /// `main` is called with zeroed arguments; its results are ignored.
    fn run_main(&mut self) -> anyhow::Result<()> {
        let Some(main) = self.entrypoints.main else {
            tracing::debug!("guest has no main export");
            return Ok(());
        };
        let store = &mut self.runtime.store;
        let ty = main.ty(&*store);
        let params = ty
            .params()
            .map(|param| {
                Val::default_for_ty(&param)
                    .with_context(|| format!("main takes a parameter of type {param} with no default"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let mut results = vec![Val::I32(0); ty.results().len()];
        main.call(&mut *store, &params, &mut results)
            .context("guest main trapped")?;
        Ok(())
    }

    /// Run the scheduled frame, if any. Returns whether `frame` was called.
    ///
    /// A trap stops the frame loop; listeners stay attached until teardown.
    pub fn tick(&mut self) -> anyhow::Result<bool> {
        self.pump_completions()?;
        if self.runtime.state().router.pending_frame().is_none() {
            return Ok(false);
        }

        let result = self.entrypoints.frame.call(&mut self.runtime.store, ());
        let HostState {
            router, surface, ..
        } = self.runtime.state_mut();
        match result {
            Ok(()) => {
                router.frame_done(surface.as_mut());
                Ok(true)
            }
            Err(trap) => {
                router.stop_frames(surface.as_mut());
                tracing::error!("frame trapped, animation loop stopped: {trap:?}");
                Err(anyhow::Error::from(trap).context("guest frame trapped"))
            }
        }
    }

    /// Route one surface event and deliver the resulting guest calls in order.
    pub fn dispatch(&mut self, event: &SurfaceEvent) -> anyhow::Result<RoutedEvent> {
        let HostState {
            router,
            surface,
            clipboard,
            ..
        } = self.runtime.state_mut();
        let routed = router.route(surface.as_mut(), event, clipboard.as_deref());
        for call in &routed.calls {
            self.deliver(call)?;
        }
        Ok(routed)
    }

    fn deliver(&mut self, call: &GuestCall) -> anyhow::Result<()> {
        let e = &self.entrypoints;
        let store = &mut self.runtime.store;
        match call {
            GuestCall::Resize { width, height } => call_optional(store, &e.resize, (*width, *height)),
            GuestCall::MouseMove { x, y } => call_optional(store, &e.mouse_move, (*x, *y)),
            GuestCall::RawMouseMove { dx, dy } => call_optional(store, &e.raw_mouse_move, (*dx, *dy)),
            GuestCall::MouseDown { x, y, button } => {
                call_optional(store, &e.mouse_down, (*x, *y, *button))
            }
            GuestCall::MouseUp { x, y, button } => call_optional(store, &e.mouse_up, (*x, *y, *button)),
            GuestCall::MouseWheel { dx, dy } => call_optional(store, &e.mouse_wheel, (*dx, *dy)),
            GuestCall::KeyDown {
                key,
                modifiers,
                repeat,
            } => call_optional(store, &e.key_down, (*key, *modifiers, i32::from(*repeat))),
            GuestCall::KeyUp { key, modifiers } => call_optional(store, &e.key_up, (*key, *modifiers)),
            GuestCall::KeyPress { key } => call_optional(store, &e.key_press, *key),
            GuestCall::Touch { phase, id, x, y } => call_optional(store, &e.touch, (*phase, *id, *x, *y)),
            GuestCall::Focus(focused) => call_optional(store, &e.focus, i32::from(*focused)),
            GuestCall::ClipboardPaste(text) => {
                let Some(paste) = &e.on_clipboard_paste else {
                    return Ok(());
                };
                let Some((ptr, len)) = copy_into_guest(store, &self.instance, e, text.as_bytes())? else {
                    return Ok(());
                };
                paste.call(&mut *store, (ptr, len))?;
                Ok(())
            }
            GuestCall::FilesDroppedStart => call_optional(store, &e.on_files_dropped_start, ()),
            GuestCall::FileDropped { name, data } => {
                let Some(dropped) = &e.on_file_dropped else {
                    return Ok(());
                };
                let Some((name_ptr, name_len)) = copy_into_guest(store, &self.instance, e, name.as_bytes())? else {
                    return Ok(());
                };
                let Some((data_ptr, data_len)) = copy_into_guest(store, &self.instance, e, data)? else {
                    return Ok(());
                };
                dropped.call(&mut *store, (name_ptr, name_len, data_ptr, data_len))?;
                Ok(())
            }
            GuestCall::FilesDroppedFinish => call_optional(store, &e.on_files_dropped_finish, ()),
        }
    }

    /// Apply every completion that has arrived. Returns how many were applied.
    ///
    /// A guest trap in `file_loaded` does not stop the batch; every completion is
    /// still applied and the first error is returned afterwards.
    pub fn pump_completions(&mut self) -> anyhow::Result<usize> {
        let pending = self.queue.drain();
        self.apply_all(pending)
    }

    /// Block up to `timeout` for one completion, apply it, then drain the rest.
    pub fn wait_completions(&mut self, timeout: Duration) -> anyhow::Result<usize> {
        let Some(first) = self.queue.wait(timeout) else {
            return Ok(0);
        };
        let pending = std::iter::once(first).chain(self.queue.drain()).collect();
        self.apply_all(pending)
    }

    fn apply_all(&mut self, pending: Vec<Completion>) -> anyhow::Result<usize> {
        let mut applied = 0;
        let mut first_error = None;
        for completion in pending {
            match self.apply(completion) {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(err) => {
                    applied += 1;
                    tracing::error!("completion callback failed: {err:#}");
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(applied),
        }
    }

    fn apply(&mut self, completion: Completion) -> anyhow::Result<bool> {
        if !self.liveness.0.is_alive() {
            return Ok(false);
        }
        match completion {
            Completion::FileFetched { file_id, result } => {
                if !self.runtime.state_mut().files.complete(file_id, result) {
                    tracing::warn!(file_id, "fetch completion for an unknown file");
                    return Ok(false);
                }
                call_optional(&mut self.runtime.store, &self.entrypoints.file_loaded, file_id)?;
            }
            Completion::SoundDecoded { sound_key, result } => {
                self.runtime.state_mut().audio.finish_decode(sound_key, result);
            }
        }
        Ok(true)
    }

    /// Invalidate the session, detach it from the surface, release every native
    /// object, and give the backends back.
    pub fn teardown(self) -> HostBackends {
        let Self {
            runtime, liveness, ..
        } = self;
        liveness.0.invalidate();

        let mut state = runtime.into_state();
        state.router.teardown(state.surface.as_mut());
        state.clear_tables();
        tracing::info!("session torn down");

        let HostState {
            gl,
            surface,
            fetcher,
            ..
        } = state;
        HostBackends {
            surface,
            graphics: gl.into_context(),
            fetcher,
        }
    }

    pub fn is_running(&self) -> bool {
        self.runtime.state().router.is_running()
    }

    pub fn gl(&self) -> &GlBridge {
        &self.runtime.state().gl
    }

    pub fn gl_mut(&mut self) -> &mut GlBridge {
        &mut self.runtime.state_mut().gl
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.runtime.state().registry
    }

    pub fn audio(&self) -> &AudioEngine {
        &self.runtime.state().audio
    }

    /// Mixer access for the embedder's audio callback.
    pub fn audio_mut(&mut self) -> &mut AudioEngine {
        &mut self.runtime.state_mut().audio
    }

    pub fn files(&self) -> &FileStore {
        &self.runtime.state().files
    }

    pub fn router(&self) -> &EventRouter {
        &self.runtime.state().router
    }

    pub fn surface(&self) -> &dyn Surface {
        self.runtime.state().surface.as_ref()
    }

    /// Text the guest last offered through `sapp_set_clipboard`.
    pub fn clipboard(&self) -> Option<&str> {
        self.runtime.state().clipboard.as_deref()
    }

    /// Run `f` over a fresh view of guest memory.
    pub fn with_guest_memory<R>(&mut self, f: impl FnOnce(&mut GuestMemory<'_>) -> R) -> Option<R> {
        let memory = self
            .instance
            .get_memory(&mut self.runtime.store, MEMORY_EXPORT)?;
        let mut mem = GuestMemory::new(memory.data_mut(&mut self.runtime.store));
        Some(f(&mut mem))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.runtime.state().config
    }
}

fn call_optional<P: WasmParams>(
    store: &mut Store<HostState>,
    func: &Option<TypedFunc<P, ()>>,
    params: P,
) -> anyhow::Result<()> {
    match func {
        Some(func) => Ok(func.call(store, params)?),
        None => Ok(()),
    }
}

/// Copy `bytes` into a fresh guest allocation. `None` when the guest cannot allocate.
fn copy_into_guest(
    store: &mut Store<HostState>,
    instance: &Instance,
    entrypoints: &GuestEntrypoints,
    bytes: &[u8],
) -> anyhow::Result<Option<(u32, u32)>> {
    let Some(allocate) = &entrypoints.allocate_vec_u8 else {
        tracing::warn!("guest does not export allocate_vec_u8; payload dropped");
        return Ok(None);
    };
    let len = u32::try_from(bytes.len()).context("payload does not fit in guest memory")?;
    let ptr = allocate.call(&mut *store, len)?;
    let memory = instance
        .get_memory(&mut *store, MEMORY_EXPORT)
        .ok_or(MissingExport {
            name: MEMORY_EXPORT,
            source: None,
        })?;
    GuestMemory::new(memory.data_mut(&mut *store)).write_bytes(ptr, bytes)?;
    Ok(Some((ptr, len)))
}
