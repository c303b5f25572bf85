//! Host imports outside the graphics vocabulary.
//!
//! Every import runs against the store's [`HostState`]. Guest memory is looked up
//! from the `memory` export on each call and dropped before returning, so a
//! `memory.grow` between calls can never leave a stale view behind.
//!
//! Expected misuse (bad handles, pointers past the end of memory) is logged and
//! the import returns a neutral value; only a trap raised by a re-entrant guest
//! call is propagated.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use wasmtime::{Caller, Extern, Linker, WasmParams};

use crate::abi::{IMPORT_MODULE, MEMORY_EXPORT, guest_exports, host_imports};
use crate::fs::FetchReply;
use crate::memory::GuestMemory;
use crate::registry::{HostValue, NULL_ID};
use crate::state::HostState;

/// Run `f` over a fresh view of guest memory and the host state.
///
/// Without an exported memory the import logs and yields `fallback`.
pub(crate) fn with_memory<R>(
    caller: &mut Caller<'_, HostState>,
    import: &str,
    fallback: R,
    f: impl FnOnce(&mut GuestMemory<'_>, &mut HostState) -> R,
) -> R {
    let Some(memory) = caller.get_export(MEMORY_EXPORT).and_then(Extern::into_memory) else {
        tracing::error!("{import}: guest does not export `{MEMORY_EXPORT}`");
        return fallback;
    };
    let (bytes, state) = memory.data_and_store_mut(&mut *caller);
    let mut mem = GuestMemory::new(bytes);
    f(&mut mem, state)
}

/// Call a guest export from inside an import. Missing exports are skipped.
pub(crate) fn call_guest<P: WasmParams>(
    caller: &mut Caller<'_, HostState>,
    name: &str,
    params: P,
) -> wasmtime::Result<()> {
    let Some(func) = caller.get_export(name).and_then(Extern::into_func) else {
        tracing::debug!("guest does not export `{name}`");
        return Ok(());
    };
    let typed = func.typed::<P, ()>(&*caller)?;
    typed.call(&mut *caller, params)
}

/// Define all host imports expected by guests under module `"env"`.
///
/// Must be called before instantiating the module.
pub fn define_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    define_object_imports(linker)?;
    define_console_imports(linker)?;
    define_surface_imports(linker)?;
    define_fs_imports(linker)?;
    define_audio_imports(linker)?;
    super::gl_imports::define_gl_imports(linker)?;
    Ok(())
}

fn value_bytes(value: &HostValue) -> Option<&[u8]> {
    match value {
        HostValue::Text(text) => Some(text.as_bytes()),
        HostValue::Bytes(bytes) => Some(bytes),
        _ => None,
    }
}

fn define_object_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_CREATE_STRING,
        |mut caller: Caller<'_, HostState>, ptr: u32, max_len: u32| -> i32 {
            with_memory(&mut caller, host_imports::JS_CREATE_STRING, NULL_ID, |mem, state| {
                let text = mem.read_utf8(ptr, Some(max_len as usize));
                state.registry.register(HostValue::text(text))
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_CREATE_BUFFER,
        |mut caller: Caller<'_, HostState>, ptr: u32, len: u32| -> i32 {
            with_memory(&mut caller, host_imports::JS_CREATE_BUFFER, NULL_ID, |mem, state| {
                match mem.bytes(ptr, len as usize) {
                    Ok(bytes) => state.registry.register(HostValue::bytes(bytes)),
                    Err(err) => {
                        tracing::warn!("{}: {err}", host_imports::JS_CREATE_BUFFER);
                        NULL_ID
                    }
                }
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_CREATE_OBJECT,
        |mut caller: Caller<'_, HostState>| -> i32 {
            caller.data_mut().registry.register(HostValue::object())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_SET_FIELD_F32,
        |mut caller: Caller<'_, HostState>, obj: i32, name: u32, name_len: u32, value: f32| {
            with_memory(&mut caller, host_imports::JS_SET_FIELD_F32, (), |mem, state| {
                let field = mem.read_utf8(name, Some(name_len as usize));
                state
                    .registry
                    .set_field(obj, field, HostValue::Number(f64::from(value)));
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_SET_FIELD_U32,
        |mut caller: Caller<'_, HostState>, obj: i32, name: u32, name_len: u32, value: u32| {
            with_memory(&mut caller, host_imports::JS_SET_FIELD_U32, (), |mem, state| {
                let field = mem.read_utf8(name, Some(name_len as usize));
                state
                    .registry
                    .set_field(obj, field, HostValue::Number(f64::from(value)));
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_SET_FIELD_STRING,
        |mut caller: Caller<'_, HostState>,
         obj: i32,
         name: u32,
         name_len: u32,
         data: u32,
         data_len: u32| {
            with_memory(&mut caller, host_imports::JS_SET_FIELD_STRING, (), |mem, state| {
                let field = mem.read_utf8(name, Some(name_len as usize));
                let text = mem.read_utf8(data, Some(data_len as usize));
                state.registry.set_field(obj, field, HostValue::text(text));
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_UNWRAP_TO_STR,
        |mut caller: Caller<'_, HostState>, obj: i32, ptr: u32, max_len: u32| {
            with_memory(&mut caller, host_imports::JS_UNWRAP_TO_STR, (), |mem, state| {
                let HostValue::Text(text) = state.registry.borrow(obj) else {
                    tracing::warn!(obj, "js_unwrap_to_str on a handle that is not a string");
                    return;
                };
                if let Err(err) = mem.write_utf8(&text, ptr, max_len as usize) {
                    tracing::warn!("{}: {err}", host_imports::JS_UNWRAP_TO_STR);
                }
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_UNWRAP_TO_BUF,
        |mut caller: Caller<'_, HostState>, obj: i32, ptr: u32, max_len: u32| {
            with_memory(&mut caller, host_imports::JS_UNWRAP_TO_BUF, (), |mem, state| {
                let value = state.registry.borrow(obj);
                let Some(bytes) = value_bytes(&value) else {
                    tracing::warn!(obj, "js_unwrap_to_buf on a handle that is not a buffer");
                    return;
                };
                let len = bytes.len().min(max_len as usize);
                if let Err(err) = mem.write_bytes(ptr, &bytes[..len]) {
                    tracing::warn!("{}: {err}", host_imports::JS_UNWRAP_TO_BUF);
                }
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_STRING_LENGTH,
        |caller: Caller<'_, HostState>, obj: i32| -> u32 {
            match caller.data().registry.borrow(obj) {
                HostValue::Text(text) => text.len() as u32,
                _ => {
                    tracing::warn!(obj, "js_string_length on a handle that is not a string");
                    0
                }
            }
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_BUF_LENGTH,
        |caller: Caller<'_, HostState>, obj: i32| -> u32 {
            let value = caller.data().registry.borrow(obj);
            match value_bytes(&value) {
                Some(bytes) => bytes.len() as u32,
                None => {
                    tracing::warn!(obj, "js_buf_length on a handle that is not a buffer");
                    0
                }
            }
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_FREE_OBJECT,
        |mut caller: Caller<'_, HostState>, obj: i32| {
            caller.data_mut().registry.release(obj);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_HAVE_FIELD,
        |mut caller: Caller<'_, HostState>, obj: i32, name: u32, name_len: u32| -> i32 {
            with_memory(&mut caller, host_imports::JS_HAVE_FIELD, 0, |mem, state| {
                let field = mem.read_utf8(name, Some(name_len as usize));
                i32::from(!state.registry.field(obj, &field).is_absent())
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_FIELD_F32,
        |mut caller: Caller<'_, HostState>, obj: i32, name: u32, name_len: u32| -> f32 {
            with_memory(&mut caller, host_imports::JS_FIELD_F32, f32::NAN, |mem, state| {
                let field = mem.read_utf8(name, Some(name_len as usize));
                state.registry.field(obj, &field).to_number() as f32
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_FIELD_U32,
        |mut caller: Caller<'_, HostState>, obj: i32, name: u32, name_len: u32| -> u32 {
            with_memory(&mut caller, host_imports::JS_FIELD_U32, 0, |mem, state| {
                let field = mem.read_utf8(name, Some(name_len as usize));
                state.registry.field(obj, &field).to_u32()
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_FIELD_NUM,
        |mut caller: Caller<'_, HostState>, obj: i32, name: u32, name_len: u32| -> f64 {
            with_memory(&mut caller, host_imports::JS_FIELD_NUM, f64::NAN, |mem, state| {
                let field = mem.read_utf8(name, Some(name_len as usize));
                state.registry.field(obj, &field).to_number()
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::JS_FIELD,
        |mut caller: Caller<'_, HostState>, obj: i32, name: u32, name_len: u32| -> i32 {
            with_memory(&mut caller, host_imports::JS_FIELD, NULL_ID, |mem, state| {
                let field = mem.read_utf8(name, Some(name_len as usize));
                let value = state.registry.field(obj, &field);
                state.registry.register(value)
            })
        },
    )?;

    Ok(())
}

fn define_console_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::CONSOLE_DEBUG,
        |mut caller: Caller<'_, HostState>, ptr: u32| {
            with_memory(&mut caller, host_imports::CONSOLE_DEBUG, (), |mem, _| {
                tracing::debug!(target: "guest", "{}", mem.read_utf8(ptr, None));
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::CONSOLE_LOG,
        |mut caller: Caller<'_, HostState>, ptr: u32| {
            with_memory(&mut caller, host_imports::CONSOLE_LOG, (), |mem, _| {
                tracing::info!(target: "guest", "{}", mem.read_utf8(ptr, None));
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::CONSOLE_INFO,
        |mut caller: Caller<'_, HostState>, ptr: u32| {
            with_memory(&mut caller, host_imports::CONSOLE_INFO, (), |mem, _| {
                tracing::info!(target: "guest", "{}", mem.read_utf8(ptr, None));
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::CONSOLE_WARN,
        |mut caller: Caller<'_, HostState>, ptr: u32| {
            with_memory(&mut caller, host_imports::CONSOLE_WARN, (), |mem, _| {
                tracing::warn!(target: "guest", "{}", mem.read_utf8(ptr, None));
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::CONSOLE_ERROR,
        |mut caller: Caller<'_, HostState>, ptr: u32| {
            with_memory(&mut caller, host_imports::CONSOLE_ERROR, (), |mem, _| {
                tracing::error!(target: "guest", "{}", mem.read_utf8(ptr, None));
            })
        },
    )?;

    Ok(())
}

fn define_surface_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SETUP_CANVAS_SIZE,
        |mut caller: Caller<'_, HostState>, high_dpi: i32| {
            let HostState {
                router, surface, ..
            } = caller.data_mut();
            router.set_high_dpi(high_dpi != 0);
            router.resize(surface.as_mut());
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::CANVAS_WIDTH,
        |caller: Caller<'_, HostState>| -> i32 { caller.data().surface.backing_size().0 as i32 },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::CANVAS_HEIGHT,
        |caller: Caller<'_, HostState>| -> i32 { caller.data().surface.backing_size().1 as i32 },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SAPP_SET_CURSOR,
        |mut caller: Caller<'_, HostState>, ptr: u32, len: u32| {
            with_memory(&mut caller, host_imports::SAPP_SET_CURSOR, (), |mem, state| {
                let cursor = mem.read_utf8(ptr, Some(len as usize));
                state.surface.set_cursor(&cursor);
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SAPP_SET_CURSOR_GRAB,
        |mut caller: Caller<'_, HostState>, grab: i32| {
            caller.data_mut().surface.set_cursor_grab(grab != 0);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SAPP_IS_FULLSCREEN,
        |caller: Caller<'_, HostState>| -> i32 {
            i32::from(caller.data().surface.is_fullscreen())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SAPP_SET_FULLSCREEN,
        |mut caller: Caller<'_, HostState>, fullscreen: i32| {
            caller.data_mut().surface.set_fullscreen(fullscreen != 0);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SAPP_SET_WINDOW_SIZE,
        |mut caller: Caller<'_, HostState>, width: u32, height: u32| -> wasmtime::Result<()> {
            let changed = {
                let HostState {
                    router, surface, ..
                } = caller.data_mut();
                surface.set_backing_size(width, height);
                router.resize(surface.as_mut())
            };
            match changed {
                Some(size) => call_guest(&mut caller, guest_exports::RESIZE, size),
                None => Ok(()),
            }
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SAPP_SET_CLIPBOARD,
        |mut caller: Caller<'_, HostState>, ptr: u32, len: u32| {
            with_memory(&mut caller, host_imports::SAPP_SET_CLIPBOARD, (), |mem, state| {
                state.clipboard = Some(mem.read_utf8(ptr, Some(len as usize)));
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::RUN_ANIMATION_LOOP,
        |mut caller: Caller<'_, HostState>, _entry: u32| {
            let HostState {
                router, surface, ..
            } = caller.data_mut();
            if let Err(err) = router.start(surface.as_mut()) {
                tracing::warn!("run_animation_loop: {err}");
            }
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SET_EMSCRIPTEN_SHADER_HACK,
        |mut caller: Caller<'_, HostState>, flag: i32| {
            caller.data_mut().gl.set_shader_compat(flag != 0);
        },
    )?;

    linker.func_wrap(IMPORT_MODULE, host_imports::RAND, || -> i32 {
        rand::thread_rng().gen_range(0..i32::MAX)
    })?;

    linker.func_wrap(IMPORT_MODULE, host_imports::NOW, || -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or(0.0)
    })?;

    Ok(())
}

fn define_fs_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::FS_LOAD_FILE,
        |mut caller: Caller<'_, HostState>, ptr: u32, len: u32| -> u32 {
            let path = with_memory(&mut caller, host_imports::FS_LOAD_FILE, String::new(), |mem, _| {
                mem.read_utf8(ptr, Some(len as usize))
            });
            let state = caller.data_mut();
            let file_id = state.files.begin();
            tracing::debug!(file_id, %path, "loading file");
            let reply = FetchReply::new(file_id, state.completions.clone());
            state.fetcher.fetch(&path, reply);
            file_id
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::FS_GET_BUFFER_SIZE,
        |caller: Caller<'_, HostState>, file_id: u32| -> i32 {
            caller.data().files.buffer_size(file_id)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::FS_TAKE_BUFFER,
        |mut caller: Caller<'_, HostState>, file_id: u32, ptr: u32, max_len: u32| {
            with_memory(&mut caller, host_imports::FS_TAKE_BUFFER, (), |mem, state| {
                let Some(bytes) = state.files.take(file_id) else {
                    tracing::warn!(file_id, "fs_take_buffer: no loaded buffer");
                    return;
                };
                let len = bytes.len().min(max_len as usize);
                if len < bytes.len() {
                    tracing::warn!(file_id, len = bytes.len(), max_len, "fs_take_buffer: truncated");
                }
                if let Err(err) = mem.write_bytes(ptr, &bytes[..len]) {
                    tracing::warn!(file_id, "fs_take_buffer: {err}");
                }
            })
        },
    )?;

    Ok(())
}

fn define_audio_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::AUDIO_INIT,
        |mut caller: Caller<'_, HostState>| {
            caller.data_mut().audio.init();
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::AUDIO_ADD_BUFFER,
        |mut caller: Caller<'_, HostState>, ptr: u32, len: u32| -> u32 {
            with_memory(&mut caller, host_imports::AUDIO_ADD_BUFFER, 0, |mem, state| {
                // An unreadable payload still gets a key; its decode simply fails.
                let bytes = mem.bytes(ptr, len as usize).map(<[u8]>::to_vec).unwrap_or_else(|err| {
                    tracing::warn!("{}: {err}", host_imports::AUDIO_ADD_BUFFER);
                    Vec::new()
                });
                state.audio.add_buffer(bytes, &state.completions)
            })
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::AUDIO_PLAY_BUFFER,
        |mut caller: Caller<'_, HostState>, sound_key: u32, volume: f32, looping: i32| -> u32 {
            caller.data_mut().audio.play(sound_key, volume, looping != 0)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::AUDIO_SOURCE_IS_LOADED,
        |caller: Caller<'_, HostState>, sound_key: u32| -> i32 {
            i32::from(caller.data().audio.is_loaded(sound_key))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::AUDIO_SOURCE_SET_VOLUME,
        |mut caller: Caller<'_, HostState>, sound_key: u32, volume: f32| {
            caller.data_mut().audio.set_sound_volume(sound_key, volume);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::AUDIO_SOURCE_STOP,
        |mut caller: Caller<'_, HostState>, sound_key: u32| {
            caller.data_mut().audio.stop_sound(sound_key);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::AUDIO_SOURCE_DELETE,
        |mut caller: Caller<'_, HostState>, sound_key: u32| {
            caller.data_mut().audio.delete_sound(sound_key);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::AUDIO_PLAYBACK_STOP,
        |mut caller: Caller<'_, HostState>, playback_key: u32| {
            caller.data_mut().audio.stop_playback(playback_key);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::AUDIO_PLAYBACK_SET_VOLUME,
        |mut caller: Caller<'_, HostState>, playback_key: u32, volume: f32| {
            caller.data_mut().audio.set_playback_volume(playback_key, volume);
        },
    )?;

    Ok(())
}
