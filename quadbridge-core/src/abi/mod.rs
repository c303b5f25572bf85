//! Guest ABI.
//!
//! The contract between the host and a loaded guest module:
//!
//! ## Imports (guest -> host)
//! Imported from module `"env"`. Arguments are integers, floats and pointers into
//! guest linear memory; nothing else crosses the boundary.
//!
//! - objects: `js_create_string`, `js_create_buffer`, `js_create_object`,
//!   `js_set_field_*`, `js_unwrap_to_*`, `js_*_length`, `js_free_object`,
//!   `js_have_field`, `js_field*`
//! - console: `console_debug/log/info/warn/error(ptr)` (NUL-terminated)
//! - surface: `setup_canvas_size`, `canvas_width/height`, `sapp_*`,
//!   `run_animation_loop`, `set_emscripten_shader_hack`, `rand`, `now`
//! - files: `fs_load_file`, `fs_get_buffer_size`, `fs_take_buffer`
//! - audio: `audio_init`, `audio_add_buffer`, `audio_play_buffer`,
//!   `audio_source_*`, `audio_playback_*`
//! - graphics: the `gl*` vocabulary, see [`gl::GlEnum`] for the enum values
//!
//! ## Exports (host -> guest)
//! The guest must export `memory` and `frame()`. `main()` runs once after
//! instantiation when present. Event entry points are optional; events whose
//! entry point is missing are dropped.

pub mod gl;

use wasmtime::{AsContextMut, Func, Instance, TypedFunc, WasmParams, WasmResults};

/// Import module name used by the guest.
pub const IMPORT_MODULE: &str = "env";

/// Guest linear memory export.
pub const MEMORY_EXPORT: &str = "memory";

pub mod guest_exports {
    pub const MAIN: &str = "main";
    pub const FRAME: &str = "frame";
    pub const RESIZE: &str = "resize";
    pub const MOUSE_MOVE: &str = "mouse_move";
    pub const RAW_MOUSE_MOVE: &str = "raw_mouse_move";
    pub const MOUSE_DOWN: &str = "mouse_down";
    pub const MOUSE_UP: &str = "mouse_up";
    pub const MOUSE_WHEEL: &str = "mouse_wheel";
    pub const KEY_DOWN: &str = "key_down";
    pub const KEY_UP: &str = "key_up";
    pub const KEY_PRESS: &str = "key_press";
    pub const TOUCH: &str = "touch";
    pub const FOCUS: &str = "focus";
    pub const FILE_LOADED: &str = "file_loaded";
    pub const ON_CLIPBOARD_PASTE: &str = "on_clipboard_paste";
    pub const ON_FILES_DROPPED_START: &str = "on_files_dropped_start";
    pub const ON_FILE_DROPPED: &str = "on_file_dropped";
    pub const ON_FILES_DROPPED_FINISH: &str = "on_files_dropped_finish";
    pub const ALLOCATE_VEC_U8: &str = "allocate_vec_u8";
}

pub mod host_imports {
    // Handle registry
    pub const JS_CREATE_STRING: &str = "js_create_string";
    pub const JS_CREATE_BUFFER: &str = "js_create_buffer";
    pub const JS_CREATE_OBJECT: &str = "js_create_object";
    pub const JS_SET_FIELD_F32: &str = "js_set_field_f32";
    pub const JS_SET_FIELD_U32: &str = "js_set_field_u32";
    pub const JS_SET_FIELD_STRING: &str = "js_set_field_string";
    pub const JS_UNWRAP_TO_STR: &str = "js_unwrap_to_str";
    pub const JS_UNWRAP_TO_BUF: &str = "js_unwrap_to_buf";
    pub const JS_STRING_LENGTH: &str = "js_string_length";
    pub const JS_BUF_LENGTH: &str = "js_buf_length";
    pub const JS_FREE_OBJECT: &str = "js_free_object";
    pub const JS_HAVE_FIELD: &str = "js_have_field";
    pub const JS_FIELD_F32: &str = "js_field_f32";
    pub const JS_FIELD_U32: &str = "js_field_u32";
    pub const JS_FIELD_NUM: &str = "js_field_num";
    pub const JS_FIELD: &str = "js_field";

    // Console
    pub const CONSOLE_DEBUG: &str = "console_debug";
    pub const CONSOLE_LOG: &str = "console_log";
    pub const CONSOLE_INFO: &str = "console_info";
    pub const CONSOLE_WARN: &str = "console_warn";
    pub const CONSOLE_ERROR: &str = "console_error";

    // Surface / session
    pub const SETUP_CANVAS_SIZE: &str = "setup_canvas_size";
    pub const CANVAS_WIDTH: &str = "canvas_width";
    pub const CANVAS_HEIGHT: &str = "canvas_height";
    pub const SAPP_SET_CURSOR: &str = "sapp_set_cursor";
    pub const SAPP_SET_CURSOR_GRAB: &str = "sapp_set_cursor_grab";
    pub const SAPP_IS_FULLSCREEN: &str = "sapp_is_fullscreen";
    pub const SAPP_SET_FULLSCREEN: &str = "sapp_set_fullscreen";
    pub const SAPP_SET_WINDOW_SIZE: &str = "sapp_set_window_size";
    pub const SAPP_SET_CLIPBOARD: &str = "sapp_set_clipboard";
    pub const RUN_ANIMATION_LOOP: &str = "run_animation_loop";
    pub const SET_EMSCRIPTEN_SHADER_HACK: &str = "set_emscripten_shader_hack";
    pub const RAND: &str = "rand";
    pub const NOW: &str = "now";

    // Files
    pub const FS_LOAD_FILE: &str = "fs_load_file";
    pub const FS_GET_BUFFER_SIZE: &str = "fs_get_buffer_size";
    pub const FS_TAKE_BUFFER: &str = "fs_take_buffer";

    // Audio
    pub const AUDIO_INIT: &str = "audio_init";
    pub const AUDIO_ADD_BUFFER: &str = "audio_add_buffer";
    pub const AUDIO_PLAY_BUFFER: &str = "audio_play_buffer";
    pub const AUDIO_SOURCE_IS_LOADED: &str = "audio_source_is_loaded";
    pub const AUDIO_SOURCE_SET_VOLUME: &str = "audio_source_set_volume";
    pub const AUDIO_SOURCE_STOP: &str = "audio_source_stop";
    pub const AUDIO_SOURCE_DELETE: &str = "audio_source_delete";
    pub const AUDIO_PLAYBACK_STOP: &str = "audio_playback_stop";
    pub const AUDIO_PLAYBACK_SET_VOLUME: &str = "audio_playback_set_volume";
}

/// Guest entry points resolved once after instantiation.
#[derive(Clone)]
pub struct GuestEntrypoints {
    /// Untyped: toolchains export `main()` or `main(argc, argv) -> i32`.
    pub main: Option<Func>,
    pub frame: TypedFunc<(), ()>,
    pub resize: Option<TypedFunc<(i32, i32), ()>>,
    pub mouse_move: Option<TypedFunc<(i32, i32), ()>>,
    pub raw_mouse_move: Option<TypedFunc<(i32, i32), ()>>,
    pub mouse_down: Option<TypedFunc<(i32, i32, i32), ()>>,
    pub mouse_up: Option<TypedFunc<(i32, i32, i32), ()>>,
    pub mouse_wheel: Option<TypedFunc<(i32, i32), ()>>,
    pub key_down: Option<TypedFunc<(u32, u32, i32), ()>>,
    pub key_up: Option<TypedFunc<(u32, u32), ()>>,
    pub key_press: Option<TypedFunc<u32, ()>>,
    pub touch: Option<TypedFunc<(u32, u32, f32, f32), ()>>,
    pub focus: Option<TypedFunc<i32, ()>>,
    pub file_loaded: Option<TypedFunc<u32, ()>>,
    pub on_clipboard_paste: Option<TypedFunc<(u32, u32), ()>>,
    pub on_files_dropped_start: Option<TypedFunc<(), ()>>,
    pub on_file_dropped: Option<TypedFunc<(u32, u32, u32, u32), ()>>,
    pub on_files_dropped_finish: Option<TypedFunc<(), ()>>,
    pub allocate_vec_u8: Option<TypedFunc<u32, u32>>,
}

#[derive(Debug, thiserror::Error)]
#[error("guest does not export `{name}` with the expected signature")]
pub struct MissingExport {
    pub name: &'static str,
    #[source]
    pub source: Option<wasmtime::Error>,
}

/// `None` when the export is absent; a present export with the wrong signature
/// is logged and treated as absent.
fn optional<P: WasmParams, R: WasmResults>(
    instance: &Instance,
    mut store: impl AsContextMut,
    name: &str,
) -> Option<TypedFunc<P, R>> {
    instance.get_func(&mut store, name)?;
    match instance.get_typed_func::<P, R>(&mut store, name) {
        Ok(func) => Some(func),
        Err(err) => {
            tracing::warn!("guest export `{name}` has an unexpected signature: {err}");
            None
        }
    }
}

impl GuestEntrypoints {
    pub fn resolve(instance: &Instance, mut store: impl AsContextMut) -> Result<Self, MissingExport> {
        if instance.get_memory(&mut store, MEMORY_EXPORT).is_none() {
            return Err(MissingExport {
                name: MEMORY_EXPORT,
                source: None,
            });
        }
        let frame = instance
            .get_typed_func::<(), ()>(&mut store, guest_exports::FRAME)
            .map_err(|err| MissingExport {
                name: guest_exports::FRAME,
                source: Some(err),
            })?;

        use guest_exports as e;
        Ok(Self {
            main: instance.get_func(&mut store, e::MAIN),
            frame,
            resize: optional(instance, &mut store, e::RESIZE),
            mouse_move: optional(instance, &mut store, e::MOUSE_MOVE),
            raw_mouse_move: optional(instance, &mut store, e::RAW_MOUSE_MOVE),
            mouse_down: optional(instance, &mut store, e::MOUSE_DOWN),
            mouse_up: optional(instance, &mut store, e::MOUSE_UP),
            mouse_wheel: optional(instance, &mut store, e::MOUSE_WHEEL),
            key_down: optional(instance, &mut store, e::KEY_DOWN),
            key_up: optional(instance, &mut store, e::KEY_UP),
            key_press: optional(instance, &mut store, e::KEY_PRESS),
            touch: optional(instance, &mut store, e::TOUCH),
            focus: optional(instance, &mut store, e::FOCUS),
            file_loaded: optional(instance, &mut store, e::FILE_LOADED),
            on_clipboard_paste: optional(instance, &mut store, e::ON_CLIPBOARD_PASTE),
            on_files_dropped_start: optional(instance, &mut store, e::ON_FILES_DROPPED_START),
            on_file_dropped: optional(instance, &mut store, e::ON_FILE_DROPPED),
            on_files_dropped_finish: optional(instance, &mut store, e::ON_FILES_DROPPED_FINISH),
            allocate_vec_u8: optional(instance, &mut store, e::ALLOCATE_VEC_U8),
        })
    }
}
