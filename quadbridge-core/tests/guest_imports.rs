mod common;

use common::{start, start_with};
use quadbridge_core::fs::InMemoryFetcher;
use quadbridge_core::gl::{HeadlessContext, ResourceKind};
use quadbridge_core::registry::{HostValue, UNDEFINED_ID};
use quadbridge_core::surface::Surface;

#[test]
fn registry_round_trips_strings_and_object_fields() {
    let mut h = start(
        r#"
    (module
      (import "env" "js_create_string" (func $create_string (param i32 i32) (result i32)))
      (import "env" "js_string_length" (func $string_length (param i32) (result i32)))
      (import "env" "js_unwrap_to_str" (func $unwrap_to_str (param i32 i32 i32)))
      (import "env" "js_create_object" (func $create_object (result i32)))
      (import "env" "js_set_field_f32" (func $set_f32 (param i32 i32 i32 f32)))
      (import "env" "js_set_field_string" (func $set_string (param i32 i32 i32 i32 i32)))
      (import "env" "js_field_f32" (func $field_f32 (param i32 i32 i32) (result f32)))
      (import "env" "js_have_field" (func $have_field (param i32 i32 i32) (result i32)))
      (import "env" "js_field" (func $field (param i32 i32 i32) (result i32)))
      (import "env" "js_free_object" (func $free (param i32)))
      (memory (export "memory") 1)
      (data (i32.const 100) "hello")
      (data (i32.const 110) "x")
      (data (i32.const 111) "y")
      (data (i32.const 112) "name")
      (data (i32.const 120) "quad")
      (func (export "frame"))
      (func (export "main")
        (local $s i32)
        (local $o i32)
        (local.set $s (call $create_string (i32.const 100) (i32.const 5)))
        (i32.store (i32.const 0) (local.get $s))
        (i32.store (i32.const 4) (call $string_length (local.get $s)))
        (call $unwrap_to_str (local.get $s) (i32.const 200) (i32.const 16))
        (call $free (local.get $s))

        (local.set $o (call $create_object))
        (i32.store (i32.const 8) (local.get $o))
        (call $set_f32 (local.get $o) (i32.const 110) (i32.const 1) (f32.const 2.5))
        (call $set_string (local.get $o) (i32.const 112) (i32.const 4) (i32.const 120) (i32.const 4))
        (f32.store (i32.const 12) (call $field_f32 (local.get $o) (i32.const 110) (i32.const 1)))
        (i32.store (i32.const 16) (call $have_field (local.get $o) (i32.const 110) (i32.const 1)))
        (i32.store (i32.const 20) (call $have_field (local.get $o) (i32.const 111) (i32.const 1)))
        (i32.store (i32.const 24) (call $field (local.get $o) (i32.const 111) (i32.const 1)))
        (i32.store (i32.const 28) (call $field (local.get $o) (i32.const 112) (i32.const 4)))))
    "#,
    );
    let string_id = h.i32_at(0);
    assert_eq!(h.i32_at(4), 5);
    assert_eq!(h.bytes_at(200, 5), b"hello");
    assert!(!h.session.registry().contains(string_id));

    let object_id = h.i32_at(8);
    assert!(h.session.registry().contains(object_id));
    assert_eq!(h.f32_at(12), 2.5);
    assert_eq!((h.i32_at(16), h.i32_at(20)), (1, 0));
    assert_eq!(h.i32_at(24), UNDEFINED_ID);

    let name_id = h.i32_at(28);
    assert!(name_id > object_id, "ids are never reused");
    match h.session.registry().borrow(name_id) {
        HostValue::Text(text) => assert_eq!(&*text, "quad"),
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn surface_imports_follow_the_backing_store() {
    let mut h = start(
        r#"
    (module
      (import "env" "setup_canvas_size" (func $setup (param i32)))
      (import "env" "canvas_width" (func $width (result i32)))
      (import "env" "canvas_height" (func $height (result i32)))
      (import "env" "sapp_set_cursor" (func $cursor (param i32 i32)))
      (import "env" "sapp_set_cursor_grab" (func $grab (param i32)))
      (import "env" "sapp_set_window_size" (func $window (param i32 i32)))
      (import "env" "rand" (func $rand (result i32)))
      (import "env" "now" (func $now (result f64)))
      (import "env" "console_log" (func $log (param i32)))
      (memory (export "memory") 1)
      (data (i32.const 100) "pointer")
      (data (i32.const 120) "hello from the guest\00")
      (func (export "frame"))
      (func (export "resize") (param i32 i32)
        (i32.store (i32.const 40) (i32.add (i32.load (i32.const 40)) (i32.const 1)))
        (i32.store (i32.const 44) (local.get 0)))
      (func (export "main")
        (i32.store (i32.const 0) (call $width))
        (call $setup (i32.const 0))
        (i32.store (i32.const 4) (call $width))
        (i32.store (i32.const 8) (call $height))
        (call $cursor (i32.const 100) (i32.const 7))
        (call $grab (i32.const 1))
        (call $window (i32.const 640) (i32.const 480))
        (i32.store (i32.const 12) (call $rand))
        (f64.store (i32.const 16) (call $now))
        (call $log (i32.const 120))))
    "#,
    );
    assert_eq!(h.i32_at(0), 300, "default backing width before setup");
    assert_eq!((h.i32_at(4), h.i32_at(8)), (800, 600));
    assert_eq!(h.surface.cursor(), "pointer");
    assert!(h.surface.cursor_grabbed());

    // The requested size is replaced by the client-derived one and the guest hears it.
    assert_eq!(h.surface.backing_size(), (800, 600));
    assert_eq!((h.i32_at(40), h.i32_at(44)), (1, 800));

    assert!(h.i32_at(12) >= 0);
    let now = h
        .session
        .with_guest_memory(|mem| f64::from_le_bytes(mem.bytes(16, 8).unwrap().try_into().unwrap()))
        .unwrap();
    assert!(now > 1.0e9);
}

#[test]
fn out_of_bounds_pointers_degrade_to_sentinels() {
    let mut h = start(
        r#"
    (module
      (import "env" "js_create_buffer" (func $buffer (param i32 i32) (result i32)))
      (import "env" "fs_take_buffer" (func $take (param i32 i32 i32)))
      (import "env" "glBufferData" (func $buffer_data (param i32 i32 i32 i32)))
      (import "env" "glGetError" (func $get_error (result i32)))
      (memory (export "memory") 1)
      (func (export "frame"))
      (func (export "main")
        (i32.store (i32.const 0) (call $buffer (i32.const 65530) (i32.const 100)))
        (call $take (i32.const 7) (i32.const 0) (i32.const 4))
        (call $buffer_data (i32.const 0x8892) (i32.const 64) (i32.const 65500) (i32.const 0x88E4))
        (i32.store (i32.const 4) (call $get_error))
        (i32.store (i32.const 8) (call $get_error))))
    "#,
    );
    assert_eq!(h.i32_at(0), -1);
    assert_eq!(h.i32_at(4), 0x0501, "INVALID_VALUE");
    assert_eq!(h.i32_at(8), 0);
    assert_eq!(h.calls.count("bufferData"), 0);
}

#[test]
fn gl_names_are_shared_and_never_reused() {
    let mut h = start(
        r#"
    (module
      (import "env" "glGenBuffers" (func $gen_buffers (param i32 i32)))
      (import "env" "glGenTextures" (func $gen_textures (param i32 i32)))
      (import "env" "glDeleteBuffers" (func $delete_buffers (param i32 i32)))
      (import "env" "glGenQueries" (func $gen_queries (param i32 i32)))
      (import "env" "glDeleteQueries" (func $delete_queries (param i32 i32)))
      (memory (export "memory") 1)
      (func (export "frame"))
      (func (export "main")
        (call $gen_buffers (i32.const 2) (i32.const 0))
        (call $gen_textures (i32.const 1) (i32.const 8))
        (call $delete_buffers (i32.const 1) (i32.const 0))
        (call $gen_buffers (i32.const 1) (i32.const 12))
        (call $gen_queries (i32.const 1) (i32.const 16))
        (call $delete_queries (i32.const 1) (i32.const 16))))
    "#,
    );
    assert_eq!(
        (h.i32_at(0), h.i32_at(4), h.i32_at(8), h.i32_at(12), h.i32_at(16)),
        (1, 2, 3, 4, 5)
    );
    let gl = h.session.gl();
    assert!(!gl.is_live(ResourceKind::Buffer, 1));
    assert!(gl.is_live(ResourceKind::Buffer, 2));
    assert!(!gl.is_live(ResourceKind::Query, 5));
    assert_eq!(h.calls.count("delete"), 2);
}

#[test]
fn uniform_arrays_resolve_to_consecutive_locations() {
    let mut h = start(
        r#"
    (module
      (import "env" "glCreateShader" (func $create_shader (param i32) (result i32)))
      (import "env" "glShaderSource" (func $source (param i32 i32 i32 i32)))
      (import "env" "glCompileShader" (func $compile (param i32)))
      (import "env" "glCreateProgram" (func $create_program (result i32)))
      (import "env" "glAttachShader" (func $attach (param i32 i32)))
      (import "env" "glLinkProgram" (func $link (param i32)))
      (import "env" "glUseProgram" (func $use (param i32)))
      (import "env" "glGetUniformLocation" (func $location (param i32 i32) (result i32)))
      (import "env" "glUniform3fv" (func $uniform3fv (param i32 i32 i32)))
      (memory (export "memory") 1)
      (data (i32.const 64) "\2c\01\00\00\58\02\00\00")
      (data (i32.const 300) "attribute vec2 pos; void main() {}\00")
      (data (i32.const 600) "uniform vec3 colors[3]; void main() {}\00")
      (data (i32.const 900) "colors\00")
      (data (i32.const 920) "colors[1]\00")
      (func (export "frame"))
      (func (export "main")
        (local $vs i32)
        (local $fs i32)
        (local $p i32)
        (local.set $vs (call $create_shader (i32.const 0x8B31)))
        (local.set $fs (call $create_shader (i32.const 0x8B30)))
        (call $source (local.get $vs) (i32.const 1) (i32.const 64) (i32.const 0))
        (call $source (local.get $fs) (i32.const 1) (i32.const 68) (i32.const 0))
        (call $compile (local.get $vs))
        (call $compile (local.get $fs))
        (local.set $p (call $create_program))
        (call $attach (local.get $p) (local.get $vs))
        (call $attach (local.get $p) (local.get $fs))
        (call $link (local.get $p))
        (call $use (local.get $p))
        (i32.store (i32.const 0) (call $location (local.get $p) (i32.const 900)))
        (i32.store (i32.const 4) (call $location (local.get $p) (i32.const 920)))
        (f32.store (i32.const 1000) (f32.const 1))
        (f32.store (i32.const 1004) (f32.const 2))
        (f32.store (i32.const 1008) (f32.const 3))
        (f32.store (i32.const 1012) (f32.const 4))
        (f32.store (i32.const 1016) (f32.const 5))
        (f32.store (i32.const 1020) (f32.const 6))
        (call $uniform3fv (i32.load (i32.const 0)) (i32.const 2) (i32.const 1000))))
    "#,
    );
    let base = h.i32_at(0);
    assert!(base > 0);
    assert_eq!(h.i32_at(4), base + 1);

    let upload = h.calls.last("uniformfv").unwrap();
    assert!(
        upload.args.ends_with("3 [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]"),
        "{}",
        upload.args
    );
}

#[test]
fn native_creation_failure_alerts_the_operator() {
    let mut ctx = HeadlessContext::new();
    ctx.set_context_lost(true);
    let mut h = start_with(
        r#"
    (module
      (import "env" "glCreateProgram" (func $create_program (result i32)))
      (memory (export "memory") 1)
      (func (export "frame"))
      (func (export "main") (i32.store (i32.const 0) (call $create_program))))
    "#,
        ctx,
        InMemoryFetcher::new(),
    );
    assert_eq!(h.i32_at(0), 0);
    let alerts = h.surface.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("glCreateProgram"), "{alerts:?}");
}

#[test]
fn wav_loaded_through_fs_decodes_and_plays() {
    let mut wav = std::io::Cursor::new(Vec::new());
    {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut wav, spec).unwrap();
        for _ in 0..64 {
            writer.write_sample(1000i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    let fetcher = InMemoryFetcher::new().with_file("beep.wav", wav.into_inner());
    let mut h = start_with(
        r#"
    (module
      (import "env" "fs_load_file" (func $load (param i32 i32) (result i32)))
      (import "env" "fs_get_buffer_size" (func $size (param i32) (result i32)))
      (import "env" "fs_take_buffer" (func $take (param i32 i32 i32)))
      (import "env" "audio_init" (func $audio_init))
      (import "env" "audio_add_buffer" (func $add (param i32 i32) (result i32)))
      (import "env" "audio_source_is_loaded" (func $loaded (param i32) (result i32)))
      (import "env" "audio_play_buffer" (func $play (param i32 f32 i32) (result i32)))
      (import "env" "run_animation_loop" (func $run (param i32)))
      (memory (export "memory") 1)
      (data (i32.const 100) "beep.wav")
      (func (export "main")
        (call $audio_init)
        (drop (call $load (i32.const 100) (i32.const 8)))
        (call $run (i32.const 0)))
      (func (export "file_loaded") (param $id i32)
        (local $size i32)
        (local.set $size (call $size (local.get $id)))
        (call $take (local.get $id) (i32.const 1024) (local.get $size))
        (i32.store (i32.const 0) (call $add (i32.const 1024) (local.get $size))))
      (func (export "frame")
        (if (i32.and
              (call $loaded (i32.load (i32.const 0)))
              (i32.eqz (i32.load (i32.const 4))))
          (then
            (i32.store (i32.const 4)
              (call $play (i32.load (i32.const 0)) (f32.const 1) (i32.const 0)))))))
    "#,
        HeadlessContext::new(),
        fetcher,
    );
    h.session.pump_completions().unwrap();
    let sound_key = h.i32_at(0) as u32;
    assert_eq!(sound_key, 1);

    let mut waited = 0;
    while !h.session.audio().is_loaded(sound_key) && waited < 50 {
        h.session
            .wait_completions(std::time::Duration::from_millis(100))
            .unwrap();
        waited += 1;
    }
    assert!(h.session.audio().is_loaded(sound_key));

    assert!(h.session.tick().unwrap());
    let playback = h.i32_at(4) as u32;
    assert!(h.session.audio().is_playing(playback));

    let mut out = vec![0i16; 256];
    h.session.audio_mut().render(&mut out);
    assert_eq!(out[0], 1000);
    assert!(!h.session.audio().is_playing(playback));
}
