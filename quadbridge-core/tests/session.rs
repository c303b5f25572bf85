mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{Harness, backends, start, start_with};
use quadbridge_core::fs::{FetchReply, FileFetcher, InMemoryFetcher};
use quadbridge_core::gl::HeadlessContext;
use quadbridge_core::input::{DroppedFile, EventKind, MODIFIER_SHIFT, Modifiers};
use quadbridge_core::surface::HeadlessSurface;
use quadbridge_core::{Session, SessionConfig, SessionError, SurfaceEvent};

/// Counters: frame @0, resize @4 (w @8, h @12), focus @16 (value @20),
/// key_down @24..36, mouse_down @36..48.
const LOOP_GUEST: &str = r#"
(module
  (import "env" "run_animation_loop" (func $run (param i32)))
  (memory (export "memory") 1)
  (func $bump (param $at i32)
    (i32.store (local.get $at) (i32.add (i32.load (local.get $at)) (i32.const 1))))
  (func (export "main") (call $run (i32.const 0)))
  (func (export "frame") (call $bump (i32.const 0)))
  (func (export "resize") (param i32 i32)
    (call $bump (i32.const 4))
    (i32.store (i32.const 8) (local.get 0))
    (i32.store (i32.const 12) (local.get 1)))
  (func (export "focus") (param i32)
    (call $bump (i32.const 16))
    (i32.store (i32.const 20) (local.get 0)))
  (func (export "key_down") (param i32 i32 i32)
    (i32.store (i32.const 24) (local.get 0))
    (i32.store (i32.const 28) (local.get 1))
    (i32.store (i32.const 32) (local.get 2)))
  (func (export "mouse_down") (param i32 i32 i32)
    (i32.store (i32.const 36) (local.get 0))
    (i32.store (i32.const 40) (local.get 1))
    (i32.store (i32.const 44) (local.get 2)))
)
"#;

#[test]
fn main_starts_the_loop_and_ticks_run_frames() {
    let mut h = start(LOOP_GUEST);
    assert!(h.session.is_running());
    assert_eq!(h.surface.listener_count(), EventKind::ALL.len());
    assert!(h.surface.pending_frame().is_some());

    assert!(h.session.tick().unwrap());
    assert!(h.session.tick().unwrap());
    assert_eq!(h.i32_at(0), 2);
    assert!(h.surface.pending_frame().is_some());
}

#[test]
fn guest_without_loop_never_ticks() {
    let mut h = start(
        r#"(module (memory (export "memory") 1)
             (func (export "frame") (i32.store (i32.const 0) (i32.const 99))))"#,
    );
    assert!(!h.session.is_running());
    assert!(!h.session.tick().unwrap());
    assert_eq!(h.i32_at(0), 0);
}

#[test]
fn resize_is_delivered_once_per_change() {
    let mut h = start(LOOP_GUEST);
    h.session.dispatch(&SurfaceEvent::Resize).unwrap();
    h.session.dispatch(&SurfaceEvent::Resize).unwrap();
    assert_eq!(h.i32_at(4), 1);
    assert_eq!((h.i32_at(8), h.i32_at(12)), (800, 600));

    h.surface.set_client_size(1024.0, 768.0);
    h.session.dispatch(&SurfaceEvent::Resize).unwrap();
    assert_eq!(h.i32_at(4), 2);
    assert_eq!((h.i32_at(8), h.i32_at(12)), (1024, 768));
}

#[test]
fn focus_is_reported_only_when_it_changes() {
    let mut h = start(LOOP_GUEST);
    h.surface.set_focused(false);
    h.session.dispatch(&SurfaceEvent::Blur).unwrap();
    h.session.dispatch(&SurfaceEvent::Blur).unwrap();
    assert_eq!(h.i32_at(16), 1);
    assert_eq!(h.i32_at(20), 0);

    h.surface.set_focused(true);
    h.session.dispatch(&SurfaceEvent::Focus).unwrap();
    assert_eq!(h.i32_at(16), 2);
    assert_eq!(h.i32_at(20), 1);
}

#[test]
fn key_and_mouse_events_arrive_in_guest_shape() {
    let mut h = start(LOOP_GUEST);
    h.session
        .dispatch(&SurfaceEvent::KeyDown {
            code: "KeyA".into(),
            modifiers: Modifiers {
                shift: true,
                ..Modifiers::default()
            },
            repeat: true,
        })
        .unwrap();
    assert_eq!(h.i32_at(24), 65);
    assert_eq!(h.i32_at(28) as u32, MODIFIER_SHIFT);
    assert_eq!(h.i32_at(32), 1);

    h.session
        .dispatch(&SurfaceEvent::MouseDown {
            client_x: 10.7,
            client_y: 20.2,
            button: 2,
        })
        .unwrap();
    assert_eq!((h.i32_at(36), h.i32_at(40), h.i32_at(44)), (10, 20, 1));
}

#[test]
fn events_before_the_loop_starts_are_ignored() {
    let mut h = start(
        r#"(module (memory (export "memory") 1)
             (func (export "frame"))
             (func (export "resize") (param i32 i32) (i32.store (i32.const 0) (i32.const 1))))"#,
    );
    let routed = h.session.dispatch(&SurfaceEvent::Resize).unwrap();
    assert!(routed.calls.is_empty());
    assert_eq!(h.i32_at(0), 0);
}

#[test]
fn trap_in_frame_stops_the_loop_but_keeps_listeners() {
    let mut h = start(
        r#"(module
             (import "env" "run_animation_loop" (func $run (param i32)))
             (memory (export "memory") 1)
             (func (export "main") (call $run (i32.const 0)))
             (func (export "frame") unreachable))"#,
    );
    assert!(h.session.tick().is_err());
    assert!(h.surface.pending_frame().is_none());
    assert!(!h.session.tick().unwrap());
    assert_eq!(h.surface.listener_count(), EventKind::ALL.len());
}

#[test]
fn missing_frame_export_is_rejected() {
    let surface = HeadlessSurface::new(10.0, 10.0);
    let err = Session::new(
        br#"(module (memory (export "memory") 1))"#,
        backends(&surface, HeadlessContext::new(), InMemoryFetcher::new()),
        SessionConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(
        err.downcast_ref::<SessionError>(),
        Some(SessionError::MissingExport(missing)) if missing.name == "frame"
    ));
}

#[test]
fn main_with_parameters_is_called_with_zeroes() {
    let mut h = start(
        r#"(module (memory (export "memory") 1)
             (func (export "frame"))
             (func (export "main") (param i32 i32) (result i32)
               (i32.store (i32.const 0) (i32.add (i32.const 7) (i32.add (local.get 0) (local.get 1))))
               (i32.const 0)))"#,
    );
    assert_eq!(h.i32_at(0), 7);
}

/// Paste lands @0 (ptr) / @4 (len); dropped files count @8 start, @12 files, @16 finish,
/// last name ptr/len @20/@24, last data ptr/len @28/@32.
const CLIPBOARD_GUEST: &str = r#"
(module
  (import "env" "run_animation_loop" (func $run (param i32)))
  (import "env" "sapp_set_clipboard" (func $set_clipboard (param i32 i32)))
  (memory (export "memory") 1)
  (global $heap (mut i32) (i32.const 4096))
  (data (i32.const 200) "copied")
  (func $bump (param $at i32)
    (i32.store (local.get $at) (i32.add (i32.load (local.get $at)) (i32.const 1))))
  (func (export "main")
    (call $set_clipboard (i32.const 200) (i32.const 6))
    (call $run (i32.const 0)))
  (func (export "frame"))
  (func (export "allocate_vec_u8") (param $len i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $heap))
    (global.set $heap (i32.add (global.get $heap) (local.get $len)))
    (local.get $ptr))
  (func (export "on_clipboard_paste") (param i32 i32)
    (i32.store (i32.const 0) (local.get 0))
    (i32.store (i32.const 4) (local.get 1)))
  (func (export "on_files_dropped_start") (call $bump (i32.const 8)))
  (func (export "on_file_dropped") (param i32 i32 i32 i32)
    (call $bump (i32.const 12))
    (i32.store (i32.const 20) (local.get 0))
    (i32.store (i32.const 24) (local.get 1))
    (i32.store (i32.const 28) (local.get 2))
    (i32.store (i32.const 32) (local.get 3)))
  (func (export "on_files_dropped_finish") (call $bump (i32.const 16)))
)
"#;

#[test]
fn paste_is_copied_into_a_guest_allocation() {
    let mut h = start(CLIPBOARD_GUEST);
    let routed = h
        .session
        .dispatch(&SurfaceEvent::Paste {
            text: "héllo".into(),
        })
        .unwrap();
    assert!(routed.prevent_default);

    let (ptr, len) = (h.i32_at(0) as u32, h.i32_at(4) as usize);
    assert_eq!(len, "héllo".len());
    assert_eq!(h.bytes_at(ptr, len), "héllo".as_bytes());
}

#[test]
fn copy_publishes_the_guest_clipboard() {
    let mut h = start(CLIPBOARD_GUEST);
    assert_eq!(h.session.clipboard(), Some("copied"));
    let routed = h.session.dispatch(&SurfaceEvent::Copy).unwrap();
    assert_eq!(routed.clipboard_out.as_deref(), Some("copied"));
    assert!(routed.prevent_default);
}

#[test]
fn dropped_files_are_bracketed_by_start_and_finish() {
    let mut h = start(CLIPBOARD_GUEST);
    let files = vec![
        DroppedFile {
            name: "a.txt".into(),
            data: b"first".to_vec(),
        },
        DroppedFile {
            name: "b.bin".into(),
            data: vec![1, 2, 3],
        },
    ];
    h.session.dispatch(&SurfaceEvent::Drop { files }).unwrap();
    assert_eq!((h.i32_at(8), h.i32_at(12), h.i32_at(16)), (1, 2, 1));

    let (name_ptr, name_len) = (h.i32_at(20) as u32, h.i32_at(24) as usize);
    let (data_ptr, data_len) = (h.i32_at(28) as u32, h.i32_at(32) as usize);
    assert_eq!(h.bytes_at(name_ptr, name_len), b"b.bin");
    assert_eq!(h.bytes_at(data_ptr, data_len), [1, 2, 3]);
}

/// Loads two files from main; `file_loaded` records each size @16 + 4 * id and takes
/// loaded bytes to @200.
const FILE_GUEST: &str = r#"
(module
  (import "env" "fs_load_file" (func $load (param i32 i32) (result i32)))
  (import "env" "fs_get_buffer_size" (func $size (param i32) (result i32)))
  (import "env" "fs_take_buffer" (func $take (param i32 i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 100) "data.bin")
  (data (i32.const 120) "missing.bin")
  (func (export "main")
    (i32.store (i32.const 0) (call $load (i32.const 100) (i32.const 8)))
    (i32.store (i32.const 4) (call $load (i32.const 120) (i32.const 11))))
  (func (export "frame"))
  (func (export "file_loaded") (param $id i32)
    (local $size i32)
    (local.set $size (call $size (local.get $id)))
    (i32.store
      (i32.add (i32.const 16) (i32.mul (local.get $id) (i32.const 4)))
      (local.get $size))
    (if (i32.gt_s (local.get $size) (i32.const 0))
      (then (call $take (local.get $id) (i32.const 200) (local.get $size)))))
)
"#;

#[test]
fn fetched_files_reach_the_guest_on_the_next_pump() {
    let fetcher = InMemoryFetcher::new().with_file("data.bin", (0u8..10).collect::<Vec<_>>());
    let mut h = start_with(FILE_GUEST, HeadlessContext::new(), fetcher);
    assert_eq!((h.i32_at(0), h.i32_at(4)), (0, 1));
    assert_eq!(h.i32_at(16), 0, "nothing applied before pumping");

    assert_eq!(h.session.pump_completions().unwrap(), 2);
    assert_eq!(h.i32_at(16), 10);
    assert_eq!(h.i32_at(20), -1);
    assert_eq!(h.bytes_at(200, 10), (0u8..10).collect::<Vec<_>>());
    assert_eq!(h.session.files().buffer_size(0), -1, "taken buffers are gone");
}

#[test]
fn trap_in_file_loaded_does_not_lose_the_rest_of_the_batch() {
    let guest = r#"
    (module
      (import "env" "fs_load_file" (func $load (param i32 i32) (result i32)))
      (import "env" "fs_get_buffer_size" (func $size (param i32) (result i32)))
      (memory (export "memory") 1)
      (data (i32.const 100) "a.bin")
      (data (i32.const 120) "b.bin")
      (func (export "main")
        (drop (call $load (i32.const 100) (i32.const 5)))
        (drop (call $load (i32.const 120) (i32.const 5))))
      (func (export "frame"))
      (func (export "file_loaded") (param $id i32)
        (if (i32.eqz (local.get $id)) (then unreachable))
        (i32.store (i32.const 16) (call $size (local.get $id)))))
    "#;
    let fetcher = InMemoryFetcher::new()
        .with_file("a.bin", vec![1u8; 3])
        .with_file("b.bin", vec![2u8; 7]);
    let mut h = start_with(guest, HeadlessContext::new(), fetcher);

    assert!(h.session.pump_completions().is_err());
    assert_eq!(h.i32_at(16), 7, "file 1 still reached the guest");
    assert_eq!(h.session.files().buffer_size(0), 3);
    assert_eq!(h.session.files().buffer_size(1), 7);
    assert_eq!(h.session.pump_completions().unwrap(), 0, "nothing is delivered twice");
}

/// Holds replies until the test completes them.
#[derive(Clone, Default)]
struct DeferredFetcher {
    pending: Rc<RefCell<Vec<FetchReply>>>,
}

impl FileFetcher for DeferredFetcher {
    fn fetch(&mut self, _path: &str, reply: FetchReply) {
        self.pending.borrow_mut().push(reply);
    }
}

#[test]
fn completions_from_a_torn_down_session_never_land() {
    let fetcher = DeferredFetcher::default();
    let pending = Rc::clone(&fetcher.pending);
    let h = start_with(FILE_GUEST, HeadlessContext::new(), fetcher);
    let Harness { session, surface, .. } = h;
    let backends = session.teardown();
    let stale: Vec<FetchReply> = pending.borrow_mut().drain(..).collect();
    assert_eq!(stale.len(), 2);

    let mut next = Session::new(FILE_GUEST.as_bytes(), backends, SessionConfig::default()).unwrap();
    for reply in stale {
        reply.complete(Ok(vec![0xAA; 4]));
    }
    assert_eq!(next.pump_completions().unwrap(), 0);
    assert_eq!(next.files().buffer_size(0), -1);
    assert_eq!(surface.listener_count(), 0);
}

#[test]
fn teardown_detaches_listeners_and_releases_native_objects() {
    let guest = r#"
    (module
      (import "env" "run_animation_loop" (func $run (param i32)))
      (import "env" "glGenBuffers" (func $gen_buffers (param i32 i32)))
      (import "env" "glGenTextures" (func $gen_textures (param i32 i32)))
      (import "env" "glCreateProgram" (func $create_program (result i32)))
      (memory (export "memory") 1)
      (func (export "main")
        (call $gen_buffers (i32.const 2) (i32.const 0))
        (call $gen_textures (i32.const 1) (i32.const 8))
        (drop (call $create_program))
        (call $run (i32.const 0)))
      (func (export "frame")))
    "#;
    let h = start(guest);
    let Harness {
        session,
        surface,
        calls,
    } = h;
    assert_eq!(calls.count("create"), 4);
    assert_eq!(surface.listener_count(), EventKind::ALL.len());

    let backends = session.teardown();
    assert_eq!(surface.listener_count(), 0);
    assert!(surface.pending_frame().is_none());
    assert_eq!(calls.count("delete"), 4);

    // The surface is free to bind to a new session.
    let again = Session::new(guest.as_bytes(), backends, SessionConfig::default()).unwrap();
    assert!(again.is_running());
    assert_eq!(surface.listener_count(), EventKind::ALL.len());
}
