//! Input and session event routing.
//!
//! [`EventRouter`] owns the listener set and the frame request of one surface and
//! translates raw [`SurfaceEvent`]s into the guest calls the ABI expects. It does
//! not call the guest itself: `route` returns a [`RoutedEvent`] and the session
//! delivers the calls, so this module stays independent of the runtime.
//!
//! Lifecycle: `Unbound → Running → TornDown`. A torn-down router is never revived;
//! events routed to it produce nothing.

pub mod keycodes;

use thiserror::Error;

use crate::surface::{FrameHandle, ListenerId, ListenerTarget, Surface};

pub const MODIFIER_SHIFT: u32 = 1;
pub const MODIFIER_CTRL: u32 = 2;
pub const MODIFIER_ALT: u32 = 4;
pub const MODIFIER_SUPER: u32 = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("event router is already running")]
    AlreadyRunning,
    #[error("event router was torn down")]
    TornDown,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RouterState {
    Unbound,
    Running,
    TornDown,
}

/// Every listener the router attaches, in attach order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    MouseMove,
    MouseDown,
    Wheel,
    MouseUp,
    KeyDown,
    KeyUp,
    KeyPress,
    TouchStart,
    TouchEnd,
    TouchCancel,
    TouchMove,
    Resize,
    Copy,
    Cut,
    Paste,
    DragOver,
    Drop,
    Focus,
    Blur,
    VisibilityChange,
}

impl EventKind {
    pub const ALL: [EventKind; 20] = [
        EventKind::MouseMove,
        EventKind::MouseDown,
        EventKind::Wheel,
        EventKind::MouseUp,
        EventKind::KeyDown,
        EventKind::KeyUp,
        EventKind::KeyPress,
        EventKind::TouchStart,
        EventKind::TouchEnd,
        EventKind::TouchCancel,
        EventKind::TouchMove,
        EventKind::Resize,
        EventKind::Copy,
        EventKind::Cut,
        EventKind::Paste,
        EventKind::DragOver,
        EventKind::Drop,
        EventKind::Focus,
        EventKind::Blur,
        EventKind::VisibilityChange,
    ];

    pub const fn target(self) -> ListenerTarget {
        match self {
            EventKind::MouseMove
            | EventKind::MouseDown
            | EventKind::Wheel
            | EventKind::MouseUp
            | EventKind::KeyDown
            | EventKind::KeyUp
            | EventKind::KeyPress
            | EventKind::TouchStart
            | EventKind::TouchEnd
            | EventKind::TouchCancel
            | EventKind::TouchMove => ListenerTarget::Canvas,
            EventKind::VisibilityChange => ListenerTarget::Document,
            _ => ListenerTarget::Window,
        }
    }

    /// DOM event name.
    pub const fn dom_name(self) -> &'static str {
        match self {
            EventKind::MouseMove => "mousemove",
            EventKind::MouseDown => "mousedown",
            EventKind::Wheel => "wheel",
            EventKind::MouseUp => "mouseup",
            EventKind::KeyDown => "keydown",
            EventKind::KeyUp => "keyup",
            EventKind::KeyPress => "keypress",
            EventKind::TouchStart => "touchstart",
            EventKind::TouchEnd => "touchend",
            EventKind::TouchCancel => "touchcancel",
            EventKind::TouchMove => "touchmove",
            EventKind::Resize => "resize",
            EventKind::Copy => "copy",
            EventKind::Cut => "cut",
            EventKind::Paste => "paste",
            EventKind::DragOver => "dragover",
            EventKind::Drop => "drop",
            EventKind::Focus => "focus",
            EventKind::Blur => "blur",
            EventKind::VisibilityChange => "visibilitychange",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn bits(self) -> u32 {
        let mut bits = 0;
        if self.shift {
            bits |= MODIFIER_SHIFT;
        }
        if self.ctrl {
            bits |= MODIFIER_CTRL;
        }
        if self.alt {
            bits |= MODIFIER_ALT;
        }
        if self.meta {
            bits |= MODIFIER_SUPER;
        }
        bits
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TouchPhase {
    Began,
    Moved,
    Ended,
    Canceled,
}

impl TouchPhase {
    pub const fn code(self) -> u32 {
        match self {
            TouchPhase::Began => 10,
            TouchPhase::Moved => 11,
            TouchPhase::Ended => 12,
            TouchPhase::Canceled => 13,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TouchPoint {
    pub id: u32,
    pub client_x: f64,
    pub client_y: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// Raw event as delivered by the embedder's windowing layer.
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceEvent {
    MouseMove {
        client_x: f64,
        client_y: f64,
        movement_x: f64,
        movement_y: f64,
    },
    MouseDown {
        client_x: f64,
        client_y: f64,
        button: u16,
    },
    MouseUp {
        client_x: f64,
        client_y: f64,
        button: u16,
    },
    Wheel {
        delta_x: f64,
        delta_y: f64,
    },
    KeyDown {
        code: String,
        modifiers: Modifiers,
        repeat: bool,
    },
    KeyUp {
        code: String,
        modifiers: Modifiers,
    },
    KeyPress {
        code: String,
        char_code: u32,
        modifiers: Modifiers,
    },
    Touch {
        phase: TouchPhase,
        changed: Vec<TouchPoint>,
    },
    Resize,
    Copy,
    Cut,
    Paste {
        text: String,
    },
    DragOver,
    Drop {
        files: Vec<DroppedFile>,
    },
    Focus,
    Blur,
    VisibilityChange,
}

impl SurfaceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SurfaceEvent::MouseMove { .. } => EventKind::MouseMove,
            SurfaceEvent::MouseDown { .. } => EventKind::MouseDown,
            SurfaceEvent::MouseUp { .. } => EventKind::MouseUp,
            SurfaceEvent::Wheel { .. } => EventKind::Wheel,
            SurfaceEvent::KeyDown { .. } => EventKind::KeyDown,
            SurfaceEvent::KeyUp { .. } => EventKind::KeyUp,
            SurfaceEvent::KeyPress { .. } => EventKind::KeyPress,
            SurfaceEvent::Touch { phase, .. } => match phase {
                TouchPhase::Began => EventKind::TouchStart,
                TouchPhase::Moved => EventKind::TouchMove,
                TouchPhase::Ended => EventKind::TouchEnd,
                TouchPhase::Canceled => EventKind::TouchCancel,
            },
            SurfaceEvent::Resize => EventKind::Resize,
            SurfaceEvent::Copy => EventKind::Copy,
            SurfaceEvent::Cut => EventKind::Cut,
            SurfaceEvent::Paste { .. } => EventKind::Paste,
            SurfaceEvent::DragOver => EventKind::DragOver,
            SurfaceEvent::Drop { .. } => EventKind::Drop,
            SurfaceEvent::Focus => EventKind::Focus,
            SurfaceEvent::Blur => EventKind::Blur,
            SurfaceEvent::VisibilityChange => EventKind::VisibilityChange,
        }
    }
}

/// A call into a guest export, with ABI-shaped arguments.
///
/// `ClipboardPaste` and `FileDropped` carry host data; the session copies it into
/// buffers obtained from the guest's `allocate_vec_u8` before calling the export.
#[derive(Clone, Debug, PartialEq)]
pub enum GuestCall {
    Resize { width: i32, height: i32 },
    MouseMove { x: i32, y: i32 },
    RawMouseMove { dx: i32, dy: i32 },
    MouseDown { x: i32, y: i32, button: i32 },
    MouseUp { x: i32, y: i32, button: i32 },
    MouseWheel { dx: i32, dy: i32 },
    KeyDown { key: u32, modifiers: u32, repeat: bool },
    KeyUp { key: u32, modifiers: u32 },
    KeyPress { key: u32 },
    Touch { phase: u32, id: u32, x: f32, y: f32 },
    Focus(bool),
    ClipboardPaste(String),
    FilesDroppedStart,
    FileDropped { name: String, data: Vec<u8> },
    FilesDroppedFinish,
}

/// Result of routing one event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoutedEvent {
    pub calls: Vec<GuestCall>,
    /// The platform's default action for the event must be suppressed.
    pub prevent_default: bool,
    /// Text to publish to the system clipboard (copy/cut).
    pub clipboard_out: Option<String>,
}

/// Guest mouse button for a DOM button index: middle and right are swapped.
pub fn guest_mouse_button(button: u16) -> i32 {
    match button {
        1 => 2,
        2 => 1,
        other => i32::from(other),
    }
}

#[derive(Debug)]
pub struct EventRouter {
    state: RouterState,
    high_dpi: bool,
    listeners: Vec<ListenerId>,
    frame: Option<FrameHandle>,
    last_focus: bool,
}

impl EventRouter {
    pub fn new(high_dpi: bool) -> Self {
        Self {
            state: RouterState::Unbound,
            high_dpi,
            listeners: Vec::new(),
            frame: None,
            last_focus: true,
        }
    }

    pub fn state(&self) -> RouterState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RouterState::Running
    }

    pub fn high_dpi(&self) -> bool {
        self.high_dpi
    }

    pub fn set_high_dpi(&mut self, high_dpi: bool) {
        self.high_dpi = high_dpi;
    }

    /// Number of listeners currently attached by this router.
    pub fn attached_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.frame
    }

    fn dpi_scale(&self, surface: &dyn Surface) -> f64 {
        if self.high_dpi {
            let ratio = surface.device_pixel_ratio();
            if ratio > 0.0 { ratio } else { 1.0 }
        } else {
            1.0
        }
    }

    fn relative_position(&self, surface: &dyn Surface, client_x: f64, client_y: f64) -> (f64, f64) {
        let (left, top) = surface.client_origin();
        let scale = self.dpi_scale(surface);
        ((client_x - left) * scale, (client_y - top) * scale)
    }

    /// `Unbound → Running`: attach every listener and request the first frame.
    pub fn start(&mut self, surface: &mut dyn Surface) -> Result<(), RouterError> {
        match self.state {
            RouterState::Running => return Err(RouterError::AlreadyRunning),
            RouterState::TornDown => return Err(RouterError::TornDown),
            RouterState::Unbound => {}
        }
        for kind in EventKind::ALL {
            let id = surface.attach_listener(kind.target(), kind.dom_name());
            self.listeners.push(id);
        }
        self.last_focus = surface.has_focus();
        self.frame = Some(surface.request_frame());
        self.state = RouterState::Running;
        tracing::debug!(listeners = self.listeners.len(), "event router running");
        Ok(())
    }

    /// The scheduled frame ran; request the next one.
    pub fn frame_done(&mut self, surface: &mut dyn Surface) {
        if self.is_running() {
            self.frame = Some(surface.request_frame());
        } else {
            self.frame = None;
        }
    }

    /// Stop requesting frames without detaching listeners (after a guest trap).
    pub fn stop_frames(&mut self, surface: &mut dyn Surface) {
        if let Some(frame) = self.frame.take() {
            surface.cancel_frame(frame);
        }
    }

    /// `→ TornDown`: cancel the pending frame and detach every listener.
    pub fn teardown(&mut self, surface: &mut dyn Surface) {
        if self.state == RouterState::TornDown {
            return;
        }
        self.stop_frames(surface);
        for id in self.listeners.drain(..) {
            surface.detach_listener(id);
        }
        self.state = RouterState::TornDown;
        tracing::debug!("event router torn down");
    }

    /// Recompute the backing resolution. Returns the new size when it changed.
    pub fn resize(&mut self, surface: &mut dyn Surface) -> Option<(i32, i32)> {
        let scale = self.dpi_scale(surface);
        let (client_w, client_h) = surface.client_size();
        let width = (client_w * scale).floor().max(0.0) as u32;
        let height = (client_h * scale).floor().max(0.0) as u32;
        if surface.backing_size() == (width, height) {
            return None;
        }
        surface.set_backing_size(width, height);
        tracing::trace!(width, height, "backing size changed");
        Some((width as i32, height as i32))
    }

    /// Translate one event. Routers that are not running produce nothing.
    pub fn route(
        &mut self,
        surface: &mut dyn Surface,
        event: &SurfaceEvent,
        clipboard: Option<&str>,
    ) -> RoutedEvent {
        let mut out = RoutedEvent::default();
        if !self.is_running() {
            tracing::debug!(state = ?self.state, event = event.kind().dom_name(), "event ignored");
            return out;
        }

        match event {
            SurfaceEvent::MouseMove {
                client_x,
                client_y,
                movement_x,
                movement_y,
            } => {
                let (x, y) = self.relative_position(surface, *client_x, *client_y);
                out.calls.push(GuestCall::MouseMove {
                    x: x.floor() as i32,
                    y: y.floor() as i32,
                });
                if *movement_x != 0.0 || *movement_y != 0.0 {
                    out.calls.push(GuestCall::RawMouseMove {
                        dx: movement_x.floor() as i32,
                        dy: movement_y.floor() as i32,
                    });
                }
            }
            SurfaceEvent::MouseDown {
                client_x,
                client_y,
                button,
            } => {
                let (x, y) = self.relative_position(surface, *client_x, *client_y);
                out.calls.push(GuestCall::MouseDown {
                    x: x as i32,
                    y: y as i32,
                    button: guest_mouse_button(*button),
                });
            }
            SurfaceEvent::MouseUp {
                client_x,
                client_y,
                button,
            } => {
                let (x, y) = self.relative_position(surface, *client_x, *client_y);
                out.calls.push(GuestCall::MouseUp {
                    x: x as i32,
                    y: y as i32,
                    button: guest_mouse_button(*button),
                });
            }
            SurfaceEvent::Wheel { delta_x, delta_y } => {
                out.prevent_default = true;
                out.calls.push(GuestCall::MouseWheel {
                    dx: -*delta_x as i32,
                    dy: -*delta_y as i32,
                });
            }
            SurfaceEvent::KeyDown {
                code,
                modifiers,
                repeat,
            } => {
                let Some(key) = keycodes::lookup(code) else {
                    tracing::warn!(code = %code, "Unsupported keyboard key");
                    return out;
                };
                out.prevent_default = keycodes::suppresses_default(key);
                out.calls.push(GuestCall::KeyDown {
                    key,
                    modifiers: modifiers.bits(),
                    repeat: *repeat,
                });
                if keycodes::presses_on_key_down(key) {
                    out.calls.push(GuestCall::KeyPress { key });
                }
            }
            SurfaceEvent::KeyUp { code, modifiers } => {
                let Some(key) = keycodes::lookup(code) else {
                    tracing::warn!(code = %code, "Unsupported keyboard key");
                    return out;
                };
                out.calls.push(GuestCall::KeyUp {
                    key,
                    modifiers: modifiers.bits(),
                });
            }
            SurfaceEvent::KeyPress {
                code,
                char_code,
                modifiers,
            } => {
                let is_delete = keycodes::lookup(code) == Some(keycodes::KEY_DELETE);
                if !is_delete && !modifiers.ctrl {
                    out.calls.push(GuestCall::KeyPress { key: *char_code });
                }
            }
            SurfaceEvent::Touch { phase, changed } => {
                out.prevent_default = true;
                for touch in changed {
                    let (x, y) = self.relative_position(surface, touch.client_x, touch.client_y);
                    out.calls.push(GuestCall::Touch {
                        phase: phase.code(),
                        id: touch.id,
                        x: x as f32,
                        y: y as f32,
                    });
                }
            }
            SurfaceEvent::Resize => {
                if let Some((width, height)) = self.resize(surface) {
                    out.calls.push(GuestCall::Resize { width, height });
                }
            }
            SurfaceEvent::Copy | SurfaceEvent::Cut => {
                if let Some(text) = clipboard {
                    out.clipboard_out = Some(text.to_owned());
                    out.prevent_default = true;
                }
            }
            SurfaceEvent::Paste { text } => {
                out.prevent_default = true;
                if !text.is_empty() {
                    out.calls.push(GuestCall::ClipboardPaste(text.clone()));
                }
            }
            SurfaceEvent::DragOver => {
                out.prevent_default = true;
            }
            SurfaceEvent::Drop { files } => {
                out.prevent_default = true;
                out.calls.push(GuestCall::FilesDroppedStart);
                for file in files {
                    out.calls.push(GuestCall::FileDropped {
                        name: file.name.clone(),
                        data: file.data.clone(),
                    });
                }
                out.calls.push(GuestCall::FilesDroppedFinish);
            }
            SurfaceEvent::Focus | SurfaceEvent::Blur | SurfaceEvent::VisibilityChange => {
                let focused = surface.has_focus();
                if focused != self.last_focus {
                    self.last_focus = focused;
                    out.calls.push(GuestCall::Focus(focused));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessSurface;

    fn running(width: f64, height: f64) -> (EventRouter, HeadlessSurface) {
        let mut surface = HeadlessSurface::new(width, height);
        let mut router = EventRouter::new(false);
        router.start(&mut surface).unwrap();
        (router, surface)
    }

    fn key_down(code: &str) -> SurfaceEvent {
        SurfaceEvent::KeyDown {
            code: code.to_owned(),
            modifiers: Modifiers::default(),
            repeat: false,
        }
    }

    #[test]
    fn start_attaches_every_listener_and_requests_a_frame() {
        let (router, surface) = running(10.0, 10.0);
        assert_eq!(surface.listener_count(), EventKind::ALL.len());
        assert!(surface.has_listener(ListenerTarget::Window, "paste"));
        assert!(surface.has_listener(ListenerTarget::Document, "visibilitychange"));
        assert!(surface.pending_frame().is_some());
        assert_eq!(router.state(), RouterState::Running);
    }

    #[test]
    fn teardown_is_terminal() {
        let (mut router, mut surface) = running(10.0, 10.0);
        router.teardown(&mut surface);
        assert_eq!(surface.listener_count(), 0);
        assert_eq!(surface.pending_frame(), None);
        assert_eq!(router.start(&mut surface), Err(RouterError::TornDown));
        let routed = router.route(&mut surface, &key_down("KeyA"), None);
        assert!(routed.calls.is_empty());
    }

    #[test]
    fn starting_twice_is_rejected() {
        let (mut router, mut surface) = running(10.0, 10.0);
        assert_eq!(router.start(&mut surface), Err(RouterError::AlreadyRunning));
        assert_eq!(surface.listener_count(), EventKind::ALL.len());
    }

    #[test]
    fn resize_fires_only_on_change() {
        let (mut router, mut surface) = running(200.0, 100.0);
        let first = router.route(&mut surface, &SurfaceEvent::Resize, None);
        assert_eq!(first.calls, vec![GuestCall::Resize { width: 200, height: 100 }]);
        let second = router.route(&mut surface, &SurfaceEvent::Resize, None);
        assert!(second.calls.is_empty());
    }

    #[test]
    fn high_dpi_scales_backing_size_and_positions() {
        let (mut router, mut surface) = running(100.0, 50.0);
        surface.set_device_pixel_ratio(2.0);
        surface.set_client_origin(10.0, 10.0);
        assert_eq!(router.resize(&mut surface), Some((100, 50)));
        router.set_high_dpi(true);
        assert_eq!(router.resize(&mut surface), Some((200, 100)));

        let routed = router.route(
            &mut surface,
            &SurfaceEvent::MouseMove {
                client_x: 15.5,
                client_y: 20.0,
                movement_x: 0.0,
                movement_y: 0.0,
            },
            None,
        );
        assert_eq!(routed.calls, vec![GuestCall::MouseMove { x: 11, y: 20 }]);
    }

    #[test]
    fn movement_adds_a_raw_mouse_move() {
        let (mut router, mut surface) = running(10.0, 10.0);
        let routed = router.route(
            &mut surface,
            &SurfaceEvent::MouseMove {
                client_x: 1.0,
                client_y: 2.0,
                movement_x: -3.5,
                movement_y: 0.0,
            },
            None,
        );
        assert_eq!(routed.calls[1], GuestCall::RawMouseMove { dx: -4, dy: 0 });
    }

    #[test]
    fn mouse_buttons_swap_middle_and_right() {
        assert_eq!(guest_mouse_button(0), 0);
        assert_eq!(guest_mouse_button(1), 2);
        assert_eq!(guest_mouse_button(2), 1);
        assert_eq!(guest_mouse_button(4), 4);
    }

    #[test]
    fn wheel_is_negated_and_suppressed() {
        let (mut router, mut surface) = running(10.0, 10.0);
        let routed = router.route(
            &mut surface,
            &SurfaceEvent::Wheel {
                delta_x: 1.0,
                delta_y: -120.0,
            },
            None,
        );
        assert!(routed.prevent_default);
        assert_eq!(routed.calls, vec![GuestCall::MouseWheel { dx: -1, dy: 120 }]);
    }

    #[test]
    fn space_keydown_also_presses_and_suppresses() {
        let (mut router, mut surface) = running(10.0, 10.0);
        let routed = router.route(&mut surface, &key_down("Space"), None);
        assert!(routed.prevent_default);
        assert_eq!(
            routed.calls,
            vec![
                GuestCall::KeyDown { key: 32, modifiers: 0, repeat: false },
                GuestCall::KeyPress { key: 32 },
            ]
        );
    }

    #[test]
    fn modifiers_are_packed() {
        let (mut router, mut surface) = running(10.0, 10.0);
        let routed = router.route(
            &mut surface,
            &SurfaceEvent::KeyUp {
                code: "KeyQ".into(),
                modifiers: Modifiers {
                    shift: true,
                    ctrl: true,
                    alt: false,
                    meta: true,
                },
            },
            None,
        );
        assert_eq!(routed.calls, vec![GuestCall::KeyUp { key: 81, modifiers: 11 }]);
        assert!(!routed.prevent_default);
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let (mut router, mut surface) = running(10.0, 10.0);
        let routed = router.route(&mut surface, &key_down("IntlYen"), None);
        assert!(routed.calls.is_empty());
        assert!(!routed.prevent_default);
    }

    #[test]
    fn keypress_skips_delete_and_ctrl() {
        let (mut router, mut surface) = running(10.0, 10.0);
        let press = |code: &str, ctrl: bool| SurfaceEvent::KeyPress {
            code: code.into(),
            char_code: 97,
            modifiers: Modifiers {
                ctrl,
                ..Modifiers::default()
            },
        };
        assert!(router.route(&mut surface, &press("Delete", false), None).calls.is_empty());
        assert!(router.route(&mut surface, &press("KeyA", true), None).calls.is_empty());
        assert_eq!(
            router.route(&mut surface, &press("KeyA", false), None).calls,
            vec![GuestCall::KeyPress { key: 97 }]
        );
    }

    #[test]
    fn touches_fan_out_per_changed_point() {
        let (mut router, mut surface) = running(10.0, 10.0);
        let routed = router.route(
            &mut surface,
            &SurfaceEvent::Touch {
                phase: TouchPhase::Moved,
                changed: vec![
                    TouchPoint { id: 3, client_x: 1.5, client_y: 2.0 },
                    TouchPoint { id: 4, client_x: 5.0, client_y: 6.0 },
                ],
            },
            None,
        );
        assert!(routed.prevent_default);
        assert_eq!(
            routed.calls,
            vec![
                GuestCall::Touch { phase: 11, id: 3, x: 1.5, y: 2.0 },
                GuestCall::Touch { phase: 11, id: 4, x: 5.0, y: 6.0 },
            ]
        );
    }

    #[test]
    fn copy_publishes_clipboard_only_when_set() {
        let (mut router, mut surface) = running(10.0, 10.0);
        let empty = router.route(&mut surface, &SurfaceEvent::Copy, None);
        assert_eq!(empty, RoutedEvent::default());
        let cut = router.route(&mut surface, &SurfaceEvent::Cut, Some("hello"));
        assert!(cut.prevent_default);
        assert_eq!(cut.clipboard_out.as_deref(), Some("hello"));
    }

    #[test]
    fn empty_paste_is_suppressed_but_not_delivered() {
        let (mut router, mut surface) = running(10.0, 10.0);
        let routed = router.route(&mut surface, &SurfaceEvent::Paste { text: String::new() }, None);
        assert!(routed.prevent_default);
        assert!(routed.calls.is_empty());
    }

    #[test]
    fn drop_is_bracketed_by_start_and_finish() {
        let (mut router, mut surface) = running(10.0, 10.0);
        let files = vec![
            DroppedFile { name: "a.txt".into(), data: b"A".to_vec() },
            DroppedFile { name: "b.txt".into(), data: b"BB".to_vec() },
        ];
        let routed = router.route(&mut surface, &SurfaceEvent::Drop { files }, None);
        assert_eq!(routed.calls.len(), 4);
        assert_eq!(routed.calls[0], GuestCall::FilesDroppedStart);
        assert_eq!(routed.calls[3], GuestCall::FilesDroppedFinish);
    }

    #[test]
    fn focus_fires_only_on_change() {
        let (mut router, mut surface) = running(10.0, 10.0);
        assert!(router.route(&mut surface, &SurfaceEvent::Focus, None).calls.is_empty());
        surface.set_focused(false);
        assert_eq!(
            router.route(&mut surface, &SurfaceEvent::Blur, None).calls,
            vec![GuestCall::Focus(false)]
        );
        assert!(router.route(&mut surface, &SurfaceEvent::VisibilityChange, None).calls.is_empty());
    }
}
