//! Drawing surface abstraction.
//!
//! The embedder owns the real window or canvas. The bridge only needs its sizes,
//! a few window-management toggles, listener registration and frame scheduling.
//! Moving a `Box<dyn Surface>` into a session is what binds the two, so a surface
//! can never be driven by two sessions at once.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Object a listener is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ListenerTarget {
    Canvas,
    Window,
    Document,
}

/// Registration returned by [`Surface::attach_listener`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Pending frame request returned by [`Surface::request_frame`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

pub trait Surface {
    /// Layout size in logical pixels.
    fn client_size(&self) -> (f64, f64);
    /// Top-left corner of the surface in client coordinates.
    fn client_origin(&self) -> (f64, f64);
    fn device_pixel_ratio(&self) -> f64;

    /// Backing store resolution in physical pixels.
    fn backing_size(&self) -> (u32, u32);
    fn set_backing_size(&mut self, width: u32, height: u32);

    fn set_cursor(&mut self, cursor: &str);
    fn set_cursor_grab(&mut self, grab: bool);
    fn is_fullscreen(&self) -> bool;
    fn set_fullscreen(&mut self, fullscreen: bool);
    fn has_focus(&self) -> bool;

    fn attach_listener(&mut self, target: ListenerTarget, event: &'static str) -> ListenerId;
    fn detach_listener(&mut self, id: ListenerId);

    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);

    /// Operator-visible alert for unrecoverable native failures.
    fn alert(&mut self, message: &str);
}

#[derive(Debug)]
struct HeadlessInner {
    client_size: (f64, f64),
    client_origin: (f64, f64),
    device_pixel_ratio: f64,
    backing_size: (u32, u32),
    cursor: String,
    cursor_grabbed: bool,
    fullscreen: bool,
    focused: bool,
    listeners: BTreeMap<ListenerId, (ListenerTarget, &'static str)>,
    next_listener: u64,
    pending_frame: Option<FrameHandle>,
    next_frame: u64,
    alerts: Vec<String>,
}

/// In-process surface with no window behind it.
///
/// Clones share state, so a test can keep a clone for inspection after moving
/// the original into a session.
#[derive(Clone, Debug)]
pub struct HeadlessSurface {
    inner: Rc<RefCell<HeadlessInner>>,
}

impl HeadlessSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            inner: Rc::new(RefCell::new(HeadlessInner {
                client_size: (width, height),
                client_origin: (0.0, 0.0),
                device_pixel_ratio: 1.0,
                backing_size: (300, 150),
                cursor: String::from("default"),
                cursor_grabbed: false,
                fullscreen: false,
                focused: true,
                listeners: BTreeMap::new(),
                next_listener: 1,
                pending_frame: None,
                next_frame: 1,
                alerts: Vec::new(),
            })),
        }
    }

    pub fn set_client_size(&self, width: f64, height: f64) {
        self.inner.borrow_mut().client_size = (width, height);
    }

    pub fn set_client_origin(&self, x: f64, y: f64) {
        self.inner.borrow_mut().client_origin = (x, y);
    }

    pub fn set_device_pixel_ratio(&self, ratio: f64) {
        self.inner.borrow_mut().device_pixel_ratio = ratio;
    }

    pub fn set_focused(&self, focused: bool) {
        self.inner.borrow_mut().focused = focused;
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    pub fn has_listener(&self, target: ListenerTarget, event: &str) -> bool {
        self.inner
            .borrow()
            .listeners
            .values()
            .any(|&(t, e)| t == target && e == event)
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.inner.borrow().pending_frame
    }

    pub fn cursor(&self) -> String {
        self.inner.borrow().cursor.clone()
    }

    pub fn cursor_grabbed(&self) -> bool {
        self.inner.borrow().cursor_grabbed
    }

    pub fn alerts(&self) -> Vec<String> {
        self.inner.borrow().alerts.clone()
    }
}

impl Surface for HeadlessSurface {
    fn client_size(&self) -> (f64, f64) {
        self.inner.borrow().client_size
    }

    fn client_origin(&self) -> (f64, f64) {
        self.inner.borrow().client_origin
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.inner.borrow().device_pixel_ratio
    }

    fn backing_size(&self) -> (u32, u32) {
        self.inner.borrow().backing_size
    }

    fn set_backing_size(&mut self, width: u32, height: u32) {
        self.inner.borrow_mut().backing_size = (width, height);
    }

    fn set_cursor(&mut self, cursor: &str) {
        self.inner.borrow_mut().cursor = cursor.to_owned();
    }

    fn set_cursor_grab(&mut self, grab: bool) {
        self.inner.borrow_mut().cursor_grabbed = grab;
    }

    fn is_fullscreen(&self) -> bool {
        self.inner.borrow().fullscreen
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.inner.borrow_mut().fullscreen = fullscreen;
    }

    fn has_focus(&self) -> bool {
        self.inner.borrow().focused
    }

    fn attach_listener(&mut self, target: ListenerTarget, event: &'static str) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.insert(id, (target, event));
        id
    }

    fn detach_listener(&mut self, id: ListenerId) {
        self.inner.borrow_mut().listeners.remove(&id);
    }

    fn request_frame(&mut self) -> FrameHandle {
        let mut inner = self.inner.borrow_mut();
        let handle = FrameHandle(inner.next_frame);
        inner.next_frame += 1;
        inner.pending_frame = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let mut inner = self.inner.borrow_mut();
        if inner.pending_frame == Some(handle) {
            inner.pending_frame = None;
        }
    }

    fn alert(&mut self, message: &str) {
        self.inner.borrow_mut().alerts.push(message.to_owned());
    }
}
