#![allow(dead_code)]

use quadbridge_core::fs::{FileFetcher, InMemoryFetcher};
use quadbridge_core::gl::{CallLog, HeadlessContext};
use quadbridge_core::surface::HeadlessSurface;
use quadbridge_core::{HostBackends, Session, SessionConfig};

/// A running session plus probes into its headless backends.
pub struct Harness {
    pub session: Session,
    pub surface: HeadlessSurface,
    pub calls: CallLog,
}

pub fn backends(
    surface: &HeadlessSurface,
    graphics: HeadlessContext,
    fetcher: impl FileFetcher + 'static,
) -> HostBackends {
    HostBackends {
        surface: Box::new(surface.clone()),
        graphics: Box::new(graphics),
        fetcher: Box::new(fetcher),
    }
}

pub fn start(wat: &str) -> Harness {
    start_with(wat, HeadlessContext::new(), InMemoryFetcher::new())
}

pub fn start_with(
    wat: &str,
    graphics: HeadlessContext,
    fetcher: impl FileFetcher + 'static,
) -> Harness {
    quadbridge_core::init_logging();
    let surface = HeadlessSurface::new(800.0, 600.0);
    let calls = graphics.call_log();
    let session = Session::new(
        wat.as_bytes(),
        backends(&surface, graphics, fetcher),
        SessionConfig::default(),
    )
    .expect("guest should instantiate");
    Harness {
        session,
        surface,
        calls,
    }
}

impl Harness {
    pub fn i32_at(&mut self, ptr: u32) -> i32 {
        self.session
            .with_guest_memory(|mem| mem.read::<i32>(ptr).unwrap())
            .unwrap()
    }

    pub fn f32_at(&mut self, ptr: u32) -> f32 {
        self.session
            .with_guest_memory(|mem| mem.read::<f32>(ptr).unwrap())
            .unwrap()
    }

    pub fn bytes_at(&mut self, ptr: u32, len: usize) -> Vec<u8> {
        self.session
            .with_guest_memory(|mem| mem.bytes(ptr, len).unwrap().to_vec())
            .unwrap()
    }
}
