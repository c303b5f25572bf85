//! quadbridge-core: hosts a guest WASM/WAT module written against the miniquad
//! web ABI and bridges it to native graphics, audio, input and file services.
//!
//! The guest imports a GLES-shaped graphics vocabulary, a handle-based object API,
//! console, surface, file and audio functions from module `"env"` (see [`abi`]).
//! The host drives it through a [`Session`]:
//!
//! ```no_run
//! use quadbridge_core::fs::LocalFileFetcher;
//! use quadbridge_core::gl::HeadlessContext;
//! use quadbridge_core::surface::HeadlessSurface;
//! use quadbridge_core::{HostBackends, Session, SessionConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let bytes = std::fs::read("game.wasm")?;
//! let backends = HostBackends {
//!     surface: Box::new(HeadlessSurface::new(800.0, 600.0)),
//!     graphics: Box::new(HeadlessContext::new()),
//!     fetcher: Box::new(LocalFileFetcher::new("assets")),
//! };
//! let mut session = Session::new(&bytes, backends, SessionConfig::from_env())?;
//! while session.tick()? {}
//! let _backends = session.teardown();
//! # Ok(())
//! # }
//! ```

pub mod abi;
pub mod av;
pub mod config;
pub mod fs;
pub mod gl;
pub mod input;
pub mod loader;
pub mod memory;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod state;
pub mod surface;

pub use config::SessionConfig;
pub use input::{GuestCall, RoutedEvent, SurfaceEvent};
pub use session::{HostBackends, Session, SessionError};

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
