//! Wasmtime glue.
//!
//! - `runtime`: engine, store and linker for one session, with the wasm feature
//!   flags guests rely on.
//! - `imports`: registry, console, surface, file and audio imports.
//! - `gl_imports`: the `gl*` vocabulary.

pub mod gl_imports;
pub mod imports;
pub mod runtime;

pub use runtime::WasmtimeRuntime;
