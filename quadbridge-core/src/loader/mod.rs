//! Guest module loading.
//!
//! Embedders hand over raw bytes that may be a binary module or WAT text; the
//! format is sniffed from the bytes rather than trusted from a file name.

use std::borrow::Cow;

use thiserror::Error;
use wasmtime::{Engine, Module};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unrecognized module format (expected wasm or wat)")]
    UnrecognizedFormat,

    #[error("failed to parse WAT")]
    Wat(#[from] wat::Error),

    #[error("failed to compile guest module")]
    Compile(#[source] wasmtime::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ModuleFormat {
    Wasm,
    Wat,
}

/// Sniff, convert WAT if needed, and compile.
pub fn load_module(engine: &Engine, bytes: &[u8]) -> Result<Module, LoadError> {
    let (format, wasm) = to_wasm_bytes(bytes)?;
    tracing::debug!(?format, len = wasm.len(), "compiling guest module");
    Module::new(engine, &wasm).map_err(LoadError::Compile)
}

/// Binary module bytes for `bytes`, borrowed when they already are binary.
pub fn to_wasm_bytes(bytes: &[u8]) -> Result<(ModuleFormat, Cow<'_, [u8]>), LoadError> {
    match sniff(bytes).ok_or(LoadError::UnrecognizedFormat)? {
        ModuleFormat::Wasm => Ok((ModuleFormat::Wasm, Cow::Borrowed(bytes))),
        ModuleFormat::Wat => {
            let wasm = wat::parse_bytes(bytes)?;
            Ok((ModuleFormat::Wat, Cow::Owned(wasm.into_owned())))
        }
    }
}

/// `\0asm` magic means binary; a `(` after an optional BOM and whitespace means WAT.
pub fn sniff(bytes: &[u8]) -> Option<ModuleFormat> {
    if bytes.starts_with(b"\0asm") {
        return Some(ModuleFormat::Wasm);
    }
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match body.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'(') => Some(ModuleFormat::Wat),
        _ => None,
    }
}
