//! Engine, store and linker for one session.

use wasmtime::{Instance, Linker, Module, Store};

use crate::abi::GuestEntrypoints;
use crate::loader;
use crate::session::SessionError;
use crate::state::HostState;

/// Host-side runtime container. The store data is the session's [`HostState`].
pub struct WasmtimeRuntime {
    pub engine: wasmtime::Engine,
    pub store: Store<HostState>,
    pub linker: Linker<HostState>,
}

impl WasmtimeRuntime {
    /// Create a runtime with a broad set of WebAssembly features enabled.
    ///
    /// Threads only make shared memories validate; the host never runs guest code
    /// off the session thread.
    pub fn new(state: HostState) -> Result<Self, anyhow::Error> {
        let mut cfg = wasmtime::Config::new();

        cfg.wasm_multi_value(true);
        cfg.wasm_bulk_memory(true);
        cfg.wasm_reference_types(true);
        cfg.wasm_simd(true);

        cfg.wasm_multi_memory(true);
        cfg.wasm_memory64(true);
        cfg.wasm_relaxed_simd(true);
        cfg.wasm_tail_call(true);
        cfg.wasm_function_references(true);
        cfg.wasm_gc(true);
        cfg.wasm_threads(true);
        cfg.wasm_exceptions(true);

        let engine = wasmtime::Engine::new(&cfg)?;
        let store = Store::new(&engine, state);
        let linker = Linker::new(&engine);

        Ok(Self {
            engine,
            store,
            linker,
        })
    }

    /// Define all host imports under module `"env"`.
    ///
    /// Must be called before `instantiate`.
    pub fn define_imports(&mut self) -> Result<(), anyhow::Error> {
        super::imports::define_imports(&mut self.linker)
    }

    /// Compile guest bytes (binary or WAT) against this runtime's engine.
    pub fn compile(&self, bytes: &[u8]) -> Result<Module, loader::LoadError> {
        loader::load_module(&self.engine, bytes)
    }

    /// Instantiate a module and resolve its entry points.
    pub fn instantiate(
        &mut self,
        module: &Module,
    ) -> Result<(Instance, GuestEntrypoints), SessionError> {
        let instance = self
            .linker
            .instantiate(&mut self.store, module)
            .map_err(SessionError::Instantiate)?;
        let entrypoints = GuestEntrypoints::resolve(&instance, &mut self.store)?;
        Ok((instance, entrypoints))
    }

    pub fn state(&self) -> &HostState {
        self.store.data()
    }

    pub fn state_mut(&mut self) -> &mut HostState {
        self.store.data_mut()
    }

    /// Consume the runtime and hand back the store data.
    pub fn into_state(self) -> HostState {
        self.store.into_data()
    }
}
