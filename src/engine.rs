use crate::Config;
use crate::error::check;
use std::fmt;
use std::ptr;
use std::sync::Arc;
use wasmbridge_c_api as ffi;

/// A shared compilation and runtime context.
///
/// Engines are cheap to clone: every clone, and every [`Store`](crate::Store),
/// [`Module`](crate::Module) and [`Linker`](crate::Linker) created from one,
/// holds a reference to the same native engine. The native engine is deleted
/// when the last of them goes away.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    raw: *mut ffi::wasm_engine_t,
}

// The native engine is immutable after construction and internally
// synchronized.
unsafe impl Send for EngineInner {}
unsafe impl Sync for EngineInner {}

impl Drop for EngineInner {
    fn drop(&mut self) {
        log::trace!("deleting engine {:p}", self.raw);
        unsafe { ffi::wasm_engine_delete(self.raw) };
    }
}

impl Engine {
    /// Creates an engine configured by `config`.
    ///
    /// Fails with a native error if the engine rejects the configuration.
    pub fn new(config: &Config) -> crate::Result<Engine> {
        let native = config.to_native();
        let mut raw = ptr::null_mut();
        // The config handle is consumed whether or not this succeeds.
        check(unsafe { ffi::wasm_engine_new_with_config(native, &mut raw) })?;
        log::debug!("created engine {raw:p} with {config:?}");
        Ok(Engine::from_raw(raw))
    }

    fn from_raw(raw: *mut ffi::wasm_engine_t) -> Engine {
        Engine {
            inner: Arc::new(EngineInner { raw }),
        }
    }

    /// Advances the epoch counter used for epoch-based interruption.
    ///
    /// May be called from any thread.
    pub fn increment_epoch(&self) {
        ffi::wasmtime_engine_increment_epoch(self.native());
    }

    /// Returns whether `a` and `b` are handles to the same native engine.
    pub fn same(a: &Engine, b: &Engine) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Drops this handle. The native engine is deleted once no store,
    /// module, linker or other clone refers to it.
    pub fn close(self) {
        drop(self);
    }

    pub(crate) fn native(&self) -> &ffi::wasm_engine_t {
        unsafe { &*self.inner.raw }
    }
}

impl Default for Engine {
    fn default() -> Engine {
        Engine::from_raw(ffi::wasm_engine_new())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Engine").field(&self.inner.raw).finish()
    }
}
