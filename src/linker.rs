use crate::error::check;
use crate::func::HostFuncEnv;
use crate::{
    AsContext, AsContextMut, Caller, Engine, Extern, FuncType, Instance, Module, Result,
    StoreContext, UsageError, Val,
};
use std::fmt;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr;
use wasmbridge_c_api as ffi;

/// Resolves module imports by name.
///
/// A `Linker` collects items under `module`/`name` pairs, the two-level
/// namespace WebAssembly imports use, and then instantiates modules by
/// looking each import up. Host functions defined with
/// [`Linker::func_new`] are not tied to a store: they are created afresh in
/// every store an instantiation happens in.
///
/// By default defining the same name twice is an error; see
/// [`Linker::allow_shadowing`].
pub struct Linker<T> {
    engine: Engine,
    raw: *mut ffi::wasmtime_linker_t,
    _marker: PhantomData<fn() -> T>,
}

// Everything the linker holds is either engine-level or a `Send + Sync` host
// closure.
unsafe impl<T> Send for Linker<T> {}
unsafe impl<T> Sync for Linker<T> {}

impl<T: 'static> Linker<T> {
    pub fn new(engine: &Engine) -> Linker<T> {
        let raw = ffi::wasmtime_linker_new(engine.native());
        log::trace!("created linker {raw:p}");
        Linker {
            engine: engine.clone(),
            raw,
            _marker: PhantomData,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Whether later definitions may replace earlier ones with the same name.
    pub fn allow_shadowing(&mut self, allow: bool) -> &mut Self {
        ffi::wasmtime_linker_allow_shadowing(self.native_mut(), allow);
        self
    }

    /// Defines `item` under `module`/`name`.
    ///
    /// Store-owned items only resolve imports of instantiations in the store
    /// they belong to.
    pub fn define(
        &mut self,
        store: impl AsContext<Data = T>,
        module: &str,
        name: &str,
        item: impl Into<Extern>,
    ) -> Result<&mut Self> {
        let cx = store.as_context();
        self.check_engine(&cx)?;
        let native = item.into().allocate_native(cx.store_id())?;
        let result = check(unsafe {
            ffi::wasmtime_linker_define(
                &mut *self.raw,
                cx.native(),
                module.as_ptr(),
                module.len(),
                name.as_ptr(),
                name.len(),
                native.as_raw(),
            )
        });
        native.release_native();
        result?;
        log::trace!("defined `{module}` `{name}`");
        Ok(self)
    }

    /// Defines a host function under `module`/`name`.
    ///
    /// Behaves like [`Func::new`](crate::Func::new) once instantiated. The
    /// closure is dropped when the linker, and every store it was
    /// instantiated into, is gone.
    pub fn func_new(
        &mut self,
        module: &str,
        name: &str,
        ty: FuncType,
        func: impl Fn(Caller<'_, T>, &[Val]) -> anyhow::Result<Vec<Val>> + Send + Sync + 'static,
    ) -> Result<&mut Self> {
        let native_ty = ty.to_native();
        let (callback, finalizer) = HostFuncEnv::<T>::callbacks();
        let env = HostFuncEnv::new(ty, func).into_raw();
        // The environment is finalized by the engine even if this fails.
        check(unsafe {
            ffi::wasmtime_linker_define_func(
                &mut *self.raw,
                module.as_ptr(),
                module.len(),
                name.as_ptr(),
                name.len(),
                native_ty.native(),
                callback,
                env,
                finalizer,
            )
        })?;
        log::trace!("defined host function `{module}` `{name}`");
        Ok(self)
    }

    /// Defines every export of `instance` under the module name `name`.
    pub fn instance(
        &mut self,
        mut store: impl AsContextMut<Data = T>,
        name: &str,
        instance: Instance,
    ) -> Result<&mut Self> {
        let mut cx = store.as_context_mut();
        self.check_engine(&cx.as_context())?;
        let raw = *instance.raw(cx.store_id())?;
        check(unsafe {
            ffi::wasmtime_linker_define_instance(
                &mut *self.raw,
                cx.native(),
                name.as_ptr(),
                name.len(),
                &raw,
            )
        })?;
        Ok(self)
    }

    /// Instantiates `module` and defines its exports under `name`.
    ///
    /// A trap in the module's start function is reported as a native error.
    pub fn module(
        &mut self,
        mut store: impl AsContextMut<Data = T>,
        name: &str,
        module: &Module,
    ) -> Result<&mut Self> {
        let mut cx = store.as_context_mut();
        self.check_engine(&cx.as_context())?;
        check(unsafe {
            ffi::wasmtime_linker_module(
                &mut *self.raw,
                cx.native(),
                name.as_ptr(),
                name.len(),
                module.native(),
            )
        })?;
        Ok(self)
    }

    /// Instantiates `module`, resolving every import by name.
    ///
    /// An import with no definition is a native error naming it.
    pub fn instantiate(
        &self,
        mut store: impl AsContextMut<Data = T>,
        module: &Module,
    ) -> Result<Instance> {
        let mut cx = store.as_context_mut();
        self.check_engine(&cx.as_context())?;
        let id = cx.store_id();
        let mut out = MaybeUninit::uninit();
        let mut trap = ptr::null_mut();
        let error = ffi::wasmtime_linker_instantiate(
            self.native(),
            cx.native(),
            module.native(),
            &mut out,
            &mut trap,
        );
        crate::error::check_call(error, trap)?;
        Ok(Instance::from_raw(id, unsafe { out.assume_init() }))
    }

    /// Looks up a definition, creating host functions in `store` as needed.
    pub fn get(
        &self,
        mut store: impl AsContextMut<Data = T>,
        module: &str,
        name: &str,
    ) -> Option<Extern> {
        let mut cx = store.as_context_mut();
        if !Engine::same(&self.engine, cx.engine()) {
            return None;
        }
        let id = cx.store_id();
        let mut item = MaybeUninit::uninit();
        let found = unsafe {
            ffi::wasmtime_linker_get(
                self.native(),
                cx.native(),
                module.as_ptr(),
                module.len(),
                name.as_ptr(),
                name.len(),
                &mut item,
            )
        };
        if found {
            Some(unsafe { Extern::from_uninit(id, &item) })
        } else {
            None
        }
    }

    pub fn close(self) {
        drop(self);
    }

    fn check_engine(&self, cx: &StoreContext<'_, T>) -> Result<()> {
        if Engine::same(&self.engine, cx.engine()) {
            Ok(())
        } else {
            Err(UsageError::CrossEngine.into())
        }
    }
}

impl<T> Linker<T> {
    fn native(&self) -> &ffi::wasmtime_linker_t {
        unsafe { &*self.raw }
    }

    fn native_mut(&mut self) -> &mut ffi::wasmtime_linker_t {
        unsafe { &mut *self.raw }
    }
}

impl<T> Drop for Linker<T> {
    fn drop(&mut self) {
        log::trace!("deleting linker {:p}", self.raw);
        unsafe { ffi::wasmtime_linker_delete(self.raw) };
    }
}

impl<T> fmt::Debug for Linker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Linker").field(&self.raw).finish()
    }
}
