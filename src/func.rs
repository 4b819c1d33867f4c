//! Host functions and calls into guest functions.
//!
//! Host closures cross into the engine as three pieces: a boxed
//! [`HostFuncEnv`] leaked to a raw environment pointer, the [`trampoline`]
//! (a plain `extern "C"` function, monomorphized per store data type but
//! capturing nothing), and [`finalize_env`], which the engine calls exactly
//! once when the function can no longer be invoked. The finalizer is the only
//! path that frees the environment.

use crate::error::check_call;
use crate::store::{StoreId, Stored};
use crate::types::OwnedFuncType;
use crate::{
    AsContext, AsContextMut, Engine, Extern, FuncType, Result, StoreContext, StoreContextMut,
    UsageError, Val,
};
use anyhow::bail;
use std::any::Any;
use std::ffi::c_void;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use wasmbridge_c_api as ffi;

/// A WebAssembly function, either defined by a module or by the host.
///
/// `Func` is a copyable reference to a function owned by its store.
#[derive(Copy, Clone, Debug)]
pub struct Func(pub(crate) Stored<ffi::wasmtime_func_t>);

impl Func {
    /// Creates a new host-defined function in `store` with the signature
    /// `ty`, implemented by `func`.
    ///
    /// When the function is called, `func` receives the arguments already
    /// checked against `ty.params()`. It must return exactly
    /// `ty.results().len()` values of the declared types; anything else
    /// traps. Returning an error traps with that error's message, except
    /// for [`I32Exit`](crate::I32Exit), which surfaces to the original
    /// caller as an exit status. Panics are caught and also become traps.
    ///
    /// The closure is dropped when `store` is closed.
    pub fn new<T: 'static>(
        mut store: impl AsContextMut<Data = T>,
        ty: FuncType,
        func: impl Fn(Caller<'_, T>, &[Val]) -> anyhow::Result<Vec<Val>> + Send + Sync + 'static,
    ) -> Func {
        let mut cx = store.as_context_mut();
        let id = cx.store_id();
        let native_ty = ty.to_native();
        let env = HostFuncEnv::new(ty, func).into_raw();
        let mut out = MaybeUninit::uninit();
        unsafe {
            ffi::wasmtime_func_new(
                cx.native(),
                native_ty.native(),
                trampoline::<T>,
                env,
                Some(finalize_env::<T>),
                &mut out,
            );
        }
        Func(Stored::new(id, unsafe { out.assume_init() }))
    }

    pub(crate) fn from_raw(store: StoreId, raw: ffi::wasmtime_func_t) -> Func {
        Func(Stored::new(store, raw))
    }

    pub(crate) fn raw(&self) -> ffi::wasmtime_func_t {
        self.0.raw()
    }

    pub(crate) fn comes_from_same_store(&self, store: StoreId) -> bool {
        self.0.comes_from_same_store(store)
    }

    /// Returns the function's signature.
    pub fn ty(&self, store: impl AsContext) -> Result<FuncType> {
        let cx = store.as_context();
        let raw = self.0.get(cx.store_id())?;
        let native = unsafe { OwnedFuncType::from_raw(ffi::wasmtime_func_type(cx.native(), raw)) };
        Ok(unsafe { FuncType::from_native(native.native()) })
    }

    pub fn param_arity(&self, store: impl AsContext) -> Result<usize> {
        Ok(self.ty(store)?.params().len())
    }

    pub fn result_arity(&self, store: impl AsContext) -> Result<usize> {
        Ok(self.ty(store)?.results().len())
    }

    /// Invokes this function with `params`, returning its results.
    ///
    /// Argument count and types are checked before entering the engine and
    /// reported as [`Error::Usage`](crate::Error::Usage). A trap during
    /// execution, including one raised by a host function further down the
    /// stack, is returned as [`Error::Trap`](crate::Error::Trap) and no
    /// results are produced.
    pub fn call(&self, mut store: impl AsContextMut, params: &[Val]) -> Result<Vec<Val>> {
        let mut cx = store.as_context_mut();
        cx.release_dropped_refs();
        let id = cx.store_id();
        let raw = *self.0.get(id)?;
        let ty = self.ty(&cx)?;
        if params.len() != ty.params().len() {
            return Err(UsageError::ArityMismatch {
                expected: ty.params().len(),
                actual: params.len(),
            }
            .into());
        }
        for (param, expected) in params.iter().zip(ty.params()) {
            param.check_type(*expected)?;
            if !param.comes_from_same_store(id) {
                return Err(UsageError::CrossStore.into());
            }
        }

        let args = params.iter().map(Val::to_native).collect::<Vec<_>>();
        let mut results = ty
            .results()
            .iter()
            .map(|_| ffi::wasmtime_val_t::default())
            .collect::<Vec<_>>();
        let mut trap = ptr::null_mut();
        log::trace!("calling {ty}");
        let error = unsafe {
            ffi::wasmtime_func_call(
                cx.native(),
                &raw,
                args.as_ptr(),
                args.len(),
                results.as_mut_ptr(),
                results.len(),
                &mut trap,
            )
        };
        check_call(error, trap)?;
        Ok(results
            .into_iter()
            .map(|r| unsafe { Val::from_native(&cx, r) })
            .collect())
    }
}

/// The signature of closures backing host functions.
pub(crate) type HostFn<T> =
    dyn Fn(Caller<'_, T>, &[Val]) -> anyhow::Result<Vec<Val>> + Send + Sync + 'static;

/// A host closure pinned for the engine, together with its declared type.
pub(crate) struct HostFuncEnv<T> {
    ty: FuncType,
    func: Box<HostFn<T>>,
}

impl<T: 'static> HostFuncEnv<T> {
    pub(crate) fn new(
        ty: FuncType,
        func: impl Fn(Caller<'_, T>, &[Val]) -> anyhow::Result<Vec<Val>> + Send + Sync + 'static,
    ) -> HostFuncEnv<T> {
        HostFuncEnv {
            ty,
            func: Box::new(func),
        }
    }

    /// Leaks this environment. Only [`finalize_env`] may reclaim it.
    pub(crate) fn into_raw(self) -> *mut c_void {
        let env = Box::into_raw(Box::new(self));
        log::trace!("pinned host function environment {env:p}");
        env.cast()
    }

    /// The trampoline and finalizer to register alongside an environment.
    pub(crate) fn callbacks() -> (ffi::wasmtime_func_callback_t, ffi::wasm_finalizer_t) {
        (trampoline::<T>, Some(finalize_env::<T>))
    }

    fn invoke(
        &self,
        raw: *mut ffi::wasmtime_caller_t,
        args: &[ffi::wasmtime_val_t],
        results: &mut [ffi::wasmtime_val_t],
    ) -> anyhow::Result<()> {
        let mut caller = Caller::<T>::from_raw(raw);
        let mut cx = caller.as_context_mut();
        let store = cx.store_id();
        let params = args
            .iter()
            .map(|arg| unsafe { Val::from_native_borrowed(&mut cx, arg) })
            .collect::<Vec<_>>();

        let out = (self.func)(caller, &params)?;

        let expected = self.ty.results();
        if out.len() != expected.len() || out.len() != results.len() {
            bail!(UsageError::ResultCountMismatch {
                expected: expected.len(),
                actual: out.len(),
            });
        }
        for (val, ty) in out.iter().zip(expected) {
            val.check_type(*ty)?;
            if !val.comes_from_same_store(store) {
                bail!(UsageError::CrossStore);
            }
        }
        let mut caller = Caller::<T>::from_raw(raw);
        let mut cx = caller.as_context_mut();
        for (slot, val) in results.iter_mut().zip(&out) {
            *slot = val.to_owned_native(&mut cx);
        }
        Ok(())
    }
}

unsafe extern "C" fn trampoline<T: 'static>(
    env: *mut c_void,
    caller: *mut ffi::wasmtime_caller_t,
    args: *const ffi::wasmtime_val_t,
    nargs: usize,
    results: *mut ffi::wasmtime_val_t,
    nresults: usize,
) -> *mut ffi::wasm_trap_t {
    let env = unsafe { &*env.cast::<HostFuncEnv<T>>() };
    let args = if nargs == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(args, nargs) }
    };
    let results = if nresults == 0 {
        &mut [][..]
    } else {
        unsafe { std::slice::from_raw_parts_mut(results, nresults) }
    };
    log::trace!("entering host function {}", env.ty);

    // A panic must not unwind into the engine.
    match panic::catch_unwind(AssertUnwindSafe(|| env.invoke(caller, args, results))) {
        Ok(Ok(())) => ptr::null_mut(),
        Ok(Err(err)) => error_to_trap(err),
        Err(panic) => {
            let message = panic_message(&*panic);
            log::debug!("host function panicked: {message}");
            new_trap(&message)
        }
    }
}

unsafe extern "C" fn finalize_env<T>(env: *mut c_void) {
    log::trace!("releasing host function environment {env:p}");
    drop(unsafe { Box::from_raw(env.cast::<HostFuncEnv<T>>()) });
}

fn error_to_trap(err: anyhow::Error) -> *mut ffi::wasm_trap_t {
    if let Some(exit) = err.downcast_ref::<ffi::I32Exit>() {
        log::debug!("host function requested exit with status {}", exit.0);
        return ffi::wasmtime_trap_new_exit(exit.0);
    }
    log::debug!("host function failed: {err:?}");
    new_trap(&err.to_string())
}

fn new_trap(message: &str) -> *mut ffi::wasm_trap_t {
    unsafe { ffi::wasmtime_trap_new(message.as_ptr(), message.len()) }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg.to_string()
    } else {
        "host function panicked".to_string()
    }
}

/// The context a host function is invoked in.
///
/// Gives access to the calling store's data and to the exports of the
/// calling instance. Only valid for the duration of the call.
pub struct Caller<'a, T> {
    raw: *mut ffi::wasmtime_caller_t,
    _marker: PhantomData<&'a mut T>,
}

impl<T> Caller<'_, T> {
    fn from_raw(raw: *mut ffi::wasmtime_caller_t) -> Self {
        Caller {
            raw,
            _marker: PhantomData,
        }
    }

    pub fn data(&self) -> &T {
        self.as_context().data()
    }

    pub fn data_mut(&mut self) -> &mut T {
        self.as_context_mut().into_data()
    }

    pub fn engine(&self) -> &Engine {
        self.as_context().engine()
    }

    /// Looks up an export of the calling instance.
    ///
    /// Returns `None` if there is no export named `name`, or if the function
    /// was called directly by the host rather than by an instance.
    pub fn get_export(&mut self, name: &str) -> Option<Extern> {
        let store = self.as_context().store_id();
        let mut item = MaybeUninit::uninit();
        let found = unsafe {
            ffi::wasmtime_caller_export_get(&mut *self.raw, name.as_ptr(), name.len(), &mut item)
        };
        if found {
            Some(unsafe { Extern::from_uninit(store, &item) })
        } else {
            None
        }
    }

    fn context(&self) -> *mut ffi::wasmtime_context_t {
        ffi::wasmtime_caller_context(unsafe { &mut *self.raw })
    }
}

impl<T> AsContext for Caller<'_, T> {
    type Data = T;

    #[inline]
    fn as_context(&self) -> StoreContext<'_, T> {
        unsafe { StoreContext::from_raw(self.context()) }
    }
}

impl<T> AsContextMut for Caller<'_, T> {
    #[inline]
    fn as_context_mut(&mut self) -> StoreContextMut<'_, T> {
        unsafe { StoreContextMut::from_raw(self.context()) }
    }
}
