use crate::store::{StoreId, Stored};
use crate::{AsContext, AsContextMut, GlobalType, Result, UsageError, Val};
use std::mem::MaybeUninit;
use wasmbridge_c_api as ffi;

/// A WebAssembly global value, owned by its store.
#[derive(Copy, Clone, Debug)]
pub struct Global(pub(crate) Stored<ffi::wasmtime_global_t>);

impl Global {
    /// Creates a new global inside `store` with the type `ty` and initial
    /// value `val`.
    ///
    /// Fails with a usage error if `val` does not have the global's content
    /// type or references an object from another store.
    pub fn new(mut store: impl AsContextMut, ty: GlobalType, val: Val) -> Result<Global> {
        let mut cx = store.as_context_mut();
        let id = cx.store_id();
        val.check_type(ty.content())?;
        if !val.comes_from_same_store(id) {
            return Err(UsageError::CrossStore.into());
        }
        let native_ty = ty.to_native();
        let val = val.to_native();
        let mut ret = MaybeUninit::uninit();
        crate::error::check(unsafe {
            ffi::wasmtime_global_new(cx.native(), &native_ty, &val, &mut ret)
        })?;
        Ok(Global(Stored::new(id, unsafe { ret.assume_init() })))
    }

    pub(crate) fn from_raw(store: StoreId, raw: ffi::wasmtime_global_t) -> Global {
        Global(Stored::new(store, raw))
    }

    pub fn ty(&self, store: impl AsContext) -> Result<GlobalType> {
        let cx = store.as_context();
        let raw = self.0.get(cx.store_id())?;
        Ok(GlobalType::from_native(ffi::wasmtime_global_type(
            cx.native(),
            raw,
        )))
    }

    /// Returns the current value.
    pub fn get(&self, mut store: impl AsContextMut) -> Result<Val> {
        let mut cx = store.as_context_mut();
        let id = cx.store_id();
        let raw = *self.0.get(id)?;
        let mut out = MaybeUninit::uninit();
        crate::error::check(ffi::wasmtime_global_get(cx.native(), &raw, &mut out))?;
        Ok(unsafe { Val::from_native(&cx, out.assume_init()) })
    }

    /// Sets the value. Fails with a native error if the global is
    /// immutable, and with a usage error if `val` has the wrong type.
    pub fn set(&self, mut store: impl AsContextMut, val: Val) -> Result<()> {
        let mut cx = store.as_context_mut();
        let id = cx.store_id();
        let raw = *self.0.get(id)?;
        let ty = GlobalType::from_native(ffi::wasmtime_global_type(cx.native(), &raw));
        val.check_type(ty.content())?;
        if !val.comes_from_same_store(id) {
            return Err(UsageError::CrossStore.into());
        }
        let val = val.to_native();
        crate::error::check(unsafe { ffi::wasmtime_global_set(cx.native(), &raw, &val) })
    }
}
