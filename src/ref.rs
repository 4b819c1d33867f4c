use crate::store::StoreId;
use crate::{AsContextMut, Result, StoreContext, StoreContextMut, UsageError};
use std::any::Any;
use std::ffi::c_void;
use std::fmt;
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use wasmbridge_c_api as ffi;

type HostData = Box<dyn Any + Send + Sync>;

unsafe extern "C" fn drop_host_data(ptr: *mut c_void) {
    log::trace!("finalizing externref data {ptr:p}");
    drop(unsafe { Box::from_raw(ptr.cast::<HostData>()) });
}

/// An opaque reference to host data that guest code can hold and pass
/// around but never look inside.
///
/// Cloning is cheap and shares one native root. When the last clone is
/// dropped the root is queued on its store and released by the next
/// [`Store::gc`](crate::Store::gc) or function call, or when the store is
/// closed. The host data itself is dropped by the collector once neither the
/// host nor any guest location refers to it.
///
/// Dropping the last clone after its store was closed leaks the small native
/// handle; the host data is already gone by then.
#[derive(Clone)]
pub struct ExternRef(Arc<RootedRef>);

struct RootedRef {
    store: StoreId,
    raw: *mut ffi::wasmtime_externref_t,
    dropped: Arc<DroppedRefs>,
}

unsafe impl Send for RootedRef {}
unsafe impl Sync for RootedRef {}

impl Drop for RootedRef {
    fn drop(&mut self) {
        self.dropped.push(self.raw);
    }
}

impl ExternRef {
    /// Creates a new reference to `data` inside `store`.
    pub fn new<T>(mut store: impl AsContextMut, data: T) -> Result<ExternRef>
    where
        T: Any + Send + Sync,
    {
        let mut cx = store.as_context_mut();
        let data = Box::into_raw(Box::new(Box::new(data) as HostData));
        let mut raw = ptr::null_mut();
        // On failure the engine has already run the finalizer over `data`.
        crate::error::check(ffi::wasmtime_externref_new(
            cx.native(),
            data.cast(),
            Some(drop_host_data),
            &mut raw,
        ))?;
        log::trace!("created externref {raw:p} over {data:p}");
        Ok(ExternRef::adopt(&cx, raw))
    }

    /// Takes ownership of a native handle rooted in `cx`'s store.
    pub(crate) fn adopt<T>(
        cx: &StoreContextMut<'_, T>,
        raw: *mut ffi::wasmtime_externref_t,
    ) -> ExternRef {
        ExternRef(Arc::new(RootedRef {
            store: cx.store_id(),
            raw,
            dropped: cx.dropped_refs(),
        }))
    }

    /// The native handle, borrowed for as long as `self` lives.
    pub(crate) fn as_raw(&self) -> *mut ffi::wasmtime_externref_t {
        self.0.raw
    }

    /// A new native handle to this reference, owned by the caller.
    pub(crate) fn clone_raw<T>(
        &self,
        cx: &mut StoreContextMut<'_, T>,
    ) -> *mut ffi::wasmtime_externref_t {
        ffi::wasmtime_externref_clone(cx.native(), unsafe { &*self.0.raw })
    }

    pub(crate) fn comes_from_same_store(&self, store: StoreId) -> bool {
        self.0.store == store
    }

    /// Borrows the host data if it is a `T`.
    ///
    /// Returns `Ok(None)` if the data has another type.
    pub fn data<'a, T, D>(&self, store: impl Into<StoreContext<'a, D>>) -> Result<Option<&'a T>>
    where
        T: Any,
        D: 'a,
    {
        let cx = store.into();
        if !self.comes_from_same_store(cx.store_id()) {
            return Err(UsageError::CrossStore.into());
        }
        let ptr = ffi::wasmtime_externref_data(cx.native(), unsafe { &*self.0.raw });
        if ptr.is_null() {
            return Ok(None);
        }
        let data = unsafe { &*ptr.cast::<HostData>() };
        Ok((**data).downcast_ref::<T>())
    }
}

impl fmt::Debug for ExternRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternRef")
            .field("store", &self.0.store)
            .field("raw", &self.0.raw)
            .finish()
    }
}

struct DroppedRef(*mut ffi::wasmtime_externref_t);

unsafe impl Send for DroppedRef {}

/// Native `externref` handles whose last [`ExternRef`] was dropped, waiting
/// for their store to release the roots they hold.
#[derive(Default)]
pub(crate) struct DroppedRefs(Mutex<Vec<DroppedRef>>);

impl DroppedRefs {
    fn push(&self, raw: *mut ffi::wasmtime_externref_t) {
        self.lock().push(DroppedRef(raw));
    }

    /// Unroots everything queued so far. `cx` must be the store's context.
    pub(crate) fn release(&self, cx: &mut ffi::wasmtime_context_t) {
        let pending = std::mem::take(&mut *self.lock());
        if pending.is_empty() {
            return;
        }
        log::trace!("unrooting {} dropped externrefs", pending.len());
        for DroppedRef(raw) in pending {
            unsafe { ffi::wasmtime_externref_unroot(cx, raw) };
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DroppedRef>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
