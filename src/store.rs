//! Stores and the views derived from them.
//!
//! A [`Store`] owns one native store together with the host's `T`. The `T`
//! is pinned in a box whose pointer is handed to the engine as the store's
//! user data, along with a finalizer monomorphized for `T`; the engine calls
//! that finalizer exactly once when the native store is deleted. Everything
//! created inside a store (functions, globals, tables, memories, instances)
//! is owned by the engine and goes away with it.

use crate::Engine;
use crate::r#ref::DroppedRefs;
use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use wasmbridge_c_api as ffi;

mod context;
mod data;

pub use self::context::*;
pub(crate) use self::data::*;

/// What the engine holds as the store's user data.
pub(crate) struct StoreInner<T> {
    pub(crate) id: StoreId,
    pub(crate) engine: Engine,
    pub(crate) dropped: Arc<DroppedRefs>,
    pub(crate) data: T,
}

unsafe extern "C" fn drop_inner<T>(ptr: *mut c_void) {
    log::trace!("releasing store data {ptr:p}");
    drop(unsafe { Box::from_raw(ptr.cast::<StoreInner<T>>()) });
}

/// A collection of WebAssembly instances and host-defined state.
///
/// Stores are single-owner: they are `Send` when `T` is, and never `Sync`.
pub struct Store<T> {
    raw: *mut ffi::wasmtime_store_t,
    context: *mut ffi::wasmtime_context_t,
    id: StoreId,
    _marker: PhantomData<fn() -> T>,
}

unsafe impl<T: Send> Send for Store<T> {}

impl<T: 'static> Store<T> {
    /// Creates a new store attached to `engine` holding `data`.
    pub fn new(engine: &Engine, data: T) -> Store<T> {
        let id = StoreId::allocate();
        let inner = Box::into_raw(Box::new(StoreInner {
            id,
            engine: engine.clone(),
            dropped: Arc::default(),
            data,
        }));
        let raw = ffi::wasmtime_store_new(engine.native(), inner.cast(), Some(drop_inner::<T>));
        let context = ffi::wasmtime_store_context(unsafe { &mut *raw });
        log::trace!("created {id:?}");
        Store {
            raw,
            context,
            id,
            _marker: PhantomData,
        }
    }
}

impl<T> Store<T> {
    pub fn engine(&self) -> &Engine {
        self.as_context().engine()
    }

    pub fn data(&self) -> &T {
        self.as_context().data()
    }

    pub fn data_mut(&mut self) -> &mut T {
        self.as_context_mut().into_data()
    }

    /// Replaces the host data, dropping the old value.
    pub fn set_data(&mut self, data: T) {
        self.as_context_mut().set_data(data)
    }

    pub fn gc(&mut self) {
        self.as_context_mut().gc()
    }

    pub fn set_fuel(&mut self, fuel: u64) -> crate::Result<()> {
        self.as_context_mut().set_fuel(fuel)
    }

    pub fn get_fuel(&self) -> crate::Result<u64> {
        self.as_context().get_fuel()
    }

    pub fn add_fuel(&mut self, fuel: u64) -> crate::Result<()> {
        self.as_context_mut().add_fuel(fuel)
    }

    pub fn consume_fuel(&mut self, fuel: u64) -> crate::Result<u64> {
        self.as_context_mut().consume_fuel(fuel)
    }

    pub fn set_epoch_deadline(&mut self, ticks_beyond_current: u64) {
        self.as_context_mut().set_epoch_deadline(ticks_beyond_current)
    }

    /// Deletes the native store, dropping the host data and every object
    /// created within the store, including the data of every `externref`.
    pub fn close(self) {
        drop(self);
    }
}

impl<T> AsContext for Store<T> {
    type Data = T;

    #[inline]
    fn as_context(&self) -> StoreContext<'_, T> {
        unsafe { StoreContext::from_raw(self.context) }
    }
}

impl<T> AsContextMut for Store<T> {
    #[inline]
    fn as_context_mut(&mut self) -> StoreContextMut<'_, T> {
        unsafe { StoreContextMut::from_raw(self.context) }
    }
}

impl<T> Drop for Store<T> {
    fn drop(&mut self) {
        log::trace!("deleting {:?}", self.id);
        self.as_context_mut().release_dropped_refs();
        unsafe { ffi::wasmtime_store_delete(self.raw) };
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("data", self.data())
            .finish()
    }
}
