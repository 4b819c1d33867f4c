use crate::Engine;
use crate::r#ref::DroppedRefs;
use crate::store::{StoreId, StoreInner};
use std::marker::PhantomData;
use std::sync::Arc;
use wasmbridge_c_api as ffi;

/// A temporary, shared view of a [`Store`](crate::Store).
pub struct StoreContext<'a, T> {
    raw: *mut ffi::wasmtime_context_t,
    _marker: PhantomData<&'a T>,
}

/// A temporary, exclusive view of a [`Store`](crate::Store).
///
/// Every store-scoped operation in this crate goes through one of these. The
/// borrow it carries is what keeps the native context from being used after
/// its store is gone.
pub struct StoreContextMut<'a, T> {
    raw: *mut ffi::wasmtime_context_t,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> StoreContext<'a, T> {
    pub(crate) unsafe fn from_raw(raw: *mut ffi::wasmtime_context_t) -> StoreContext<'a, T> {
        StoreContext {
            raw,
            _marker: PhantomData,
        }
    }

    fn inner(&self) -> &'a StoreInner<T> {
        unsafe { &*inner_ptr::<T>(self.raw) }
    }

    pub(crate) fn store_id(&self) -> StoreId {
        self.inner().id
    }

    pub(crate) fn dropped_refs(&self) -> Arc<DroppedRefs> {
        self.inner().dropped.clone()
    }

    /// The native context. Only valid for the duration of this view.
    pub(crate) fn native(&self) -> &mut ffi::wasmtime_context_t {
        unsafe { &mut *self.raw }
    }

    pub fn data(&self) -> &'a T {
        &self.inner().data
    }

    pub fn engine(&self) -> &'a Engine {
        &self.inner().engine
    }

    /// Returns the remaining fuel. Fails if fuel consumption is disabled in
    /// the engine's [`Config`](crate::Config).
    pub fn get_fuel(&self) -> crate::Result<u64> {
        let mut fuel = 0;
        crate::error::check(ffi::wasmtime_context_get_fuel(self.native(), &mut fuel))?;
        Ok(fuel)
    }
}

impl<'a, T> StoreContextMut<'a, T> {
    pub(crate) unsafe fn from_raw(raw: *mut ffi::wasmtime_context_t) -> StoreContextMut<'a, T> {
        StoreContextMut {
            raw,
            _marker: PhantomData,
        }
    }

    pub(crate) fn store_id(&self) -> StoreId {
        self.as_context().store_id()
    }

    pub(crate) fn dropped_refs(&self) -> Arc<DroppedRefs> {
        self.as_context().dropped_refs()
    }

    /// Releases the roots of every [`ExternRef`](crate::ExternRef) of this
    /// store dropped since the last release.
    pub(crate) fn release_dropped_refs(&mut self) {
        let dropped = self.dropped_refs();
        dropped.release(self.native());
    }

    pub(crate) fn native(&mut self) -> &mut ffi::wasmtime_context_t {
        unsafe { &mut *self.raw }
    }

    pub fn data(&self) -> &T {
        unsafe { &(*inner_ptr::<T>(self.raw)).data }
    }

    pub fn data_mut(&mut self) -> &mut T {
        unsafe { &mut (*inner_ptr::<T>(self.raw)).data }
    }

    /// Consumes the view, returning the data with the full borrow lifetime.
    pub fn into_data(self) -> &'a mut T {
        unsafe { &mut (*inner_ptr::<T>(self.raw)).data }
    }

    pub fn engine(&self) -> &Engine {
        self.as_context().engine()
    }

    /// Replaces the store's data. The previous value is dropped exactly once,
    /// after the new value has been installed.
    pub fn set_data(&mut self, data: T) {
        let old = inner_ptr::<T>(self.raw);
        let (id, engine, dropped) =
            unsafe { ((*old).id, (*old).engine.clone(), (*old).dropped.clone()) };
        let new = Box::into_raw(Box::new(StoreInner {
            id,
            engine,
            dropped,
            data,
        }));
        ffi::wasmtime_context_set_data(self.native(), new.cast());
        log::trace!("replaced data of {id:?}");
        drop(unsafe { Box::from_raw(old) });
    }

    /// Collects unreachable `externref`s, running their finalizers. This
    /// includes those whose last [`ExternRef`](crate::ExternRef) was
    /// dropped.
    pub fn gc(&mut self) {
        self.release_dropped_refs();
        ffi::wasmtime_context_gc(self.native());
    }

    /// Sets the fuel available to WebAssembly executed in this store.
    pub fn set_fuel(&mut self, fuel: u64) -> crate::Result<()> {
        crate::error::check(ffi::wasmtime_context_set_fuel(self.native(), fuel))
    }

    pub fn get_fuel(&self) -> crate::Result<u64> {
        self.as_context().get_fuel()
    }

    /// Adds to the remaining fuel, saturating at `u64::MAX`.
    pub fn add_fuel(&mut self, fuel: u64) -> crate::Result<()> {
        let remaining = self.get_fuel()?;
        self.set_fuel(remaining.saturating_add(fuel))
    }

    /// Takes `fuel` away from what remains and returns what is left.
    pub fn consume_fuel(&mut self, fuel: u64) -> crate::Result<u64> {
        let remaining = self.get_fuel()?;
        let left = remaining.checked_sub(fuel).ok_or(crate::UsageError::InsufficientFuel {
            requested: fuel,
            remaining,
        })?;
        self.set_fuel(left)?;
        Ok(left)
    }

    /// Configures the epoch deadline relative to the engine's current epoch.
    /// Has no effect unless epoch interruption is enabled.
    pub fn set_epoch_deadline(&mut self, ticks_beyond_current: u64) {
        ffi::wasmtime_context_set_epoch_deadline(self.native(), ticks_beyond_current);
    }
}

fn inner_ptr<T>(raw: *mut ffi::wasmtime_context_t) -> *mut StoreInner<T> {
    ffi::wasmtime_context_get_data(unsafe { &mut *raw }).cast()
}

/// A trait for things which can provide a shared view of a store.
pub trait AsContext {
    /// The host data type of the store.
    type Data;

    fn as_context(&self) -> StoreContext<'_, Self::Data>;
}

/// A trait for things which can provide an exclusive view of a store.
pub trait AsContextMut: AsContext {
    fn as_context_mut(&mut self) -> StoreContextMut<'_, Self::Data>;
}

impl<T> AsContext for StoreContext<'_, T> {
    type Data = T;

    #[inline]
    fn as_context(&self) -> StoreContext<'_, T> {
        StoreContext {
            raw: self.raw,
            _marker: PhantomData,
        }
    }
}

impl<T> AsContext for StoreContextMut<'_, T> {
    type Data = T;

    #[inline]
    fn as_context(&self) -> StoreContext<'_, T> {
        StoreContext {
            raw: self.raw,
            _marker: PhantomData,
        }
    }
}

impl<T> AsContextMut for StoreContextMut<'_, T> {
    #[inline]
    fn as_context_mut(&mut self) -> StoreContextMut<'_, T> {
        StoreContextMut {
            raw: self.raw,
            _marker: PhantomData,
        }
    }
}

// forward AsContext for &T
impl<T: AsContext> AsContext for &'_ T {
    type Data = T::Data;

    #[inline]
    fn as_context(&self) -> StoreContext<'_, T::Data> {
        T::as_context(*self)
    }
}

// forward AsContext for &mut T
impl<T: AsContext> AsContext for &'_ mut T {
    type Data = T::Data;

    #[inline]
    fn as_context(&self) -> StoreContext<'_, T::Data> {
        T::as_context(*self)
    }
}

// forward AsContextMut for &mut T
impl<T: AsContextMut> AsContextMut for &'_ mut T {
    #[inline]
    fn as_context_mut(&mut self) -> StoreContextMut<'_, T::Data> {
        T::as_context_mut(*self)
    }
}

impl<'a, T: AsContext> From<&'a T> for StoreContext<'a, T::Data> {
    fn from(t: &'a T) -> StoreContext<'a, T::Data> {
        t.as_context()
    }
}

impl<'a, T: AsContext> From<&'a mut T> for StoreContext<'a, T::Data> {
    fn from(t: &'a mut T) -> StoreContext<'a, T::Data> {
        T::as_context(t)
    }
}

impl<'a, T: AsContextMut> From<&'a mut T> for StoreContextMut<'a, T::Data> {
    fn from(t: &'a mut T) -> StoreContextMut<'a, T::Data> {
        t.as_context_mut()
    }
}
