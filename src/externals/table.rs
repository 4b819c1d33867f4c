use crate::store::{StoreId, Stored};
use crate::{AsContext, AsContextMut, Result, TableType, UsageError, Val};
use std::mem::MaybeUninit;
use wasmbridge_c_api as ffi;

/// A WebAssembly table of references, owned by its store.
#[derive(Copy, Clone, Debug)]
pub struct Table(pub(crate) Stored<ffi::wasmtime_table_t>);

impl Table {
    /// Creates a new table with every element set to `init`.
    pub fn new(mut store: impl AsContextMut, ty: TableType, init: Val) -> Result<Table> {
        let mut cx = store.as_context_mut();
        let id = cx.store_id();
        check_element(id, ty, &init)?;
        let native_ty = ty.to_native();
        let init = init.to_native();
        let mut out = MaybeUninit::uninit();
        crate::error::check(unsafe {
            ffi::wasmtime_table_new(cx.native(), &native_ty, &init, &mut out)
        })?;
        Ok(Table(Stored::new(id, unsafe { out.assume_init() })))
    }

    pub(crate) fn from_raw(store: StoreId, raw: ffi::wasmtime_table_t) -> Table {
        Table(Stored::new(store, raw))
    }

    pub fn ty(&self, store: impl AsContext) -> Result<TableType> {
        let cx = store.as_context();
        let raw = self.0.get(cx.store_id())?;
        Ok(TableType::from_native(ffi::wasmtime_table_type(cx.native(), raw)))
    }

    /// Current number of elements.
    pub fn size(&self, store: impl AsContext) -> Result<u64> {
        let cx = store.as_context();
        let raw = self.0.get(cx.store_id())?;
        Ok(ffi::wasmtime_table_size(cx.native(), raw))
    }

    /// Returns the element at `index`, or `None` if it is out of bounds.
    pub fn get(&self, mut store: impl AsContextMut, index: u64) -> Result<Option<Val>> {
        let mut cx = store.as_context_mut();
        let id = cx.store_id();
        let raw = *self.0.get(id)?;
        let mut found = false;
        let mut out = MaybeUninit::uninit();
        crate::error::check(ffi::wasmtime_table_get(
            cx.native(),
            &raw,
            index,
            &mut found,
            &mut out,
        ))?;
        if !found {
            return Ok(None);
        }
        Ok(Some(unsafe { Val::from_native(&cx, out.assume_init()) }))
    }

    /// Writes `val` at `index`. Out-of-bounds indices are a native error.
    pub fn set(&self, mut store: impl AsContextMut, index: u64, val: Val) -> Result<()> {
        let mut cx = store.as_context_mut();
        let id = cx.store_id();
        let raw = *self.0.get(id)?;
        let ty = TableType::from_native(ffi::wasmtime_table_type(cx.native(), &raw));
        check_element(id, ty, &val)?;
        let val = val.to_native();
        crate::error::check(unsafe {
            ffi::wasmtime_table_set(cx.native(), &raw, index, &val)
        })
    }

    /// Grows the table by `delta` elements set to `init`, returning the
    /// previous size.
    ///
    /// Growing past the table's maximum is a native error and leaves the
    /// table unchanged.
    pub fn grow(&self, mut store: impl AsContextMut, delta: u64, init: Val) -> Result<u64> {
        let mut cx = store.as_context_mut();
        let id = cx.store_id();
        let raw = *self.0.get(id)?;
        let ty = TableType::from_native(ffi::wasmtime_table_type(cx.native(), &raw));
        check_element(id, ty, &init)?;
        let init = init.to_native();
        let mut prev = 0;
        crate::error::check(unsafe {
            ffi::wasmtime_table_grow(cx.native(), &raw, delta, &init, &mut prev)
        })?;
        Ok(prev)
    }
}

fn check_element(store: StoreId, ty: TableType, val: &Val) -> Result<()> {
    val.check_type(ty.element())?;
    if val.comes_from_same_store(store) {
        Ok(())
    } else {
        Err(UsageError::CrossStore.into())
    }
}
