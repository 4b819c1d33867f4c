use crate::store::{StoreId, Stored};
use crate::{AsContext, AsContextMut, MemoryType, Result, StoreContext, StoreContextMut, UsageError};
use std::mem::MaybeUninit;
use wasmbridge_c_api as ffi;

/// Size of a WebAssembly page, in bytes.
pub const WASM_PAGE_SIZE: usize = 0x10000;

/// A WebAssembly linear memory, owned by its store.
///
/// Slices handed out by [`Memory::data`] and [`Memory::data_mut`] borrow the
/// store, so the memory cannot grow (and move) while one is alive.
#[derive(Copy, Clone, Debug)]
pub struct Memory(pub(crate) Stored<ffi::wasmtime_memory_t>);

impl Memory {
    pub fn new(mut store: impl AsContextMut, ty: MemoryType) -> Result<Memory> {
        let mut cx = store.as_context_mut();
        let id = cx.store_id();
        let mut ret = MaybeUninit::uninit();
        crate::error::check(ffi::wasmtime_memory_new(
            cx.native(),
            &ty.to_native(),
            &mut ret,
        ))?;
        log::trace!("created memory with {ty:?}");
        Ok(Memory(Stored::new(id, unsafe { ret.assume_init() })))
    }

    pub(crate) fn from_raw(store: StoreId, raw: ffi::wasmtime_memory_t) -> Memory {
        Memory(Stored::new(store, raw))
    }

    pub fn ty(&self, store: impl AsContext) -> Result<MemoryType> {
        let cx = store.as_context();
        let raw = self.0.get(cx.store_id())?;
        Ok(MemoryType::from_native(ffi::wasmtime_memory_type(cx.native(), raw)))
    }

    /// Current size in pages.
    pub fn size(&self, store: impl AsContext) -> Result<u64> {
        let cx = store.as_context();
        let raw = self.0.get(cx.store_id())?;
        Ok(ffi::wasmtime_memory_size(cx.native(), raw))
    }

    /// Current size in bytes.
    pub fn data_size(&self, store: impl AsContext) -> Result<usize> {
        let cx = store.as_context();
        let raw = self.0.get(cx.store_id())?;
        Ok(ffi::wasmtime_memory_data_size(cx.native(), raw))
    }

    pub fn data<'a, T: 'a>(&self, store: impl Into<StoreContext<'a, T>>) -> Result<&'a [u8]> {
        let cx = store.into();
        let raw = self.0.get(cx.store_id())?;
        let len = ffi::wasmtime_memory_data_size(cx.native(), raw);
        let ptr = ffi::wasmtime_memory_data(cx.native(), raw);
        Ok(unsafe { slice_from_raw_parts(ptr, len) })
    }

    pub fn data_mut<'a, T: 'a>(
        &self,
        store: impl Into<StoreContextMut<'a, T>>,
    ) -> Result<&'a mut [u8]> {
        let mut cx = store.into();
        let raw = *self.0.get(cx.store_id())?;
        let len = ffi::wasmtime_memory_data_size(cx.native(), &raw);
        let ptr = ffi::wasmtime_memory_data(cx.native(), &raw);
        Ok(unsafe { slice_from_raw_parts_mut(ptr, len) })
    }

    /// Copies `buffer.len()` bytes starting at `offset` into `buffer`.
    pub fn read(&self, store: impl AsContext, offset: usize, buffer: &mut [u8]) -> Result<()> {
        let cx = store.as_context();
        let data = self.data(&cx)?;
        let range = checked_range(offset, buffer.len(), data.len())?;
        buffer.copy_from_slice(&data[range]);
        Ok(())
    }

    /// Copies `buffer` into memory starting at `offset`.
    pub fn write(&self, mut store: impl AsContextMut, offset: usize, buffer: &[u8]) -> Result<()> {
        let mut cx = store.as_context_mut();
        let data = self.data_mut(&mut cx)?;
        let range = checked_range(offset, buffer.len(), data.len())?;
        data[range].copy_from_slice(buffer);
        Ok(())
    }

    /// Grows by `delta` pages, returning the previous size in pages.
    ///
    /// Growing past the maximum is a native error and leaves memory
    /// untouched.
    pub fn grow(&self, mut store: impl AsContextMut, delta: u64) -> Result<u64> {
        let mut cx = store.as_context_mut();
        let raw = *self.0.get(cx.store_id())?;
        let mut prev = 0;
        crate::error::check(ffi::wasmtime_memory_grow(cx.native(), &raw, delta, &mut prev))?;
        Ok(prev)
    }
}

fn checked_range(offset: usize, len: usize, size: usize) -> Result<std::ops::Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(offset..end),
        _ => Err(UsageError::OutOfBounds { offset, len, size }.into()),
    }
}

unsafe fn slice_from_raw_parts<'a>(ptr: *const u8, len: usize) -> &'a [u8] {
    if len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, len) }
    }
}

unsafe fn slice_from_raw_parts_mut<'a>(ptr: *mut u8, len: usize) -> &'a mut [u8] {
    if len == 0 {
        &mut []
    } else {
        unsafe { std::slice::from_raw_parts_mut(ptr, len) }
    }
}
