use crate::error::check_call;
use crate::store::{StoreId, Stored};
use crate::{
    AsContextMut, Extern, Func, Global, Memory, Module, Result, Table, UsageError,
};
use std::mem::MaybeUninit;
use std::ptr;
use wasmbridge_c_api as ffi;

/// An instantiated WebAssembly module.
///
/// Instances live in the store they were created in and are released along
/// with it, so an `Instance` is a copyable reference like [`Func`].
#[derive(Copy, Clone, Debug)]
pub struct Instance(Stored<ffi::wasmtime_instance_t>);

impl Instance {
    /// Instantiates `module` in `store`, resolving its imports positionally
    /// from `imports`.
    ///
    /// `imports` must line up with [`Module::imports`]: the count and the
    /// kind of each item are checked before the engine is called. Type
    /// mismatches beyond the kind are reported by the engine as a native
    /// error. A trap in the start function is returned as
    /// [`Error::Trap`](crate::Error::Trap).
    pub fn new(mut store: impl AsContextMut, module: &Module, imports: &[Extern]) -> Result<Instance> {
        let mut cx = store.as_context_mut();
        let id = cx.store_id();

        let expected = module.imports();
        if expected.len() != imports.len() {
            return Err(UsageError::ImportCountMismatch {
                expected: expected.len(),
                actual: imports.len(),
            }
            .into());
        }
        let raw_imports = expected
            .iter()
            .zip(imports)
            .map(|(ty, item)| {
                if ty.kind() != item.kind() {
                    return Err(UsageError::KindMismatch {
                        expected: ty.kind(),
                        actual: item.kind(),
                    }
                    .into());
                }
                item.to_raw(id)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut out = MaybeUninit::uninit();
        let mut trap = ptr::null_mut();
        let error = unsafe {
            ffi::wasmtime_instance_new(
                cx.native(),
                module.native(),
                raw_imports.as_ptr(),
                raw_imports.len(),
                &mut out,
                &mut trap,
            )
        };
        check_call(error, trap)?;
        Ok(Instance::from_raw(id, unsafe { out.assume_init() }))
    }

    pub(crate) fn from_raw(store: StoreId, raw: ffi::wasmtime_instance_t) -> Instance {
        Instance(Stored::new(store, raw))
    }

    pub(crate) fn raw(&self, store: StoreId) -> Result<&ffi::wasmtime_instance_t> {
        self.0.get(store)
    }

    /// Looks up an export by name.
    ///
    /// Returns `None` if there is no such export, or if `store` is not the
    /// store this instance belongs to.
    pub fn get_export(&self, mut store: impl AsContextMut, name: &str) -> Option<Extern> {
        let mut cx = store.as_context_mut();
        let id = cx.store_id();
        let raw = self.0.get(id).ok()?;
        let mut item = MaybeUninit::uninit();
        let found = unsafe {
            ffi::wasmtime_instance_export_get(cx.native(), raw, name.as_ptr(), name.len(), &mut item)
        };
        if !found {
            log::trace!("no export named `{name}`");
            return None;
        }
        Some(unsafe { Extern::from_uninit(id, &item) })
    }

    pub fn get_func(&self, store: impl AsContextMut, name: &str) -> Option<Func> {
        self.get_export(store, name)?.into_func()
    }

    pub fn get_memory(&self, store: impl AsContextMut, name: &str) -> Option<Memory> {
        self.get_export(store, name)?.into_memory()
    }

    pub fn get_global(&self, store: impl AsContextMut, name: &str) -> Option<Global> {
        self.get_export(store, name)?.into_global()
    }

    pub fn get_table(&self, store: impl AsContextMut, name: &str) -> Option<Table> {
        self.get_export(store, name)?.into_table()
    }

    /// All exports of this instance with their names, in declaration order.
    pub fn exports(&self, mut store: impl AsContextMut) -> Result<Vec<(String, Extern)>> {
        let mut cx = store.as_context_mut();
        let id = cx.store_id();
        let raw = *self.0.get(id)?;
        let mut exports = Vec::new();
        for index in 0.. {
            let mut name = ffi::wasm_name_t::default();
            let mut item = MaybeUninit::uninit();
            if !ffi::wasmtime_instance_export_nth(cx.native(), &raw, index, &mut name, &mut item) {
                break;
            }
            let name = String::from_utf8_lossy(name.as_slice()).into_owned();
            exports.push((name, unsafe { Extern::from_uninit(id, &item) }));
        }
        Ok(exports)
    }

    /// Drops this handle. The instance itself stays alive, and reachable
    /// through other copies, until its store is closed.
    pub fn close(self) {}
}
