use crate::store::StoreId;
use crate::{ExternKind, Func, Result, UsageError};
use std::mem::MaybeUninit;
use wasmbridge_c_api as ffi;

mod global;
mod memory;
mod table;

pub use self::global::*;
pub use self::memory::*;
pub use self::table::*;

/// An external item of a WebAssembly instance: something that can be
/// imported or exported.
///
/// Like the handles it wraps, an `Extern` is a cheap copy of a reference to
/// an object owned by its store.
#[derive(Clone, Copy, Debug)]
pub enum Extern {
    Func(Func),
    Global(Global),
    Table(Table),
    Memory(Memory),
}

macro_rules! narrow {
    ($(($variant:ident $ty:ident $into:ident $as:ident))*) => ($(
        /// Returns the underlying item if this is the right kind.
        pub fn $into(self) -> Option<$ty> {
            match self {
                Extern::$variant(item) => Some(item),
                _ => None,
            }
        }

        /// Like the `into_*` accessor, failing with
        /// [`UsageError::KindMismatch`] on the wrong kind.
        pub fn $as(&self) -> Result<$ty> {
            match self {
                Extern::$variant(item) => Ok(*item),
                other => Err(UsageError::KindMismatch {
                    expected: ExternKind::$variant,
                    actual: other.kind(),
                }
                .into()),
            }
        }
    )*)
}

impl Extern {
    pub fn kind(&self) -> ExternKind {
        match self {
            Extern::Func(_) => ExternKind::Func,
            Extern::Global(_) => ExternKind::Global,
            Extern::Table(_) => ExternKind::Table,
            Extern::Memory(_) => ExternKind::Memory,
        }
    }

    narrow! {
        (Func Func into_func as_func)
        (Global Global into_global as_global)
        (Table Table into_table as_table)
        (Memory Memory into_memory as_memory)
    }

    /// The engine's tagged-union form of this item, checked against `store`.
    pub(crate) fn to_raw(&self, store: StoreId) -> Result<ffi::wasmtime_extern_t> {
        let of = match self {
            Extern::Func(f) => ffi::wasmtime_extern_union {
                func: *f.0.get(store)?,
            },
            Extern::Global(g) => ffi::wasmtime_extern_union {
                global: *g.0.get(store)?,
            },
            Extern::Table(t) => ffi::wasmtime_extern_union {
                table: *t.0.get(store)?,
            },
            Extern::Memory(m) => ffi::wasmtime_extern_union {
                memory: *m.0.get(store)?,
            },
        };
        Ok(ffi::wasmtime_extern_t {
            kind: self.kind().to_native(),
            of,
        })
    }

    /// Copies this item into a heap-allocated native union owned by the
    /// caller.
    pub(crate) fn allocate_native(&self, store: StoreId) -> Result<NativeExtern> {
        Ok(NativeExtern(Box::new(self.to_raw(store)?)))
    }

    /// Reads an item the engine produced for `store`. The payload is
    /// copied, so `raw` stays independently owned by whoever passed it in.
    ///
    /// # Panics
    ///
    /// Panics on a kind tag this binding does not know.
    pub(crate) unsafe fn from_native(store: StoreId, raw: &ffi::wasmtime_extern_t) -> Extern {
        unsafe {
            match ExternKind::from_native(raw.kind) {
                ExternKind::Func => Extern::Func(Func::from_raw(store, raw.of.func)),
                ExternKind::Global => Extern::Global(Global::from_raw(store, raw.of.global)),
                ExternKind::Table => Extern::Table(Table::from_raw(store, raw.of.table)),
                ExternKind::Memory => Extern::Memory(Memory::from_raw(store, raw.of.memory)),
            }
        }
    }

    /// Reads an item written by the engine into `slot`.
    pub(crate) unsafe fn from_uninit(
        store: StoreId,
        slot: &MaybeUninit<ffi::wasmtime_extern_t>,
    ) -> Extern {
        unsafe { Extern::from_native(store, slot.assume_init_ref()) }
    }
}

impl From<Func> for Extern {
    fn from(f: Func) -> Extern {
        Extern::Func(f)
    }
}

impl From<Global> for Extern {
    fn from(g: Global) -> Extern {
        Extern::Global(g)
    }
}

impl From<Table> for Extern {
    fn from(t: Table) -> Extern {
        Extern::Table(t)
    }
}

impl From<Memory> for Extern {
    fn from(m: Memory) -> Extern {
        Extern::Memory(m)
    }
}

/// A heap-allocated native extern owned by the binding, released on drop or
/// with [`NativeExtern::release_native`].
pub(crate) struct NativeExtern(Box<ffi::wasmtime_extern_t>);

impl NativeExtern {
    pub(crate) fn as_raw(&self) -> &ffi::wasmtime_extern_t {
        &self.0
    }

    pub(crate) fn release_native(self) {
        drop(self);
    }
}
