use crate::{
    WASMTIME_EXTERN_FUNC, WASMTIME_EXTERN_GLOBAL, WASMTIME_EXTERN_MEMORY, WASMTIME_EXTERN_TABLE,
    wasmtime_extern_kind_t,
};
use wasmtime::{Extern, ExternType, Func, Global, Memory, Table};

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct wasmtime_func_t {
    pub(crate) func: Func,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct wasmtime_global_t {
    pub(crate) global: Global,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct wasmtime_table_t {
    pub(crate) table: Table,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct wasmtime_memory_t {
    pub(crate) memory: Memory,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union wasmtime_extern_union {
    pub func: wasmtime_func_t,
    pub global: wasmtime_global_t,
    pub table: wasmtime_table_t,
    pub memory: wasmtime_memory_t,
}

/// A store-owned extern. Copying one never duplicates the underlying object.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct wasmtime_extern_t {
    pub kind: wasmtime_extern_kind_t,
    pub of: wasmtime_extern_union,
}

impl wasmtime_extern_t {
    /// Returns `None` for extern kinds this ABI does not surface, such as
    /// shared memories.
    pub(crate) fn from_extern(e: Extern) -> Option<wasmtime_extern_t> {
        Some(match e {
            Extern::Func(func) => wasmtime_extern_t {
                kind: WASMTIME_EXTERN_FUNC,
                of: wasmtime_extern_union {
                    func: wasmtime_func_t { func },
                },
            },
            Extern::Global(global) => wasmtime_extern_t {
                kind: WASMTIME_EXTERN_GLOBAL,
                of: wasmtime_extern_union {
                    global: wasmtime_global_t { global },
                },
            },
            Extern::Table(table) => wasmtime_extern_t {
                kind: WASMTIME_EXTERN_TABLE,
                of: wasmtime_extern_union {
                    table: wasmtime_table_t { table },
                },
            },
            Extern::Memory(memory) => wasmtime_extern_t {
                kind: WASMTIME_EXTERN_MEMORY,
                of: wasmtime_extern_union {
                    memory: wasmtime_memory_t { memory },
                },
            },
            _ => return None,
        })
    }

    pub(crate) unsafe fn to_extern(&self) -> Extern {
        unsafe {
            match self.kind {
                WASMTIME_EXTERN_FUNC => Extern::Func(self.of.func.func),
                WASMTIME_EXTERN_GLOBAL => Extern::Global(self.of.global.global),
                WASMTIME_EXTERN_TABLE => Extern::Table(self.of.table.table),
                WASMTIME_EXTERN_MEMORY => Extern::Memory(self.of.memory.memory),
                other => panic!("unknown wasmtime_extern_kind_t: {other}"),
            }
        }
    }
}

pub(crate) fn extern_type_kind(ty: &ExternType) -> wasmtime_extern_kind_t {
    match ty {
        ExternType::Func(_) => WASMTIME_EXTERN_FUNC,
        ExternType::Global(_) => WASMTIME_EXTERN_GLOBAL,
        ExternType::Table(_) => WASMTIME_EXTERN_TABLE,
        ExternType::Memory(_) => WASMTIME_EXTERN_MEMORY,
    }
}
