use std::fmt;
use wasmbridge_c_api as ffi;

/// The type of a single WebAssembly value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValType {
    I32,
    I64,
    F32,
    F64,
    V128,
    FuncRef,
    ExternRef,
}

impl ValType {
    /// Returns true for the numeric and vector types.
    pub fn is_num(&self) -> bool {
        !self.is_ref()
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, ValType::FuncRef | ValType::ExternRef)
    }

    pub(crate) fn to_native(self) -> ffi::wasmtime_valkind_t {
        match self {
            ValType::I32 => ffi::WASMTIME_I32,
            ValType::I64 => ffi::WASMTIME_I64,
            ValType::F32 => ffi::WASMTIME_F32,
            ValType::F64 => ffi::WASMTIME_F64,
            ValType::V128 => ffi::WASMTIME_V128,
            ValType::FuncRef => ffi::WASMTIME_FUNCREF,
            ValType::ExternRef => ffi::WASMTIME_EXTERNREF,
        }
    }

    /// Panics on a tag this binding does not know about: the engine and the
    /// binding disagree on the ABI and nothing sensible can be done.
    pub(crate) fn from_native(kind: ffi::wasmtime_valkind_t) -> ValType {
        match kind {
            ffi::WASMTIME_I32 => ValType::I32,
            ffi::WASMTIME_I64 => ValType::I64,
            ffi::WASMTIME_F32 => ValType::F32,
            ffi::WASMTIME_F64 => ValType::F64,
            ffi::WASMTIME_V128 => ValType::V128,
            ffi::WASMTIME_FUNCREF => ValType::FuncRef,
            ffi::WASMTIME_EXTERNREF => ValType::ExternRef,
            other => panic!("unsupported value kind from the engine: {other}"),
        }
    }
}

impl fmt::Display for ValType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValType::I32 => "i32",
            ValType::I64 => "i64",
            ValType::F32 => "f32",
            ValType::F64 => "f64",
            ValType::V128 => "v128",
            ValType::FuncRef => "funcref",
            ValType::ExternRef => "externref",
        })
    }
}

/// The kind of an [`Extern`](crate::Extern).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternKind {
    Func,
    Global,
    Table,
    Memory,
}

impl ExternKind {
    pub(crate) fn to_native(self) -> ffi::wasmtime_extern_kind_t {
        match self {
            ExternKind::Func => ffi::WASMTIME_EXTERN_FUNC,
            ExternKind::Global => ffi::WASMTIME_EXTERN_GLOBAL,
            ExternKind::Table => ffi::WASMTIME_EXTERN_TABLE,
            ExternKind::Memory => ffi::WASMTIME_EXTERN_MEMORY,
        }
    }

    pub(crate) fn from_native(kind: ffi::wasmtime_extern_kind_t) -> ExternKind {
        match kind {
            ffi::WASMTIME_EXTERN_FUNC => ExternKind::Func,
            ffi::WASMTIME_EXTERN_GLOBAL => ExternKind::Global,
            ffi::WASMTIME_EXTERN_TABLE => ExternKind::Table,
            ffi::WASMTIME_EXTERN_MEMORY => ExternKind::Memory,
            other => panic!("unknown extern kind from the engine: {other}"),
        }
    }
}

impl fmt::Display for ExternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExternKind::Func => "func",
            ExternKind::Global => "global",
            ExternKind::Table => "table",
            ExternKind::Memory => "memory",
        })
    }
}

/// The signature of a function: its parameter and result types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncType {
    params: Box<[ValType]>,
    results: Box<[ValType]>,
}

impl FuncType {
    pub fn new(
        params: impl IntoIterator<Item = ValType>,
        results: impl IntoIterator<Item = ValType>,
    ) -> FuncType {
        FuncType {
            params: params.into_iter().collect(),
            results: results.into_iter().collect(),
        }
    }

    pub fn params(&self) -> &[ValType] {
        &self.params
    }

    pub fn results(&self) -> &[ValType] {
        &self.results
    }

    pub(crate) fn to_native(&self) -> OwnedFuncType {
        let params = self.params.iter().map(|p| p.to_native()).collect::<Vec<_>>();
        let results = self.results.iter().map(|r| r.to_native()).collect::<Vec<_>>();
        let raw = unsafe {
            ffi::wasm_functype_new(params.as_ptr(), params.len(), results.as_ptr(), results.len())
        };
        OwnedFuncType(raw)
    }

    /// Reads a native function type, leaving ownership with the caller.
    pub(crate) unsafe fn from_native(raw: &ffi::wasm_functype_t) -> FuncType {
        let read = |ptr: *const ffi::wasmtime_valkind_t, len: usize| {
            let kinds = if len == 0 {
                &[][..]
            } else {
                unsafe { std::slice::from_raw_parts(ptr, len) }
            };
            kinds.iter().map(|k| ValType::from_native(*k)).collect()
        };
        FuncType {
            params: read(
                ffi::wasm_functype_params(raw),
                ffi::wasm_functype_param_arity(raw),
            ),
            results: read(
                ffi::wasm_functype_results(raw),
                ffi::wasm_functype_result_arity(raw),
            ),
        }
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(func")?;
        if !self.params.is_empty() {
            write!(f, " (param")?;
            for p in self.params.iter() {
                write!(f, " {p}")?;
            }
            write!(f, ")")?;
        }
        if !self.results.is_empty() {
            write!(f, " (result")?;
            for r in self.results.iter() {
                write!(f, " {r}")?;
            }
            write!(f, ")")?;
        }
        write!(f, ")")
    }
}

/// A native function type, deleted on drop.
pub(crate) struct OwnedFuncType(*mut ffi::wasm_functype_t);

impl OwnedFuncType {
    pub(crate) unsafe fn from_raw(raw: *mut ffi::wasm_functype_t) -> OwnedFuncType {
        OwnedFuncType(raw)
    }

    pub(crate) fn native(&self) -> &ffi::wasm_functype_t {
        unsafe { &*self.0 }
    }
}

impl Drop for OwnedFuncType {
    fn drop(&mut self) {
        unsafe { ffi::wasm_functype_delete(self.0) };
    }
}

/// Whether a global may be written after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    Const,
    Var,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalType {
    content: ValType,
    mutability: Mutability,
}

impl GlobalType {
    pub fn new(content: ValType, mutability: Mutability) -> GlobalType {
        GlobalType {
            content,
            mutability,
        }
    }

    pub fn content(&self) -> ValType {
        self.content
    }

    pub fn mutability(&self) -> Mutability {
        self.mutability
    }

    pub(crate) fn to_native(self) -> ffi::wasm_globaltype_t {
        ffi::wasm_globaltype_t {
            content: self.content.to_native(),
            mutability: match self.mutability {
                Mutability::Const => ffi::WASM_CONST,
                Mutability::Var => ffi::WASM_VAR,
            },
        }
    }

    pub(crate) fn from_native(ty: ffi::wasm_globaltype_t) -> GlobalType {
        GlobalType {
            content: ValType::from_native(ty.content),
            mutability: if ty.mutability == ffi::WASM_VAR {
                Mutability::Var
            } else {
                Mutability::Const
            },
        }
    }
}

fn limits_to_native(minimum: u32, maximum: Option<u32>) -> ffi::wasm_limits_t {
    ffi::wasm_limits_t {
        min: minimum,
        max: maximum.unwrap_or(ffi::WASM_LIMITS_MAX_DEFAULT),
    }
}

fn limits_from_native(limits: ffi::wasm_limits_t) -> (u32, Option<u32>) {
    let max = if limits.max == ffi::WASM_LIMITS_MAX_DEFAULT {
        None
    } else {
        Some(limits.max)
    };
    (limits.min, max)
}

/// The element type and size limits of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableType {
    element: ValType,
    minimum: u32,
    maximum: Option<u32>,
}

impl TableType {
    /// Panics if `element` is not a reference type.
    pub fn new(element: ValType, minimum: u32, maximum: Option<u32>) -> TableType {
        assert!(element.is_ref(), "table elements must be references, not {element}");
        TableType {
            element,
            minimum,
            maximum,
        }
    }

    pub fn element(&self) -> ValType {
        self.element
    }

    pub fn minimum(&self) -> u32 {
        self.minimum
    }

    pub fn maximum(&self) -> Option<u32> {
        self.maximum
    }

    pub(crate) fn to_native(self) -> ffi::wasm_tabletype_t {
        ffi::wasm_tabletype_t {
            element: self.element.to_native(),
            limits: limits_to_native(self.minimum, self.maximum),
        }
    }

    pub(crate) fn from_native(ty: ffi::wasm_tabletype_t) -> TableType {
        let (minimum, maximum) = limits_from_native(ty.limits);
        TableType {
            element: ValType::from_native(ty.element),
            minimum,
            maximum,
        }
    }
}

/// The size limits of a linear memory, in 64 KiB pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryType {
    minimum: u32,
    maximum: Option<u32>,
}

impl MemoryType {
    pub fn new(minimum: u32, maximum: Option<u32>) -> MemoryType {
        MemoryType { minimum, maximum }
    }

    pub fn minimum(&self) -> u32 {
        self.minimum
    }

    pub fn maximum(&self) -> Option<u32> {
        self.maximum
    }

    pub(crate) fn to_native(self) -> ffi::wasm_memorytype_t {
        ffi::wasm_memorytype_t {
            limits: limits_to_native(self.minimum, self.maximum),
        }
    }

    pub(crate) fn from_native(ty: ffi::wasm_memorytype_t) -> MemoryType {
        let (minimum, maximum) = limits_from_native(ty.limits);
        MemoryType { minimum, maximum }
    }
}
