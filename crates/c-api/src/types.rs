use wasmtime::{Engine, FuncType, GlobalType, MemoryType, Mutability, RefType, TableType, ValType};

pub type wasmtime_valkind_t = u8;

pub const WASMTIME_I32: wasmtime_valkind_t = 0;
pub const WASMTIME_I64: wasmtime_valkind_t = 1;
pub const WASMTIME_F32: wasmtime_valkind_t = 2;
pub const WASMTIME_F64: wasmtime_valkind_t = 3;
pub const WASMTIME_V128: wasmtime_valkind_t = 4;
pub const WASMTIME_FUNCREF: wasmtime_valkind_t = 5;
pub const WASMTIME_EXTERNREF: wasmtime_valkind_t = 6;
pub const WASMTIME_ANYREF: wasmtime_valkind_t = 7;

pub type wasmtime_extern_kind_t = u8;

pub const WASMTIME_EXTERN_FUNC: wasmtime_extern_kind_t = 0;
pub const WASMTIME_EXTERN_GLOBAL: wasmtime_extern_kind_t = 1;
pub const WASMTIME_EXTERN_TABLE: wasmtime_extern_kind_t = 2;
pub const WASMTIME_EXTERN_MEMORY: wasmtime_extern_kind_t = 3;

pub type wasm_mutability_t = u8;

pub const WASM_CONST: wasm_mutability_t = 0;
pub const WASM_VAR: wasm_mutability_t = 1;

pub(crate) fn into_valtype(kind: wasmtime_valkind_t) -> ValType {
    match kind {
        WASMTIME_I32 => ValType::I32,
        WASMTIME_I64 => ValType::I64,
        WASMTIME_F32 => ValType::F32,
        WASMTIME_F64 => ValType::F64,
        WASMTIME_V128 => ValType::V128,
        WASMTIME_FUNCREF => ValType::FUNCREF,
        WASMTIME_EXTERNREF => ValType::EXTERNREF,
        WASMTIME_ANYREF => ValType::ANYREF,
        _ => panic!("unexpected kind: {kind}"),
    }
}

pub(crate) fn from_valtype(ty: &ValType) -> wasmtime_valkind_t {
    match ty {
        ValType::I32 => WASMTIME_I32,
        ValType::I64 => WASMTIME_I64,
        ValType::F32 => WASMTIME_F32,
        ValType::F64 => WASMTIME_F64,
        ValType::V128 => WASMTIME_V128,
        ty if ty.is_funcref() => WASMTIME_FUNCREF,
        ty if ty.is_externref() => WASMTIME_EXTERNREF,
        _ => WASMTIME_ANYREF,
    }
}

fn into_reftype(kind: wasmtime_valkind_t) -> RefType {
    match kind {
        WASMTIME_FUNCREF => RefType::FUNCREF,
        WASMTIME_EXTERNREF => RefType::EXTERNREF,
        _ => panic!("not a reference kind: {kind}"),
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct wasm_limits_t {
    pub min: u32,
    pub max: u32,
}

/// Sentinel for "no maximum".
pub const WASM_LIMITS_MAX_DEFAULT: u32 = u32::MAX;

impl wasm_limits_t {
    pub(crate) fn max(&self) -> Option<u32> {
        if self.max == WASM_LIMITS_MAX_DEFAULT {
            None
        } else {
            Some(self.max)
        }
    }

    fn from_parts(min: u64, max: Option<u64>) -> wasm_limits_t {
        wasm_limits_t {
            min: u32::try_from(min).unwrap_or(u32::MAX),
            max: max
                .and_then(|m| u32::try_from(m).ok())
                .unwrap_or(WASM_LIMITS_MAX_DEFAULT),
        }
    }
}

/// Function types are kept engine-independent and resolved against the
/// store's engine when a function is created.
#[derive(Clone)]
pub struct wasm_functype_t {
    pub(crate) params: Vec<wasmtime_valkind_t>,
    pub(crate) results: Vec<wasmtime_valkind_t>,
}

impl wasm_functype_t {
    pub(crate) fn from_wasmtime(ty: &FuncType) -> wasm_functype_t {
        wasm_functype_t {
            params: ty.params().map(|p| from_valtype(&p)).collect(),
            results: ty.results().map(|r| from_valtype(&r)).collect(),
        }
    }

    pub(crate) fn to_wasmtime(&self, engine: &Engine) -> FuncType {
        FuncType::new(
            engine,
            self.params.iter().map(|k| into_valtype(*k)),
            self.results.iter().map(|k| into_valtype(*k)),
        )
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasm_functype_new(
    params: *const wasmtime_valkind_t,
    nparams: usize,
    results: *const wasmtime_valkind_t,
    nresults: usize,
) -> *mut wasm_functype_t {
    let params = unsafe { crate::slice_from_raw_parts(params, nparams) };
    let results = unsafe { crate::slice_from_raw_parts(results, nresults) };
    Box::into_raw(Box::new(wasm_functype_t {
        params: params.to_vec(),
        results: results.to_vec(),
    }))
}

#[unsafe(no_mangle)]
pub extern "C" fn wasm_functype_param_arity(ty: &wasm_functype_t) -> usize {
    ty.params.len()
}

#[unsafe(no_mangle)]
pub extern "C" fn wasm_functype_result_arity(ty: &wasm_functype_t) -> usize {
    ty.results.len()
}

#[unsafe(no_mangle)]
pub extern "C" fn wasm_functype_params(ty: &wasm_functype_t) -> *const wasmtime_valkind_t {
    ty.params.as_ptr()
}

#[unsafe(no_mangle)]
pub extern "C" fn wasm_functype_results(ty: &wasm_functype_t) -> *const wasmtime_valkind_t {
    ty.results.as_ptr()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasm_functype_delete(ty: *mut wasm_functype_t) {
    if !ty.is_null() {
        drop(unsafe { Box::from_raw(ty) });
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct wasm_globaltype_t {
    pub content: wasmtime_valkind_t,
    pub mutability: wasm_mutability_t,
}

impl wasm_globaltype_t {
    pub(crate) fn to_wasmtime(&self) -> GlobalType {
        let mutability = if self.mutability == WASM_VAR {
            Mutability::Var
        } else {
            Mutability::Const
        };
        GlobalType::new(into_valtype(self.content), mutability)
    }

    pub(crate) fn from_wasmtime(ty: &GlobalType) -> wasm_globaltype_t {
        wasm_globaltype_t {
            content: from_valtype(ty.content()),
            mutability: match ty.mutability() {
                Mutability::Const => WASM_CONST,
                Mutability::Var => WASM_VAR,
            },
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct wasm_tabletype_t {
    pub element: wasmtime_valkind_t,
    pub limits: wasm_limits_t,
}

impl wasm_tabletype_t {
    pub(crate) fn to_wasmtime(&self) -> TableType {
        TableType::new(
            into_reftype(self.element),
            self.limits.min,
            self.limits.max(),
        )
    }

    pub(crate) fn from_wasmtime(ty: &TableType) -> wasm_tabletype_t {
        wasm_tabletype_t {
            element: from_valtype(&ValType::Ref(ty.element().clone())),
            limits: wasm_limits_t::from_parts(ty.minimum().into(), ty.maximum().map(Into::into)),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct wasm_memorytype_t {
    pub limits: wasm_limits_t,
}

impl wasm_memorytype_t {
    pub(crate) fn to_wasmtime(&self) -> MemoryType {
        MemoryType::new(self.limits.min, self.limits.max())
    }

    pub(crate) fn from_wasmtime(ty: &MemoryType) -> wasm_memorytype_t {
        wasm_memorytype_t {
            limits: wasm_limits_t::from_parts(ty.minimum().into(), ty.maximum().map(Into::into)),
        }
    }
}
