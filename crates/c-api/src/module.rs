use crate::{
    extern_type_kind, handle_result, wasm_byte_vec_t, wasm_engine_t, wasmtime_error_t,
    wasmtime_extern_kind_t,
};
use wasmtime::Module;

/// A compiled module. Shareable across stores of the same engine.
#[derive(Clone)]
pub struct wasm_module_t {
    pub(crate) module: Module,
}

impl wasm_module_t {
    pub(crate) fn new(module: Module) -> wasm_module_t {
        wasm_module_t { module }
    }
}

/// Compiles binary or text input. Text is handed to the engine unchanged.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_module_new(
    engine: &wasm_engine_t,
    wasm: *const u8,
    len: usize,
    out: &mut *mut wasm_module_t,
) -> *mut wasmtime_error_t {
    let bytes = unsafe { crate::slice_from_raw_parts(wasm, len) };
    handle_result(Module::new(&engine.engine, bytes), |module| {
        log::trace!("compiled module from {len} bytes");
        *out = Box::into_raw(Box::new(wasm_module_t::new(module)));
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_module_validate(
    engine: &wasm_engine_t,
    wasm: *const u8,
    len: usize,
) -> *mut wasmtime_error_t {
    let binary = unsafe { crate::slice_from_raw_parts(wasm, len) };
    handle_result(Module::validate(&engine.engine, binary), |()| {})
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_module_serialize(
    module: &wasm_module_t,
    ret: &mut wasm_byte_vec_t,
) -> *mut wasmtime_error_t {
    handle_result(module.module.serialize(), |buf| ret.set_buffer(buf))
}

/// The engine trusts `bytes` to come from `wasmtime_module_serialize` on a
/// compatible engine.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_module_deserialize(
    engine: &wasm_engine_t,
    bytes: *const u8,
    len: usize,
    out: &mut *mut wasm_module_t,
) -> *mut wasmtime_error_t {
    let bytes = unsafe { crate::slice_from_raw_parts(bytes, len) };
    let module = unsafe { Module::deserialize(&engine.engine, bytes) };
    handle_result(module, |module| {
        *out = Box::into_raw(Box::new(wasm_module_t::new(module)));
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_module_clone(module: &wasm_module_t) -> *mut wasm_module_t {
    Box::into_raw(Box::new(module.clone()))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_module_delete(module: *mut wasm_module_t) {
    if !module.is_null() {
        drop(unsafe { Box::from_raw(module) });
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_module_imports_len(module: &wasm_module_t) -> usize {
    module.module.imports().len()
}

/// Describes the `n`th import. Names point into the module and stay valid
/// as long as `module` does.
#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_module_import_nth(
    module: &wasm_module_t,
    n: usize,
    module_name: &mut *const u8,
    module_name_len: &mut usize,
    name: &mut *const u8,
    name_len: &mut usize,
    kind: &mut wasmtime_extern_kind_t,
) -> bool {
    let Some(import) = module.module.imports().nth(n) else {
        return false;
    };
    *module_name = import.module().as_ptr();
    *module_name_len = import.module().len();
    *name = import.name().as_ptr();
    *name_len = import.name().len();
    *kind = extern_type_kind(&import.ty());
    true
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_module_exports_len(module: &wasm_module_t) -> usize {
    module.module.exports().len()
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_module_export_nth(
    module: &wasm_module_t,
    n: usize,
    name: &mut *const u8,
    name_len: &mut usize,
    kind: &mut wasmtime_extern_kind_t,
) -> bool {
    let Some(export) = module.module.exports().nth(n) else {
        return false;
    };
    *name = export.name().as_ptr();
    *name_len = export.name().len();
    *kind = extern_type_kind(&export.ty());
    true
}
