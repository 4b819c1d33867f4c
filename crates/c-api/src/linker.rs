use crate::{
    StoreData, c_callback_to_rust_fn, handle_call_error, handle_result, panic_to_trap,
    wasm_engine_t, wasm_finalizer_t, wasm_functype_t, wasm_module_t, wasm_trap_t,
    wasmtime_context_t, wasmtime_error_t, wasmtime_extern_t, wasmtime_func_callback_t,
    wasmtime_instance_t,
};
use anyhow::{Result, anyhow};
use std::ffi::c_void;
use std::mem::MaybeUninit;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use wasmtime::Linker;

pub struct wasmtime_linker_t {
    pub(crate) linker: Linker<StoreData>,
}

/// Both halves of an import name must be UTF-8.
unsafe fn names<'a>(
    module: *const u8,
    module_len: usize,
    name: *const u8,
    name_len: usize,
) -> Result<(&'a str, &'a str)> {
    let module = unsafe { crate::str_from_raw_parts(module, module_len) }
        .ok_or_else(|| anyhow!("module name is not valid utf-8"))?;
    let name = unsafe { crate::str_from_raw_parts(name, name_len) }
        .ok_or_else(|| anyhow!("import name is not valid utf-8"))?;
    Ok((module, name))
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_linker_new(engine: &wasm_engine_t) -> *mut wasmtime_linker_t {
    Box::into_raw(Box::new(wasmtime_linker_t {
        linker: Linker::new(&engine.engine),
    }))
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_linker_allow_shadowing(
    linker: &mut wasmtime_linker_t,
    allow_shadowing: bool,
) {
    linker.linker.allow_shadowing(allow_shadowing);
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_linker_delete(linker: *mut wasmtime_linker_t) {
    if !linker.is_null() {
        drop(unsafe { Box::from_raw(linker) });
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_linker_define(
    linker: &mut wasmtime_linker_t,
    context: &mut wasmtime_context_t,
    module: *const u8,
    module_len: usize,
    name: *const u8,
    name_len: usize,
    item: &wasmtime_extern_t,
) -> *mut wasmtime_error_t {
    let item = unsafe { item.to_extern() };
    let result = unsafe { names(module, module_len, name, name_len) }.and_then(|(m, n)| {
        linker.linker.define(context.cx(), m, n, item)?;
        Ok(())
    });
    handle_result(result, |()| {})
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_linker_define_func(
    linker: &mut wasmtime_linker_t,
    module: *const u8,
    module_len: usize,
    name: *const u8,
    name_len: usize,
    ty: &wasm_functype_t,
    callback: wasmtime_func_callback_t,
    data: *mut c_void,
    finalizer: wasm_finalizer_t,
) -> *mut wasmtime_error_t {
    let ty = ty.to_wasmtime(linker.linker.engine());
    let cb = c_callback_to_rust_fn(callback, data, finalizer);
    let result = unsafe { names(module, module_len, name, name_len) }.and_then(|(m, n)| {
        linker.linker.func_new(m, n, ty, cb)?;
        Ok(())
    });
    handle_result(result, |()| {})
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_linker_define_instance(
    linker: &mut wasmtime_linker_t,
    context: &mut wasmtime_context_t,
    name: *const u8,
    name_len: usize,
    instance: &wasmtime_instance_t,
) -> *mut wasmtime_error_t {
    let result = unsafe { crate::str_from_raw_parts(name, name_len) }
        .ok_or_else(|| anyhow!("instance name is not valid utf-8"))
        .and_then(|name| {
            linker.linker.instance(context.cx(), name, instance.instance)?;
            Ok(())
        });
    handle_result(result, |()| {})
}

/// Registers every export of `module` under `name`, instantiating it as
/// needed. Start-function traps surface as errors here.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_linker_module(
    linker: &mut wasmtime_linker_t,
    context: &mut wasmtime_context_t,
    name: *const u8,
    name_len: usize,
    module: &wasm_module_t,
) -> *mut wasmtime_error_t {
    let result = unsafe { crate::str_from_raw_parts(name, name_len) }
        .ok_or_else(|| anyhow!("module name is not valid utf-8"))
        .and_then(|name| {
            linker.linker.module(context.cx(), name, &module.module)?;
            Ok(())
        });
    handle_result(result, |()| {})
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_linker_instantiate(
    linker: &wasmtime_linker_t,
    context: &mut wasmtime_context_t,
    module: &wasm_module_t,
    instance_ptr: &mut MaybeUninit<wasmtime_instance_t>,
    trap_ptr: &mut *mut wasm_trap_t,
) -> *mut wasmtime_error_t {
    let mut cx = context.cx();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        linker.linker.instantiate(&mut cx, &module.module)
    }));
    match result {
        Ok(Ok(instance)) => {
            instance_ptr.write(wasmtime_instance_t { instance });
            ptr::null_mut()
        }
        Ok(Err(e)) => handle_call_error(e, trap_ptr),
        Err(panic) => {
            *trap_ptr = panic_to_trap(panic);
            ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_linker_get(
    linker: &wasmtime_linker_t,
    context: &mut wasmtime_context_t,
    module: *const u8,
    module_len: usize,
    name: *const u8,
    name_len: usize,
    item_ptr: &mut MaybeUninit<wasmtime_extern_t>,
) -> bool {
    let Ok((module, name)) = (unsafe { names(module, module_len, name, name_len) }) else {
        return false;
    };
    match linker
        .linker
        .get(context.cx(), module, name)
        .and_then(wasmtime_extern_t::from_extern)
    {
        Some(item) => {
            item_ptr.write(item);
            true
        }
        None => false,
    }
}
