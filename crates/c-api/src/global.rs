use crate::{
    handle_result, wasm_globaltype_t, wasmtime_context_t, wasmtime_error_t, wasmtime_global_t,
    wasmtime_val_t,
};
use std::mem::MaybeUninit;
use wasmtime::{Global, RootScope};

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_global_new(
    context: &mut wasmtime_context_t,
    gt: &wasm_globaltype_t,
    val: &wasmtime_val_t,
    ret: &mut MaybeUninit<wasmtime_global_t>,
) -> *mut wasmtime_error_t {
    let mut scope = RootScope::new(context.cx());
    let val = unsafe { val.to_val(&mut scope) };
    handle_result(Global::new(&mut scope, gt.to_wasmtime(), val), |global| {
        ret.write(wasmtime_global_t { global });
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_global_type(
    context: &mut wasmtime_context_t,
    global: &wasmtime_global_t,
) -> wasm_globaltype_t {
    wasm_globaltype_t::from_wasmtime(&global.global.ty(context.cx()))
}

/// On success `val` owns any reference it holds.
#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_global_get(
    context: &mut wasmtime_context_t,
    global: &wasmtime_global_t,
    val: &mut MaybeUninit<wasmtime_val_t>,
) -> *mut wasmtime_error_t {
    let mut scope = RootScope::new(context.cx());
    let v = global.global.get(&mut scope);
    handle_result(wasmtime_val_t::from_val(&mut scope, v), |v| {
        val.write(v);
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_global_set(
    context: &mut wasmtime_context_t,
    global: &wasmtime_global_t,
    val: &wasmtime_val_t,
) -> *mut wasmtime_error_t {
    let mut scope = RootScope::new(context.cx());
    let val = unsafe { val.to_val(&mut scope) };
    handle_result(global.global.set(&mut scope, val), |()| {})
}
