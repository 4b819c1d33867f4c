use crate::{
    ForeignData, StoreData, handle_call_error, handle_result, panic_to_trap, unroot_val,
    wasm_finalizer_t, wasm_functype_t, wasm_trap_t, wasmtime_context_t, wasmtime_error_t,
    wasmtime_extern_t, wasmtime_func_t, wasmtime_val_t,
};
use anyhow::anyhow;
use std::ffi::c_void;
use std::mem::MaybeUninit;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use wasmtime::{Caller, Func, RootScope, Val};

/// The caller of a host function, valid only for the duration of the call.
pub struct wasmtime_caller_t {
    caller: *mut Caller<'static, StoreData>,
    context: wasmtime_context_t,
}

pub type wasmtime_func_callback_t = unsafe extern "C" fn(
    env: *mut c_void,
    caller: *mut wasmtime_caller_t,
    args: *const wasmtime_val_t,
    nargs: usize,
    results: *mut wasmtime_val_t,
    nresults: usize,
) -> *mut wasm_trap_t;

/// Adapts a C callback into a closure the engine can call.
///
/// The returned closure owns the environment; dropping it (which the engine
/// does once the function can no longer be called) runs `finalizer` exactly
/// once.
pub(crate) fn c_callback_to_rust_fn(
    callback: wasmtime_func_callback_t,
    data: *mut c_void,
    finalizer: wasm_finalizer_t,
) -> impl Fn(Caller<'_, StoreData>, &[Val], &mut [Val]) -> anyhow::Result<()> + Send + Sync + 'static
{
    let foreign = ForeignData { data, finalizer };
    move |mut caller, params, results| {
        let _ = &foreign; // move entire foreign into this closure

        let mut vparams = params
            .iter()
            .cloned()
            .map(|p| wasmtime_val_t::from_val(&mut caller, p))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let mut vresults = (0..results.len())
            .map(|_| wasmtime_val_t::default())
            .collect::<Vec<_>>();

        let mut c = wasmtime_caller_t {
            caller: &mut caller as *mut Caller<'_, StoreData> as *mut _,
            context: wasmtime_context_t::for_caller(&mut caller),
        };
        let trap = unsafe {
            callback(
                foreign.data,
                &mut c,
                vparams.as_ptr(),
                vparams.len(),
                vresults.as_mut_ptr(),
                vresults.len(),
            )
        };

        for param in vparams.iter_mut() {
            unsafe { unroot_val(&mut caller, param) };
        }
        if !trap.is_null() {
            for result in vresults.iter_mut() {
                unsafe { unroot_val(&mut caller, result) };
            }
            let trap = unsafe { Box::from_raw(trap) };
            return Err(trap.error);
        }

        for (i, result) in vresults.iter_mut().enumerate() {
            results[i] = unsafe { result.take_val(&mut caller) };
        }
        Ok(())
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_func_new(
    context: &mut wasmtime_context_t,
    ty: &wasm_functype_t,
    callback: wasmtime_func_callback_t,
    data: *mut c_void,
    finalizer: wasm_finalizer_t,
    func: &mut MaybeUninit<wasmtime_func_t>,
) {
    let mut cx = context.cx();
    let ty = ty.to_wasmtime(cx.engine());
    let cb = c_callback_to_rust_fn(callback, data, finalizer);
    let f = Func::new(&mut cx, ty, cb);
    log::trace!("registered host function with environment {data:p}");
    func.write(wasmtime_func_t { func: f });
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_func_call(
    context: &mut wasmtime_context_t,
    func: &wasmtime_func_t,
    args: *const wasmtime_val_t,
    nargs: usize,
    results: *mut wasmtime_val_t,
    nresults: usize,
    trap_ret: &mut *mut wasm_trap_t,
) -> *mut wasmtime_error_t {
    let mut cx = context.cx();
    let args = unsafe { crate::slice_from_raw_parts(args, nargs) };
    let results = unsafe { crate::slice_from_raw_parts_mut(results, nresults) };

    let ty = func.func.ty(&cx);
    if ty.results().len() != results.len() {
        return Box::into_raw(Box::new(
            anyhow!("wrong number of results provided").into(),
        ));
    }
    // Arguments and results are only rooted for the duration of the call.
    let mut scope = RootScope::new(&mut cx);
    let params = args
        .iter()
        .map(|a| unsafe { a.to_val(&mut scope) })
        .collect::<Vec<_>>();
    let mut out = vec![Val::I32(0); results.len()];

    // We're calling arbitrary code here most of the time, and we in general
    // want to try to insulate callers against bugs in wasmtime/etc if we can.
    // As a result we catch panics here and transform them to traps to allow
    // the caller to have any insulation possible against Rust panics.
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        func.func.call(&mut scope, &params, &mut out)
    }));
    match result {
        Ok(Ok(())) => {
            let converted = out
                .into_iter()
                .map(|val| wasmtime_val_t::from_val(&mut scope, val))
                .collect::<anyhow::Result<Vec<_>>>();
            handle_result(converted, |vals| {
                for (slot, val) in results.iter_mut().zip(vals) {
                    *slot = val;
                }
            })
        }
        Ok(Err(err)) => handle_call_error(err, trap_ret),
        Err(panic) => {
            *trap_ret = panic_to_trap(panic);
            ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_func_type(
    context: &mut wasmtime_context_t,
    func: &wasmtime_func_t,
) -> *mut wasm_functype_t {
    let ty = func.func.ty(context.cx());
    Box::into_raw(Box::new(wasm_functype_t::from_wasmtime(&ty)))
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_caller_context(caller: &mut wasmtime_caller_t) -> *mut wasmtime_context_t {
    &mut caller.context
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_caller_export_get(
    caller: &mut wasmtime_caller_t,
    name: *const u8,
    name_len: usize,
    item: &mut MaybeUninit<wasmtime_extern_t>,
) -> bool {
    let name = match unsafe { crate::str_from_raw_parts(name, name_len) } {
        Some(name) => name,
        None => return false,
    };
    let caller = unsafe { &mut *caller.caller };
    match caller
        .get_export(name)
        .and_then(wasmtime_extern_t::from_extern)
    {
        Some(export) => {
            item.write(export);
            true
        }
        None => false,
    }
}
