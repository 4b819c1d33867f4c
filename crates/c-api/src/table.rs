use crate::{
    handle_result, val_into_ref, wasm_tabletype_t, wasmtime_context_t, wasmtime_error_t,
    wasmtime_table_t, wasmtime_val_t,
};
use std::mem::MaybeUninit;
use wasmtime::{RootScope, Table, Val};

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_table_new(
    context: &mut wasmtime_context_t,
    tt: &wasm_tabletype_t,
    init: &wasmtime_val_t,
    out: &mut MaybeUninit<wasmtime_table_t>,
) -> *mut wasmtime_error_t {
    let mut scope = RootScope::new(context.cx());
    let init = unsafe { init.to_val(&mut scope) };
    handle_result(
        val_into_ref(init).and_then(|init| Table::new(&mut scope, tt.to_wasmtime(), init)),
        |table| {
            out.write(wasmtime_table_t { table });
        },
    )
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_table_type(
    context: &mut wasmtime_context_t,
    table: &wasmtime_table_t,
) -> wasm_tabletype_t {
    wasm_tabletype_t::from_wasmtime(&table.table.ty(context.cx()))
}

/// Sets `found` to `false` if `index` is out of bounds. Otherwise `ret`
/// owns any reference it holds.
#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_table_get(
    context: &mut wasmtime_context_t,
    table: &wasmtime_table_t,
    index: u64,
    found: &mut bool,
    ret: &mut MaybeUninit<wasmtime_val_t>,
) -> *mut wasmtime_error_t {
    let mut scope = RootScope::new(context.cx());
    *found = false;
    match table.table.get(&mut scope, index) {
        Some(r) => handle_result(wasmtime_val_t::from_val(&mut scope, Val::from(r)), |v| {
            ret.write(v);
            *found = true;
        }),
        None => std::ptr::null_mut(),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_table_set(
    context: &mut wasmtime_context_t,
    table: &wasmtime_table_t,
    index: u64,
    val: &wasmtime_val_t,
) -> *mut wasmtime_error_t {
    let mut scope = RootScope::new(context.cx());
    let val = unsafe { val.to_val(&mut scope) };
    handle_result(
        val_into_ref(val).and_then(|r| table.table.set(&mut scope, index, r)),
        |()| {},
    )
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_table_size(context: &mut wasmtime_context_t, table: &wasmtime_table_t) -> u64 {
    table.table.size(context.cx())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_table_grow(
    context: &mut wasmtime_context_t,
    table: &wasmtime_table_t,
    delta: u64,
    init: &wasmtime_val_t,
    prev_size: &mut u64,
) -> *mut wasmtime_error_t {
    let mut scope = RootScope::new(context.cx());
    let init = unsafe { init.to_val(&mut scope) };
    handle_result(
        val_into_ref(init).and_then(|init| table.table.grow(&mut scope, delta, init)),
        |prev| *prev_size = prev,
    )
}
