use crate::{
    handle_result, wasm_memorytype_t, wasmtime_context_t, wasmtime_error_t, wasmtime_memory_t,
};
use std::mem::MaybeUninit;
use wasmtime::Memory;

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_memory_new(
    context: &mut wasmtime_context_t,
    ty: &wasm_memorytype_t,
    ret: &mut MaybeUninit<wasmtime_memory_t>,
) -> *mut wasmtime_error_t {
    handle_result(Memory::new(context.cx(), ty.to_wasmtime()), |memory| {
        ret.write(wasmtime_memory_t { memory });
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_memory_type(
    context: &mut wasmtime_context_t,
    mem: &wasmtime_memory_t,
) -> wasm_memorytype_t {
    wasm_memorytype_t::from_wasmtime(&mem.memory.ty(context.cx()))
}

/// Base of linear memory. Invalidated by any operation that may grow it.
#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_memory_data(context: &mut wasmtime_context_t, mem: &wasmtime_memory_t) -> *mut u8 {
    mem.memory.data_ptr(context.cx())
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_memory_data_size(
    context: &mut wasmtime_context_t,
    mem: &wasmtime_memory_t,
) -> usize {
    mem.memory.data_size(context.cx())
}

/// Size in 64 KiB pages.
#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_memory_size(context: &mut wasmtime_context_t, mem: &wasmtime_memory_t) -> u64 {
    mem.memory.size(context.cx())
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_memory_grow(
    context: &mut wasmtime_context_t,
    mem: &wasmtime_memory_t,
    delta: u64,
    prev_size: &mut u64,
) -> *mut wasmtime_error_t {
    let result = mem.memory.grow(context.cx(), delta);
    if let Err(e) = &result {
        log::debug!("memory.grow by {delta} pages failed: {e}");
    }
    handle_result(result, |prev| *prev_size = prev)
}
