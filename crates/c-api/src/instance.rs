use crate::{
    handle_call_error, panic_to_trap, wasm_module_t, wasm_trap_t, wasmtime_context_t,
    wasmtime_error_t, wasmtime_extern_t,
};
use std::mem::MaybeUninit;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use wasmtime::Instance;

/// A store-owned instance; like the other externs it is released with its
/// store.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct wasmtime_instance_t {
    pub(crate) instance: Instance,
}

/// Instantiates `module` with positional imports.
///
/// A trap raised by the start function is reported through `trap_ptr`; any
/// other failure, including a mismatched import, is the returned error.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_instance_new(
    context: &mut wasmtime_context_t,
    module: &wasm_module_t,
    imports: *const wasmtime_extern_t,
    nimports: usize,
    instance: &mut MaybeUninit<wasmtime_instance_t>,
    trap_ptr: &mut *mut wasm_trap_t,
) -> *mut wasmtime_error_t {
    let imports = unsafe { crate::slice_from_raw_parts(imports, nimports) }
        .iter()
        .map(|i| unsafe { i.to_extern() })
        .collect::<Vec<_>>();
    let mut cx = context.cx();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        Instance::new(&mut cx, &module.module, &imports)
    }));
    match result {
        Ok(Ok(i)) => {
            log::trace!("instantiated module with {nimports} imports");
            instance.write(wasmtime_instance_t { instance: i });
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
pub unsafe extern "C" fn wasmtime_instance_export_get(
    context: &mut wasmtime_context_t,
    instance: &wasmtime_instance_t,
    name: *const u8,
    name_len: usize,
    item: &mut MaybeUninit<wasmtime_extern_t>,
) -> bool {
    let Some(name) = (unsafe { crate::str_from_raw_parts(name, name_len) }) else {
        return false;
    };
    match instance
        .instance
        .get_export(context.cx(), name)
        .and_then(wasmtime_extern_t::from_extern)
    {
        Some(e) => {
            item.write(e);
            true
        }
        None => false,
    }
}

/// Reads the `index`th export. The name is copied into a fresh allocation
/// owned by the caller and released with `wasm_byte_vec_delete`.
#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_instance_export_nth(
    context: &mut wasmtime_context_t,
    instance: &wasmtime_instance_t,
    index: usize,
    name: &mut crate::wasm_name_t,
    item: &mut MaybeUninit<wasmtime_extern_t>,
) -> bool {
    let mut cx = context.cx();
    match instance.instance.exports(&mut cx).nth(index) {
        Some(e) => {
            let export_name = e.name().as_bytes().to_vec();
            match wasmtime_extern_t::from_extern(e.into_extern()) {
                Some(ext) => {
                    name.set_buffer(export_name);
                    item.write(ext);
                    true
                }
                None => false,
            }
        }
        None => false,
    }
}
