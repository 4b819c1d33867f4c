use crate::{handle_result, wasm_config_t, wasmtime_error_t};
use wasmtime::Engine;

#[repr(C)]
pub struct wasm_engine_t {
    pub(crate) engine: Engine,
}

#[unsafe(no_mangle)]
pub extern "C" fn wasm_engine_new() -> *mut wasm_engine_t {
    Box::into_raw(Box::new(wasm_engine_t {
        engine: Engine::default(),
    }))
}

/// Consumes `config`; on failure `*ret` is left untouched and the returned
/// error describes the invalid configuration.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasm_engine_new_with_config(
    config: *mut wasm_config_t,
    ret: &mut *mut wasm_engine_t,
) -> *mut wasmtime_error_t {
    let config = unsafe { Box::from_raw(config) }.config;
    handle_result(Engine::new(&config), |engine| {
        *ret = Box::into_raw(Box::new(wasm_engine_t { engine }));
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_engine_increment_epoch(engine: &wasm_engine_t) {
    engine.engine.increment_epoch();
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasm_engine_delete(engine: *mut wasm_engine_t) {
    if !engine.is_null() {
        drop(unsafe { Box::from_raw(engine) });
    }
}
