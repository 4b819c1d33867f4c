use wasmtime::Config;

#[repr(C)]
pub struct wasm_config_t {
    pub(crate) config: Config,
}

#[unsafe(no_mangle)]
pub extern "C" fn wasm_config_new() -> *mut wasm_config_t {
    Box::into_raw(Box::new(wasm_config_t {
        config: Config::default(),
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_config_consume_fuel_set(c: *mut wasm_config_t, enable: bool) {
    unsafe { (*c).config.consume_fuel(enable) };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_config_epoch_interruption_set(
    c: *mut wasm_config_t,
    enable: bool,
) {
    unsafe { (*c).config.epoch_interruption(enable) };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_config_max_wasm_stack_set(c: *mut wasm_config_t, size: usize) {
    unsafe { (*c).config.max_wasm_stack(size) };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_config_wasm_simd_set(c: *mut wasm_config_t, enable: bool) {
    unsafe { (*c).config.wasm_simd(enable) };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_config_wasm_reference_types_set(
    c: *mut wasm_config_t,
    enable: bool,
) {
    unsafe { (*c).config.wasm_reference_types(enable) };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_config_debug_info_set(c: *mut wasm_config_t, enable: bool) {
    unsafe { (*c).config.debug_info(enable) };
}
