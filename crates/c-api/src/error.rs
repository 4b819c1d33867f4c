use crate::{I32Exit, wasm_byte_vec_t};
use anyhow::Error;

#[repr(C)]
pub struct wasmtime_error_t {
    pub(crate) error: Error,
}

impl From<Error> for wasmtime_error_t {
    fn from(error: Error) -> wasmtime_error_t {
        wasmtime_error_t { error }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_error_new(message: *const u8, len: usize) -> *mut wasmtime_error_t {
    let bytes = unsafe { crate::slice_from_raw_parts(message, len) };
    let message = String::from_utf8_lossy(bytes);
    Box::into_raw(Box::new(Error::msg(message.into_owned()).into()))
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_error_message(error: &wasmtime_error_t, message: &mut wasm_byte_vec_t) {
    message.set_buffer(format!("{:#}", error.error).into_bytes());
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_error_exit_status(error: &wasmtime_error_t, status: &mut i32) -> bool {
    if let Some(exit) = error.error.downcast_ref::<I32Exit>() {
        *status = exit.0;
        return true;
    }
    false
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_error_delete(error: *mut wasmtime_error_t) {
    if !error.is_null() {
        drop(unsafe { Box::from_raw(error) });
    }
}
