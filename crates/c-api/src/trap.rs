use crate::{wasm_byte_vec_t, wasm_frame_vec_t};
use anyhow::Error;
use std::fmt;
use wasmtime::{Trap, WasmBacktrace};

/// A trap raised by host code, carrying the host's message verbatim.
#[derive(Debug)]
pub struct HostTrap(pub String);

impl fmt::Display for HostTrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for HostTrap {}

/// A request from host code to terminate the guest with an exit status.
#[derive(Debug, Clone, Copy)]
pub struct I32Exit(pub i32);

impl fmt::Display for I32Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exited with i32 exit status {}", self.0)
    }
}

impl std::error::Error for I32Exit {}

#[repr(C)]
pub struct wasm_trap_t {
    pub(crate) error: Error,
}

impl wasm_trap_t {
    pub(crate) fn new(error: Error) -> wasm_trap_t {
        wasm_trap_t { error }
    }
}

pub type wasmtime_trap_code_t = u8;

pub const WASMTIME_TRAP_CODE_STACK_OVERFLOW: wasmtime_trap_code_t = 0;
pub const WASMTIME_TRAP_CODE_MEMORY_OUT_OF_BOUNDS: wasmtime_trap_code_t = 1;
pub const WASMTIME_TRAP_CODE_HEAP_MISALIGNED: wasmtime_trap_code_t = 2;
pub const WASMTIME_TRAP_CODE_TABLE_OUT_OF_BOUNDS: wasmtime_trap_code_t = 3;
pub const WASMTIME_TRAP_CODE_INDIRECT_CALL_TO_NULL: wasmtime_trap_code_t = 4;
pub const WASMTIME_TRAP_CODE_BAD_SIGNATURE: wasmtime_trap_code_t = 5;
pub const WASMTIME_TRAP_CODE_INTEGER_OVERFLOW: wasmtime_trap_code_t = 6;
pub const WASMTIME_TRAP_CODE_INTEGER_DIVISION_BY_ZERO: wasmtime_trap_code_t = 7;
pub const WASMTIME_TRAP_CODE_BAD_CONVERSION_TO_INTEGER: wasmtime_trap_code_t = 8;
pub const WASMTIME_TRAP_CODE_UNREACHABLE_CODE_REACHED: wasmtime_trap_code_t = 9;
pub const WASMTIME_TRAP_CODE_INTERRUPT: wasmtime_trap_code_t = 10;
pub const WASMTIME_TRAP_CODE_OUT_OF_FUEL: wasmtime_trap_code_t = 11;

#[derive(Clone)]
pub struct wasm_frame_t {
    func_index: u32,
    func_offset: Option<usize>,
    module_offset: Option<usize>,
    func_name: Option<String>,
    module_name: Option<String>,
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_trap_new(message: *const u8, len: usize) -> *mut wasm_trap_t {
    let bytes = unsafe { crate::slice_from_raw_parts(message, len) };
    let message = String::from_utf8_lossy(bytes);
    Box::into_raw(Box::new(wasm_trap_t::new(Error::new(HostTrap(
        message.into_owned(),
    )))))
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_trap_new_exit(status: i32) -> *mut wasm_trap_t {
    Box::into_raw(Box::new(wasm_trap_t::new(Error::new(I32Exit(status)))))
}

#[unsafe(no_mangle)]
pub extern "C" fn wasm_trap_message(trap: &wasm_trap_t, out: &mut wasm_byte_vec_t) {
    let message = if let Some(host) = trap.error.downcast_ref::<HostTrap>() {
        host.0.clone()
    } else if let Some(code) = trap.error.downcast_ref::<Trap>() {
        code.to_string()
    } else {
        format!("{:#}", trap.error)
    };
    out.set_buffer(message.into_bytes());
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_trap_code(trap: &wasm_trap_t, code: &mut wasmtime_trap_code_t) -> bool {
    let trap = match trap.error.downcast_ref::<Trap>() {
        Some(trap) => trap,
        None => return false,
    };
    *code = match trap {
        Trap::StackOverflow => WASMTIME_TRAP_CODE_STACK_OVERFLOW,
        Trap::MemoryOutOfBounds => WASMTIME_TRAP_CODE_MEMORY_OUT_OF_BOUNDS,
        Trap::HeapMisaligned => WASMTIME_TRAP_CODE_HEAP_MISALIGNED,
        Trap::TableOutOfBounds => WASMTIME_TRAP_CODE_TABLE_OUT_OF_BOUNDS,
        Trap::IndirectCallToNull => WASMTIME_TRAP_CODE_INDIRECT_CALL_TO_NULL,
        Trap::BadSignature => WASMTIME_TRAP_CODE_BAD_SIGNATURE,
        Trap::IntegerOverflow => WASMTIME_TRAP_CODE_INTEGER_OVERFLOW,
        Trap::IntegerDivisionByZero => WASMTIME_TRAP_CODE_INTEGER_DIVISION_BY_ZERO,
        Trap::BadConversionToInteger => WASMTIME_TRAP_CODE_BAD_CONVERSION_TO_INTEGER,
        Trap::UnreachableCodeReached => WASMTIME_TRAP_CODE_UNREACHABLE_CODE_REACHED,
        Trap::Interrupt => WASMTIME_TRAP_CODE_INTERRUPT,
        Trap::OutOfFuel => WASMTIME_TRAP_CODE_OUT_OF_FUEL,
        _ => return false,
    };
    true
}

#[unsafe(no_mangle)]
pub extern "C" fn wasm_trap_trace(trap: &wasm_trap_t, out: &mut wasm_frame_vec_t) {
    let trace = match trap.error.downcast_ref::<WasmBacktrace>() {
        Some(trace) => trace,
        None => return out.set_buffer(Vec::new()),
    };
    let frames = trace
        .frames()
        .iter()
        .map(|frame| {
            Some(Box::new(wasm_frame_t {
                func_index: frame.func_index(),
                func_offset: frame.func_offset(),
                module_offset: frame.module_offset(),
                func_name: frame.func_name().map(|s| s.to_string()),
                module_name: frame.module().name().map(|s| s.to_string()),
            }))
        })
        .collect();
    out.set_buffer(frames);
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasm_trap_delete(trap: *mut wasm_trap_t) {
    if !trap.is_null() {
        drop(unsafe { Box::from_raw(trap) });
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn wasm_frame_func_index(frame: &wasm_frame_t) -> u32 {
    frame.func_index
}

#[unsafe(no_mangle)]
pub extern "C" fn wasm_frame_func_offset(frame: &wasm_frame_t) -> usize {
    frame.func_offset.unwrap_or(usize::MAX)
}

#[unsafe(no_mangle)]
pub extern "C" fn wasm_frame_module_offset(frame: &wasm_frame_t) -> usize {
    frame.module_offset.unwrap_or(usize::MAX)
}

/// Returns the function name, or null if the module carries no name for it.
/// The returned pointer is borrowed from `frame`.
#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_frame_func_name(frame: &wasm_frame_t, len: &mut usize) -> *const u8 {
    borrowed_name(frame.func_name.as_deref(), len)
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_frame_module_name(frame: &wasm_frame_t, len: &mut usize) -> *const u8 {
    borrowed_name(frame.module_name.as_deref(), len)
}

fn borrowed_name(name: Option<&str>, len: &mut usize) -> *const u8 {
    match name {
        Some(name) => {
            *len = name.len();
            name.as_ptr()
        }
        None => {
            *len = 0;
            std::ptr::null()
        }
    }
}
