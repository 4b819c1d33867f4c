//! The native embedding ABI that `wasmbridge` binds over.
//!
//! Every object the engine hands out is an opaque, heap-allocated handle with
//! exactly one release entry point (`*_delete`, or `*_unroot` for handles
//! that need their store), every entry point is `extern "C"`, and
//! values and externs cross the boundary as `#[repr(C)]` tagged unions. Host
//! functions are registered as a plain function pointer plus an environment
//! pointer and a finalizer, which the engine invokes exactly once when the
//! function is no longer reachable.
//!
//! The execution engine behind this ABI is Wasmtime. Nothing in this crate
//! is meant to be used from Rust directly other than through these entry
//! points; the layout of the handles is private.

#![expect(non_camel_case_types, reason = "matching C style, not Rust")]

use std::ffi::c_void;
use wasmtime::Trap;

mod config;
mod engine;
mod error;
mod r#extern;
mod func;
mod global;
mod instance;
mod linker;
mod memory;
mod module;
mod r#ref;
mod store;
mod table;
mod trap;
mod types;
mod val;
mod vec;

pub use crate::config::*;
pub use crate::engine::*;
pub use crate::error::*;
pub use crate::func::*;
pub use crate::global::*;
pub use crate::instance::*;
pub use crate::linker::*;
pub use crate::memory::*;
pub use crate::module::*;
pub use crate::r#extern::*;
pub use crate::r#ref::*;
pub use crate::store::*;
pub use crate::table::*;
pub use crate::trap::*;
pub use crate::types::*;
pub use crate::val::*;
pub use crate::vec::*;

/// Finalizer signature shared by store data, host function environments and
/// externref host data.
pub type wasm_finalizer_t = Option<unsafe extern "C" fn(*mut c_void)>;

/// Helper for running a C-defined finalizer over some data when the Rust
/// structure is dropped.
pub struct ForeignData {
    pub(crate) data: *mut c_void,
    pub(crate) finalizer: wasm_finalizer_t,
}

unsafe impl Send for ForeignData {}
unsafe impl Sync for ForeignData {}

impl Drop for ForeignData {
    fn drop(&mut self) {
        if let Some(f) = self.finalizer {
            log::trace!("running foreign finalizer for {:p}", self.data);
            unsafe { f(self.data) }
        }
    }
}

/// Helper for creating Rust slices from C inputs.
///
/// This specifically disregards the `ptr` argument if the length is zero. The
/// `ptr` in that case maybe `NULL` or invalid, and it's not valid to have a
/// zero-length Rust slice with a `NULL` pointer.
pub(crate) unsafe fn slice_from_raw_parts<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, len) }
    }
}

/// Same as above, but for `*_mut`
pub(crate) unsafe fn slice_from_raw_parts_mut<'a, T>(ptr: *mut T, len: usize) -> &'a mut [T] {
    if len == 0 {
        &mut []
    } else {
        unsafe { std::slice::from_raw_parts_mut(ptr, len) }
    }
}

/// Reads a name passed as a pointer/length pair, rejecting invalid UTF-8.
pub(crate) unsafe fn str_from_raw_parts<'a>(ptr: *const u8, len: usize) -> Option<&'a str> {
    std::str::from_utf8(unsafe { slice_from_raw_parts(ptr, len) }).ok()
}

/// Converts a Rust result into the C convention of a nullable error pointer,
/// running `ok` on success.
pub(crate) fn handle_result<T>(
    result: anyhow::Result<T>,
    ok: impl FnOnce(T),
) -> *mut wasmtime_error_t {
    match result {
        Ok(value) => {
            ok(value);
            std::ptr::null_mut()
        }
        Err(error) => Box::into_raw(Box::new(wasmtime_error_t::from(error))),
    }
}

/// Failures of calls and instantiations are split between the trap
/// out-pointer and the returned error.
pub(crate) fn handle_call_error(
    err: anyhow::Error,
    trap_ret: &mut *mut wasm_trap_t,
) -> *mut wasmtime_error_t {
    if err.is::<Trap>() || err.is::<HostTrap>() {
        log::debug!("call trapped: {err:?}");
        *trap_ret = Box::into_raw(Box::new(wasm_trap_t::new(err)));
        std::ptr::null_mut()
    } else {
        log::debug!("call failed: {err:?}");
        Box::into_raw(Box::new(wasmtime_error_t::from(err)))
    }
}

/// Turns a caught panic payload into a trap, so that a Rust panic never
/// unwinds out of an `extern "C"` entry point.
pub(crate) fn panic_to_trap(panic: Box<dyn std::any::Any + Send>) -> *mut wasm_trap_t {
    let message = if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg.to_string()
    } else {
        "rust panic happened".to_string()
    };
    Box::into_raw(Box::new(wasm_trap_t::new(anyhow::Error::new(HostTrap(
        message,
    )))))
}
