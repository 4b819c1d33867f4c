use crate::{ExternKind, Trap, ValType};
use std::fmt;
use std::ptr::NonNull;
use wasmbridge_c_api as ffi;

/// A convenience alias for results produced by this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors returned by the binding.
///
/// Mistakes made by the embedder are reported as [`Error::Usage`] before the
/// engine is ever consulted. Failures the engine reports are split between
/// [`Error::Trap`], for guest execution that trapped, and [`Error::Native`]
/// for everything else.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("{message}")]
    Native {
        message: String,
        /// Set when the failure is a request to exit with a status code.
        exit_status: Option<i32>,
    },

    #[error(transparent)]
    Trap(#[from] Trap),
}

impl Error {
    /// The exit status requested by a host function, if this error is one.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            Error::Native { exit_status, .. } => *exit_status,
            _ => None,
        }
    }

    pub fn as_trap(&self) -> Option<&Trap> {
        match self {
            Error::Trap(trap) => Some(trap),
            _ => None,
        }
    }

    pub fn as_usage(&self) -> Option<&UsageError> {
        match self {
            Error::Usage(usage) => Some(usage),
            _ => None,
        }
    }
}

/// Embedder mistakes caught before a native call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("expected {expected} arguments, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: ValType, actual: ValType },

    #[error("expected a {expected} extern, found a {actual}")]
    KindMismatch {
        expected: ExternKind,
        actual: ExternKind,
    },

    #[error("object used with a store it does not belong to")]
    CrossStore,

    #[error("objects from different engines cannot be combined")]
    CrossEngine,

    #[error("out of bounds memory access: {len} bytes at offset {offset}, memory is {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error("host function returned {actual} results, expected {expected}")]
    ResultCountMismatch { expected: usize, actual: usize },

    #[error("module expects {expected} imports, {actual} were provided")]
    ImportCountMismatch { expected: usize, actual: usize },

    #[error("cannot consume {requested} fuel, only {remaining} remaining")]
    InsufficientFuel { requested: u64, remaining: u64 },
}

/// An owned native error, released when dropped.
pub(crate) struct OwnedError(NonNull<ffi::wasmtime_error_t>);

impl OwnedError {
    /// Takes ownership of `ptr`, returning `None` for the null "no error"
    /// pointer.
    pub(crate) unsafe fn from_raw(ptr: *mut ffi::wasmtime_error_t) -> Option<OwnedError> {
        NonNull::new(ptr).map(OwnedError)
    }

    #[cfg(test)]
    pub(crate) fn new(message: &str) -> OwnedError {
        let ptr = unsafe { ffi::wasmtime_error_new(message.as_ptr(), message.len()) };
        OwnedError(NonNull::from(unsafe { &mut *ptr }))
    }

    fn message(&self) -> String {
        let mut out = ffi::wasm_byte_vec_t::default();
        unsafe { ffi::wasmtime_error_message(self.0.as_ref(), &mut out) };
        String::from_utf8_lossy(out.as_slice()).into_owned()
    }

    fn exit_status(&self) -> Option<i32> {
        let mut status = 0;
        if unsafe { ffi::wasmtime_error_exit_status(self.0.as_ref(), &mut status) } {
            Some(status)
        } else {
            None
        }
    }
}

impl Drop for OwnedError {
    fn drop(&mut self) {
        unsafe { ffi::wasmtime_error_delete(self.0.as_ptr()) };
    }
}

impl fmt::Debug for OwnedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedError").field(&self.0).finish()
    }
}

impl From<OwnedError> for Error {
    fn from(error: OwnedError) -> Error {
        let message = error.message();
        let exit_status = error.exit_status();
        log::debug!("native error: {message}");
        Error::Native {
            message,
            exit_status,
        }
    }
}

/// Turns a native "nullable error" return into a `Result`.
pub(crate) fn check(ptr: *mut ffi::wasmtime_error_t) -> Result<()> {
    match unsafe { OwnedError::from_raw(ptr) } {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

/// Like [`check`], for calls that report traps through a separate
/// out-pointer. A trap wins over an error if, against the ABI contract, both
/// are set; the other is still released.
pub(crate) fn check_call(
    error: *mut ffi::wasmtime_error_t,
    trap: *mut ffi::wasm_trap_t,
) -> Result<()> {
    let error = unsafe { OwnedError::from_raw(error) };
    let trap = unsafe { crate::trap::OwnedTrap::from_raw(trap) };
    match (trap, error) {
        (Some(trap), _) => Err(Error::Trap(trap.into())),
        (None, Some(error)) => Err(error.into()),
        (None, None) => Ok(()),
    }
}
