use std::fmt;
use std::ptr::NonNull;
use wasmbridge_c_api as ffi;

/// A trap raised while executing WebAssembly, either by the guest itself or
/// by a host function it called.
#[derive(Debug, Clone)]
pub struct Trap {
    message: String,
    code: Option<TrapCode>,
    frames: Vec<FrameInfo>,
}

impl Trap {
    /// The trap message. For host-raised traps this is the host's message
    /// verbatim.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The instruction-level cause, or `None` for traps that did not come
    /// from a faulting instruction (host-raised traps, for instance).
    pub fn code(&self) -> Option<TrapCode> {
        self.code
    }

    /// Guest frames active when the trap occurred, innermost first.
    pub fn trace(&self) -> &[FrameInfo] {
        &self.frames
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.frames.is_empty() {
            f.write_str("\nwasm backtrace:")?;
            for (i, frame) in self.frames.iter().enumerate() {
                write!(f, "\n  {i:>3}: {frame}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Trap {}

/// Instruction-level trap causes reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrapCode {
    /// The current stack space was exhausted.
    StackOverflow,
    /// An out-of-bounds memory access.
    MemoryOutOfBounds,
    /// A wasm atomic operation was presented with a not-naturally-aligned
    /// linear-memory address.
    HeapMisaligned,
    /// An out-of-bounds access to a table.
    TableOutOfBounds,
    /// Indirect call to a null table entry.
    IndirectCallToNull,
    /// Signature mismatch on indirect call.
    BadSignature,
    /// An integer arithmetic operation caused an overflow.
    IntegerOverflow,
    /// An integer division by zero.
    IntegerDivisionByZero,
    /// Failed float-to-int conversion.
    BadConversionToInteger,
    /// Code that was supposed to have been unreachable was reached.
    UnreachableCodeReached,
    /// Execution has potentially run too long and may be interrupted.
    Interrupt,
    /// Execution has run out of the configured fuel amount.
    OutOfFuel,
}

impl TrapCode {
    pub(crate) fn from_native(code: ffi::wasmtime_trap_code_t) -> Option<TrapCode> {
        use TrapCode::*;
        Some(match code {
            ffi::WASMTIME_TRAP_CODE_STACK_OVERFLOW => StackOverflow,
            ffi::WASMTIME_TRAP_CODE_MEMORY_OUT_OF_BOUNDS => MemoryOutOfBounds,
            ffi::WASMTIME_TRAP_CODE_HEAP_MISALIGNED => HeapMisaligned,
            ffi::WASMTIME_TRAP_CODE_TABLE_OUT_OF_BOUNDS => TableOutOfBounds,
            ffi::WASMTIME_TRAP_CODE_INDIRECT_CALL_TO_NULL => IndirectCallToNull,
            ffi::WASMTIME_TRAP_CODE_BAD_SIGNATURE => BadSignature,
            ffi::WASMTIME_TRAP_CODE_INTEGER_OVERFLOW => IntegerOverflow,
            ffi::WASMTIME_TRAP_CODE_INTEGER_DIVISION_BY_ZERO => IntegerDivisionByZero,
            ffi::WASMTIME_TRAP_CODE_BAD_CONVERSION_TO_INTEGER => BadConversionToInteger,
            ffi::WASMTIME_TRAP_CODE_UNREACHABLE_CODE_REACHED => UnreachableCodeReached,
            ffi::WASMTIME_TRAP_CODE_INTERRUPT => Interrupt,
            ffi::WASMTIME_TRAP_CODE_OUT_OF_FUEL => OutOfFuel,
            _ => return None,
        })
    }
}

impl fmt::Display for TrapCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TrapCode::*;
        let desc = match self {
            StackOverflow => "call stack exhausted",
            MemoryOutOfBounds => "out of bounds memory access",
            HeapMisaligned => "unaligned atomic",
            TableOutOfBounds => "undefined element: out of bounds table access",
            IndirectCallToNull => "uninitialized element",
            BadSignature => "indirect call type mismatch",
            IntegerOverflow => "integer overflow",
            IntegerDivisionByZero => "integer divide by zero",
            BadConversionToInteger => "invalid conversion to integer",
            UnreachableCodeReached => "wasm `unreachable` instruction executed",
            Interrupt => "interrupt",
            OutOfFuel => "all fuel consumed by WebAssembly",
        };
        write!(f, "wasm trap: {desc}")
    }
}

/// One guest frame of a trap's backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    func_index: u32,
    func_offset: Option<usize>,
    module_offset: Option<usize>,
    func_name: Option<String>,
    module_name: Option<String>,
}

impl FrameInfo {
    /// Index of the function within its module's function index space.
    pub fn func_index(&self) -> u32 {
        self.func_index
    }

    /// Offset of the faulting instruction from the start of the function.
    pub fn func_offset(&self) -> Option<usize> {
        self.func_offset
    }

    /// Offset of the faulting instruction from the start of the module.
    pub fn module_offset(&self) -> Option<usize> {
        self.module_offset
    }

    pub fn func_name(&self) -> Option<&str> {
        self.func_name.as_deref()
    }

    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    unsafe fn from_native(frame: &ffi::wasm_frame_t) -> FrameInfo {
        let offset = |o: usize| if o == usize::MAX { None } else { Some(o) };
        let name = |ptr: *const u8, len: usize| {
            if ptr.is_null() {
                None
            } else {
                let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
                Some(String::from_utf8_lossy(bytes).into_owned())
            }
        };
        let mut func_name_len = 0;
        let func_name = ffi::wasmtime_frame_func_name(frame, &mut func_name_len);
        let mut module_name_len = 0;
        let module_name = ffi::wasmtime_frame_module_name(frame, &mut module_name_len);
        FrameInfo {
            func_index: ffi::wasm_frame_func_index(frame),
            func_offset: offset(ffi::wasm_frame_func_offset(frame)),
            module_offset: offset(ffi::wasm_frame_module_offset(frame)),
            func_name: name(func_name, func_name_len),
            module_name: name(module_name, module_name_len),
        }
    }
}

impl fmt::Display for FrameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(module) = &self.module_name {
            write!(f, "{module}!")?;
        }
        match &self.func_name {
            Some(name) => write!(f, "{name}")?,
            None => write!(f, "<wasm function {}>", self.func_index)?,
        }
        if let Some(offset) = self.module_offset {
            write!(f, " @ {offset:#x}")?;
        }
        Ok(())
    }
}

/// An owned native trap, released when dropped.
pub(crate) struct OwnedTrap(NonNull<ffi::wasm_trap_t>);

impl OwnedTrap {
    pub(crate) unsafe fn from_raw(ptr: *mut ffi::wasm_trap_t) -> Option<OwnedTrap> {
        NonNull::new(ptr).map(OwnedTrap)
    }

    fn native(&self) -> &ffi::wasm_trap_t {
        unsafe { self.0.as_ref() }
    }
}

impl Drop for OwnedTrap {
    fn drop(&mut self) {
        unsafe { ffi::wasm_trap_delete(self.0.as_ptr()) };
    }
}

impl From<OwnedTrap> for Trap {
    fn from(trap: OwnedTrap) -> Trap {
        let mut message = ffi::wasm_byte_vec_t::default();
        ffi::wasm_trap_message(trap.native(), &mut message);
        let message = String::from_utf8_lossy(message.as_slice()).into_owned();

        let mut code = 0;
        let code = if ffi::wasmtime_trap_code(trap.native(), &mut code) {
            TrapCode::from_native(code)
        } else {
            None
        };

        // Frames are read out one by one, then the whole vector goes away
        // with `frames` at the end of this scope.
        let mut frames = ffi::wasm_frame_vec_t::default();
        ffi::wasm_trap_trace(trap.native(), &mut frames);
        let frames = frames
            .as_slice()
            .iter()
            .flatten()
            .map(|frame| unsafe { FrameInfo::from_native(frame) })
            .collect::<Vec<_>>();

        log::debug!("trap: {message} (code: {code:?}, {} frames)", frames.len());
        Trap {
            message,
            code,
            frames,
        }
    }
}
