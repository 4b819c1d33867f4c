use crate::error::check;
use crate::{Engine, ExternKind, Result};
use std::fmt;
use std::ptr;
use wasmbridge_c_api as ffi;

/// A compiled WebAssembly module, ready to be instantiated.
///
/// A `Module` can be instantiated any number of times, in any store created
/// from the same [`Engine`]. Cloning a module is cheap and shares the
/// compiled code.
pub struct Module {
    engine: Engine,
    raw: *mut ffi::wasm_module_t,
}

// Compiled modules are immutable and the native handle is internally
// reference counted.
unsafe impl Send for Module {}
unsafe impl Sync for Module {}

/// Describes one import of a [`Module`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportType {
    module: String,
    name: String,
    kind: ExternKind,
}

impl ImportType {
    /// The module namespace of this import.
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ExternKind {
        self.kind
    }
}

/// Describes one export of a [`Module`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportType {
    name: String,
    kind: ExternKind,
}

impl ExportType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ExternKind {
        self.kind
    }
}

impl Module {
    /// Compiles `bytes`, which may be a binary module or its text format.
    ///
    /// Malformed or invalid input is reported as a native error carrying
    /// the engine's diagnostic.
    pub fn new(engine: &Engine, bytes: impl AsRef<[u8]>) -> Result<Module> {
        let bytes = bytes.as_ref();
        let mut raw = ptr::null_mut();
        check(unsafe { ffi::wasmtime_module_new(engine.native(), bytes.as_ptr(), bytes.len(), &mut raw) })?;
        Ok(Module::from_raw(engine, raw))
    }

    /// Validates a binary module without compiling it.
    pub fn validate(engine: &Engine, binary: &[u8]) -> Result<()> {
        check(unsafe { ffi::wasmtime_module_validate(engine.native(), binary.as_ptr(), binary.len()) })
    }

    /// Serializes the compiled code so it can later be loaded with
    /// [`Module::deserialize`] without compiling again.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = ffi::wasm_byte_vec_t::default();
        check(ffi::wasmtime_module_serialize(self.native(), &mut out))?;
        Ok(out.take())
    }

    /// Loads a module previously produced by [`Module::serialize`].
    ///
    /// # Unsafety
    ///
    /// The engine trusts `bytes` completely: they are mapped and executed as
    /// native code. Only pass the output of [`Module::serialize`] from an
    /// engine with the same configuration, never untrusted input.
    pub unsafe fn deserialize(engine: &Engine, bytes: impl AsRef<[u8]>) -> Result<Module> {
        let bytes = bytes.as_ref();
        let mut raw = ptr::null_mut();
        check(unsafe {
            ffi::wasmtime_module_deserialize(engine.native(), bytes.as_ptr(), bytes.len(), &mut raw)
        })?;
        Ok(Module::from_raw(engine, raw))
    }

    fn from_raw(engine: &Engine, raw: *mut ffi::wasm_module_t) -> Module {
        log::trace!("created module {raw:p}");
        Module {
            engine: engine.clone(),
            raw,
        }
    }

    /// The imports this module requires, in the order instantiation expects
    /// them.
    pub fn imports(&self) -> Vec<ImportType> {
        let len = ffi::wasmtime_module_imports_len(self.native());
        (0..len)
            .filter_map(|n| {
                let (mut module, mut module_len) = (ptr::null(), 0);
                let (mut name, mut name_len) = (ptr::null(), 0);
                let mut kind = 0;
                let found = ffi::wasmtime_module_import_nth(
                    self.native(),
                    n,
                    &mut module,
                    &mut module_len,
                    &mut name,
                    &mut name_len,
                    &mut kind,
                );
                found.then(|| ImportType {
                    module: unsafe { copy_name(module, module_len) },
                    name: unsafe { copy_name(name, name_len) },
                    kind: ExternKind::from_native(kind),
                })
            })
            .collect()
    }

    pub fn exports(&self) -> Vec<ExportType> {
        let len = ffi::wasmtime_module_exports_len(self.native());
        (0..len)
            .filter_map(|n| {
                let (mut name, mut name_len) = (ptr::null(), 0);
                let mut kind = 0;
                let found = ffi::wasmtime_module_export_nth(
                    self.native(),
                    n,
                    &mut name,
                    &mut name_len,
                    &mut kind,
                );
                found.then(|| ExportType {
                    name: unsafe { copy_name(name, name_len) },
                    kind: ExternKind::from_native(kind),
                })
            })
            .collect()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Releases this handle. Instances already created from the module are
    /// unaffected.
    pub fn close(self) {
        drop(self);
    }

    pub(crate) fn native(&self) -> &ffi::wasm_module_t {
        unsafe { &*self.raw }
    }
}

unsafe fn copy_name(ptr: *const u8, len: usize) -> String {
    if len == 0 {
        return String::new();
    }
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
    String::from_utf8_lossy(bytes).into_owned()
}

impl Clone for Module {
    fn clone(&self) -> Module {
        Module::from_raw(&self.engine, ffi::wasmtime_module_clone(self.native()))
    }
}

impl Drop for Module {
    fn drop(&mut self) {
        log::trace!("deleting module {:p}", self.raw);
        unsafe { ffi::wasmtime_module_delete(self.raw) };
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("imports", &self.imports())
            .field("exports", &self.exports())
            .finish()
    }
}
