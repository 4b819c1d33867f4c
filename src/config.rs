//! Engine configuration.

use anyhow::{Context, Result};
use serde_derive::Deserialize;
use std::fs;
use std::path::Path;
use wasmbridge_c_api as ffi;

/// Settings used to create an [`Engine`](crate::Engine).
///
/// Settings left unset keep the engine's defaults. A `Config` can also be
/// loaded from TOML, where settings live in an `[engine]` table and use
/// kebab-case keys:
///
/// ```toml
/// [engine]
/// consume-fuel = true
/// max-wasm-stack = 1048576
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    consume_fuel: bool,
    #[serde(default)]
    epoch_interruption: bool,
    max_wasm_stack: Option<usize>,
    wasm_simd: Option<bool>,
    wasm_reference_types: Option<bool>,
    #[serde(default)]
    debug_info: bool,
}

// wrapped, so settings get a named section in the file
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    engine: Config,
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Enables fuel accounting. Stores start with no fuel, so guest code
    /// traps immediately until [`Store::set_fuel`](crate::Store::set_fuel)
    /// is called.
    pub fn consume_fuel(&mut self, enable: bool) -> &mut Self {
        self.consume_fuel = enable;
        self
    }

    /// Enables interruption of guest code once a store's epoch deadline has
    /// passed.
    pub fn epoch_interruption(&mut self, enable: bool) -> &mut Self {
        self.epoch_interruption = enable;
        self
    }

    /// Maximum native stack, in bytes, that guest code may use.
    pub fn max_wasm_stack(&mut self, size: usize) -> &mut Self {
        self.max_wasm_stack = Some(size);
        self
    }

    pub fn wasm_simd(&mut self, enable: bool) -> &mut Self {
        self.wasm_simd = Some(enable);
        self
    }

    pub fn wasm_reference_types(&mut self, enable: bool) -> &mut Self {
        self.wasm_reference_types = Some(enable);
        self
    }

    /// Emits native debug info for compiled code.
    pub fn debug_info(&mut self, enable: bool) -> &mut Self {
        self.debug_info = enable;
        self
    }

    /// Parses settings from the contents of a TOML file.
    pub fn from_toml(contents: &str) -> Result<Config> {
        let file = toml::from_str::<ConfigFile>(contents).context("failed to parse config")?;
        Ok(file.engine)
    }

    /// Reads and parses settings from the TOML file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Config::from_toml(&contents)
            .with_context(|| format!("failed to load config file: {}", path.display()))
    }

    /// Builds a native config carrying these settings. The caller owns the
    /// returned handle.
    pub(crate) fn to_native(&self) -> *mut ffi::wasm_config_t {
        let raw = ffi::wasm_config_new();
        unsafe {
            ffi::wasmtime_config_consume_fuel_set(raw, self.consume_fuel);
            ffi::wasmtime_config_epoch_interruption_set(raw, self.epoch_interruption);
            ffi::wasmtime_config_debug_info_set(raw, self.debug_info);
            if let Some(size) = self.max_wasm_stack {
                ffi::wasmtime_config_max_wasm_stack_set(raw, size);
            }
            if let Some(enable) = self.wasm_simd {
                ffi::wasmtime_config_wasm_simd_set(raw, enable);
            }
            if let Some(enable) = self.wasm_reference_types {
                ffi::wasmtime_config_wasm_reference_types_set(raw, enable);
            }
        }
        raw
    }
}
