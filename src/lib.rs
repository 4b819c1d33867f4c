//! Safe, typed host bindings for embedding WebAssembly.
//!
//! `wasmbridge` wraps a native engine exposed through a C ABI
//! ([`wasmbridge_c_api`]) and turns its raw handles, tagged unions and
//! out-pointers into owned Rust values:
//!
//! * An [`Engine`] compiles [`Module`]s; a [`Store`] holds everything that
//!   instances create at runtime, along with a piece of host data `T`.
//! * [`Func`], [`Global`], [`Table`], [`Memory`] and [`Instance`] are cheap
//!   copyable references into a store. Using one with the wrong store is a
//!   [`UsageError::CrossStore`] rather than undefined behavior.
//! * Host functions are plain Rust closures. They receive a [`Caller`] for
//!   access to the store and the calling instance's exports, and can fail
//!   with any [`anyhow::Error`], which the guest observes as a trap.
//! * Failures come back as [`Error`]: embedder mistakes caught up front
//!   ([`Error::Usage`]), guest traps with a backtrace ([`Error::Trap`]) and
//!   everything else the engine reports ([`Error::Native`]).
//!
//! ```no_run
//! use wasmbridge::{Engine, FuncType, Func, Instance, Module, Store, Val, ValType};
//!
//! # fn main() -> anyhow::Result<()> {
//! let engine = Engine::default();
//! let module = Module::new(
//!     &engine,
//!     r#"(module
//!         (import "host" "double" (func $double (param i32) (result i32)))
//!         (func (export "run") (param i32) (result i32)
//!             local.get 0
//!             call $double))"#,
//! )?;
//! let mut store = Store::new(&engine, ());
//! let double = Func::new(
//!     &mut store,
//!     FuncType::new([ValType::I32], [ValType::I32]),
//!     |_caller, args| Ok(vec![Val::I32(args[0].unwrap_i32() * 2)]),
//! );
//! let instance = Instance::new(&mut store, &module, &[double.into()])?;
//! let run = instance.get_func(&mut store, "run").unwrap();
//! assert_eq!(run.call(&mut store, &[Val::I32(21)])?[0].unwrap_i32(), 42);
//! # Ok(())
//! # }
//! ```
//!
//! Everything is synchronous. Each store is used from one thread at a time;
//! engines and modules may be shared freely.

mod config;
mod engine;
mod error;
mod externals;
mod func;
mod instance;
mod linker;
mod module;
mod r#ref;
mod store;
mod trap;
mod types;
mod values;

pub use crate::config::Config;
pub use crate::engine::Engine;
pub use crate::error::{Error, Result, UsageError};
pub use crate::externals::*;
pub use crate::func::{Caller, Func};
pub use crate::instance::Instance;
pub use crate::linker::Linker;
pub use crate::module::{ExportType, ImportType, Module};
pub use crate::r#ref::ExternRef;
pub use crate::store::{AsContext, AsContextMut, Store, StoreContext, StoreContextMut};
pub use crate::trap::{FrameInfo, Trap, TrapCode};
pub use crate::types::{ExternKind, FuncType, GlobalType, MemoryType, Mutability, TableType, ValType};
pub use crate::values::Val;

/// Returned from a host function to make the guest exit with a status code.
///
/// The call that entered the guest then fails with an [`Error::Native`]
/// whose [`Error::exit_status`] is this status.
pub use wasmbridge_c_api::I32Exit;
