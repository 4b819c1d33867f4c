use crate::store::StoreId;
use crate::{ExternRef, Func, Result, StoreContextMut, UsageError, ValType};
use std::ptr;
use wasmbridge_c_api as ffi;

/// A single WebAssembly value.
///
/// Floats are carried as their bit patterns so that NaN payloads survive a
/// trip through the engine unchanged; see [`Val::f32`] and [`Val::f64`] for
/// the usual view.
#[derive(Debug, Clone)]
pub enum Val {
    I32(i32),
    I64(i64),
    /// The bits of an `f32`.
    F32(u32),
    /// The bits of an `f64`.
    F64(u64),
    V128(u128),
    FuncRef(Option<Func>),
    ExternRef(Option<ExternRef>),
}

macro_rules! accessors {
    ($bind:ident $(($variant:ident($ty:ty) $get:ident $unwrap:ident $cvt:expr))*) => ($(
        /// Attempt to access the underlying value of this `Val`, returning
        /// `None` if it is not the correct type.
        #[inline]
        pub fn $get(&self) -> Option<$ty> {
            if let Val::$variant($bind) = self {
                Some($cvt)
            } else {
                None
            }
        }

        /// Returns the underlying value of this `Val`, panicking if it's the
        /// wrong type.
        ///
        /// # Panics
        ///
        /// Panics if `self` is not of the right type.
        #[inline]
        pub fn $unwrap(&self) -> $ty {
            self.$get().expect(concat!("expected ", stringify!($ty)))
        }
    )*)
}

impl Val {
    pub fn null_func_ref() -> Val {
        Val::FuncRef(None)
    }

    pub fn null_extern_ref() -> Val {
        Val::ExternRef(None)
    }

    /// Returns the type of this value.
    pub fn ty(&self) -> ValType {
        match self {
            Val::I32(_) => ValType::I32,
            Val::I64(_) => ValType::I64,
            Val::F32(_) => ValType::F32,
            Val::F64(_) => ValType::F64,
            Val::V128(_) => ValType::V128,
            Val::FuncRef(_) => ValType::FuncRef,
            Val::ExternRef(_) => ValType::ExternRef,
        }
    }

    /// Builds a value that must have type `ty`.
    ///
    /// Fails with [`UsageError::TypeMismatch`] if `val` carries a different
    /// type, e.g. an `i64` where an `i32` was declared.
    pub fn try_new(ty: ValType, val: impl Into<Val>) -> Result<Val> {
        let val = val.into();
        val.check_type(ty)?;
        Ok(val)
    }

    /// Checks that this value has type `ty`.
    pub fn check_type(&self, ty: ValType) -> Result<()> {
        if self.ty() == ty {
            Ok(())
        } else {
            Err(UsageError::TypeMismatch {
                expected: ty,
                actual: self.ty(),
            }
            .into())
        }
    }

    accessors! {
        e
        (I32(i32) i32 unwrap_i32 *e)
        (I64(i64) i64 unwrap_i64 *e)
        (F32(f32) f32 unwrap_f32 f32::from_bits(*e))
        (F64(f64) f64 unwrap_f64 f64::from_bits(*e))
        (V128(u128) v128 unwrap_v128 *e)
    }

    /// Returns `None` if this is not a `funcref`, and `Some(None)` for a null
    /// one.
    pub fn func_ref(&self) -> Option<Option<&Func>> {
        match self {
            Val::FuncRef(f) => Some(f.as_ref()),
            _ => None,
        }
    }

    /// Returns `None` if this is not an `externref`, and `Some(None)` for a
    /// null one.
    pub fn extern_ref(&self) -> Option<Option<&ExternRef>> {
        match self {
            Val::ExternRef(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    /// Checks that any reference carried by this value belongs to `store`.
    pub(crate) fn comes_from_same_store(&self, store: StoreId) -> bool {
        match self {
            Val::FuncRef(Some(f)) => f.comes_from_same_store(store),
            Val::ExternRef(Some(r)) => r.comes_from_same_store(store),
            _ => true,
        }
    }

    /// Converts to the engine's representation, borrowing any `externref`
    /// handle: the result must not outlive `self` and is never unrooted.
    pub(crate) fn to_native(&self) -> ffi::wasmtime_val_t {
        let (kind, of) = match self {
            Val::I32(i) => (ffi::WASMTIME_I32, ffi::wasmtime_val_union { i32: *i }),
            Val::I64(i) => (ffi::WASMTIME_I64, ffi::wasmtime_val_union { i64: *i }),
            Val::F32(f) => (ffi::WASMTIME_F32, ffi::wasmtime_val_union { f32: *f }),
            Val::F64(f) => (ffi::WASMTIME_F64, ffi::wasmtime_val_union { f64: *f }),
            Val::V128(v) => (
                ffi::WASMTIME_V128,
                ffi::wasmtime_val_union {
                    v128: v.to_le_bytes(),
                },
            ),
            Val::FuncRef(f) => (
                ffi::WASMTIME_FUNCREF,
                ffi::wasmtime_val_union {
                    funcref: f.map(|f| f.raw()),
                },
            ),
            Val::ExternRef(r) => (
                ffi::WASMTIME_EXTERNREF,
                ffi::wasmtime_val_union {
                    externref: r.as_ref().map_or(ptr::null_mut(), ExternRef::as_raw),
                },
            ),
        };
        ffi::wasmtime_val_t { kind, of }
    }

    /// Like [`Val::to_native`], but the result owns a fresh handle to any
    /// `externref`, for the engine to release.
    pub(crate) fn to_owned_native<T>(
        &self,
        cx: &mut StoreContextMut<'_, T>,
    ) -> ffi::wasmtime_val_t {
        let mut raw = self.to_native();
        if let Val::ExternRef(Some(r)) = self {
            raw.of.externref = r.clone_raw(cx);
        }
        raw
    }

    /// Takes ownership of a value the engine produced for `cx`'s store.
    ///
    /// # Panics
    ///
    /// Panics on a kind tag this binding does not know.
    pub(crate) unsafe fn from_native<T>(
        cx: &StoreContextMut<'_, T>,
        raw: ffi::wasmtime_val_t,
    ) -> Val {
        unsafe {
            match ValType::from_native(raw.kind) {
                ValType::I32 => Val::I32(raw.of.i32),
                ValType::I64 => Val::I64(raw.of.i64),
                ValType::F32 => Val::F32(raw.of.f32),
                ValType::F64 => Val::F64(raw.of.f64),
                ValType::V128 => Val::V128(u128::from_le_bytes(raw.of.v128)),
                ValType::FuncRef => {
                    Val::FuncRef(raw.of.funcref.map(|f| Func::from_raw(cx.store_id(), f)))
                }
                ValType::ExternRef => {
                    let r = raw.of.externref;
                    Val::ExternRef((!r.is_null()).then(|| ExternRef::adopt(cx, r)))
                }
            }
        }
    }

    /// Reads a value the engine keeps ownership of, cloning any `externref`
    /// handle it holds.
    pub(crate) unsafe fn from_native_borrowed<T>(
        cx: &mut StoreContextMut<'_, T>,
        raw: &ffi::wasmtime_val_t,
    ) -> Val {
        let mut owned = ffi::wasmtime_val_t {
            kind: raw.kind,
            of: raw.of,
        };
        unsafe {
            if raw.kind == ffi::WASMTIME_EXTERNREF && !raw.of.externref.is_null() {
                owned.of.externref =
                    ffi::wasmtime_externref_clone(cx.native(), &*raw.of.externref);
            }
            Val::from_native(cx, owned)
        }
    }
}

impl From<i32> for Val {
    #[inline]
    fn from(val: i32) -> Val {
        Val::I32(val)
    }
}

impl From<i64> for Val {
    #[inline]
    fn from(val: i64) -> Val {
        Val::I64(val)
    }
}

impl From<f32> for Val {
    #[inline]
    fn from(val: f32) -> Val {
        Val::F32(val.to_bits())
    }
}

impl From<f64> for Val {
    #[inline]
    fn from(val: f64) -> Val {
        Val::F64(val.to_bits())
    }
}

impl From<u128> for Val {
    #[inline]
    fn from(val: u128) -> Val {
        Val::V128(val)
    }
}

impl From<Func> for Val {
    #[inline]
    fn from(val: Func) -> Val {
        Val::FuncRef(Some(val))
    }
}

impl From<Option<Func>> for Val {
    #[inline]
    fn from(val: Option<Func>) -> Val {
        Val::FuncRef(val)
    }
}

impl From<ExternRef> for Val {
    #[inline]
    fn from(val: ExternRef) -> Val {
        Val::ExternRef(Some(val))
    }
}

impl From<Option<ExternRef>> for Val {
    #[inline]
    fn from(val: Option<ExternRef>) -> Val {
        Val::ExternRef(val)
    }
}
