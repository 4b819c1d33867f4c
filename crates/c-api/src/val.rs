use crate::r#ref::wasmtime_externref_t;
use crate::{
    WASMTIME_ANYREF, WASMTIME_EXTERNREF, WASMTIME_F32, WASMTIME_F64, WASMTIME_FUNCREF,
    WASMTIME_I32, WASMTIME_I64, WASMTIME_V128, wasmtime_func_t, wasmtime_valkind_t,
};
use std::ptr;
use wasmtime::{AsContextMut, Ref, V128, Val};

#[repr(C)]
pub struct wasmtime_val_t {
    pub kind: wasmtime_valkind_t,
    pub of: wasmtime_val_union,
}

/// Payload of a `wasmtime_val_t`.
///
/// `externref` is an owned handle (or null) that whoever holds the value
/// must unroot against the value's store. `funcref` is `None` for a null
/// function reference.
#[repr(C)]
#[derive(Clone, Copy)]
pub union wasmtime_val_union {
    pub i32: i32,
    pub i64: i64,
    pub f32: u32,
    pub f64: u64,
    pub v128: [u8; 16],
    pub funcref: Option<wasmtime_func_t>,
    pub externref: *mut wasmtime_externref_t,
}

impl Default for wasmtime_val_t {
    fn default() -> wasmtime_val_t {
        wasmtime_val_t {
            kind: WASMTIME_I32,
            of: wasmtime_val_union { i32: 0 },
        }
    }
}

impl wasmtime_val_t {
    /// Converts an engine value, rooting any `externref` it holds until the
    /// returned value is unrooted.
    pub(crate) fn from_val(cx: impl AsContextMut, val: Val) -> anyhow::Result<wasmtime_val_t> {
        Ok(match val {
            Val::I32(i) => wasmtime_val_t {
                kind: WASMTIME_I32,
                of: wasmtime_val_union { i32: i },
            },
            Val::I64(i) => wasmtime_val_t {
                kind: WASMTIME_I64,
                of: wasmtime_val_union { i64: i },
            },
            Val::F32(f) => wasmtime_val_t {
                kind: WASMTIME_F32,
                of: wasmtime_val_union { f32: f },
            },
            Val::F64(f) => wasmtime_val_t {
                kind: WASMTIME_F64,
                of: wasmtime_val_union { f64: f },
            },
            Val::V128(v) => wasmtime_val_t {
                kind: WASMTIME_V128,
                of: wasmtime_val_union {
                    v128: v.as_u128().to_le_bytes(),
                },
            },
            Val::FuncRef(f) => wasmtime_val_t {
                kind: WASMTIME_FUNCREF,
                of: wasmtime_val_union {
                    funcref: f.map(|func| wasmtime_func_t { func }),
                },
            },
            Val::ExternRef(r) => wasmtime_val_t {
                kind: WASMTIME_EXTERNREF,
                of: wasmtime_val_union {
                    externref: match r {
                        Some(r) => wasmtime_externref_t::from_rooted(cx, &r)?,
                        None => ptr::null_mut(),
                    },
                },
            },
            // Only externref and funcref are surfaced to embedders.
            _ => wasmtime_val_t {
                kind: WASMTIME_ANYREF,
                of: wasmtime_val_union {
                    externref: ptr::null_mut(),
                },
            },
        })
    }

    /// Reads the value without taking ownership of any handle it holds. An
    /// `externref` is rooted in the innermost scope of `cx`.
    pub(crate) unsafe fn to_val(&self, cx: impl AsContextMut) -> Val {
        unsafe {
            match self.kind {
                WASMTIME_I32 => Val::I32(self.of.i32),
                WASMTIME_I64 => Val::I64(self.of.i64),
                WASMTIME_F32 => Val::F32(self.of.f32),
                WASMTIME_F64 => Val::F64(self.of.f64),
                WASMTIME_V128 => Val::V128(V128::from(u128::from_le_bytes(self.of.v128))),
                WASMTIME_FUNCREF => Val::FuncRef(self.of.funcref.map(|f| f.func)),
                WASMTIME_EXTERNREF => {
                    let r = self.of.externref;
                    Val::ExternRef(if r.is_null() {
                        None
                    } else {
                        Some((*r).r.to_rooted(cx))
                    })
                }
                WASMTIME_ANYREF => Val::AnyRef(None),
                other => panic!("unknown wasmtime_valkind_t: {other}"),
            }
        }
    }

    /// Reads the value and releases any handle it held.
    pub(crate) unsafe fn take_val(&mut self, mut cx: impl AsContextMut) -> Val {
        let val = unsafe { self.to_val(&mut cx) };
        unsafe { unroot_val(cx, self) };
        val
    }
}

pub(crate) unsafe fn unroot_val(mut cx: impl AsContextMut, val: &mut wasmtime_val_t) {
    if val.kind == WASMTIME_EXTERNREF {
        let r = unsafe { val.of.externref };
        if !r.is_null() {
            let r = unsafe { Box::from_raw(r) };
            r.r.unroot(&mut cx);
        }
        val.of.externref = ptr::null_mut();
    }
}

/// Narrows a value to a table element.
pub(crate) fn val_into_ref(val: Val) -> anyhow::Result<Ref> {
    match val {
        Val::FuncRef(f) => Ok(Ref::Func(f)),
        Val::ExternRef(e) => Ok(Ref::Extern(e)),
        Val::AnyRef(a) => Ok(Ref::Any(a)),
        _ => anyhow::bail!("table elements must be reference values"),
    }
}
