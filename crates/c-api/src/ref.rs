use crate::{ForeignData, handle_result, wasm_finalizer_t, wasmtime_context_t, wasmtime_error_t};
use std::ffi::c_void;
use std::ptr;
use wasmtime::{AsContextMut, ExternRef, ManuallyRooted, RootScope, Rooted};

/// An owned handle to an `externref`.
///
/// Each handle holds its own root in the store. Cloning roots the reference
/// again, and every handle must be released with `wasmtime_externref_unroot`
/// against the store it came from. Once no handle and no guest location
/// refers to the reference, the next collection finalizes its host data.
pub struct wasmtime_externref_t {
    pub(crate) r: ManuallyRooted<ExternRef>,
}

impl wasmtime_externref_t {
    pub(crate) fn new(r: ManuallyRooted<ExternRef>) -> *mut wasmtime_externref_t {
        Box::into_raw(Box::new(wasmtime_externref_t { r }))
    }

    /// Roots `r` beyond the scope it currently lives in.
    pub(crate) fn from_rooted(
        cx: impl AsContextMut,
        r: &Rooted<ExternRef>,
    ) -> anyhow::Result<*mut wasmtime_externref_t> {
        Ok(wasmtime_externref_t::new(r.to_manually_rooted(cx)?))
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_externref_new(
    context: &mut wasmtime_context_t,
    data: *mut c_void,
    finalizer: wasm_finalizer_t,
    out: &mut *mut wasmtime_externref_t,
) -> *mut wasmtime_error_t {
    let foreign = ForeignData { data, finalizer };
    let mut scope = RootScope::new(context.cx());
    let r = ExternRef::new(&mut scope, foreign)
        .and_then(|r| wasmtime_externref_t::from_rooted(&mut scope, &r));
    handle_result(r, |r| *out = r)
}

/// Returns the host data pointer, or null if the reference carries no host
/// data.
#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_externref_data(
    context: &mut wasmtime_context_t,
    externref: &wasmtime_externref_t,
) -> *mut c_void {
    let cx = context.cx();
    match externref.r.data(&cx) {
        Ok(Some(data)) => data
            .downcast_ref::<ForeignData>()
            .map_or(ptr::null_mut(), |d| d.data),
        _ => ptr::null_mut(),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_externref_clone(
    context: &mut wasmtime_context_t,
    externref: &wasmtime_externref_t,
) -> *mut wasmtime_externref_t {
    wasmtime_externref_t::new(externref.r.clone(context.cx()))
}

/// Releases the handle and its root.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_externref_unroot(
    context: &mut wasmtime_context_t,
    externref: *mut wasmtime_externref_t,
) {
    if !externref.is_null() {
        let externref = unsafe { Box::from_raw(externref) };
        externref.r.unroot(context.cx());
    }
}
