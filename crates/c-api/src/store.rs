use crate::{ForeignData, handle_result, wasm_engine_t, wasm_finalizer_t, wasmtime_error_t};
use std::ffi::c_void;
use wasmtime::{AsContextMut, Caller, Store, StoreContextMut};

/// Host state attached to every native store: the embedder's opaque data
/// pointer together with the finalizer that releases it.
pub struct StoreData {
    foreign: ForeignData,
}

pub type CStoreContextMut<'a> = StoreContextMut<'a, StoreData>;

/// A non-owning view of a store.
///
/// Contexts are either derived from a store, in which case they live as long
/// as the `wasmtime_store_t`, or from a caller, in which case they are only
/// valid for the duration of the host call that produced them.
pub struct wasmtime_context_t {
    inner: ContextInner,
}

enum ContextInner {
    Store(*mut Store<StoreData>),
    Caller(*mut Caller<'static, StoreData>),
}

impl wasmtime_context_t {
    pub(crate) fn for_caller(caller: &mut Caller<'_, StoreData>) -> wasmtime_context_t {
        wasmtime_context_t {
            inner: ContextInner::Caller(caller as *mut Caller<'_, StoreData> as *mut _),
        }
    }

    pub(crate) fn cx(&mut self) -> CStoreContextMut<'_> {
        match self.inner {
            ContextInner::Store(store) => unsafe { (*store).as_context_mut() },
            ContextInner::Caller(caller) => unsafe { (*caller).as_context_mut() },
        }
    }
}

pub struct wasmtime_store_t {
    // Never read; owns the store `context` points into.
    _store: Box<Store<StoreData>>,
    context: wasmtime_context_t,
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_store_new(
    engine: &wasm_engine_t,
    data: *mut c_void,
    finalizer: wasm_finalizer_t,
) -> *mut wasmtime_store_t {
    let mut store = Box::new(Store::new(
        &engine.engine,
        StoreData {
            foreign: ForeignData { data, finalizer },
        },
    ));
    let context = wasmtime_context_t {
        inner: ContextInner::Store(&mut *store),
    };
    log::trace!("created store with data {data:p}");
    Box::into_raw(Box::new(wasmtime_store_t {
        _store: store,
        context,
    }))
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_store_context(store: &mut wasmtime_store_t) -> *mut wasmtime_context_t {
    &mut store.context
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wasmtime_store_delete(store: *mut wasmtime_store_t) {
    if !store.is_null() {
        log::trace!("deleting store {store:p}");
        drop(unsafe { Box::from_raw(store) });
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_context_get_data(context: &mut wasmtime_context_t) -> *mut c_void {
    context.cx().data().foreign.data
}

/// Replaces the data pointer. The finalizer registered at store creation
/// is kept and will run over whichever pointer is current at teardown.
#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_context_set_data(context: &mut wasmtime_context_t, data: *mut c_void) {
    context.cx().data_mut().foreign.data = data;
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_context_gc(context: &mut wasmtime_context_t) {
    context.cx().gc();
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_context_set_fuel(
    context: &mut wasmtime_context_t,
    fuel: u64,
) -> *mut wasmtime_error_t {
    handle_result(context.cx().set_fuel(fuel), |()| {})
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_context_get_fuel(
    context: &mut wasmtime_context_t,
    fuel: &mut u64,
) -> *mut wasmtime_error_t {
    handle_result(context.cx().get_fuel(), |amt| *fuel = amt)
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmtime_context_set_epoch_deadline(
    context: &mut wasmtime_context_t,
    ticks_beyond_current: u64,
) {
    context.cx().set_epoch_deadline(ticks_beyond_current);
}
