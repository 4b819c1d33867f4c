use crate::{Result, UsageError};
use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering::SeqCst};

/// Identity of a [`Store`](crate::Store), unique for the life of the process.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct StoreId(NonZeroU64);

impl StoreId {
    pub(crate) fn allocate() -> StoreId {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);

        // Only allow 2^63 stores at which point we start panicking to prevent
        // overflow.
        let id = NEXT_ID.fetch_add(1, SeqCst);
        if id & (1 << 63) != 0 {
            NEXT_ID.store(1 << 63, SeqCst);
            panic!("store id allocator overflow");
        }
        StoreId(NonZeroU64::MIN.saturating_add(id))
    }
}

/// A store-owned native handle tagged with the store it belongs to.
///
/// The engine keeps these objects alive for as long as their store, so the
/// handle itself owns nothing and is freely copyable. The tag turns use with
/// the wrong store into a [`UsageError::CrossStore`] instead of undefined
/// behavior in the engine.
pub(crate) struct Stored<R> {
    store_id: StoreId,
    raw: R,
}

impl<R: Copy> Stored<R> {
    pub(crate) fn new(store_id: StoreId, raw: R) -> Stored<R> {
        Stored { store_id, raw }
    }

    /// The native handle, without checking which store it belongs to.
    pub(crate) fn raw(&self) -> R {
        self.raw
    }

    /// Returns the native handle if it belongs to `store`.
    pub(crate) fn get(&self, store: StoreId) -> Result<&R> {
        if self.store_id == store {
            Ok(&self.raw)
        } else {
            log::debug!("object from {:?} used with {store:?}", self.store_id);
            Err(UsageError::CrossStore.into())
        }
    }

    pub(crate) fn comes_from_same_store(&self, store: StoreId) -> bool {
        self.store_id == store
    }
}

impl<R: Copy> Copy for Stored<R> {}

impl<R: Copy> Clone for Stored<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> fmt::Debug for Stored<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store={}", self.store_id.0)
    }
}
