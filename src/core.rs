//! The shared heart of a map: the ordered substrate and its mutex, co-owned
//! by the container and by every iterator derived from it.
//!
//! # Ownership of the core
//!
//! The substrate and the mutex live together in a [`MapCore`] behind an
//! `Arc`. The container always holds one strong reference; how iterators
//! hold theirs is decided by the [`DtorSafety`] type parameter of the map:
//!
//! - [`SharedOwnership`] (the default): iterators hold a strong reference of
//!   their own, so the core is destroyed only after the container *and* the
//!   last iterator are gone. Iterators may freely outlive their container.
//! - [`NoChecks`]: iterators hold a raw pointer. No reference count is
//!   touched on clone or drop, which makes iterator handling cheaper, but
//!   the caller must guarantee the container outlives every iterator. This
//!   is why the corresponding constructor is `unsafe`.

use std::collections::BTreeMap;
use std::ptr::NonNull;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::slot::Slot;

////////////////////////////////////////////////////////////////////////////////////////////////////
// Table
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The ordered substrate plus a cached count of live (non-retired) entries.
///
/// Both fields are only ever touched under the core's mutex.
#[derive(Debug)]
pub(crate) struct Table<K, V> {
    pub tree: BTreeMap<K, Slot<V>>,
    pub live: usize,
}

/********** impl inherent *************************************************************************/

impl<K: Ord, V> Table<K, V> {
    #[inline]
    pub fn new() -> Self {
        Self { tree: BTreeMap::new(), live: 0 }
    }

    /// Pins the slot stored under `key`.
    ///
    /// The key must reference a physically present entry.
    #[inline]
    pub fn pin(&mut self, key: &K) {
        match self.tree.get_mut(key) {
            Some(slot) => slot.pin(),
            None => {
                log::error!("attempted to pin a key that is not in the tree");
                debug_assert!(false, "pinned cursor does not resolve");
            }
        }
    }

    /// Releases one pin and reclaims the slot right away if it was the last
    /// pin on a retired entry.
    #[inline]
    pub fn unpin(&mut self, key: &K) {
        if self.unpin_deferred(key) {
            self.tree.remove(key);
        }
    }

    /// Releases one pin but leaves a now-reclaimable slot in the tree,
    /// returning `true` if the caller must reclaim it.
    ///
    /// Advancement uses this so the departed entry can still anchor the
    /// neighbour scan before it is removed.
    #[inline]
    pub fn unpin_deferred(&mut self, key: &K) -> bool {
        match self.tree.get_mut(key) {
            Some(slot) => {
                slot.unpin();
                slot.is_reclaimable()
            }
            None => {
                log::error!("attempted to unpin a key that is not in the tree");
                debug_assert!(false, "pinned cursor does not resolve");
                false
            }
        }
    }

    /// Physically removes the slot stored under `key`.
    #[inline]
    pub fn reclaim(&mut self, key: &K) {
        self.tree.remove(key);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// MapCore
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The substrate and mutex shared between a map and its iterators.
///
/// This type is public because it appears in the [`DtorSafety`] trait, but
/// it exposes no API of its own.
#[derive(Debug)]
pub struct MapCore<K, V> {
    table: Mutex<Table<K, V>>,
}

/********** impl inherent *************************************************************************/

impl<K: Ord, V> MapCore<K, V> {
    #[inline]
    pub(crate) fn new() -> Self {
        Self { table: Mutex::new(Table::new()) }
    }

    /// Enters the map-wide critical section.
    #[inline]
    pub(crate) fn lock(&self) -> MutexGuard<'_, Table<K, V>> {
        self.table.lock()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// CoreHandle (trait)
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The reference an iterator keeps to its map's core.
pub trait CoreHandle<K, V>: Clone {
    /// Creates a handle from the container's own strong reference.
    fn from_shared(core: &Arc<MapCore<K, V>>) -> Self;

    /// Borrows the core.
    fn core(&self) -> &MapCore<K, V>;

    /// The core's address, used for container identity checks.
    #[inline]
    fn core_ptr(&self) -> *const MapCore<K, V> {
        self.core()
    }
}

/********** impl for Arc **************************************************************************/

impl<K, V> CoreHandle<K, V> for Arc<MapCore<K, V>> {
    #[inline]
    fn from_shared(core: &Arc<MapCore<K, V>>) -> Self {
        Arc::clone(core)
    }

    #[inline]
    fn core(&self) -> &MapCore<K, V> {
        self
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// RawCore
////////////////////////////////////////////////////////////////////////////////////////////////////

/// An uncounted handle to a map core, used by [`NoChecks`] iterators.
///
/// Holders must not outlive the container the handle was derived from; the
/// contract is accepted once, in [`PinMap::new_unchecked`].
///
/// [`PinMap::new_unchecked`]: crate::PinMap::new_unchecked
#[derive(Debug)]
pub struct RawCore<K, V> {
    core: NonNull<MapCore<K, V>>,
}

/********** impl Clone + Copy *********************************************************************/

impl<K, V> Clone for RawCore<K, V> {
    #[inline]
    fn clone(&self) -> Self {
        Self { core: self.core }
    }
}

impl<K, V> Copy for RawCore<K, V> {}

/********** impl CoreHandle ***********************************************************************/

impl<K, V> CoreHandle<K, V> for RawCore<K, V> {
    #[inline]
    fn from_shared(core: &Arc<MapCore<K, V>>) -> Self {
        Self { core: NonNull::from(&**core) }
    }

    #[inline]
    fn core(&self) -> &MapCore<K, V> {
        // SAFETY: The pointer was derived from a live `Arc` and the map it
        // belongs to was created through `new_unchecked`, whose contract
        // requires the container (and hence the Arc allocation) to outlive
        // every handle.
        unsafe { self.core.as_ref() }
    }
}

// SAFETY: A `RawCore` is semantically a `&MapCore`, and `MapCore` is `Sync`
// for `Send` key and value types since all interior access funnels through
// its mutex. The pointer indirection alone is what keeps the compiler from
// deriving this.
unsafe impl<K: Send, V: Send> Send for RawCore<K, V> {}
unsafe impl<K: Send, V: Send> Sync for RawCore<K, V> {}

////////////////////////////////////////////////////////////////////////////////////////////////////
// DtorSafety (trait)
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Selects how iterators refer to their map's core.
pub trait DtorSafety<K, V>: Sized + 'static {
    type Handle: CoreHandle<K, V>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// SharedOwnership
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Iterators co-own the core; they may outlive their container.
///
/// An iterator whose container has been dropped keeps working: it still
/// dereferences to its pinned entry and advancement behaves as over whatever
/// content the shared substrate retains.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
pub struct SharedOwnership;

/********** impl DtorSafety ***********************************************************************/

impl<K, V> DtorSafety<K, V> for SharedOwnership {
    type Handle = Arc<MapCore<K, V>>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// NoChecks
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Iterators borrow the core through a raw pointer; nothing is counted.
///
/// Cheaper iterator clone and drop, at the price of an up-front promise: the
/// container must outlive every iterator derived from it. No dynamic check
/// backs this up, which is why maps of this flavour are constructed through
/// an `unsafe` function.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
pub struct NoChecks;

/********** impl DtorSafety ***********************************************************************/

impl<K, V> DtorSafety<K, V> for NoChecks {
    type Handle = RawCore<K, V>;
}
