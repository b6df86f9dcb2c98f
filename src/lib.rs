//! An ordered map with iterators that survive concurrent erasure.
//!
//! [`PinMap`] is a sorted key→value container guarded by one map-wide mutex.
//! Its distinguishing feature is the iterator contract: an iterator stays
//! valid while other threads mutate the map, *including* when they erase the
//! very entry the iterator rests on. Erasure of a referenced entry only
//! *retires* it (a logical tombstone); the entry is physically reclaimed once
//! the last iterator lets go.
//!
//! # How iterators pin entries
//!
//! Each entry carries a pin count. An iterator standing on an entry holds
//! one pin; erase turns into retirement while pins remain, and the releasing
//! iterator performs the deferred reclamation. Retired entries are invisible
//! to every lookup and do not count towards [`len`][PinMap::len].
//!
//! # Choosing what a neighbour means
//!
//! When the entry under a cursor is erased mid-iteration, different callers
//! want different things from the next `advance`. The iteration mode type
//! parameter picks the policy: pretend retired entries never existed
//! ([`OnlyForward`]), bounce back into the live region when a scan is
//! stranded ([`ForwardThenBackward`], [`ForwardSameThenBackward`]), or visit
//! tombstones explicitly for diagnostics ([`EvenErased`]). Orthogonally,
//! `CIRCULAR` maps wrap around their ends instead of stopping.
//!
//! # Example
//!
//! ```
//! use pinmap::PinMap;
//!
//! let map: PinMap<i32, &str> = PinMap::new();
//! map.insert(1, "a");
//! map.insert(2, "b");
//! map.insert(3, "c");
//!
//! let it = map.find(&2);
//! map.erase(&2);
//!
//! // the erased entry is gone from every lookup...
//! assert_eq!(map.len(), 2);
//! assert!(map.get(&2).is_none());
//!
//! // ...but the iterator still dereferences it
//! assert_eq!(it.read().as_deref(), Some(&"b"));
//!
//! // and advances to the live neighbour
//! let mut it = it;
//! assert_eq!(it.advance().key(), Some(&3));
//! ```
//!
//! # Ownership of the substrate
//!
//! By default ([`SharedOwnership`]) iterators co-own the substrate and the
//! mutex, so they may outlive their map. The [`NoChecks`] flavour trades
//! that safety net for uncounted handles behind an `unsafe` constructor.

mod core;
mod cursor;
mod iter;
mod map;
mod mode;
mod slot;


pub use crate::core::{CoreHandle, DtorSafety, MapCore, NoChecks, RawCore, SharedOwnership};
pub use crate::iter::{Iter, RevIter, ValueMut, ValueRef};
pub use crate::map::{KeyNotFound, PinMap};
pub use crate::mode::{
    Bounce, EvenErased, ForwardSameThenBackward, ForwardThenBackward, IterMode, OnlyForward,
};

/// A map whose iterators wrap around the ends instead of stopping at them.
pub type CircularPinMap<K, V, M = OnlyForward, D = SharedOwnership> = PinMap<K, V, M, D, true>;
