//! The map type: an ordered associative container whose iterators survive
//! concurrent erasure.
//!
//! Every public operation is one critical section on the map-wide mutex.
//! Erasure is split in two: entries nobody pins are removed physically on
//! the spot, pinned entries are merely retired and linger invisibly until
//! the last pin is released or [`cleanup`][PinMap::cleanup] runs.
//!
//! Whole-container operations (assignment, swap) deliberately never exchange
//! the substrate or the mutex themselves: iterators belong to the substrate
//! they were born from and keep observing it through such operations. What
//! moves are the live entries.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::sync::Arc;

use parking_lot::MutexGuard;
use thiserror::Error;

use crate::core::{CoreHandle, DtorSafety, MapCore, NoChecks, SharedOwnership, Table};
use crate::cursor::{self, Pos};
use crate::iter::{Iter, RevIter, ValueMut, ValueRef};
use crate::mode::{IterMode, OnlyForward};
use crate::slot::Slot;

////////////////////////////////////////////////////////////////////////////////////////////////////
// KeyNotFound
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Error of [`PinMap::at`]: the key has no live entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("no live entry for the requested key")]
pub struct KeyNotFound;

////////////////////////////////////////////////////////////////////////////////////////////////////
// PinMap
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A sorted map from `K` to `V` whose iterators remain valid while other
/// threads mutate the map, including erasing the entry under a cursor.
///
/// The type parameters beyond the key and value select compile-time policy:
/// `M` is the iteration mode (see [`IterMode`]), `D` the destructor-safety
/// mode (see [`DtorSafety`]), and `CIRCULAR` makes advancement wrap around
/// the ends instead of stopping at them.
pub struct PinMap<K, V, M = OnlyForward, D = SharedOwnership, const CIRCULAR: bool = false> {
    core: Arc<MapCore<K, V>>,
    _policy: PhantomData<(M, D)>,
}

/********** impl inherent (construction) **********************************************************/

impl<K: Ord, V, M, D, const CIRCULAR: bool> PinMap<K, V, M, D, CIRCULAR> {
    #[inline]
    fn with_core() -> Self {
        Self { core: Arc::new(MapCore::new()), _policy: PhantomData }
    }
}

impl<K: Ord, V, M, const CIRCULAR: bool> PinMap<K, V, M, SharedOwnership, CIRCULAR> {
    /// Creates an empty map whose iterators co-own the substrate and may
    /// outlive the map itself.
    #[inline]
    pub fn new() -> Self {
        Self::with_core()
    }
}

impl<K: Ord, V, M, const CIRCULAR: bool> PinMap<K, V, M, NoChecks, CIRCULAR> {
    /// Creates an empty map whose iterators hold uncounted references to the
    /// substrate.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that this map outlives every iterator
    /// derived from it (including clones of those iterators). Nothing checks
    /// this at runtime; an iterator used after the map is gone reads freed
    /// memory.
    #[inline]
    pub unsafe fn new_unchecked() -> Self {
        Self::with_core()
    }
}

/********** impl inherent (queries and entry-level mutation) **************************************/

impl<K: Ord, V, M, D, const CIRCULAR: bool> PinMap<K, V, M, D, CIRCULAR> {
    #[inline]
    fn lock(&self) -> MutexGuard<'_, Table<K, V>> {
        self.core.lock()
    }

    /// The number of live entries. Retired entries do not count.
    #[inline]
    pub fn len(&self) -> usize {
        self.lock().live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of physically retained entries, retired ones included.
    /// Diagnostic; prefer [`len`][Self::len] for the logical size.
    #[inline]
    pub fn physical_len(&self) -> usize {
        self.lock().tree.len()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.lock().tree.get(key).map_or(false, |slot| !slot.is_retired())
    }

    /// 0 or 1, after the interface of the multi-map capable originals.
    #[inline]
    pub fn count(&self, key: &K) -> usize {
        self.contains_key(key) as usize
    }

    /// A guarded reference to the live value under `key`.
    ///
    /// The map-wide lock is held while the guard lives; keep its scope
    /// tight and do not call back into the map or its iterators meanwhile.
    pub fn get(&self, key: &K) -> Option<ValueRef<'_, V>> {
        MutexGuard::try_map(self.lock(), |table| {
            table.tree.get_mut(key).filter(|slot| !slot.is_retired()).map(Slot::value_mut)
        })
        .ok()
        .map(ValueRef::new)
    }

    /// Like [`get`][Self::get], but the guard permits writing.
    pub fn get_mut(&self, key: &K) -> Option<ValueMut<'_, V>> {
        MutexGuard::try_map(self.lock(), |table| {
            table.tree.get_mut(key).filter(|slot| !slot.is_retired()).map(Slot::value_mut)
        })
        .ok()
        .map(ValueMut::new)
    }

    /// Fallible lookup; retired entries report [`KeyNotFound`] like absent
    /// ones.
    pub fn at(&self, key: &K) -> Result<ValueRef<'_, V>, KeyNotFound> {
        self.get(key).ok_or(KeyNotFound)
    }

    /// The value under `key`, resurrecting or creating the entry as needed.
    ///
    /// A retired entry comes back to life with its old value; a missing one
    /// is inserted with `V::default()`.
    pub fn get_or_default(&self, key: K) -> ValueMut<'_, V>
    where
        K: Clone,
        V: Default,
    {
        let mut table = self.lock();
        match table.tree.get_mut(&key) {
            Some(slot) if slot.is_retired() => {
                slot.resurrect();
                table.live += 1;
            }
            Some(_) => {}
            None => {
                table.tree.insert(key.clone(), Slot::new(V::default()));
                table.live += 1;
            }
        }
        ValueMut::new(MutexGuard::map(table, move |table| {
            table.tree.get_mut(&key).expect("entry ensured above").value_mut()
        }))
    }

    /// Inserts into an already locked table. Std-map semantics: a live
    /// duplicate wins over the new value; a retired duplicate is resurrected
    /// in place with the new value (pins and the physical slot survive).
    fn insert_entry(table: &mut Table<K, V>, key: K, value: V) -> bool {
        match table.tree.get_mut(&key) {
            Some(slot) if slot.is_retired() => {
                *slot.value_mut() = value;
                slot.resurrect();
                table.live += 1;
                true
            }
            Some(_) => false,
            None => {
                table.tree.insert(key, Slot::new(value));
                table.live += 1;
                true
            }
        }
    }

    /// Physical-or-logical erase of one live entry.
    fn erase_entry(table: &mut Table<K, V>, key: &K) -> bool {
        match table.tree.get_mut(key) {
            Some(slot) if !slot.is_retired() => {
                if slot.is_pinned() {
                    slot.retire();
                } else {
                    table.tree.remove(key);
                }
                table.live -= 1;
                true
            }
            _ => false,
        }
    }

    /// Unconditionally deferred erase of one live entry.
    fn retire_entry(table: &mut Table<K, V>, key: &K) -> bool {
        match table.tree.get_mut(key) {
            Some(slot) if !slot.is_retired() => {
                slot.retire();
                table.live -= 1;
                true
            }
            _ => false,
        }
    }

    /// Erases the live entry under `key`, returning how many entries were
    /// erased (0 or 1). Keys that are absent or already retired count as not
    /// present.
    pub fn erase(&self, key: &K) -> usize {
        Self::erase_entry(&mut self.lock(), key) as usize
    }

    /// Retires the live entry under `key` without ever touching the
    /// substrate's physical structure, even when nothing pins it. O(log n)
    /// flag write; reclamation is left to pin release or [`cleanup`].
    ///
    /// [`cleanup`]: Self::cleanup
    pub fn erase_fast(&self, key: &K) -> usize {
        Self::retire_entry(&mut self.lock(), key) as usize
    }

    /// Physically removes every retired entry that no iterator pins. The
    /// explicit garbage collection knob for workloads leaning on the `_fast`
    /// erase family.
    pub fn cleanup(&self) {
        let mut table = self.lock();
        let before = table.tree.len();
        table.tree.retain(|_, slot| !slot.is_reclaimable());
        let reclaimed = before - table.tree.len();
        if reclaimed > 0 {
            log::debug!("cleanup reclaimed {} retired entries", reclaimed);
        }
    }

    /// Removes every entry: unpinned ones physically, pinned ones by
    /// retirement.
    pub fn clear(&self) {
        Self::clear_prelocked(&mut self.lock());
    }

    /// Retires everything, touching no tree structure at all.
    pub fn clear_fast(&self) {
        let mut table = self.lock();
        for slot in table.tree.values_mut() {
            if !slot.is_retired() {
                slot.retire();
            }
        }
        table.live = 0;
    }

    fn clear_prelocked(table: &mut Table<K, V>) {
        table.tree.retain(|_, slot| {
            if slot.is_pinned() {
                slot.retire();
                true
            } else {
                false
            }
        });
        table.live = 0;
    }

    fn snapshot_live(table: &Table<K, V>) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        table
            .tree
            .iter()
            .filter(|(_, slot)| !slot.is_retired())
            .map(|(key, slot)| (key.clone(), slot.value().clone()))
            .collect()
    }
}

/********** impl inherent (whole-container operations) ********************************************/

impl<K, V, M, D, const CIRCULAR: bool> PinMap<K, V, M, D, CIRCULAR>
where
    K: Ord + Clone,
    V: Clone,
{
    /// Replaces this map's content with `source`'s live entries.
    ///
    /// The destination is cleared first (pinned entries retire, the rest
    /// go), then the source's live entries are copied in with fresh, unpinned
    /// slots. Both locks are taken, target before source; assigning a map to
    /// itself is a no-op.
    pub fn assign(&self, source: &Self) {
        if Arc::ptr_eq(&self.core, &source.core) {
            return;
        }
        let mut dst = self.lock();
        let src = source.core.lock();
        Self::clear_prelocked(&mut dst);
        for (key, slot) in src.tree.iter().filter(|(_, slot)| !slot.is_retired()) {
            Self::insert_entry(&mut dst, key.clone(), slot.value().clone());
        }
    }

    /// Move-assignment: copies `source`'s live entries here, then clears the
    /// source. The source's substrate is never stolen, so iterators over it
    /// stay valid and simply observe the cleared state (pinned entries
    /// linger retired).
    pub fn take_from(&self, source: &Self) {
        if Arc::ptr_eq(&self.core, &source.core) {
            return;
        }
        let mut dst = self.lock();
        let mut src = source.core.lock();
        Self::clear_prelocked(&mut dst);
        for (key, slot) in src.tree.iter().filter(|(_, slot)| !slot.is_retired()) {
            Self::insert_entry(&mut dst, key.clone(), slot.value().clone());
        }
        Self::clear_prelocked(&mut src);
    }

    /// Exchanges the live content of two maps without exchanging their
    /// substrates: iterators keep pointing into the map they came from and
    /// see its new content. Swapping a map with itself is a no-op.
    pub fn swap(&self, other: &Self) {
        if Arc::ptr_eq(&self.core, &other.core) {
            return;
        }
        let mut left = self.lock();
        let mut right = other.core.lock();
        let from_left = Self::snapshot_live(&left);
        let from_right = Self::snapshot_live(&right);
        Self::clear_prelocked(&mut left);
        Self::clear_prelocked(&mut right);
        for (key, value) in from_right {
            Self::insert_entry(&mut left, key, value);
        }
        for (key, value) in from_left {
            Self::insert_entry(&mut right, key, value);
        }
    }

    /// Replaces this map's content with a plain ordered map's entries.
    pub fn assign_btree(&self, source: &BTreeMap<K, V>) {
        let mut table = self.lock();
        Self::clear_prelocked(&mut table);
        for (key, value) in source {
            Self::insert_entry(&mut table, key.clone(), value.clone());
        }
    }

    /// Exchanges content with a plain ordered map: the plain map receives a
    /// snapshot of this map's live entries, this map takes the plain map's
    /// entries.
    pub fn swap_btree(&self, other: &mut BTreeMap<K, V>) {
        let mut table = self.lock();
        let snapshot = Self::snapshot_live(&table);
        Self::clear_prelocked(&mut table);
        for (key, value) in std::mem::take(other) {
            Self::insert_entry(&mut table, key, value);
        }
        other.extend(snapshot);
    }

    /// A plain ordered map holding a snapshot of the live entries.
    pub fn to_btree(&self) -> BTreeMap<K, V> {
        let table = self.lock();
        table
            .tree
            .iter()
            .filter(|(_, slot)| !slot.is_retired())
            .map(|(key, slot)| (key.clone(), slot.value().clone()))
            .collect()
    }
}

/********** impl inherent (iterator surface) ******************************************************/

impl<K, V, M, D, const CIRCULAR: bool> PinMap<K, V, M, D, CIRCULAR>
where
    K: Ord + Clone,
    M: IterMode,
    D: DtorSafety<K, V>,
{
    #[inline]
    fn handle(&self) -> D::Handle {
        D::Handle::from_shared(&self.core)
    }

    #[inline]
    fn is_ours<const REVERSED: bool>(&self, iter: &Iter<K, V, M, D, CIRCULAR, REVERSED>) -> bool {
        iter.core_ptr() == Arc::as_ptr(&self.core)
    }

    /// A forward iterator at the first visible entry (first physical entry
    /// under [`EvenErased`][crate::EvenErased]).
    pub fn begin(&self) -> Iter<K, V, M, D, CIRCULAR, false> {
        let mut table = self.lock();
        let start = table.tree.keys().next().cloned().map_or(Pos::End, Pos::At);
        Iter::new_pinned(self.handle(), &mut table, start, M::SKIP_RETIRED)
    }

    /// The forward end sentinel.
    #[inline]
    pub fn end(&self) -> Iter<K, V, M, D, CIRCULAR, false> {
        Iter::at_end(self.handle())
    }

    /// Alias for [`begin`][Self::begin], so `for` loops read naturally on
    /// the modes that implement [`Iterator`].
    #[inline]
    pub fn iter(&self) -> Iter<K, V, M, D, CIRCULAR, false> {
        self.begin()
    }

    /// A reverse iterator at the last visible entry.
    pub fn rbegin(&self) -> RevIter<K, V, M, D, CIRCULAR> {
        let mut table = self.lock();
        let start = table.tree.keys().next_back().cloned().map_or(Pos::End, Pos::At);
        Iter::new_pinned(self.handle(), &mut table, start, M::SKIP_RETIRED)
    }

    /// The reverse end sentinel.
    #[inline]
    pub fn rend(&self) -> RevIter<K, V, M, D, CIRCULAR> {
        Iter::at_end(self.handle())
    }

    /// An iterator at the live entry under `key`, or [`end`][Self::end].
    ///
    /// Retired entries are not found, whatever the iteration mode.
    pub fn find(&self, key: &K) -> Iter<K, V, M, D, CIRCULAR, false> {
        let mut table = self.lock();
        let start = match table.tree.get(key) {
            Some(slot) if !slot.is_retired() => Pos::At(key.clone()),
            _ => Pos::End,
        };
        Iter::new_pinned(self.handle(), &mut table, start, false)
    }

    /// An iterator at the first live entry with key `>= key`.
    pub fn lower_bound(&self, key: &K) -> Iter<K, V, M, D, CIRCULAR, false> {
        let mut table = self.lock();
        let start = table
            .tree
            .range((Included(key), Unbounded))
            .next()
            .map(|(k, _)| k.clone())
            .map_or(Pos::End, Pos::At);
        Iter::new_pinned(self.handle(), &mut table, start, true)
    }

    /// An iterator at the first live entry with key `> key`.
    pub fn upper_bound(&self, key: &K) -> Iter<K, V, M, D, CIRCULAR, false> {
        let mut table = self.lock();
        let start = table
            .tree
            .range((Excluded(key), Unbounded))
            .next()
            .map(|(k, _)| k.clone())
            .map_or(Pos::End, Pos::At);
        Iter::new_pinned(self.handle(), &mut table, start, true)
    }

    /// Lower and upper bound in one critical section.
    pub fn equal_range(
        &self,
        key: &K,
    ) -> (Iter<K, V, M, D, CIRCULAR, false>, Iter<K, V, M, D, CIRCULAR, false>) {
        let mut table = self.lock();
        let lower = table
            .tree
            .range((Included(key), Unbounded))
            .next()
            .map(|(k, _)| k.clone())
            .map_or(Pos::End, Pos::At);
        let upper = table
            .tree
            .range((Excluded(key), Unbounded))
            .next()
            .map(|(k, _)| k.clone())
            .map_or(Pos::End, Pos::At);
        let first = Iter::new_pinned(self.handle(), &mut table, lower, true);
        let second = Iter::new_pinned(self.handle(), &mut table, upper, true);
        (first, second)
    }

    /// Inserts `key → value`, returning an iterator at the entry and whether
    /// an insertion took place.
    ///
    /// A live duplicate is returned untouched with `false`. A retired
    /// duplicate is logically absent, so insertion succeeds: the slot is
    /// resurrected in place around the new value and iterators pinning it
    /// simply see the entry come back.
    pub fn insert(&self, key: K, value: V) -> (Iter<K, V, M, D, CIRCULAR, false>, bool) {
        let mut table = self.lock();
        let inserted = Self::insert_entry(&mut table, key.clone(), value);
        let iter = Iter::new_pinned(self.handle(), &mut table, Pos::At(key), false);
        (iter, inserted)
    }

    /// Hinted insert. The substrate locates positions itself, so the hint
    /// only documents intent; it is checked for provenance in debug builds.
    pub fn insert_hint(
        &self,
        hint: &Iter<K, V, M, D, CIRCULAR, false>,
        key: K,
        value: V,
    ) -> Iter<K, V, M, D, CIRCULAR, false> {
        debug_assert!(self.is_ours(hint), "hint belongs to a different map");
        self.insert(key, value).0
    }

    /// Erases the entry under `iter`, consuming it and returning the
    /// successor its `advance` would have produced.
    ///
    /// Erasing the end sentinel is a programming error: debug builds assert,
    /// release builds return the sentinel unchanged.
    pub fn erase_at<const REVERSED: bool>(
        &self,
        iter: Iter<K, V, M, D, CIRCULAR, REVERSED>,
    ) -> Iter<K, V, M, D, CIRCULAR, REVERSED> {
        debug_assert!(self.is_ours(&iter), "iterator belongs to a different map");
        let (handle, pos) = iter.into_parts();
        let mut table = self.lock();
        match pos {
            Pos::End => {
                debug_assert!(false, "erase at the end sentinel");
                drop(table);
                Iter::at_end(handle)
            }
            Pos::At(ref key) => {
                // the consumed iterator's own pin comes off first; the slot
                // stays put so the successor scan can anchor on it
                table.unpin_deferred(key);
                if let Some(slot) = table.tree.get_mut(key) {
                    if !slot.is_retired() {
                        slot.retire();
                        table.live -= 1;
                    }
                }
                let successor = cursor::advance::<K, V, M, CIRCULAR, REVERSED>(&table, &pos);
                if successor.key() != Some(key)
                    && table.tree.get(key).map_or(false, Slot::is_reclaimable)
                {
                    table.reclaim(key);
                }
                Iter::new_pinned(handle, &mut table, successor, false)
            }
        }
    }

    /// Retires the entry under `iter` in place; the iterator keeps its
    /// position (and its pin).
    pub fn erase_at_fast<const REVERSED: bool>(&self, iter: &Iter<K, V, M, D, CIRCULAR, REVERSED>) {
        debug_assert!(self.is_ours(iter), "iterator belongs to a different map");
        match iter.pos() {
            Pos::At(key) => {
                Self::retire_entry(&mut self.lock(), key);
            }
            Pos::End => debug_assert!(false, "erase at the end sentinel"),
        }
    }

    /// Erases every entry in `[first, last)`, walking the substrate in
    /// ascending order; reverse-iterator ranges are normalised by swapping
    /// the endpoints. Returns an iterator resuming at `last`'s position.
    pub fn erase_range<const REVERSED: bool>(
        &self,
        first: &Iter<K, V, M, D, CIRCULAR, REVERSED>,
        last: &Iter<K, V, M, D, CIRCULAR, REVERSED>,
    ) -> Iter<K, V, M, D, CIRCULAR, REVERSED> {
        debug_assert!(self.is_ours(first) && self.is_ours(last), "range from a different map");
        let mut table = self.lock();
        for key in Self::range_keys::<REVERSED>(&table, first.pos(), last.pos()) {
            Self::erase_entry(&mut table, &key);
        }
        Iter::new_pinned(self.handle(), &mut table, last.pos().clone(), M::SKIP_RETIRED)
    }

    /// Retires every entry in `[first, last)` without touching the tree
    /// structure; returns the number of entries retired.
    pub fn erase_range_fast<const REVERSED: bool>(
        &self,
        first: &Iter<K, V, M, D, CIRCULAR, REVERSED>,
        last: &Iter<K, V, M, D, CIRCULAR, REVERSED>,
    ) -> usize {
        debug_assert!(self.is_ours(first) && self.is_ours(last), "range from a different map");
        let mut table = self.lock();
        let mut retired = 0;
        for key in Self::range_keys::<REVERSED>(&table, first.pos(), last.pos()) {
            retired += Self::retire_entry(&mut table, &key) as usize;
        }
        retired
    }

    /// The physical keys of `[first, last)` in substrate order, endpoints
    /// swapped for reverse ranges. Malformed ranges come back empty.
    fn range_keys<const REVERSED: bool>(
        table: &Table<K, V>,
        first: &Pos<K>,
        last: &Pos<K>,
    ) -> Vec<K> {
        let (lo, hi) = if REVERSED { (last, first) } else { (first, last) };
        match (lo, hi) {
            (Pos::End, _) => Vec::new(),
            (Pos::At(lo), Pos::At(hi)) => {
                if lo >= hi {
                    return Vec::new();
                }
                table.tree.range((Included(lo), Excluded(hi))).map(|(k, _)| k.clone()).collect()
            }
            (Pos::At(lo), Pos::End) => {
                table.tree.range((Included(lo), Unbounded)).map(|(k, _)| k.clone()).collect()
            }
        }
    }
}

/********** impl Clone ****************************************************************************/

impl<K, V, M, const CIRCULAR: bool> Clone for PinMap<K, V, M, SharedOwnership, CIRCULAR>
where
    K: Ord + Clone,
    V: Clone,
{
    /// A fresh map (own substrate, own mutex) populated with this map's live
    /// entries.
    fn clone(&self) -> Self {
        let clone = Self::new();
        {
            let mut dst = clone.core.lock();
            let src = self.core.lock();
            for (key, slot) in src.tree.iter().filter(|(_, slot)| !slot.is_retired()) {
                Self::insert_entry(&mut dst, key.clone(), slot.value().clone());
            }
        }
        clone
    }
}

/********** impl Default **************************************************************************/

impl<K: Ord, V, M, const CIRCULAR: bool> Default for PinMap<K, V, M, SharedOwnership, CIRCULAR> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/********** impl From + FromIterator + Extend *****************************************************/

impl<K: Ord + Clone, V, M, const CIRCULAR: bool> From<BTreeMap<K, V>>
    for PinMap<K, V, M, SharedOwnership, CIRCULAR>
{
    fn from(source: BTreeMap<K, V>) -> Self {
        source.into_iter().collect()
    }
}

impl<K: Ord + Clone, V, M, const CIRCULAR: bool, const N: usize> From<[(K, V); N]>
    for PinMap<K, V, M, SharedOwnership, CIRCULAR>
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Ord + Clone, V, M, const CIRCULAR: bool> FromIterator<(K, V)>
    for PinMap<K, V, M, SharedOwnership, CIRCULAR>
{
    /// First occurrence of a key wins, like repeated substrate inserts.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(entries: I) -> Self {
        let map = Self::new();
        {
            let mut table = map.core.lock();
            for (key, value) in entries {
                Self::insert_entry(&mut table, key, value);
            }
        }
        map
    }
}

impl<K: Ord + Clone, V, M, D, const CIRCULAR: bool> Extend<(K, V)>
    for PinMap<K, V, M, D, CIRCULAR>
{
    /// Range insert with this map's insert semantics (live duplicates kept,
    /// retired ones resurrected).
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, entries: I) {
        let mut table = self.lock();
        for (key, value) in entries {
            Self::insert_entry(&mut table, key, value);
        }
    }
}

/********** impl Debug ****************************************************************************/

impl<K, V, M, D, const CIRCULAR: bool> fmt::Debug for PinMap<K, V, M, D, CIRCULAR>
where
    K: Ord + fmt::Debug,
    V: fmt::Debug,
{
    /// Shows the live entries only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.lock();
        f.debug_map()
            .entries(
                table
                    .tree
                    .iter()
                    .filter(|(_, slot)| !slot.is_retired())
                    .map(|(key, slot)| (key, slot.value())),
            )
            .finish()
    }
}
