//! The iterator family.
//!
//! An iterator is a handle to the map's core plus a cursor. Between critical
//! sections it owns nothing else; validity of the cursor across concurrent
//! erasure is exactly the pin it holds on the entry under it.
//!
//! # Pin protocol
//!
//! - Construction or cloning at a real entry pins that entry, under the lock.
//! - Dropping or retargeting releases the pin under the lock and reclaims the
//!   entry if it was retired and this was the last pin.
//! - Advancement releases the old pin and takes the new one inside a single
//!   critical section. The departed entry is reclaimed only after the new
//!   cursor has been computed, since the scan anchors on it.
//!
//! Retargeting across maps needs no special code: assigning a cloned
//! iterator releases the destination's old pin under its old lock when the
//! replaced value drops, and the clone took the new pin under the new lock.
//! The two locks are never held at once.

use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::ptr;

use parking_lot::{MappedMutexGuard, MutexGuard};

use crate::core::{CoreHandle, DtorSafety, MapCore, SharedOwnership, Table};
use crate::cursor::{self, Pos};
use crate::mode::{EvenErased, IterMode, OnlyForward};
use crate::slot::Slot;

////////////////////////////////////////////////////////////////////////////////////////////////////
// Iter
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A cursor over a [`PinMap`] that stays valid across concurrent mutation,
/// including erasure of the entry it rests on.
///
/// `REVERSED` iterators walk descending key order; their full behaviour is
/// otherwise decided by the map's mode and circularity parameters.
///
/// [`PinMap`]: crate::PinMap
pub struct Iter<
    K,
    V,
    M = OnlyForward,
    D = SharedOwnership,
    const CIRCULAR: bool = false,
    const REVERSED: bool = false,
> where
    K: Ord,
    D: DtorSafety<K, V>,
{
    handle: D::Handle,
    pos: Pos<K>,
    _mode: PhantomData<M>,
}

/// An iterator walking descending key order.
pub type RevIter<K, V, M = OnlyForward, D = SharedOwnership, const CIRCULAR: bool = false> =
    Iter<K, V, M, D, CIRCULAR, true>;

/********** impl inherent *************************************************************************/

impl<K, V, M, D, const CIRCULAR: bool, const REVERSED: bool> Iter<K, V, M, D, CIRCULAR, REVERSED>
where
    K: Ord + Clone,
    M: IterMode,
    D: DtorSafety<K, V>,
{
    /// Builds an iterator over an already locked table, pinning the entry the
    /// cursor settles on.
    ///
    /// With `skip_retired`, a cursor landing on a retired entry first moves
    /// forward (in this iterator's logical direction) to the next visible
    /// one.
    pub(crate) fn new_pinned(
        handle: D::Handle,
        table: &mut Table<K, V>,
        start: Pos<K>,
        skip_retired: bool,
    ) -> Self {
        let pos = if skip_retired { cursor::seek_visible(table, start, !REVERSED) } else { start };
        if let Pos::At(key) = &pos {
            table.pin(key);
        }
        Self { handle, pos, _mode: PhantomData }
    }

    /// An iterator resting on the end sentinel. Pins nothing, needs no lock.
    pub(crate) fn at_end(handle: D::Handle) -> Self {
        Self { handle, pos: Pos::End, _mode: PhantomData }
    }

    #[inline]
    pub(crate) fn pos(&self) -> &Pos<K> {
        &self.pos
    }

    #[inline]
    pub(crate) fn core_ptr(&self) -> *const MapCore<K, V> {
        self.handle.core_ptr()
    }

    /// Disassembles the iterator without releasing its pin; the caller takes
    /// over the release obligation.
    pub(crate) fn into_parts(self) -> (D::Handle, Pos<K>) {
        let this = ManuallyDrop::new(self);
        // SAFETY: each field is read exactly once and the destructor is
        // suppressed, so ownership of the handle and of the pin obligation
        // moves to the caller without a double release.
        unsafe { (ptr::read(&this.handle), ptr::read(&this.pos)) }
    }

    /// The key under the cursor, or `None` at the end sentinel.
    ///
    /// This reads the iterator's own copy of the key and takes no lock.
    #[inline]
    pub fn key(&self) -> Option<&K> {
        self.pos.key()
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.pos.is_end()
    }

    /// Moves one step in this iterator's direction, as decided by the map's
    /// iteration mode and circularity.
    pub fn advance(&mut self) -> &mut Self {
        self.step(true)
    }

    /// Moves one step against this iterator's direction.
    pub fn retreat(&mut self) -> &mut Self {
        self.step(false)
    }

    fn step(&mut self, forward: bool) -> &mut Self {
        let mut table = self.handle.core().lock();
        let old = std::mem::replace(&mut self.pos, Pos::End);

        // release the old pin but keep the slot in the tree for now, it
        // anchors the neighbour scan
        let reclaim_old = match &old {
            Pos::At(key) => table.unpin_deferred(key),
            Pos::End => false,
        };

        let new = if forward {
            cursor::advance::<K, V, M, CIRCULAR, REVERSED>(&table, &old)
        } else {
            cursor::retreat::<K, V, M, CIRCULAR, REVERSED>(&table, &old)
        };

        if let Pos::At(key) = &new {
            table.pin(key);
        }
        if reclaim_old && old != new {
            if let Pos::At(key) = &old {
                table.reclaim(key);
            }
        }

        drop(table);
        self.pos = new;
        self
    }

    /// A shared reference to the value under the cursor.
    ///
    /// The map-wide lock is held for as long as the returned guard lives, so
    /// keep its scope tight. `None` at the end sentinel. A pinned entry stays
    /// readable even after it has been erased by another thread.
    pub fn read(&self) -> Option<ValueRef<'_, V>> {
        let key = self.pos.key()?;
        let table = self.handle.core().lock();
        MutexGuard::try_map(table, |t| t.tree.get_mut(key).map(Slot::value_mut))
            .ok()
            .map(|guard| ValueRef { guard })
    }

    /// An exclusive reference to the value under the cursor.
    ///
    /// Writes are synchronised only for the lifetime of the guard; compound
    /// updates spanning several calls are last-writer-wins.
    pub fn write(&self) -> Option<ValueMut<'_, V>> {
        let key = self.pos.key()?;
        let table = self.handle.core().lock();
        MutexGuard::try_map(table, |t| t.tree.get_mut(key).map(Slot::value_mut))
            .ok()
            .map(|guard| ValueMut { guard })
    }

    /// Clones the entry under the cursor out of the map.
    pub fn get(&self) -> Option<(K, V)>
    where
        V: Clone,
    {
        let key = self.pos.key()?;
        let table = self.handle.core().lock();
        table.tree.get(key).map(|slot| (key.clone(), slot.value().clone()))
    }

    /// Whether the entry under the cursor has been logically erased.
    ///
    /// `None` at the end sentinel.
    pub fn retired(&self) -> Option<bool> {
        let key = self.pos.key()?;
        let table = self.handle.core().lock();
        table.tree.get(key).map(|slot| slot.is_retired())
    }
}

/********** impl Clone ****************************************************************************/

impl<K, V, M, D, const CIRCULAR: bool, const REVERSED: bool> Clone
    for Iter<K, V, M, D, CIRCULAR, REVERSED>
where
    K: Ord + Clone,
    D: DtorSafety<K, V>,
{
    fn clone(&self) -> Self {
        if let Pos::At(key) = &self.pos {
            self.handle.core().lock().pin(key);
        }
        Self { handle: self.handle.clone(), pos: self.pos.clone(), _mode: PhantomData }
    }
}

/********** impl Drop *****************************************************************************/

impl<K, V, M, D, const CIRCULAR: bool, const REVERSED: bool> Drop
    for Iter<K, V, M, D, CIRCULAR, REVERSED>
where
    K: Ord,
    D: DtorSafety<K, V>,
{
    fn drop(&mut self) {
        if let Pos::At(key) = &self.pos {
            self.handle.core().lock().unpin(key);
        }
    }
}

/********** impl PartialEq + Eq *******************************************************************/

impl<K, V, M, D, const CIRCULAR: bool, const REVERSED: bool> PartialEq
    for Iter<K, V, M, D, CIRCULAR, REVERSED>
where
    K: Ord,
    D: DtorSafety<K, V>,
{
    /// Two iterators are equal when they reference the same position of the
    /// same map. End sentinels of different maps are *not* equal.
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.handle.core_ptr() == other.handle.core_ptr() && self.pos == other.pos
    }
}

impl<K, V, M, D, const CIRCULAR: bool, const REVERSED: bool> Eq
    for Iter<K, V, M, D, CIRCULAR, REVERSED>
where
    K: Ord,
    D: DtorSafety<K, V>,
{
}

/********** impl Debug ****************************************************************************/

impl<K, V, M, D, const CIRCULAR: bool, const REVERSED: bool> fmt::Debug
    for Iter<K, V, M, D, CIRCULAR, REVERSED>
where
    K: Ord + fmt::Debug,
    D: DtorSafety<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pos {
            Pos::At(key) => f.debug_tuple("Iter").field(key).finish(),
            Pos::End => f.write_str("Iter(end)"),
        }
    }
}

/********** impl Iterator *************************************************************************/

// Only the terminating instantiations implement `Iterator`: the bounce modes
// can revisit entries and circular maps never run out, so those keep the
// explicit cursor API.

impl<K, V, D, const REVERSED: bool> Iterator for Iter<K, V, OnlyForward, D, false, REVERSED>
where
    K: Ord + Clone,
    V: Clone,
    D: DtorSafety<K, V>,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.get()?;
        self.advance();
        Some(item)
    }
}

impl<K, V, D, const REVERSED: bool> Iterator for Iter<K, V, EvenErased, D, false, REVERSED>
where
    K: Ord + Clone,
    V: Clone,
    D: DtorSafety<K, V>,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.get()?;
        self.advance();
        Some(item)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// ValueRef
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A shared reference to a stored value, holding the map-wide lock.
pub struct ValueRef<'a, V> {
    guard: MappedMutexGuard<'a, V>,
}

/********** impl inherent *************************************************************************/

impl<'a, V> ValueRef<'a, V> {
    #[inline]
    pub(crate) fn new(guard: MappedMutexGuard<'a, V>) -> Self {
        Self { guard }
    }
}

/********** impl Deref ****************************************************************************/

impl<V> Deref for ValueRef<'_, V> {
    type Target = V;

    #[inline]
    fn deref(&self) -> &V {
        &self.guard
    }
}

/********** impl Debug ****************************************************************************/

impl<V: fmt::Debug> fmt::Debug for ValueRef<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// ValueMut
////////////////////////////////////////////////////////////////////////////////////////////////////

/// An exclusive reference to a stored value, holding the map-wide lock.
pub struct ValueMut<'a, V> {
    guard: MappedMutexGuard<'a, V>,
}

/********** impl inherent *************************************************************************/

impl<'a, V> ValueMut<'a, V> {
    #[inline]
    pub(crate) fn new(guard: MappedMutexGuard<'a, V>) -> Self {
        Self { guard }
    }
}

/********** impl Deref + DerefMut *****************************************************************/

impl<V> Deref for ValueMut<'_, V> {
    type Target = V;

    #[inline]
    fn deref(&self) -> &V {
        &self.guard
    }
}

impl<V> DerefMut for ValueMut<'_, V> {
    #[inline]
    fn deref_mut(&mut self) -> &mut V {
        &mut self.guard
    }
}

/********** impl Debug ****************************************************************************/

impl<V: fmt::Debug> fmt::Debug for ValueMut<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
