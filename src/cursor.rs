//! Cursor positions and the advancement engine.
//!
//! # Cursors are keys
//!
//! The substrate offers no stable node handles, so a cursor is either the
//! owned key of the entry the iterator rests on or the end sentinel. The pin
//! protocol makes this sound: while an iterator pins a key's slot, that key
//! cannot leave the tree, so the cursor always resolves again under the next
//! lock acquisition.
//!
//! # One engine, eight procedures
//!
//! All advancement variants share the two routines below, parameterised by
//! the mode's skip/bounce constants and by the map's circularity and the
//! iterator's direction. Monomorphisation turns each combination into a
//! direct, branch-free dispatch.
//!
//! Directions are handled logically: a reverse iterator's "forward" is
//! descending key order, and the end sentinel sits past the logical last
//! element. The sentinel is sticky for forward motion in the linear modes,
//! while stepping backwards off it re-enters at the logical last entry for
//! forward iterators and stays put for reverse ones.

use std::ops::Bound::{Excluded, Included, Unbounded};

use crate::core::Table;
use crate::mode::{Bounce, IterMode};
use crate::slot::Slot;

////////////////////////////////////////////////////////////////////////////////////////////////////
// Pos
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A cursor into the substrate: a real entry or the end sentinel.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Pos<K> {
    At(K),
    End,
}

/********** impl inherent *************************************************************************/

impl<K> Pos<K> {
    #[inline]
    pub fn key(&self) -> Option<&K> {
        match self {
            Pos::At(key) => Some(key),
            Pos::End => None,
        }
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        matches!(self, Pos::End)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// scanning primitives
////////////////////////////////////////////////////////////////////////////////////////////////////

#[inline]
fn visible<V>(skip_retired: bool, slot: &Slot<V>) -> bool {
    !skip_retired || !slot.is_retired()
}

/// The first visible key strictly beyond `key` in the given direction.
fn beyond<K: Ord + Clone, V>(
    table: &Table<K, V>,
    key: &K,
    skip_retired: bool,
    ascending: bool,
) -> Option<K> {
    if ascending {
        table
            .tree
            .range((Excluded(key), Unbounded))
            .find(|(_, slot)| visible(skip_retired, slot))
            .map(|(k, _)| k.clone())
    } else {
        table
            .tree
            .range((Unbounded, Excluded(key)))
            .rev()
            .find(|(_, slot)| visible(skip_retired, slot))
            .map(|(k, _)| k.clone())
    }
}

/// The first visible key counted from the extreme the direction starts at.
fn edge<K: Ord + Clone, V>(table: &Table<K, V>, skip_retired: bool, ascending: bool) -> Option<K> {
    if ascending {
        table.tree.iter().find(|(_, slot)| visible(skip_retired, slot)).map(|(k, _)| k.clone())
    } else {
        table.tree.iter().rev().find(|(_, slot)| visible(skip_retired, slot)).map(|(k, _)| k.clone())
    }
}

/// Whether the entry under `key` has been retired. Missing entries count as
/// retired; a pinned cursor never misses, but the engine stays defensive
/// against callers anchoring on an arbitrary key.
#[inline]
fn retired_at<K: Ord, V>(table: &Table<K, V>, key: &K) -> bool {
    table.tree.get(key).map_or(true, Slot::is_retired)
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// linear engine
////////////////////////////////////////////////////////////////////////////////////////////////////

/// One step in the iterator's own direction.
pub(crate) fn advance<K, V, M, const CIRCULAR: bool, const REVERSED: bool>(
    table: &Table<K, V>,
    pos: &Pos<K>,
) -> Pos<K>
where
    K: Ord + Clone,
    M: IterMode,
{
    if table.tree.is_empty() {
        return Pos::End;
    }

    let ascending = !REVERSED;
    if CIRCULAR {
        return wrap_step::<K, V, M>(table, pos, ascending);
    }

    match pos {
        // the sentinel is sticky in forward direction
        Pos::End => Pos::End,
        Pos::At(key) => match beyond(table, key, M::SKIP_RETIRED, ascending) {
            Some(next) => Pos::At(next),
            None => match M::BOUNCE {
                Bounce::Back | Bounce::Hold if retired_at(table, key) => {
                    beyond(table, key, M::SKIP_RETIRED, !ascending).map_or(Pos::End, Pos::At)
                }
                Bounce::Hold => Pos::At(key.clone()),
                _ => Pos::End,
            },
        },
    }
}

/// One step against the iterator's direction.
pub(crate) fn retreat<K, V, M, const CIRCULAR: bool, const REVERSED: bool>(
    table: &Table<K, V>,
    pos: &Pos<K>,
) -> Pos<K>
where
    K: Ord + Clone,
    M: IterMode,
{
    if table.tree.is_empty() {
        return Pos::End;
    }

    let ascending = !REVERSED;
    if CIRCULAR {
        return wrap_step::<K, V, M>(table, pos, !ascending);
    }

    match pos {
        // stepping back off the sentinel lands on the logical last entry;
        // reverse iterators treat their sentinel as a hard boundary instead
        Pos::End => {
            if REVERSED {
                Pos::End
            } else {
                edge(table, M::SKIP_RETIRED, false).map_or(Pos::End, Pos::At)
            }
        }
        Pos::At(key) => match beyond(table, key, M::SKIP_RETIRED, !ascending) {
            Some(prev) => Pos::At(prev),
            None => match M::BOUNCE {
                Bounce::Back | Bounce::Hold if retired_at(table, key) => {
                    beyond(table, key, M::SKIP_RETIRED, ascending).map_or(Pos::End, Pos::At)
                }
                Bounce::Hold => Pos::At(key.clone()),
                // forward iterators clamp at their first entry, reverse ones
                // run off their logical front into the sentinel
                _ => {
                    if REVERSED {
                        Pos::End
                    } else {
                        Pos::At(key.clone())
                    }
                }
            },
        },
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// circular engine
////////////////////////////////////////////////////////////////////////////////////////////////////

/// One step through the cyclic key sequence.
///
/// Scans at most one full cycle, may legitimately come back to the starting
/// key, and degrades to the sentinel when nothing is visible at all.
fn wrap_step<K, V, M>(table: &Table<K, V>, pos: &Pos<K>, ascending: bool) -> Pos<K>
where
    K: Ord + Clone,
    M: IterMode,
{
    let skip = M::SKIP_RETIRED;
    match pos {
        Pos::End => edge(table, skip, ascending).map_or(Pos::End, Pos::At),
        Pos::At(key) => {
            if let Some(next) = beyond(table, key, skip, ascending) {
                return Pos::At(next);
            }
            // wrap: re-enter from the opposite extreme, up to and including
            // the starting key itself
            let wrapped = if ascending {
                table
                    .tree
                    .range((Unbounded, Included(key)))
                    .find(|(_, slot)| visible(skip, slot))
                    .map(|(k, _)| k.clone())
            } else {
                table
                    .tree
                    .range((Included(key), Unbounded))
                    .rev()
                    .find(|(_, slot)| visible(skip, slot))
                    .map(|(k, _)| k.clone())
            };
            wrapped.map_or(Pos::End, Pos::At)
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// construction seek
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Moves a freshly constructed cursor off retired entries, in the logical
/// forward direction of the iterator it is built for.
pub(crate) fn seek_visible<K, V>(table: &Table<K, V>, pos: Pos<K>, ascending: bool) -> Pos<K>
where
    K: Ord + Clone,
{
    match pos {
        Pos::At(key) if retired_at(table, &key) => {
            beyond(table, &key, true, ascending).map_or(Pos::End, Pos::At)
        }
        pos => pos,
    }
}

#[cfg(test)]
mod tests {
    use super::{advance, retreat, seek_visible, Pos};
    use crate::core::Table;
    use crate::mode::{EvenErased, ForwardSameThenBackward, ForwardThenBackward, OnlyForward};
    use crate::slot::Slot;

    /// A table over the given keys, with the listed ones retired.
    fn table(keys: &[i32], retired: &[i32]) -> Table<i32, i32> {
        let mut table = Table::new();
        for &k in keys {
            let mut slot = Slot::new(k * 10);
            if retired.contains(&k) {
                slot.retire();
            } else {
                table.live += 1;
            }
            table.tree.insert(k, slot);
        }
        table
    }

    fn fwd<M: crate::mode::IterMode>(t: &Table<i32, i32>, pos: Pos<i32>) -> Pos<i32> {
        advance::<_, _, M, false, false>(t, &pos)
    }

    fn back<M: crate::mode::IterMode>(t: &Table<i32, i32>, pos: Pos<i32>) -> Pos<i32> {
        retreat::<_, _, M, false, false>(t, &pos)
    }

    #[test]
    fn only_forward_skips_retired() {
        let t = table(&[1, 2, 3, 4], &[3]);
        assert_eq!(fwd::<OnlyForward>(&t, Pos::At(2)), Pos::At(4));
        assert_eq!(fwd::<OnlyForward>(&t, Pos::At(4)), Pos::End);
        assert_eq!(fwd::<OnlyForward>(&t, Pos::End), Pos::End);
    }

    #[test]
    fn only_forward_retreat_clamps_at_front() {
        let t = table(&[1, 2, 3], &[]);
        assert_eq!(back::<OnlyForward>(&t, Pos::At(1)), Pos::At(1));
        assert_eq!(back::<OnlyForward>(&t, Pos::At(3)), Pos::At(2));
        // stepping back off the sentinel lands on the last entry
        assert_eq!(back::<OnlyForward>(&t, Pos::End), Pos::At(3));
    }

    #[test]
    fn retreat_with_no_live_predecessor_holds() {
        let t = table(&[1, 2, 3], &[1, 2]);
        assert_eq!(back::<OnlyForward>(&t, Pos::At(3)), Pos::At(3));
    }

    #[test]
    fn empty_table_is_inert() {
        let t = table(&[], &[]);
        assert_eq!(fwd::<OnlyForward>(&t, Pos::End), Pos::End);
        assert_eq!(back::<OnlyForward>(&t, Pos::End), Pos::End);
        assert_eq!(advance::<_, _, OnlyForward, true, false>(&t, &Pos::End), Pos::End);
    }

    #[test]
    fn reverse_runs_into_its_own_sentinel() {
        let t = table(&[1, 2, 3], &[]);
        // logical forward of a reverse cursor is descending
        assert_eq!(advance::<_, _, OnlyForward, false, true>(&t, &Pos::At(2)), Pos::At(1));
        assert_eq!(advance::<_, _, OnlyForward, false, true>(&t, &Pos::At(1)), Pos::End);
        assert_eq!(advance::<_, _, OnlyForward, false, true>(&t, &Pos::End), Pos::End);
        // a reverse cursor at its logical front retreats into the sentinel
        assert_eq!(retreat::<_, _, OnlyForward, false, true>(&t, &Pos::At(3)), Pos::End);
        assert_eq!(retreat::<_, _, OnlyForward, false, true>(&t, &Pos::End), Pos::End);
    }

    #[test]
    fn bounce_fires_only_from_retired_entries() {
        let t = table(&[1, 2, 3, 4], &[3, 4]);
        // departing retired 3 with nothing live ahead bounces back to 2
        assert_eq!(fwd::<ForwardThenBackward>(&t, Pos::At(3)), Pos::At(2));
        assert_eq!(fwd::<ForwardSameThenBackward>(&t, Pos::At(3)), Pos::At(2));
        // under OnlyForward the same step falls off the end
        assert_eq!(fwd::<OnlyForward>(&t, Pos::At(3)), Pos::End);
    }

    #[test]
    fn live_departure_ends_or_holds_depending_on_mode() {
        let t = table(&[1, 2, 3], &[3]);
        // 2 is the last live entry; leaving it forward finds nothing
        assert_eq!(fwd::<ForwardThenBackward>(&t, Pos::At(2)), Pos::End);
        assert_eq!(fwd::<ForwardSameThenBackward>(&t, Pos::At(2)), Pos::At(2));
    }

    #[test]
    fn bounce_mirrors_on_retreat() {
        let t = table(&[1, 2, 3, 4], &[1, 2]);
        assert_eq!(back::<ForwardThenBackward>(&t, Pos::At(2)), Pos::At(3));
        assert_eq!(back::<ForwardSameThenBackward>(&t, Pos::At(2)), Pos::At(3));
        let t = table(&[1, 2, 3], &[1]);
        assert_eq!(back::<ForwardThenBackward>(&t, Pos::At(2)), Pos::At(2));
        assert_eq!(back::<ForwardSameThenBackward>(&t, Pos::At(2)), Pos::At(2));
    }

    #[test]
    fn even_erased_visits_tombstones() {
        let t = table(&[1, 2, 3, 4], &[3]);
        assert_eq!(fwd::<EvenErased>(&t, Pos::At(2)), Pos::At(3));
        assert_eq!(fwd::<EvenErased>(&t, Pos::At(3)), Pos::At(4));
        assert_eq!(back::<EvenErased>(&t, Pos::At(4)), Pos::At(3));
        // forward cursors clamp at the front, reverse ones fall off it
        assert_eq!(back::<EvenErased>(&t, Pos::At(1)), Pos::At(1));
        assert_eq!(retreat::<_, _, EvenErased, false, true>(&t, &Pos::At(4)), Pos::End);
    }

    #[test]
    fn circular_wraps_across_the_ends() {
        let t = table(&[1, 2, 3], &[2]);
        assert_eq!(advance::<_, _, OnlyForward, true, false>(&t, &Pos::At(3)), Pos::At(1));
        assert_eq!(advance::<_, _, OnlyForward, true, false>(&t, &Pos::End), Pos::At(1));
        assert_eq!(retreat::<_, _, OnlyForward, true, false>(&t, &Pos::At(1)), Pos::At(3));
        assert_eq!(retreat::<_, _, OnlyForward, true, false>(&t, &Pos::End), Pos::At(3));
    }

    #[test]
    fn circular_wrap_may_stop_on_the_starting_key() {
        let t = table(&[1, 2, 3], &[1, 3]);
        // 2 is the only live entry, so a full cycle comes back to it
        assert_eq!(advance::<_, _, OnlyForward, true, false>(&t, &Pos::At(2)), Pos::At(2));
        // with nothing live at all the cycle degrades to the sentinel
        let t = table(&[1, 2, 3], &[1, 2, 3]);
        assert_eq!(advance::<_, _, OnlyForward, true, false>(&t, &Pos::At(2)), Pos::End);
    }

    #[test]
    fn circular_even_erased_cycles_everything() {
        let t = table(&[1, 2], &[2]);
        assert_eq!(advance::<_, _, EvenErased, true, false>(&t, &Pos::At(2)), Pos::At(1));
        assert_eq!(advance::<_, _, EvenErased, true, false>(&t, &Pos::At(1)), Pos::At(2));
        assert_eq!(retreat::<_, _, EvenErased, true, true>(&t, &Pos::At(1)), Pos::At(2));
    }

    #[test]
    fn seek_passes_over_leading_tombstones() {
        let t = table(&[1, 2, 3], &[1, 2]);
        assert_eq!(seek_visible(&t, Pos::At(1), true), Pos::At(3));
        assert_eq!(seek_visible(&t, Pos::At(3), true), Pos::At(3));
        assert_eq!(seek_visible(&t, Pos::At(1), false), Pos::End);
        assert_eq!(seek_visible::<i32, i32>(&t, Pos::End, true), Pos::End);
    }
}
