//! Marker types selecting how iterators advance across retired entries.
//!
//! The mode is a type parameter of [`PinMap`][crate::PinMap], so every
//! advancement procedure is monomorphised; the hot loop never branches on a
//! runtime mode value. All eight procedures (four modes, linear or circular)
//! share one engine parameterised by the two constants below plus the
//! circularity flag of the map.

////////////////////////////////////////////////////////////////////////////////////////////////////
// IterMode (trait)
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A policy deciding what a neighbour means when entries under or around a
/// live iterator have been logically erased.
pub trait IterMode: Sized + 'static {
    /// When `true`, advancement never stops on a retired entry.
    const SKIP_RETIRED: bool;

    /// What to do when advancement in the nominal direction would leave the
    /// visible region.
    const BOUNCE: Bounce;
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// Bounce
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Fallback behaviour applied when an advance runs out of visible entries in
/// its nominal direction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Bounce {
    /// No fallback: the cursor goes to (or stays at) the end sentinel, or
    /// clamps at the first entry when moving backwards.
    Off,
    /// If the entry the cursor is departing from has been retired, reverse
    /// direction once and move to its nearest live neighbour instead.
    Back,
    /// Like [`Bounce::Back`], but a cursor departing from a still-live entry
    /// holds its position rather than falling off the end.
    Hold,
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// OnlyForward
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The default mode: retired entries are skipped as if they never existed.
///
/// An iterator that runs out of live entries lands on the end sentinel and
/// stays there (unless the map is circular, in which case it wraps around and
/// re-enters from the opposite side). Decrementing at the first live entry
/// holds position for forward iterators and yields the sentinel for reverse
/// ones.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
pub struct OnlyForward;

/********** impl IterMode *************************************************************************/

impl IterMode for OnlyForward {
    const SKIP_RETIRED: bool = true;
    const BOUNCE: Bounce = Bounce::Off;
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// ForwardThenBackward
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Like [`OnlyForward`], except that a scan stranded on a retired entry may
/// reverse once.
///
/// When advancing would land on the end sentinel *and* the entry being
/// departed from is itself retired, the cursor bounces back to the nearest
/// live neighbour on the other side. A scan leaving a live entry still
/// terminates at the sentinel as usual.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
pub struct ForwardThenBackward;

/********** impl IterMode *************************************************************************/

impl IterMode for ForwardThenBackward {
    const SKIP_RETIRED: bool = true;
    const BOUNCE: Bounce = Bounce::Back;
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// ForwardSameThenBackward
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Like [`ForwardThenBackward`], but an iterator standing on a live entry
/// never abandons it.
///
/// If advancing from a live entry finds nothing further in the nominal
/// direction, the cursor holds its position instead of moving to the end
/// sentinel. The bounce itself still only fires when the departed entry has
/// been retired.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
pub struct ForwardSameThenBackward;

/********** impl IterMode *************************************************************************/

impl IterMode for ForwardSameThenBackward {
    const SKIP_RETIRED: bool = true;
    const BOUNCE: Bounce = Bounce::Hold;
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// EvenErased
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Diagnostic mode: advancement visits retired entries like any other.
///
/// Lookups still treat retired entries as absent (visibility of lookups is
/// not a per-mode property), but scans started from [`begin`] or [`rbegin`]
/// observe the physical content of the map, tombstones included.
///
/// [`begin`]: crate::PinMap::begin
/// [`rbegin`]: crate::PinMap::rbegin
#[derive(Copy, Clone, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
pub struct EvenErased;

/********** impl IterMode *************************************************************************/

impl IterMode for EvenErased {
    const SKIP_RETIRED: bool = false;
    const BOUNCE: Bounce = Bounce::Off;
}
