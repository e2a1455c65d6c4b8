/// Logical clock for the simulation.
///
/// Time only advances when the driver dispatches an event; nothing in the
/// kernel ever reads the wall clock. Values are real-valued because the
/// queueing models add sampled, fractional durations to it.

use std::cmp::Ordering;

/// A point on the simulation clock.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(f64);

impl SimTime {
    /// The zero-point of simulation time.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Wrap a raw clock value.
    #[inline]
    pub fn new(value: f64) -> Self {
        SimTime(value)
    }

    /// Return the raw clock value.
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// The time that is `delay` after `self`.
    #[inline]
    pub fn plus(self, delay: f64) -> SimTime {
        SimTime(self.0 + delay)
    }

    /// Returns `true` if `self` is strictly before `other`.
    #[inline]
    pub fn is_before(self, other: SimTime) -> bool {
        self.0 < other.0
    }

    /// Duration between two points in time.
    /// Returns `None` if `earlier` is after `self`.
    #[inline]
    pub fn duration_since(self, earlier: SimTime) -> Option<f64> {
        if earlier.0 <= self.0 {
            Some(self.0 - earlier.0)
        } else {
            None
        }
    }

    /// Total order over clock values (IEEE 754 `totalOrder`).
    ///
    /// Only the std-heap backend needs this; everything else goes through
    /// `PartialOrd`.
    #[inline]
    pub fn total_cmp(&self, other: &SimTime) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for SimTime {
    fn from(value: f64) -> Self {
        SimTime(value)
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={}", self.0)
    }
}
