//! Min-heap backends for the future event list.
//!
//! Two interchangeable implementations sit behind [`MinHeap`]:
//!
//! - [`ArrayHeap`]: the reference array-backed binary heap. It orders
//!   purely through `PartialOrd`, so same-time events the ordering relation
//!   leaves unordered (a `Departure` and an `End`, for example) come out in
//!   whatever order the array layout dictates.
//! - [`BinaryHeapBackend`]: a wrapper over `std::collections::BinaryHeap`.
//!   `BinaryHeap` needs a total order, so it combines [`StrictOrder`] with
//!   an insertion sequence number; unordered same-time events come out in
//!   insertion order.
//!
//! Both backends delete by scanning the backing array in its *current*
//! order, removing the first element that compares equal, and rebuilding.
//! Which duplicate gets removed therefore depends on the array layout,
//! not on the sorted order.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DesResult;

pub mod array;
pub mod binary;

pub use array::ArrayHeap;
pub use binary::BinaryHeapBackend;

/// Total order used where `PartialOrd` is not enough.
///
/// Must agree with `PartialOrd` wherever the latter gives an answer.
pub trait StrictOrder {
    fn strict_cmp(&self, other: &Self) -> Ordering;
}

/// Priority queue interface shared by both backends.
pub trait MinHeap<T> {
    /// Insert an item. O(log n).
    fn push(&mut self, item: T);

    /// Remove and return the minimum.
    ///
    /// Fails with [`DesError::EmptyCollection`](crate::DesError::EmptyCollection)
    /// on an empty heap; callers are expected to check `len()` first.
    fn pop_min(&mut self) -> DesResult<T>;

    /// The minimum, without removing it. O(1).
    fn peek(&self) -> Option<&T>;

    /// Remove the first element (in array order) equal to `item`.
    ///
    /// Returns the removed element, or `None` when nothing matched or the
    /// heap is empty. O(n).
    fn delete(&mut self, item: &T) -> Option<T>;

    /// The `k` smallest elements in ascending order. Sorts a full copy.
    fn k_smallest(&self, k: usize) -> Vec<T>
    where
        T: Clone;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every element.
    fn clear(&mut self);
}

// ── Free functions ────────────────────────────────────────────────────

/// Restore the heap property over an arbitrary slice in O(n).
pub fn heapify<T: PartialOrd>(seq: &mut [T]) {
    for index in (0..seq.len() / 2).rev() {
        sift_down(seq, index);
    }
}

/// Returns `true` if no child strictly precedes its parent.
pub fn is_heap<T: PartialOrd>(seq: &[T]) -> bool {
    (1..seq.len()).all(|child| !(seq[child] < seq[parent_index(child)]))
}

/// Ascending sort under a partial order. Incomparable pairs keep their
/// relative array order.
pub(crate) fn sort_partial<T: PartialOrd>(items: &mut [T]) {
    items.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
}

#[inline]
fn child_index(index: usize) -> usize {
    2 * index + 1
}

#[inline]
fn parent_index(index: usize) -> usize {
    (index - 1) / 2
}

/// Move the element at `pos` towards `start` while it strictly precedes
/// its parent.
pub(crate) fn sift_up<T: PartialOrd>(seq: &mut [T], start: usize, mut pos: usize) {
    while pos > start {
        let parent = parent_index(pos);
        if seq[pos] < seq[parent] {
            seq.swap(pos, parent);
            pos = parent;
        } else {
            break;
        }
    }
}

/// Move the element at `start` down past every smaller child, then run a
/// sift-up from where it landed.
pub(crate) fn sift_down<T: PartialOrd>(seq: &mut [T], start: usize) {
    let end = seq.len();
    let mut pos = start;
    loop {
        let left = child_index(pos);
        if left >= end {
            break;
        }
        let right = left + 1;
        let child = if right < end && seq[right] < seq[left] {
            right
        } else {
            left
        };
        if seq[pos] <= seq[child] {
            break;
        }
        seq.swap(pos, child);
        pos = child;
    }
    sift_up(seq, start, pos);
}

/// Textbook single-pass sift-down: swap only while the smaller child
/// strictly precedes the moving element.
#[cfg(test)]
pub(crate) fn sift_down_single_pass<T: PartialOrd>(seq: &mut [T], start: usize) {
    let end = seq.len();
    let mut pos = start;
    loop {
        let left = child_index(pos);
        if left >= end {
            break;
        }
        let right = left + 1;
        let child = if right < end && seq[right] < seq[left] {
            right
        } else {
            left
        };
        if seq[child] < seq[pos] {
            seq.swap(pos, child);
            pos = child;
        } else {
            break;
        }
    }
}

// ── Backend selection ─────────────────────────────────────────────────

/// Which [`MinHeap`] implementation a future event list uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeapBackend {
    /// [`ArrayHeap`].
    #[default]
    Array,
    /// [`BinaryHeapBackend`].
    Binary,
}

impl HeapBackend {
    /// Instantiate an empty heap of this kind.
    pub fn build<T>(self) -> Box<dyn MinHeap<T> + Send>
    where
        T: PartialOrd + StrictOrder + Send + 'static,
    {
        match self {
            HeapBackend::Array => Box::new(ArrayHeap::new()),
            HeapBackend::Binary => Box::new(BinaryHeapBackend::new()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HeapBackend::Array => "array",
            HeapBackend::Binary => "binary",
        }
    }
}

impl FromStr for HeapBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "array" | "custom" => Ok(HeapBackend::Array),
            "binary" | "std" => Ok(HeapBackend::Binary),
            other => Err(format!(
                "unknown heap backend '{}' (expected 'array' or 'binary')",
                other
            )),
        }
    }
}

impl std::fmt::Display for HeapBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
