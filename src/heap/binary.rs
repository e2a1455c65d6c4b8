//! Min-heap backed by `std::collections::BinaryHeap`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{DesError, DesResult};

use super::{MinHeap, StrictOrder};

/// An item plus its insertion sequence number.
///
/// `Ord` is reversed so that the max-heap pops the smallest key first;
/// ties under [`StrictOrder`] go to the earlier insertion.
#[derive(Debug)]
struct Slot<T> {
    seq: u64,
    item: T,
}

impl<T: StrictOrder> Ord for Slot<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .item
            .strict_cmp(&self.item)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T: StrictOrder> PartialOrd for Slot<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: StrictOrder> PartialEq for Slot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: StrictOrder> Eq for Slot<T> {}

/// Standard-library heap behind the [`MinHeap`] interface.
#[derive(Debug)]
pub struct BinaryHeapBackend<T> {
    heap: BinaryHeap<Slot<T>>,
    next_seq: u64,
}

impl<T: StrictOrder> BinaryHeapBackend<T> {
    pub fn new() -> Self {
        BinaryHeapBackend {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T: StrictOrder> Default for BinaryHeapBackend<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialOrd + StrictOrder> MinHeap<T> for BinaryHeapBackend<T> {
    fn push(&mut self, item: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Slot { seq, item });
    }

    fn pop_min(&mut self) -> DesResult<T> {
        self.heap
            .pop()
            .map(|slot| slot.item)
            .ok_or(DesError::EmptyCollection)
    }

    fn peek(&self) -> Option<&T> {
        self.heap.peek().map(|slot| &slot.item)
    }

    fn delete(&mut self, item: &T) -> Option<T> {
        let pos = self.heap.iter().position(|slot| &slot.item == item)?;
        // `iter()` walks the backing vector, so `pos` indexes `into_vec()`.
        let mut slots = std::mem::take(&mut self.heap).into_vec();
        let removed = slots.remove(pos);
        self.heap = BinaryHeap::from(slots);
        Some(removed.item)
    }

    fn k_smallest(&self, k: usize) -> Vec<T>
    where
        T: Clone,
    {
        let mut slots: Vec<&Slot<T>> = self.heap.iter().collect();
        slots.sort_by(|a, b| b.cmp(a));
        slots
            .into_iter()
            .take(k)
            .map(|slot| slot.item.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn clear(&mut self) {
        self.heap.clear();
        self.next_seq = 0;
    }
}
