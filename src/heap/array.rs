//! Array-backed binary min-heap.

use crate::error::{DesError, DesResult};

use super::{heapify, sift_down, sift_up, sort_partial, MinHeap};

/// A binary min-heap stored in a `Vec`, ordered by `PartialOrd`.
///
/// Node `i` has children `2i + 1` and `2i + 2`. No child ever strictly
/// precedes its parent.
#[derive(Debug, Clone)]
pub struct ArrayHeap<T> {
    data: Vec<T>,
}

impl<T: PartialOrd> ArrayHeap<T> {
    /// Create an empty heap.
    pub fn new() -> Self {
        ArrayHeap { data: Vec::new() }
    }

    /// Build a heap from an arbitrary vector in O(n).
    pub fn from_vec(mut data: Vec<T>) -> Self {
        heapify(&mut data);
        ArrayHeap { data }
    }

    /// The backing array in its current layout.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Give up the backing array without sorting it.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Pop using the single-pass sift-down, for comparison with `pop_min`.
    #[cfg(test)]
    pub(crate) fn pop_min_single_pass(&mut self) -> DesResult<T> {
        let last = self.data.pop().ok_or(DesError::EmptyCollection)?;
        if self.data.is_empty() {
            return Ok(last);
        }
        let min = std::mem::replace(&mut self.data[0], last);
        super::sift_down_single_pass(&mut self.data, 0);
        Ok(min)
    }
}

impl<T: PartialOrd> Default for ArrayHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialOrd> MinHeap<T> for ArrayHeap<T> {
    fn push(&mut self, item: T) {
        self.data.push(item);
        let last = self.data.len() - 1;
        sift_up(&mut self.data, 0, last);
    }

    fn pop_min(&mut self) -> DesResult<T> {
        // Take the tail; if that empties the heap it was the minimum.
        let last = self.data.pop().ok_or(DesError::EmptyCollection)?;
        if self.data.is_empty() {
            return Ok(last);
        }
        let min = std::mem::replace(&mut self.data[0], last);
        sift_down(&mut self.data, 0);
        Ok(min)
    }

    fn peek(&self) -> Option<&T> {
        self.data.first()
    }

    fn delete(&mut self, item: &T) -> Option<T> {
        let pos = self.data.iter().position(|e| e == item)?;
        let removed = self.data.remove(pos);
        heapify(&mut self.data);
        Some(removed)
    }

    fn k_smallest(&self, k: usize) -> Vec<T>
    where
        T: Clone,
    {
        let mut sorted = self.data.clone();
        sort_partial(&mut sorted);
        sorted.truncate(k);
        sorted
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn clear(&mut self) {
        self.data.clear();
    }
}
