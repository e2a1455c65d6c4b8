/// Future event list.
///
/// The run-scoped set of pending events, ordered by the event ordering
/// relation. A thin facade over one [`MinHeap`] so the driver never cares
/// which backend is underneath.

use tracing::trace;

use crate::event::Event;
use crate::heap::{HeapBackend, MinHeap};

/// The pending-event set of one simulation run.
pub struct FutureEventList {
    heap: Box<dyn MinHeap<Event> + Send>,
    backend: HeapBackend,
}

impl FutureEventList {
    /// Create an empty list on the array heap.
    pub fn new() -> Self {
        Self::with_backend(HeapBackend::default())
    }

    /// Create an empty list on the given backend.
    pub fn with_backend(backend: HeapBackend) -> Self {
        FutureEventList {
            heap: backend.build(),
            backend,
        }
    }

    /// Which heap implementation is in use.
    pub fn backend(&self) -> HeapBackend {
        self.backend
    }

    /// Schedule an event.
    pub fn insert_with_priority(&mut self, event: Event) {
        trace!(event = %event, pending = self.heap.len() + 1, "fel insert");
        self.heap.push(event);
    }

    /// Pop the earliest event.
    ///
    /// Returns `None` when nothing is scheduled; an empty list is a normal
    /// state here, unlike [`MinHeap::pop_min`].
    pub fn get_next(&mut self) -> Option<Event> {
        if self.heap.is_empty() {
            return None;
        }
        let event = self.heap.pop_min().ok()?;
        trace!(event = %event, pending = self.heap.len(), "fel pop");
        Some(event)
    }

    /// Remove the first pending event (in heap array order) that matches
    /// `event` on `(time, kind)`. A miss is silently ignored.
    pub fn delete(&mut self, event: &Event) -> Option<Event> {
        let removed = self.heap.delete(event);
        match &removed {
            Some(e) => trace!(event = %e, pending = self.heap.len(), "fel delete"),
            None => trace!(probe = %event, "fel delete: no match"),
        }
        removed
    }

    /// The earliest pending event.
    pub fn peek(&self) -> Option<&Event> {
        self.heap.peek()
    }

    pub fn length(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop every pending event.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Every pending event in ascending order. Does not modify the list.
    pub fn dump(&self) -> Vec<Event> {
        self.heap.k_smallest(self.heap.len())
    }
}

impl Default for FutureEventList {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FutureEventList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FutureEventList")
            .field("backend", &self.backend)
            .field("pending", &self.heap.len())
            .finish()
    }
}

impl std::fmt::Display for FutureEventList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, event) in self.dump().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", event)?;
        }
        write!(f, "]")
    }
}
