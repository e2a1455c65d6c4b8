/// Dispatch log.
///
/// Records every event the driver dispatches together with the elapsed
/// time since the previous dispatch. This is what statistics collectors
/// consume, and its fingerprint is how two runs are checked for
/// identical behaviour.

use crate::event::{Event, EventKind};

// ── Hash utility ──────────────────────────────────────────────────────

/// Combine two u64 hashes deterministically.
pub fn hash_combine(a: u64, b: u64) -> u64 {
    let mut h = a;
    h = h.wrapping_mul(0x517cc1b727220a95);
    h = h.wrapping_add(b);
    h ^= h >> 32;
    h
}

/// Hash a byte slice deterministically (FNV-1a).
pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for &b in data {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

fn kind_hash(kind: &EventKind) -> u64 {
    match kind {
        EventKind::Arrival => 1,
        EventKind::Departure => 2,
        EventKind::End => 3,
        EventKind::Custom(name) => hash_combine(4, hash_bytes(name.as_bytes())),
    }
}

// ── Dispatch record ───────────────────────────────────────────────────

/// One dispatched event.
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    /// Zero-based position in the dispatch sequence.
    pub index: u64,
    /// The event as it was popped.
    pub event: Event,
    /// Time since the previous dispatch (zero-based clock for the first).
    pub elapsed: f64,
}

// ── Dispatch log ──────────────────────────────────────────────────────

/// Append-only log of dispatched events.
#[derive(Debug, Clone, Default)]
pub struct DispatchLog {
    records: Vec<DispatchRecord>,
}

impl DispatchLog {
    pub fn new() -> Self {
        DispatchLog {
            records: Vec::new(),
        }
    }

    /// Append a dispatch.
    pub fn record(&mut self, event: &Event, elapsed: f64) {
        let index = self.records.len() as u64;
        self.records.push(DispatchRecord {
            index,
            event: event.clone(),
            elapsed,
        });
    }

    pub fn records(&self) -> &[DispatchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of dispatches of the given kind.
    pub fn count_kind(&self, kind: &EventKind) -> usize {
        self.records.iter().filter(|r| r.event.kind() == kind).count()
    }

    /// Sum of elapsed deltas, i.e. the clock at the last dispatch.
    pub fn total_elapsed(&self) -> f64 {
        self.records.iter().map(|r| r.elapsed).sum()
    }

    /// Deterministic hash over ids, times, kinds and tags, in dispatch order.
    pub fn fingerprint(&self) -> u64 {
        let mut h: u64 = 0;
        for record in &self.records {
            let event = &record.event;
            h = hash_combine(h, event.id().map_or(u64::MAX, |id| id.raw()));
            h = hash_combine(h, event.time().value().to_bits());
            h = hash_combine(h, kind_hash(event.kind()));
            if let Some(tag) = event.tag() {
                h = hash_combine(h, hash_bytes(tag.as_bytes()));
            }
        }
        h
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Returns `true` if two logs dispatched the same sequence.
pub fn logs_match(a: &DispatchLog, b: &DispatchLog) -> bool {
    a.len() == b.len() && a.fingerprint() == b.fingerprint()
}
