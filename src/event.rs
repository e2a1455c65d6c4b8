/// Event records for the simulation kernel.
///
/// An `Event` is fixed at construction: its time and kind never change
/// while it sits in the future event list. The kind drives both handler
/// dispatch and the same-time tie-break.

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::heap::StrictOrder;
use crate::time::SimTime;

// ── Event ID ──────────────────────────────────────────────────────────

/// Identity of an event within one run.
///
/// Ids carry no ordering meaning for the heap. They exist so models can
/// correlate an arrival with the departure that completes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw u64 into an `EventId`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Run-scoped, strictly increasing id counter.
///
/// Each `Simulation` owns one and resets it at the start of every trial,
/// so two trials never share identities and a replayed trial mints the
/// same ids in the same order.
#[derive(Debug, Clone)]
pub struct EventIdGen {
    start: u64,
    next: u64,
}

impl EventIdGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a generator starting at a specific value.
    pub fn starting_at(start: u64) -> Self {
        EventIdGen { start, next: start }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }

    /// Peek at the next ID without consuming it.
    pub fn peek(&self) -> EventId {
        EventId(self.next)
    }

    /// Rewind to the initial value.
    pub fn reset(&mut self) {
        self.next = self.start;
    }
}

impl Default for EventIdGen {
    fn default() -> Self {
        Self::new()
    }
}

// ── Event Kind ────────────────────────────────────────────────────────

/// Closed set of event kinds.
///
/// `Custom` covers model-specific kinds (loading-queue arrivals, end of
/// weighing, ...). For tie-breaking they behave like `Departure`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// An entity enters the system.
    Arrival,

    /// An entity leaves the system.
    Departure,

    /// Terminal sentinel bounding a run by simulated time.
    End,

    /// A model-defined kind, identified by name.
    Custom(Cow<'static, str>),
}

impl EventKind {
    /// Build a custom kind.
    pub fn custom(name: impl Into<Cow<'static, str>>) -> Self {
        EventKind::Custom(name.into())
    }

    /// Same-time tie-break.
    ///
    /// An `Arrival` sorts before every other kind and identical kinds tie.
    /// Every other pair (including `Departure` against `End`) is left
    /// unordered.
    pub fn tie_break(&self, other: &EventKind) -> Option<Ordering> {
        match (self, other) {
            (EventKind::Arrival, EventKind::Arrival) => Some(Ordering::Equal),
            (EventKind::Arrival, _) => Some(Ordering::Less),
            (_, EventKind::Arrival) => Some(Ordering::Greater),
            (a, b) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Coarse rank used where a total order is unavoidable: arrivals first,
    /// everything else in one bucket.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            EventKind::Arrival => 0,
            _ => 1,
        }
    }

    /// Returns `true` for the terminal sentinel.
    pub fn is_end(&self) -> bool {
        matches!(self, EventKind::End)
    }

    /// Short label used in dumps.
    pub fn abbrev(&self) -> &str {
        match self {
            EventKind::Arrival => "A",
            EventKind::Departure => "D",
            EventKind::End => "E",
            EventKind::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Arrival => write!(f, "Arrival"),
            EventKind::Departure => write!(f, "Departure"),
            EventKind::End => write!(f, "End"),
            EventKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A scheduled occurrence.
///
/// Ordering (`PartialOrd`) is time ascending, then the kind tie-break.
/// Equality (`PartialEq`) is deliberately narrower than identity: two
/// events are equal when they share `(time, kind)`, which is what
/// deletion matches on.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    time: SimTime,
    kind: EventKind,
    tag: Option<String>,
    id: Option<EventId>,
    caused_by: Option<SimTime>,
}

impl Event {
    /// An untagged event without identity.
    pub fn new(time: impl Into<SimTime>, kind: EventKind) -> Self {
        Event {
            time: time.into(),
            kind,
            tag: None,
            id: None,
            caused_by: None,
        }
    }

    pub fn arrival(time: impl Into<SimTime>) -> Self {
        Self::new(time, EventKind::Arrival)
    }

    pub fn departure(time: impl Into<SimTime>) -> Self {
        Self::new(time, EventKind::Departure)
    }

    pub fn end(time: impl Into<SimTime>) -> Self {
        Self::new(time, EventKind::End)
    }

    /// Attach an entity/class tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Attach an identity.
    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }

    /// Record the time of the event this one completes.
    pub fn caused_by(mut self, time: SimTime) -> Self {
        self.caused_by = Some(time);
        self
    }

    #[inline]
    pub fn time(&self) -> SimTime {
        self.time
    }

    #[inline]
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    #[inline]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    #[inline]
    pub fn id(&self) -> Option<EventId> {
        self.id
    }

    #[inline]
    pub fn caused_by_time(&self) -> Option<SimTime> {
        self.caused_by
    }

    /// Strict "sorts before" under the ordering relation.
    #[inline]
    pub fn precedes(&self, other: &Event) -> bool {
        self < other
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.kind == other.kind
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.time.partial_cmp(&other.time)? {
            Ordering::Equal => self.kind.tie_break(&other.kind),
            ord => Some(ord),
        }
    }
}

impl StrictOrder for Event {
    fn strict_cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.kind.rank().cmp(&other.kind.rank()))
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, t={}", self.kind.abbrev(), self.time.value())?;
        if let Some(tag) = &self.tag {
            write!(f, ", {}", tag)?;
        }
        if let Some(id) = self.id {
            write!(f, ", id={}", id)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_monotonic() {
        let mut gen = EventIdGen::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert_eq!(gen.peek().raw(), 2);
    }

    #[test]
    fn test_event_id_reset() {
        let mut gen = EventIdGen::starting_at(5);
        gen.next_id();
        gen.next_id();
        gen.reset();
        assert_eq!(gen.next_id().raw(), 5);
    }

    #[test]
    fn test_ordering_by_time_first() {
        let early = Event::end(10.0);
        let late = Event::arrival(20.0);
        assert!(early.precedes(&late));
        assert!(!late.precedes(&early));
    }

    #[test]
    fn test_arrival_breaks_ties() {
        let a = Event::arrival(5.0);
        assert!(a.precedes(&Event::departure(5.0)));
        assert!(a.precedes(&Event::end(5.0)));
        assert!(a.precedes(&Event::new(5.0, EventKind::custom("EL"))));
        assert!(!Event::end(5.0).precedes(&a));
    }

    #[test]
    fn test_departure_and_end_are_unordered() {
        let d = Event::departure(7.0);
        let e = Event::end(7.0);
        assert_eq!(d.partial_cmp(&e), None);
        assert!(!d.precedes(&e));
        assert!(!e.precedes(&d));
    }

    #[test]
    fn test_custom_kinds_unordered_among_themselves() {
        let el = Event::new(3.0, EventKind::custom("EL"));
        let ew = Event::new(3.0, EventKind::custom("EW"));
        assert_eq!(el.partial_cmp(&ew), None);
        assert_eq!(el.partial_cmp(&el.clone()), Some(Ordering::Equal));
    }

    #[test]
    fn test_equality_ignores_identity_and_tag() {
        let a = Event::arrival(20.0).with_id(EventId::new(2)).with_tag("first");
        let b = Event::arrival(20.0).with_id(EventId::new(6));
        assert_eq!(a, b);
        assert_ne!(a, Event::departure(20.0));
        assert_ne!(a, Event::arrival(20.5));
    }

    #[test]
    fn test_strict_order_resolves_gaps() {
        let d = Event::departure(7.0);
        let e = Event::end(7.0);
        assert_eq!(d.strict_cmp(&e), Ordering::Equal);
        assert_eq!(Event::arrival(7.0).strict_cmp(&e), Ordering::Less);
        assert_eq!(Event::arrival(8.0).strict_cmp(&e), Ordering::Greater);
    }

    #[test]
    fn test_event_display() {
        let e = Event::arrival(20.0).with_id(EventId::new(3));
        assert_eq!(e.to_string(), "(A, t=20, id=E#3)");
        let e = Event::new(1.5, EventKind::custom("ALQ")).with_tag("truck-1");
        assert_eq!(e.to_string(), "(ALQ, t=1.5, truck-1)");
        assert_eq!(format!("{}", EventId::new(42)), "E#42");
    }

    #[test]
    fn test_accessors() {
        let e = Event::departure(9.0)
            .with_tag("economy")
            .with_id(EventId::new(1))
            .caused_by(SimTime::new(4.0));
        assert_eq!(e.time(), SimTime::new(9.0));
        assert_eq!(e.kind(), &EventKind::Departure);
        assert_eq!(e.tag(), Some("economy"));
        assert_eq!(e.id(), Some(EventId::new(1)));
        assert_eq!(e.caused_by_time(), Some(SimTime::new(4.0)));
    }
}
