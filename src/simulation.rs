/// Simulation driver.
///
/// Seeds the future event list, then repeatedly pops the earliest event,
/// advances the logical clock to it and hands it to a model-supplied
/// handler, until an `End` event is popped or the handler's stop
/// predicate fires. Purely synchronous and single-threaded.

use tracing::{debug, trace};

use crate::error::{DesError, DesResult};
use crate::event::{Event, EventId, EventIdGen, EventKind};
use crate::fel::FutureEventList;
use crate::heap::HeapBackend;
use crate::time::SimTime;
use crate::trace::DispatchLog;

// ── Handler trait ─────────────────────────────────────────────────────

/// Model logic invoked for every dispatched event.
///
/// `End` events never reach the handler; the driver consumes them.
pub trait EventHandler {
    /// React to a dispatched event, scheduling follow-ups through `ctx`.
    ///
    /// An error aborts the run.
    fn handle(&mut self, ctx: &mut SimulationContext<'_>, event: &Event) -> DesResult<()>;

    /// Count-bounded termination predicate, checked before every pop.
    fn should_stop(&self) -> bool {
        false
    }
}

/// A handler backed by a closure, for tests and one-off scripts.
impl<F> EventHandler for F
where
    F: FnMut(&mut SimulationContext<'_>, &Event) -> DesResult<()>,
{
    fn handle(&mut self, ctx: &mut SimulationContext<'_>, event: &Event) -> DesResult<()> {
        (self)(ctx, event)
    }
}

// ── Simulation Context ───────────────────────────────────────────────

/// What a handler can see and do during one dispatch.
///
/// Borrows the run's FEL and id counter, so a handler can only schedule
/// relative to the current clock.
pub struct SimulationContext<'a> {
    fel: &'a mut FutureEventList,
    ids: &'a mut EventIdGen,
    now: SimTime,
    elapsed: f64,
}

impl<'a> SimulationContext<'a> {
    /// Current clock value (the dispatched event's time).
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Time since the previously dispatched event.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Schedule a new, untagged event `delay` after now.
    pub fn schedule_after(&mut self, delay: f64, kind: EventKind) -> DesResult<EventId> {
        let at = self.at(delay)?;
        let id = self.ids.next_id();
        self.fel.insert_with_priority(Event::new(at, kind).with_id(id));
        Ok(id)
    }

    /// Schedule a new event for an entity class, `delay` after now.
    pub fn schedule_tagged(&mut self, delay: f64, kind: EventKind, tag: &str) -> DesResult<EventId> {
        let at = self.at(delay)?;
        let id = self.ids.next_id();
        self.fel
            .insert_with_priority(Event::new(at, kind).with_id(id).with_tag(tag));
        Ok(id)
    }

    /// Schedule the event that completes `cause` (typically the departure
    /// of an arrival). Keeps the cause's id and records its time; the tag
    /// is inherited unless `tag` overrides it.
    pub fn schedule_caused_by(
        &mut self,
        delay: f64,
        kind: EventKind,
        tag: Option<&str>,
        cause: &Event,
    ) -> DesResult<()> {
        let at = self.at(delay)?;
        let mut event = Event::new(at, kind).caused_by(cause.time());
        if let Some(id) = cause.id() {
            event = event.with_id(id);
        }
        if let Some(tag) = tag.or(cause.tag()) {
            event = event.with_tag(tag);
        }
        self.fel.insert_with_priority(event);
        Ok(())
    }

    /// Insert a fully built event. It must not lie in the past.
    pub fn schedule_event(&mut self, event: Event) -> DesResult<()> {
        if !event.time().value().is_finite() || event.time().is_before(self.now) {
            return Err(DesError::InvalidDuration(
                event.time().value() - self.now.value(),
            ));
        }
        self.fel.insert_with_priority(event);
        Ok(())
    }

    /// Cancel a pending event matching `probe` on `(time, kind)`.
    pub fn delete(&mut self, probe: &Event) -> Option<Event> {
        self.fel.delete(probe)
    }

    /// Earliest pending event.
    pub fn peek(&self) -> Option<&Event> {
        self.fel.peek()
    }

    /// Number of pending events.
    pub fn pending_count(&self) -> usize {
        self.fel.length()
    }

    /// Mint an id without scheduling anything.
    pub fn next_id(&mut self) -> EventId {
        self.ids.next_id()
    }

    fn at(&self, delay: f64) -> DesResult<SimTime> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(DesError::InvalidDuration(delay));
        }
        Ok(self.now.plus(delay))
    }
}

// ── Run state ─────────────────────────────────────────────────────────

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Initial events are being inserted.
    Seeding,
    /// The dispatch loop is active.
    Running,
    /// The loop has halted; no further FEL operations happen.
    Terminated,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// An `End` event was popped.
    EndEvent,
    /// The handler's stop predicate fired.
    Predicate,
}

/// Outcome of a single [`Simulation::step`].
#[derive(Debug, Clone)]
pub enum Step {
    /// The event was handed to the handler.
    Dispatched(Event),
    /// The `End` sentinel was popped; the run is over.
    Ended(Event),
    /// The stop predicate fired before popping; the run is over.
    Stopped,
}

/// Summary returned by [`Simulation::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Clock value at termination.
    pub end_time: SimTime,
    /// Events handed to the handler.
    pub dispatched: u64,
    /// Events left in the FEL.
    pub remaining: usize,
    pub terminated_by: Termination,
}

// ── Simulation ────────────────────────────────────────────────────────

/// One simulation run: FEL, id counter, clock and lifecycle.
#[derive(Debug)]
pub struct Simulation {
    fel: FutureEventList,
    ids: EventIdGen,
    state: RunState,
    now: SimTime,
    previous: Option<Event>,
    dispatched: u64,
    log: Option<DispatchLog>,
}

impl Simulation {
    /// A run on the default heap backend, clock at zero.
    pub fn new() -> Self {
        Self::with_backend(HeapBackend::default())
    }

    pub fn with_backend(backend: HeapBackend) -> Self {
        Simulation {
            fel: FutureEventList::with_backend(backend),
            ids: EventIdGen::new(),
            state: RunState::Seeding,
            now: SimTime::ZERO,
            previous: None,
            dispatched: 0,
            log: None,
        }
    }

    /// Record every dispatch into a [`DispatchLog`].
    pub fn enable_logging(&mut self) {
        self.log = Some(DispatchLog::new());
    }

    pub fn dispatch_log(&self) -> Option<&DispatchLog> {
        self.log.as_ref()
    }

    pub fn take_dispatch_log(&mut self) -> Option<DispatchLog> {
        self.log.take()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn current_time(&self) -> SimTime {
        self.now
    }

    /// The most recently dispatched event.
    pub fn previous(&self) -> Option<&Event> {
        self.previous.as_ref()
    }

    pub fn events_dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Read access to the pending events, e.g. after termination.
    pub fn fel(&self) -> &FutureEventList {
        &self.fel
    }

    /// Id the next scheduled event will receive.
    pub fn next_event_id(&self) -> EventId {
        self.ids.peek()
    }

    // ── Seeding ───────────────────────────────────────────────

    /// Seed an event at an absolute time.
    pub fn schedule(&mut self, at: impl Into<SimTime>, kind: EventKind) -> DesResult<EventId> {
        let at = self.seed_time(at.into())?;
        let id = self.ids.next_id();
        self.fel.insert_with_priority(Event::new(at, kind).with_id(id));
        Ok(id)
    }

    /// Seed a tagged event at an absolute time.
    pub fn schedule_tagged(
        &mut self,
        at: impl Into<SimTime>,
        kind: EventKind,
        tag: &str,
    ) -> DesResult<EventId> {
        let at = self.seed_time(at.into())?;
        let id = self.ids.next_id();
        self.fel
            .insert_with_priority(Event::new(at, kind).with_id(id).with_tag(tag));
        Ok(id)
    }

    /// Seed the terminal sentinel at the time horizon.
    pub fn schedule_end(&mut self, at: impl Into<SimTime>) -> DesResult<()> {
        self.seed(Event::end(at))
    }

    /// Seed a pre-built event, minting an id if it has none.
    pub fn seed(&mut self, event: Event) -> DesResult<()> {
        self.seed_time(event.time())?;
        let event = match event.id() {
            Some(_) => event,
            None => event.with_id(self.ids.next_id()),
        };
        self.fel.insert_with_priority(event);
        Ok(())
    }

    /// Prepare for a new trial: empty FEL, ids rewound, clock at zero.
    pub fn reset(&mut self) {
        self.fel.clear();
        self.ids.reset();
        self.state = RunState::Seeding;
        self.now = SimTime::ZERO;
        self.previous = None;
        self.dispatched = 0;
        if let Some(log) = &mut self.log {
            log.clear();
        }
    }

    fn seed_time(&self, at: SimTime) -> DesResult<SimTime> {
        if self.state == RunState::Terminated {
            return Err(DesError::impossible(
                "cannot seed a terminated run without reset",
            ));
        }
        if !at.value().is_finite() || at.is_before(self.now) {
            return Err(DesError::InvalidDuration(at.value() - self.now.value()));
        }
        Ok(at)
    }

    // ── Running ───────────────────────────────────────────────

    /// Execute one loop iteration.
    pub fn step(&mut self, handler: &mut dyn EventHandler) -> DesResult<Step> {
        match self.state {
            RunState::Terminated => {
                return Err(DesError::impossible("step called on a terminated run"))
            }
            RunState::Seeding => {
                debug!(pending = self.fel.length(), backend = %self.fel.backend(), "run started");
                self.state = RunState::Running;
            }
            RunState::Running => {}
        }

        if handler.should_stop() {
            self.state = RunState::Terminated;
            return Ok(Step::Stopped);
        }

        let event = match self.fel.get_next() {
            Some(event) => event,
            None => {
                self.state = RunState::Terminated;
                return Err(DesError::ImpossibleState(format!(
                    "future event list empty at {} while running",
                    self.now
                )));
            }
        };

        if !(event.time() >= self.now) {
            self.state = RunState::Terminated;
            return Err(DesError::ImpossibleState(format!(
                "event {} is behind the clock ({})",
                event, self.now
            )));
        }

        let elapsed = event.time().value() - self.now.value();
        self.now = event.time();

        if event.kind().is_end() {
            self.state = RunState::Terminated;
            return Ok(Step::Ended(event));
        }

        self.dispatched += 1;
        trace!(event = %event, elapsed, "dispatch");
        if let Some(log) = &mut self.log {
            log.record(&event, elapsed);
        }

        let mut ctx = SimulationContext {
            fel: &mut self.fel,
            ids: &mut self.ids,
            now: self.now,
            elapsed,
        };
        if let Err(err) = handler.handle(&mut ctx, &event) {
            self.state = RunState::Terminated;
            return Err(err);
        }

        self.previous = Some(event.clone());
        Ok(Step::Dispatched(event))
    }

    /// Run until the `End` event or the stop predicate.
    pub fn run(&mut self, handler: &mut dyn EventHandler) -> DesResult<RunSummary> {
        let terminated_by = loop {
            match self.step(handler)? {
                Step::Dispatched(_) => continue,
                Step::Ended(_) => break Termination::EndEvent,
                Step::Stopped => break Termination::Predicate,
            }
        };
        let summary = RunSummary {
            end_time: self.now,
            dispatched: self.dispatched,
            remaining: self.fel.length(),
            terminated_by,
        };
        debug!(
            end = %summary.end_time,
            dispatched = summary.dispatched,
            remaining = summary.remaining,
            by = ?summary.terminated_by,
            "run terminated"
        );
        Ok(summary)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn noop(_ctx: &mut SimulationContext<'_>, _event: &Event) -> DesResult<()> {
        Ok(())
    }

    #[test]
    fn test_basic_execution_loop() {
        let mut sim = Simulation::new();
        sim.schedule(10.0, EventKind::Arrival).unwrap();
        sim.schedule(20.0, EventKind::Departure).unwrap();
        sim.schedule_end(30.0).unwrap();

        let mut seen = Vec::new();
        let summary = sim
            .run(&mut |ctx: &mut SimulationContext<'_>, event: &Event| -> DesResult<()> {
                seen.push((ctx.now().value(), event.kind().clone()));
                Ok(())
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![(10.0, EventKind::Arrival), (20.0, EventKind::Departure)]
        );
        assert_eq!(summary.terminated_by, Termination::EndEvent);
        assert_eq!(summary.end_time, SimTime::new(30.0));
        assert_eq!(summary.dispatched, 2);
        assert_eq!(sim.state(), RunState::Terminated);
    }

    #[test]
    fn test_elapsed_is_time_since_previous_dispatch() {
        let mut sim = Simulation::new();
        sim.schedule(2.0, EventKind::Arrival).unwrap();
        sim.schedule(5.0, EventKind::Arrival).unwrap();
        sim.schedule(5.0, EventKind::Departure).unwrap();
        sim.schedule_end(9.0).unwrap();

        let mut deltas = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext<'_>, _event: &Event| -> DesResult<()> {
            deltas.push(ctx.elapsed());
            Ok(())
        })
        .unwrap();
        assert_eq!(deltas, vec![2.0, 3.0, 0.0]);
        assert_eq!(sim.previous(), Some(&Event::departure(5.0)));
    }

    #[test]
    fn test_handler_schedules_followups() {
        let mut sim = Simulation::new();
        sim.schedule(0.0, EventKind::Arrival).unwrap();
        sim.schedule_end(35.0).unwrap();

        let mut times = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext<'_>, _event: &Event| -> DesResult<()> {
            times.push(ctx.now().value());
            ctx.schedule_after(10.0, EventKind::Arrival)?;
            Ok(())
        })
        .unwrap();
        assert_eq!(times, vec![0.0, 10.0, 20.0, 30.0]);
        // The arrival scheduled at 40 is still pending.
        assert_eq!(sim.fel().length(), 1);
        assert_eq!(sim.fel().peek(), Some(&Event::arrival(40.0)));
    }

    #[test]
    fn test_empty_fel_while_running_is_impossible() {
        let mut sim = Simulation::new();
        sim.schedule(1.0, EventKind::Arrival).unwrap();
        let err = sim.run(&mut noop).unwrap_err();
        assert!(matches!(err, DesError::ImpossibleState(_)));
        assert_eq!(sim.state(), RunState::Terminated);
    }

    #[test]
    fn test_step_after_termination_fails() {
        let mut sim = Simulation::new();
        sim.schedule_end(1.0).unwrap();
        assert!(matches!(sim.step(&mut noop).unwrap(), Step::Ended(_)));
        assert!(sim.step(&mut noop).is_err());
        assert!(sim.schedule(2.0, EventKind::Arrival).is_err());
    }

    #[test]
    fn test_handler_error_aborts() {
        let mut sim = Simulation::new();
        sim.schedule(1.0, EventKind::custom("EW")).unwrap();
        sim.schedule(2.0, EventKind::Arrival).unwrap();
        sim.schedule_end(3.0).unwrap();

        let err = sim
            .run(&mut |_ctx: &mut SimulationContext<'_>, event: &Event| -> DesResult<()> {
                match event.kind() {
                    EventKind::Arrival => Ok(()),
                    other => Err(DesError::UnhandledEvent {
                        kind: other.clone(),
                        tag: event.tag().map(str::to_owned),
                    }),
                }
            })
            .unwrap_err();
        assert!(matches!(err, DesError::UnhandledEvent { .. }));
        assert_eq!(sim.fel().length(), 2);
    }

    #[test]
    fn test_negative_delay_rejected() {
        let mut sim = Simulation::new();
        sim.schedule(1.0, EventKind::Arrival).unwrap();
        let err = sim
            .run(&mut |ctx: &mut SimulationContext<'_>, _event: &Event| -> DesResult<()> {
                ctx.schedule_after(-0.5, EventKind::Departure)?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, DesError::InvalidDuration(d) if d == -0.5));
    }

    #[test]
    fn test_schedule_caused_by_carries_cause() {
        let mut sim = Simulation::new();
        let arrival_id = sim.schedule_tagged(4.0, EventKind::Arrival, "economy").unwrap();
        sim.schedule_end(100.0).unwrap();
        sim.enable_logging();

        sim.run(&mut |ctx: &mut SimulationContext<'_>, event: &Event| -> DesResult<()> {
            if *event.kind() == EventKind::Arrival {
                ctx.schedule_caused_by(2.5, EventKind::Departure, None, event)?;
            }
            Ok(())
        })
        .unwrap();

        let log = sim.dispatch_log().unwrap();
        let departure = &log.records()[1].event;
        assert_eq!(departure.id(), Some(arrival_id));
        assert_eq!(departure.tag(), Some("economy"));
        assert_eq!(departure.caused_by_time(), Some(SimTime::new(4.0)));
        assert_eq!(departure.time(), SimTime::new(6.5));
    }

    #[test]
    fn test_handler_can_cancel_pending_event() {
        let mut sim = Simulation::new();
        sim.schedule(1.0, EventKind::Arrival).unwrap();
        sim.schedule(5.0, EventKind::Departure).unwrap();
        sim.schedule_end(10.0).unwrap();

        let mut kinds = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext<'_>, event: &Event| -> DesResult<()> {
            kinds.push(event.kind().clone());
            if *event.kind() == EventKind::Arrival {
                assert!(ctx.delete(&Event::departure(5.0)).is_some());
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(kinds, vec![EventKind::Arrival]);
    }

    #[test]
    fn test_seeding_rejects_non_finite_and_past_times() {
        let mut sim = Simulation::new();
        assert!(matches!(
            sim.schedule(f64::NAN, EventKind::Arrival),
            Err(DesError::InvalidDuration(_))
        ));
        assert!(sim.schedule_end(-1.0).is_err());
        assert_eq!(sim.fel().length(), 0);
        assert_eq!(sim.next_event_id(), EventId::new(0));
    }

    #[test]
    fn test_reset_rewinds_ids_and_clock() {
        let mut sim = Simulation::new();
        let first = sim.schedule(1.0, EventKind::Arrival).unwrap();
        sim.schedule_end(2.0).unwrap();
        sim.run(&mut noop).unwrap();

        sim.reset();
        assert_eq!(sim.state(), RunState::Seeding);
        assert_eq!(sim.current_time(), SimTime::ZERO);
        assert_eq!(sim.fel().length(), 0);
        assert_eq!(sim.events_dispatched(), 0);
        assert_eq!(sim.schedule(1.0, EventKind::Arrival).unwrap(), first);
    }

    #[test]
    fn test_stop_predicate_checked_before_pop() {
        struct Budget {
            left: u32,
        }
        impl EventHandler for Budget {
            fn handle(&mut self, ctx: &mut SimulationContext<'_>, _event: &Event) -> DesResult<()> {
                self.left -= 1;
                ctx.schedule_after(1.0, EventKind::Arrival)?;
                Ok(())
            }
            fn should_stop(&self) -> bool {
                self.left == 0
            }
        }

        let mut sim = Simulation::new();
        sim.schedule(0.0, EventKind::Arrival).unwrap();
        let summary = sim.run(&mut Budget { left: 3 }).unwrap();
        assert_eq!(summary.terminated_by, Termination::Predicate);
        assert_eq!(summary.dispatched, 3);
        assert_eq!(summary.remaining, 1);
        assert_eq!(summary.end_time, SimTime::new(2.0));
    }

    #[test]
    fn test_deterministic_replay() {
        fn run_trace() -> u64 {
            let mut sim = Simulation::new();
            sim.enable_logging();
            sim.schedule_tagged(5.0, EventKind::Arrival, "alpha").unwrap();
            sim.schedule_tagged(5.0, EventKind::Arrival, "beta").unwrap();
            sim.schedule_tagged(3.0, EventKind::Departure, "gamma").unwrap();
            sim.schedule_end(50.0).unwrap();
            sim.run(&mut |ctx: &mut SimulationContext<'_>, event: &Event| -> DesResult<()> {
                if *event.kind() == EventKind::Arrival && ctx.now().value() < 30.0 {
                    ctx.schedule_tagged(7.0, EventKind::Arrival, event.tag().unwrap_or("-"))?;
                }
                Ok(())
            })
            .unwrap();
            sim.dispatch_log().unwrap().fingerprint()
        }
        assert_eq!(run_trace(), run_trace());
    }

    #[test]
    #[traced_test]
    fn test_run_emits_lifecycle_logs() {
        let mut sim = Simulation::new();
        sim.schedule(1.0, EventKind::Arrival).unwrap();
        sim.schedule_end(2.0).unwrap();
        sim.run(&mut noop).unwrap();
        assert!(logs_contain("run started"));
        assert!(logs_contain("run terminated"));
    }
}
