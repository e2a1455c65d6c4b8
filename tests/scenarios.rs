//! End-to-end scenarios over the public API, run on both heap backends.

use chronoq::{
    DesResult, Event, EventHandler, EventKind, FutureEventList, HeapBackend, RunState, SimTime,
    Simulation, SimulationContext, Termination, VariateStream,
};

const BACKENDS: [HeapBackend; 2] = [HeapBackend::Array, HeapBackend::Binary];

#[test]
fn scenario_delete_then_drain() {
    for backend in BACKENDS {
        let mut fel = FutureEventList::with_backend(backend);
        fel.insert_with_priority(Event::departure(10.0));
        fel.insert_with_priority(Event::arrival(20.0));
        fel.insert_with_priority(Event::departure(30.0));
        fel.insert_with_priority(Event::arrival(40.0));
        fel.insert_with_priority(Event::arrival(30.0));
        fel.insert_with_priority(Event::arrival(20.0));

        assert!(fel.delete(&Event::departure(10.0)).is_some());
        assert!(fel.delete(&Event::departure(30.0)).is_some());
        assert!(fel.delete(&Event::arrival(20.0)).is_some());
        assert!(fel.delete(&Event::departure(40.0)).is_none());
        assert_eq!(fel.length(), 3);

        let drained: Vec<Event> = std::iter::from_fn(|| fel.get_next()).collect();
        assert_eq!(
            drained,
            vec![Event::arrival(20.0), Event::arrival(30.0), Event::arrival(40.0)],
            "backend {}",
            backend
        );
    }
}

#[test]
fn scenario_time_bounded_run_ends_on_end_event() {
    for backend in BACKENDS {
        let mut stream = VariateStream::new(2024);
        let mut sim = Simulation::with_backend(backend);
        sim.schedule_tagged(0.0, EventKind::Arrival, "first").unwrap();
        sim.schedule_tagged(0.0, EventKind::Arrival, "economy").unwrap();
        sim.schedule_end(120.0).unwrap();

        let mut last_dispatch = SimTime::ZERO;
        let summary = sim
            .run(&mut |ctx: &mut SimulationContext<'_>, event: &Event| -> DesResult<()> {
                assert!(ctx.now().value() <= 120.0);
                last_dispatch = ctx.now();
                let gap = stream.exponential(2.0)?;
                ctx.schedule_tagged(gap, EventKind::Arrival, event.tag().unwrap_or("-"))?;
                Ok(())
            })
            .unwrap();

        assert_eq!(summary.terminated_by, Termination::EndEvent);
        assert_eq!(summary.end_time, SimTime::new(120.0));
        assert_eq!(sim.current_time(), SimTime::new(120.0));
        assert_eq!(sim.state(), RunState::Terminated);
        assert!(last_dispatch.value() < 120.0);
        // Each class still has exactly one arrival pending past the horizon.
        assert_eq!(summary.remaining, 2);
        assert!(sim.fel().dump().iter().all(|e| e.time().value() >= 120.0));
    }
}

struct CountBounded {
    stream: VariateStream,
    limit: u64,
    arrivals: u64,
    departures: u64,
}

impl EventHandler for CountBounded {
    fn handle(&mut self, ctx: &mut SimulationContext<'_>, event: &Event) -> DesResult<()> {
        match event.kind() {
            EventKind::Arrival => {
                self.arrivals += 1;
                let gap = self.stream.exponential(1.0)?;
                ctx.schedule_after(gap, EventKind::Arrival)?;
                let service = self.stream.exponential(0.8)?;
                ctx.schedule_caused_by(service, EventKind::Departure, None, event)?;
            }
            EventKind::Departure => self.departures += 1,
            _ => unreachable!("only arrivals and departures are scheduled"),
        }
        Ok(())
    }

    fn should_stop(&self) -> bool {
        self.departures >= self.limit
    }
}

#[test]
fn scenario_count_bounded_run_stops_cleanly() {
    for backend in BACKENDS {
        let mut sim = Simulation::with_backend(backend);
        sim.enable_logging();
        sim.schedule(0.0, EventKind::Arrival).unwrap();

        let mut model = CountBounded {
            stream: VariateStream::new(77),
            limit: 1000,
            arrivals: 0,
            departures: 0,
        };
        let summary = sim.run(&mut model).unwrap();

        assert_eq!(summary.terminated_by, Termination::Predicate);
        assert_eq!(model.departures, 1000);

        let log = sim.dispatch_log().unwrap();
        // The 1000th departure was the last thing dispatched.
        assert_eq!(
            log.records().last().map(|r| r.event.kind().clone()),
            Some(EventKind::Departure)
        );
        assert_eq!(log.len() as u64, model.arrivals + model.departures);

        // One seed plus two inserts per arrival, minus one pop per dispatch:
        // nothing was popped or inserted after the stop.
        let inserted = 1 + 2 * model.arrivals;
        assert_eq!(summary.remaining as u64, inserted - summary.dispatched);
        assert_eq!(sim.fel().length(), summary.remaining);

        // A terminated run refuses further work.
        assert!(sim.step(&mut model).is_err());
        assert_eq!(sim.fel().length(), summary.remaining);
    }
}

#[test]
fn scenario_replay_is_deterministic_across_backends() {
    fn fingerprint(backend: HeapBackend) -> u64 {
        let mut sim = Simulation::with_backend(backend);
        sim.enable_logging();
        sim.schedule(0.0, EventKind::Arrival).unwrap();
        let mut model = CountBounded {
            stream: VariateStream::new(5),
            limit: 200,
            arrivals: 0,
            departures: 0,
        };
        sim.run(&mut model).unwrap();
        sim.dispatch_log().unwrap().fingerprint()
    }
    assert_eq!(fingerprint(HeapBackend::Array), fingerprint(HeapBackend::Array));
    // Continuous sampled times never tie, so both backends agree.
    assert_eq!(fingerprint(HeapBackend::Array), fingerprint(HeapBackend::Binary));
}
