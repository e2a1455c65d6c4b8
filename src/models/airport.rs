//! Two-class airport check-in.
//!
//! First-class and economy passengers each have their own queue and
//! server. With transfers allowed, a first-class server that runs out of
//! first-class passengers takes the head of the economy queue while the
//! economy server is busy. The run is bounded by an `End` event.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{DesError, DesResult};
use crate::event::{Event, EventKind};
use crate::heap::HeapBackend;
use crate::simulation::{EventHandler, Simulation, SimulationContext};
use crate::time::SimTime;
use crate::variates::VariateStream;

use super::{ratio, require_nonnegative, require_positive, unhandled, ServerStatus};

/// Passenger class, carried as the event tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    First,
    Economy,
}

impl Class {
    pub const ALL: [Class; 2] = [Class::First, Class::Economy];

    pub fn tag(self) -> &'static str {
        match self {
            Class::First => "first",
            Class::Economy => "economy",
        }
    }

    fn from_tag(tag: &str) -> Option<Class> {
        match tag {
            "first" => Some(Class::First),
            "economy" => Some(Class::Economy),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            Class::First => 0,
            Class::Economy => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassParams {
    pub interarrival_mean: f64,
    pub service_mean: f64,
    pub service_std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirportParams {
    pub first: ClassParams,
    pub economy: ClassParams,
    pub long_response_threshold: f64,
    pub end_time: f64,
    pub allow_transfers: bool,
}

impl Default for AirportParams {
    fn default() -> Self {
        AirportParams {
            first: ClassParams {
                interarrival_mean: 2.0,
                service_mean: 2.0,
                service_std: 0.5,
            },
            economy: ClassParams {
                interarrival_mean: 1.0,
                service_mean: 1.0,
                service_std: 0.25,
            },
            long_response_threshold: 4.0,
            end_time: 120.0,
            allow_transfers: true,
        }
    }
}

impl AirportParams {
    pub fn class(&self, class: Class) -> &ClassParams {
        match class {
            Class::First => &self.first,
            Class::Economy => &self.economy,
        }
    }

    pub fn validate(&self) -> DesResult<()> {
        for class in Class::ALL {
            let p = self.class(class);
            let name = class.tag();
            require_positive(&format!("airport.{}.interarrival_mean", name), p.interarrival_mean)?;
            require_positive(&format!("airport.{}.service_mean", name), p.service_mean)?;
            require_nonnegative(&format!("airport.{}.service_std", name), p.service_std)?;
        }
        require_nonnegative("airport.long_response_threshold", self.long_response_threshold)?;
        require_positive("airport.end_time", self.end_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStats {
    pub arrivals: u64,
    pub mean_interarrival_time: f64,
    pub max_queue_length: usize,
    pub queue_length_at_end: usize,
    pub server_utilization: f64,
    pub departures: u64,
    pub mean_response_time: f64,
    pub long_response_ratio: f64,
    pub mean_service_time: f64,
    pub status_at_end: ServerStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportStats {
    pub first: ClassStats,
    pub economy: ClassStats,
    /// Economy passengers served by the first-class server.
    pub transfers: u64,
    pub total_arrivals: u64,
    pub total_departures: u64,
    pub in_system_at_end: u64,
    pub mean_response_time: f64,
}

#[derive(Debug, Default)]
struct Desk {
    server: ServerStatus,
    queue: VecDeque<Event>,
    max_queue: usize,
    arrivals: u64,
    departures: u64,
    busy_time: f64,
    response_time: f64,
    long_responses: u64,
    interarrival_time: f64,
    service_time: f64,
    services_started: u64,
}

/// Handler state for one airport run.
pub struct AirportCheckIn<'a> {
    params: &'a AirportParams,
    stream: &'a mut VariateStream,
    desks: [Desk; 2],
    transfers: u64,
}

impl<'a> AirportCheckIn<'a> {
    pub fn new(params: &'a AirportParams, stream: &'a mut VariateStream) -> Self {
        AirportCheckIn {
            params,
            stream,
            desks: [Desk::default(), Desk::default()],
            transfers: 0,
        }
    }

    pub fn transfers(&self) -> u64 {
        self.transfers
    }

    fn desk(&mut self, class: Class) -> &mut Desk {
        &mut self.desks[class.index()]
    }

    /// Put `server`'s desk to work on `arrival`, whatever its class.
    fn start_service(
        &mut self,
        ctx: &mut SimulationContext<'_>,
        server: Class,
        arrival: &Event,
    ) -> DesResult<()> {
        let p = self.params.class(server);
        let service = self
            .stream
            .truncated_normal(p.service_mean, p.service_std, 0.0, f64::INFINITY)?;
        ctx.schedule_caused_by(service, EventKind::Departure, Some(server.tag()), arrival)?;
        let desk = self.desk(server);
        desk.server = ServerStatus::Busy;
        desk.service_time += service;
        desk.services_started += 1;
        Ok(())
    }

    fn on_arrival(
        &mut self,
        ctx: &mut SimulationContext<'_>,
        class: Class,
        event: &Event,
    ) -> DesResult<()> {
        if self.desk(class).server.is_busy() {
            let desk = self.desk(class);
            desk.queue.push_back(event.clone());
            desk.max_queue = desk.max_queue.max(desk.queue.len());
        } else {
            self.start_service(ctx, class, event)?;
        }

        let gap = self
            .stream
            .exponential(self.params.class(class).interarrival_mean)?;
        ctx.schedule_tagged(gap, EventKind::Arrival, class.tag())?;
        let desk = self.desk(class);
        desk.interarrival_time += gap;
        desk.arrivals += 1;
        Ok(())
    }

    fn on_departure(
        &mut self,
        ctx: &mut SimulationContext<'_>,
        server: Class,
        event: &Event,
    ) -> DesResult<()> {
        let arrived = event.caused_by_time().ok_or_else(|| {
            DesError::impossible(format!("departure {} has no arrival time", event))
        })?;
        let response = ctx.now().value() - arrived.value();
        let threshold = self.params.long_response_threshold;
        let desk = self.desk(server);
        if response >= threshold {
            desk.long_responses += 1;
        }
        desk.response_time += response;
        desk.departures += 1;

        if let Some(next) = self.desk(server).queue.pop_front() {
            return self.start_service(ctx, server, &next);
        }

        let economy = &mut self.desks[Class::Economy.index()];
        let transfer = self.params.allow_transfers
            && server == Class::First
            && economy.server.is_busy()
            && !economy.queue.is_empty();
        let waiting = if transfer { economy.queue.pop_front() } else { None };
        match waiting {
            Some(passenger) => {
                self.transfers += 1;
                trace!(passenger = %passenger, "economy passenger transferred to first class");
                self.start_service(ctx, Class::First, &passenger)
            }
            None => {
                self.desk(server).server = ServerStatus::Idle;
                Ok(())
            }
        }
    }

    /// Charge busy time from the last dispatch up to the end of the run.
    pub fn close(&mut self, last_dispatch: SimTime, end: SimTime) {
        let tail = end.duration_since(last_dispatch).unwrap_or(0.0);
        for desk in &mut self.desks {
            if desk.server.is_busy() {
                desk.busy_time += tail;
            }
        }
    }

    pub fn stats(&self, end: SimTime) -> AirportStats {
        let class_stats = |desk: &Desk| ClassStats {
            arrivals: desk.arrivals,
            mean_interarrival_time: ratio(desk.interarrival_time, desk.arrivals as f64),
            max_queue_length: desk.max_queue,
            queue_length_at_end: desk.queue.len(),
            server_utilization: ratio(desk.busy_time, end.value()),
            departures: desk.departures,
            mean_response_time: ratio(desk.response_time, desk.departures as f64),
            long_response_ratio: ratio(desk.long_responses as f64, desk.departures as f64),
            mean_service_time: ratio(desk.service_time, desk.services_started as f64),
            status_at_end: desk.server,
        };
        let total_arrivals: u64 = self.desks.iter().map(|d| d.arrivals).sum();
        let total_departures: u64 = self.desks.iter().map(|d| d.departures).sum();
        let total_response: f64 = self.desks.iter().map(|d| d.response_time).sum();
        AirportStats {
            first: class_stats(&self.desks[Class::First.index()]),
            economy: class_stats(&self.desks[Class::Economy.index()]),
            transfers: self.transfers,
            total_arrivals,
            total_departures,
            in_system_at_end: total_arrivals - total_departures,
            mean_response_time: ratio(total_response, total_departures as f64),
        }
    }
}

impl EventHandler for AirportCheckIn<'_> {
    fn handle(&mut self, ctx: &mut SimulationContext<'_>, event: &Event) -> DesResult<()> {
        let elapsed = ctx.elapsed();
        for desk in &mut self.desks {
            if desk.server.is_busy() {
                desk.busy_time += elapsed;
            }
        }

        let class = event
            .tag()
            .and_then(Class::from_tag)
            .ok_or_else(|| unhandled(event))?;
        match event.kind() {
            EventKind::Arrival => self.on_arrival(ctx, class, event),
            EventKind::Departure => self.on_departure(ctx, class, event),
            _ => Err(unhandled(event)),
        }
    }
}

/// Run one airport trial up to `params.end_time`.
pub fn run_trial(
    params: &AirportParams,
    stream: &mut VariateStream,
    backend: HeapBackend,
) -> DesResult<AirportStats> {
    params.validate()?;
    let mut sim = Simulation::with_backend(backend);
    for class in Class::ALL {
        sim.schedule_tagged(0.0, EventKind::Arrival, class.tag())?;
    }
    sim.schedule_end(params.end_time)?;

    let mut model = AirportCheckIn::new(params, stream);
    let summary = sim.run(&mut model)?;
    let last = sim.previous().map_or(SimTime::ZERO, Event::time);
    model.close(last, summary.end_time);
    Ok(model.stats(summary.end_time))
}
