//! Single-queue, single-server grocery checkout.
//!
//! Customers arrive with exponential interarrival times and are served
//! FIFO with a truncated-normal service time. The run is count-bounded:
//! it stops as soon as `customer_limit` customers have departed.

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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroceryParams {
    pub interarrival_mean: f64,
    pub service_mean: f64,
    pub service_std: f64,
    /// Responses at or above this many minutes count as long.
    pub long_response_threshold: f64,
    pub customer_limit: u64,
}

impl Default for GroceryParams {
    fn default() -> Self {
        GroceryParams {
            interarrival_mean: 4.5,
            service_mean: 3.2,
            service_std: 0.6,
            long_response_threshold: 4.0,
            customer_limit: 1000,
        }
    }
}

impl GroceryParams {
    pub fn validate(&self) -> DesResult<()> {
        require_positive("grocery.interarrival_mean", self.interarrival_mean)?;
        require_positive("grocery.service_mean", self.service_mean)?;
        require_nonnegative("grocery.service_std", self.service_std)?;
        require_nonnegative("grocery.long_response_threshold", self.long_response_threshold)?;
        if self.customer_limit == 0 {
            return Err(DesError::Config("grocery.customer_limit must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroceryStats {
    pub server_utilization: f64,
    pub max_queue_length: usize,
    pub mean_response_time: f64,
    pub long_response_ratio: f64,
    pub run_duration: f64,
    pub arrivals: u64,
    pub departures: u64,
    pub mean_interarrival_time: f64,
    pub mean_service_time: f64,
}

/// Handler state for one grocery run.
pub struct GroceryCheckout<'a> {
    params: &'a GroceryParams,
    stream: &'a mut VariateStream,
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

impl<'a> GroceryCheckout<'a> {
    pub fn new(params: &'a GroceryParams, stream: &'a mut VariateStream) -> Self {
        GroceryCheckout {
            params,
            stream,
            server: ServerStatus::Idle,
            queue: VecDeque::new(),
            max_queue: 0,
            arrivals: 0,
            departures: 0,
            busy_time: 0.0,
            response_time: 0.0,
            long_responses: 0,
            interarrival_time: 0.0,
            service_time: 0.0,
            services_started: 0,
        }
    }

    pub fn queue_length(&self) -> usize {
        self.queue.len()
    }

    pub fn departures(&self) -> u64 {
        self.departures
    }

    fn start_service(&mut self, ctx: &mut SimulationContext<'_>, arrival: &Event) -> DesResult<()> {
        let service = self.stream.truncated_normal(
            self.params.service_mean,
            self.params.service_std,
            0.0,
            f64::INFINITY,
        )?;
        ctx.schedule_caused_by(service, EventKind::Departure, None, arrival)?;
        self.server = ServerStatus::Busy;
        self.service_time += service;
        self.services_started += 1;
        Ok(())
    }

    fn on_arrival(&mut self, ctx: &mut SimulationContext<'_>, event: &Event) -> DesResult<()> {
        if self.server.is_busy() {
            self.queue.push_back(event.clone());
            self.max_queue = self.max_queue.max(self.queue.len());
        } else {
            self.start_service(ctx, event)?;
        }

        let gap = self.stream.exponential(self.params.interarrival_mean)?;
        ctx.schedule_after(gap, EventKind::Arrival)?;
        self.interarrival_time += gap;
        self.arrivals += 1;
        Ok(())
    }

    fn on_departure(&mut self, ctx: &mut SimulationContext<'_>, event: &Event) -> DesResult<()> {
        let arrived = event.caused_by_time().ok_or_else(|| {
            DesError::impossible(format!("departure {} has no arrival time", event))
        })?;
        let response = ctx.now().value() - arrived.value();
        if response >= self.params.long_response_threshold {
            self.long_responses += 1;
        }
        self.response_time += response;
        self.departures += 1;

        match self.queue.pop_front() {
            Some(next) => self.start_service(ctx, &next)?,
            None => self.server = ServerStatus::Idle,
        }
        trace!(queue = self.queue.len(), departures = self.departures, "grocery departure");
        Ok(())
    }

    /// Condense the run into stats; `end` is the clock at termination.
    pub fn stats(&self, end: SimTime) -> GroceryStats {
        let departures = self.departures as f64;
        GroceryStats {
            server_utilization: ratio(self.busy_time, end.value()),
            max_queue_length: self.max_queue,
            mean_response_time: ratio(self.response_time, departures),
            long_response_ratio: ratio(self.long_responses as f64, departures),
            run_duration: end.value(),
            arrivals: self.arrivals,
            departures: self.departures,
            mean_interarrival_time: ratio(self.interarrival_time, self.arrivals as f64),
            mean_service_time: ratio(self.service_time, self.services_started as f64),
        }
    }
}

impl EventHandler for GroceryCheckout<'_> {
    fn handle(&mut self, ctx: &mut SimulationContext<'_>, event: &Event) -> DesResult<()> {
        if self.server.is_busy() {
            self.busy_time += ctx.elapsed();
        }
        match event.kind() {
            EventKind::Arrival => self.on_arrival(ctx, event),
            EventKind::Departure => self.on_departure(ctx, event),
            _ => Err(unhandled(event)),
        }
    }

    fn should_stop(&self) -> bool {
        self.departures >= self.params.customer_limit
    }
}

/// Run one grocery trial to the departure limit.
pub fn run_trial(
    params: &GroceryParams,
    stream: &mut VariateStream,
    backend: HeapBackend,
) -> DesResult<GroceryStats> {
    params.validate()?;
    let mut sim = Simulation::with_backend(backend);
    sim.schedule(0.0, EventKind::Arrival)?;

    let mut model = GroceryCheckout::new(params, stream);
    let summary = sim.run(&mut model)?;
    Ok(model.stats(summary.end_time))
}
