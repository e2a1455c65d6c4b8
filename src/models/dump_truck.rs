//! Dump truck operation.
//!
//! A fleet of trucks cycles through a loading queue served by several
//! loaders, a weighing queue served by a scale, and a travel leg. Loading,
//! weighing and travel times come from empirical tables. The run is
//! bounded by an `End` event.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{DesError, DesResult};
use crate::event::{Event, EventKind};
use crate::heap::HeapBackend;
use crate::simulation::{EventHandler, Simulation, SimulationContext};
use crate::time::SimTime;
use crate::variates::{Empirical, VariateStream};

use super::{ratio, require_positive, unhandled};

/// Truck arrives at the loading queue.
pub const ALQ: &str = "ALQ";
/// Truck finishes loading.
pub const EL: &str = "EL";
/// Truck finishes weighing.
pub const EW: &str = "EW";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableParams {
    pub values: Vec<f64>,
    pub probabilities: Vec<f64>,
}

impl TableParams {
    fn new(values: &[f64], probabilities: &[f64]) -> Self {
        TableParams {
            values: values.to_vec(),
            probabilities: probabilities.to_vec(),
        }
    }

    fn build(&self) -> DesResult<Empirical> {
        Empirical::new(&self.values, &self.probabilities)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpTruckParams {
    pub trucks: u32,
    pub loaders: u32,
    pub scales: u32,
    pub end_time: f64,
    pub loading: TableParams,
    pub weighing: TableParams,
    pub travel: TableParams,
}

impl Default for DumpTruckParams {
    fn default() -> Self {
        DumpTruckParams {
            trucks: 8,
            loaders: 2,
            scales: 1,
            end_time: 240.0,
            loading: TableParams::new(&[5.0, 10.0, 15.0], &[0.3, 0.5, 0.2]),
            weighing: TableParams::new(&[12.0, 16.0], &[0.7, 0.3]),
            travel: TableParams::new(&[40.0, 60.0, 80.0, 100.0], &[0.4, 0.3, 0.2, 0.1]),
        }
    }
}

impl DumpTruckParams {
    pub fn validate(&self) -> DesResult<()> {
        if self.trucks == 0 || self.loaders == 0 || self.scales == 0 {
            return Err(DesError::Config(
                "dump_truck needs at least one truck, loader and scale".into(),
            ));
        }
        require_positive("dump_truck.end_time", self.end_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DumpTruckStats {
    pub loader_utilization: f64,
    pub scale_utilization: f64,
    pub loads_completed: u64,
    pub weighings_completed: u64,
    pub max_loading_queue: usize,
    pub max_weighing_queue: usize,
    pub run_duration: f64,
}

/// Where the fleet is at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FleetState {
    pub loading_queue: usize,
    pub loading: u32,
    pub weighing_queue: usize,
    pub weighing: u32,
    pub traveling: u32,
}

/// Handler state for one dump truck run.
pub struct DumpTruckOperation<'a> {
    params: &'a DumpTruckParams,
    stream: &'a mut VariateStream,
    loading: Empirical,
    weighing: Empirical,
    travel: Empirical,
    loading_queue: VecDeque<Event>,
    weighing_queue: VecDeque<Event>,
    loaders_busy: u32,
    scales_busy: u32,
    loader_busy_time: f64,
    scale_busy_time: f64,
    loads_completed: u64,
    weighings_completed: u64,
    max_loading_queue: usize,
    max_weighing_queue: usize,
}

impl<'a> DumpTruckOperation<'a> {
    pub fn new(params: &'a DumpTruckParams, stream: &'a mut VariateStream) -> DesResult<Self> {
        Ok(DumpTruckOperation {
            loading: params.loading.build()?,
            weighing: params.weighing.build()?,
            travel: params.travel.build()?,
            params,
            stream,
            loading_queue: VecDeque::new(),
            weighing_queue: VecDeque::new(),
            loaders_busy: 0,
            scales_busy: 0,
            loader_busy_time: 0.0,
            scale_busy_time: 0.0,
            loads_completed: 0,
            weighings_completed: 0,
            max_loading_queue: 0,
            max_weighing_queue: 0,
        })
    }

    pub fn fleet(&self) -> FleetState {
        let queued = (self.loading_queue.len() + self.weighing_queue.len()) as u32;
        let working = self.loaders_busy + self.scales_busy;
        FleetState {
            loading_queue: self.loading_queue.len(),
            loading: self.loaders_busy,
            weighing_queue: self.weighing_queue.len(),
            weighing: self.scales_busy,
            traveling: self.params.trucks.saturating_sub(queued + working),
        }
    }

    fn begin_loading(&mut self, ctx: &mut SimulationContext<'_>, truck: &Event) -> DesResult<()> {
        let duration = self.stream.empirical(&self.loading);
        ctx.schedule_caused_by(duration, EventKind::custom(EL), None, truck)?;
        self.loaders_busy += 1;
        Ok(())
    }

    fn begin_weighing(&mut self, ctx: &mut SimulationContext<'_>, truck: &Event) -> DesResult<()> {
        let duration = self.stream.empirical(&self.weighing);
        ctx.schedule_caused_by(duration, EventKind::custom(EW), None, truck)?;
        self.scales_busy += 1;
        Ok(())
    }

    fn on_arrival_at_loader(&mut self, ctx: &mut SimulationContext<'_>, truck: &Event) -> DesResult<()> {
        if self.loaders_busy < self.params.loaders {
            self.begin_loading(ctx, truck)
        } else {
            self.loading_queue.push_back(truck.clone());
            self.max_loading_queue = self.max_loading_queue.max(self.loading_queue.len());
            Ok(())
        }
    }

    fn on_end_loading(&mut self, ctx: &mut SimulationContext<'_>, truck: &Event) -> DesResult<()> {
        self.loaders_busy = self
            .loaders_busy
            .checked_sub(1)
            .ok_or_else(|| DesError::impossible(format!("{} finished loading on an idle loader", truck)))?;
        self.loads_completed += 1;

        if self.scales_busy < self.params.scales {
            self.begin_weighing(ctx, truck)?;
        } else {
            self.weighing_queue.push_back(truck.clone());
            self.max_weighing_queue = self.max_weighing_queue.max(self.weighing_queue.len());
        }

        match self.loading_queue.pop_front() {
            Some(next) => self.begin_loading(ctx, &next),
            None => Ok(()),
        }
    }

    fn on_end_weighing(&mut self, ctx: &mut SimulationContext<'_>, truck: &Event) -> DesResult<()> {
        self.scales_busy = self
            .scales_busy
            .checked_sub(1)
            .ok_or_else(|| DesError::impossible(format!("{} finished weighing on an idle scale", truck)))?;
        self.weighings_completed += 1;

        let trip = self.stream.empirical(&self.travel);
        ctx.schedule_caused_by(trip, EventKind::custom(ALQ), None, truck)?;

        match self.weighing_queue.pop_front() {
            Some(next) => self.begin_weighing(ctx, &next),
            None => Ok(()),
        }
    }

    /// Charge busy time from the last dispatch up to the end of the run.
    pub fn close(&mut self, last_dispatch: SimTime, end: SimTime) {
        let tail = end.duration_since(last_dispatch).unwrap_or(0.0);
        self.loader_busy_time += tail * self.loaders_busy as f64;
        self.scale_busy_time += tail * self.scales_busy as f64;
    }

    pub fn stats(&self, end: SimTime) -> DumpTruckStats {
        let end = end.value();
        DumpTruckStats {
            loader_utilization: ratio(self.loader_busy_time, self.params.loaders as f64 * end),
            scale_utilization: ratio(self.scale_busy_time, self.params.scales as f64 * end),
            loads_completed: self.loads_completed,
            weighings_completed: self.weighings_completed,
            max_loading_queue: self.max_loading_queue,
            max_weighing_queue: self.max_weighing_queue,
            run_duration: end,
        }
    }
}

impl EventHandler for DumpTruckOperation<'_> {
    fn handle(&mut self, ctx: &mut SimulationContext<'_>, event: &Event) -> DesResult<()> {
        let elapsed = ctx.elapsed();
        self.loader_busy_time += elapsed * self.loaders_busy as f64;
        self.scale_busy_time += elapsed * self.scales_busy as f64;

        let name: &str = match event.kind() {
            EventKind::Custom(name) => name,
            _ => return Err(unhandled(event)),
        };
        match name {
            ALQ => self.on_arrival_at_loader(ctx, event)?,
            EL => self.on_end_loading(ctx, event)?,
            EW => self.on_end_weighing(ctx, event)?,
            _ => return Err(unhandled(event)),
        }
        trace!(event = %event, fleet = ?self.fleet(), "dump truck state");
        Ok(())
    }
}

/// Seed one `ALQ` per truck, a minute apart, plus the `End` event.
pub fn seed(sim: &mut Simulation, params: &DumpTruckParams) -> DesResult<()> {
    for truck in 0..params.trucks {
        sim.schedule_tagged(
            truck as f64,
            EventKind::custom(ALQ),
            &format!("truck-{}", truck + 1),
        )?;
    }
    sim.schedule_end(params.end_time)
}

/// Run one dump truck trial up to `params.end_time`.
pub fn run_trial(
    params: &DumpTruckParams,
    stream: &mut VariateStream,
    backend: HeapBackend,
) -> DesResult<DumpTruckStats> {
    params.validate()?;
    let mut model = DumpTruckOperation::new(params, stream)?;
    let mut sim = Simulation::with_backend(backend);
    seed(&mut sim, params)?;

    let summary = sim.run(&mut model)?;
    let last = sim.previous().map_or(SimTime::ZERO, Event::time);
    model.close(last, summary.end_time);
    Ok(model.stats(summary.end_time))
}
