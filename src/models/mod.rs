//! Reference queueing models built on the driver.
//!
//! Each model is an [`EventHandler`](crate::simulation::EventHandler) with
//! a `run_trial` entry point that seeds a fresh `Simulation`, runs it to
//! termination and condenses the run into a serializable stats record.

pub mod airport;
pub mod dump_truck;
pub mod grocery;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::{DesError, DesResult};
use crate::event::Event;
use crate::variates::VariateStream;

pub use airport::{AirportCheckIn, AirportParams, AirportStats};
pub use dump_truck::{DumpTruckOperation, DumpTruckParams, DumpTruckStats};
pub use grocery::{GroceryCheckout, GroceryParams, GroceryStats};

/// Which reference model to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    Grocery,
    Airport,
    DumpTruck,
}

impl ModelKind {
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Grocery => "grocery",
            ModelKind::Airport => "airport",
            ModelKind::DumpTruck => "dump_truck",
        }
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "grocery" => Ok(ModelKind::Grocery),
            "airport" => Ok(ModelKind::Airport),
            "dump_truck" | "truck" => Ok(ModelKind::DumpTruck),
            other => Err(format!(
                "unknown model '{}' (expected grocery, airport or dump_truck)",
                other
            )),
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Server availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    #[default]
    Idle,
    Busy,
}

impl ServerStatus {
    pub fn is_busy(self) -> bool {
        self == ServerStatus::Busy
    }
}

/// Stats of one trial of any model.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelStats {
    Grocery(GroceryStats),
    Airport(AirportStats),
    DumpTruck(DumpTruckStats),
}

/// Run one trial of the model named in `config.run`.
pub fn run_trial(config: &SimConfig, stream: &mut VariateStream) -> DesResult<ModelStats> {
    let backend = config.run.backend;
    Ok(match config.run.model {
        ModelKind::Grocery => {
            ModelStats::Grocery(grocery::run_trial(&config.grocery, stream, backend)?)
        }
        ModelKind::Airport => {
            ModelStats::Airport(airport::run_trial(&config.airport, stream, backend)?)
        }
        ModelKind::DumpTruck => {
            ModelStats::DumpTruck(dump_truck::run_trial(&config.dump_truck, stream, backend)?)
        }
    })
}

/// The error a handler returns for an event it has no branch for.
pub(crate) fn unhandled(event: &Event) -> DesError {
    DesError::UnhandledEvent {
        kind: event.kind().clone(),
        tag: event.tag().map(str::to_owned),
    }
}

/// `num / den`, or zero when nothing was counted.
pub(crate) fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Reject a distribution parameter that must be strictly positive.
pub(crate) fn require_positive(name: &str, value: f64) -> DesResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DesError::Config(format!("{} must be positive, got {}", name, value)))
    }
}

/// Reject a distribution parameter that must be nonnegative.
pub(crate) fn require_nonnegative(name: &str, value: f64) -> DesResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DesError::Config(format!(
            "{} must be nonnegative, got {}",
            name, value
        )))
    }
}
