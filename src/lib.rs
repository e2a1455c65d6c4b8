//! # chronoq — Discrete-Event Simulation Kernel
//!
//! A future event list, two interchangeable min-heap backends and a
//! driver loop that pops the earliest event, advances a logical clock to
//! it and hands it to model code. Runs are single-threaded and fully
//! deterministic for a given seed; independent trials can be spread over
//! a thread pool.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────┐
//! │   models / trials / config  │ ← queueing models, batch runs
//! │  ┌───────────────────────┐  │
//! │  │      Simulation        │  │ ← driver loop, run lifecycle
//! │  │  ┌─────────────────┐  │  │
//! │  │  │ FutureEventList │  │  │ ← pending events
//! │  │  │  ┌───────────┐  │  │  │
//! │  │  │  │  MinHeap   │  │  │  │ ← array heap / std BinaryHeap
//! │  │  │  └───────────┘  │  │  │
//! │  │  └─────────────────┘  │  │
//! │  │  ┌─────────────────┐  │  │
//! │  │  │     Events       │  │  │ ← (time, kind) ordering
//! │  │  └─────────────────┘  │  │
//! │  │  ┌─────────────────┐  │  │
//! │  │  │    SimTime       │  │  │ ← logical clock
//! │  │  └─────────────────┘  │  │
//! │  └───────────────────────┘  │
//! └─────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod fel;
pub mod heap;
pub mod models;
pub mod simulation;
pub mod time;
pub mod trace;
pub mod trials;
pub mod variates;

// Re-exports for convenience.
pub use config::SimConfig;
pub use error::{DesError, DesResult};
pub use event::{Event, EventId, EventIdGen, EventKind};
pub use fel::FutureEventList;
pub use heap::{ArrayHeap, BinaryHeapBackend, HeapBackend, MinHeap};
pub use simulation::{
    EventHandler, RunState, RunSummary, Simulation, SimulationContext, Step, Termination,
};
pub use time::SimTime;
pub use trace::DispatchLog;
pub use trials::{run_trials, TrialPlan};
pub use variates::{Empirical, VariateStream};
