//! Batches of independent trials.
//!
//! Trials share nothing: each builds its own `Simulation` from its own
//! `VariateStream`, so running them on the rayon pool produces exactly
//! the results of running them one after another.

use rayon::prelude::*;
use tracing::info;

use crate::error::DesResult;
use crate::variates::VariateStream;

/// How many trials to run and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialPlan {
    pub trials: u64,
    pub base_seed: u64,
    /// Spread trials over the rayon pool.
    pub parallel: bool,
}

impl TrialPlan {
    pub fn new(trials: u64, base_seed: u64) -> Self {
        TrialPlan {
            trials,
            base_seed,
            parallel: true,
        }
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for TrialPlan {
    fn default() -> Self {
        TrialPlan::new(1, 0)
    }
}

/// Run every trial of `plan`, returning results in trial-index order.
///
/// Any failing trial fails the batch. Run sequentially, the error is the
/// one from the lowest failing index.
pub fn run_trials<T, F>(plan: &TrialPlan, trial: F) -> DesResult<Vec<T>>
where
    T: Send,
    F: Fn(u64, &mut VariateStream) -> DesResult<T> + Sync,
{
    info!(
        trials = plan.trials,
        base_seed = plan.base_seed,
        parallel = plan.parallel,
        "running trials"
    );
    let one = |index: u64| {
        let mut stream = VariateStream::for_trial(plan.base_seed, index);
        trial(index, &mut stream)
    };
    if plan.parallel {
        (0..plan.trials).into_par_iter().map(one).collect()
    } else {
        (0..plan.trials).map(one).collect()
    }
}
