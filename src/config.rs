//! TOML configuration for batch runs.
//!
//! ```toml
//! [run]
//! model = "airport"
//! trials = 30
//! base_seed = 7
//! parallel = true
//! backend = "binary"
//!
//! [airport]
//! allow_transfers = false
//! end_time = 120.0
//!
//! [airport.economy]
//! interarrival_mean = 1.0
//! service_mean = 1.0
//! service_std = 0.25
//! ```
//!
//! Every section and key is optional; missing values take the reference
//! model defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DesError, DesResult};
use crate::heap::HeapBackend;
use crate::models::{AirportParams, DumpTruckParams, GroceryParams, ModelKind};
use crate::trials::TrialPlan;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub grocery: GroceryParams,
    #[serde(default)]
    pub airport: AirportParams,
    #[serde(default)]
    pub dump_truck: DumpTruckParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub model: ModelKind,
    #[serde(default = "default_trials")]
    pub trials: u64,
    #[serde(default)]
    pub base_seed: u64,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub backend: HeapBackend,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::default(),
            trials: default_trials(),
            base_seed: 0,
            parallel: default_parallel(),
            backend: HeapBackend::default(),
        }
    }
}

fn default_trials() -> u64 {
    30
}

fn default_parallel() -> bool {
    true
}

impl SimConfig {
    /// Read and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> DesResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&contents)
            .map_err(|e| DesError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate config text.
    pub fn from_toml_str(text: &str) -> DesResult<Self> {
        let config: SimConfig = toml::from_str(text).map_err(|e| DesError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the parameters of the selected model.
    pub fn validate(&self) -> DesResult<()> {
        if self.run.trials == 0 {
            warn!("run.trials is 0; nothing will be simulated");
        }
        match self.run.model {
            ModelKind::Grocery => self.grocery.validate(),
            ModelKind::Airport => self.airport.validate(),
            ModelKind::DumpTruck => self.dump_truck.validate(),
        }
    }

    pub fn trial_plan(&self) -> TrialPlan {
        TrialPlan {
            trials: self.run.trials,
            base_seed: self.run.base_seed,
            parallel: self.run.parallel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    #[test]
    fn test_default_values() {
        let config = SimConfig::default();
        assert_eq!(config.run.model, ModelKind::Grocery);
        assert_eq!(config.run.trials, 30);
        assert!(config.run.parallel);
        assert_eq!(config.run.backend, HeapBackend::Array);
        assert_eq!(config.grocery.interarrival_mean, 4.5);
        assert_eq!(config.grocery.customer_limit, 1000);
        assert_eq!(config.airport.end_time, 120.0);
        assert_eq!(config.dump_truck.trucks, 8);
    }

    #[test]
    fn test_empty_text_is_all_defaults() {
        assert_eq!(SimConfig::from_toml_str("").unwrap(), SimConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = SimConfig::from_toml_str(
            r#"
            [run]
            model = "dump_truck"
            backend = "binary"
            parallel = false

            [dump_truck]
            trucks = 4

            [dump_truck.travel]
            values = [30.0, 50.0]
            probabilities = [0.5, 0.5]
            "#,
        )
        .unwrap();
        assert_eq!(config.run.model, ModelKind::DumpTruck);
        assert_eq!(config.run.backend, HeapBackend::Binary);
        assert_eq!(config.run.trials, 30);
        assert_eq!(config.dump_truck.trucks, 4);
        assert_eq!(config.dump_truck.loaders, 2);
        assert_eq!(config.dump_truck.travel.values, vec![30.0, 50.0]);

        let plan = config.trial_plan();
        assert!(!plan.parallel);
        assert_eq!(plan.trials, 30);
    }

    #[test]
    fn test_nested_airport_class() {
        let config = SimConfig::from_toml_str(
            r#"
            [run]
            model = "airport"

            [airport]
            allow_transfers = false

            [airport.first]
            interarrival_mean = 3.0
            service_mean = 2.5
            service_std = 0.5
            "#,
        )
        .unwrap();
        assert!(!config.airport.allow_transfers);
        assert_eq!(config.airport.first.interarrival_mean, 3.0);
        assert_eq!(config.airport.economy.interarrival_mean, 1.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SimConfig::from_toml_str("[grocery]\nservice_mean = -1.0").unwrap_err();
        assert!(matches!(err, DesError::Config(_)));

        let err = SimConfig::from_toml_str("[run]\nbackend = \"fibonacci\"").unwrap_err();
        assert!(matches!(err, DesError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chronoq.toml");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "[run]\nmodel = 'airport'\ntrials = 5\nbase_seed = 42").unwrap();
        file.flush().unwrap();

        let config = SimConfig::load(&path).unwrap();
        assert_eq!(config.run.model, ModelKind::Airport);
        assert_eq!(config.run.trials, 5);
        assert_eq!(config.run.base_seed, 42);
    }

    #[test]
    fn test_load_missing_file() {
        let result = SimConfig::load("definitely_missing_chronoq.toml");
        assert!(matches!(result, Err(DesError::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "not a valid toml").unwrap();
        file.flush().unwrap();

        match SimConfig::load(&path) {
            Err(DesError::Config(msg)) => assert!(msg.contains("bad.toml")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    #[traced_test]
    fn test_zero_trials_warns() {
        let config = SimConfig::from_toml_str("[run]\ntrials = 0").unwrap();
        assert_eq!(config.run.trials, 0);
        assert!(logs_contain("nothing will be simulated"));
    }
}
