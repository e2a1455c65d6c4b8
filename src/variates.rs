//! Random variates for the reference models.
//!
//! All sampling goes through a seeded `ChaCha8Rng`, so a trial replays
//! exactly from its seed. Nothing here reads wall-clock entropy.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::error::{DesError, DesResult};

/// Tolerance on the probability sum of an empirical table.
const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// A discrete distribution given as a value table.
#[derive(Debug, Clone, PartialEq)]
pub struct Empirical {
    values: Vec<f64>,
    cumulative: Vec<f64>,
}

impl Empirical {
    /// Build a table. Probabilities must be nonnegative and sum to one.
    pub fn new(values: &[f64], probabilities: &[f64]) -> DesResult<Self> {
        if values.is_empty() {
            return Err(DesError::InvalidDistribution(
                "empirical table has no values".into(),
            ));
        }
        if values.len() != probabilities.len() {
            return Err(DesError::InvalidDistribution(format!(
                "{} values but {} probabilities",
                values.len(),
                probabilities.len()
            )));
        }
        if let Some(p) = probabilities.iter().find(|p| !(p.is_finite() && **p >= 0.0)) {
            return Err(DesError::InvalidDistribution(format!(
                "probability {} is not in [0, 1]",
                p
            )));
        }

        let mut cumulative = Vec::with_capacity(probabilities.len());
        let mut total = 0.0;
        for p in probabilities {
            total += p;
            cumulative.push(total);
        }
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(DesError::InvalidDistribution(format!(
                "probabilities sum to {}, expected 1",
                total
            )));
        }

        Ok(Empirical {
            values: values.to_vec(),
            cumulative,
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Probability-weighted mean of the table.
    pub fn mean(&self) -> f64 {
        let mut prev = 0.0;
        let mut mean = 0.0;
        for (value, cum) in self.values.iter().zip(&self.cumulative) {
            mean += value * (cum - prev);
            prev = *cum;
        }
        mean
    }

    /// Inverse-CDF lookup for `u` in `[0, 1)`.
    fn lookup(&self, u: f64) -> f64 {
        let idx = self
            .cumulative
            .iter()
            .position(|cum| u < *cum)
            .unwrap_or(self.values.len() - 1);
        self.values[idx]
    }
}

/// Seeded source of the variates the models draw.
#[derive(Debug, Clone)]
pub struct VariateStream {
    rng: ChaCha8Rng,
    spare_normal: Option<f64>,
    use_library_normal: bool,
}

impl VariateStream {
    pub fn new(seed: u64) -> Self {
        VariateStream {
            rng: ChaCha8Rng::seed_from_u64(seed),
            spare_normal: None,
            use_library_normal: false,
        }
    }

    /// Stream for one trial of a batch. Each trial reads its own ChaCha
    /// stream under the shared base seed, so trials never overlap.
    pub fn for_trial(base_seed: u64, trial: u64) -> Self {
        let mut stream = Self::new(base_seed);
        stream.rng.set_stream(trial);
        stream
    }

    /// Draw Gaussians from `rand_distr` instead of the built-in Box–Muller.
    pub fn use_library_normal(mut self, enabled: bool) -> Self {
        self.use_library_normal = enabled;
        self.spare_normal = None;
        self
    }

    /// Uniform on `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Exponential with the given mean, by inverse transform.
    pub fn exponential(&mut self, mean: f64) -> DesResult<f64> {
        if !(mean.is_finite() && mean > 0.0) {
            return Err(DesError::InvalidDistribution(format!(
                "exponential mean must be positive, got {}",
                mean
            )));
        }
        // 1 - [0, 1) keeps the argument of ln away from zero.
        let u = 1.0 - self.uniform();
        Ok(-mean * u.ln())
    }

    /// Normal with the given mean and standard deviation.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> DesResult<f64> {
        if !(mean.is_finite() && std_dev.is_finite() && std_dev >= 0.0) {
            return Err(DesError::InvalidDistribution(format!(
                "normal({}, {}) is not defined",
                mean, std_dev
            )));
        }
        Ok(mean + std_dev * self.standard_normal())
    }

    /// Normal restricted to `[lower, upper]` by rejection.
    ///
    /// Retries without bound, so a window far out in the tail can take
    /// arbitrarily long.
    pub fn truncated_normal(
        &mut self,
        mean: f64,
        std_dev: f64,
        lower: f64,
        upper: f64,
    ) -> DesResult<f64> {
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(DesError::InvalidDistribution(format!(
                "empty truncation window [{}, {}]",
                lower, upper
            )));
        }
        loop {
            let x = self.normal(mean, std_dev)?;
            if x >= lower && x <= upper {
                return Ok(x);
            }
        }
    }

    /// One draw from an empirical table.
    pub fn empirical(&mut self, table: &Empirical) -> f64 {
        let u = self.uniform();
        table.lookup(u)
    }

    fn standard_normal(&mut self) -> f64 {
        if self.use_library_normal {
            return self.rng.sample(StandardNormal);
        }
        if let Some(z) = self.spare_normal.take() {
            return z;
        }
        let u1 = 1.0 - self.uniform();
        let u2 = self.uniform();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * u2;
        self.spare_normal = Some(radius * angle.sin());
        radius * angle.cos()
    }
}
