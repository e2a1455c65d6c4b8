//! Structured error types for the simulation kernel.
//!
//! Every fallible public API returns `Result<T, DesError>`. Heap and driver
//! precondition violations are programming errors in the model (no retry,
//! no recovery); distribution and configuration errors are caller input
//! errors.

use thiserror::Error;

use crate::event::EventKind;

/// The top-level error type.
#[derive(Debug, Error)]
pub enum DesError {
    // ── Heap errors ───────────────────────────────────────

    /// `pop_min` was called on a heap with zero elements.
    #[error("cannot pop the minimum of an empty collection")]
    EmptyCollection,

    // ── Driver errors ─────────────────────────────────────

    /// The driver reached a state a correctly seeded run never reaches
    /// (empty FEL while running, time moving backwards, stepping a
    /// terminated run).
    #[error("impossible state: {0}")]
    ImpossibleState(String),

    /// A handler received an event it has no logic for.
    #[error("no handler for {kind} event (tag: {})", .tag.as_deref().unwrap_or("-"))]
    UnhandledEvent {
        kind: EventKind,
        tag: Option<String>,
    },

    /// A handler tried to schedule with a negative or non-finite duration.
    #[error("invalid duration {0}: durations must be finite and nonnegative")]
    InvalidDuration(f64),

    // ── Variate errors ────────────────────────────────────

    /// Distribution parameters are out of range.
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),

    // ── Configuration / IO ────────────────────────────────

    /// A configuration file or override could not be interpreted.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DesError {
    /// Shorthand for [`DesError::ImpossibleState`].
    pub fn impossible(msg: impl Into<String>) -> Self {
        DesError::ImpossibleState(msg.into())
    }

    /// Whether this error means the driver contract was broken.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            DesError::EmptyCollection
                | DesError::ImpossibleState(_)
                | DesError::UnhandledEvent { .. }
        )
    }
}

/// Convenience alias for `Result<T, DesError>`.
pub type DesResult<T> = Result<T, DesError>;
