//! Error types for scenario runs.

use stepper_safety::{SafetyError, SafetyState};
use thiserror::Error;

/// Errors from running a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// The safety system returned an error the scenario did not expect.
    #[error("safety system error during {step}: {source}")]
    Safety {
        /// Scenario step that failed.
        step: &'static str,
        /// Underlying error.
        source: SafetyError,
    },

    /// The system ended a step in the wrong state.
    #[error("after {step}: expected {expected}, found {actual}")]
    UnexpectedState {
        /// Scenario step that was checked.
        step: &'static str,
        /// State the scenario expects.
        expected: SafetyState,
        /// State the system is in.
        actual: SafetyState,
    },

    /// A condition other than the state did not hold.
    #[error("after {step}: {what}")]
    Expectation {
        /// Scenario step that was checked.
        step: &'static str,
        /// What was expected.
        what: &'static str,
    },

    /// No scenario with this name.
    #[error("unknown scenario `{0}`")]
    UnknownScenario(String),
}

impl SimError {
    /// Wrap a safety error with the step it happened in.
    #[must_use]
    pub fn safety(step: &'static str, source: SafetyError) -> Self {
        Self::Safety { step, source }
    }
}

/// A specialized `Result` type for scenario runs.
pub type SimResult<T> = Result<T, SimError>;
