use std::fmt;

use crate::error::AppError;

/// Where in a batch run a failure happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureScope {
    /// The identification phase as a whole (events could not be listed).
    Identification,
    /// Scoring a single event during identification.
    Event { event_id: String },
    /// Evaluating one pair of risks during transmission modeling.
    RiskPair { source_id: String, target_id: String },
    /// The transmission phase as a whole (e.g. the entity graph could not be built).
    Transmission,
}

impl fmt::Display for FailureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureScope::Identification => write!(f, "risk identification"),
            FailureScope::Event { event_id } => write!(f, "event {}", event_id),
            FailureScope::RiskPair { source_id, target_id } => {
                write!(f, "risk pair {} / {}", source_id, target_id)
            }
            FailureScope::Transmission => write!(f, "transmission modeling"),
        }
    }
}

/// A non-fatal failure recorded at a batch boundary instead of aborting the batch.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub scope: FailureScope,
    pub error: AppError,
}

impl BatchFailure {
    pub fn new(scope: FailureScope, error: AppError) -> Self {
        Self { scope, error }
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scope, self.error)
    }
}
