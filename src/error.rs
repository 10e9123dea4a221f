//! Errors raised by state-space generation.
//!
//! Every error aborts the current generation run. Expected outcomes such as
//! "this state was already known" are plain return values, never errors.

use thiserror::Error;

/// Failure kinds of a generation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenError {
    /// The node arena reached its configured limit.
    #[error("out of memory: node limit of {limit} reached")]
    OutOfMemory { limit: usize },

    /// The fixed-capacity vanishing exploration stack was exceeded.
    #[error("exploration stack overflow (capacity {capacity})")]
    Overflow { capacity: usize },

    /// Malformed model adapter result or broken internal invariant.
    #[error("engine failed: {0}")]
    EngineFailed(String),

    /// A newly discovered state violates a model assertion.
    #[error("assertion failed in state {state}")]
    AssertionFailure { state: String },

    /// Cooperative cancellation was requested.
    #[error("generation terminated")]
    Terminated,
}

pub type Result<T, E = GenError> = std::result::Result<T, E>;

/// Error reported by a model adapter.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct ModelError(pub String);

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<ModelError> for GenError {
    fn from(err: ModelError) -> Self {
        GenError::EngineFailed(err.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_maps_to_engine_failed() {
        let err: GenError = ModelError::new("bad next state").into();
        assert_eq!(err, GenError::EngineFailed("bad next state".to_string()));
        assert_eq!(err.to_string(), "engine failed: bad next state");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            GenError::Overflow { capacity: 8 }.to_string(),
            "exploration stack overflow (capacity 8)"
        );
        assert_eq!(GenError::Terminated.to_string(), "generation terminated");
    }
}
