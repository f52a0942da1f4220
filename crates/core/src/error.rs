//! Error taxonomy for generation and validation.

use thiserror::Error;

/// Every failure a generator can report. No partial terrain accompanies an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions { width: i64, height: i64, reason: String },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("validation failed: {0}")]
    ValidationFailure(#[from] ValidationFailure),
}

impl GenerationError {
    pub(crate) fn dimensions(width: i64, height: i64, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions { width, height, reason: reason.into() }
    }

    pub(crate) fn parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { name: name.into(), reason: reason.into() }
    }

    pub fn validation_failure(&self) -> Option<&ValidationFailure> {
        match self {
            Self::ValidationFailure(failure) => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationFailure {
    #[error("no rooms were produced")]
    ZeroRooms,

    #[error("walkable ratio {ratio:.3} is below the minimum {minimum:.3}")]
    WalkableRatio { ratio: f64, minimum: f64 },

    #[error(
        "connectivity {ratio:.3} is below the threshold {threshold:.3} after {attempts} repair attempts"
    )]
    Connectivity { ratio: f64, threshold: f64, attempts: u32 },

    #[error("only {reached} of {total} walkable tiles are reachable from the first walkable tile")]
    Disconnected { reached: usize, total: usize },

    #[error("missing {0}")]
    MissingStairs(&'static str),

    #[error("{0} at ({1}, {2}) has no walkable neighbour")]
    StairsBlocked(&'static str, i32, i32),

    #[error("result does not match the expected {expected} layout: {reason}")]
    TypeMismatch { expected: String, reason: String },
}

pub type GenerationResult<T> = Result<T, GenerationError>;
