//! Error types for filter design and controller operations.

use thiserror::Error;

/// Result type for design and rebuild operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors reported to the control context by a rebuild.
///
/// None of these ever cross into the real-time tick; the engine keeps running
/// whatever filter it already has.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// A parameter is out of range or missing for the chosen family
    #[error("invalid filter spec: {0}")]
    InvalidSpec(String),

    /// Numerical failure inside prototype synthesis or the bilinear transform
    #[error("filter build failed: {0}")]
    Build(String),

    /// The real-time side has not consumed earlier commands yet
    #[error("engine busy: {pending} commands still queued")]
    Busy { pending: usize },
}

impl FilterError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        FilterError::InvalidSpec(msg.into())
    }

    pub(crate) fn build(msg: impl Into<String>) -> Self {
        FilterError::Build(msg.into())
    }

    /// True for errors caused by the spec itself rather than by numerics
    pub fn is_invalid_spec(&self) -> bool {
        matches!(self, FilterError::InvalidSpec(_))
    }
}
