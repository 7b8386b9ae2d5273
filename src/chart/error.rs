//! Chart error types

use thiserror::Error;

/// Errors raised while building a chart
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    /// Surface too small for the margins
    #[error("Invalid dimensions: {width}x{height} leaves no plot area")]
    InvalidDimensions { width: f64, height: f64 },

    /// Window span must be positive
    #[error("Invalid window span: {0} ms")]
    InvalidSpan(i64),

    /// Value headroom must be a positive finite factor
    #[error("Invalid headroom factor: {0}")]
    InvalidHeadroom(f64),

    /// Transition duration must be positive
    #[error("Invalid transition duration: must be greater than zero")]
    InvalidDuration,

    /// Drawing the frame failed
    #[error("Failed to render frame: {0}")]
    Render(String),

    /// Unknown tick fill policy
    #[error("Unknown tick fill policy: {0} (expected hold or skip)")]
    InvalidTickFill(String),
}

/// Result type alias for chart operations
pub type ChartResult<T> = Result<T, ChartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChartError::InvalidSpan(0);
        assert_eq!(err.to_string(), "Invalid window span: 0 ms");

        let err = ChartError::InvalidDimensions {
            width: 10.0,
            height: 20.0,
        };
        assert_eq!(err.to_string(), "Invalid dimensions: 10x20 leaves no plot area");
    }
}
