//! Validation Error Types

use thiserror::Error;

/// Errors during sample validation or decoder configuration
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// Value out of allowed physical range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Rejected configuration value
    #[error("Invalid decoder configuration: {0}")]
    InvalidConfig(String),
}
