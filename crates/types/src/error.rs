//! Configuration error type shared by every component config.

use thiserror::Error;

/// Errors detected while validating configuration.
///
/// These are fatal at construction: a node is never built from a config
/// that fails validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A numeric constant lies outside its permitted range.
    #[error("{field} = {value} is out of range (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    /// A required setting has no usable value.
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

impl ConfigError {
    /// Check a probability-like constant lies strictly inside (0, 1).
    pub fn check_open_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
        if value > 0.0 && value < 1.0 {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                field,
                value,
                expected: "a value in (0, 1)",
            })
        }
    }
}
