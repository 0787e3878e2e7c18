//! Error types for source acquisition
use crate::source::Variable;
use thiserror::Error;

/// Failure of a single adapter call.
///
/// Only `Authentication` aborts a backward search; every other variant is a
/// miss at the current offset.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    /// Network hiccup, upstream 5xx, rate limiting
    #[error("transient adapter failure: {0}")]
    Transient(String),

    /// Iteration exceeded its deadline
    #[error("adapter call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Response could not be decoded
    #[error("malformed adapter response: {0}")]
    Malformed(String),

    /// Data-source session is missing or was rejected
    #[error("authentication failed: {0}")]
    Authentication(String),
}

/// Fatal failure of an acquisition run. No partial output accompanies it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    /// Backward search exhausted its horizon with zero observations
    #[error("source {source_id} has no observations within the last {horizon_days} days")]
    SourceUnavailable {
        source_id: String,
        horizon_days: u32,
    },

    /// Data existed but no point carried a valid value for the variable
    #[error("every point is missing a valid {variable} value, cannot impute")]
    AllValuesMissing { variable: Variable },

    /// Upstream session not initialized or credentials rejected
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Run requested with an empty point set
    #[error("no sample points supplied")]
    NoPoints,

    /// Point provider data could not be parsed
    #[error("failed to parse sample points: {0}")]
    PointParse(String),

    /// Fixture observation table could not be parsed
    #[error("failed to parse fixture observations: {0}")]
    Fixture(String),
}

/// Adapter settings could not be loaded from the environment.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set to use the HTTP adapter")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Type alias for Results using AcquisitionError
pub type Result<T> = std::result::Result<T, AcquisitionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = AdapterError::Timeout { seconds: 30 };
        assert_eq!(err.to_string(), "adapter call timed out after 30s");
    }

    #[test]
    fn test_source_unavailable_message_names_source() {
        let err = AcquisitionError::SourceUnavailable {
            source_id: "UCSB-CHG/CHIRPS/DAILY".to_string(),
            horizon_days: 15,
        };
        let message = err.to_string();
        assert!(message.contains("UCSB-CHG/CHIRPS/DAILY"));
        assert!(message.contains("15"));
    }
}
