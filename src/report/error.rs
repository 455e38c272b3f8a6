//! Run report error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding a run report
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization to JSON failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Report version is not supported by this version
    #[error("Unsupported report version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}
