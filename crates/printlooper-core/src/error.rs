//! Error types for the PrintLooper core.
//!
//! The transformation itself never fails: marker-less input degrades to an
//! empty end sequence. These errors cover the data handed to the core
//! (printer selection, profile templates, matcher patterns) and the loop
//! count validation performed by input layers.

use thiserror::Error;

/// Errors raised while preparing a loop plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LooperError {
    /// No profile is registered under the requested identifier.
    #[error("Unknown printer: {id}")]
    UnknownPrinter {
        /// The identifier that failed to resolve.
        id: String,
    },

    /// A printer profile is unusable.
    #[error("Invalid printer profile '{id}': {reason}")]
    InvalidProfile {
        /// The offending profile identifier.
        id: String,
        /// Why the profile was rejected.
        reason: String,
    },

    /// A comment-marker pattern did not compile.
    #[error("Invalid marker pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: String,
        /// The regex compiler message.
        reason: String,
    },

    /// Loop count rejected by an input layer.
    #[error("Loop count {count} out of range ({min}-{max})")]
    LoopCountOutOfRange {
        /// The requested count.
        count: u32,
        /// Lowest accepted count.
        min: u32,
        /// Highest accepted count.
        max: u32,
    },
}

/// Result type alias for core operations.
pub type LooperResult<T> = Result<T, LooperError>;
