//! Error types for tagged shared memory operations.
//!
//! Every fallible operation in the workspace returns [`Result`]. Errors are
//! reported to the immediate caller; the only retrying done internally is the
//! precondition loop of wait-based primitives, which gives up with
//! [`Error::Timeout`].

use crate::value::ValueKind;
use std::time::Duration;
use thiserror::Error;

/// All tagmem errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Bad key, bad dimensions, bad tag argument, bad loop parameters
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation needs a different kind of value (e.g. fetch-and-add on a string)
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// What the operation needed
        expected: &'static str,
        /// Kind actually found
        actual: ValueKind,
    },

    /// A wait-based operation did not see its precondition in time
    #[error("timed out after {elapsed:?} waiting for {operation}")]
    Timeout {
        /// Name of the operation that gave up
        operation: &'static str,
        /// How long it waited
        elapsed: Duration,
    },

    /// Named region is not registered in the domain
    #[error("region not found: {0}")]
    RegionNotFound(String),

    /// Tag protocol misuse (releasing an unheld lock, ending a transaction twice)
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Index or coordinate outside the region bounds
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Offending index
        index: i64,
        /// Length of the dimension it was checked against
        len: usize,
    },

    /// Key map probe sequence exhausted, or stack/queue full
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),
}

/// Result type for tagmem operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for an [`Error::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Shorthand for an [`Error::ProtocolViolation`].
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::ProtocolViolation(msg.into())
    }

    /// Check if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Check if this error is retryable.
    ///
    /// Only timeouts may succeed on retry; the other variants describe the
    /// call itself.
    pub fn is_retryable(&self) -> bool {
        self.is_timeout()
    }

    /// Check if this is a tag protocol violation.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Error::ProtocolViolation(_))
    }

    /// Check if this is a missing region.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RegionNotFound(_))
    }
}
