//! Error types for ring transport operations.

use thiserror::Error;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Error type for ring transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// IO error while opening, sizing or mapping the backing file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid construction parameters or an unusable mapped region.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    /// The backing file was initialised with a different layout.
    #[error("layout mismatch: expected capacity {expected} bytes, file holds {found} bytes")]
    LayoutMismatch {
        /// Capacity requested by this side.
        expected: u64,
        /// Capacity recorded in the file.
        found: u64,
    },

    /// Payload can never fit in the ring, not even on an empty lap.
    #[error("payload too large: {size} bytes exceeds maximum {max} bytes")]
    PayloadTooLarge {
        /// Actual payload size.
        size: usize,
        /// Maximum payload size for this ring.
        max: usize,
    },

    /// The consumer did not free enough space before the wait gave up.
    #[error("would block: reservation ends at {required}, consumer allows up to {available}")]
    WouldBlock {
        /// Logical offset the reservation needs to reach.
        required: u64,
        /// Highest logical offset the consumer currently allows.
        available: u64,
    },
}

impl TransportError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a payload too large error.
    pub fn payload_too_large(size: usize, max: usize) -> Self {
        Self::PayloadTooLarge { size, max }
    }

    /// Creates a would block error.
    pub fn would_block(required: u64, available: u64) -> Self {
        Self::WouldBlock {
            required,
            available,
        }
    }

    /// Returns true if the error is a backpressure timeout rather than a failure.
    #[must_use]
    pub fn is_would_block(&self) -> bool {
        matches!(self, Self::WouldBlock { .. })
    }
}
