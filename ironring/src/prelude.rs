//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types.
//!
//! ```ignore
//! use ironring::prelude::*;
//! ```

pub use ironring_transport::error::{Result as TransportResult, TransportError};
pub use ironring_transport::{DuplexLink, RingTransport, TransportConfig, WaitStrategy};
