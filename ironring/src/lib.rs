//! # IronRing
//!
//! Low-latency messaging between co-located processes over a shared,
//! memory-mapped ring.
//!
//! IronRing moves byte records from one producer to one consumer through a
//! file mapped into both processes. The hot path is a handful of atomic
//! operations: no syscalls, no locks.
//!
//! ## Features
//!
//! - **Lock-free publish/poll** - One fetch-and-add per record on the producer,
//!   one release store on the consumer
//! - **Cache-line framing** - Records and control fields never share a cache line
//! - **Wraparound without splitting** - Records skip to the next lap via a
//!   forwarding header instead of straddling the ring end
//! - **Backpressure** - Busy spin by default, or bounded waits that report
//!   `WouldBlock`
//!
//! ## Quick Start
//!
//! ```ignore
//! use ironring::prelude::*;
//!
//! let mut producer = RingTransport::create("/dev/shm/ipc-in", 1 << 20)?;
//! let mut consumer = RingTransport::create("/dev/shm/ipc-in", 1 << 20)?;
//!
//! producer.publish(b"hello")?;
//! consumer.poll(|payload| assert_eq!(payload, b"hello"));
//! ```
//!
//! ## Crate Organization
//!
//! - [`transport`] - Ring transport, configuration, duplex links

pub mod prelude;

/// Shared-memory ring transport.
pub mod transport {
    pub use ironring_transport::*;
}

// Re-export commonly used items at the crate root
pub use ironring_transport::{
    DuplexLink, RingTransport, TransportConfig, TransportError, WaitStrategy,
};
