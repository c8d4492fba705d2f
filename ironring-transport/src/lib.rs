//! # IronRing Transport
//!
//! Shared-memory ring transport for messaging between co-located processes.
//!
//! This crate provides:
//! - [`transport`] - The ring transport: `publish` and `poll` over a mapped file
//! - [`duplex`] - Two rings composed into a bidirectional link
//! - [`config`] - Capacity, file creation and backpressure settings
//! - [`layout`] - Control block and record layout constants
//! - [`shm`] - The memory-mapped backing file
//! - [`region`] - Atomic and bounds-checked views over the mapping
//! - [`flow`] - Producer-side backpressure gate

pub mod config;
pub mod duplex;
pub mod error;
pub mod flow;
pub mod layout;
pub mod region;
pub mod shm;
pub mod transport;

pub use config::{TransportConfig, WaitStrategy};
pub use duplex::DuplexLink;
pub use error::{Result, TransportError};
pub use shm::SharedMapping;
pub use transport::RingTransport;
