//! Transport configuration.

use crate::error::{Result, TransportError};
use crate::layout;
use std::time::Duration;

/// How the producer waits when the consumer has not freed enough space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitStrategy {
    /// Spin until space is available. Never returns `WouldBlock`.
    #[default]
    BusySpin,
    /// Fail immediately with `WouldBlock` if the ring is full.
    NoWait,
    /// Spin for at most the given duration, then fail with `WouldBlock`.
    SpinFor(Duration),
}

/// Configuration for a ring transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Size of the data region in bytes. Must be a power of two.
    pub capacity: usize,
    /// Whether to create the backing file if it doesn't exist.
    pub create: bool,
    /// Whether to discard any existing contents of the backing file.
    pub reset: bool,
    /// Default wait strategy used by `publish`.
    pub wait: WaitStrategy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            capacity: 1024 * 1024, // 1MB
            create: true,
            reset: false,
            wait: WaitStrategy::BusySpin,
        }
    }
}

impl TransportConfig {
    /// Creates a configuration with the given data region capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Sets whether a missing backing file is created.
    #[must_use]
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Sets whether an existing backing file is wiped before mapping.
    #[must_use]
    pub fn reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    /// Sets the default wait strategy.
    #[must_use]
    pub fn wait(mut self, wait: WaitStrategy) -> Self {
        self.wait = wait;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the capacity is unusable.
    pub fn validate(&self) -> Result<()> {
        layout::validate_capacity(self.capacity).map_err(TransportError::invalid_config)?;
        if self.reset && !self.create {
            return Err(TransportError::invalid_config(
                "reset requires create to be enabled",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_config_default() {
        let config = TransportConfig::default();
        assert_eq!(config.capacity, 1024 * 1024);
        assert!(config.create);
        assert!(!config.reset);
        assert_eq!(config.wait, WaitStrategy::BusySpin);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_transport_config_builder() {
        let config = TransportConfig::with_capacity(4096)
            .create(false)
            .wait(WaitStrategy::SpinFor(Duration::from_millis(5)));
        assert_eq!(config.capacity, 4096);
        assert!(!config.create);
        assert_eq!(config.wait, WaitStrategy::SpinFor(Duration::from_millis(5)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_transport_config_rejects_bad_capacity() {
        let err = TransportConfig::with_capacity(3000).validate().unwrap_err();
        assert!(matches!(err, TransportError::InvalidConfig { .. }));

        let err = TransportConfig::with_capacity(64).validate().unwrap_err();
        assert!(matches!(err, TransportError::InvalidConfig { .. }));
    }

    #[test]
    fn test_transport_config_reset_without_create() {
        let config = TransportConfig::with_capacity(4096).create(false).reset(true);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transport_config_clone_debug() {
        let config = TransportConfig::with_capacity(8192).reset(true);
        let cloned = config.clone();
        assert_eq!(cloned.capacity, 8192);
        assert!(cloned.reset);

        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("TransportConfig"));
    }
}
