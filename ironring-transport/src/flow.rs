//! Producer-side backpressure.
//!
//! The producer may run at most one lap ahead of the consumer. The gate
//! caches `subscriber_sequence + capacity` and only re-reads the shared
//! subscriber sequence when a reservation would pass the cached limit.

use crate::config::WaitStrategy;
use crate::error::{Result, TransportError};
use crate::layout::HeaderField;
use crate::region::AtomicRegion;
use std::time::Instant;

/// Cached view of how far the producer may write.
#[derive(Debug, Clone)]
pub struct SubscriberGate {
    capacity: u64,
    next_subscriber_check: u64,
}

impl SubscriberGate {
    /// Creates a gate from the currently published subscriber sequence.
    #[must_use]
    pub fn new(capacity: u64, subscriber_sequence: u64) -> Self {
        Self {
            capacity,
            next_subscriber_check: subscriber_sequence + capacity,
        }
    }

    /// Returns the highest logical offset the producer may currently reach.
    #[inline(always)]
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.next_subscriber_check
    }

    #[inline(always)]
    fn refresh(&mut self, header: &AtomicRegion<'_>) -> u64 {
        self.next_subscriber_check =
            header.load_acquire(HeaderField::SubscriberSequence) + self.capacity;
        self.next_subscriber_check
    }

    /// Waits until a reservation ending at `end` no longer overwrites data
    /// the consumer has not drained.
    ///
    /// # Errors
    /// Returns `WouldBlock` if the wait strategy gives up first. Never fails
    /// with [`WaitStrategy::BusySpin`].
    #[inline]
    pub fn acquire(
        &mut self,
        header: &AtomicRegion<'_>,
        end: u64,
        wait: WaitStrategy,
    ) -> Result<()> {
        if end <= self.next_subscriber_check || end <= self.refresh(header) {
            return Ok(());
        }

        tracing::trace!(
            "Producer blocked: reservation ends at {}, consumer allows {}",
            end,
            self.next_subscriber_check
        );

        match wait {
            WaitStrategy::BusySpin => {
                while end > self.refresh(header) {
                    std::hint::spin_loop();
                }
                Ok(())
            }
            WaitStrategy::NoWait => Err(TransportError::would_block(
                end,
                self.next_subscriber_check,
            )),
            WaitStrategy::SpinFor(timeout) => {
                let deadline = Instant::now() + timeout;
                loop {
                    std::hint::spin_loop();
                    if end <= self.refresh(header) {
                        return Ok(());
                    }
                    if Instant::now() >= deadline {
                        tracing::warn!(
                            "Consumer stalled for {:?}, producer needs {} but limit is {}",
                            timeout,
                            end,
                            self.next_subscriber_check
                        );
                        return Err(TransportError::would_block(
                            end,
                            self.next_subscriber_check,
                        ));
                    }
                }
            }
        }
    }
}
