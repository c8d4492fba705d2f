//! Single-producer, single-consumer ring transport over a mapped file.
//!
//! Two transports opened over the same file form one unidirectional
//! channel: one side calls [`RingTransport::publish`], the other calls
//! [`RingTransport::poll`]. Records never straddle the end of the ring. A
//! record that would is moved to the start of the next lap and a negative
//! forwarding header is left in the stale slot, telling the consumer how far
//! to skip.

use crate::config::{TransportConfig, WaitStrategy};
use crate::error::{Result, TransportError};
use crate::flow::SubscriberGate;
use crate::layout::{self, CACHE_LINE_SIZE, HeaderField, RECORD_HEADER_LEN};
use crate::shm::SharedMapping;
use bytes::Bytes;
use std::path::Path;
use std::time::Duration;

/// Shared-memory ring transport.
///
/// The same type serves both ends of a channel. Exactly one thread may
/// publish and one thread may poll on a given ring.
pub struct RingTransport {
    mapping: SharedMapping,
    capacity: u64,
    max_payload: usize,
    wait: WaitStrategy,
    // publisher state
    write_offset: u64,
    next_wrap_boundary: u64,
    gate: SubscriberGate,
    // subscriber state
    last_consumed_sequence: u64,
}

impl RingTransport {
    /// Opens a transport over the ring file at `path`, creating it if needed.
    ///
    /// Both cursors resume from the sequences already published in the file,
    /// so reopening an active ring continues where it left off.
    ///
    /// # Arguments
    /// * `path` - Path to the backing file, conventionally on tmpfs
    /// * `config` - Capacity, creation and wait settings
    ///
    /// # Errors
    /// Returns a configuration error if the capacity or the mapped region is
    /// unusable, or IO error if file operations fail.
    pub fn open(path: impl AsRef<Path>, config: TransportConfig) -> Result<Self> {
        let mapping = SharedMapping::open(path.as_ref(), &config)?;
        let capacity = mapping.capacity() as u64;
        let (published, consumed) = {
            let header = mapping.header();
            (
                header.load_acquire(HeaderField::PublisherSequence),
                header.load_acquire(HeaderField::SubscriberSequence),
            )
        };

        Ok(Self {
            max_payload: layout::max_payload_len(mapping.capacity()),
            mapping,
            capacity,
            wait: config.wait,
            write_offset: published,
            next_wrap_boundary: layout::lap_end(published, capacity),
            gate: SubscriberGate::new(capacity, consumed),
            last_consumed_sequence: consumed,
        })
    }

    /// Opens a transport with default settings and the given capacity.
    ///
    /// # Errors
    /// See [`RingTransport::open`].
    pub fn create(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        Self::open(path, TransportConfig::with_capacity(capacity))
    }

    /// Publishes a record using the configured wait strategy.
    ///
    /// # Returns
    /// The logical offset the record was written at, or `None` for an empty
    /// payload, which is not written.
    ///
    /// # Errors
    /// Returns `PayloadTooLarge` if the payload can never fit, or
    /// `WouldBlock` if a bounded wait strategy expired.
    #[inline]
    pub fn publish(&mut self, payload: &[u8]) -> Result<Option<u64>> {
        self.publish_with(payload, self.wait)
    }

    /// Publishes a record only if space is available right now.
    ///
    /// # Errors
    /// See [`RingTransport::publish_with`].
    #[inline]
    pub fn try_publish(&mut self, payload: &[u8]) -> Result<Option<u64>> {
        self.publish_with(payload, WaitStrategy::NoWait)
    }

    /// Publishes a record, spinning at most `timeout` for the consumer.
    ///
    /// # Errors
    /// See [`RingTransport::publish_with`].
    #[inline]
    pub fn publish_timeout(&mut self, payload: &[u8], timeout: Duration) -> Result<Option<u64>> {
        self.publish_with(payload, WaitStrategy::SpinFor(timeout))
    }

    /// Publishes a record with an explicit wait strategy.
    ///
    /// A record that would straddle the end of the lap is preceded by a
    /// forwarding header covering the rest of the lap. The forward is
    /// reserved and written first, once the consumer has drained up to it,
    /// so a `WouldBlock` may leave it behind. The ring stays consistent
    /// either way: the consumer follows the forward and a later publish
    /// places the record at the lap start. No record space is reserved
    /// until the consumer has made room for the whole record.
    ///
    /// # Errors
    /// Returns `PayloadTooLarge` if the payload exceeds
    /// [`RingTransport::max_payload_len`], or `WouldBlock` if `wait` gave up.
    ///
    /// # Panics
    /// Panics in debug builds if another producer reserved space
    /// concurrently.
    pub fn publish_with(&mut self, payload: &[u8], wait: WaitStrategy) -> Result<Option<u64>> {
        if payload.is_empty() {
            return Ok(None);
        }
        if payload.len() > self.max_payload {
            return Err(TransportError::payload_too_large(
                payload.len(),
                self.max_payload,
            ));
        }

        let padded = layout::record_len(payload.len()) as u64;
        let header = self.mapping.header();
        let data = self.mapping.data();

        while self.write_offset >= self.next_wrap_boundary {
            self.next_wrap_boundary += self.capacity;
        }

        if self.write_offset + padded > self.next_wrap_boundary {
            // The record would straddle the end of the lap: point the
            // consumer from the current slot to the next lap start.
            let lap_end = self.next_wrap_boundary;
            let skip = lap_end - self.write_offset;
            self.gate.acquire(&header, lap_end, wait)?;

            let stale_offset = header.fetch_add(HeaderField::PublisherSequence, skip);
            debug_assert_eq!(
                stale_offset, self.write_offset,
                "another producer reserved space on a single-producer ring"
            );
            let stale = data.slot(stale_offset);
            data.store_header_release(stale, -(skip as i64));
            tracing::trace!(
                "{} wrapped: forwarding {} bytes from slot {} [{}]",
                self.mapping.path().display(),
                skip,
                stale,
                stale_offset
            );

            self.write_offset = lap_end;
            self.next_wrap_boundary = lap_end + self.capacity;
        }

        self.gate.acquire(&header, self.write_offset + padded, wait)?;
        let offset = header.fetch_add(HeaderField::PublisherSequence, padded);
        debug_assert_eq!(
            offset, self.write_offset,
            "another producer reserved space on a single-producer ring"
        );

        let slot = data.slot(offset);
        data.write_payload(slot, payload);
        data.store_header_release(slot, payload.len() as i64);
        self.write_offset = offset + padded;

        Ok(Some(offset))
    }

    /// Delivers the next record, if any, to `receiver`.
    ///
    /// Never blocks. The payload view is only valid during the call; the
    /// record is zeroed and handed back to the producer as soon as
    /// `receiver` returns.
    ///
    /// # Returns
    /// The payload length, or 0 if no record was available.
    ///
    /// # Panics
    /// Panics if the ring holds a record header no producer could have
    /// written, which means the backing file is corrupt or stale.
    #[inline]
    pub fn poll<F>(&mut self, receiver: F) -> usize
    where
        F: FnOnce(&[u8]),
    {
        let header = self.mapping.header();
        let data = self.mapping.data();

        let mut slot = data.slot(self.last_consumed_sequence);
        let mut value = data.load_header_acquire(slot);
        while value < 0 {
            let skip = value.unsigned_abs();
            if skip > self.capacity || skip % CACHE_LINE_SIZE as u64 != 0 {
                corrupt_record(self.mapping.path(), self.last_consumed_sequence, value);
            }
            data.clear_record(slot, RECORD_HEADER_LEN);
            self.last_consumed_sequence += skip;
            header.store_release(HeaderField::SubscriberSequence, self.last_consumed_sequence);
            tracing::trace!(
                "{} followed forwarding pointer to [{}]",
                self.mapping.path().display(),
                self.last_consumed_sequence
            );

            slot = data.slot(self.last_consumed_sequence);
            value = data.load_header_acquire(slot);
        }

        if value == 0 {
            return 0;
        }
        let len = value as usize;
        if len > self.max_payload {
            corrupt_record(self.mapping.path(), self.last_consumed_sequence, value);
        }

        receiver(data.payload(slot, len));

        let padded = layout::record_len(len);
        data.clear_record(slot, padded);
        self.last_consumed_sequence += padded as u64;
        header.store_release(HeaderField::SubscriberSequence, self.last_consumed_sequence);

        len
    }

    /// Polls the next record and copies it out.
    ///
    /// # Returns
    /// The payload, or `None` if no record was available.
    pub fn poll_bytes(&mut self) -> Option<Bytes> {
        let mut out = None;
        self.poll(|payload| out = Some(Bytes::copy_from_slice(payload)));
        out
    }

    /// Polls until the ring is empty, handing each record to `receiver`.
    ///
    /// # Returns
    /// The number of records consumed.
    pub fn drain<F>(&mut self, mut receiver: F) -> usize
    where
        F: FnMut(&[u8]),
    {
        let mut count = 0;
        while self.poll(&mut receiver) != 0 {
            count += 1;
        }
        count
    }

    /// Returns the capacity of the data region in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Returns the largest payload a single record can carry.
    #[must_use]
    pub fn max_payload_len(&self) -> usize {
        self.max_payload
    }

    /// Returns the total bytes ever reserved by the producer.
    #[must_use]
    pub fn publisher_sequence(&self) -> u64 {
        self.mapping
            .header()
            .load_acquire(HeaderField::PublisherSequence)
    }

    /// Returns the logical offset the consumer has drained up to.
    #[must_use]
    pub fn subscriber_sequence(&self) -> u64 {
        self.mapping
            .header()
            .load_acquire(HeaderField::SubscriberSequence)
    }

    /// Returns the number of reserved bytes not yet drained by the consumer.
    #[must_use]
    pub fn pending_bytes(&self) -> u64 {
        self.publisher_sequence()
            .saturating_sub(self.subscriber_sequence())
    }

    /// Returns this side's private read cursor.
    #[must_use]
    pub fn read_position(&self) -> u64 {
        self.last_consumed_sequence
    }

    /// Returns the logical offset this side's next reservation starts at.
    #[must_use]
    pub fn write_position(&self) -> u64 {
        self.write_offset
    }

    /// Returns the default wait strategy used by [`RingTransport::publish`].
    #[must_use]
    pub fn wait_strategy(&self) -> WaitStrategy {
        self.wait
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.mapping.path()
    }

    /// Flushes the mapping to the backing file.
    ///
    /// # Errors
    /// Returns IO error if flush fails.
    pub fn flush(&self) -> Result<()> {
        self.mapping.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for RingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingTransport")
            .field("path", &self.mapping.path())
            .field("capacity", &self.capacity)
            .field("write_offset", &self.write_offset)
            .field("next_wrap_boundary", &self.next_wrap_boundary)
            .field("last_consumed_sequence", &self.last_consumed_sequence)
            .finish()
    }
}

#[cold]
#[inline(never)]
fn corrupt_record(path: &Path, offset: u64, value: i64) -> ! {
    tracing::error!(
        "Corrupt record header {} at [{}] in {}",
        value,
        offset,
        path.display()
    );
    panic!(
        "corrupt record header {value} at offset {offset} in {}",
        path.display()
    );
}
