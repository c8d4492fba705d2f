//! Fixed layout of the mapped ring file.
//!
//! ```text
//! +---------------------------+ 0
//! | line 0: magic, capacity   |
//! | line 1: publisher seq     | 64
//! | line 2: (padding)         | 128
//! | line 3: subscriber seq    | 192
//! +---------------------------+ 256 = HEADER_SIZE
//! | data region (CAPACITY)    |
//! +---------------------------+ HEADER_SIZE + CAPACITY
//! ```
//!
//! Each record in the data region starts with a [`RECORD_HEADER_LEN`]-byte
//! header whose first eight bytes hold an `i64`: zero for an empty slot, a
//! positive payload length, or a negative forwarding skip.

/// Cache line size assumed for padding.
pub const CACHE_LINE_SIZE: usize = 64;

/// Size of the control block preceding the data region.
pub const HEADER_SIZE: usize = CACHE_LINE_SIZE * 4;

/// Length reserved for each record header.
pub const RECORD_HEADER_LEN: usize = CACHE_LINE_SIZE;

/// Smallest accepted data region: one record header plus one payload line.
pub const MIN_CAPACITY: usize = RECORD_HEADER_LEN * 2;

/// Marker written to a freshly initialised file.
pub const LAYOUT_MAGIC: u64 = u64::from_le_bytes(*b"IRNRING1");

/// Marker held while the first opener stamps the layout.
pub const LAYOUT_PENDING: u64 = u64::from_le_bytes(*b"IRNRING0");

/// Required alignment of the mapped region.
pub const REGION_ALIGN: usize = 8;

/// Fields of the control block, each at a fixed byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    /// Layout marker, set once by the creating side.
    Magic,
    /// Data region capacity, set once by the creating side.
    Capacity,
    /// Bytes ever reserved by the producer.
    PublisherSequence,
    /// Logical offset up to which the consumer has drained the ring.
    SubscriberSequence,
}

impl HeaderField {
    /// Returns the byte offset of the field within the control block.
    #[inline(always)]
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            Self::Magic => 0,
            Self::Capacity => 8,
            Self::PublisherSequence => CACHE_LINE_SIZE,
            Self::SubscriberSequence => CACHE_LINE_SIZE * 3,
        }
    }
}

/// Rounds `len` up to the next cache line multiple.
#[inline(always)]
#[must_use]
pub const fn pad_to_cache_line(len: usize) -> usize {
    (len + CACHE_LINE_SIZE - 1) & !(CACHE_LINE_SIZE - 1)
}

/// Returns the padded length of a record carrying `payload_len` bytes.
#[inline(always)]
#[must_use]
pub const fn record_len(payload_len: usize) -> usize {
    pad_to_cache_line(payload_len + RECORD_HEADER_LEN)
}

/// Returns the largest payload a ring of `capacity` bytes can carry.
#[inline]
#[must_use]
pub const fn max_payload_len(capacity: usize) -> usize {
    capacity - RECORD_HEADER_LEN
}

/// Returns the logical offset at which the lap containing `offset` ends.
#[inline]
#[must_use]
pub const fn lap_end(offset: u64, capacity: u64) -> u64 {
    (offset & !(capacity - 1)) + capacity
}

/// Total length of the backing file for a data region of `capacity` bytes.
#[inline]
#[must_use]
pub const fn region_len(capacity: usize) -> usize {
    HEADER_SIZE + capacity
}

/// Validates a requested data region capacity.
///
/// # Errors
/// Returns a description of the violated constraint.
pub fn validate_capacity(capacity: usize) -> Result<(), String> {
    if !capacity.is_power_of_two() {
        return Err(format!("capacity {capacity} is not a power of two"));
    }
    if capacity < MIN_CAPACITY {
        return Err(format!(
            "capacity {capacity} is below the minimum of {MIN_CAPACITY} bytes"
        ));
    }
    if capacity > i64::MAX as usize {
        return Err(format!("capacity {capacity} does not fit a record header"));
    }
    Ok(())
}
