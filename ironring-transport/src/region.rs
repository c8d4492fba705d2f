//! Typed views over the mapped ring.
//!
//! [`AtomicRegion`] covers the control block and only allows atomic access to
//! the fixed [`HeaderField`] offsets. [`DataRegion`] covers the circular data
//! area and bounds-checks every record access against the capacity.

use crate::layout::{HEADER_SIZE, HeaderField, RECORD_HEADER_LEN};
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Atomic view of the control block.
#[derive(Clone, Copy)]
pub struct AtomicRegion<'a> {
    base: NonNull<u8>,
    _mapping: PhantomData<&'a [u8]>,
}

impl<'a> AtomicRegion<'a> {
    /// Creates a view over a control block starting at `base`.
    ///
    /// # Safety
    /// `base` must be 8-byte aligned, valid for reads and writes of
    /// [`HEADER_SIZE`] bytes for `'a`, and only accessed atomically at the
    /// [`HeaderField`] offsets by every process sharing it.
    pub(crate) unsafe fn new(base: NonNull<u8>) -> Self {
        Self {
            base,
            _mapping: PhantomData,
        }
    }

    #[inline(always)]
    fn cell(&self, field: HeaderField) -> &'a AtomicU64 {
        debug_assert!(field.offset() + 8 <= HEADER_SIZE);
        // SAFETY: field offsets are 8-aligned and inside the control block,
        // which outlives 'a per the constructor contract.
        unsafe { AtomicU64::from_ptr(self.base.as_ptr().add(field.offset()).cast()) }
    }

    /// Atomically adds `n` to a field and returns the previous value.
    ///
    /// Sequentially consistent: this is the sole arbiter of space allocation.
    #[inline(always)]
    pub fn fetch_add(&self, field: HeaderField, n: u64) -> u64 {
        self.cell(field).fetch_add(n, Ordering::SeqCst)
    }

    /// Loads a field with acquire semantics.
    #[inline(always)]
    #[must_use]
    pub fn load_acquire(&self, field: HeaderField) -> u64 {
        self.cell(field).load(Ordering::Acquire)
    }

    /// Stores a field with release semantics.
    #[inline(always)]
    pub fn store_release(&self, field: HeaderField, value: u64) {
        self.cell(field).store(value, Ordering::Release);
    }

    /// Replaces a field with `new` if it still holds `current`.
    ///
    /// Returns the previous value, as `Ok` on success and `Err` otherwise.
    #[inline]
    pub fn compare_exchange(
        &self,
        field: HeaderField,
        current: u64,
        new: u64,
    ) -> Result<u64, u64> {
        self.cell(field)
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire)
    }
}

/// Bounds-checked view of the circular data region.
#[derive(Clone, Copy)]
pub struct DataRegion<'a> {
    base: NonNull<u8>,
    capacity: usize,
    mask: u64,
    _mapping: PhantomData<&'a [u8]>,
}

impl<'a> DataRegion<'a> {
    /// Creates a view over `capacity` bytes starting at `base`.
    ///
    /// # Safety
    /// `base` must be 8-byte aligned and valid for reads and writes of
    /// `capacity` bytes for `'a`. `capacity` must be a power of two. Callers
    /// must follow the ring protocol so that plain payload accesses never
    /// race with the peer.
    pub(crate) unsafe fn new(base: NonNull<u8>, capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            base,
            capacity,
            mask: (capacity - 1) as u64,
            _mapping: PhantomData,
        }
    }

    /// Returns the capacity of the data region in bytes.
    #[inline(always)]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Translates a logical offset into a physical slot.
    #[inline(always)]
    #[must_use]
    pub fn slot(&self, offset: u64) -> usize {
        (offset & self.mask) as usize
    }

    #[inline(always)]
    fn header_cell(&self, slot: usize) -> &'a AtomicI64 {
        assert!(
            slot % RECORD_HEADER_LEN == 0 && slot + 8 <= self.capacity,
            "record header slot {slot} outside ring of {} bytes",
            self.capacity
        );
        // SAFETY: slot is cache-line aligned and inside the region.
        unsafe { AtomicI64::from_ptr(self.base.as_ptr().add(slot).cast()) }
    }

    /// Loads the record header at `slot` with acquire semantics.
    #[inline(always)]
    #[must_use]
    pub fn load_header_acquire(&self, slot: usize) -> i64 {
        self.header_cell(slot).load(Ordering::Acquire)
    }

    /// Stores the record header at `slot` with release semantics.
    #[inline(always)]
    pub fn store_header_release(&self, slot: usize, value: i64) {
        self.header_cell(slot).store(value, Ordering::Release);
    }

    #[inline(always)]
    fn check_record(&self, slot: usize, len: usize) {
        assert!(
            slot + RECORD_HEADER_LEN + len <= self.capacity,
            "record of {len} bytes at slot {slot} overruns ring of {} bytes",
            self.capacity
        );
    }

    /// Copies `payload` into the record body at `slot`.
    ///
    /// Plain stores: the header at `slot` must not have been published yet.
    #[inline]
    pub fn write_payload(&self, slot: usize, payload: &[u8]) {
        self.check_record(slot, payload.len());
        // SAFETY: bounds checked above; the unpublished record is owned by
        // the producer until its header is released.
        unsafe {
            std::ptr::copy_nonoverlapping(
                payload.as_ptr(),
                self.base.as_ptr().add(slot + RECORD_HEADER_LEN),
                payload.len(),
            );
        }
    }

    /// Returns the body of the record at `slot`.
    ///
    /// The view is only valid until the record is cleared.
    #[inline]
    #[must_use]
    pub fn payload(&self, slot: usize, len: usize) -> &[u8] {
        self.check_record(slot, len);
        // SAFETY: bounds checked above; a published record is not written
        // by the producer until the consumer releases it.
        unsafe {
            std::slice::from_raw_parts(self.base.as_ptr().add(slot + RECORD_HEADER_LEN), len)
        }
    }

    /// Zeroes a whole record of `record_len` bytes, header included.
    ///
    /// The zeroes become visible to the producer through the next release
    /// of the subscriber sequence.
    #[inline]
    pub fn clear_record(&self, slot: usize, record_len: usize) {
        debug_assert!(record_len >= RECORD_HEADER_LEN);
        self.check_record(slot, record_len - RECORD_HEADER_LEN);
        // SAFETY: bounds checked above; the consumed record is owned by the
        // consumer until the subscriber sequence moves past it.
        unsafe {
            std::ptr::write_bytes(self.base.as_ptr().add(slot + 8), 0, record_len - 8);
        }
        self.header_cell(slot).store(0, Ordering::Relaxed);
    }
}
