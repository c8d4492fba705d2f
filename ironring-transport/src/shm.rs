//! Memory-mapped backing file for a ring.

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::layout::{self, HEADER_SIZE, HeaderField, LAYOUT_MAGIC, LAYOUT_PENDING, REGION_ALIGN};
use crate::region::{AtomicRegion, DataRegion};
use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::time::{Duration, Instant};

/// How long an opener waits for another to finish stamping a fresh file.
const STAMP_TIMEOUT: Duration = Duration::from_millis(250);

/// Shared memory region backed by a file and laid out as a ring.
///
/// Several processes may map the same file; all mutation after
/// initialisation goes through [`AtomicRegion`] and [`DataRegion`].
pub struct SharedMapping {
    mmap: MmapMut,
    base: NonNull<u8>,
    capacity: usize,
    path: PathBuf,
}

// SAFETY: `base` points into `mmap`, which is owned by this value and is
// itself `Send`. The mapping is never unmapped while the value is alive.
unsafe impl Send for SharedMapping {}

impl SharedMapping {
    /// Creates or opens the ring file at `path`.
    ///
    /// A fresh (empty) file is sized and stamped with the layout marker. An
    /// existing file must have been stamped with the same capacity.
    ///
    /// # Arguments
    /// * `path` - Path to the backing file
    /// * `config` - Configuration options
    ///
    /// # Errors
    /// Returns `InvalidConfig` for unusable capacities or regions,
    /// `LayoutMismatch` when the file was created with another capacity,
    /// and `Io` if file operations fail.
    pub fn open(path: &Path, config: &TransportConfig) -> Result<Self> {
        config.validate()?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(config.create)
            .truncate(config.reset)
            .open(path)?;

        let required = layout::region_len(config.capacity) as u64;
        let current = file.metadata()?.len();
        if current == 0 {
            file.set_len(required)?;
        } else if current < required {
            return Err(TransportError::invalid_config(format!(
                "backing file {} is {current} bytes, need {required}",
                path.display()
            )));
        }

        let mut mmap = unsafe { MmapOptions::new().len(required as usize).map_mut(&file)? };
        let base = NonNull::new(mmap.as_mut_ptr())
            .ok_or_else(|| TransportError::invalid_config("mapping returned a null pointer"))?;
        if base.as_ptr() as usize % REGION_ALIGN != 0 {
            return Err(TransportError::invalid_config(format!(
                "mapped region is not {REGION_ALIGN}-byte aligned"
            )));
        }

        let mapping = Self {
            mmap,
            base,
            capacity: config.capacity,
            path: path.to_path_buf(),
        };
        mapping.stamp_layout()?;

        tracing::debug!(
            "Mapped ring {} ({} byte capacity, {} bytes total)",
            mapping.path.display(),
            mapping.capacity,
            mapping.len()
        );
        Ok(mapping)
    }

    /// Writes the layout marker on a fresh file or checks an existing one.
    ///
    /// The first opener claims the file by swapping the marker from zero to
    /// [`LAYOUT_PENDING`]; concurrent openers wait for it to finish before
    /// checking the capacity it stamped.
    fn stamp_layout(&self) -> Result<()> {
        let header = self.header();
        let expected = self.capacity as u64;
        let marker = match header.compare_exchange(HeaderField::Magic, 0, LAYOUT_PENDING) {
            Ok(_) => {
                header.store_release(HeaderField::Capacity, expected);
                header.store_release(HeaderField::Magic, LAYOUT_MAGIC);
                return Ok(());
            }
            Err(LAYOUT_PENDING) => self.wait_for_stamp()?,
            Err(marker) => marker,
        };

        if marker != LAYOUT_MAGIC {
            return Err(TransportError::invalid_config(format!(
                "{} is not a ring file (marker {marker:#018x})",
                self.path.display()
            )));
        }
        let found = header.load_acquire(HeaderField::Capacity);
        if found == expected {
            Ok(())
        } else {
            Err(TransportError::LayoutMismatch { expected, found })
        }
    }

    fn wait_for_stamp(&self) -> Result<u64> {
        let header = self.header();
        let deadline = Instant::now() + STAMP_TIMEOUT;
        loop {
            let marker = header.load_acquire(HeaderField::Magic);
            if marker != LAYOUT_PENDING {
                return Ok(marker);
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    "{} still being initialised after {:?}",
                    self.path.display(),
                    STAMP_TIMEOUT
                );
                return Err(TransportError::invalid_config(format!(
                    "{} was never fully initialised",
                    self.path.display()
                )));
            }
            std::hint::spin_loop();
        }
    }

    /// Returns the atomic view of the control block.
    #[inline(always)]
    #[must_use]
    pub fn header(&self) -> AtomicRegion<'_> {
        // SAFETY: the mapping is at least HEADER_SIZE bytes, aligned, and
        // lives as long as the borrow of self.
        unsafe { AtomicRegion::new(self.base) }
    }

    /// Returns the view of the circular data region.
    #[inline(always)]
    #[must_use]
    pub fn data(&self) -> DataRegion<'_> {
        // SAFETY: the data region follows the control block and spans
        // exactly `capacity` bytes of the mapping.
        unsafe { DataRegion::new(self.base.add(HEADER_SIZE), self.capacity) }
    }

    /// Returns the capacity of the data region in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the total size of the mapping in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the mapping is empty. Never true for a valid ring.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes changes to the backing file.
    ///
    /// # Errors
    /// Returns IO error if flush fails.
    pub fn flush(&self) -> std::io::Result<()> {
        self.mmap.flush()
    }

    /// Flushes changes asynchronously.
    ///
    /// # Errors
    /// Returns IO error if flush fails.
    pub fn flush_async(&self) -> std::io::Result<()> {
        self.mmap.flush_async()
    }
}

impl std::fmt::Debug for SharedMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMapping")
            .field("path", &self.path)
            .field("capacity", &self.capacity)
            .field("len", &self.mmap.len())
            .finish()
    }
}
