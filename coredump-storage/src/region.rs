//! Region resolution and bounds checking.
//!
//! All offsets handed to the storage are relative to the start of the
//! coredump region. Before any hardware access, the requested range is
//! checked against the capacity of the region. Ranges that do not fit are
//! rejected, never clamped.

use crate::StorageError;

/// Capacity information handed out to the coredump producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageInfo {
    /// Capacity of the coredump region in bytes.
    pub size: u32,
}

/// Location and capacity of the coredump region.
///
/// Immutable for the lifetime of the process. Build-time layouts can declare
/// this as a `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionInfo {
    /// Absolute address of the first byte of the region.
    pub base_address: u32,
    /// Capacity of the region in bytes.
    pub size: u32,
}

impl RegionInfo {
    /// Create a new region description.
    pub const fn new(base_address: u32, size: u32) -> Self {
        Self { base_address, size }
    }

    /// One past the last absolute address of the region.
    pub fn end(&self) -> u64 {
        u64::from(self.base_address) + u64::from(self.size)
    }

    /// Returns true if `offset..offset + length` lies entirely within the region.
    ///
    /// The sum is computed on 64 bits, so an offset or length close to the
    /// integer limit can not wrap around and pass.
    pub fn contains(&self, offset: u32, length: usize) -> bool {
        let Ok(length) = u64::try_from(length) else {
            return false;
        };
        Self::fits(u64::from(offset), length, self.size)
    }

    fn fits(offset: u64, length: u64, size: u32) -> bool {
        offset
            .checked_add(length)
            .is_some_and(|end| end <= u64::from(size))
    }

    /// Like [`RegionInfo::contains`], but returns the matching error.
    pub fn check(&self, offset: u32, length: usize) -> Result<(), StorageError> {
        if self.contains(offset, length) {
            Ok(())
        } else {
            Err(StorageError::OutOfBounds {
                offset,
                length,
                size: self.size,
            })
        }
    }

    /// Absolute address of `offset`. Only valid for offsets that passed the bounds check.
    pub(crate) fn address(&self, offset: u32) -> u32 {
        self.base_address.wrapping_add(offset)
    }

    pub(crate) fn validate(&self) -> Result<(), StorageError> {
        if self.end() > 1 << 32 {
            return Err(StorageError::InvalidRegion {
                base_address: self.base_address,
                size: self.size,
            });
        }
        Ok(())
    }
}

/// Resolves a logical storage id to the region backing it.
///
/// Usually implemented by the partition manager of the platform.
pub trait RegionMap {
    /// Returns the region registered under `id`, if any.
    fn resolve(&self, id: u32) -> Option<RegionInfo>;
}

impl RegionMap for [(u32, RegionInfo)] {
    fn resolve(&self, id: u32) -> Option<RegionInfo> {
        self.iter()
            .find(|(region_id, _)| *region_id == id)
            .map(|(_, region)| *region)
    }
}

/// The page aligned span covered by an erase request.
///
/// An erase of `length` bytes at `offset` always covers
/// `ceil(length / page_size)` whole pages starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErasePlan {
    start_address: u32,
    page_size: u32,
    pages: u32,
}

impl ErasePlan {
    /// Plan an erase of `length` bytes at `offset` for a flash with `page_size` byte pages.
    ///
    /// Fails if the range is out of bounds, if `offset` is not page aligned,
    /// or if rounding up to whole pages would leave the region.
    pub fn new(
        region: &RegionInfo,
        offset: u32,
        length: usize,
        page_size: u32,
    ) -> Result<Self, StorageError> {
        region.validate()?;
        region.check(offset, length)?;

        if page_size == 0 || offset % page_size != 0 {
            return Err(StorageError::MisalignedErase { offset, page_size });
        }

        // `length` fits into the region, so it fits into 32 bits.
        let length = length as u64;
        let pages = length.div_ceil(u64::from(page_size));
        let span = pages * u64::from(page_size);

        if !RegionInfo::fits(u64::from(offset), span, region.size) {
            return Err(StorageError::OutOfBounds {
                offset,
                length: span as usize,
                size: region.size,
            });
        }

        Ok(Self {
            start_address: region.address(offset),
            page_size,
            pages: pages as u32,
        })
    }

    /// Number of pages to erase.
    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// Number of bytes actually erased.
    pub fn erased_bytes(&self) -> u64 {
        u64::from(self.pages) * u64::from(self.page_size)
    }

    /// Absolute start address of every page to erase.
    pub fn page_addresses(&self) -> impl Iterator<Item = u32> {
        let start_address = self.start_address;
        let page_size = self.page_size;
        (0..self.pages).map(move |page| start_address + page * page_size)
    }
}
