use crate::{
    DeliveryState, DriverError, ErasePlan, ManagedFlashArea, RawFlashOps, RegionInfo, RegionMap,
    StorageError, StorageInfo, WriteBlock, WORD_SIZE,
};

/// The word written to offset 0 of the region to retire a delivered coredump.
pub const EMPTY_MARKER: u32 = 0;

/// State of the first word of the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// The region is erased, nothing was captured since.
    Erased,
    /// A coredump was stored and later retired by a clear.
    Cleared,
    /// The region holds data that was not cleared yet.
    Present,
}

/// Coredump storage on a fixed region of internal flash.
///
/// The storage is used from two execution contexts which are never active at
/// the same time:
///
/// - **Crash time**: [`read`](Self::read), [`erase`](Self::erase) and
///   [`buffered_write`](Self::buffered_write) (and their `try_` variants) go
///   straight to the [`RawFlashOps`] capability. They do not log, lock or
///   allocate, and never panic.
/// - **Runtime**: [`read_delivered_aware`](Self::read_delivered_aware) and
///   [`clear`](Self::clear) are used by the upload pipeline. Clearing goes
///   through the [`ManagedFlashArea`] capability and reports failures through
///   `tracing`.
///
/// There is one storage per coredump region. It owns the [`DeliveryState`] of
/// that region.
#[derive(Debug)]
pub struct CoredumpStorage<F, A> {
    region: RegionInfo,
    area_id: u32,
    flash: F,
    area: A,
    delivery: DeliveryState,
}

impl<F: RawFlashOps, A: ManagedFlashArea> CoredumpStorage<F, A> {
    /// Create the storage for `region`, which the flash area abstraction knows as `area_id`.
    pub fn new(region: RegionInfo, area_id: u32, flash: F, area: A) -> Result<Self, StorageError> {
        region.validate()?;

        Ok(Self {
            region,
            area_id,
            flash,
            area,
            delivery: DeliveryState::new(),
        })
    }

    /// Create the storage for the region the `map` resolves `area_id` to.
    pub fn from_region_map(
        map: &(impl RegionMap + ?Sized),
        area_id: u32,
        flash: F,
        area: A,
    ) -> Result<Self, StorageError> {
        let region = map
            .resolve(area_id)
            .ok_or(StorageError::UnknownRegion { id: area_id })?;

        tracing::debug!(
            "Coredump region {}: {:#010x}..{:#010x}",
            area_id,
            region.base_address,
            region.end()
        );

        Self::new(region, area_id, flash, area)
    }

    /// Capacity of the region.
    pub fn info(&self) -> StorageInfo {
        StorageInfo {
            size: self.region.size,
        }
    }

    /// The region this storage writes to.
    pub fn region(&self) -> RegionInfo {
        self.region
    }

    /// Returns true if `offset..offset + length` lies within the region.
    pub fn within_bounds(&self, offset: u32, length: usize) -> bool {
        self.region.contains(offset, length)
    }

    /// Returns true if a coredump of `required` bytes fits into the region.
    pub fn check_size(&self, required: usize) -> bool {
        let fits = self.within_bounds(0, required);
        if !fits {
            tracing::warn!(
                "Coredump storage is too small: {} bytes required, {} available",
                required,
                self.region.size
            );
        }
        fits
    }

    // Crash path

    /// Copy `data.len()` bytes at `offset` out of the memory mapped region.
    pub fn try_read(&self, offset: u32, data: &mut [u8]) -> Result<(), StorageError> {
        self.region.check(offset, data.len())?;
        self.flash.read_mapped(self.region.address(offset), data);
        Ok(())
    }

    /// Crash-time read. See [`CoredumpStorage::try_read`].
    pub fn read(&self, offset: u32, data: &mut [u8]) -> bool {
        self.try_read(offset, data).is_ok()
    }

    /// Erase the pages covering `length` bytes at the page aligned `offset`.
    ///
    /// Always erases `ceil(length / page_size)` whole pages. Pages erased before
    /// a hardware failure stay erased.
    pub fn try_erase(&mut self, offset: u32, length: usize) -> Result<(), StorageError> {
        let plan = ErasePlan::new(&self.region, offset, length, self.flash.page_size())?;

        for address in plan.page_addresses() {
            self.flash.erase_page(address);
        }

        Ok(())
    }

    /// Crash-time erase. See [`CoredumpStorage::try_erase`].
    pub fn erase(&mut self, offset: u32, length: usize) -> bool {
        self.try_erase(offset, length).is_ok()
    }

    /// Program a whole write block at its offset.
    ///
    /// The destination must have been erased before.
    pub fn try_buffered_write<const WORDS: usize>(
        &mut self,
        block: &WriteBlock<WORDS>,
    ) -> Result<(), StorageError> {
        self.region
            .check(block.write_offset, WriteBlock::<WORDS>::WRITE_SIZE)?;

        self.flash
            .program_words(self.region.address(block.write_offset), &block.data);
        Ok(())
    }

    /// Crash-time write. See [`CoredumpStorage::try_buffered_write`].
    pub fn buffered_write<const WORDS: usize>(&mut self, block: &WriteBlock<WORDS>) -> bool {
        self.try_buffered_write(block).is_ok()
    }

    // Runtime path

    /// Read for the upload pipeline.
    ///
    /// Once the coredump has been delivered, the buffer is zero filled and no
    /// flash access happens. Before that, this behaves like [`CoredumpStorage::read`].
    pub fn read_delivered_aware(&self, offset: u32, data: &mut [u8]) -> bool {
        if self.delivery.is_delivered() {
            data.fill(0);
            return true;
        }

        self.read(offset, data)
    }

    /// Retire the stored coredump after it was delivered.
    ///
    /// Writes [`EMPTY_MARKER`] at offset 0 through the managed flash area and
    /// marks the coredump as delivered. On failure the delivery state stays
    /// untouched, so a later call can retry.
    pub fn try_clear(&mut self) -> Result<(), StorageError> {
        let mut handle = self
            .area
            .open(self.area_id)
            .map_err(|source| StorageError::DeviceOpen {
                id: self.area_id,
                source,
            })?;

        self.area
            .write(&mut handle, 0, &EMPTY_MARKER.to_le_bytes())
            .map_err(|source: DriverError| StorageError::DeviceWrite { offset: 0, source })?;

        self.delivery.mark_delivered();
        tracing::debug!("Coredump storage {} cleared", self.area_id);
        Ok(())
    }

    /// Runtime clear. Failures are logged and reported as `false`.
    pub fn clear(&mut self) -> bool {
        match self.try_clear() {
            Ok(()) => true,
            Err(error) => {
                match &error {
                    StorageError::DeviceOpen { source, .. } => {
                        tracing::error!("Unable to open coredump storage: {:#x}", source.0)
                    }
                    StorageError::DeviceWrite { source, .. } => {
                        tracing::error!("Unable to clear storage: {:#x}", source.0)
                    }
                    other => tracing::error!("Unable to clear storage: {}", other),
                }
                false
            }
        }
    }

    /// Returns true once the stored coredump was delivered and cleared.
    pub fn is_delivered(&self) -> bool {
        self.delivery.is_delivered()
    }

    /// The delivery state of this region.
    pub fn delivery(&self) -> &DeliveryState {
        &self.delivery
    }

    /// Start a new capture: reads stop being suppressed.
    ///
    /// The producer calls this before writing a new coredump. Writing to the
    /// region does not reset the delivery state on its own.
    pub fn begin_capture(&self) {
        self.delivery.reset();
    }

    /// Classify the first word of the region.
    pub fn marker(&self) -> Marker {
        let mut word = [0u8; WORD_SIZE];
        if !self.read(0, &mut word) {
            return Marker::Erased;
        }

        let erased = [self.flash.erased_byte_value(); WORD_SIZE];
        if word == erased {
            Marker::Erased
        } else if u32::from_le_bytes(word) == EMPTY_MARKER {
            Marker::Cleared
        } else {
            Marker::Present
        }
    }

    /// Returns true if the region holds a coredump that still has to be delivered.
    pub fn has_pending_coredump(&self) -> bool {
        !self.is_delivered() && self.marker() == Marker::Present
    }

    /// The raw flash capability.
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// The managed flash area capability.
    pub fn area(&self) -> &A {
        &self.area
    }

    /// Mutable access to the managed flash area capability.
    pub fn area_mut(&mut self) -> &mut A {
        &mut self.area
    }
}
