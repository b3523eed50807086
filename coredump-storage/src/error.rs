use thiserror::Error;

/// An error code reported by the OS-mediated flash driver.
///
/// Drivers report negative errno style codes; the value is passed through unchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[error("flash driver reported error code {0}")]
pub struct DriverError(pub i32);

/// Describes any error that can happen while accessing the coredump region.
///
/// Every variant is `Copy` so that crash-time code can produce and inspect
/// errors without allocating.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The requested range does not lie entirely within the region.
    #[error(
        "The range {offset:#x}+{length:#x} does not fit into the {size:#x} byte coredump region."
    )]
    OutOfBounds {
        /// Offset into the region.
        offset: u32,
        /// Length of the access in bytes.
        length: usize,
        /// Capacity of the region.
        size: u32,
    },
    /// An erase did not start on a flash page boundary.
    #[error("The erase offset {offset:#x} is not aligned to the {page_size:#x} byte flash page.")]
    MisalignedErase {
        /// Offset into the region.
        offset: u32,
        /// Page size reported by the flash device.
        page_size: u32,
    },
    /// A buffered coredump write went backwards past data that was already staged.
    #[error("The write at {offset:#x} lies before already written data ending at {next_offset:#x}.")]
    NonSequentialWrite {
        /// Offset of the rejected write.
        offset: u32,
        /// First offset the writer still accepts.
        next_offset: u32,
    },
    /// The region map has no entry for the storage id.
    #[error("No coredump region is registered for storage id {id}.")]
    UnknownRegion {
        /// The storage id that was looked up.
        id: u32,
    },
    /// The resolved region does not fit into the 32 bit address space.
    #[error("The coredump region at {base_address:#010x} with size {size:#x} exceeds the address space.")]
    InvalidRegion {
        /// Base address of the region.
        base_address: u32,
        /// Declared size of the region.
        size: u32,
    },
    /// The managed flash area could not be opened.
    #[error("Unable to open coredump storage area {id}")]
    DeviceOpen {
        /// The storage id of the area.
        id: u32,
        /// The driver error.
        #[source]
        source: DriverError,
    },
    /// A write through the managed flash area failed.
    #[error("Unable to write coredump storage at offset {offset:#x}")]
    DeviceWrite {
        /// Offset into the region.
        offset: u32,
        /// The driver error.
        #[source]
        source: DriverError,
    },
}

impl StorageError {
    /// Returns true if the error was reported by the underlying flash driver.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            StorageError::DeviceOpen { .. } | StorageError::DeviceWrite { .. }
        )
    }
}
