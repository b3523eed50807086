//! # Crash persistent coredump storage
//!
//! Saves a coredump captured at the moment of a fatal fault into a fixed,
//! pre-provisioned region of internal flash, and lets the upload pipeline read
//! it back and retire it once it was delivered.
//!
//! The region is accessed from two execution contexts:
//!
//! - While the system is crashed, the producer erases, writes and reads the
//!   region through [`RawFlashOps`]: no locks, no heap, no logging.
//! - During normal operation, the consumer reads the region delivery aware and
//!   clears it through [`ManagedFlashArea`], the operating system's flash area
//!   abstraction.
//!
//! # Examples
//!
//! ## Capturing and delivering a coredump
//!
//! ```
//! use coredump_storage::{fake_flash::FakeFlash, CoredumpStorage, CoredumpWriter, RegionInfo};
//!
//! const REGION: RegionInfo = RegionInfo::new(0x000F_8000, 0x1000);
//!
//! let flash = FakeFlash::new(REGION.base_address, REGION.size, 0x100, 0xFF, 3);
//! let mut storage = CoredumpStorage::new(REGION, 3, flash.clone(), flash.area())?;
//!
//! // Crash time.
//! storage.begin_capture();
//! assert!(storage.erase(0, 0x100));
//! let mut writer = CoredumpWriter::<_, _>::new(&mut storage);
//! writer.write(0, b"CORE")?;
//! writer.finish()?;
//!
//! // After the reboot the coredump is uploaded and cleared.
//! let mut magic = [0u8; 4];
//! assert!(storage.read_delivered_aware(0, &mut magic));
//! assert_eq!(&magic, b"CORE");
//!
//! assert!(storage.clear());
//! assert!(storage.read_delivered_aware(0, &mut magic));
//! assert_eq!(magic, [0; 4]);
//! # Ok::<(), coredump_storage::StorageError>(())
//! ```

#![warn(missing_docs)]

mod block;
mod config;
mod delivery;
mod error;
#[cfg(any(test, feature = "test"))]
pub mod fake_flash;
mod flash;
mod platform;
mod region;
mod storage;
mod writer;

pub use block::{DefaultWriteBlock, WriteBlock, DEFAULT_WRITE_SIZE, DEFAULT_WRITE_WORDS, WORD_SIZE};
pub use delivery::DeliveryState;
pub use error::{DriverError, StorageError};
pub use flash::{ManagedFlashArea, RawFlashOps};
pub use platform::PlatformStorage;
pub use region::{ErasePlan, RegionInfo, RegionMap, StorageInfo};
pub use storage::{CoredumpStorage, Marker, EMPTY_MARKER};
pub use writer::CoredumpWriter;
