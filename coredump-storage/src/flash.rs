//! Flash capabilities the storage is built on.
//!
//! The same physical region is reached through two disjoint interfaces:
//!
//! - [`RawFlashOps`] talks directly to the flash controller. It is the only
//!   interface used while the system is crashed, so implementations must not
//!   block, lock, allocate or depend on interrupts.
//! - [`ManagedFlashArea`] goes through the operating system's flash area
//!   abstraction. It may block while opening the area, and writes may be
//!   queued and completed later by a driver task.
//!
//! Which one is used is decided by the call site, never at runtime.

use crate::DriverError;

/// Low level, lock-free access to memory mapped internal flash.
///
/// All addresses are absolute. Callers guarantee that every address passed in
/// lies within the coredump region.
pub trait RawFlashOps {
    /// Erase granularity of the flash in bytes.
    fn page_size(&self) -> u32;

    /// The value of a byte in flash that was just erased.
    fn erased_byte_value(&self) -> u8 {
        0xFF
    }

    /// Erase the page starting at `address`.
    fn erase_page(&mut self, address: u32);

    /// Program `words` starting at the word aligned `address`.
    ///
    /// The destination must have been erased before. Words are stored little endian.
    fn program_words(&mut self, address: u32, words: &[u32]);

    /// Copy `data.len()` bytes starting at `address` out of the memory mapped flash.
    fn read_mapped(&self, address: u32, data: &mut [u8]);
}

/// Flash access mediated by the operating system.
pub trait ManagedFlashArea {
    /// An opened flash area.
    type Handle;

    /// Open the flash area registered under the storage id `id`.
    fn open(&mut self, id: u32) -> Result<Self::Handle, DriverError>;

    /// Write `data` at `offset`, relative to the start of the area.
    ///
    /// The write may complete asynchronously after this returns `Ok`.
    fn write(
        &mut self,
        handle: &mut Self::Handle,
        offset: u32,
        data: &[u8],
    ) -> Result<(), DriverError>;
}
