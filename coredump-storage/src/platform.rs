use crate::{CoredumpStorage, ManagedFlashArea, RawFlashOps, StorageInfo, WriteBlock};

/// The storage interface the coredump producer and consumer are written against.
///
/// Every operation reports success as a plain `bool`. At crash time a `false`
/// means "this step could not be completed, continue best effort".
pub trait PlatformStorage {
    /// Capacity of the coredump region.
    fn get_storage_info(&self) -> StorageInfo;

    /// Raw read, not delivery aware. Crash-time safe.
    fn storage_read(&self, offset: u32, data: &mut [u8]) -> bool;

    /// Erase whole pages from a page aligned offset. Crash-time safe.
    fn storage_erase(&mut self, offset: u32, length: usize) -> bool;

    /// Program one write block. Crash-time safe.
    fn storage_buffered_write<const WORDS: usize>(&mut self, block: &WriteBlock<WORDS>) -> bool;

    /// Retire the stored coredump after delivery. Runtime only.
    fn storage_clear(&mut self) -> bool;

    /// Read that reports an empty region once the coredump was delivered. Runtime only.
    fn delivered_aware_read(&self, offset: u32, data: &mut [u8]) -> bool;

    /// Reset the delivery state before a new capture.
    fn storage_begin_capture(&mut self);
}

impl<F: RawFlashOps, A: ManagedFlashArea> PlatformStorage for CoredumpStorage<F, A> {
    fn get_storage_info(&self) -> StorageInfo {
        self.info()
    }

    fn storage_read(&self, offset: u32, data: &mut [u8]) -> bool {
        self.read(offset, data)
    }

    fn storage_erase(&mut self, offset: u32, length: usize) -> bool {
        self.erase(offset, length)
    }

    fn storage_buffered_write<const WORDS: usize>(&mut self, block: &WriteBlock<WORDS>) -> bool {
        self.buffered_write(block)
    }

    fn storage_clear(&mut self) -> bool {
        self.clear()
    }

    fn delivered_aware_read(&self, offset: u32, data: &mut [u8]) -> bool {
        self.read_delivered_aware(offset, data)
    }

    fn storage_begin_capture(&mut self) {
        self.begin_capture()
    }
}
