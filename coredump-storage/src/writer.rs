use crate::{
    CoredumpStorage, ManagedFlashArea, RawFlashOps, StorageError, WriteBlock, DEFAULT_WRITE_WORDS,
};

/// Stages arbitrary coredump writes into word aligned [`WriteBlock`]s.
///
/// The coredump producer emits its data in small, unaligned pieces. The writer
/// collects them in a single block and programs the block once it is full or
/// once a write moves on to a different block. Writes must come in increasing
/// offset order, because flash that was programmed can not be programmed again
/// without an erase.
///
/// The writer lives on the stack and never allocates or logs, so it can be used
/// while the system is crashed.
pub struct CoredumpWriter<'storage, F, A, const WORDS: usize = DEFAULT_WRITE_WORDS> {
    storage: &'storage mut CoredumpStorage<F, A>,
    block: WriteBlock<WORDS>,
    dirty: bool,
    next_offset: u32,
}

impl<'storage, F: RawFlashOps, A: ManagedFlashArea, const WORDS: usize>
    CoredumpWriter<'storage, F, A, WORDS>
{
    /// Start writing at the beginning of the region.
    pub fn new(storage: &'storage mut CoredumpStorage<F, A>) -> Self {
        let erased = storage.flash().erased_byte_value();
        Self {
            storage,
            block: WriteBlock::new(0, erased),
            dirty: false,
            next_offset: 0,
        }
    }

    /// The first offset that can still be written.
    pub fn next_offset(&self) -> u32 {
        self.next_offset
    }

    /// Stage `data` at `offset`, programming every block that gets completed.
    pub fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError> {
        self.storage.region().check(offset, data.len())?;

        if offset < self.next_offset {
            return Err(StorageError::NonSequentialWrite {
                offset,
                next_offset: self.next_offset,
            });
        }

        let block_size = WriteBlock::<WORDS>::WRITE_SIZE;

        // Whole blocks get programmed, so every block the data touches must fit.
        if !data.is_empty() {
            let size = block_size as u64;
            let start = u64::from(offset) / size * size;
            let end = (u64::from(offset) + data.len() as u64).div_ceil(size) * size;
            self.storage
                .region()
                .check(start as u32, (end - start) as usize)?;
        }

        let mut offset = offset;
        let mut data = data;

        while !data.is_empty() {
            let block_offset = offset - offset % block_size as u32;
            if block_offset != self.block.write_offset {
                self.flush()?;
                let erased = self.storage.flash().erased_byte_value();
                self.block.reset(block_offset, erased);
            }

            let start = (offset - block_offset) as usize;
            let copied = self.block.copy_from_bytes(start, data);
            self.dirty = true;

            offset += copied as u32;
            data = &data[copied..];
            self.next_offset = offset;

            if start + copied == block_size {
                self.flush()?;
            }
        }

        Ok(())
    }

    /// Program the staged block, padded with the erased byte value.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        if self.dirty {
            self.storage.try_buffered_write(&self.block)?;
            self.dirty = false;
        }
        Ok(())
    }

    /// Program the last partial block and hand the storage back.
    pub fn finish(mut self) -> Result<(), StorageError> {
        self.flush()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fake_flash::FakeFlash;
    use crate::RegionInfo;
    use pretty_assertions::assert_eq;

    fn storage() -> (CoredumpStorage<FakeFlash, crate::fake_flash::FakeFlashArea>, FakeFlash) {
        let flash = FakeFlash::new(0x8000, 256, 64, 0xFF, 1);
        let storage =
            CoredumpStorage::new(RegionInfo::new(0x8000, 256), 1, flash.clone(), flash.area())
                .unwrap();
        (storage, flash)
    }

    #[test]
    fn small_writes_are_staged_until_block_is_full() {
        let (mut storage, flash) = storage();
        let mut writer = CoredumpWriter::<_, _, 2>::new(&mut storage);

        writer.write(0, &[1, 2, 3]).unwrap();
        assert_eq!(flash.programmed_words(), 0);

        writer.write(3, &[4, 5, 6, 7, 8]).unwrap();
        assert_eq!(flash.programmed_words(), 2);

        writer.write(8, &[9]).unwrap();
        writer.finish().unwrap();

        assert_eq!(flash.programmed_words(), 4);
        assert_eq!(
            flash.peek(0, 12),
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn large_write_spans_blocks() {
        let (mut storage, flash) = storage();
        let data: Vec<u8> = (0..40).collect();

        let mut writer = CoredumpWriter::<_, _>::new(&mut storage);
        writer.write(4, &data).unwrap();
        assert_eq!(writer.next_offset(), 44);
        writer.finish().unwrap();

        assert_eq!(flash.peek(0, 4), vec![0xFF; 4]);
        assert_eq!(flash.peek(4, 40), data);
        assert_eq!(flash.peek(44, 20), vec![0xFF; 20]);
    }

    #[test]
    fn gap_flushes_the_previous_block() {
        let (mut storage, flash) = storage();
        let mut writer = CoredumpWriter::<_, _, 2>::new(&mut storage);

        writer.write(0, &[0xAA]).unwrap();
        writer.write(100, &[0xBB]).unwrap();
        assert_eq!(flash.programmed_words(), 2);
        writer.finish().unwrap();

        assert_eq!(flash.peek(0, 1), vec![0xAA]);
        assert_eq!(flash.peek(100, 1), vec![0xBB]);
    }

    #[test]
    fn rewinding_is_rejected() {
        let (mut storage, _flash) = storage();
        let mut writer = CoredumpWriter::<_, _>::new(&mut storage);

        writer.write(10, &[1, 2]).unwrap();
        assert_eq!(
            writer.write(11, &[3]),
            Err(StorageError::NonSequentialWrite {
                offset: 11,
                next_offset: 12
            })
        );
    }

    #[test]
    fn partial_block_at_region_end_is_rejected() {
        let flash = FakeFlash::new(0x8000, 4100, 4, 0xFF, 1);
        let mut storage =
            CoredumpStorage::new(RegionInfo::new(0x8000, 4100), 1, flash.clone(), flash.area())
                .unwrap();
        let mut writer = CoredumpWriter::<_, _>::new(&mut storage);

        writer.write(4064, &[7; 32]).unwrap();
        assert_eq!(
            writer.write(4096, &[1, 2, 3, 4]),
            Err(StorageError::OutOfBounds {
                offset: 4096,
                length: 32,
                size: 4100
            })
        );
        assert_eq!(writer.next_offset(), 4096);
        writer.finish().unwrap();

        assert_eq!(flash.peek(4064, 32), vec![7; 32]);
        assert_eq!(flash.peek(4096, 4), vec![0xFF; 4]);
    }

    #[test]
    fn write_past_region_is_rejected() {
        let (mut storage, flash) = storage();
        let mut writer = CoredumpWriter::<_, _>::new(&mut storage);

        assert!(matches!(
            writer.write(250, &[0; 8]),
            Err(StorageError::OutOfBounds { .. })
        ));
        writer.finish().unwrap();
        assert_eq!(flash.programmed_words(), 0);
    }
}
