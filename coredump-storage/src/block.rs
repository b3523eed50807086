use static_assertions::const_assert;

/// Size of a flash word in bytes.
pub const WORD_SIZE: usize = core::mem::size_of::<u32>();

/// Number of words in a [`DefaultWriteBlock`].
pub const DEFAULT_WRITE_WORDS: usize = 8;

/// Size in bytes of a [`DefaultWriteBlock`].
pub const DEFAULT_WRITE_SIZE: usize = DEFAULT_WRITE_WORDS * WORD_SIZE;

const_assert!(DEFAULT_WRITE_WORDS > 0);
const_assert!(DEFAULT_WRITE_SIZE % WORD_SIZE == 0);

/// A word aligned buffer together with the region offset it is written to.
///
/// This is the unit the crash-time writer programs. The block holds `WORDS`
/// 32 bit words, so its byte size is a multiple of the word size by
/// construction. Bytes map onto words in little endian order, matching the
/// layout of the words once they are programmed.
///
/// A block must hold at least one word. An empty block is rejected when the
/// program is built:
///
/// ```compile_fail
/// use coredump_storage::WriteBlock;
///
/// let block = WriteBlock::<0>::new(0, 0xFF);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBlock<const WORDS: usize = DEFAULT_WRITE_WORDS> {
    /// Offset of the first byte of the block within the region.
    pub write_offset: u32,
    /// The words to program.
    pub data: [u32; WORDS],
}

/// The write block used unless a platform picks a different size.
pub type DefaultWriteBlock = WriteBlock<DEFAULT_WRITE_WORDS>;

impl<const WORDS: usize> WriteBlock<WORDS> {
    /// Size of the block in bytes.
    pub const WRITE_SIZE: usize = {
        assert!(WORDS > 0, "a write block must hold at least one word");
        WORDS * WORD_SIZE
    };

    /// Create a block at `write_offset` holding only the erased pattern.
    pub fn new(write_offset: u32, erased_byte_value: u8) -> Self {
        let _ = Self::WRITE_SIZE;
        Self {
            write_offset,
            data: [u32::from_le_bytes([erased_byte_value; WORD_SIZE]); WORDS],
        }
    }

    /// Create a block at `write_offset` from already assembled words.
    pub const fn from_words(write_offset: u32, data: [u32; WORDS]) -> Self {
        let _ = Self::WRITE_SIZE;
        Self { write_offset, data }
    }

    /// Move the block to `write_offset` and refill it with the erased pattern.
    pub fn reset(&mut self, write_offset: u32, erased_byte_value: u8) {
        *self = Self::new(write_offset, erased_byte_value);
    }

    /// Copy `bytes` into the block starting at byte index `start`.
    ///
    /// Returns the number of bytes copied, which is smaller than `bytes.len()`
    /// when the block ends first.
    pub fn copy_from_bytes(&mut self, start: usize, bytes: &[u8]) -> usize {
        let count = bytes.len().min(Self::WRITE_SIZE.saturating_sub(start));

        for (index, byte) in (start..).zip(&bytes[..count]) {
            let word = &mut self.data[index / WORD_SIZE];
            let mut word_bytes = word.to_le_bytes();
            word_bytes[index % WORD_SIZE] = *byte;
            *word = u32::from_le_bytes(word_bytes);
        }

        count
    }

    /// Byte at `index` in the block, if it exists.
    pub fn byte(&self, index: usize) -> Option<u8> {
        self.data
            .get(index / WORD_SIZE)
            .map(|word| word.to_le_bytes()[index % WORD_SIZE])
    }

    /// Iterate over the bytes of the block in flash order.
    pub fn bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.data.iter().flat_map(|word| word.to_le_bytes())
    }
}
