#![allow(missing_docs)] // Don't require docs for test code
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use coredump_storage_target::RegionDescription;

use crate::{DriverError, ManagedFlashArea, RawFlashOps, WORD_SIZE};

/// Error code reported when an area id is unknown (`-ENOENT`).
pub const ENOENT: i32 = -2;

#[derive(Debug)]
struct FakeMemory {
    base_address: u32,
    page_size: u32,
    erased_byte_value: u8,
    bytes: Vec<u8>,

    area_id: u32,
    open_error: Option<DriverError>,
    write_error: Option<DriverError>,
    defer_writes: bool,
    pending_writes: VecDeque<(u32, Vec<u8>)>,

    erased_pages: Vec<u32>,
    programmed_words: usize,
    mapped_reads: usize,
    area_writes: usize,
}

impl FakeMemory {
    fn index(&self, address: u32, length: usize) -> std::ops::Range<usize> {
        let start = address
            .checked_sub(self.base_address)
            .unwrap_or_else(|| panic!("address {address:#010x} is below the fake flash"))
            as usize;
        assert!(
            start + length <= self.bytes.len(),
            "access {address:#010x}+{length:#x} is past the end of the fake flash"
        );
        start..start + length
    }

    /// NOR flash programming can only clear bits.
    fn program(&mut self, address: u32, data: &[u8]) {
        let range = self.index(address, data.len());
        for (cell, byte) in self.bytes[range].iter_mut().zip(data) {
            *cell &= *byte;
        }
    }
}

/// This is a fake memory mapped flash which can be used in tests or for dry runs.
///
/// It covers exactly one region. Cloning a `FakeFlash` shares the backing
/// bytes, and [`FakeFlash::area`] hands out a [`FakeFlashArea`] writing to the
/// same bytes, like the raw and the OS-mediated interface of a real device.
#[derive(Debug, Clone)]
pub struct FakeFlash {
    memory: Rc<RefCell<FakeMemory>>,
}

impl FakeFlash {
    /// Create a fully erased fake flash at `base_address` that the area abstraction knows as `area_id`.
    pub fn new(
        base_address: u32,
        size: u32,
        page_size: u32,
        erased_byte_value: u8,
        area_id: u32,
    ) -> Self {
        Self {
            memory: Rc::new(RefCell::new(FakeMemory {
                base_address,
                page_size,
                erased_byte_value,
                bytes: vec![erased_byte_value; size as usize],
                area_id,
                open_error: None,
                write_error: None,
                defer_writes: false,
                pending_writes: VecDeque::new(),
                erased_pages: vec![],
                programmed_words: 0,
                mapped_reads: 0,
                area_writes: 0,
            })),
        }
    }

    /// Create a fake flash matching a region description.
    pub fn from_description(description: &RegionDescription) -> Self {
        Self::new(
            description.address,
            description.size,
            description.page_size,
            description.erased_byte_value,
            description.id,
        )
    }

    /// The OS-mediated view of the same flash.
    pub fn area(&self) -> FakeFlashArea {
        FakeFlashArea {
            memory: self.memory.clone(),
        }
    }

    /// Fill the whole flash with `value`, bypassing the NOR programming rules.
    pub fn fill(&self, value: u8) {
        self.memory.borrow_mut().bytes.fill(value);
    }

    /// Overwrite bytes at region `offset`, bypassing the NOR programming rules.
    pub fn poke(&self, offset: u32, data: &[u8]) {
        let start = offset as usize;
        self.memory.borrow_mut().bytes[start..start + data.len()].copy_from_slice(data);
    }

    /// Snapshot of the bytes at region `offset`.
    pub fn peek(&self, offset: u32, length: usize) -> Vec<u8> {
        let start = offset as usize;
        self.memory.borrow().bytes[start..start + length].to_vec()
    }

    /// Absolute addresses of all page erases, in order.
    pub fn erased_pages(&self) -> Vec<u32> {
        self.memory.borrow().erased_pages.clone()
    }

    /// Number of words programmed through the raw interface.
    pub fn programmed_words(&self) -> usize {
        self.memory.borrow().programmed_words
    }

    /// Number of memory mapped reads.
    pub fn mapped_reads(&self) -> usize {
        self.memory.borrow().mapped_reads
    }

    /// Number of writes accepted by the area interface.
    pub fn area_writes(&self) -> usize {
        self.memory.borrow().area_writes
    }

    /// Make every following area open fail with `error`.
    pub fn fail_open(&self, error: Option<DriverError>) {
        self.memory.borrow_mut().open_error = error;
    }

    /// Make every following area write fail with `error`.
    pub fn fail_write(&self, error: Option<DriverError>) {
        self.memory.borrow_mut().write_error = error;
    }

    /// Queue area writes instead of applying them, like an asynchronous flash driver.
    pub fn defer_writes(&self, defer: bool) {
        self.memory.borrow_mut().defer_writes = defer;
    }

    /// Number of queued area writes.
    pub fn pending_writes(&self) -> usize {
        self.memory.borrow().pending_writes.len()
    }

    /// Apply all queued area writes.
    pub fn complete_pending_writes(&self) {
        let mut memory = self.memory.borrow_mut();
        while let Some((address, data)) = memory.pending_writes.pop_front() {
            memory.program(address, &data);
        }
    }
}

impl RawFlashOps for FakeFlash {
    fn page_size(&self) -> u32 {
        self.memory.borrow().page_size
    }

    fn erased_byte_value(&self) -> u8 {
        self.memory.borrow().erased_byte_value
    }

    fn erase_page(&mut self, address: u32) {
        let mut memory = self.memory.borrow_mut();
        assert_eq!(
            (address - memory.base_address) % memory.page_size,
            0,
            "erase of unaligned page {address:#010x}"
        );
        let range = memory.index(address, memory.page_size as usize);
        let erased = memory.erased_byte_value;
        memory.bytes[range].fill(erased);
        memory.erased_pages.push(address);
    }

    fn program_words(&mut self, address: u32, words: &[u32]) {
        assert_eq!(address as usize % WORD_SIZE, 0, "unaligned program");
        let mut memory = self.memory.borrow_mut();
        let data: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
        memory.program(address, &data);
        memory.programmed_words += words.len();
    }

    fn read_mapped(&self, address: u32, data: &mut [u8]) {
        let mut memory = self.memory.borrow_mut();
        let range = memory.index(address, data.len());
        data.copy_from_slice(&memory.bytes[range]);
        memory.mapped_reads += 1;
    }
}

/// The OS-mediated view of a [`FakeFlash`].
#[derive(Debug, Clone)]
pub struct FakeFlashArea {
    memory: Rc<RefCell<FakeMemory>>,
}

/// An opened [`FakeFlashArea`].
#[derive(Debug)]
pub struct FakeAreaHandle {
    base_address: u32,
    size: u32,
}

impl ManagedFlashArea for FakeFlashArea {
    type Handle = FakeAreaHandle;

    fn open(&mut self, id: u32) -> Result<Self::Handle, DriverError> {
        let memory = self.memory.borrow();
        if let Some(error) = memory.open_error {
            return Err(error);
        }
        if id != memory.area_id {
            return Err(DriverError(ENOENT));
        }
        Ok(FakeAreaHandle {
            base_address: memory.base_address,
            size: memory.bytes.len() as u32,
        })
    }

    fn write(
        &mut self,
        handle: &mut Self::Handle,
        offset: u32,
        data: &[u8],
    ) -> Result<(), DriverError> {
        let mut memory = self.memory.borrow_mut();
        if let Some(error) = memory.write_error {
            return Err(error);
        }
        if u64::from(offset) + data.len() as u64 > u64::from(handle.size) {
            // -EINVAL
            return Err(DriverError(-22));
        }

        let address = handle.base_address + offset;
        memory.area_writes += 1;
        if memory.defer_writes {
            memory.pending_writes.push_back((address, data.to_vec()));
        } else {
            memory.program(address, data);
        }
        Ok(())
    }
}
