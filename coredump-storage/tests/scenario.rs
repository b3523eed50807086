use coredump_storage::{
    fake_flash::FakeFlash, CoredumpStorage, CoredumpWriter, PlatformStorage, RegionInfo,
    StorageInfo, WriteBlock,
};
use coredump_storage_target::RegionTable;
use pretty_assertions::assert_eq;

const REGION: RegionInfo = RegionInfo::new(0x0007_F000, 4096);
const AREA_ID: u32 = 2;

/// Region of 4096 bytes on a flash with 256 byte pages.
fn platform() -> (impl PlatformStorage, FakeFlash) {
    let flash = FakeFlash::new(REGION.base_address, REGION.size, 256, 0xFF, AREA_ID);
    let storage = CoredumpStorage::new(REGION, AREA_ID, flash.clone(), flash.area()).unwrap();
    (storage, flash)
}

#[test]
fn capture_upload_clear() {
    let (mut storage, _flash) = platform();

    assert_eq!(storage.get_storage_info(), StorageInfo { size: 4096 });

    assert!(storage.storage_erase(0, 256));

    let words: [u32; 16] = core::array::from_fn(|i| 0x1000_0000 + i as u32);
    assert!(storage.storage_buffered_write(&WriteBlock::from_words(0, words)));

    let mut data = [0u8; 64];
    assert!(storage.storage_read(0, &mut data));
    let expected: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
    assert_eq!(data.to_vec(), expected);

    let mut tail = [0u8; 64];
    assert!(storage.storage_read(64, &mut tail));
    assert_eq!(tail, [0xFF; 64]);

    assert!(storage.storage_clear());

    let mut data = [0xAAu8; 64];
    assert!(storage.delivered_aware_read(0, &mut data));
    assert_eq!(data, [0; 64]);

    let mut past_end = [0u8; 1];
    assert!(!storage.storage_read(4096, &mut past_end));
}

/// The upload pipeline reads the coredump in chunks until the end.
fn upload(storage: &impl PlatformStorage, length: usize) -> Vec<u8> {
    let mut uploaded = Vec::with_capacity(length);
    let mut chunk = [0u8; 100];
    let mut offset = 0;

    while offset < length {
        let count = chunk.len().min(length - offset);
        assert!(storage.delivered_aware_read(offset as u32, &mut chunk[..count]));
        uploaded.extend_from_slice(&chunk[..count]);
        offset += count;
    }

    uploaded
}

#[test]
fn coredump_survives_until_cleared() {
    let flash = FakeFlash::new(REGION.base_address, REGION.size, 256, 0xFF, AREA_ID);
    let payload: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 251) as u8).collect();

    {
        let mut storage =
            CoredumpStorage::new(REGION, AREA_ID, flash.clone(), flash.area()).unwrap();
        assert!(storage.check_size(payload.len()));
        assert!(storage.erase(0, payload.len()));

        let mut writer = CoredumpWriter::<_, _>::new(&mut storage);
        for (index, piece) in payload.chunks(13).enumerate() {
            writer.write((index * 13) as u32, piece).unwrap();
        }
        writer.finish().unwrap();
    }

    // A reboot creates a fresh storage over the same flash.
    let mut storage = CoredumpStorage::new(REGION, AREA_ID, flash.clone(), flash.area()).unwrap();
    assert!(storage.has_pending_coredump());
    assert_eq!(upload(&storage, payload.len()), payload);

    assert!(storage.storage_clear());
    assert!(!storage.has_pending_coredump());
    assert_eq!(upload(&storage, payload.len()), vec![0; payload.len()]);

    // Only the marker word was touched.
    assert_eq!(flash.peek(0, 4), vec![0; 4]);
    assert_eq!(flash.peek(4, 996), payload[4..].to_vec());
}

#[test]
fn storage_from_region_description() {
    let table = RegionTable::from_yaml_file(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/regions/nrf52840.yaml"
    ))
    .unwrap();
    let description = table.by_name("memfault_storage").unwrap();

    let flash = FakeFlash::from_description(description);
    let mut storage =
        CoredumpStorage::from_region_map(&table, description.id, flash.clone(), flash.area())
            .unwrap();

    assert_eq!(storage.region(), RegionInfo::new(0xF6000, 0x8000));
    assert!(!storage.storage_erase(0x800, 0x1000));
    assert!(storage.storage_erase(0x1000, 0x1001));
    assert_eq!(flash.erased_pages(), vec![0xF7000, 0xF8000]);
    assert!(storage.storage_clear());
}
