use crate::serialize::{hex_or_int, hex_u_int};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Describes a flash region reserved for coredump storage.
///
/// These values are read from YAML region description files
/// or constructed directly for build-time layouts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionDescription {
    /// A name to describe the region.
    pub name: String,
    /// The logical storage id the partition manager knows this region by.
    pub id: u32,
    /// Absolute base address of the region.
    #[serde(serialize_with = "hex_u_int", deserialize_with = "hex_or_int")]
    pub address: u32,
    /// Capacity of the region in bytes.
    #[serde(serialize_with = "hex_u_int", deserialize_with = "hex_or_int")]
    pub size: u32,
    /// Erase granularity of the flash backing the region.
    #[serde(serialize_with = "hex_u_int", deserialize_with = "hex_or_int")]
    pub page_size: u32,
    /// The value of a byte in flash that was just erased.
    #[serde(
        default = "default_erased_byte_value",
        serialize_with = "hex_u_int",
        deserialize_with = "hex_or_int"
    )]
    pub erased_byte_value: u8,
}

fn default_erased_byte_value() -> u8 {
    0xFF
}

impl RegionDescription {
    /// Returns the absolute address range of the region.
    ///
    /// Uses `u64` so a region ending at the top of the 32 bit address space is representable.
    pub fn address_range(&self) -> Range<u64> {
        let start = u64::from(self.address);
        start..start + u64::from(self.size)
    }

    /// Number of flash pages the region spans.
    pub fn page_count(&self) -> u32 {
        if self.page_size == 0 {
            0
        } else {
            self.size / self.page_size
        }
    }

    fn validate(&self) -> Result<(), RegionTableError> {
        if self.page_size == 0 {
            return Err(RegionTableError::ZeroPageSize {
                name: self.name.clone(),
            });
        }
        if self.size == 0 {
            return Err(RegionTableError::EmptyRegion {
                name: self.name.clone(),
            });
        }
        if self.address % self.page_size != 0 || self.size % self.page_size != 0 {
            return Err(RegionTableError::Unaligned {
                name: self.name.clone(),
                address: self.address,
                size: self.size,
                page_size: self.page_size,
            });
        }
        if self.address_range().end > 1 << 32 {
            return Err(RegionTableError::AddressOverflow {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Errors found while loading or validating a region table.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum RegionTableError {
    #[error("Region '{name}' declares a page size of zero.")]
    ZeroPageSize { name: String },
    #[error("Region '{name}' has a size of zero.")]
    EmptyRegion { name: String },
    #[error("Region '{name}' at {address:#010x} with size {size:#x} is not aligned to its {page_size:#x} byte pages.")]
    Unaligned {
        name: String,
        address: u32,
        size: u32,
        page_size: u32,
    },
    #[error("Region '{name}' extends past the end of the 32 bit address space.")]
    AddressOverflow { name: String },
    #[error("Storage id {id} is used by both '{first}' and '{second}'.")]
    DuplicateId {
        id: u32,
        first: String,
        second: String,
    },
    #[error("Regions '{first}' and '{second}' overlap.")]
    Overlap { first: String, second: String },
    #[error("Failed to parse region description")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Failed to read region description")]
    Io(#[from] std::io::Error),
}

/// A validated set of coredump regions, keyed by storage id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionTable {
    regions: Vec<RegionDescription>,
}

impl RegionTable {
    /// Builds a table from already constructed descriptions.
    pub fn new(regions: Vec<RegionDescription>) -> Result<Self, RegionTableError> {
        let table = Self { regions };
        table.validate()?;
        Ok(table)
    }

    /// Parses and validates a YAML region table.
    pub fn from_yaml_reader<R: std::io::Read>(reader: R) -> Result<Self, RegionTableError> {
        let table: RegionTable = serde_yaml::from_reader(reader)?;
        table.validate()?;
        tracing::debug!("Loaded {} coredump region(s)", table.regions.len());
        Ok(table)
    }

    /// Parses and validates a YAML region table from a string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegionTableError> {
        Self::from_yaml_reader(yaml.as_bytes())
    }

    /// Reads a YAML region table from a file.
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self, RegionTableError> {
        let path = path.as_ref();
        tracing::debug!("Reading region table from {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::from_yaml_reader(file)
    }

    /// Serializes the table back to YAML, numbers as hex strings.
    pub fn to_yaml(&self) -> Result<String, RegionTableError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// All regions in declaration order.
    pub fn regions(&self) -> &[RegionDescription] {
        &self.regions
    }

    /// Returns the region registered under `id`.
    pub fn get(&self, id: u32) -> Option<&RegionDescription> {
        self.regions.iter().find(|region| region.id == id)
    }

    /// Returns the region with the given name.
    pub fn by_name(&self, name: impl AsRef<str>) -> Option<&RegionDescription> {
        let name = name.as_ref();
        self.regions.iter().find(|region| region.name == name)
    }

    fn validate(&self) -> Result<(), RegionTableError> {
        for (index, region) in self.regions.iter().enumerate() {
            region.validate()?;

            for other in &self.regions[..index] {
                if other.id == region.id {
                    return Err(RegionTableError::DuplicateId {
                        id: region.id,
                        first: other.name.clone(),
                        second: region.name.clone(),
                    });
                }

                let (a, b) = (other.address_range(), region.address_range());
                if a.start < b.end && b.start < a.end {
                    return Err(RegionTableError::Overlap {
                        first: other.name.clone(),
                        second: region.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const NRF52_TABLE: &str = r#"
regions:
  - name: memfault_storage
    id: 3
    address: 0xF8000
    size: 0x8000
    page_size: 0x1000
  - name: settings
    id: 4
    address: "0x100000"
    size: 4096
    page_size: 4096
    erased_byte_value: 0xFF
"#;

    #[test]
    fn parse_table() {
        let table = RegionTable::from_yaml_str(NRF52_TABLE).unwrap();

        assert_eq!(table.regions().len(), 2);

        let storage = table.get(3).unwrap();
        assert_eq!(storage.name, "memfault_storage");
        assert_eq!(storage.address, 0xF8000);
        assert_eq!(storage.size, 0x8000);
        assert_eq!(storage.erased_byte_value, 0xFF);
        assert_eq!(storage.page_count(), 8);

        assert_eq!(table.by_name("settings").unwrap().address, 0x10_0000);
        assert!(table.get(7).is_none());
    }

    #[test]
    fn yaml_round_trip_uses_hex() {
        let table = RegionTable::from_yaml_str(NRF52_TABLE).unwrap();
        let yaml = table.to_yaml().unwrap();

        assert!(yaml.contains("0xf8000"));
        assert_eq!(RegionTable::from_yaml_str(&yaml).unwrap(), table);
    }

    #[test_case(0x1000, 0x8000, 0 ; "zero page size")]
    #[test_case(0x1000, 0, 0x1000 ; "empty region")]
    #[test_case(0x1100, 0x8000, 0x1000 ; "unaligned address")]
    #[test_case(0x1000, 0x8100, 0x1000 ; "unaligned size")]
    #[test_case(0xFFFF_F000, 0x2000, 0x1000 ; "past end of address space")]
    fn invalid_region_is_rejected(address: u32, size: u32, page_size: u32) {
        let region = RegionDescription {
            name: "broken".to_owned(),
            id: 1,
            address,
            size,
            page_size,
            erased_byte_value: 0xFF,
        };

        assert!(RegionTable::new(vec![region]).is_err());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let yaml = r#"
regions:
  - { name: a, id: 1, address: 0x0, size: 0x1000, page_size: 0x1000 }
  - { name: b, id: 1, address: 0x1000, size: 0x1000, page_size: 0x1000 }
"#;
        let error = RegionTable::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(error, RegionTableError::DuplicateId { id: 1, .. }));
    }

    #[test]
    fn overlapping_regions_are_rejected() {
        let yaml = r#"
regions:
  - { name: a, id: 1, address: 0x0, size: 0x2000, page_size: 0x1000 }
  - { name: b, id: 2, address: 0x1000, size: 0x1000, page_size: 0x1000 }
"#;
        let error = RegionTable::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(error, RegionTableError::Overlap { .. }));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = r#"
regions:
  - { name: a, id: 1, address: 0x0, size: 0x1000, page_size: 0x1000, wear_leveling: true }
"#;
        assert!(matches!(
            RegionTable::from_yaml_str(yaml),
            Err(RegionTableError::Yaml(_))
        ));
    }
}
