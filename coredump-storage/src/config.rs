//! Glue between region description files and the storage.

use coredump_storage_target::{RegionDescription, RegionTable};

use crate::{RegionInfo, RegionMap};

impl From<&RegionDescription> for RegionInfo {
    fn from(description: &RegionDescription) -> Self {
        RegionInfo::new(description.address, description.size)
    }
}

impl RegionMap for RegionTable {
    fn resolve(&self, id: u32) -> Option<RegionInfo> {
        self.get(id).map(RegionInfo::from)
    }
}
