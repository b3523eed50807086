//! Coredump region description schema
//!
//! A coredump region is a fixed, page aligned area of internal flash reserved by
//! the partition layout. This crate contains the schema structs for the YAML
//! region description files and the validation applied when loading them.
//!
#![warn(missing_docs)]

mod region;
pub(crate) mod serialize;

pub use region::{RegionDescription, RegionTable, RegionTableError};
