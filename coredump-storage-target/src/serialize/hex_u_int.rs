use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Unsigned region numbers that fall back to a plain integer in binary formats.
pub(crate) trait RegionNumber: fmt::LowerHex + Copy + Into<u64> {}

impl RegionNumber for u8 {}
impl RegionNumber for u32 {}

pub(crate) fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: RegionNumber,
{
    // Human readable formats such as YAML get hex strings, binary formats plain integers.
    if serializer.is_human_readable() {
        serializer.serialize_str(format!("{value:#x}").as_str())
    } else {
        serializer.serialize_u64((*value).into())
    }
}

/// Accepts plain integers as well as `0x` prefixed hex strings.
pub(crate) fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    struct HexVisitor<T>(PhantomData<T>);

    impl<'de, T: TryFrom<u64>> Visitor<'de> for HexVisitor<T> {
        type Value = T;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "an unsigned integer or a 0x prefixed hex string")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<T, E> {
            T::try_from(value).map_err(|_| E::custom(format!("{value:#x} is out of range")))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<T, E> {
            let value = u64::try_from(value)
                .map_err(|_| E::custom(format!("{value} is negative")))?;
            self.visit_u64(value)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<T, E> {
            let parsed = parse_int::parse::<u64>(value.trim())
                .map_err(|e| E::custom(format!("invalid number '{value}': {e}")))?;
            self.visit_u64(parsed)
        }
    }

    deserializer.deserialize_any(HexVisitor(PhantomData))
}
