mod hex_u_int;

pub(crate) use hex_u_int::deserialize as hex_or_int;
pub(crate) use hex_u_int::serialize as hex_u_int;
