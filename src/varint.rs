//! Unsigned base-128 varints.
//!
//! Seven data bits per byte, least significant group first, with the high bit set on every byte
//! except the last. Every dynamically sized container on the wire (byte arrays, strings,
//! sequences, maps) is prefixed with its length in this form.

use std::fmt;

use serde::de::{Deserialize, Deserializer, Error as DeError, Visitor};
use serde::ser::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::wire::VARUINT_TOKEN;

/// Longest valid encoding of a u64.
pub const MAX_VARINT_LEN: usize = 10;

/// Append `v` to `buf` as a varint.
pub fn write_uvarint(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

/// Number of bytes `v` takes up once encoded.
pub fn uvarint_len(mut v: u64) -> usize {
    let mut len = 1;
    while v >= 0x80 {
        v >>= 7;
        len += 1;
    }
    len
}

/// Parse a varint from the front of `buf`, returning the value and the number of bytes it used.
pub fn read_uvarint(buf: &[u8]) -> Result<(u64, usize)> {
    let mut x = 0u64;
    let mut shift = 0u32;
    for (i, &b) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return Err(Error::MalformedVarint);
        }
        if b < 0x80 {
            // The tenth byte only has room for the top bit of a u64
            if i == MAX_VARINT_LEN - 1 && b > 1 {
                return Err(Error::MalformedVarint);
            }
            return Ok((x | ((b as u64) << shift), i + 1));
        }
        x |= ((b & 0x7f) as u64) << shift;
        shift += 7;
    }
    Err(Error::MalformedVarint)
}

/// A u32 that goes over the wire as a varint instead of four fixed bytes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Varuint32(pub u32);

impl From<u32> for Varuint32 {
    fn from(v: u32) -> Self {
        Varuint32(v)
    }
}

impl From<Varuint32> for u32 {
    fn from(v: Varuint32) -> Self {
        v.0
    }
}

impl fmt::Display for Varuint32 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for Varuint32 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(VARUINT_TOKEN, &self.0)
    }
}

impl<'de> Deserialize<'de> for Varuint32 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct VarVisitor;

        impl<'de> Visitor<'de> for VarVisitor {
            type Value = Varuint32;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(fmt, "an unsigned integer that fits in 32 bits")
            }

            fn visit_u64<E: DeError>(self, v: u64) -> Result<Self::Value, E> {
                u32::try_from(v)
                    .map(Varuint32)
                    .map_err(|_| E::custom(format!("varuint32 out of range: {}", v)))
            }

            fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                u32::deserialize(deserializer).map(Varuint32)
            }
        }

        deserializer.deserialize_newtype_struct(VARUINT_TOKEN, VarVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn known_encodings() -> Vec<(u64, Vec<u8>)> {
        vec![
            (0, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7F]),
            (128, vec![0x80, 0x01]),
            (300, vec![0xAC, 0x02]),
            (16383, vec![0xFF, 0x7F]),
            (16384, vec![0x80, 0x80, 0x01]),
            (
                u64::MAX,
                vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01],
            ),
        ]
    }

    #[test]
    fn encodings() {
        for (value, expected) in known_encodings() {
            let mut buf = Vec::new();
            write_uvarint(&mut buf, value);
            assert_eq!(buf, expected, "encoding {}", value);
            assert_eq!(uvarint_len(value), expected.len());
            let (decoded, used) = read_uvarint(&buf).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(used, expected.len());
        }
    }

    #[test]
    fn powers_of_two() {
        for s in 0..64 {
            let mut buf = Vec::new();
            write_uvarint(&mut buf, 1u64 << s);
            let (o, used) = read_uvarint(&buf).unwrap();
            assert_eq!(1u64 << s, o, "u64 results should match");
            assert_eq!(used, buf.len());
        }
    }

    #[test]
    fn stops_at_terminator() {
        let (v, used) = read_uvarint(&[0xAC, 0x02, 0xFF, 0xFF]).unwrap();
        assert_eq!(v, 300);
        assert_eq!(used, 2);
    }

    #[test]
    fn not_enough_bytes() {
        assert_eq!(read_uvarint(&[]), Err(Error::MalformedVarint));
        assert_eq!(read_uvarint(&[0x80]), Err(Error::MalformedVarint));
        assert_eq!(read_uvarint(&[0xFF, 0xFF, 0x80]), Err(Error::MalformedVarint));
    }

    #[test]
    fn overflow() {
        let too_big = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert_eq!(read_uvarint(&too_big), Err(Error::MalformedVarint));
        let too_long = [0x80; 11];
        assert_eq!(read_uvarint(&too_long), Err(Error::MalformedVarint));
    }
}
