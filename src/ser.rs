//! Serialization.
//!
//! Values are written with no type markers, so the reader must know the shape ahead of time:
//!
//! - Integers and floats are fixed-width little-endian. Bools are one byte.
//! - Strings and byte arrays are a varint length followed by the raw bytes.
//! - Sequences and maps are a varint count followed by each element (or key, value pair).
//!   Maps are written in their own iteration order; use a `BTreeMap` when the bytes need to be
//!   stable across runs.
//! - Tuples and fixed-size arrays are a varint count followed by each element.
//! - Structs and tuple structs are their fields in declaration order, with no prefix. Fields
//!   marked `#[serde(skip)]` are not written.
//! - Options are a presence byte (0 or 1), followed by the value if present.
//! - Enum variants are a varint variant index followed by the variant's fields.
//! - Unit values and unit structs take no space.

use serde::ser::*;
use std::mem;

use tracing::trace;

use crate::error::{Error, Result};
use crate::wire::{Writer, RAW_BYTES_TOKEN, VARUINT_TOKEN};

/// Encode a value into a new byte vector.
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut se = WireSerializer::default();
    value.serialize(&mut se)?;
    Ok(se.out.into_vec())
}

/// Encode a value onto the end of an existing writer. Nothing is appended if encoding fails.
pub fn to_writer<T: Serialize + ?Sized>(value: &T, out: &mut Writer) -> Result<()> {
    let enc = to_vec(value)?;
    out.append(&enc);
    Ok(())
}

/// Bytes that go on the wire exactly as they are, with no length prefix.
pub(crate) struct RawBytes<'a>(pub &'a [u8]);

impl<'a> Serialize for RawBytes<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(RAW_BYTES_TOKEN, serde_bytes::Bytes::new(self.0))
    }
}

#[derive(Default)]
struct WireSerializer {
    out: Writer,
}

impl<'a> Serializer for &'a mut WireSerializer {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = SeqSerializer<'a>;
    type SerializeTuple = Compound<'a>;
    type SerializeTupleStruct = Compound<'a>;
    type SerializeTupleVariant = Compound<'a>;
    type SerializeMap = MapSerializer<'a>;
    type SerializeStruct = Compound<'a>;
    type SerializeStructVariant = Compound<'a>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.out.write_bool(v);
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.out.write_i8(v);
        Ok(())
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.out.write_i16(v);
        Ok(())
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.out.write_i32(v);
        Ok(())
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.out.write_i64(v);
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.out.write_u8(v);
        Ok(())
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.out.write_u16(v);
        Ok(())
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.out.write_u32(v);
        Ok(())
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.out.write_u64(v);
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.out.write_f32(v);
        Ok(())
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.out.write_f64(v);
        Ok(())
    }

    fn serialize_char(self, _v: char) -> Result<()> {
        Err(Error::UnsupportedType("char"))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.out.write_str(v);
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.out.write_byte_array(v);
        Ok(())
    }

    fn serialize_none(self) -> Result<()> {
        self.out.write_u8(0);
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, v: &T) -> Result<()> {
        self.out.write_u8(1);
        v.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
    ) -> Result<()> {
        self.out.write_uvarint(variant_index as u64);
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        v: &T,
    ) -> Result<()> {
        match name {
            RAW_BYTES_TOKEN => v.serialize(LeafSerializer::new(Leaf::RawBytes, &mut self.out)),
            VARUINT_TOKEN => v.serialize(LeafSerializer::new(Leaf::Varint, &mut self.out)),
            _ => v.serialize(self),
        }
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<()> {
        self.out.write_uvarint(variant_index as u64);
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(SeqSerializer::new(self, len))
    }

    fn serialize_tuple(self, len: usize) -> Result<Compound<'a>> {
        self.out.write_uvarint(len as u64);
        Ok(Compound { se: self })
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Compound<'a>> {
        // Tuple structs are records, so no count
        Ok(Compound { se: self })
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.out.write_uvarint(variant_index as u64);
        Ok(Compound { se: self })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(MapSerializer::new(self, len))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(Compound { se: self })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.out.write_uvarint(variant_index as u64);
        Ok(Compound { se: self })
    }
}

/// Encode a sequence of possibly unknown length.
///
/// If the length is known, the count goes out first and elements follow directly. If not, we
/// can't write the count ahead of time, so instead we:
///
/// 1. Swap a fresh buffer into the WireSerializer
/// 2. Serialize elements into it, counting as we go
/// 3. On end(), swap the original buffer back, write the count, then append the elements
///
/// Either way, the bytes handed back to the caller are only ever appended.
struct SeqSerializer<'a> {
    se: &'a mut WireSerializer,
    unknown_len: Option<(usize, Writer)>,
}

impl<'a> SeqSerializer<'a> {
    fn new(se: &'a mut WireSerializer, len: Option<usize>) -> Self {
        if let Some(len) = len {
            se.out.write_uvarint(len as u64);
            Self {
                se,
                unknown_len: None,
            }
        } else {
            let enc = mem::take(&mut se.out);
            Self {
                se,
                unknown_len: Some((0, enc)),
            }
        }
    }
}

impl<'a> SerializeSeq for SeqSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        if let Some((ref mut len, _)) = self.unknown_len {
            *len += 1;
        }
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        if let Some((len, enc)) = self.unknown_len {
            let body = mem::replace(&mut self.se.out, enc);
            trace!(len, "flushing sequence of unknown length");
            self.se.out.write_uvarint(len as u64);
            self.se.out.append(body.as_slice());
        }
        Ok(())
    }
}

/// Encode a map, buffering entries the same way as [`SeqSerializer`] when the length isn't known
/// up front.
struct MapSerializer<'a> {
    se: &'a mut WireSerializer,
    unknown_len: Option<(usize, Writer)>,
}

impl<'a> MapSerializer<'a> {
    fn new(se: &'a mut WireSerializer, len: Option<usize>) -> Self {
        if let Some(len) = len {
            se.out.write_uvarint(len as u64);
            Self {
                se,
                unknown_len: None,
            }
        } else {
            let enc = mem::take(&mut se.out);
            Self {
                se,
                unknown_len: Some((0, enc)),
            }
        }
    }
}

impl<'a> SerializeMap for MapSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        if let Some((ref mut len, _)) = self.unknown_len {
            *len += 1;
        }
        key.serialize(&mut *self.se)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        if let Some((len, enc)) = self.unknown_len {
            let body = mem::replace(&mut self.se.out, enc);
            self.se.out.write_uvarint(len as u64);
            self.se.out.append(body.as_slice());
        }
        Ok(())
    }
}

/// Fields of tuples, records, and enum variants. Any prefix has already been written.
struct Compound<'a> {
    se: &'a mut WireSerializer,
}

impl<'a> SerializeTuple for Compound<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeTupleStruct for Compound<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeTupleVariant for Compound<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeStruct for Compound<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _field: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeStructVariant for Compound<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _field: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Leaf {
    /// Bytes with no length prefix
    RawBytes,
    /// An unsigned integer as a varint
    Varint,
}

/// Serializer for the inside of a leaf type's reserved newtype struct. Accepts exactly one value
/// of the kind the leaf expects.
struct LeafSerializer<'a> {
    leaf: Leaf,
    out: &'a mut Writer,
}

impl<'a> LeafSerializer<'a> {
    fn new(leaf: Leaf, out: &'a mut Writer) -> Self {
        Self { leaf, out }
    }

    fn ser_fail(&self, received: &'static str) -> Error {
        let expected = match self.leaf {
            Leaf::RawBytes => "bytes",
            Leaf::Varint => "an unsigned integer",
        };
        Error::SerdeFail(format!("expected {}, received {}", expected, received))
    }

    fn write_varint(self, v: u64, received: &'static str) -> Result<()> {
        if self.leaf != Leaf::Varint {
            return Err(self.ser_fail(received));
        }
        self.out.write_uvarint(v);
        Ok(())
    }
}

impl<'a> Serializer for LeafSerializer<'a> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Impossible<(), Error>;
    type SerializeTuple = Impossible<(), Error>;
    type SerializeTupleStruct = Impossible<(), Error>;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = Impossible<(), Error>;
    type SerializeStruct = Impossible<(), Error>;
    type SerializeStructVariant = Impossible<(), Error>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        if self.leaf != Leaf::RawBytes {
            return Err(self.ser_fail("bytes"));
        }
        self.out.append(v);
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.write_varint(v as u64, "u8")
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.write_varint(v as u64, "u16")
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.write_varint(v as u64, "u32")
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.write_varint(v, "u64")
    }

    fn serialize_bool(self, _: bool) -> Result<()> {
        Err(self.ser_fail("bool"))
    }

    fn serialize_i8(self, _: i8) -> Result<()> {
        Err(self.ser_fail("i8"))
    }

    fn serialize_i16(self, _: i16) -> Result<()> {
        Err(self.ser_fail("i16"))
    }

    fn serialize_i32(self, _: i32) -> Result<()> {
        Err(self.ser_fail("i32"))
    }

    fn serialize_i64(self, _: i64) -> Result<()> {
        Err(self.ser_fail("i64"))
    }

    fn serialize_f32(self, _: f32) -> Result<()> {
        Err(self.ser_fail("f32"))
    }

    fn serialize_f64(self, _: f64) -> Result<()> {
        Err(self.ser_fail("f64"))
    }

    fn serialize_char(self, _: char) -> Result<()> {
        Err(self.ser_fail("char"))
    }

    fn serialize_str(self, _: &str) -> Result<()> {
        Err(self.ser_fail("str"))
    }

    fn serialize_none(self) -> Result<()> {
        Err(self.ser_fail("None"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _: &T) -> Result<()> {
        Err(self.ser_fail("Some"))
    }

    fn serialize_unit(self) -> Result<()> {
        Err(self.ser_fail("unit"))
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<()> {
        Err(self.ser_fail("unit_struct"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<()> {
        Err(self.ser_fail("unit_variant"))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _v: &T,
    ) -> Result<()> {
        Err(self.ser_fail("newtype_struct"))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        Err(self.ser_fail("newtype_variant"))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(self.ser_fail("seq"))
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple> {
        Err(self.ser_fail("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(self.ser_fail("tuple_struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(self.ser_fail("tuple_variant"))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap> {
        Err(self.ser_fail("map"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(self.ser_fail("struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(self.ser_fail("struct_variant"))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[test]
    fn integers() {
        assert_eq!(to_vec(&100u32).unwrap(), vec![0x64, 0x00, 0x00, 0x00]);
        assert_eq!(to_vec(&0xABu8).unwrap(), vec![0xAB]);
        assert_eq!(to_vec(&-2i16).unwrap(), vec![0xFE, 0xFF]);
        assert_eq!(
            to_vec(&0x0102030405060708u64).unwrap(),
            vec![0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
        );
        assert_eq!(to_vec(&true).unwrap(), vec![0x01]);
    }

    #[test]
    fn strings_and_bytes() {
        assert_eq!(to_vec("abc").unwrap(), vec![0x03, b'a', b'b', b'c']);
        assert_eq!(to_vec(&String::new()).unwrap(), vec![0x00]);
        let bytes = serde_bytes::ByteBuf::from(vec![0xAA; 200]);
        let enc = to_vec(&bytes).unwrap();
        assert_eq!(&enc[..2], &[0xC8, 0x01]);
        assert_eq!(enc.len(), 202);
    }

    #[test]
    fn sequences() {
        let v: Vec<u16> = vec![1, 2, 3];
        assert_eq!(
            to_vec(&v).unwrap(),
            vec![0x03, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00]
        );
        let empty: Vec<u64> = Vec::new();
        assert_eq!(to_vec(&empty).unwrap(), vec![0x00]);
    }

    #[test]
    fn fixed_array_has_count() {
        let arr = [7u8, 8, 9];
        assert_eq!(to_vec(&arr).unwrap(), vec![0x03, 7, 8, 9]);
    }

    #[test]
    fn unknown_length_sequence() {
        struct Odd(Vec<u8>);
        impl Serialize for Odd {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut seq = serializer.serialize_seq(None)?;
                for v in self.0.iter().filter(|v| *v % 2 == 1) {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
        }
        let mut out = Writer::new();
        out.write_u8(0xEE);
        to_writer(&Odd(vec![1, 2, 3, 4, 5]), &mut out).unwrap();
        assert_eq!(out.as_slice(), &[0xEE, 0x03, 1, 3, 5]);
    }

    #[test]
    fn maps() {
        let mut map = BTreeMap::new();
        map.insert(2u8, "b".to_string());
        map.insert(1u8, "a".to_string());
        assert_eq!(
            to_vec(&map).unwrap(),
            vec![0x02, 0x01, 0x01, b'a', 0x02, 0x01, b'b']
        );
    }

    #[test]
    fn options() {
        let none: Option<u32> = None;
        assert_eq!(to_vec(&none).unwrap(), vec![0x00]);
        assert_eq!(to_vec(&Some(5u32)).unwrap(), vec![0x01, 0x05, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn records_skip_fields() {
        #[derive(Serialize)]
        struct Record {
            a: u8,
            #[serde(skip)]
            _cache: u64,
            b: u16,
        }
        let rec = Record {
            a: 1,
            _cache: 99,
            b: 2,
        };
        assert_eq!(to_vec(&rec).unwrap(), vec![0x01, 0x02, 0x00]);
    }

    #[test]
    fn enums() {
        #[derive(Serialize)]
        enum Kind {
            A,
            B(u8),
            C { x: u16 },
        }
        assert_eq!(to_vec(&Kind::A).unwrap(), vec![0x00]);
        assert_eq!(to_vec(&Kind::B(9)).unwrap(), vec![0x01, 0x09]);
        assert_eq!(to_vec(&Kind::C { x: 1 }).unwrap(), vec![0x02, 0x01, 0x00]);
    }

    #[test]
    fn varuint_leaf() {
        use crate::Varuint32;
        assert_eq!(to_vec(&Varuint32(300)).unwrap(), vec![0xAC, 0x02]);
        assert_eq!(to_vec(&Varuint32(127)).unwrap(), vec![0x7F]);
    }

    #[test]
    fn raw_bytes_leaf() {
        assert_eq!(to_vec(&RawBytes(&[1, 2, 3])).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn unsupported() {
        assert_eq!(to_vec(&'x'), Err(Error::UnsupportedType("char")));
        let mut out = Writer::new();
        assert!(to_writer(&vec!['a', 'b'], &mut out).is_err());
        assert!(out.is_empty(), "failed encode must not append");
    }
}
