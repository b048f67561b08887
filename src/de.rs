//! Deserialization.
//!
//! The wire format carries no type markers, so every value is decoded by following the shape the
//! target type asks for. That means the self-describing entry points (`deserialize_any`,
//! `deserialize_ignored_any`, `deserialize_identifier`) are unsupported, and only types with a
//! fixed shape can be decoded.
//!
//! Message envelopes get special handling: after reading the envelope header, the decoder looks
//! up the type tag in a [`MessageRegistry`] and decodes the payload as the matching
//! [`P2PMessage`] variant. See [`Decoder::resolve_messages`] and [`Decoder::with_registry`].

use serde::de::value::{BorrowedBytesDeserializer, StrDeserializer, U32Deserializer, U8Deserializer};
use serde::de::*;
use tracing::{debug, trace};

use crate::depth_tracking::DepthTracker;
use crate::envelope::MessageRegistry;
use crate::error::{Error, Result};
use crate::p2p::P2PMessage;
use crate::wire::{Reader, ENVELOPE_TOKEN, RAW_BYTES_TOKEN, VARUINT_TOKEN};

/// Decode a single value that must take up the entire buffer.
///
/// Envelopes are resolved against the standard message registry. Use a [`Decoder`] to change
/// that, or to pull several values out of one buffer.
pub fn from_slice<'de, T: Deserialize<'de>>(buf: &'de [u8]) -> Result<T> {
    let mut decoder = Decoder::new(buf);
    let val = decoder.decode()?;
    decoder.finish()?;
    Ok(val)
}

/// A streaming decoder over a byte buffer.
///
/// Values are decoded one after another from the front of the buffer. If a decode fails, the
/// decoder is left where it was before that decode started.
///
/// ```
/// # use chain_pack::*;
/// let data = [0x01, 0x00, 0x00, 0x00, 0x03, b'a', b'b', b'c'];
/// let mut decoder = Decoder::new(&data);
/// let a: u32 = decoder.decode()?;
/// let b: String = decoder.decode()?;
/// decoder.finish()?;
/// assert_eq!(a, 1);
/// assert_eq!(b, "abc");
/// # Ok::<(), Error>(())
/// ```
pub struct Decoder<'de, 'r> {
    de: WireDeserializer<'de, 'r>,
}

impl<'de> Decoder<'de, 'static> {
    /// Start decoding from the front of `buf`, resolving envelopes with the standard registry.
    pub fn new(buf: &'de [u8]) -> Self {
        Self {
            de: WireDeserializer::new(buf, DecodeOptions::standard()),
        }
    }
}

impl<'de, 'r> Decoder<'de, 'r> {
    /// Choose whether envelopes decode their payload into a [`P2PMessage`]. Defaults to true.
    ///
    /// When off, envelopes keep only the raw payload, and unknown type tags are not an error.
    pub fn resolve_messages(mut self, resolve: bool) -> Self {
        self.de.options.resolve_messages = resolve;
        self
    }

    /// Resolve envelope type tags against a different registry.
    pub fn with_registry<'s>(self, registry: &'s MessageRegistry) -> Decoder<'de, 's> {
        let options = DecodeOptions {
            resolve_messages: self.de.options.resolve_messages,
            registry,
        };
        Decoder {
            de: WireDeserializer {
                reader: self.de.reader,
                depth_tracking: DepthTracker::new(),
                options,
            },
        }
    }

    /// Decode the next value.
    pub fn decode<T: Deserialize<'de>>(&mut self) -> Result<T> {
        let start = self.de.reader.clone();
        self.de.depth_tracking = DepthTracker::new();
        match T::deserialize(&mut self.de) {
            Ok(val) => Ok(val),
            Err(e) => {
                self.de.reader = start;
                Err(e)
            }
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.de.reader.position()
    }

    /// Number of bytes not yet decoded.
    pub fn remaining(&self) -> usize {
        self.de.reader.remaining()
    }

    /// Finish decoding, failing if any bytes are left over.
    pub fn finish(self) -> Result<()> {
        match self.de.reader.remaining() {
            0 => Ok(()),
            n => Err(Error::TrailingBytes(n)),
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct DecodeOptions<'r> {
    resolve_messages: bool,
    registry: &'r MessageRegistry,
}

impl DecodeOptions<'static> {
    fn standard() -> Self {
        Self {
            resolve_messages: true,
            registry: MessageRegistry::standard(),
        }
    }
}

/// Decode an envelope payload as the message registered for `tag`.
pub(crate) fn resolve_message(
    tag: u8,
    payload: &[u8],
    registry: &MessageRegistry,
) -> Result<P2PMessage> {
    let options = DecodeOptions {
        resolve_messages: true,
        registry,
    };
    let variant = registry
        .variant_name(tag)
        .ok_or(Error::UnknownMessageType(tag))?;
    P2PMessage::deserialize(ResolvedPayload {
        tag,
        variant,
        payload,
        options,
    })
}

struct WireDeserializer<'de, 'r> {
    reader: Reader<'de>,
    depth_tracking: DepthTracker,
    options: DecodeOptions<'r>,
}

impl<'de, 'r> WireDeserializer<'de, 'r> {
    fn new(buf: &'de [u8], options: DecodeOptions<'r>) -> Self {
        Self {
            reader: Reader::new(buf),
            depth_tracking: DepthTracker::new(),
            options,
        }
    }

    fn read_len(&mut self, step: &'static str) -> Result<usize> {
        let len = self.reader.read_uvarint()?;
        usize::try_from(len).map_err(|_| Error::BufferUnderrun {
            step,
            needed: usize::MAX,
            remaining: self.reader.remaining(),
        })
    }

    /// Read an envelope header and take its payload.
    fn read_envelope(&mut self) -> Result<(u8, &'de [u8])> {
        let length = self.reader.read_u32()?;
        if length == 0 {
            return Err(Error::BadEncode(
                "p2p message envelope has zero length".to_string(),
            ));
        }
        let tag = self.reader.read_u8()?;
        let payload = self
            .reader
            .read_fixed((length - 1) as usize, "decode envelope payload")?;
        trace!(tag, len = payload.len(), "read p2p message envelope");
        Ok((tag, payload))
    }
}

impl<'de, 'r, 'a> serde::Deserializer<'de> for &'a mut WireDeserializer<'de, 'r> {
    type Error = Error;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::UnsupportedType("any"))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::UnsupportedType("ignored_any"))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::UnsupportedType("identifier"))
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_bool(self.reader.read_bool()?)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i8(self.reader.read_i8()?)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i16(self.reader.read_i16()?)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i32(self.reader.read_i32()?)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i64(self.reader.read_i64()?)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u8(self.reader.read_u8()?)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u16(self.reader.read_u16()?)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u32(self.reader.read_u32()?)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u64(self.reader.read_u64()?)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f32(self.reader.read_f32()?)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f64(self.reader.read_f64()?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::UnsupportedType("char"))
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str(self.reader.read_str()?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_bytes(self.reader.read_byte_array()?)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        // Any nonzero presence byte counts as present
        if self.reader.read_u8()? == 0 {
            visitor.visit_none()
        } else {
            self.depth_tracking.enter()?;
            let val = visitor.visit_some(&mut *self)?;
            self.depth_tracking.leave();
            Ok(val)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        if name == VARUINT_TOKEN {
            visitor.visit_u64(self.reader.read_uvarint()?)
        } else {
            visitor.visit_newtype_struct(self)
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let len = self.read_len("decode sequence length")?;
        self.depth_tracking.enter()?;
        let val = visitor.visit_seq(SeqAccess::new(self, len))?;
        self.depth_tracking.leave();
        Ok(val)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value> {
        let actual = self.read_len("decode array length")?;
        if actual != len {
            return Err(Error::LengthMismatch {
                expected: len,
                actual,
            });
        }
        self.depth_tracking.enter()?;
        let val = visitor.visit_seq(SeqAccess::new(self, len))?;
        self.depth_tracking.leave();
        Ok(val)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        match name {
            RAW_BYTES_TOKEN => {
                visitor.visit_borrowed_bytes(self.reader.read_fixed(len, "decode fixed bytes")?)
            }
            ENVELOPE_TOKEN => {
                let (tag, payload) = self.read_envelope()?;
                visitor.visit_seq(EnvelopeAccess::new(tag, payload, self.options))
            }
            _ => {
                self.depth_tracking.enter()?;
                let val = visitor.visit_seq(SeqAccess::new(self, len))?;
                self.depth_tracking.leave();
                Ok(val)
            }
        }
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let len = self.read_len("decode map length")?;
        self.depth_tracking.enter()?;
        let val = visitor.visit_map(MapAccess::new(self, len))?;
        self.depth_tracking.leave();
        Ok(val)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.depth_tracking.enter()?;
        let val = visitor.visit_seq(SeqAccess::new(self, fields.len()))?;
        self.depth_tracking.leave();
        Ok(val)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.depth_tracking.enter()?;
        let val = visitor.visit_enum(EnumAccess::new(self))?;
        self.depth_tracking.leave();
        Ok(val)
    }
}

struct EnumAccess<'a, 'de, 'r> {
    de: &'a mut WireDeserializer<'de, 'r>,
}

impl<'a, 'de, 'r> EnumAccess<'a, 'de, 'r> {
    fn new(de: &'a mut WireDeserializer<'de, 'r>) -> Self {
        Self { de }
    }
}

impl<'a, 'de, 'r> serde::de::EnumAccess<'de> for EnumAccess<'a, 'de, 'r> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let index = self.de.reader.read_uvarint()?;
        let index = u32::try_from(index)
            .map_err(|_| Error::SerdeFail(format!("enum variant index {} is too large", index)))?;
        let val = seed.deserialize(U32Deserializer::<Error>::new(index))?;
        Ok((val, self))
    }
}

impl<'a, 'de, 'r> serde::de::VariantAccess<'de> for EnumAccess<'a, 'de, 'r> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }

    fn struct_variant<V>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_seq(SeqAccess::new(self.de, fields.len()))
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_seq(SeqAccess::new(self.de, len))
    }
}

struct SeqAccess<'a, 'de, 'r> {
    de: &'a mut WireDeserializer<'de, 'r>,
    size_left: usize,
}

impl<'a, 'de, 'r> SeqAccess<'a, 'de, 'r> {
    fn new(de: &'a mut WireDeserializer<'de, 'r>, len: usize) -> Self {
        Self { de, size_left: len }
    }
}

impl<'a, 'de, 'r> serde::de::SeqAccess<'de> for SeqAccess<'a, 'de, 'r> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        if self.size_left > 0 {
            self.size_left -= 1;
            let val = seed.deserialize(&mut *self.de)?;
            Ok(Some(val))
        } else {
            Ok(None)
        }
    }

    fn size_hint(&self) -> Option<usize> {
        // A count can't be larger than the bytes left to hold its elements, unless the elements
        // take up no space at all. Don't hand out a hint that would preallocate beyond that.
        Some(self.size_left.min(self.de.reader.remaining()))
    }
}

struct MapAccess<'a, 'de, 'r> {
    de: &'a mut WireDeserializer<'de, 'r>,
    size_left: usize,
}

impl<'a, 'de, 'r> MapAccess<'a, 'de, 'r> {
    fn new(de: &'a mut WireDeserializer<'de, 'r>, len: usize) -> Self {
        Self { de, size_left: len }
    }
}

impl<'a, 'de, 'r> serde::de::MapAccess<'de> for MapAccess<'a, 'de, 'r> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        if self.size_left > 0 {
            self.size_left -= 1;
            Ok(Some(seed.deserialize(&mut *self.de)?))
        } else {
            Ok(None)
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.size_left.min(self.de.reader.remaining()))
    }
}

/// Hands an envelope's parts to its visitor as a sequence: the type tag, the raw payload, and
/// the resolved message (if resolution is on).
struct EnvelopeAccess<'de, 'r> {
    tag: u8,
    payload: &'de [u8],
    options: DecodeOptions<'r>,
    next: usize,
}

impl<'de, 'r> EnvelopeAccess<'de, 'r> {
    fn new(tag: u8, payload: &'de [u8], options: DecodeOptions<'r>) -> Self {
        Self {
            tag,
            payload,
            options,
            next: 0,
        }
    }
}

impl<'de, 'r> serde::de::SeqAccess<'de> for EnvelopeAccess<'de, 'r> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        let val = match self.next {
            0 => seed.deserialize(U8Deserializer::<Error>::new(self.tag))?,
            1 => seed.deserialize(BorrowedBytesDeserializer::<Error>::new(self.payload))?,
            2 => seed.deserialize(PayloadDeserializer {
                tag: self.tag,
                payload: self.payload,
                options: self.options,
            })?,
            _ => return Ok(None),
        };
        self.next += 1;
        Ok(Some(val))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(3usize.saturating_sub(self.next))
    }
}

/// The optional decoded message inside an envelope.
struct PayloadDeserializer<'de, 'r> {
    tag: u8,
    payload: &'de [u8],
    options: DecodeOptions<'r>,
}

impl<'de, 'r> serde::Deserializer<'de> for PayloadDeserializer<'de, 'r> {
    type Error = Error;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::SerdeFail(
            "envelope message must be decoded as an Option".to_string(),
        ))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if !self.options.resolve_messages {
            return visitor.visit_none();
        }
        let variant = self
            .options
            .registry
            .variant_name(self.tag)
            .ok_or(Error::UnknownMessageType(self.tag))?;
        visitor.visit_some(ResolvedPayload {
            tag: self.tag,
            variant,
            payload: self.payload,
            options: self.options,
        })
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str
        string bytes byte_buf unit unit_struct newtype_struct
        seq tuple tuple_struct map struct enum identifier ignored_any
    }
}

/// An envelope payload whose message variant has already been picked from the registry.
struct ResolvedPayload<'de, 'r> {
    tag: u8,
    variant: &'static str,
    payload: &'de [u8],
    options: DecodeOptions<'r>,
}

impl<'de, 'r> ResolvedPayload<'de, 'r> {
    fn payload_deserializer(&self) -> WireDeserializer<'de, 'r> {
        WireDeserializer::new(self.payload, self.options)
    }

    fn check_trailing(&self, de: &WireDeserializer<'de, 'r>) {
        let trailing = de.reader.remaining();
        if trailing > 0 {
            debug!(
                tag = self.tag,
                variant = self.variant,
                trailing,
                "p2p message payload has unread trailing bytes"
            );
        }
    }
}

impl<'de, 'r> serde::Deserializer<'de> for ResolvedPayload<'de, 'r> {
    type Error = Error;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::SerdeFail(
            "envelope message must be decoded as an enum".to_string(),
        ))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_enum(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str
        string bytes byte_buf option unit unit_struct newtype_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

impl<'de, 'r> serde::de::EnumAccess<'de> for ResolvedPayload<'de, 'r> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let val = seed.deserialize(StrDeserializer::<Error>::new(self.variant))?;
        Ok((val, self))
    }
}

impl<'de, 'r> serde::de::VariantAccess<'de> for ResolvedPayload<'de, 'r> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        let de = self.payload_deserializer();
        self.check_trailing(&de);
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        let mut de = self.payload_deserializer();
        let val = seed.deserialize(&mut de)?;
        self.check_trailing(&de);
        Ok(val)
    }

    fn struct_variant<V>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let mut de = self.payload_deserializer();
        let val = visitor.visit_seq(SeqAccess::new(&mut de, fields.len()))?;
        self.check_trailing(&de);
        Ok(val)
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let mut de = self.payload_deserializer();
        let val = visitor.visit_seq(SeqAccess::new(&mut de, len))?;
        self.check_trailing(&de);
        Ok(val)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{to_vec, MAX_DEPTH};
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[test]
    fn integers() {
        assert_eq!(from_slice::<u32>(&[0x64, 0, 0, 0]).unwrap(), 100);
        assert_eq!(from_slice::<i16>(&[0xFE, 0xFF]).unwrap(), -2);
        assert_eq!(from_slice::<bool>(&[0x01]).unwrap(), true);
        assert!(from_slice::<bool>(&[0x02]).is_err());
    }

    #[test]
    fn borrowed_str_and_bytes() {
        let data = [0x03, b'a', b'b', b'c'];
        let s: &str = from_slice(&data).unwrap();
        assert_eq!(s, "abc");
        let b: &[u8] = from_slice(&data).unwrap();
        assert_eq!(b, b"abc");
    }

    #[test]
    fn trailing_bytes() {
        assert_eq!(
            from_slice::<u8>(&[0x01, 0x02]),
            Err(Error::TrailingBytes(1))
        );
    }

    #[test]
    fn failed_decode_does_not_move() {
        let data = [0x05, 0x00, 0x00];
        let mut decoder = Decoder::new(&data);
        assert!(decoder.decode::<u32>().is_err());
        assert_eq!(decoder.position(), 0);
        assert_eq!(decoder.decode::<u16>().unwrap(), 5);
        assert_eq!(decoder.remaining(), 1);
        assert_eq!(decoder.finish(), Err(Error::TrailingBytes(1)));
    }

    #[test]
    fn fixed_array_count_checked() {
        let arr: [u8; 3] = from_slice(&[0x03, 7, 8, 9]).unwrap();
        assert_eq!(arr, [7, 8, 9]);
        assert_eq!(
            from_slice::<[u8; 3]>(&[0x02, 7, 8]),
            Err(Error::LengthMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn options_any_nonzero_is_present() {
        assert_eq!(from_slice::<Option<u8>>(&[0x00]).unwrap(), None);
        assert_eq!(from_slice::<Option<u8>>(&[0x01, 0x07]).unwrap(), Some(7));
        assert_eq!(from_slice::<Option<u8>>(&[0x7F, 0x07]).unwrap(), Some(7));
    }

    #[test]
    fn maps() {
        let data = [0x02, 0x01, 0x01, b'a', 0x02, 0x01, b'b'];
        let map: BTreeMap<u8, String> = from_slice(&data).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&1], "a");
        assert_eq!(map[&2], "b");
    }

    #[test]
    fn skipped_fields_default() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Record {
            a: u8,
            #[serde(skip)]
            cache: Option<u64>,
            b: u16,
        }
        let dec: Record = from_slice(&[0x01, 0x02, 0x00]).unwrap();
        assert_eq!(
            dec,
            Record {
                a: 1,
                cache: None,
                b: 2
            }
        );
    }

    #[test]
    fn enums() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        enum Kind {
            A,
            B(u8),
            C { x: u16 },
            D(u8, u8),
        }
        for kind in [Kind::A, Kind::B(9), Kind::C { x: 300 }, Kind::D(1, 2)] {
            let enc = to_vec(&kind).unwrap();
            let dec: Kind = from_slice(&enc).unwrap();
            assert_eq!(dec, kind);
        }
        assert!(from_slice::<Kind>(&[0x04]).is_err(), "no fifth variant");
    }

    #[test]
    fn self_describing_unsupported() {
        assert_eq!(
            from_slice::<serde_json::Value>(&[0x00]),
            Err(Error::UnsupportedType("any"))
        );
        assert_eq!(from_slice::<char>(&[0x61]), Err(Error::UnsupportedType("char")));
    }

    #[test]
    fn depth_limit() {
        fn nested(depth: usize) -> Vec<u8> {
            // depth levels of Vec, innermost empty
            let mut data = vec![0x01; depth - 1];
            data.push(0x00);
            data
        }

        #[derive(Deserialize)]
        struct Deep(Vec<Deep>);

        assert!(from_slice::<Deep>(&nested(MAX_DEPTH / 2)).is_ok());
        assert!(matches!(
            from_slice::<Deep>(&nested(MAX_DEPTH + 1)),
            Err(Error::ParseLimit(_))
        ));
    }

    #[test]
    fn hostile_count_fails_cleanly() {
        // Claims a huge sequence but only has a couple of bytes
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0x01, 0x02];
        assert!(matches!(
            from_slice::<Vec<u32>>(&data),
            Err(Error::BufferUnderrun { .. })
        ));
    }
}
