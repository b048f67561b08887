//! Type-tagged p2p message envelopes.
//!
//! Every message between peers travels inside an envelope:
//!
//! ```text
//! +-------------+----------+-----------------------+
//! | length: u32 | type: u8 | payload: length-1 B   |
//! +-------------+----------+-----------------------+
//! ```
//!
//! `length` counts the type byte plus the payload. The type byte selects which message record the
//! payload holds, through a [`MessageRegistry`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use serde::de::{Deserialize, Deserializer, Error as DeError, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_bytes::ByteBuf;

use crate::de::resolve_message;
use crate::error::{Error, Result};
use crate::p2p::P2PMessage;
use crate::ser::RawBytes;
use crate::wire::ENVELOPE_TOKEN;

wire_u8_enum! {
    /// Type tag of a p2p message, as carried in its envelope header.
    pub enum P2PMessageType {
        Handshake = 0,
        GoAway = 1,
        Time = 2,
        Notice = 3,
        Request = 4,
        SyncRequest = 5,
        SignedBlockSummary = 6,
        SignedBlock = 7,
        SignedTransaction = 8,
        PackedTransaction = 9,
    }
}

/// Maps envelope type tags to the [`P2PMessage`] variant their payload decodes as.
///
/// The standard registry covers every [`P2PMessageType`]. A custom registry can leave tags out
/// (so they fail to resolve) or route a tag to a different variant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageRegistry {
    variants: BTreeMap<u8, &'static str>,
}

impl MessageRegistry {
    /// A registry with no known tags.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shared registry of all standard message types. Built on first use and never modified
    /// afterwards.
    pub fn standard() -> &'static MessageRegistry {
        static STANDARD: OnceLock<MessageRegistry> = OnceLock::new();
        STANDARD.get_or_init(|| {
            let mut registry = MessageRegistry::empty();
            for ty in P2PMessageType::ALL {
                registry.register_type(*ty);
            }
            registry
        })
    }

    /// Route `tag` to the [`P2PMessage`] variant named `variant`. Returns the variant the tag was
    /// previously routed to, if any.
    pub fn register(&mut self, tag: u8, variant: &'static str) -> Option<&'static str> {
        self.variants.insert(tag, variant)
    }

    /// Route a standard message type's tag to its own variant.
    pub fn register_type(&mut self, ty: P2PMessageType) -> Option<&'static str> {
        self.register(ty.as_u8(), ty.as_str())
    }

    pub fn variant_name(&self, tag: u8) -> Option<&'static str> {
        self.variants.get(&tag).copied()
    }

    pub fn contains(&self, tag: u8) -> bool {
        self.variants.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// A framed p2p message.
///
/// The envelope owns the raw payload bytes, and always encodes them exactly as stored. The
/// decoded message, if there is one, can be read but not modified, so it can't drift out of
/// sync with the payload. To send a different message, build a new envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct P2PMessageEnvelope {
    type_tag: u8,
    payload: Vec<u8>,
    message: Option<P2PMessage>,
}

impl P2PMessageEnvelope {
    /// Wrap a message, encoding its payload.
    pub fn from_message(message: P2PMessage) -> Result<Self> {
        let payload = message.encode_payload()?;
        let mut envelope = Self::from_raw(message.message_type().as_u8(), payload)?;
        envelope.message = Some(message);
        Ok(envelope)
    }

    /// Wrap an already-encoded payload. The message is left unresolved.
    pub fn from_raw(type_tag: u8, payload: Vec<u8>) -> Result<Self> {
        if payload.len() >= u32::MAX as usize {
            return Err(Error::BadEncode(format!(
                "p2p message payload of {} bytes is too large for an envelope",
                payload.len()
            )));
        }
        Ok(Self {
            type_tag,
            payload,
            message: None,
        })
    }

    /// The envelope's length field: one byte of type tag plus the payload.
    pub fn length(&self) -> u32 {
        (self.payload.len() + 1) as u32
    }

    pub fn type_tag(&self) -> u8 {
        self.type_tag
    }

    /// The standard message type for this envelope's tag, if it is one.
    pub fn message_type(&self) -> Option<P2PMessageType> {
        P2PMessageType::from_u8(self.type_tag)
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The decoded message. `None` if the envelope was decoded with message resolution turned
    /// off, or built from a raw payload.
    pub fn message(&self) -> Option<&P2PMessage> {
        self.message.as_ref()
    }

    pub fn into_message(self) -> Option<P2PMessage> {
        self.message
    }

    /// Decode the payload against `registry`, replacing any previously decoded message.
    pub fn resolve(&mut self, registry: &MessageRegistry) -> Result<&P2PMessage> {
        let message = resolve_message(self.type_tag, &self.payload, registry)?;
        Ok(self.message.insert(message))
    }
}

impl TryFrom<P2PMessage> for P2PMessageEnvelope {
    type Error = Error;
    fn try_from(message: P2PMessage) -> Result<Self> {
        Self::from_message(message)
    }
}

impl Serialize for P2PMessageEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("P2PMessageEnvelope", 3)?;
        s.serialize_field("length", &self.length())?;
        s.serialize_field("type", &self.type_tag)?;
        s.serialize_field("payload", &RawBytes(&self.payload))?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for P2PMessageEnvelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EnvelopeVisitor;

        impl<'de> Visitor<'de> for EnvelopeVisitor {
            type Value = P2PMessageEnvelope;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(fmt, "a p2p message envelope")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let type_tag: u8 = seq
                    .next_element()?
                    .ok_or_else(|| A::Error::invalid_length(0, &self))?;
                let payload: ByteBuf = seq
                    .next_element()?
                    .ok_or_else(|| A::Error::invalid_length(1, &self))?;
                let message: Option<P2PMessage> = seq
                    .next_element()?
                    .ok_or_else(|| A::Error::invalid_length(2, &self))?;
                let mut envelope = P2PMessageEnvelope::from_raw(type_tag, payload.into_vec())
                    .map_err(A::Error::custom)?;
                envelope.message = message;
                Ok(envelope)
            }
        }

        deserializer.deserialize_tuple_struct(ENVELOPE_TOKEN, 3, EnvelopeVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::p2p::*;
    use crate::{from_slice, to_vec, Checksum256, Decoder};

    fn sync_request() -> P2PMessage {
        P2PMessage::SyncRequest(SyncRequestMessage {
            start_block: 1,
            end_block: 2,
        })
    }

    #[test]
    fn standard_registry() {
        let registry = MessageRegistry::standard();
        assert_eq!(registry.len(), 10);
        for ty in P2PMessageType::ALL {
            assert_eq!(registry.variant_name(ty.as_u8()), Some(ty.as_str()));
        }
        assert!(!registry.contains(10));
        assert!(std::ptr::eq(registry, MessageRegistry::standard()));
    }

    #[test]
    fn encode_layout() {
        let payload: Vec<u8> = (0..10).collect();
        let envelope = P2PMessageEnvelope::from_raw(5, payload.clone()).unwrap();
        assert_eq!(envelope.length(), 11);
        let enc = to_vec(&envelope).unwrap();
        let mut expected = vec![0x0B, 0x00, 0x00, 0x00, 0x05];
        expected.extend_from_slice(&payload);
        assert_eq!(enc, expected);
    }

    #[test]
    fn decode_resolves_message() {
        let envelope = P2PMessageEnvelope::from_message(sync_request()).unwrap();
        assert_eq!(envelope.type_tag(), 5);
        assert_eq!(envelope.length(), 9);
        let enc = to_vec(&envelope).unwrap();
        assert_eq!(
            enc,
            vec![0x09, 0x00, 0x00, 0x00, 0x05, 1, 0, 0, 0, 2, 0, 0, 0]
        );

        let dec: P2PMessageEnvelope = from_slice(&enc).unwrap();
        assert_eq!(dec.message_type(), Some(P2PMessageType::SyncRequest));
        assert_eq!(dec.message(), Some(&sync_request()));
        assert_eq!(dec, envelope);
    }

    #[test]
    fn unknown_tag() {
        let enc = [0x03, 0x00, 0x00, 0x00, 0x2A, 0xAA, 0xBB];
        assert_eq!(
            from_slice::<P2PMessageEnvelope>(&enc),
            Err(Error::UnknownMessageType(42))
        );

        let mut decoder = Decoder::new(&enc).resolve_messages(false);
        let dec: P2PMessageEnvelope = decoder.decode().unwrap();
        decoder.finish().unwrap();
        assert_eq!(dec.type_tag(), 42);
        assert_eq!(dec.message_type(), None);
        assert_eq!(dec.payload(), &[0xAA, 0xBB]);
        assert!(dec.message().is_none());
        assert_eq!(to_vec(&dec).unwrap(), enc.to_vec());
    }

    #[test]
    fn resolution_off_keeps_payload() {
        let enc = to_vec(&P2PMessageEnvelope::from_message(sync_request()).unwrap()).unwrap();
        let mut decoder = Decoder::new(&enc).resolve_messages(false);
        let mut dec: P2PMessageEnvelope = decoder.decode().unwrap();
        assert!(dec.message().is_none());
        assert_eq!(dec.payload(), &enc[5..]);
        let msg = dec.resolve(MessageRegistry::standard()).unwrap();
        assert_eq!(msg, &sync_request());
    }

    #[test]
    fn zero_length() {
        let enc = [0x00, 0x00, 0x00, 0x00, 0x05];
        assert!(matches!(
            from_slice::<P2PMessageEnvelope>(&enc),
            Err(Error::BadEncode(_))
        ));
    }

    #[test]
    fn payload_past_end() {
        let enc = [0x20, 0x00, 0x00, 0x00, 0x05, 0x01, 0x02];
        assert_eq!(
            from_slice::<P2PMessageEnvelope>(&enc),
            Err(Error::BufferUnderrun {
                step: "decode envelope payload",
                needed: 31,
                remaining: 2,
            })
        );
    }

    #[test]
    fn trailing_payload_tolerated() {
        let mut payload = to_vec(&SyncRequestMessage {
            start_block: 7,
            end_block: 9,
        })
        .unwrap();
        payload.extend_from_slice(&[0xDE, 0xAD]);
        let enc = to_vec(&P2PMessageEnvelope::from_raw(5, payload).unwrap()).unwrap();
        let dec: P2PMessageEnvelope = from_slice(&enc).unwrap();
        assert_eq!(
            dec.message(),
            Some(&P2PMessage::SyncRequest(SyncRequestMessage {
                start_block: 7,
                end_block: 9,
            }))
        );
        assert_eq!(dec.length(), 11);
    }

    #[test]
    fn custom_registry() {
        // Route tag 200 to the go-away record
        let mut registry = MessageRegistry::empty();
        registry.register(200, P2PMessageType::GoAway.as_str());
        let go_away = GoAwayMessage {
            reason: GoAwayReason::Duplicate,
            node_id: Checksum256::new([3; 32]),
        };
        let enc = to_vec(&P2PMessageEnvelope::from_raw(200, to_vec(&go_away).unwrap()).unwrap())
            .unwrap();

        let mut decoder = Decoder::new(&enc).with_registry(&registry);
        let dec: P2PMessageEnvelope = decoder.decode().unwrap();
        assert_eq!(dec.message(), Some(&P2PMessage::GoAway(go_away)));

        // The standard registry knows nothing of tag 200
        assert_eq!(
            from_slice::<P2PMessageEnvelope>(&enc),
            Err(Error::UnknownMessageType(200))
        );
    }

    #[test]
    fn truncated_message_in_payload() {
        // Sync request needs 8 bytes, payload only has 3
        let enc = [0x04, 0x00, 0x00, 0x00, 0x05, 0x01, 0x00, 0x00];
        assert!(matches!(
            from_slice::<P2PMessageEnvelope>(&enc),
            Err(Error::BufferUnderrun { .. })
        ));
    }
}
