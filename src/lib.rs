//! A binary codec for the compact, length-prefixed wire format used between blockchain p2p
//! nodes.
//!
//! Any type implementing serde's `Serialize`/`Deserialize` can be encoded and decoded. The format
//! has no type markers or field names: a value's bytes are determined entirely by its Rust type,
//! so both sides must agree on the types ahead of time.
//!
//! - Integers are fixed-width little-endian, and `bool` is a single 0 or 1 byte.
//! - Strings, byte arrays, sequences, and maps are prefixed with a varint length.
//! - Structs are their fields in declaration order. Fields marked `#[serde(skip)]` are left out.
//! - `Option` is a presence byte followed by the value, if any.
//! - Enums are a varint variant index followed by the variant's fields.
//!
//! On top of that, the crate provides the protocol's leaf types, each with its own fixed layout:
//! [`Checksum256`], [`PublicKey`], and [`Signature`] are raw fixed-width bytes; [`Tstamp`] and
//! [`BlockTimestamp`] are two incompatible time encodings; [`Name`] is a 64-bit packed symbol;
//! and [`Varuint32`] is a u32 carried as a varint.
//!
//! Finally, [`P2PMessageEnvelope`] frames a message with its length and type tag. Decoding an
//! envelope also decodes its payload as the [`P2PMessage`] variant the tag selects.
//!
//! # Example
//!
//! ```
//! # use chain_pack::*;
//! let msg = P2PMessage::SyncRequest(SyncRequestMessage {
//!     start_block: 100,
//!     end_block: 200,
//! });
//! let envelope = P2PMessageEnvelope::from_message(msg.clone())?;
//! let bytes = to_vec(&envelope)?;
//! assert_eq!(&bytes[..5], &[9, 0, 0, 0, 5]);
//!
//! let decoded: P2PMessageEnvelope = from_slice(&bytes)?;
//! assert_eq!(decoded.message(), Some(&msg));
//! # Ok::<(), Error>(())
//! ```
//!
//! # Logging
//!
//! The decoder emits `tracing` events: `trace` for each envelope and byte array read, and `debug`
//! when a message payload has bytes left over. Install a subscriber to see them.

#[macro_use]
mod macros;

mod blob;
mod de;
mod depth_tracking;
mod envelope;
mod error;
mod name;
mod p2p;
mod ser;
mod timestamp;
mod varint;
pub mod wire;

pub use blob::{Checksum256, PublicKey, Signature};
pub use de::{from_slice, Decoder};
pub use envelope::{MessageRegistry, P2PMessageEnvelope, P2PMessageType};
pub use error::{Error, Result};
pub use name::{
    name_to_string, string_to_name, AccountName, ActionName, Name, PermissionName, ScopeName,
    TableName,
};
pub use p2p::*;
pub use ser::{to_vec, to_writer};
pub use timestamp::{BlockTimestamp, Tstamp, BLOCK_TIMESTAMP_EPOCH};
pub use varint::{read_uvarint, uvarint_len, write_uvarint, Varuint32, MAX_VARINT_LEN};

/// Deepest container nesting the decoder will follow before giving up.
pub const MAX_DEPTH: usize = 100;
