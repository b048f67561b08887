//! P2P message records.
//!
//! These are plain records: their wire form comes entirely from field order, so don't reorder
//! fields. Nothing here checks that a message makes sense, only that it is well-formed.

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::blob::{Checksum256, PublicKey, Signature};
use crate::envelope::P2PMessageType;
use crate::error::{Error, Result};
use crate::name::{AccountName, ActionName, PermissionName};
use crate::timestamp::{BlockTimestamp, Tstamp};
use crate::varint::Varuint32;
use crate::{from_slice, to_vec};

/// First message sent on a new connection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeMessage {
    pub network_version: u16,
    pub chain_id: Checksum256,
    pub node_id: Checksum256,
    pub key: PublicKey,
    pub time: Tstamp,
    pub token: Checksum256,
    pub signature: Signature,
    pub p2p_address: String,
    pub last_irreversible_block_num: u32,
    pub last_irreversible_block_id: Checksum256,
    pub head_num: u32,
    pub head_id: Checksum256,
    pub os: String,
    pub agent: String,
    pub generation: i16,
}

wire_u8_enum! {
    /// Why a peer is closing the connection.
    pub enum GoAwayReason {
        NoReason = 0,
        SelfConnect = 1,
        Duplicate = 2,
        WrongChain = 3,
        WrongVersion = 4,
        Forked = 5,
        Unlinkable = 6,
        BadTransaction = 7,
        Validation = 8,
        BenignOther = 9,
        FatalOther = 10,
        Authentication = 11,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoAwayMessage {
    pub reason: GoAwayReason,
    pub node_id: Checksum256,
}

/// Clock synchronization probe, in the manner of NTP.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeMessage {
    pub origin: Tstamp,
    pub receive: Tstamp,
    pub transmit: Tstamp,
    pub destination: Tstamp,
}

/// How a peer should interpret an [`OrderedIds`] list. Carried as a little-endian u32.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IdListMode {
    #[default]
    None,
    CatchUp,
    LastIrrCatchUp,
    Normal,
}

impl IdListMode {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(IdListMode::None),
            1 => Some(IdListMode::CatchUp),
            2 => Some(IdListMode::LastIrrCatchUp),
            3 => Some(IdListMode::Normal),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            IdListMode::None => 0,
            IdListMode::CatchUp => 1,
            IdListMode::LastIrrCatchUp => 2,
            IdListMode::Normal => 3,
        }
    }
}

impl Serialize for IdListMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.as_u32())
    }
}

impl<'de> Deserialize<'de> for IdListMode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as DeError;
        let v = u32::deserialize(deserializer)?;
        IdListMode::from_u32(v).ok_or_else(|| {
            D::Error::invalid_value(serde::de::Unexpected::Unsigned(v as u64), &"an id list mode")
        })
    }
}

/// A list of block or transaction IDs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedIds {
    pub mode: IdListMode,
    pub pending: u32,
    pub ids: Vec<Checksum256>,
}

/// Tells a peer which transactions and blocks we already have.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeMessage {
    pub known_trx: OrderedIds,
    pub known_blocks: OrderedIds,
}

/// Asks a peer for transactions and blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub req_trx: OrderedIds,
    pub req_blocks: OrderedIds,
}

/// Asks a peer for an inclusive range of blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequestMessage {
    pub start_block: u32,
    pub end_block: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerKey {
    pub producer_name: AccountName,
    pub block_signing_key: PublicKey,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerSchedule {
    pub version: u32,
    pub producers: Vec<ProducerKey>,
}

/// Opaque typed extension data attached to headers and transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    #[serde(rename = "type")]
    pub ty: u16,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub timestamp: BlockTimestamp,
    pub producer: AccountName,
    pub confirmed: u16,
    pub previous: Checksum256,
    pub transaction_mroot: Checksum256,
    pub action_mroot: Checksum256,
    pub schedule_version: u32,
    pub new_producers: Option<ProducerSchedule>,
    pub header_extensions: Vec<Extension>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlockHeader {
    pub header: BlockHeader,
    pub producer_signature: Signature,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlockSummaryMessage {
    pub signed_header: SignedBlockHeader,
    pub transaction_ids: Vec<Checksum256>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlockMessage {
    pub summary: SignedBlockSummaryMessage,
    pub input_transactions: Vec<PackedTransaction>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: AccountName,
    pub permission: PermissionName,
}

/// A contract call. `data` is the action's own encoding of its arguments, kept opaque here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub account: AccountName,
    pub name: ActionName,
    pub authorization: Vec<PermissionLevel>,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    /// Seconds since the Unix epoch after which the transaction is void.
    pub expiration: u32,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub max_net_usage_words: Varuint32,
    pub max_cpu_usage_ms: u8,
    pub delay_sec: Varuint32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub header: TransactionHeader,
    pub context_free_actions: Vec<Action>,
    pub actions: Vec<Action>,
    pub transaction_extensions: Vec<Extension>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signatures: Vec<Signature>,
    pub context_free_data: Vec<ByteBuf>,
}

wire_u8_enum! {
    #[derive(Default)]
    pub enum CompressionType {
        #[default]
        None = 0,
        Zlib = 1,
    }
}

/// A signed transaction with its body and context-free data pre-encoded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedTransaction {
    pub signatures: Vec<Signature>,
    pub compression: CompressionType,
    #[serde(with = "serde_bytes")]
    pub packed_context_free_data: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub packed_trx: Vec<u8>,
}

impl PackedTransaction {
    /// Pack a signed transaction, without compression.
    pub fn pack(tx: &SignedTransaction) -> Result<Self> {
        let packed_context_free_data = if tx.context_free_data.is_empty() {
            Vec::new()
        } else {
            to_vec(&tx.context_free_data)?
        };
        Ok(Self {
            signatures: tx.signatures.clone(),
            compression: CompressionType::None,
            packed_context_free_data,
            packed_trx: to_vec(&tx.transaction)?,
        })
    }

    /// Unpack into a signed transaction. Only uncompressed transactions can be unpacked.
    pub fn unpack(&self) -> Result<SignedTransaction> {
        if self.compression != CompressionType::None {
            return Err(Error::UnsupportedType("compressed packed transaction"));
        }
        let transaction = from_slice(&self.packed_trx)?;
        let context_free_data = if self.packed_context_free_data.is_empty() {
            Vec::new()
        } else {
            from_slice(&self.packed_context_free_data)?
        };
        Ok(SignedTransaction {
            transaction,
            signatures: self.signatures.clone(),
            context_free_data,
        })
    }
}

/// Every message a peer can send. Each variant is named after its [`P2PMessageType`], which is
/// how envelope decoding finds it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum P2PMessage {
    Handshake(HandshakeMessage),
    GoAway(GoAwayMessage),
    Time(TimeMessage),
    Notice(NoticeMessage),
    Request(RequestMessage),
    SyncRequest(SyncRequestMessage),
    SignedBlockSummary(SignedBlockSummaryMessage),
    SignedBlock(SignedBlockMessage),
    SignedTransaction(SignedTransaction),
    PackedTransaction(PackedTransaction),
}

impl P2PMessage {
    pub fn message_type(&self) -> P2PMessageType {
        match self {
            P2PMessage::Handshake(_) => P2PMessageType::Handshake,
            P2PMessage::GoAway(_) => P2PMessageType::GoAway,
            P2PMessage::Time(_) => P2PMessageType::Time,
            P2PMessage::Notice(_) => P2PMessageType::Notice,
            P2PMessage::Request(_) => P2PMessageType::Request,
            P2PMessage::SyncRequest(_) => P2PMessageType::SyncRequest,
            P2PMessage::SignedBlockSummary(_) => P2PMessageType::SignedBlockSummary,
            P2PMessage::SignedBlock(_) => P2PMessageType::SignedBlock,
            P2PMessage::SignedTransaction(_) => P2PMessageType::SignedTransaction,
            P2PMessage::PackedTransaction(_) => P2PMessageType::PackedTransaction,
        }
    }

    /// Encode just the message record, without a variant index, as it goes in an envelope.
    pub fn encode_payload(&self) -> Result<Vec<u8>> {
        match self {
            P2PMessage::Handshake(m) => to_vec(m),
            P2PMessage::GoAway(m) => to_vec(m),
            P2PMessage::Time(m) => to_vec(m),
            P2PMessage::Notice(m) => to_vec(m),
            P2PMessage::Request(m) => to_vec(m),
            P2PMessage::SyncRequest(m) => to_vec(m),
            P2PMessage::SignedBlockSummary(m) => to_vec(m),
            P2PMessage::SignedBlock(m) => to_vec(m),
            P2PMessage::SignedTransaction(m) => to_vec(m),
            P2PMessage::PackedTransaction(m) => to_vec(m),
        }
    }
}
