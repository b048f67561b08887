//! Primitive reads and writes.
//!
//! [`Reader`] is the decode cursor: a borrowed input buffer and a read offset that only moves
//! forward, by exactly the number of bytes each read consumed. [`Writer`] is the encode buffer,
//! which is only ever appended to. All fixed-width integers are little-endian.

use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

use crate::error::{Error, Result};
use crate::varint;

/// Newtype-struct name marking bytes that go on the wire with no length prefix.
pub(crate) const RAW_BYTES_TOKEN: &str = "$chain_pack::RawBytes";
/// Newtype-struct name marking an integer carried as a varint.
pub(crate) const VARUINT_TOKEN: &str = "$chain_pack::Varuint32";
/// Newtype-struct name marking a type-tagged message envelope.
pub(crate) const ENVELOPE_TOKEN: &str = "$chain_pack::P2PMessageEnvelope";

/// Decode cursor over a borrowed byte buffer.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take exactly `n` bytes, or fail without moving.
    pub fn read_fixed(&mut self, n: usize, step: &'static str) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(Error::BufferUnderrun {
                step,
                needed: n,
                remaining,
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_fixed(1, "decode u8")?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(Error::BadEncode(format!("invalid bool byte 0x{:02x}", v))),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_fixed(2, "decode u16")?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.read_fixed(2, "decode i16")?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_fixed(4, "decode u32")?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_fixed(4, "decode i32")?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_fixed(8, "decode u64")?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.read_fixed(8, "decode i64")?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.read_fixed(4, "decode f32")?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.read_fixed(8, "decode f64")?))
    }

    pub fn read_uvarint(&mut self) -> Result<u64> {
        let (v, used) = varint::read_uvarint(&self.data[self.pos..])?;
        self.pos += used;
        Ok(v)
    }

    /// Read a varint length, then that many bytes.
    pub fn read_byte_array(&mut self) -> Result<&'a [u8]> {
        let len = self.read_uvarint()?;
        let len = usize::try_from(len).map_err(|_| Error::BufferUnderrun {
            step: "decode byte array",
            needed: usize::MAX,
            remaining: self.remaining(),
        })?;
        let out = self.read_fixed(len, "decode byte array")?;
        trace!(len, "read byte array");
        Ok(out)
    }

    pub fn read_str(&mut self) -> Result<&'a str> {
        let raw = self.read_byte_array()?;
        std::str::from_utf8(raw).map_err(|e| Error::BadEncode(format!("invalid UTF-8: {}", e)))
    }
}

/// Append-only encode buffer.
#[derive(Clone, Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_bits().to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_bits().to_le_bytes());
    }

    pub fn write_uvarint(&mut self, v: u64) {
        varint::write_uvarint(&mut self.buf, v);
    }

    /// Write a varint length followed by the bytes themselves.
    pub fn write_byte_array(&mut self, bytes: &[u8]) {
        self.write_uvarint(bytes.len() as u64);
        self.append(bytes);
    }

    pub fn write_str(&mut self, s: &str) {
        self.write_byte_array(s.as_bytes());
    }

    /// Write exactly `n` bytes with no prefix. An empty input becomes `n` zero bytes.
    pub fn write_fixed(&mut self, bytes: &[u8], n: usize) -> Result<()> {
        if bytes.is_empty() {
            self.buf.resize(self.buf.len() + n, 0);
            Ok(())
        } else if bytes.len() == n {
            self.append(bytes);
            Ok(())
        } else {
            Err(Error::BadEncode(format!(
                "expected {} fixed bytes, got {}",
                n,
                bytes.len()
            )))
        }
    }
}
