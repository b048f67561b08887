use std::fmt;

use serde::{de, ser};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Fewer bytes remained in the buffer than a read required.
    BufferUnderrun {
        step: &'static str,
        needed: usize,
        remaining: usize,
    },
    /// A varint ran off the end of the buffer, was longer than 10 bytes, or overflowed a u64.
    MalformedVarint,
    /// The value's shape has no encoding in this format.
    UnsupportedType(&'static str),
    /// An envelope carried a type tag that isn't in the message registry.
    UnknownMessageType(u8),
    /// A fixed-length array was encoded with a different element count than its type declares.
    LengthMismatch { expected: usize, actual: usize },
    /// Basic wire encoding failure: bad bool byte, invalid UTF-8, zero-length envelope, etc.
    BadEncode(String),
    /// A string couldn't be packed into a 64-bit name symbol.
    InvalidName(String),
    /// Top-level decode finished with bytes left over.
    TrailingBytes(usize),
    /// Decoding hit the nesting depth limit.
    ParseLimit(String),
    /// Occurs when serde serialization or deserialization fails
    SerdeFail(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::BufferUnderrun {
                step,
                needed,
                remaining,
            } => write!(
                f,
                "Buffer underrun on step [{}]: needed {} bytes, {} remaining",
                step, needed, remaining
            ),
            Error::MalformedVarint => f.write_str("varint: invalid buffer size"),
            Error::UnsupportedType(ty) => write!(f, "binary: unsupported type {}", ty),
            Error::UnknownMessageType(tag) => write!(f, "unknown p2p message type [{}]", tag),
            Error::LengthMismatch { expected, actual } => write!(
                f,
                "Fixed array length mismatch: type declares {} elements, data has {}",
                expected, actual
            ),
            Error::BadEncode(ref err) => write!(f, "Basic data encoding failure: {}", err),
            Error::InvalidName(ref name) => write!(f, "Invalid name: {:?}", name),
            Error::TrailingBytes(n) => write!(f, "{} bytes left over after decoding", n),
            Error::ParseLimit(ref err) => write!(f, "Hit parsing limit: {}", err),
            Error::SerdeFail(ref msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}
