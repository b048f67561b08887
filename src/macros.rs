/// Define an opaque, fixed-width byte blob.
///
/// The blob is always exactly `$len` bytes. Building one from an empty slice gives the all-zero
/// blob, which is also its `Default`. On the wire it is the raw bytes with no length prefix;
/// human-readable formats see a hex string.
macro_rules! fixed_blob {
    ($(#[$attr:meta])* $name:ident, $len:expr) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Encoded size in bytes.
            pub const LEN: usize = $len;

            pub fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Copy from a slice of exactly `LEN` bytes. An empty slice gives the zero value.
            pub fn from_slice(bytes: &[u8]) -> $crate::error::Result<Self> {
                if bytes.is_empty() {
                    return Ok(Self::default());
                }
                let arr: [u8; $len] = bytes.try_into().map_err(|_| {
                    $crate::error::Error::BadEncode(format!(
                        "{} must be {} bytes, got {}",
                        stringify!($name),
                        $len,
                        bytes.len()
                    ))
                })?;
                Ok(Self(arr))
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// True if every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; $len])
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = $crate::error::Error;
            fn try_from(bytes: &[u8]) -> $crate::error::Result<Self> {
                Self::from_slice(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::Error;
            fn from_str(s: &str) -> $crate::error::Result<Self> {
                let bytes = hex::decode(s).map_err(|e| {
                    $crate::error::Error::BadEncode(format!(
                        "{} hex string is invalid: {}",
                        stringify!($name),
                        e
                    ))
                })?;
                Self::from_slice(&bytes)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&hex::encode(self.0))
                } else {
                    serializer.serialize_newtype_struct(
                        $crate::wire::RAW_BYTES_TOKEN,
                        serde_bytes::Bytes::new(&self.0),
                    )
                }
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                use serde::de::Error as DeError;

                struct BlobVisitor;

                impl<'de> serde::de::Visitor<'de> for BlobVisitor {
                    type Value = $name;

                    fn expecting(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                        write!(fmt, "{} raw bytes", $len)
                    }

                    fn visit_bytes<E: DeError>(self, v: &[u8]) -> Result<Self::Value, E> {
                        if v.len() != $len {
                            return Err(E::invalid_length(v.len(), &self));
                        }
                        $name::from_slice(v).map_err(E::custom)
                    }

                    fn visit_str<E: DeError>(self, v: &str) -> Result<Self::Value, E> {
                        v.parse::<$name>().map_err(E::custom)
                    }

                    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
                    where
                        A: serde::de::SeqAccess<'de>,
                    {
                        let mut out = [0u8; $len];
                        for (i, slot) in out.iter_mut().enumerate() {
                            *slot = seq
                                .next_element()?
                                .ok_or_else(|| A::Error::invalid_length(i, &self))?;
                        }
                        Ok($name(out))
                    }
                }

                if deserializer.is_human_readable() {
                    deserializer.deserialize_str(BlobVisitor)
                } else {
                    deserializer.deserialize_tuple_struct(
                        $crate::wire::RAW_BYTES_TOKEN,
                        $len,
                        BlobVisitor,
                    )
                }
            }
        }
    };
}

/// Define a closed set of values that travel as a single byte.
macro_rules! wire_u8_enum {
    (
        $(#[$attr:meta])*
        pub enum $name:ident {
            $($(#[$vattr:meta])* $variant:ident = $value:literal),+ $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vattr])* $variant = $value),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn from_u8(v: u8) -> Option<Self> {
                match v {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn as_u8(self) -> u8 {
                self as u8
            }

            /// Name of the variant as written in source.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant),)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_u8(*self as u8)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                use serde::de::Error as DeError;
                let v = <u8 as serde::Deserialize>::deserialize(deserializer)?;
                $name::from_u8(v).ok_or_else(|| {
                    D::Error::invalid_value(
                        serde::de::Unexpected::Unsigned(v as u64),
                        &stringify!($name),
                    )
                })
            }
        }
    };
}
