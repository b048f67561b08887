//! Account, action, and permission names.
//!
//! A name is up to 13 characters from `.12345abcdefghijklmnopqrstuvwxyz`, packed into a u64 at
//! 5 bits per character from the most significant end. The 13th character only gets the last 4
//! bits, so it is limited to `.12345abcdefghij`. Names travel on the wire as that u64, in both
//! directions.

use std::fmt;
use std::str::FromStr;

use serde::{
    de::{Deserialize, Deserializer, Error as DeError, Visitor},
    ser::{Serialize, Serializer},
};

use crate::error::{Error, Result};

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";
const MAX_NAME_LEN: usize = 13;

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as u64 + 6),
        b'1'..=b'5' => Some((c - b'1') as u64 + 1),
        b'.' => Some(0),
        _ => None,
    }
}

/// Pack a name string into its 64-bit symbol.
pub fn string_to_name(s: &str) -> Result<u64> {
    let bytes = s.as_bytes();
    if bytes.len() > MAX_NAME_LEN {
        return Err(Error::InvalidName(s.to_string()));
    }
    let mut value = 0u64;
    for (i, &c) in bytes.iter().enumerate() {
        let sym = char_to_symbol(c).ok_or_else(|| Error::InvalidName(s.to_string()))?;
        if i < MAX_NAME_LEN - 1 {
            value |= sym << (64 - 5 * (i + 1));
        } else {
            if sym > 0x0f {
                return Err(Error::InvalidName(s.to_string()));
            }
            value |= sym;
        }
    }
    Ok(value)
}

/// Unpack a 64-bit symbol into its name string, without trailing dots.
pub fn name_to_string(value: u64) -> String {
    let mut out = [b'.'; MAX_NAME_LEN];
    let mut tmp = value;
    for i in 0..MAX_NAME_LEN {
        let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
        out[MAX_NAME_LEN - 1 - i] = CHARMAP[(tmp & mask) as usize];
        tmp >>= shift;
    }
    let end = out.iter().rposition(|&c| c != b'.').map_or(0, |p| p + 1);
    out[..end].iter().map(|&c| c as char).collect()
}

#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(u64);

pub type AccountName = Name;
pub type ActionName = Name;
pub type PermissionName = Name;
pub type TableName = Name;
pub type ScopeName = Name;

impl Name {
    pub fn new(s: &str) -> Result<Name> {
        string_to_name(s).map(Name)
    }

    pub fn from_u64(value: u64) -> Name {
        Name(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Name {
    fn from(value: u64) -> Self {
        Name(value)
    }
}

impl FromStr for Name {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Name::new(s)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&name_to_string(self.0))
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Name({})", name_to_string(self.0))
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&name_to_string(self.0))
        } else {
            serializer.serialize_u64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NameVisitor;

        impl<'de> Visitor<'de> for NameVisitor {
            type Value = Name;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(fmt, "a name string or its 64-bit symbol")
            }

            fn visit_u64<E: DeError>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Name(v))
            }

            fn visit_str<E: DeError>(self, v: &str) -> Result<Self::Value, E> {
                Name::new(v).map_err(E::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(NameVisitor)
        } else {
            deserializer.deserialize_u64(NameVisitor)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{from_slice, to_vec};

    #[test]
    fn known_values() {
        assert_eq!(string_to_name("eosio").unwrap(), 0x5530EA0000000000);
        assert_eq!(name_to_string(0x5530EA0000000000), "eosio");
        assert_eq!(string_to_name("").unwrap(), 0);
        assert_eq!(name_to_string(0), "");
    }

    #[test]
    fn roundtrip_strings() {
        let cases = ["eosio.token", "transfer", "active", "a", "zzzzzzzzzzzzj", "1.2.3.4.5"];
        for case in cases.iter() {
            let v = string_to_name(case).unwrap();
            assert_eq!(&name_to_string(v), case, "Failed on {}", case);
        }
    }

    #[test]
    fn rejects_bad_names() {
        assert!(string_to_name("abcdefghijklmn").is_err(), "too long");
        assert!(string_to_name("Hello").is_err(), "uppercase");
        assert!(string_to_name("abc6").is_err(), "digit out of range");
        assert!(string_to_name("zzzzzzzzzzzzz").is_err(), "13th char beyond j");
    }

    #[test]
    fn wire_is_symbol() {
        let name: Name = "eosio".parse().unwrap();
        let enc = to_vec(&name).unwrap();
        assert_eq!(enc, 0x5530EA0000000000u64.to_le_bytes());
        let dec: Name = from_slice(&enc).unwrap();
        assert_eq!(dec, name);
        assert_eq!(dec.to_string(), "eosio");
    }

    #[test]
    fn human_readable() {
        let name = Name::new("eosio.token").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"eosio.token\"");
        let back: Name = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
