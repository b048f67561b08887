use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{
    de::{Deserialize, Deserializer},
    ser::{Serialize, Serializer},
};

/// Unix time of 2000-01-01T00:00:00Z, the zero point of [`BlockTimestamp`].
pub const BLOCK_TIMESTAMP_EPOCH: i64 = 946_684_800;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Nanosecond-resolution timestamp. Goes over the wire as a little-endian u64 holding
/// nanoseconds since the Unix epoch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tstamp {
    nanos: u64,
}

impl Tstamp {
    pub fn from_unix_nanos(nanos: u64) -> Tstamp {
        Tstamp { nanos }
    }

    /// Create a timestamp from whole seconds plus a nanosecond remainder. Fails if the result
    /// doesn't fit in 64 bits of nanoseconds.
    pub fn from_utc(sec: u64, nano: u32) -> Option<Tstamp> {
        sec.checked_mul(NANOS_PER_SEC)
            .and_then(|n| n.checked_add(nano as u64))
            .map(Tstamp::from_unix_nanos)
    }

    /// Nanoseconds since the Unix epoch.
    pub fn unix_nanos(&self) -> u64 {
        self.nanos
    }

    /// Return the UNIX timestamp (number of seconds since January 1, 1970 0:00:00 UTC).
    pub fn timestamp_utc(&self) -> u64 {
        self.nanos / NANOS_PER_SEC
    }

    /// Returns the number of nanoseconds past the second count.
    pub fn timestamp_subsec_nanos(&self) -> u32 {
        (self.nanos % NANOS_PER_SEC) as u32
    }

    pub fn from_system_time(t: SystemTime) -> Option<Tstamp> {
        let since = t.duration_since(UNIX_EPOCH).ok()?;
        u64::try_from(since.as_nanos()).ok().map(Tstamp::from_unix_nanos)
    }

    pub fn to_system_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(self.nanos)
    }

    /// Create a Tstamp based on the current system time. Fails if the clock reads earlier than
    /// the Unix epoch.
    pub fn now() -> Option<Tstamp> {
        Tstamp::from_system_time(SystemTime::now())
    }
}

impl fmt::Display for Tstamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "UTC: {} sec + {} ns",
            self.timestamp_utc(),
            self.timestamp_subsec_nanos()
        )
    }
}

impl Serialize for Tstamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.nanos)
    }
}

impl<'de> Deserialize<'de> for Tstamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Tstamp::from_unix_nanos)
    }
}

/// Second-resolution block time. Goes over the wire as a little-endian u32 holding seconds
/// since [`BLOCK_TIMESTAMP_EPOCH`], so it covers the years 2000 through 2136.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockTimestamp {
    epoch_secs: u32,
}

impl BlockTimestamp {
    /// Create from seconds since the block timestamp epoch.
    pub fn from_epoch_secs(epoch_secs: u32) -> BlockTimestamp {
        BlockTimestamp { epoch_secs }
    }

    /// Create from Unix seconds. Fails for times before 2000 or past the end of the u32 range.
    pub fn from_unix_secs(unix_secs: i64) -> Option<BlockTimestamp> {
        unix_secs
            .checked_sub(BLOCK_TIMESTAMP_EPOCH)
            .and_then(|s| u32::try_from(s).ok())
            .map(BlockTimestamp::from_epoch_secs)
    }

    pub fn epoch_secs(&self) -> u32 {
        self.epoch_secs
    }

    /// Return the UNIX timestamp (number of seconds since January 1, 1970 0:00:00 UTC).
    pub fn unix_secs(&self) -> i64 {
        self.epoch_secs as i64 + BLOCK_TIMESTAMP_EPOCH
    }

    /// Convert from system time, discarding any sub-second part.
    pub fn from_system_time(t: SystemTime) -> Option<BlockTimestamp> {
        let since = t.duration_since(UNIX_EPOCH).ok()?;
        let secs = i64::try_from(since.as_secs()).ok()?;
        BlockTimestamp::from_unix_secs(secs)
    }

    pub fn to_system_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.unix_secs() as u64)
    }

    pub fn now() -> Option<BlockTimestamp> {
        BlockTimestamp::from_system_time(SystemTime::now())
    }
}

impl fmt::Display for BlockTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UTC: {} sec", self.unix_secs())
    }
}

impl Serialize for BlockTimestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.epoch_secs)
    }
}

impl<'de> Deserialize<'de> for BlockTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u32::deserialize(deserializer).map(BlockTimestamp::from_epoch_secs)
    }
}
