//! Types to represent timestamps and durations.
use crate::error::{ErrorDomain, ErrorId};
use anyhow::Result;
use cosmwasm_std::Timestamp as CWTimestamp;
use cw_storage_plus::{KeyDeserialize, Prefixer, PrimaryKey};
use schemars::JsonSchema;
use serde::de::Visitor;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Essentially a newtype wrapper for [CWTimestamp] providing additional impls.
///
/// Internal representation in nanoseconds since the epoch. We keep a [u64]
/// directly (instead of a [CWTimestamp] or [cosmwasm_std::Uint64]) to make it
/// easier to derive some impls. The result is that we need to explicitly
/// implement [Serialize] and [Deserialize] to keep the stringy representation.
#[derive(Debug, Clone, Default, Copy, Eq, PartialEq, Ord, PartialOrd, JsonSchema, Hash)]
pub struct Timestamp(#[schemars(with = "String")] u64);

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let whole = self.0 / 1_000_000_000;
        let fractional = self.0 % 1_000_000_000;
        write!(f, "{}.{:09}", whole, fractional)
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(NanoVisitor)
    }
}

struct NanoVisitor;

impl Visitor<'_> for NanoVisitor {
    type Value = Timestamp;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("nanoseconds since epoch, string-encoded")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        match v.parse::<u64>() {
            Ok(v) => Ok(Timestamp(v)),
            Err(e) => Err(E::custom(format!("invalid Nano '{v}' - {e}"))),
        }
    }
}

impl Timestamp {
    /// Construct a new value from the given number of nanoseconds since the
    /// epoch
    pub const fn from_nanos(nanos: u64) -> Self {
        Timestamp(nanos)
    }

    /// Construct a new value from the given number of seconds since the
    /// epoch
    pub const fn from_seconds(seconds: u64) -> Self {
        Timestamp(seconds * 1_000_000_000)
    }

    /// Number of whole seconds since the epoch. Block timestamps sit on the
    /// slot grid, so this is the representation slot arithmetic uses.
    pub const fn seconds(self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// Raw nanoseconds since the epoch.
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Add the given number of seconds to the given timestamp
    pub fn plus_seconds(self, secs: u64) -> Self {
        self + Duration::from_seconds(secs)
    }

    /// Subtract two timestamps to get the duration between them.
    ///
    /// Will fail if the right hand side is greater than the left hand side.
    pub fn checked_sub(self, rhs: Self, desc: &str) -> Result<Duration> {
        match self.0.checked_sub(rhs.0) {
            Some(x) => Ok(Duration(x)),
            None => Err(crate::chain_anyhow!(
                ErrorId::Conversion,
                ErrorDomain::Default,
                "invalid timestamp subtraction during {desc}: {self} - {rhs}"
            )),
        }
    }
}

// Lossless conversions to and from the cosmwasm representation.
impl From<Timestamp> for CWTimestamp {
    fn from(Timestamp(nanos): Timestamp) -> Self {
        CWTimestamp::from_nanos(nanos)
    }
}

impl From<CWTimestamp> for Timestamp {
    fn from(timestamp: CWTimestamp) -> Self {
        Timestamp(timestamp.nanos())
    }
}

impl<'a> PrimaryKey<'a> for Timestamp {
    type Prefix = ();
    type SubPrefix = ();
    type Suffix = Timestamp;
    type SuperSuffix = Timestamp;

    fn key(&self) -> Vec<cw_storage_plus::Key> {
        self.0.key()
    }
}

impl KeyDeserialize for Timestamp {
    type Output = Timestamp;

    const KEY_ELEMS: u16 = 1;

    fn from_vec(value: Vec<u8>) -> cosmwasm_std::StdResult<Self::Output> {
        u64::from_vec(value).map(Timestamp)
    }
}

impl Prefixer<'_> for Timestamp {
    fn prefix(&self) -> Vec<cw_storage_plus::Key> {
        self.0.prefix()
    }
}

/// A duration of time measured in nanoseconds
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, JsonSchema,
)]
pub struct Duration(u64);

impl Duration {
    /// Construct a [Duration] from a given number of nanoseconds.
    pub const fn from_nanos(nanos: u64) -> Self {
        Duration(nanos)
    }

    /// Convert a number of seconds into a [Duration].
    pub const fn from_seconds(seconds: u64) -> Self {
        Duration(seconds * 1_000_000_000)
    }

    /// Returns the underlying nanos value as a u64
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Whole seconds contained in this duration.
    pub const fn as_seconds(&self) -> u64 {
        self.0 / 1_000_000_000
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0 + rhs.0)
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0 - rhs.0)
    }
}

impl Add<Duration> for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Self::Output {
        Duration(self.0 + rhs.0)
    }
}

// Used for questions like "how many slots fit in the given duration?"
impl std::ops::Div<Duration> for Duration {
    type Output = u64;

    fn div(self, rhs: Self) -> Self::Output {
        self.0 / rhs.0
    }
}

impl FromStr for Timestamp {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (seconds, nanos) = s.split_once('.').unwrap_or((s, "0"));
        let seconds: u64 = seconds
            .parse()
            .map_err(|_| crate::chain_anyhow!(ErrorId::Conversion, ErrorDomain::Default, "unable to parse seconds from {s}"))?;
        let nanos: u64 = nanos
            .parse()
            .map_err(|_| crate::chain_anyhow!(ErrorId::Conversion, ErrorDomain::Default, "unable to parse nanos from {s}"))?;
        Ok(Timestamp::from_seconds(seconds) + Duration::from_nanos(nanos))
    }
}
