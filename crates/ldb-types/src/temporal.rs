use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, FixedOffset, Local, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Wall-clock time with the local UTC offset at the moment it was taken.
///
/// Serialized as RFC 3339 with microsecond precision (values are truncated
/// to microseconds on construction). Comparison is by
/// instant, so timestamps written under different offsets still order
/// correctly when computing max watermarks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(DateTime<FixedOffset>);

impl Timestamp {
    /// The current local time.
    pub fn now() -> Self {
        Self(Local::now().fixed_offset().trunc_subsecs(6))
    }

    /// Convert a filesystem time into a local timestamp.
    pub fn from_system_time(time: SystemTime) -> Self {
        let utc: DateTime<Utc> = time.into();
        Self(utc.with_timezone(&Local).fixed_offset().trunc_subsecs(6))
    }

    /// Parse an RFC 3339 timestamp.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        DateTime::parse_from_rfc3339(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidTimestamp {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }

    /// The RFC 3339 text form.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, false)
    }

    /// Calendar date in `YYYY-MM-DD` form, used for import directory names.
    pub fn date_string(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// The underlying chrono value.
    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }
}

/// The later of two optional timestamps, ignoring missing values.
pub fn max_timestamp(a: Option<Timestamp>, b: Option<Timestamp>) -> Option<Timestamp> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self(dt)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_rfc3339())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
