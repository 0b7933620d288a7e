//! Fixed-format local timestamps (`YYYY-MM-DD HH:MM:SS`).
//!
//! Stored documents carry naive local date-times with second resolution and no
//! offset. Use with `#[serde(with = "timestamp")]`.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serializer};

pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&value.format(FORMAT))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

pub fn parse(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), FORMAT)
}

pub fn format(value: &NaiveDateTime) -> String {
    value.format(FORMAT).to_string()
}

/// Drop sub-second precision so in-memory values match what a save/load yields.
pub fn truncate(value: NaiveDateTime) -> NaiveDateTime {
    value.with_nanosecond(0).unwrap_or(value)
}
