use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::trace;

const DEADLINE_FORMAT: &str = "%Y-%m-%d";
const CREATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Short human date, e.g. `Jan 5, 2025`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    format_date(ts.date())
}

/// Parses a deadline as typed by a user or sent by the backend.
///
/// Blank input means "no deadline". A full timestamp is accepted and
/// truncated to its date.
pub fn parse_deadline(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DEADLINE_FORMAT) {
        return Some(date);
    }

    let parsed = parse_timestamp(trimmed).map(|ts| ts.date());
    if parsed.is_none() {
        trace!(raw = %trimmed, "unparsable deadline treated as missing");
    }
    parsed
}

/// Accepts naive ISO-8601 timestamps (with or without fractional seconds)
/// and RFC 3339 timestamps, whose offset is dropped.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, CREATED_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

pub mod deadline_serde {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(value) => serializer.serialize_str(&value.format(super::DEADLINE_FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(super::parse_deadline))
    }
}

pub mod created_serde {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.format(super::CREATED_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid created_at timestamp: {raw}")))
    }
}
