//! ISO 8601 instants with millisecond precision
//!
//! Instants are rendered as `2020-02-04T06:00:00.000+00:00`. Parsing accepts
//! any RFC 3339 offset, and also a bare local-less form
//! (`2025-12-31T06:00:00.000`) which is read as UTC.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};

/// Render an instant in the wire format
pub fn format(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// Parse an instant from the wire format
pub fn parse(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::Format(format!("instant {:?}: {}", s, e)))
}

/// Drop everything below the millisecond
pub fn truncate(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(3)
}

/// `#[serde(with = "iso::millis")]` for `DateTime<Utc>` fields
pub mod millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(instant: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format(instant))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(d)?;
        super::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "iso::millis_option")]` for `Option<DateTime<Utc>>` fields
pub mod millis_option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        instant: &Option<DateTime<Utc>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match instant {
            Some(instant) => s.serialize_str(&super::format(instant)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| super::parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_millis_with_offset() {
        let instant = Utc.with_ymd_and_hms(1930, 1, 3, 6, 0, 0).unwrap();
        assert_eq!(format(&instant), "1930-01-03T06:00:00.000+00:00");
    }

    #[test]
    fn test_parse_normalizes_to_utc() {
        let instant = parse("2026-01-03T12:27:51.002+01:00").unwrap();
        assert_eq!(format(&instant), "2026-01-03T11:27:51.002+00:00");
    }

    #[test]
    fn test_parse_without_offset() {
        let instant = parse("2025-12-31T06:00:00.000").unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2025, 12, 31, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse("yesterday"), Err(Error::Format(_))));
    }

    #[test]
    fn test_truncate() {
        let instant = parse("2026-01-03T12:27:51.002+00:00").unwrap()
            + chrono::Duration::microseconds(999);
        assert_eq!(format(&truncate(instant)), "2026-01-03T12:27:51.002+00:00");
        assert_ne!(truncate(instant), instant);
    }
}
