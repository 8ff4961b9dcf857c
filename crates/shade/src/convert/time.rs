// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timestamp helpers shared by the converter, codec and serializer.

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, SecondsFormat, Utc};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Layouts tried, in order, after RFC 3339.
const SQL_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DATE_LAYOUT: &str = "%Y-%m-%d";

/// Timestamp from its stored `(secs, nsec, offset)` fields.
pub(crate) fn from_parts(secs: i64, nsec: u32, offset: i32) -> Result<DateTime<FixedOffset>> {
    let zone = FixedOffset::east_opt(offset)
        .ok_or_else(|| Error::OutOfRange(format!("utc offset {offset}s")))?;
    let utc = DateTime::<Utc>::from_timestamp(secs, nsec)
        .ok_or_else(|| Error::OutOfRange(format!("timestamp {secs}s {nsec}ns")))?;
    Ok(utc.with_timezone(&zone))
}

pub(crate) fn to_parts(t: &DateTime<FixedOffset>) -> (i64, u32, i32) {
    (
        t.timestamp(),
        t.timestamp_subsec_nanos(),
        t.offset().local_minus_utc(),
    )
}

/// UTC timestamp `nanos` after the unix epoch.
pub(crate) fn from_unix_nanos(nanos: i64) -> Result<DateTime<FixedOffset>> {
    from_parts(
        nanos.div_euclid(NANOS_PER_SEC),
        nanos.rem_euclid(NANOS_PER_SEC) as u32,
        0,
    )
}

/// Signed nanoseconds since the unix epoch; `OutOfRange` past year 2262.
pub(crate) fn unix_nanos(t: &DateTime<FixedOffset>) -> Result<i64> {
    t.timestamp_nanos_opt()
        .ok_or_else(|| Error::OutOfRange(format!("{} as unix nanoseconds", t.to_rfc3339())))
}

/// Parse RFC 3339, then SQL-style `YYYY-MM-DD HH:MM:SS[.f]` as UTC, then a
/// plain date at UTC midnight.
pub(crate) fn parse(input: &str) -> Result<DateTime<FixedOffset>> {
    let text = input.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Ok(t);
    }
    for layout in SQL_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Ok(at_utc(naive));
        }
    }
    match NaiveDate::parse_from_str(text, DATE_LAYOUT) {
        Ok(date) => date
            .and_hms_opt(0, 0, 0)
            .map(at_utc)
            .ok_or_else(|| Error::parse(input, "time", "date out of range")),
        Err(e) => Err(Error::parse(input, "time", e)),
    }
}

fn at_utc(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    DateTime::<FixedOffset>::from_naive_utc_and_offset(naive, Utc.fix())
}

pub(crate) fn rfc3339(t: &DateTime<FixedOffset>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_layouts() {
        let t = parse("2024-02-29T12:30:00+02:00").unwrap();
        assert_eq!(t.offset().local_minus_utc(), 7200);

        let t = parse("2024-02-29 12:30:00.250").unwrap();
        assert_eq!(rfc3339(&t), "2024-02-29T12:30:00.250Z");

        let t = parse(" 2024-02-29 ").unwrap();
        assert_eq!(rfc3339(&t), "2024-02-29T00:00:00Z");

        assert!(matches!(parse("yesterday"), Err(Error::Parse { target: "time", .. })));
    }

    #[test]
    fn test_unix_nanos_before_epoch() {
        let t = from_unix_nanos(-1).unwrap();
        assert_eq!(to_parts(&t), (-1, 999_999_999, 0));
        assert_eq!(unix_nanos(&t), Ok(-1));
    }

    #[test]
    fn test_bad_offset_rejected() {
        assert!(matches!(from_parts(0, 0, 90_000), Err(Error::OutOfRange(_))));
    }
}
