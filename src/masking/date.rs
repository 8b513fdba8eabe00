//! Date parsing for year-only masking
//!
//! Accepts the ISO-8601 family plus RFC 1123. Formats are tried in a fixed
//! order and the first one that parses wins. Only the calendar date written
//! in the input matters, so offsets and zone ids are read but never applied.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Supported input formats, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `20200115`, optionally followed by an offset
    BasicIsoDate,
    /// `2020-01-15`
    IsoLocalDate,
    /// `2020-01-15+01:00`
    IsoOffsetDate,
    /// `2020-01-15` with an optional offset
    IsoDate,
    /// `2020-01-15T10:15:30`
    IsoLocalDateTime,
    /// `2020-01-15T10:15:30+01:00`
    IsoOffsetDateTime,
    /// `2020-01-15T10:15:30+01:00[Europe/Paris]`
    IsoZonedDateTime,
    /// Local, offset or zoned date-time
    IsoDateTime,
    /// `2020-015`
    IsoOrdinalDate,
    /// `2020-W03-3`
    IsoWeekDate,
    /// `2020-01-15T10:15:30Z`
    IsoInstant,
    /// `Tue, 3 Jun 2008 11:05:30 GMT`
    Rfc1123,
}

pub const SUPPORTED_DATE_FORMATS: [DateFormat; 12] = [
    DateFormat::BasicIsoDate,
    DateFormat::IsoLocalDate,
    DateFormat::IsoOffsetDate,
    DateFormat::IsoDate,
    DateFormat::IsoLocalDateTime,
    DateFormat::IsoOffsetDateTime,
    DateFormat::IsoZonedDateTime,
    DateFormat::IsoDateTime,
    DateFormat::IsoOrdinalDate,
    DateFormat::IsoWeekDate,
    DateFormat::IsoInstant,
    DateFormat::Rfc1123,
];

impl DateFormat {
    /// Parse `input` as this format, returning the calendar date it names
    pub fn parse(self, input: &str) -> Option<NaiveDate> {
        match self {
            DateFormat::BasicIsoDate => {
                let (date, _) = split_offset(input, false);
                parse_date(date, "%Y%m%d")
            }
            DateFormat::IsoLocalDate => parse_date(input, "%Y-%m-%d"),
            DateFormat::IsoOffsetDate => match split_offset(input, true) {
                (date, Some(_)) => parse_date(date, "%Y-%m-%d"),
                (_, None) => None,
            },
            DateFormat::IsoDate => {
                let (date, _) = split_offset(input, true);
                parse_date(date, "%Y-%m-%d")
            }
            DateFormat::IsoLocalDateTime => parse_local_date_time(input),
            DateFormat::IsoOffsetDateTime => match split_offset(input, true) {
                (local, Some(_)) => parse_local_date_time(local),
                (_, None) => None,
            },
            DateFormat::IsoZonedDateTime => {
                let (zoned, zone) = split_zone_id(input);
                match split_offset(zoned, true) {
                    (local, Some(_)) => parse_local_date_time(local),
                    // A region id alone is enough to pin the local date
                    (local, None) if zone.is_some() => parse_local_date_time(local),
                    _ => None,
                }
            }
            DateFormat::IsoDateTime => {
                let (zoned, _) = split_zone_id(input);
                let (local, _) = split_offset(zoned, true);
                parse_local_date_time(local)
            }
            DateFormat::IsoOrdinalDate => {
                let (date, _) = split_offset(input, true);
                parse_date(date, "%Y-%j")
            }
            DateFormat::IsoWeekDate => {
                let (date, _) = split_offset(input, true);
                parse_date(date, "%G-W%V-%u")
            }
            DateFormat::IsoInstant => DateTime::parse_from_rfc3339(input)
                .ok()
                .filter(|_| input.ends_with('Z') || input.ends_with('z'))
                .map(|dt| dt.naive_utc().date()),
            DateFormat::Rfc1123 => DateTime::parse_from_rfc2822(input)
                .ok()
                .map(|dt| dt.naive_local().date()),
        }
    }
}

/// Parse `input` against every supported format in order
pub fn parse_any(input: &str) -> Option<NaiveDate> {
    SUPPORTED_DATE_FORMATS
        .iter()
        .find_map(|format| format.parse(input))
}

/// Four-digit year of the first format that accepts `input`
pub fn year_of(input: &str) -> Option<String> {
    parse_any(input).map(|date| format!("{:04}", date.year()))
}

fn parse_date(input: &str, pattern: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, pattern).ok()
}

fn parse_local_date_time(input: &str) -> Option<NaiveDate> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(input, pattern).ok())
        .map(|dt| dt.date())
}

/// Split a trailing `Z`, `+HH:MM` or `+HHMM` offset off `input`.
///
/// With `extended` set only the colon form is accepted.
fn split_offset(input: &str, extended: bool) -> (&str, Option<&str>) {
    if let Some(rest) = input.strip_suffix('Z') {
        return (rest, Some("Z"));
    }
    let width = if extended { 6 } else { 5 };
    if input.len() <= width || !input.is_char_boundary(input.len() - width) {
        return (input, None);
    }
    let (rest, offset) = input.split_at(input.len() - width);
    let bytes = offset.as_bytes();
    let sign = matches!(bytes[0], b'+' | b'-');
    let digits_ok = if extended {
        bytes[1..3].iter().all(u8::is_ascii_digit)
            && bytes[3] == b':'
            && bytes[4..6].iter().all(u8::is_ascii_digit)
    } else {
        bytes[1..5].iter().all(u8::is_ascii_digit)
    };
    if sign && digits_ok {
        (rest, Some(offset))
    } else {
        (input, None)
    }
}

/// Split a trailing `[Region/City]` zone id off `input`
fn split_zone_id(input: &str) -> (&str, Option<&str>) {
    match (input.rfind('['), input.ends_with(']')) {
        (Some(open), true) => (&input[..open], Some(&input[open + 1..input.len() - 1])),
        _ => (input, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_iso_date() {
        assert_eq!(year_of("20200115").as_deref(), Some("2020"));
        assert_eq!(year_of("20200115+0100").as_deref(), Some("2020"));
    }

    #[test]
    fn test_iso_dates_with_offsets() {
        assert_eq!(year_of("2020-01-15").as_deref(), Some("2020"));
        assert_eq!(year_of("2019-12-31+01:00").as_deref(), Some("2019"));
        assert_eq!(year_of("2019-12-31Z").as_deref(), Some("2019"));
    }

    #[test]
    fn test_date_times() {
        assert_eq!(year_of("2011-12-03T10:15:30").as_deref(), Some("2011"));
        assert_eq!(year_of("2011-12-03T10:15:30.123").as_deref(), Some("2011"));
        assert_eq!(year_of("2011-12-03T10:15").as_deref(), Some("2011"));
        assert_eq!(year_of("2011-12-03T10:15:30+01:00").as_deref(), Some("2011"));
        assert_eq!(
            year_of("2011-12-03T10:15:30+01:00[Europe/Paris]").as_deref(),
            Some("2011")
        );
        assert_eq!(year_of("2011-12-03T10:15:30Z").as_deref(), Some("2011"));
    }

    #[test]
    fn test_offset_does_not_shift_the_year() {
        assert_eq!(year_of("1999-12-31T23:30:00-05:00").as_deref(), Some("1999"));
    }

    #[test]
    fn test_ordinal_and_week_dates() {
        assert_eq!(year_of("2012-337").as_deref(), Some("2012"));
        assert_eq!(year_of("2012-W48-6").as_deref(), Some("2012"));
    }

    #[test]
    fn test_rfc_1123() {
        assert_eq!(year_of("Tue, 3 Jun 2008 11:05:30 GMT").as_deref(), Some("2008"));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(year_of("not-a-date"), None);
        assert_eq!(year_of("2020-13-45"), None);
        assert_eq!(year_of(""), None);
    }

    #[test]
    fn test_format_order() {
        assert_eq!(SUPPORTED_DATE_FORMATS.len(), 12);
        assert_eq!(SUPPORTED_DATE_FORMATS[0], DateFormat::BasicIsoDate);
        assert_eq!(SUPPORTED_DATE_FORMATS[11], DateFormat::Rfc1123);
    }
}
