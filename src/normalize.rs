//! Pure normalization of publish dates and links.
//!
//! Dates are parsed against the fixed, ordered [`DATE_FORMATS`] list and the
//! first format that accepts the text wins. A string such as `01/02/2024` is
//! therefore read as January 2nd, because `%m/%d/%Y` precedes `%d/%m/%Y`.

use crate::models::Published;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use url::Url;

/// One accepted date layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    Rfc3339,
    Rfc2822,
    /// Pattern carrying a UTC offset (`%z` / `%:z`).
    WithOffset(&'static str),
    /// Naive date-time pattern.
    DateTime(&'static str),
    /// Date-only pattern.
    Date(&'static str),
}

pub const DATE_FORMATS: &[DateFormat] = &[
    // ISO 8601 with offset
    DateFormat::Rfc3339,
    DateFormat::WithOffset("%Y-%m-%dT%H:%M:%S%.f%z"),
    DateFormat::WithOffset("%Y-%m-%dT%H:%M:%S%.f%:z"),
    // ISO 8601 without offset
    DateFormat::DateTime("%Y-%m-%dT%H:%M:%S%.f"),
    DateFormat::DateTime("%Y-%m-%dT%H:%M"),
    // feed dates
    DateFormat::Rfc2822,
    // SQL style
    DateFormat::WithOffset("%Y-%m-%d %H:%M:%S%.f%:z"),
    DateFormat::DateTime("%Y-%m-%d %H:%M:%S%.f"),
    DateFormat::Date("%Y-%m-%d"),
    // Month DD, YYYY
    DateFormat::Date("%B %d, %Y"),
    DateFormat::Date("%b %d, %Y"),
    // DD Month YYYY
    DateFormat::Date("%d %B %Y"),
    DateFormat::Date("%d %b %Y"),
    // slash-delimited, month first wins
    DateFormat::Date("%m/%d/%Y"),
    DateFormat::Date("%d/%m/%Y"),
];

impl DateFormat {
    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        match *self {
            DateFormat::Rfc3339 => DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()),
            DateFormat::Rfc2822 => DateTime::parse_from_rfc2822(text).ok().map(|dt| dt.date_naive()),
            DateFormat::WithOffset(pattern) => DateTime::parse_from_str(text, pattern)
                .ok()
                .map(|dt| dt.date_naive()),
            DateFormat::DateTime(pattern) => NaiveDateTime::parse_from_str(text, pattern)
                .ok()
                .map(|dt| dt.date()),
            DateFormat::Date(pattern) => NaiveDate::parse_from_str(text, pattern).ok(),
        }
    }
}

/// Parse free text against [`DATE_FORMATS`] in order.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }
    DATE_FORMATS.iter().find_map(|format| format.parse(&text))
}

/// Reduce a structured or textual publish time to a timezone-naive date.
///
/// Structured timestamps keep the calendar date of their own offset.
pub fn normalize_published(raw: Option<&Published>) -> Option<NaiveDate> {
    match raw? {
        Published::Timestamp(dt) => Some(dt.date_naive()),
        Published::Text(text) => parse_date(text),
    }
}

/// Make `href` absolute.
///
/// An `href` that already carries a scheme is returned unchanged. Anything
/// else is appended to `base` with exactly one separating slash; relative
/// segments such as `../` are not resolved.
pub fn normalize_url(href: &str, base: &str) -> String {
    let href = href.trim();
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    format!(
        "{}/{}",
        base.trim().trim_end_matches('/'),
        href.trim_start_matches('/')
    )
}

/// Origin (`scheme://host[:port]`) of an absolute http(s) URL.
pub fn origin_of(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Whether `link` is an absolute `http` or `https` URL.
pub fn is_web_link(link: &str) -> bool {
    Url::parse(link).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveTime, TimeZone};

    fn render(format: &DateFormat, date: NaiveDate) -> String {
        let naive = date.and_time(NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let zoned = offset.from_local_datetime(&naive).unwrap();
        match *format {
            DateFormat::Rfc3339 => zoned.to_rfc3339(),
            DateFormat::Rfc2822 => zoned.to_rfc2822(),
            DateFormat::WithOffset(p) => zoned.format(p).to_string(),
            DateFormat::DateTime(p) => naive.format(p).to_string(),
            DateFormat::Date(p) => date.format(p).to_string(),
        }
    }

    #[test]
    fn test_every_format_round_trips() {
        // day > 12 so both slash orders are unambiguous
        let date = NaiveDate::from_ymd_opt(2024, 3, 27).unwrap();
        for format in DATE_FORMATS {
            let text = render(format, date);
            assert_eq!(
                normalize_published(Some(&Published::Text(text.clone()))),
                Some(date),
                "format {format:?} rendered {text:?}"
            );
        }
    }

    #[test]
    fn test_ambiguous_slash_date_reads_month_first() {
        assert_eq!(parse_date("01/02/2024"), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(parse_date("25/12/2024"), NaiveDate::from_ymd_opt(2024, 12, 25));
    }

    #[test]
    fn test_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2025, 5, 6);
        assert_eq!(parse_date("2025-05-06T14:30:00Z"), expected);
        assert_eq!(parse_date("2025-05-06T14:30:00"), expected);
        assert_eq!(parse_date("2025-05-06 14:30:00"), expected);
        assert_eq!(parse_date("2025-05-06"), expected);
        assert_eq!(parse_date("Tue, 06 May 2025 14:30:00 GMT"), expected);
        assert_eq!(parse_date("May 6, 2025"), expected);
        assert_eq!(parse_date("  6 May   2025 "), expected);
    }

    #[test]
    fn test_offset_keeps_local_calendar_date() {
        assert_eq!(
            parse_date("2025-05-06T23:30:00-05:00"),
            NaiveDate::from_ymd_opt(2025, 5, 6)
        );
    }

    #[test]
    fn test_absent_inputs() {
        assert_eq!(normalize_published(None), None);
        assert_eq!(normalize_published(Some(&Published::Text(String::new()))), None);
        assert_eq!(parse_date("yesterday-ish"), None);
    }

    #[test]
    fn test_structured_timestamp() {
        let dt = DateTime::parse_from_rfc3339("2024-12-31T23:59:00+09:00").unwrap();
        assert_eq!(
            normalize_published(Some(&Published::Timestamp(dt))),
            NaiveDate::from_ymd_opt(2024, 12, 31)
        );
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("/world/a", "https://x.com"), "https://x.com/world/a");
        assert_eq!(normalize_url("world/a", "https://x.com/"), "https://x.com/world/a");
        assert_eq!(normalize_url("//world/a", "https://x.com//"), "https://x.com/world/a");
        assert_eq!(normalize_url("https://y.org/a", "https://x.com"), "https://y.org/a");
    }
}
