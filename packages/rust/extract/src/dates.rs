//! Best-effort parsing of stored date strings for ordering.
//!
//! Dates are stored exactly as the source rendered them. Parsing happens only
//! when ordering, and a string no format accepts simply sorts last.

use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use blockpress_shared::Page;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parse `raw` into a naive timestamp, trying RFC 3339 then common layouts.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Stable sort, newest first; unparseable dates keep their order at the end.
pub fn sort_newest_first(pages: &mut [Page]) {
    pages.sort_by_cached_key(|p| Reverse(parse_date(&p.date)));
}
