//! Type-aware coercion of query values into cell content.

use chrono::DateTime;
use ereport_core::Scalar;

/// Millisecond timestamps strictly between 2000-01-01 and 2500-01-01 are
/// treated as dates.
const MIN_DATE_MILLIS: f64 = 946_684_800_000.0;
const MAX_DATE_MILLIS: f64 = 16_725_225_600_000.0;

/// Shape a string must start with to be parsed as a date-time.
const ISO_DATETIME_SHAPE: &[u8] = b"dddd-dd-ddTdd:dd:dd";

pub const DATE_OUTPUT_FORMAT: &str = "%Y/%m/%d";
/// Text written for SQL `NULL`.
pub const NULL_TEXT: &str = "\n";

/// How a single value is written to its cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// Calendar date rendered as `YYYY/MM/DD`, right-aligned.
    Date(String),
    Bool(bool),
    Text(String),
    /// Shown with two decimals.
    Number(f64),
    Null,
}

pub fn classify(value: &Scalar) -> Classified {
    if let Some(date) = date_string(value) {
        return Classified::Date(date);
    }
    match value {
        Scalar::Null => Classified::Null,
        Scalar::Bool(b) => Classified::Bool(*b),
        Scalar::Text(s) => Classified::Text(s.clone()),
        Scalar::Number(n) => Classified::Number(*n),
    }
}

/// Date text for values that look like dates: millisecond epoch numbers in
/// range, or strings starting with an RFC 3339 date-time.
pub fn date_string(value: &Scalar) -> Option<String> {
    match value {
        Scalar::Number(millis) if *millis > MIN_DATE_MILLIS && *millis < MAX_DATE_MILLIS => {
            let secs = (*millis / 1000.0) as i64;
            DateTime::from_timestamp(secs, 0).map(|dt| dt.format(DATE_OUTPUT_FORMAT).to_string())
        }
        Scalar::Text(s) if has_iso_datetime_prefix(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.format(DATE_OUTPUT_FORMAT).to_string()),
        _ => None,
    }
}

fn has_iso_datetime_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= ISO_DATETIME_SHAPE.len()
        && ISO_DATETIME_SHAPE
            .iter()
            .zip(bytes)
            .all(|(shape, b)| match shape {
                b'd' => b.is_ascii_digit(),
                literal => literal == b,
            })
}

/// Characters a value needs in its column, or `None` if it does not count.
///
/// Numbers count their shortest decimal form plus three for the two-decimal
/// display; date-like numbers also count their date text. Strings count as
/// written, booleans and nulls not at all.
pub fn content_width(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Number(n) => {
            let numeric = (3 + n.to_string().chars().count()) as f64;
            let date = date_string(value).map_or(0.0, |d| d.chars().count() as f64);
            Some(numeric.max(date))
        }
        Scalar::Text(s) => Some(s.chars().count() as f64),
        Scalar::Bool(_) | Scalar::Null => None,
    }
}
