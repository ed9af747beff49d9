use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use tracing::debug;

const DATE_SEPARATOR: char = '_';

/// File stem of a rendered report: the schedule name, optionally with the
/// run date attached before (`prefix`) or after (`suffix`) it.
///
/// Path separators become `-` so the stem always names a file inside the
/// data directory. An empty or invalid `date_format` leaves the bare name.
pub fn report_file_name<Tz: TimeZone>(
    name: &str,
    date_format: &str,
    date_position: &str,
    now: &DateTime<Tz>,
) -> String
where
    Tz::Offset: Display,
{
    let stem = sanitize(name);
    if date_format.is_empty() {
        return stem;
    }
    if StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error)) {
        debug!(date_format, "invalid report date format, using bare name");
        return stem;
    }
    let date = sanitize(&now.format(date_format).to_string());

    if date_position.eq_ignore_ascii_case("prefix") {
        format!("{date}{DATE_SEPARATOR}{stem}")
    } else if date_position.eq_ignore_ascii_case("suffix") {
        format!("{stem}{DATE_SEPARATOR}{date}")
    } else {
        stem
    }
}

/// File stem of a one-off panel export: the panel title, or `panel_<id>`
/// when the title is blank.
pub fn export_file_name(title: &str, panel_id: i64) -> String {
    let stem = sanitize(title.trim());
    if stem.is_empty() {
        format!("panel_{panel_id}")
    } else {
        stem
    }
}

fn sanitize(s: &str) -> String {
    s.replace(['/', '\\'], "-")
}
