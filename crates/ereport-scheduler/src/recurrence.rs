use chrono::{
    DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike,
};
use ereport_core::{IntervalKind, Schedule};
use tracing::debug;

pub const TIME_OF_DAY_FORMAT: &str = "%H:%M";

/// Day offsets past these thresholds step two periods ahead and back to the
/// end of the previous month instead.
const MONTHLY_OVERSHOOT_DAYS: i64 = 31;
const QUARTERLY_OVERSHOOT_DAYS: i64 = 93;
const YEARLY_OVERSHOOT_DAYS: i64 = 365;

const DST_GAP_HOURS: i64 = 1;

/// Parse an `HH:MM` time of day.
pub fn parse_time_of_day(time: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(time.trim(), TIME_OF_DAY_FORMAT).ok()
}

/// Next due time of `schedule`, in Unix seconds.
pub fn next_report_time<Tz: TimeZone>(schedule: &Schedule, now: &DateTime<Tz>) -> i64 {
    compute_next(now, schedule.interval, schedule.day, &schedule.time).timestamp()
}

/// Next due time for a cadence, evaluated in the time zone of `now`.
///
/// Never fails: an unparseable `time` falls back to `now`'s own hour and
/// minute.
pub fn compute_next<Tz: TimeZone>(
    now: &DateTime<Tz>,
    interval: IntervalKind,
    day: i64,
    time: &str,
) -> DateTime<Tz> {
    let local = now.naive_local();
    let time_of_day = parse_time_of_day(time).unwrap_or_else(|| {
        debug!(time, "time of day not in HH:MM form, using current time");
        NaiveTime::from_hms_opt(local.hour(), local.minute(), 0).unwrap_or(NaiveTime::MIN)
    });
    let candidate = local.date().and_time(time_of_day);

    let next = match interval {
        IntervalKind::Daily => daily(candidate, local),
        IntervalKind::Weekly => weekly(candidate, day),
        IntervalKind::Fortnightly => fortnightly(candidate, day_of_month(day)),
        IntervalKind::Monthly => {
            month_scale(candidate, day_of_month(day), MONTHLY_OVERSHOOT_DAYS, 1)
        }
        IntervalKind::Quarterly => {
            month_scale(candidate, day_of_month(day), QUARTERLY_OVERSHOOT_DAYS, 3)
        }
        IntervalKind::Yearly => month_scale(candidate, day_of_month(day), YEARLY_OVERSHOOT_DAYS, 12),
    };
    resolve_local(&now.timezone(), next)
}

/// Day-of-month selectors below 1 mean the first.
fn day_of_month(day: i64) -> i64 {
    if day > 0 {
        day
    } else {
        1
    }
}

/// Today at the given time, or tomorrow once that has passed.
fn daily(candidate: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    if candidate <= now {
        add_days(candidate, 1)
    } else {
        candidate
    }
}

/// Next occurrence of weekday `day` (0 = Sunday). Today counts as a week away.
fn weekly(candidate: NaiveDateTime, day: i64) -> NaiveDateTime {
    let today = i64::from(candidate.weekday().num_days_from_sunday());
    add_days(candidate, full_period_if_zero((day - today).rem_euclid(7), 7))
}

/// Days until the day-of-month `day` comes round modulo 14.
fn fortnightly(candidate: NaiveDateTime, day: i64) -> NaiveDateTime {
    let today = i64::from(candidate.day());
    add_days(candidate, full_period_if_zero((day - today).rem_euclid(14), 14))
}

fn full_period_if_zero(days: i64, period: i64) -> i64 {
    if days == 0 {
        period
    } else {
        days
    }
}

/// Step `months` ahead and move to day-of-month `day`. An offset past
/// `overshoot_days` steps two periods ahead to the end of the month before.
fn month_scale(candidate: NaiveDateTime, day: i64, overshoot_days: i64, months: i64) -> NaiveDateTime {
    let today = i64::from(candidate.day());
    let offset = day - today;
    if offset > overshoot_days {
        add_date(candidate, 2 * months, -today)
    } else {
        add_date(candidate, months, offset)
    }
}

fn add_days(dt: NaiveDateTime, days: i64) -> NaiveDateTime {
    add_date(dt, 0, days)
}

/// Calendar arithmetic that normalises overflow instead of clamping:
/// January 31 plus one month is March 3 (or 2 in leap years), and day
/// offsets roll across month ends.
///
/// Out-of-range results leave `dt` unchanged.
fn add_date(dt: NaiveDateTime, months: i64, days: i64) -> NaiveDateTime {
    let month_index = i64::from(dt.year()) * 12 + i64::from(dt.month0()) + months;
    let shifted = i32::try_from(month_index.div_euclid(12))
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month_index.rem_euclid(12) as u32 + 1, 1))
        .and_then(|first| {
            TimeDelta::try_days(i64::from(dt.day()) - 1 + days)
                .and_then(|delta| first.checked_add_signed(delta))
        });
    match shifted {
        Some(date) => date.and_time(dt.time()),
        None => dt,
    }
}

/// Attach `tz` to a wall-clock time. Ambiguous times take the earlier
/// instant; a time skipped by a DST jump moves forward by the usual one hour
/// gap, so 02:30 on a spring-forward night becomes 03:30.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt;
    }
    naive
        .checked_add_signed(TimeDelta::hours(DST_GAP_HOURS))
        .and_then(|shifted| tz.from_local_datetime(&shifted).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}
