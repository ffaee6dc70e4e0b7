//! Timezone arithmetic over absolute instants.
//!
//! Everything here takes a `DateTime<Utc>` (the instant) plus IANA zone id
//! strings and produces display values. Display functions never fail: an id
//! that the tz database cannot resolve degrades to UTC behavior instead of
//! returning an error.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ClockError {
    #[error("invalid date/time: {0}")]
    Parse(#[from] chrono::ParseError),
    #[error("wall clock {0} does not exist in {1}")]
    Unrepresentable(NaiveDateTime, String),
}

/// Display view of one instant in one timezone. Recomputed per render tick,
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedTime {
    /// 12-hour clock with seconds, e.g. "03:04:05 PM".
    pub time_12: String,
    /// Short human date, e.g. "Mon, Jan 15".
    pub date_short: String,
    /// 24-hour "HH:MM".
    pub time_24: String,
    /// ISO calendar date "YYYY-MM-DD".
    pub date_iso: String,
    /// Signed whole-hour UTC offset, "+09:00" / "-05:00".
    pub utc_offset: String,
    /// Day shift relative to UTC: "Next day", "Previous day", "Same day",
    /// or "" when the zone id did not resolve.
    pub day_label: String,
}

fn resolve(tz_id: &str) -> Option<Tz> {
    tz_id.parse::<Tz>().ok()
}

/// UTC offset of `tz` at `instant`, in whole seconds.
fn offset_seconds(instant: DateTime<Utc>, tz: Tz) -> i32 {
    instant.with_timezone(&tz).offset().fix().local_minus_utc()
}

/// Renders the offset at hour granularity. Sub-hour offsets (e.g. +05:30)
/// are truncated toward zero; fractional zones are out of scope for the
/// dashboard and a misleading-but-stable "+05:00" beats a crash.
fn offset_label(instant: DateTime<Utc>, tz: Tz) -> String {
    let hours = offset_seconds(instant, tz) / 3600;
    let sign = if hours < 0 { '-' } else { '+' };
    format!("{}{:02}:00", sign, hours.abs())
}

/// Formats `instant` as seen from `tz_id`. Unresolvable ids fall back to a
/// complete UTC rendering with an empty day label.
pub fn format_instant(instant: DateTime<Utc>, tz_id: &str) -> FormattedTime {
    let tz = resolve(tz_id).unwrap_or_else(|| {
        warn!("unknown timezone id '{}', formatting as UTC", tz_id);
        Tz::UTC
    });
    let local = instant.with_timezone(&tz);

    FormattedTime {
        time_12: local.format("%I:%M:%S %p").to_string(),
        date_short: local.format("%a, %b %-d").to_string(),
        time_24: local.format("%H:%M").to_string(),
        date_iso: local.format("%Y-%m-%d").to_string(),
        utc_offset: offset_label(instant, tz),
        day_label: day_label(instant, tz_id, "UTC").to_string(),
    }
}

/// Relative wall-clock difference between two zones at the same instant.
///
/// Comparing the zones' offsets at the instant (rather than a fixed
/// zone-to-zone constant) reflects what clocks in each zone actually show,
/// so daylight-saving discrepancies are handled for free.
pub fn time_difference_label(instant: DateTime<Utc>, from_tz: &str, to_tz: &str) -> String {
    let from = resolve(from_tz).unwrap_or(Tz::UTC);
    let to = resolve(to_tz).unwrap_or(Tz::UTC);

    let diff_minutes = (offset_seconds(instant, to) - offset_seconds(instant, from)) / 60;
    if diff_minutes.abs() < 60 {
        return "Same time".to_string();
    }

    let hours = diff_minutes.abs() / 60;
    let minutes = diff_minutes.abs() % 60;
    let magnitude = if minutes > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}h", hours)
    };

    if diff_minutes > 0 {
        format!("{} ahead", magnitude)
    } else {
        format!("{} behind", magnitude)
    }
}

/// Coarse day/night split: local hour in [6, 18) counts as day. This is a
/// heuristic, not a sunrise/sunset computation. Unresolvable ids count as
/// daytime.
pub fn is_daytime(instant: DateTime<Utc>, tz_id: &str) -> bool {
    match resolve(tz_id) {
        Some(tz) => {
            let hour = instant.with_timezone(&tz).hour();
            (6..18).contains(&hour)
        }
        None => true,
    }
}

/// Calendar-day shift of `tz_id` relative to `reference_tz_id` at `instant`.
/// Compares full calendar dates, so month and year boundaries are handled.
pub fn day_label(instant: DateTime<Utc>, tz_id: &str, reference_tz_id: &str) -> &'static str {
    let (Some(tz), Some(reference)) = (resolve(tz_id), resolve(reference_tz_id)) else {
        return "";
    };

    let target = instant.with_timezone(&tz).date_naive();
    let refd = instant.with_timezone(&reference).date_naive();

    if target > refd {
        "Next day"
    } else if target < refd {
        "Previous day"
    } else {
        "Same day"
    }
}

/// Interprets a user-entered `YYYY-MM-DD` + `HH:MM` wall clock as occurring
/// in `tz_id` and returns the absolute instant.
///
/// The offset is taken from the tz database for that calendar date, not for
/// "now", so the same wall clock on opposite sides of a DST transition maps
/// to different instants. A time repeated by a fall-back transition takes
/// the earlier offset; a time skipped by spring-forward resolves one hour
/// later. Unresolvable zone ids stay lenient and are read as UTC.
pub fn resolve_wall_clock(
    date: &str,
    time: &str,
    tz_id: &str,
) -> Result<DateTime<Utc>, ClockError> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))?;
    let naive = date.and_time(time);
    let tz = resolve(tz_id).unwrap_or(Tz::UTC);

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Ok(earlier.with_timezone(&Utc)),
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            match tz.from_local_datetime(&shifted) {
                LocalResult::Single(local) | LocalResult::Ambiguous(local, _) => {
                    Ok(local.with_timezone(&Utc))
                }
                LocalResult::None => Err(ClockError::Unrepresentable(naive, tz_id.to_string())),
            }
        }
    }
}
