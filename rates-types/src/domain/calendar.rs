//! Provider-local calendar arithmetic.
//!
//! Rates are daily facts, but "which day is it" depends on the provider's
//! publishing timezone, and "is today's table final yet" depends on the
//! provider's generation time. Everything date-related funnels through here
//! so the boundary is computed exactly one way.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Today's date in the given timezone.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Yesterday's date in the given timezone.
pub fn yesterday_in(tz: Tz) -> NaiveDate {
    today_in(tz) - Duration::days(1)
}

/// Inclusive range of days from `start` to `end`. Empty when `start > end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current);
        current += Duration::days(1);
    }
    dates
}

/// Parses a provider generation time in `HH:MM:SS` form.
pub fn parse_generation_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .map_err(|e| format!("invalid generation time {:?}: {}", s, e))
}

/// The UTC instant at which `time` occurs on `date` in `tz`.
///
/// Ambiguous local times take the earlier mapping; local times skipped by a
/// transition fall back to the UTC reading of the same wall clock.
pub fn instant_in(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let local = date.and_time(time);
    match tz.from_local_datetime(&local).earliest() {
        Some(instant) => instant.with_timezone(&Utc),
        None => DateTime::from_naive_utc_and_offset(local, Utc),
    }
}

/// Whether `now` is at or past today's generation boundary.
///
/// The boundary is one instant: the current UTC calendar day combined with
/// the provider's generation time in the provider's timezone, compared
/// against `now` as two timestamps. Anchoring to the UTC day keeps the rule
/// continuous through the window where the provider's local date has rolled
/// over but the UTC date has not.
pub fn past_generation_time(now: DateTime<Utc>, generation_time: NaiveTime, tz: Tz) -> bool {
    now >= instant_in(now.date_naive(), generation_time, tz)
}

/// The most recent date whose rate table is final: today (UTC) once the
/// generation boundary has passed, otherwise yesterday (UTC).
pub fn finalized_date(now: DateTime<Utc>, generation_time: NaiveTime, tz: Tz) -> NaiveDate {
    if past_generation_time(now, generation_time, tz) {
        now.date_naive()
    } else {
        now.date_naive() - Duration::days(1)
    }
}

/// Time to wait from `now` until the next occurrence of the generation
/// boundary: today's instant if it is still ahead, otherwise tomorrow's.
pub fn duration_until_next(
    now: DateTime<Utc>,
    generation_time: NaiveTime,
    tz: Tz,
) -> std::time::Duration {
    let today = instant_in(now.date_naive(), generation_time, tz);
    let next = if today > now {
        today
    } else {
        instant_in(now.date_naive() + Duration::days(1), generation_time, tz)
    };
    (next - now).to_std().unwrap_or(std::time::Duration::ZERO)
}
