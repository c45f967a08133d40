//! Shop-local calendar days.
//!
//! A shop's "today" runs from local midnight to the next local midnight in
//! the shop's IANA timezone. Queries use the half-open UTC range `[from, to)`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::{EngineError, ResultEngine};

const GAP_STEP_MINUTES: i64 = 30;
const GAP_LIMIT_MINUTES: i64 = 180;

/// Parse an IANA timezone name (`Europe/Rome`, `UTC`, ...).
pub fn parse_timezone(name: &str) -> ResultEngine<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| EngineError::InvalidTimezone(format!("unknown timezone: {name}")))
}

/// First instant of `date` in `tz`.
///
/// When local midnight falls into a DST gap, the first valid local instant
/// after it is used.
fn start_of_local_day(tz: Tz, date: NaiveDate) -> ResultEngine<DateTime<Utc>> {
    let midnight = NaiveDateTime::new(date, NaiveTime::MIN);
    let mut offset = 0;
    while offset <= GAP_LIMIT_MINUTES {
        let local = midnight + Duration::minutes(offset);
        if let Some(instant) = tz.from_local_datetime(&local).earliest() {
            return Ok(instant.with_timezone(&Utc));
        }
        offset += GAP_STEP_MINUTES;
    }
    Err(EngineError::InvalidTimezone(format!(
        "no valid local midnight for {date} in {tz}"
    )))
}

/// UTC bounds `[from, to)` of the local `date` in `tz`.
pub fn local_day_bounds(tz: Tz, date: NaiveDate) -> ResultEngine<(DateTime<Utc>, DateTime<Utc>)> {
    let next = date
        .succ_opt()
        .ok_or_else(|| EngineError::InvalidTimezone(format!("date out of range: {date}")))?;
    Ok((start_of_local_day(tz, date)?, start_of_local_day(tz, next)?))
}

/// Local date of `instant` in `tz`.
#[must_use]
pub fn local_date(tz: Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}
