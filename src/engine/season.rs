use crate::error::{ResolveError, ResolveResult};
use chrono::{Datelike, NaiveDate};

/// Month index (0-based, January = 0) at which a new season starts.
const SEASON_START_MONTH0: u32 = 9;

/// Parse a provider date. Accepts plain `YYYY-MM-DD` and RFC 3339 / ISO
/// timestamps such as `2024-10-22T00:00:00.000Z`; only the date part matters.
pub fn parse_game_date(raw: &str) -> ResolveResult<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive());
    }
    // "2024-10-22T00:00:00" with no offset, or any longer timestamp form
    trimmed
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .ok_or_else(|| ResolveError::InvalidDate(raw.to_string()))
}

/// Season year for a date: October onward belongs to that calendar year's
/// season, January through September to the previous year's.
pub fn season_of(date: NaiveDate) -> i32 {
    if date.month0() >= SEASON_START_MONTH0 {
        date.year()
    } else {
        date.year() - 1
    }
}

/// Season year for a raw provider date string.
pub fn season_of_str(raw: &str) -> ResolveResult<i32> {
    parse_game_date(raw).map(season_of)
}

/// Display label for a season year: 2024 -> "2024-25".
pub fn season_label(year: i32) -> String {
    format!("{}-{:02}", year, (year + 1).rem_euclid(100))
}
