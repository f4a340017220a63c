//! Calendar-day resolution at the request boundary.
//!
//! The streak engine never reads a wall clock; handlers resolve "today" once
//! per request from the user's stored IANA timezone and pass the result down
//! as plain data.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Resolve the calendar day at `now` in the given IANA timezone. An
/// unparseable timezone value falls back to UTC rather than failing the
/// request.
pub fn today_for(timezone: &str, now: DateTime<Utc>) -> NaiveDate {
    match timezone.parse::<Tz>() {
        Ok(tz) => now.with_timezone(&tz).date_naive(),
        Err(_) => {
            tracing::warn!(timezone = %timezone, "Unknown timezone, falling back to UTC");
            now.date_naive()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn resolves_day_in_user_timezone() {
        // 01:30 UTC is still the previous evening in São Paulo but already
        // morning in Tokyo.
        let now = at("2026-03-07T01:30:00Z");
        assert_eq!(
            today_for("America/Sao_Paulo", now),
            "2026-03-06".parse::<NaiveDate>().unwrap()
        );
        assert_eq!(
            today_for("Asia/Tokyo", now),
            "2026-03-07".parse::<NaiveDate>().unwrap()
        );
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let now = at("2026-03-07T01:30:00Z");
        assert_eq!(
            today_for("Not/AZone", now),
            "2026-03-07".parse::<NaiveDate>().unwrap()
        );
    }
}
