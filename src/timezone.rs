//! Conversions from canonical timezone names to UTC offsets.

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

/// Get the current UTC offset for a canonical timezone name, e.g. "Pacific/Auckland".
///
/// Returns `None` if the name is not a known timezone.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// The calendar date of the UTC instant `now` in the timezone `offset`.
pub fn local_date(now: OffsetDateTime, offset: UtcOffset) -> Date {
    now.to_offset(offset).date()
}

#[cfg(test)]
mod tests {
    use time::{UtcOffset, macros::datetime};

    use super::{get_local_offset, local_date};

    #[test]
    fn utc_is_a_valid_timezone() {
        assert_eq!(get_local_offset("Etc/UTC"), Some(UtcOffset::UTC));
    }

    #[test]
    fn unknown_timezone_returns_none() {
        assert_eq!(get_local_offset("Middle/Earth"), None);
    }

    #[test]
    fn local_date_crosses_midnight() {
        let now = datetime!(2025-01-31 23:30 UTC);
        let offset = UtcOffset::from_hms(13, 0, 0).unwrap();

        assert_eq!(local_date(now, offset), time::macros::date!(2025 - 02 - 01));
    }
}
