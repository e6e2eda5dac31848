use chrono::{DateTime, Utc};
use tourdesk_catalog::SchedulePhase;

use crate::models::BookingStatus;

/// Status shown for a booking: the explicit status wins, then the
/// schedule-derived one, then the package dates. `None` means no
/// information at all ("unknown").
pub fn resolve_display_status(
    explicit: Option<BookingStatus>,
    schedule: Option<BookingStatus>,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    now: DateTime<Utc>,
) -> Option<BookingStatus> {
    explicit
        .or(schedule)
        .or_else(|| window.map(|(start, end)| SchedulePhase::classify(start, end, now).into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap()
    }

    fn window(start_offset: i64, end_offset: i64) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((now() + Duration::days(start_offset), now() + Duration::days(end_offset)))
    }

    #[test]
    fn explicit_status_wins() {
        let status = resolve_display_status(
            Some(BookingStatus::Cancelled),
            Some(BookingStatus::Active),
            window(-1, 1),
            now(),
        );
        assert_eq!(status, Some(BookingStatus::Cancelled));
    }

    #[test]
    fn schedule_status_beats_dates() {
        let status = resolve_display_status(None, Some(BookingStatus::Pending), window(-10, -5), now());
        assert_eq!(status, Some(BookingStatus::Pending));
    }

    #[test]
    fn falls_back_to_date_range() {
        assert_eq!(
            resolve_display_status(None, None, window(-10, -5), now()),
            Some(BookingStatus::Completed)
        );
        assert_eq!(
            resolve_display_status(None, None, window(-1, 1), now()),
            Some(BookingStatus::Active)
        );
        assert_eq!(
            resolve_display_status(None, None, window(2, 5), now()),
            Some(BookingStatus::Upcoming)
        );
    }

    #[test]
    fn unknown_without_any_input() {
        assert_eq!(resolve_display_status(None, None, None, now()), None);
    }
}
