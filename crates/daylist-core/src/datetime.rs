use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

/// Half-open instant interval covering one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DayRange {
    #[must_use]
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Instant bounds for `day`: `[day@00:00:00, next day@00:00:00)`.
/// At the calendar's far edge the end saturates to the maximum instant.
#[must_use]
pub fn day_range(day: NaiveDate) -> DayRange {
    let start = day.and_time(NaiveTime::MIN);
    let end = day
        .succ_opt()
        .map(|next| next.and_time(NaiveTime::MIN))
        .unwrap_or(NaiveDateTime::MAX);
    DayRange { start, end }
}

/// The local calendar date, the day a freshly opened view starts on.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[must_use]
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[must_use]
pub fn format_instant(instant: NaiveDateTime) -> String {
    instant.format("%Y-%m-%d %H:%M").to_string()
}
