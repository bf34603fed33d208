//! # Temporal context
//! Hour of day and weekday in Japan Standard Time (fixed +09:00, no DST).

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};
use serde::Serialize;

const JST_OFFSET_SECS: i32 = 9 * 3600;

pub fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Source of "now". Injected so tests can pin the hour.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemporalContext {
    /// 0..=23
    pub hour: u8,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u8,
}

impl TemporalContext {
    pub const MONDAY: u8 = 0;
    pub const FRIDAY: u8 = 4;

    pub fn new(hour: u8, weekday: u8) -> Self {
        Self {
            hour: hour.min(23),
            weekday: weekday.min(6),
        }
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        let local = instant.with_timezone(&jst());
        Self {
            hour: local.hour() as u8,
            weekday: local.weekday().num_days_from_monday() as u8,
        }
    }

    pub fn now(clock: &dyn Clock) -> Self {
        Self::at(clock.now())
    }
}

/// ISO-8601 timestamp with the +09:00 offset, as written to the request log.
pub fn iso_jst(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&jst()).to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn utc_is_shifted_nine_hours() {
        // 2025-09-05 is a Friday; 10:30 UTC -> 19:30 JST.
        let t = Utc.with_ymd_and_hms(2025, 9, 5, 10, 30, 0).unwrap();
        let ctx = TemporalContext::at(t);
        assert_eq!(ctx.hour, 19);
        assert_eq!(ctx.weekday, TemporalContext::FRIDAY);
    }

    #[test]
    fn date_rolls_over_at_jst_midnight() {
        // Sunday 16:00 UTC is already Monday 01:00 in Tokyo.
        let t = Utc.with_ymd_and_hms(2025, 9, 7, 16, 0, 0).unwrap();
        let ctx = TemporalContext::now(&FixedClock(t));
        assert_eq!(ctx.hour, 1);
        assert_eq!(ctx.weekday, TemporalContext::MONDAY);
    }

    #[test]
    fn iso_timestamp_carries_offset() {
        let t = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(iso_jst(t), "2025-01-02T12:04:05+09:00");
    }
}
