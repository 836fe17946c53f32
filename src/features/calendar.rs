//! Calendar fields and their cyclical encodings

use chrono::{Datelike, NaiveDateTime, Timelike};
use std::f64::consts::PI;

pub const HOURS_PER_DAY: f64 = 24.0;
pub const DAYS_PER_WEEK: f64 = 7.0;
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Names of the cyclical columns, in table order
pub const CYCLICAL_NAMES: [&str; 6] = [
    "sin_hour",
    "cos_hour",
    "sin_day_of_week",
    "cos_day_of_week",
    "sin_month",
    "cos_month",
];

/// Calendar fields of a single timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarFields {
    /// 0-23
    pub hour: u32,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    /// 1-12
    pub month: u32,
}

impl CalendarFields {
    pub fn from_timestamp(ts: &NaiveDateTime) -> Self {
        Self {
            hour: ts.hour(),
            day_of_week: ts.weekday().num_days_from_monday(),
            month: ts.month(),
        }
    }

    pub fn is_weekend(&self) -> bool {
        self.day_of_week >= 5
    }

    /// Sine/cosine pairs for hour, day-of-week and month
    pub fn cyclical(&self) -> [f64; 6] {
        let (sh, ch) = encode(self.hour as f64, HOURS_PER_DAY);
        let (sw, cw) = encode(self.day_of_week as f64, DAYS_PER_WEEK);
        let (sm, cm) = encode(self.month as f64, MONTHS_PER_YEAR);
        [sh, ch, sw, cw, sm, cm]
    }
}

fn encode(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_calendar_fields() {
        // 2024-01-06 is a Saturday
        let ts = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap().and_hms_opt(18, 30, 0).unwrap();
        let cal = CalendarFields::from_timestamp(&ts);

        assert_eq!(cal.hour, 18);
        assert_eq!(cal.day_of_week, 5);
        assert_eq!(cal.month, 1);
        assert!(cal.is_weekend());
    }

    #[test]
    fn test_cyclical_wraps() {
        let midnight = CalendarFields { hour: 0, day_of_week: 0, month: 12 }.cyclical();
        // month 12 lands on the same angle as month 0
        assert!(midnight[4].abs() < 1e-12);
        assert!((midnight[5] - 1.0).abs() < 1e-12);

        let six = CalendarFields { hour: 6, day_of_week: 0, month: 1 }.cyclical();
        assert!((six[0] - 1.0).abs() < 1e-12);
        assert!(six[1].abs() < 1e-12);
    }
}
