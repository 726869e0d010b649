use crate::error::{DesignationError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive date range loading events must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EventWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(DesignationError::InvalidWindow);
        }
        Ok(Self { start, end })
    }

    /// The `days` days up to and including `end`.
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Result<Self> {
        let start = Duration::try_days(i64::from(days))
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or(DesignationError::WindowOutOfRange(days))?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn trailing_window_includes_both_ends() {
        let end = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let window = EventWindow::trailing_days(end, 60).expect("window");
        assert!(window.contains(end));
        assert!(window.contains(end - Duration::days(60)));
        assert!(!window.contains(end - Duration::days(61)));
        assert!(!window.contains(end + Duration::seconds(1)));
    }

    #[test]
    fn window_reaching_past_the_calendar_is_rejected() {
        let end = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let err = EventWindow::trailing_days(end, u32::MAX).expect_err("out of range");
        assert!(matches!(err, DesignationError::WindowOutOfRange(u32::MAX)));
        assert!(EventWindow::trailing_days(end, 36_500).is_ok());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let end = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        assert!(EventWindow::new(end, end - Duration::days(1)).is_err());
    }
}
