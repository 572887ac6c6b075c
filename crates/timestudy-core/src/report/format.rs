//! Fixed-width duration and timestamp rendering.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};

use crate::error::{CoreError, Result};

/// `HH:MM:SS`, used by shift reports. Hours grow past two digits.
pub fn format_hms(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// `MM:SS.mmm`, used by stopwatch reports. Minutes grow past two digits.
pub fn format_stopwatch(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{minutes:02}:{seconds:02}.{millis:03}")
}

/// How report timestamps are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampStyle {
    pub format: String,
    pub local_time: bool,
}

impl TimestampStyle {
    /// Builds a style after checking `format` for unknown specifiers.
    pub fn new(format: impl Into<String>, local_time: bool) -> Result<Self> {
        let format = format.into();
        check_datetime_format(&format)?;
        Ok(Self { format, local_time })
    }

    pub fn utc(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            local_time: false,
        }
    }

    /// Renders `instant`. A format chrono cannot apply falls back to RFC 3339.
    pub fn render(&self, instant: &DateTime<Utc>) -> String {
        let mut out = String::new();
        let written = if self.local_time {
            write!(out, "{}", instant.with_timezone(&Local).format(&self.format))
        } else {
            write!(out, "{}", instant.format(&self.format))
        };
        match written {
            Ok(()) => out,
            Err(_) => {
                tracing::warn!(format = %self.format, "unusable timestamp format");
                instant.to_rfc3339()
            }
        }
    }
}

/// Rejects strftime strings containing specifiers chrono does not know.
pub fn check_datetime_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(CoreError::validation(format!(
            "invalid timestamp format '{format}'"
        )));
    }
    Ok(())
}

impl Default for TimestampStyle {
    fn default() -> Self {
        Self {
            format: "%Y-%m-%d %H:%M:%S".into(),
            local_time: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hms_pads_and_truncates() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(999), "00:00:00");
        assert_eq!(format_hms(61_000), "00:01:01");
        assert_eq!(format_hms(3_723_000), "01:02:03");
        assert_eq!(format_hms(100 * 3_600_000), "100:00:00");
    }

    #[test]
    fn stopwatch_keeps_milliseconds() {
        assert_eq!(format_stopwatch(0), "00:00.000");
        assert_eq!(format_stopwatch(1_005), "00:01.005");
        assert_eq!(format_stopwatch(754_321), "12:34.321");
        assert_eq!(format_stopwatch(6_000_000), "100:00.000");
    }

    #[test]
    fn utc_style_renders_format() {
        let instant = Utc.with_ymd_and_hms(2025, 6, 2, 7, 5, 9).unwrap();
        let style = TimestampStyle::utc("%Y-%m-%d %H:%M:%S");
        assert_eq!(style.render(&instant), "2025-06-02 07:05:09");
    }

    #[test]
    fn unknown_specifier_is_rejected() {
        assert!(matches!(
            TimestampStyle::new("%Y-%Q", false),
            Err(CoreError::Validation(_))
        ));
        assert!(TimestampStyle::new("%d.%m.%Y %H:%M", true).is_ok());
    }

    #[test]
    fn render_with_bad_format_does_not_panic() {
        let instant = Utc.with_ymd_and_hms(2025, 6, 2, 7, 5, 9).unwrap();
        let style = TimestampStyle::utc("%Y-%Q");
        assert_eq!(style.render(&instant), instant.to_rfc3339());
    }
}
