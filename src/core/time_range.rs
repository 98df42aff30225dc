//! Parsing of user-supplied history windows.
//!
//! Two fixed grammars are accepted: `last <N> <unit>` and
//! `<YYYY-MM-DD>[ HH:MM] to <YYYY-MM-DD>[ HH:MM]`. Blank input selects the
//! default window. Every successful result is checked against the maximum
//! window before it is returned.

use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::models::TimeRange;
use crate::errors::TimeRangeError;

static LAST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^last\s+([0-9]+)\s*(h|hr|hrs|hour|hours|d|day|days)$")
        .expect("static regex compile")
});

static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*([0-9]{4}-[0-9]{2}-[0-9]{2})(?:[ T]([0-9]{2}:[0-9]{2}))?\s+to\s+([0-9]{4}-[0-9]{2}-[0-9]{2})(?:[ T]([0-9]{2}:[0-9]{2}))?\s*$",
    )
    .expect("static regex compile")
});

const START_OF_DAY: &str = "00:00";
const END_OF_DAY: &str = "23:59";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeUnit {
    Hour,
    Day,
}

impl RangeUnit {
    fn parse(unit: &str) -> Result<Self, TimeRangeError> {
        match unit.to_ascii_lowercase().as_str() {
            "h" | "hr" | "hrs" | "hour" | "hours" => Ok(RangeUnit::Hour),
            "d" | "day" | "days" => Ok(RangeUnit::Day),
            other => Err(TimeRangeError::UnsupportedUnit(other.to_string())),
        }
    }

    fn seconds(self) -> i64 {
        match self {
            RangeUnit::Hour => 3_600,
            RangeUnit::Day => 86_400,
        }
    }
}

/// A classified time expression, before it is anchored to a clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeExpr {
    Default,
    Relative { qty: i64, unit: RangeUnit },
    /// Wall-clock bounds, interpreted in the caller's time zone.
    Explicit {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },
}

impl RangeExpr {
    pub fn classify(text: &str) -> Result<Self, TimeRangeError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(RangeExpr::Default);
        }

        if let Some(caps) = LAST_RE.captures(text) {
            let qty = caps[1]
                .parse::<i64>()
                .map_err(|_| TimeRangeError::InvalidQuantity)?;
            if qty <= 0 {
                return Err(TimeRangeError::InvalidQuantity);
            }
            let unit = RangeUnit::parse(&caps[2])?;
            return Ok(RangeExpr::Relative { qty, unit });
        }

        if let Some(caps) = RANGE_RE.captures(text) {
            let from_time = caps.get(2).map_or(START_OF_DAY, |m| m.as_str());
            let to_time = caps.get(4).map_or(END_OF_DAY, |m| m.as_str());
            let from = parse_wall_clock(&caps[1], from_time)?;
            let to = parse_wall_clock(&caps[3], to_time)?;
            return Ok(RangeExpr::Explicit { from, to });
        }

        Err(TimeRangeError::UnrecognizedExpression)
    }
}

fn parse_wall_clock(date: &str, time: &str) -> Result<NaiveDateTime, TimeRangeError> {
    let raw = format!("{date} {time}");
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M")
        .map_err(|_| TimeRangeError::InvalidTimestamp(raw))
}

/// Turns time expressions into bounded UTC windows.
#[derive(Debug, Clone, Copy)]
pub struct TimeRangeParser {
    default_window: Duration,
    max_window: Duration,
}

impl TimeRangeParser {
    pub fn new(default_window: Duration, max_window: Duration) -> Self {
        Self {
            default_window,
            max_window,
        }
    }

    #[must_use]
    pub fn default_window(&self) -> Duration {
        self.default_window
    }

    #[must_use]
    pub fn max_window(&self) -> Duration {
        self.max_window
    }

    /// Parse `text` relative to `now`. Explicit dates are read in `now`'s
    /// time zone; the returned range is always UTC, truncated to whole seconds.
    ///
    /// # Errors
    ///
    /// Returns a [`TimeRangeError`] describing why the expression was rejected.
    pub fn parse<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        text: &str,
    ) -> Result<TimeRange, TimeRangeError> {
        let expr = RangeExpr::classify(text)?;
        self.resolve(now, expr)
    }

    /// Anchor a classified expression to `now`.
    ///
    /// # Errors
    ///
    /// Fails with `OrderViolation`, `InvalidTimestamp` or `WindowTooLarge`.
    pub fn resolve<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        expr: RangeExpr,
    ) -> Result<TimeRange, TimeRangeError> {
        let range = match expr {
            RangeExpr::Default => self.window_ending_at(now, self.default_window)?,
            RangeExpr::Relative { qty, unit } => {
                let window = qty
                    .checked_mul(unit.seconds())
                    .and_then(Duration::try_seconds)
                    .ok_or(self.too_large())?;
                self.window_ending_at(now, window)?
            }
            RangeExpr::Explicit { from, to } => {
                let tz = now.timezone();
                TimeRange {
                    from: localize(&tz, from)?,
                    to: localize(&tz, to)?,
                }
            }
        };
        self.bounded(range)
    }

    fn window_ending_at<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        window: Duration,
    ) -> Result<TimeRange, TimeRangeError> {
        let to = now.with_timezone(&Utc).trunc_subsecs(0);
        let from = to.checked_sub_signed(window).ok_or(self.too_large())?;
        Ok(TimeRange { from, to })
    }

    fn bounded(&self, range: TimeRange) -> Result<TimeRange, TimeRangeError> {
        if range.to <= range.from {
            return Err(TimeRangeError::OrderViolation);
        }
        if range.to - range.from > self.max_window {
            return Err(self.too_large());
        }
        Ok(range)
    }

    fn too_large(&self) -> TimeRangeError {
        TimeRangeError::WindowTooLarge {
            max: self.max_window,
        }
    }
}

fn localize<Tz: TimeZone>(tz: &Tz, wall: NaiveDateTime) -> Result<DateTime<Utc>, TimeRangeError> {
    // Ambiguous local times (DST fall-back) resolve to the earlier instant.
    tz.from_local_datetime(&wall)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TimeRangeError::InvalidTimestamp(wall.format("%Y-%m-%d %H:%M").to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Berlin;

    fn parser() -> TimeRangeParser {
        TimeRangeParser::new(Duration::hours(24), Duration::days(7))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_blank_input_uses_default_window() {
        for text in ["", "   ", "\t\n"] {
            let range = parser().parse(&now(), text).unwrap();
            assert_eq!(range.to, now());
            assert_eq!(range.to - range.from, Duration::hours(24));
        }
    }

    #[test]
    fn test_relative_hours_and_days() {
        let range = parser().parse(&now(), "last 6 hours").unwrap();
        assert_eq!(range.from, now() - Duration::hours(6));
        assert_eq!(range.to, now());

        let range = parser().parse(&now(), "LAST 2 Days").unwrap();
        assert_eq!(range.from, now() - Duration::days(2));

        let range = parser().parse(&now(), "last 3h").unwrap();
        assert_eq!(range.from, now() - Duration::hours(3));

        let range = parser().parse(&now(), "last 7 d").unwrap();
        assert_eq!(range.from, now() - Duration::days(7));
    }

    #[test]
    fn test_relative_window_beyond_max_is_rejected() {
        let strict = TimeRangeParser::new(Duration::hours(24), Duration::hours(24));
        let err = strict.parse(&now(), "last 3 days").unwrap_err();
        assert_eq!(
            err,
            TimeRangeError::WindowTooLarge {
                max: Duration::hours(24)
            }
        );
        assert_eq!(err.to_string(), "requested window exceeds maximum of 1d");

        assert!(strict.parse(&now(), "last 24 hours").is_ok());
        assert!(strict.parse(&now(), "last 25 hours").is_err());
    }

    #[test]
    fn test_zero_and_overflowing_quantities() {
        assert_eq!(
            parser().parse(&now(), "last 0 hours"),
            Err(TimeRangeError::InvalidQuantity)
        );
        assert_eq!(
            parser().parse(&now(), "last 99999999999999999999 days"),
            Err(TimeRangeError::InvalidQuantity)
        );
        assert!(matches!(
            parser().parse(&now(), "last 9223372036854775807 days"),
            Err(TimeRangeError::WindowTooLarge { .. })
        ));
    }

    #[test]
    fn test_unknown_expressions() {
        for text in ["yesterday", "last hours", "last 3 weeks", "last -3 hours", "2024-01-01"] {
            assert_eq!(
                parser().parse(&now(), text),
                Err(TimeRangeError::UnrecognizedExpression),
                "{text}"
            );
        }
    }

    #[test]
    fn test_explicit_range_defaults_to_whole_days() {
        let range = parser().parse(&now(), "2024-01-01 to 2024-01-02").unwrap();
        assert_eq!(range.from, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(range.to, Utc.with_ymd_and_hms(2024, 1, 2, 23, 59, 0).unwrap());
    }

    #[test]
    fn test_explicit_range_with_times() {
        let range = parser()
            .parse(&now(), "2024-01-05 08:30 to 2024-01-05T17:45")
            .unwrap();
        assert_eq!(range.from, Utc.with_ymd_and_hms(2024, 1, 5, 8, 30, 0).unwrap());
        assert_eq!(range.to, Utc.with_ymd_and_hms(2024, 1, 5, 17, 45, 0).unwrap());
    }

    #[test]
    fn test_explicit_range_order_violation() {
        assert_eq!(
            parser().parse(&now(), "2024-01-05 to 2024-01-04"),
            Err(TimeRangeError::OrderViolation)
        );
        assert_eq!(
            parser().parse(&now(), "2024-01-05 10:00 to 2024-01-05 10:00"),
            Err(TimeRangeError::OrderViolation)
        );
    }

    #[test]
    fn test_explicit_range_invalid_dates() {
        assert!(matches!(
            parser().parse(&now(), "2024-02-30 to 2024-03-01"),
            Err(TimeRangeError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            parser().parse(&now(), "2024-01-01 25:00 to 2024-01-02"),
            Err(TimeRangeError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_explicit_range_beyond_max_is_rejected() {
        assert!(matches!(
            parser().parse(&now(), "2024-01-01 to 2024-01-09"),
            Err(TimeRangeError::WindowTooLarge { .. })
        ));
    }

    #[test]
    fn test_explicit_range_uses_caller_time_zone() {
        let berlin_now = now().with_timezone(&Berlin);
        let range = parser().parse(&berlin_now, "2024-01-01 to 2024-01-02").unwrap();
        assert_eq!(range.from, Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap());
        assert_eq!(range.to, Utc.with_ymd_and_hms(2024, 1, 2, 22, 59, 0).unwrap());
    }

    #[test]
    fn test_local_time_skipped_by_dst_is_invalid() {
        let berlin_now = now().with_timezone(&Berlin);
        assert!(matches!(
            parser().parse(&berlin_now, "2024-03-31 02:30 to 2024-03-31 05:00"),
            Err(TimeRangeError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_ambiguous_local_time_takes_earlier_instant() {
        let berlin_now = now().with_timezone(&Berlin);
        // 02:30 occurs twice on 2024-10-27; the CEST reading comes first.
        let range = parser()
            .parse(&berlin_now, "2024-10-27 02:30 to 2024-10-27 05:00")
            .unwrap();
        assert_eq!(range.from, Utc.with_ymd_and_hms(2024, 10, 27, 0, 30, 0).unwrap());
        assert_eq!(range.to, Utc.with_ymd_and_hms(2024, 10, 27, 4, 0, 0).unwrap());
    }

    #[test]
    fn test_non_ascii_digits_are_not_recognized() {
        for text in [
            "last \u{ff13} hours",
            "\u{662}\u{660}\u{662}\u{664}-01-01 to 2024-01-02",
            "2024-01-01 \u{661}\u{660}:00 to 2024-01-02",
        ] {
            assert_eq!(
                parser().parse(&now(), text),
                Err(TimeRangeError::UnrecognizedExpression),
                "{text}"
            );
        }
    }

    #[test]
    fn test_subsecond_now_is_truncated() {
        let precise = now() + Duration::milliseconds(750);
        let range = parser().parse(&precise, "last 1 hour").unwrap();
        assert_eq!(range.to, now());
        assert_eq!(range.from, now() - Duration::hours(1));
    }

    #[test]
    fn test_ranges_round_trip_through_epoch_seconds() {
        let precise = now() + Duration::nanoseconds(123_456_789);
        for text in ["", "last 5 hours", "2024-01-01 10:15 to 2024-01-03"] {
            let range = parser().parse(&precise, text).unwrap();
            let from = DateTime::from_timestamp(range.from.timestamp(), 0).unwrap();
            let to = DateTime::from_timestamp(range.to.timestamp(), 0).unwrap();
            assert_eq!(TimeRange { from, to }, range, "{text}");
        }
    }

    #[test]
    fn test_classify_yields_tagged_variants() {
        assert_eq!(RangeExpr::classify(" ").unwrap(), RangeExpr::Default);
        assert_eq!(
            RangeExpr::classify("last 4 hrs").unwrap(),
            RangeExpr::Relative {
                qty: 4,
                unit: RangeUnit::Hour
            }
        );
        assert!(matches!(
            RangeExpr::classify("2024-01-01 to 2024-01-02").unwrap(),
            RangeExpr::Explicit { .. }
        ));
    }
}
