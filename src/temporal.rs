//! Time-window extraction for alerts.
//!
//! An alert's window comes either from its structured active periods or from
//! date phrases such as "Saturday 6 and Sunday 7 December" in the localized
//! description. [`WindowPrecedence`] decides which source is consulted first
//! and [`PeriodMode`] decides how several active periods become windows.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Month, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use clap::ValueEnum;
use regex::Regex;
use tracing::debug;

use crate::gtfs_rt::{Alert, TimeRange};
use crate::localize::localize;

static DATE_RANGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)\s+",
        r"([0-9]{1,2})",
        r"(?:\s*(?:and|&)\s*",
        r"(Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)?\s*",
        r"([0-9]{1,2})?)?\s*",
        r"(January|February|March|April|May|June|July|August|September|October|November|December)",
    ))
    .unwrap()
});

/// A closed interval of zoned instants with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl TimeWindow {
    /// Builds a window from two instants, ordering them if needed.
    pub fn new(a: DateTime<Tz>, b: DateTime<Tz>) -> Self {
        if b < a {
            Self { start: b, end: a }
        } else {
            Self { start: a, end: b }
        }
    }

    pub fn instant(at: DateTime<Tz>) -> Self {
        Self { start: at, end: at }
    }

    /// Smallest window covering all of `windows`.
    pub fn span(windows: &[TimeWindow]) -> Option<TimeWindow> {
        let start = windows.iter().map(|w| w.start).min()?;
        let end = windows.iter().map(|w| w.end).max()?;
        Some(Self { start, end })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// How an alert's structured active periods become windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PeriodMode {
    /// Only the first usable period.
    #[default]
    First,
    /// One window per period.
    Each,
    /// One window from the earliest start to the latest end.
    Merged,
}

/// Order in which the two extraction strategies are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum WindowPrecedence {
    /// Parse the description first, fall back to active periods.
    #[default]
    TextFirst,
    /// Use active periods only.
    StructuredOnly,
}

/// Derives time windows for alerts in a fixed timezone and locale.
#[derive(Debug, Clone)]
pub struct TemporalExtractor {
    tz: Tz,
    locale: String,
    precedence: WindowPrecedence,
    period_mode: PeriodMode,
    year: i32,
}

impl TemporalExtractor {
    /// `today` supplies the year assumed for dates parsed out of free text.
    pub fn new(
        tz: Tz,
        locale: impl Into<String>,
        precedence: WindowPrecedence,
        period_mode: PeriodMode,
        today: NaiveDate,
    ) -> Self {
        Self {
            tz,
            locale: locale.into(),
            precedence,
            period_mode,
            year: today.year(),
        }
    }

    pub fn period_mode(&self) -> PeriodMode {
        self.period_mode
    }

    /// Returns the alert's windows, or `None` when no strategy yields one.
    ///
    /// Text-derived windows always come back as a single window. Structured
    /// windows follow the configured [`PeriodMode`].
    pub fn extract_windows(&self, alert: &Alert) -> Option<Vec<TimeWindow>> {
        match self.precedence {
            WindowPrecedence::TextFirst => self
                .from_description(alert)
                .map(|w| vec![w])
                .or_else(|| self.from_active_periods(alert)),
            WindowPrecedence::StructuredOnly => self.from_active_periods(alert),
        }
    }

    pub fn from_active_periods(&self, alert: &Alert) -> Option<Vec<TimeWindow>> {
        let windows = structured_windows(&alert.active_period, self.tz);
        match self.period_mode {
            PeriodMode::First => windows.into_iter().next().map(|w| vec![w]),
            PeriodMode::Each if windows.is_empty() => None,
            PeriodMode::Each => Some(windows),
            PeriodMode::Merged => TimeWindow::span(&windows).map(|w| vec![w]),
        }
    }

    pub fn from_description(&self, alert: &Alert) -> Option<TimeWindow> {
        let text = localize(alert.description_text.as_ref(), &self.locale)?;
        parse_description_dates(text, self.year, self.tz)
    }
}

/// Converts active periods to windows in `tz`. A missing end equals the
/// start; periods without a start or outside the representable range are
/// dropped.
pub fn structured_windows(periods: &[TimeRange], tz: Tz) -> Vec<TimeWindow> {
    periods
        .iter()
        .filter_map(|period| {
            let start = period.start?;
            let end = period.end.unwrap_or(start);
            let start = from_epoch(start, tz)?;
            let end = from_epoch(end, tz)?;
            Some(TimeWindow::new(start, end))
        })
        .collect()
}

fn from_epoch(seconds: u64, tz: Tz) -> Option<DateTime<Tz>> {
    let seconds = i64::try_from(seconds).ok()?;
    tz.timestamp_opt(seconds, 0).single()
}

/// Collects every `Weekday Day [and|& Weekday Day] Month` phrase in `text`
/// and returns the window from the earliest to the latest date, each at local
/// midnight in `year`.
///
/// The year is never present in the text, so phrases describing another year
/// resolve to the wrong date.
pub fn parse_description_dates(text: &str, year: i32, tz: Tz) -> Option<TimeWindow> {
    let mut dates = Vec::new();

    for caps in DATE_RANGE_REGEX.captures_iter(text) {
        let Ok(month) = caps[5].parse::<Month>() else {
            continue;
        };
        // The second day only counts when it is named with its weekday.
        let second = caps.get(3).and(caps.get(4));
        let days = [caps.get(2), second];
        for day in days.into_iter().flatten() {
            let Ok(day) = day.as_str().parse::<u32>() else {
                continue;
            };
            match local_midnight(year, month, day, tz) {
                Some(date) => dates.push(date),
                None => debug!(day, month = month.name(), year, "Ignoring impossible date"),
            }
        }
    }

    let start = dates.iter().min()?;
    let end = dates.iter().max()?;
    Some(TimeWindow::new(*start, *end))
}

fn local_midnight(year: i32, month: Month, day: u32, tz: Tz) -> Option<DateTime<Tz>> {
    let date = NaiveDate::from_ymd_opt(year, month.number_from_month(), day)?;
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN)).earliest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::{TranslatedString, Translation};
    use chrono_tz::Australia::Sydney;

    fn midnight(year: i32, month: u32, day: u32) -> DateTime<Tz> {
        Sydney.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    fn alert(description: Option<&str>, periods: Vec<TimeRange>) -> Alert {
        Alert {
            active_period: periods,
            description_text: description.map(|text| TranslatedString {
                translation: vec![Translation {
                    text: text.to_string(),
                    language: Some("en".to_string()),
                }],
            }),
            ..Default::default()
        }
    }

    fn period(start: u64, end: Option<u64>) -> TimeRange {
        TimeRange {
            start: Some(start),
            end,
        }
    }

    fn extractor(precedence: WindowPrecedence, mode: PeriodMode) -> TemporalExtractor {
        let today = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
        TemporalExtractor::new(Sydney, "en", precedence, mode, today)
    }

    #[test]
    fn test_weekend_pair_in_one_month() {
        let window =
            parse_description_dates("Saturday 6 and Sunday 7 December", 2025, Sydney).unwrap();

        assert_eq!(window.start, midnight(2025, 12, 6));
        assert_eq!(window.end, midnight(2025, 12, 7));
    }

    #[test]
    fn test_single_date_gives_instant_window() {
        let window = parse_description_dates(
            "Trains do not run on Sunday 14 September.",
            2025,
            Sydney,
        )
        .unwrap();

        assert_eq!(window, TimeWindow::instant(midnight(2025, 9, 14)));
    }

    #[test]
    fn test_second_day_without_weekday_is_not_counted() {
        let window = parse_description_dates("Saturday 6 & 7 December", 2025, Sydney).unwrap();

        assert_eq!(window, TimeWindow::instant(midnight(2025, 12, 6)));
    }

    #[test]
    fn test_ampersand_with_both_weekdays() {
        let window =
            parse_description_dates("Saturday 6 & Sunday 7 December", 2025, Sydney).unwrap();

        assert_eq!(window.start, midnight(2025, 12, 6));
        assert_eq!(window.end, midnight(2025, 12, 7));
    }

    #[test]
    fn test_all_phrases_are_combined() {
        let text = "Buses replace trains from Friday 28 February until Sunday 2 March, \
                    and again on Saturday 15 & Sunday 16 March.";
        let window = parse_description_dates(text, 2025, Sydney).unwrap();

        assert_eq!(window.start, midnight(2025, 2, 28));
        assert_eq!(window.end, midnight(2025, 3, 16));
    }

    #[test]
    fn test_no_date_phrase_is_absent() {
        assert_eq!(
            parse_description_dates("Allow extra travel time.", 2025, Sydney),
            None
        );
        // Grammar is case-sensitive.
        assert_eq!(
            parse_description_dates("saturday 6 december", 2025, Sydney),
            None
        );
    }

    #[test]
    fn test_impossible_date_is_ignored() {
        assert_eq!(
            parse_description_dates("Monday 31 February", 2025, Sydney),
            None
        );
    }

    #[test]
    fn test_structured_period_without_end() {
        let windows = structured_windows(&[period(1_700_000_000, None)], Sydney);

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, windows[0].end);
        assert_eq!(windows[0].start.timezone(), Sydney);
        assert_eq!(
            windows[0].start.naive_local().to_string(),
            "2023-11-15 09:13:20"
        );
    }

    #[test]
    fn test_reversed_period_is_ordered() {
        let windows = structured_windows(&[period(1_700_003_600, Some(1_700_000_000))], Sydney);
        assert!(windows[0].start < windows[0].end);
    }

    #[test]
    fn test_period_modes() {
        let alert = alert(
            None,
            vec![
                period(1_700_000_000, Some(1_700_003_600)),
                TimeRange::default(),
                period(1_700_600_000, Some(1_700_603_600)),
            ],
        );

        let first = extractor(WindowPrecedence::StructuredOnly, PeriodMode::First)
            .extract_windows(&alert)
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].start.timestamp(), 1_700_000_000);

        let each = extractor(WindowPrecedence::StructuredOnly, PeriodMode::Each)
            .extract_windows(&alert)
            .unwrap();
        assert_eq!(each.len(), 2);

        let merged = extractor(WindowPrecedence::StructuredOnly, PeriodMode::Merged)
            .extract_windows(&alert)
            .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start.timestamp(), 1_700_000_000);
        assert_eq!(merged[0].end.timestamp(), 1_700_603_600);
    }

    #[test]
    fn test_text_first_prefers_description() {
        let alert = alert(
            Some("Saturday 6 and Sunday 7 December"),
            vec![period(1_700_000_000, None)],
        );
        let windows = extractor(WindowPrecedence::TextFirst, PeriodMode::First)
            .extract_windows(&alert)
            .unwrap();

        assert_eq!(windows, vec![TimeWindow::new(midnight(2025, 12, 6), midnight(2025, 12, 7))]);
    }

    #[test]
    fn test_text_first_falls_back_to_periods() {
        let alert = alert(Some("Allow extra travel time."), vec![period(1_700_000_000, None)]);
        let windows = extractor(WindowPrecedence::TextFirst, PeriodMode::First)
            .extract_windows(&alert)
            .unwrap();

        assert_eq!(windows[0].start.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_structured_only_ignores_description() {
        let alert = alert(Some("Saturday 6 and Sunday 7 December"), vec![]);
        let windows = extractor(WindowPrecedence::StructuredOnly, PeriodMode::Each)
            .extract_windows(&alert);

        assert_eq!(windows, None);
    }

    #[test]
    fn test_nothing_usable_is_absent() {
        let alert = alert(Some("Allow extra travel time."), vec![]);
        for mode in [PeriodMode::First, PeriodMode::Each, PeriodMode::Merged] {
            assert_eq!(
                extractor(WindowPrecedence::TextFirst, mode).extract_windows(&alert),
                None
            );
        }
    }
}
