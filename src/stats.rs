use std::fs::{self, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::config::TransportMode;
use crate::pipeline::{IngestOutcome, SkipReason};

/// Summary of one ingestion run for one transport mode.
#[derive(Debug, Default, Serialize)]
pub struct RunStats {
    pub timestamp: DateTime<Utc>,
    /// Local date in the target timezone; also the year assumed for dates
    /// parsed out of descriptions.
    pub run_date: Option<NaiveDate>,
    pub transport_mode: Option<String>,
    pub feed_timestamp: Option<u64>,
    pub total_entities: usize,
    pub alerts: usize,
    pub relevant: usize,

    // skips by reason
    pub skipped_not_relevant: usize,
    pub skipped_no_header: usize,
    pub skipped_no_window: usize,
    pub dropped_no_routes: usize,

    // output
    pub routes: usize,
    pub events: usize,
    pub calendars_written: usize,
}

impl RunStats {
    pub fn from_outcome(outcome: &IngestOutcome) -> Self {
        RunStats {
            timestamp: Utc::now(),
            total_entities: outcome.total_entities,
            alerts: outcome.alerts,
            relevant: outcome.relevant,
            skipped_not_relevant: outcome.skipped_for(SkipReason::NotRelevant),
            skipped_no_header: outcome.skipped_for(SkipReason::NoHeader),
            skipped_no_window: outcome.skipped_for(SkipReason::NoWindow),
            dropped_no_routes: outcome.skipped_for(SkipReason::NoRoutes),
            routes: outcome.collection.len(),
            events: outcome.collection.event_count(),
            ..Default::default()
        }
    }

    /// Set feed metadata (mode, header timestamp and local run date)
    pub fn with_feed_info(
        mut self,
        mode: TransportMode,
        feed_timestamp: Option<u64>,
        run_date: NaiveDate,
    ) -> Self {
        self.transport_mode = Some(mode.to_string());
        self.feed_timestamp = feed_timestamp;
        self.run_date = Some(run_date);
        self
    }

    pub fn with_calendars_written(mut self, written: usize) -> Self {
        self.calendars_written = written;
        self
    }

    pub fn skipped(&self) -> usize {
        self.skipped_not_relevant + self.skipped_no_header + self.skipped_no_window
    }

    /// Appends this run as one row of a CSV run log, creating the file (and
    /// its directory) with a header row when it is new or empty.
    pub fn append_csv(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        let needs_header = fs::metadata(path).map_or(true, |m| m.len() == 0);
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .with_context(|| format!("failed to open run log {}", path.display()))?;

        let mut writer = WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(self)?;
        writer.flush()?;

        debug!(
            path = %path.display(),
            mode = self.transport_mode.as_deref().unwrap_or("<unknown>"),
            needs_header,
            "Appended run to CSV log"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Skip;
    use std::env;

    fn skip(reason: SkipReason) -> Skip {
        Skip {
            alert_id: "a".to_string(),
            header: None,
            reason,
        }
    }

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 20).unwrap()
    }

    #[test]
    fn test_from_empty_outcome() {
        let stats = RunStats::from_outcome(&IngestOutcome::default());
        assert_eq!(stats.total_entities, 0);
        assert_eq!(stats.routes, 0);
        assert_eq!(stats.skipped(), 0);
    }

    #[test]
    fn test_skips_are_counted_by_reason() {
        let outcome = IngestOutcome {
            skipped: vec![
                skip(SkipReason::NotRelevant),
                skip(SkipReason::NotRelevant),
                skip(SkipReason::NoWindow),
                skip(SkipReason::NoRoutes),
            ],
            total_entities: 5,
            alerts: 5,
            relevant: 3,
            ..Default::default()
        };
        let stats = RunStats::from_outcome(&outcome)
            .with_feed_info(TransportMode::Ferries, Some(1_700_000_000), run_date())
            .with_calendars_written(2);

        assert_eq!(stats.skipped_not_relevant, 2);
        assert_eq!(stats.skipped_no_window, 1);
        assert_eq!(stats.dropped_no_routes, 1);
        assert_eq!(stats.skipped(), 3);
        assert_eq!(stats.transport_mode.as_deref(), Some("ferries"));
        assert_eq!(stats.run_date, Some(run_date()));
        assert_eq!(stats.calendars_written, 2);
    }

    #[test]
    fn test_run_log_gets_one_header_and_a_row_per_mode() {
        let dir = env::temp_dir().join("disruption_calendar_test_run_log");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("runs.csv");

        for mode in [TransportMode::Metro, TransportMode::Sydneytrains] {
            RunStats::default()
                .with_feed_info(mode, None, run_date())
                .append_csv(&path)
                .unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,run_date,transport_mode"));
        assert!(lines[1].contains(",2025-11-20,metro,"));
        assert!(lines[2].contains(",2025-11-20,sydneytrains,"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_existing_log_still_gets_header() {
        let dir = env::temp_dir().join("disruption_calendar_test_empty_log");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("runs.csv");
        fs::write(&path, "").unwrap();

        RunStats::default()
            .with_feed_info(TransportMode::Buses, None, run_date())
            .append_csv(&path)
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("timestamp,"));
        assert_eq!(content.lines().count(), 2);

        fs::remove_dir_all(&dir).unwrap();
    }
}
