//! Single-pass ingestion of an alerts feed into per-route calendars.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::calendar::{CalendarCollection, DisruptionEvent};
use crate::config::Config;
use crate::gtfs_rt::{Alert, FeedMessage};
use crate::localize::localize;
use crate::relevance::RelevanceClassifier;
use crate::routes::{RouteKey, resolve_routes};
use crate::temporal::{PeriodMode, TemporalExtractor, WindowPrecedence};

/// Why an alert produced no calendar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotRelevant,
    NoHeader,
    NoWindow,
    NoRoutes,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::NotRelevant => "not relevant",
            SkipReason::NoHeader => "no localized header",
            SkipReason::NoWindow => "no time window",
            SkipReason::NoRoutes => "no affected routes",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub alert_id: String,
    pub header: Option<String>,
    pub reason: SkipReason,
}

/// Result of one pass over a feed.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub collection: CalendarCollection,
    pub skipped: Vec<Skip>,
    pub total_entities: usize,
    pub alerts: usize,
    pub relevant: usize,
}

impl IngestOutcome {
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|s| s.reason == reason).count()
    }
}

/// The alert-interpretation pipeline with its strategies fixed at
/// construction.
pub struct Pipeline {
    locale: String,
    classifier: Box<dyn RelevanceClassifier>,
    extractor: TemporalExtractor,
    today: NaiveDate,
}

impl Pipeline {
    /// `today` fixes the year assumed for dates parsed from descriptions.
    pub fn new(
        config: &Config,
        classifier: Box<dyn RelevanceClassifier>,
        precedence: WindowPrecedence,
        period_mode: PeriodMode,
        today: NaiveDate,
    ) -> Self {
        let extractor = TemporalExtractor::new(
            config.target_timezone,
            config.target_locale.clone(),
            precedence,
            period_mode,
            today,
        );
        Self {
            locale: config.target_locale.clone(),
            classifier,
            extractor,
            today,
        }
    }

    /// Like [`Pipeline::new`] with today's date in the target timezone.
    pub fn for_today(
        config: &Config,
        classifier: Box<dyn RelevanceClassifier>,
        precedence: WindowPrecedence,
        period_mode: PeriodMode,
    ) -> Self {
        let today = Utc::now()
            .with_timezone(&config.target_timezone)
            .date_naive();
        Self::new(config, classifier, precedence, period_mode, today)
    }

    /// Local date the pipeline was built for.
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Runs every alert in feed order through classification, window
    /// extraction and route resolution, grouping the resulting events by
    /// route.
    pub fn ingest(&self, feed: &FeedMessage) -> IngestOutcome {
        let mut outcome = IngestOutcome {
            total_entities: feed.entity.len(),
            ..Default::default()
        };

        for entity in &feed.entity {
            let Some(alert) = &entity.alert else {
                debug!(entity_id = %entity.id, "Entity carries no alert");
                continue;
            };
            outcome.alerts += 1;

            match self.interpret(&entity.id, alert) {
                Ok(pairs) => {
                    outcome.relevant += 1;
                    for (route, event) in pairs {
                        outcome.collection.insert(route, event);
                    }
                }
                Err(reason) => {
                    if reason != SkipReason::NotRelevant {
                        outcome.relevant += 1;
                    }
                    let header = localize(alert.header_text.as_ref(), &self.locale);
                    log_skip(&entity.id, header, reason);
                    outcome.skipped.push(Skip {
                        alert_id: entity.id.clone(),
                        header: header.map(str::to_string),
                        reason,
                    });
                }
            }
        }

        outcome
    }

    fn interpret(
        &self,
        id: &str,
        alert: &Alert,
    ) -> Result<Vec<(RouteKey, Arc<DisruptionEvent>)>, SkipReason> {
        if !self.classifier.is_relevant(alert, &self.locale) {
            return Err(SkipReason::NotRelevant);
        }
        let title = localize(alert.header_text.as_ref(), &self.locale).ok_or(SkipReason::NoHeader)?;
        let windows = self
            .extractor
            .extract_windows(alert)
            .ok_or(SkipReason::NoWindow)?;
        let routes = resolve_routes(alert);
        if routes.is_empty() {
            return Err(SkipReason::NoRoutes);
        }

        let description = localize(alert.description_text.as_ref(), &self.locale);
        let link = localize(alert.url.as_ref(), &self.locale);
        let numbered = windows.len() > 1;

        let events: Vec<Arc<DisruptionEvent>> = windows
            .into_iter()
            .enumerate()
            .map(|(n, window)| {
                Arc::new(DisruptionEvent {
                    id: id.to_string(),
                    occurrence: numbered.then_some(n),
                    title: title.to_string(),
                    description: description.map(str::to_string),
                    link: link.map(str::to_string),
                    window,
                })
            })
            .collect();

        Ok(routes
            .into_iter()
            .flat_map(|route| events.iter().map(move |e| (route.clone(), e.clone())))
            .collect())
    }
}

fn log_skip(alert_id: &str, header: Option<&str>, reason: SkipReason) {
    let header = header.unwrap_or("<no header>");
    match reason {
        SkipReason::NoRoutes => debug!(alert_id, header, %reason, "Dropping alert"),
        _ => info!(alert_id, header, %reason, "Skipping alert"),
    }
}
