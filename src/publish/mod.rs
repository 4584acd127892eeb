//! Hand-off of per-route collections to calendar files.
//!
//! [`CalendarEncoder`] turns one route's events into bytes and
//! [`CalendarWriter`] persists them under `<mode>/<file>`. Writers are
//! stacked so a run can write locally and upload in the same pass.

mod directory;
mod ics;
mod s3;

pub use directory::DirectoryWriter;
pub use ics::IcsEncoder;
pub use s3::S3Writer;

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::calendar::{CalendarCollection, DisruptionEvent};
use crate::config::TransportMode;
use crate::routes::RouteKey;

/// Serialises one route's events into a calendar document.
pub trait CalendarEncoder: Send + Sync {
    /// File extension of the produced documents, without the dot.
    fn extension(&self) -> &'static str;

    fn encode(
        &self,
        mode: TransportMode,
        route: &RouteKey,
        events: &[&Arc<DisruptionEvent>],
    ) -> Result<Vec<u8>>;
}

/// Persists an encoded calendar, replacing any previous version.
#[async_trait]
pub trait CalendarWriter: Send + Sync {
    async fn write(&self, mode: TransportMode, file_name: &str, body: &[u8]) -> Result<()>;

    /// Names of calendar files with `extension` already published for
    /// `mode`. Writers that cannot list their contents report none.
    async fn existing(&self, _mode: TransportMode, _extension: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// File name for a route's calendar: every character outside
/// `[A-Za-z0-9._-]` becomes `_`.
pub fn calendar_file_name(route: &RouteKey, extension: &str) -> String {
    let stem: String = route
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}.{extension}")
}

/// Encodes every route in `collection` and hands it to each writer.
/// Calendars a writer already holds for routes that no longer have any
/// disruption are overwritten with an empty calendar. Returns the number of
/// route calendars written.
#[tracing::instrument(skip_all, fields(mode = %mode, routes = collection.len()))]
pub async fn publish(
    collection: &CalendarCollection,
    mode: TransportMode,
    encoder: &dyn CalendarEncoder,
    writers: &[Box<dyn CalendarWriter>],
) -> Result<usize> {
    let mut current = BTreeSet::new();

    for (route, events) in collection.iter() {
        let body = encoder
            .encode(mode, route, &events)
            .with_context(|| format!("failed to encode calendar for route {route}"))?;
        let file_name = calendar_file_name(route, encoder.extension());

        for writer in writers {
            writer.write(mode, &file_name, &body).await?;
        }
        debug!(%route, events = events.len(), file = %file_name, "Calendar written");
        current.insert(file_name);
    }

    let mut cleared = 0;
    for writer in writers {
        cleared += clear_stale(writer.as_ref(), mode, encoder, &current).await?;
    }

    info!(calendars = current.len(), cleared, "Calendars published");
    Ok(current.len())
}

async fn clear_stale(
    writer: &dyn CalendarWriter,
    mode: TransportMode,
    encoder: &dyn CalendarEncoder,
    current: &BTreeSet<String>,
) -> Result<usize> {
    let suffix = format!(".{}", encoder.extension());
    let mut cleared = 0;

    for file_name in writer.existing(mode, encoder.extension()).await? {
        if current.contains(&file_name) {
            continue;
        }
        let Some(stem) = file_name.strip_suffix(&suffix) else {
            continue;
        };
        let route = RouteKey::new(stem);
        let body = encoder
            .encode(mode, &route, &[])
            .with_context(|| format!("failed to encode empty calendar for route {route}"))?;
        writer.write(mode, &file_name, &body).await?;
        debug!(%route, file = %file_name, "Cleared calendar of route without disruptions");
        cleared += 1;
    }

    Ok(cleared)
}
