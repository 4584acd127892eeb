//! JSON parser for GTFS Realtime alert feeds.

use anyhow::{Context, Result};

use crate::gtfs_rt::FeedMessage;

/// Decodes a JSON-encoded alerts [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not a JSON object matching the feed shape.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    serde_json::from_slice(bytes).context("feed body is not a valid alerts FeedMessage")
}
