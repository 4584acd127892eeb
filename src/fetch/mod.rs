//! Retrieval of alert feeds from the Open Data API.

mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use anyhow::{Context, Result, bail};
use tracing::{debug, error};

use crate::config::TransportMode;
use crate::gtfs_rt::FeedMessage;
use crate::parser::parse_feed;

/// Base URL of the GTFS-realtime alerts endpoint; the mode is appended.
pub const ALERTS_API: &str = "https://api.transport.nsw.gov.au/v2/gtfs/alerts";

pub fn alerts_url(base_url: &str, mode: TransportMode) -> String {
    format!("{}/{}?format=json", base_url.trim_end_matches('/'), mode)
}

/// Fetches and decodes the current alerts snapshot for `mode`.
#[tracing::instrument(skip_all, fields(mode = %mode))]
pub async fn fetch_alerts<C: HttpClient>(
    client: &C,
    base_url: &str,
    mode: TransportMode,
) -> Result<FeedMessage> {
    let bytes = fetch_bytes(client, &alerts_url(base_url, mode)).await?;
    debug!(bytes = bytes.len(), "Feed bytes received, parsing");
    parse_feed(&bytes)
}

/// Issues a single GET. Non-2xx responses are logged with their body and
/// turned into an error carrying status and body.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("request to {url} failed"))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        error!(%status, %body, "Alerts API returned an error");
        bail!("{url} returned status {status}: {body}");
    }

    Ok(resp.bytes().await?.to_vec())
}
