//! Serde model of the GTFS-realtime alerts feed as rendered in JSON by the
//! Transport for NSW Open Data API.
//!
//! Only the alert side of the feed is modelled. Field names follow the
//! protobuf JSON mapping (`camelCase`), and 64-bit integers may arrive either
//! as numbers or as decimal strings.

use serde::{Deserialize, Deserializer, de};
use tracing::warn;

/// The contents of one feed snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeedMessage {
    #[serde(default)]
    pub header: FeedHeader,
    /// Entities that fail to decode are logged and left out, so one
    /// malformed alert never rejects the whole snapshot.
    #[serde(default, deserialize_with = "deserialize_entities")]
    pub entity: Vec<FeedEntity>,
}

/// Metadata about the feed snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedHeader {
    #[serde(default)]
    pub gtfs_realtime_version: String,
    pub incrementality: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_u64")]
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeedEntity {
    pub id: String,
    pub alert: Option<Alert>,
}

/// A single service alert.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub active_period: Vec<TimeRange>,
    #[serde(default)]
    pub informed_entity: Vec<EntitySelector>,
    pub cause: Option<String>,
    pub effect: Option<String>,
    pub header_text: Option<TranslatedString>,
    pub description_text: Option<TranslatedString>,
    pub url: Option<TranslatedString>,
}

/// An operator-supplied active period, in POSIX seconds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TimeRange {
    #[serde(default, deserialize_with = "deserialize_option_u64")]
    pub start: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_option_u64")]
    pub end: Option<u64>,
}

/// Reference from an alert to the agency, route or direction it affects.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySelector {
    pub agency_id: Option<String>,
    pub route_id: Option<String>,
    pub direction_id: Option<u32>,
    pub stop_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TranslatedString {
    #[serde(default)]
    pub translation: Vec<Translation>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Translation {
    pub text: String,
    pub language: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

fn deserialize_entities<'de, D>(deserializer: D) -> Result<Vec<FeedEntity>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut entities = Vec::with_capacity(raw.len());

    for (index, value) in raw.into_iter().enumerate() {
        let entity_id = value
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        match serde_json::from_value::<FeedEntity>(value) {
            Ok(entity) => entities.push(entity),
            Err(e) => warn!(
                index,
                entity_id = entity_id.as_deref().unwrap_or("<no id>"),
                error = %e,
                "Dropping undecodable feed entity"
            ),
        }
    }

    Ok(entities)
}

fn deserialize_option_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid integer '{s}': {e}"))),
    }
}
