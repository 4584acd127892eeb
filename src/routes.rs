//! Canonical route keys derived from an alert's informed entities.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::gtfs_rt::Alert;

const VARIANT_SEPARATOR: char = '_';

/// A route identifier with its direction or variant suffix removed,
/// e.g. `IWL_2d` becomes `IWL`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteKey(Arc<str>);

impl RouteKey {
    /// Wraps an already canonical key, e.g. one recovered from a calendar
    /// file name.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().into())
    }

    /// Canonicalises a raw feed route id.
    pub fn from_route_id(route_id: &str) -> Self {
        let prefix = route_id
            .split_once(VARIANT_SEPARATOR)
            .map_or(route_id, |(prefix, _)| prefix);
        Self(prefix.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the set of routes an alert affects. Entities without a route id
/// are ignored, so the result may be empty.
pub fn resolve_routes(alert: &Alert) -> BTreeSet<RouteKey> {
    alert
        .informed_entity
        .iter()
        .filter_map(|entity| entity.route_id.as_deref())
        .filter(|route_id| !route_id.is_empty())
        .map(RouteKey::from_route_id)
        .collect()
}
