//! Disruption events and their per-route grouping.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::routes::RouteKey;
use crate::temporal::TimeWindow;

/// One calendar-ready occurrence of an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisruptionEvent {
    /// The alert identifier.
    pub id: String,
    /// Index of the active period this event came from when periods are
    /// kept separate; `None` when the alert yields a single event.
    pub occurrence: Option<usize>,
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub window: TimeWindow,
}

/// Identity of an event within a route's calendar: the alert id plus the
/// period index when one alert is split into numbered occurrences.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    pub id: String,
    pub occurrence: Option<usize>,
}

impl DisruptionEvent {
    pub fn key(&self) -> EventKey {
        EventKey {
            id: self.id.clone(),
            occurrence: self.occurrence,
        }
    }

    /// Stable iCalendar UID.
    pub fn uid(&self) -> String {
        match self.occurrence {
            Some(n) => format!("{}-{}", self.id, n),
            None => self.id.clone(),
        }
    }
}

/// Per-route sets of disruption events. Events are shared between routes.
#[derive(Debug, Default)]
pub struct CalendarCollection {
    routes: BTreeMap<RouteKey, BTreeMap<EventKey, Arc<DisruptionEvent>>>,
}

impl CalendarCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `(route, event)` pairs into a new collection.
    pub fn aggregate<I>(events: I) -> Self
    where
        I: IntoIterator<Item = (RouteKey, Arc<DisruptionEvent>)>,
    {
        let mut collection = Self::new();
        for (route, event) in events {
            collection.insert(route, event);
        }
        collection
    }

    /// Adds `event` to `route`'s set. Returns `false` if an event with the
    /// same identity was already present; the existing entry is kept.
    pub fn insert(&mut self, route: RouteKey, event: Arc<DisruptionEvent>) -> bool {
        let events = self.routes.entry(route).or_default();
        let key = event.key();
        if events.contains_key(&key) {
            return false;
        }
        events.insert(key, event);
        true
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Total number of route/event memberships.
    pub fn event_count(&self) -> usize {
        self.routes.values().map(BTreeMap::len).sum()
    }

    pub fn events<'a>(
        &'a self,
        route: &RouteKey,
    ) -> Option<impl Iterator<Item = &'a Arc<DisruptionEvent>> + use<'a>> {
        self.routes.get(route).map(|events| events.values())
    }

    pub fn routes(&self) -> impl Iterator<Item = &RouteKey> {
        self.routes.keys()
    }

    /// Iterates routes in key order with their events.
    pub fn iter(&self) -> impl Iterator<Item = (&RouteKey, Vec<&Arc<DisruptionEvent>>)> {
        self.routes
            .iter()
            .map(|(route, events)| (route, events.values().collect()))
    }
}
