use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use icalendar::{Calendar, Component, Event, EventLike};

use super::CalendarEncoder;
use crate::calendar::DisruptionEvent;
use crate::config::TransportMode;
use crate::routes::RouteKey;

/// iCalendar (RFC 5545) encoder. Instants are written in UTC; the target
/// timezone is advertised on the calendar for subscribing clients.
pub struct IcsEncoder {
    timezone: Tz,
}

impl IcsEncoder {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }
}

impl CalendarEncoder for IcsEncoder {
    fn extension(&self) -> &'static str {
        "ics"
    }

    fn encode(
        &self,
        mode: TransportMode,
        route: &RouteKey,
        events: &[&Arc<DisruptionEvent>],
    ) -> Result<Vec<u8>> {
        let mut events = events.to_vec();
        events.sort_by(|a, b| {
            a.window
                .start
                .cmp(&b.window.start)
                .then_with(|| a.key().cmp(&b.key()))
        });

        let mut calendar = Calendar::new();
        calendar
            .name(&format!("{route} ({mode}) disruptions"))
            .timezone(self.timezone.name());

        for event in events {
            let mut vevent = Event::new();
            vevent
                .uid(&event.uid())
                .summary(&event.title)
                .starts(event.window.start.with_timezone(&Utc))
                .ends(event.window.end.with_timezone(&Utc));
            if let Some(description) = &event.description {
                vevent.description(description);
            }
            if let Some(link) = &event.link {
                vevent.add_property("URL", link);
            }
            calendar.push(vevent.done());
        }

        Ok(calendar.done().to_string().into_bytes())
    }
}
