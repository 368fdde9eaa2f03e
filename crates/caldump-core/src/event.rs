//! Calendar and event types.
//!
//! - [`CalendarSummary`]: a calendar visible to the user
//! - [`RawEvent`]: an event as the provider returned it, possibly incomplete
//! - [`EventRecord`]: an event that qualifies for the report

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// A calendar from the user's calendar list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSummary {
    /// Calendar identifier (often an email address).
    pub id: String,
    /// The calendar's own name.
    pub name: String,
    /// The name the user gave the calendar, if any.
    pub name_override: Option<String>,
}

impl CalendarSummary {
    /// Creates a summary without a user override.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            name_override: None,
        }
    }

    /// Builder method to set the user override name.
    pub fn with_override(mut self, name: impl Into<String>) -> Self {
        self.name_override = Some(name.into());
        self
    }

    /// The name to show: the override when present, otherwise the default.
    pub fn display_name(&self) -> &str {
        self.name_override.as_deref().unwrap_or(&self.name)
    }

    /// Returns `true` if `wanted` equals the id, the default name, or the
    /// override name, checked in that order.
    pub fn matches(&self, wanted: &str) -> bool {
        self.id == wanted
            || self.name == wanted
            || self.name_override.as_deref() == Some(wanted)
    }
}

/// Finds the first calendar matching `wanted`, in list order.
pub fn resolve_calendar<'a>(
    calendars: &'a [CalendarSummary],
    wanted: &str,
) -> Option<&'a CalendarSummary> {
    calendars.iter().find(|c| c.matches(wanted))
}

/// An event as received from the provider.
///
/// Any field may be missing; timestamps that failed to parse are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    /// Provider event identifier.
    pub id: Option<String>,
    /// Event title.
    pub summary: Option<String>,
    /// Start boundary.
    pub start: Option<EventTime>,
    /// End boundary.
    pub end: Option<EventTime>,
}

impl RawEvent {
    /// Creates a timed event.
    pub fn timed(
        summary: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: None,
            summary: Some(summary.into()),
            start: Some(EventTime::DateTime(start)),
            end: Some(EventTime::DateTime(end)),
        }
    }
}

/// An event that has a summary and concrete start and end instants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub summary: String,
}

impl EventRecord {
    /// Keeps the event only if every reported field is present and concrete.
    ///
    /// All-day events and events without a summary yield `None`.
    pub fn from_raw(raw: &RawEvent) -> Option<Self> {
        let summary = raw.summary.as_ref()?;
        let start = raw.start.as_ref()?.as_datetime()?;
        let end = raw.end.as_ref()?.as_datetime()?;

        Some(Self {
            start: *start,
            end: *end,
            summary: summary.clone(),
        })
    }

    /// Elapsed time between start and end.
    pub fn duration(&self) -> Duration {
        self.end.signed_duration_since(self.start)
    }
}

/// Converts raw events into report records, dropping the ones that do not
/// qualify. Order is preserved.
pub fn qualifying_events<'a, I>(raw: I) -> Vec<EventRecord>
where
    I: IntoIterator<Item = &'a RawEvent>,
{
    raw.into_iter().filter_map(EventRecord::from_raw).collect()
}
