//! CalendarApi trait definition.
//!
//! [`CalendarApi`] is the seam between the commands and the provider's HTTP
//! API. It exposes the two paginated listings the tool needs; the helpers
//! [`list_all_calendars`] and [`fetch_all_events`] follow continuation tokens
//! until the provider reports no more pages.

use std::future::Future;
use std::pin::Pin;

use caldump_core::{CalendarSummary, RawEvent, ReportZone, YearRange};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Guard against a provider that never stops handing out page tokens.
const MAX_PAGES: usize = 10_000;

/// A boxed future for async trait methods.
///
/// Boxing keeps the trait object-safe so commands can take `&dyn CalendarApi`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page, in provider order.
    pub items: Vec<T>,
    /// Continuation token for the next page, if any.
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    /// Creates the final page of a listing.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }

    /// Builder method to set the continuation token.
    pub fn with_next(mut self, token: impl Into<String>) -> Self {
        self.next_page_token = Some(token.into());
        self
    }
}

/// Parameters of an events listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Calendar to read.
    pub calendar_id: String,
    /// Lower bound, RFC 3339.
    pub time_min: String,
    /// Upper bound, RFC 3339.
    pub time_max: String,
    /// Zone the provider should express timestamps in.
    pub time_zone: String,
    /// Expand recurring events into single instances.
    pub single_events: bool,
    /// Order by start time (requires `single_events`).
    pub order_by_start_time: bool,
}

impl EventQuery {
    /// Query for every event instance of `calendar_id` within `range`,
    /// ordered by start time, with timestamps in `zone`.
    pub fn for_year(calendar_id: impl Into<String>, range: &YearRange, zone: &ReportZone) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            time_min: range.time_min(),
            time_max: range.time_max(),
            time_zone: zone.name().to_string(),
            single_events: true,
            order_by_start_time: true,
        }
    }
}

/// Read-only access to a calendar provider.
pub trait CalendarApi: Send + Sync {
    /// Fetches one page of the user's calendar list.
    fn list_calendars_page<'a>(
        &'a self,
        page_token: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<Page<CalendarSummary>>>;

    /// Fetches one page of events matching `query`.
    fn list_events_page<'a>(
        &'a self,
        query: &'a EventQuery,
        page_token: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<Page<RawEvent>>>;
}

/// Fetches every calendar visible to the user, in provider order.
pub async fn list_all_calendars(api: &dyn CalendarApi) -> ProviderResult<Vec<CalendarSummary>> {
    let mut calendars = Vec::new();
    let mut page_token: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let page = api.list_calendars_page(page_token.as_deref()).await?;
        calendars.extend(page.items);

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => {
                debug!("listed {} calendars", calendars.len());
                return Ok(calendars);
            }
        }
    }

    Err(too_many_pages("calendar list"))
}

/// Fetches every event matching `query`, accumulating pages in order.
pub async fn fetch_all_events(
    api: &dyn CalendarApi,
    query: &EventQuery,
) -> ProviderResult<Vec<RawEvent>> {
    let mut events = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0;

    loop {
        if pages == MAX_PAGES {
            return Err(too_many_pages("event list"));
        }
        let page = api.list_events_page(query, page_token.as_deref()).await?;
        pages += 1;
        events.extend(page.items);

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    debug!(
        "fetched {} events from calendar {} in {} page(s)",
        events.len(),
        query.calendar_id,
        pages
    );
    Ok(events)
}

fn too_many_pages(what: &str) -> ProviderError {
    ProviderError::invalid_response(format!(
        "{} did not finish after {} pages",
        what, MAX_PAGES
    ))
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedApi;
    use super::*;
    use caldump_core::RangeAnchor;
    use chrono::DateTime;

    fn event(summary: &str) -> RawEvent {
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00-04:00").unwrap();
        RawEvent::timed(summary, at, at)
    }

    fn query() -> EventQuery {
        let zone = ReportZone::default();
        let range = YearRange::new(2024, &zone, RangeAnchor::Zone).unwrap();
        EventQuery::for_year("work@example.com", &range, &zone)
    }

    #[test]
    fn query_for_year() {
        let q = query();
        assert_eq!(q.calendar_id, "work@example.com");
        assert_eq!(q.time_min, "2024-01-01T00:00:00-05:00");
        assert_eq!(q.time_max, "2024-12-31T23:59:59-05:00");
        assert_eq!(q.time_zone, "America/New_York");
        assert!(q.single_events);
        assert!(q.order_by_start_time);
    }

    #[tokio::test]
    async fn events_follow_continuation_tokens() {
        let api = ScriptedApi {
            event_pages: vec![
                Page::last(vec![event("a"), event("b")]).with_next("page-1"),
                Page::last(vec![event("c")]).with_next("page-2"),
                Page::last(vec![event("d")]),
            ],
            ..Default::default()
        };

        let events = fetch_all_events(&api, &query()).await.unwrap();
        let titles: Vec<_> = events.iter().filter_map(|e| e.summary.as_deref()).collect();
        assert_eq!(titles, ["a", "b", "c", "d"]);

        let tokens = api.requested_tokens.lock().unwrap().clone();
        assert_eq!(
            tokens,
            vec![None, Some("page-1".to_string()), Some("page-2".to_string())]
        );
        assert!(api.queries.lock().unwrap().iter().all(|q| *q == query()));
    }

    #[tokio::test]
    async fn empty_listing_is_fine() {
        let api = ScriptedApi {
            event_pages: vec![Page::last(Vec::new())],
            ..Default::default()
        };
        assert!(fetch_all_events(&api, &query()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_failing_page_fails_the_whole_fetch() {
        let api = ScriptedApi {
            event_pages: vec![Page::last(vec![event("a")]).with_next("page-7")],
            ..Default::default()
        };
        let err = fetch_all_events(&api, &query()).await.unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::NotFound);
    }

    #[tokio::test]
    async fn calendars_follow_continuation_tokens() {
        let api = ScriptedApi {
            calendar_pages: vec![
                Page::last(vec![CalendarSummary::new("a", "A")]).with_next("page-1"),
                Page::last(vec![CalendarSummary::new("b", "B").with_override("Bee")]),
            ],
            ..Default::default()
        };
        let calendars = list_all_calendars(&api).await.unwrap();
        let ids: Vec<_> = calendars.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(calendars[1].display_name(), "Bee");
    }
}
