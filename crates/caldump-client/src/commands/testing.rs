//! An in-memory [`CalendarApi`] for command tests.

use std::sync::Mutex;

use caldump_core::{CalendarSummary, RawEvent};
use caldump_providers::{BoxFuture, CalendarApi, EventQuery, Page, ProviderError, ProviderResult};

/// Serves pages by index; page tokens are the decimal index of the next page.
#[derive(Default)]
pub struct FakeApi {
    pub calendar_pages: Vec<Page<CalendarSummary>>,
    pub event_pages: Vec<Page<RawEvent>>,
    pub reject: bool,
    pub queries: Mutex<Vec<EventQuery>>,
}

impl FakeApi {
    pub fn with_calendars(calendars: Vec<CalendarSummary>) -> Self {
        Self {
            calendar_pages: vec![Page::last(calendars)],
            ..Default::default()
        }
    }

    pub fn with_events(mut self, events: Vec<RawEvent>) -> Self {
        self.event_pages = vec![Page::last(events)];
        self
    }

    /// Answers every request with 401.
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    fn page<T: Clone>(&self, pages: &[Page<T>], token: Option<&str>) -> ProviderResult<Page<T>> {
        if self.reject {
            return Err(ProviderError::from_status(401, "invalid credentials"));
        }
        let index = token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
        pages
            .get(index)
            .cloned()
            .ok_or_else(|| ProviderError::from_status(404, "no such page"))
    }
}

impl CalendarApi for FakeApi {
    fn list_calendars_page<'a>(
        &'a self,
        page_token: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<Page<CalendarSummary>>> {
        let result = self.page(&self.calendar_pages, page_token);
        Box::pin(async move { result })
    }

    fn list_events_page<'a>(
        &'a self,
        query: &'a EventQuery,
        page_token: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<Page<RawEvent>>> {
        self.queries.lock().unwrap().push(query.clone());
        let result = self.page(&self.event_pages, page_token);
        Box::pin(async move { result })
    }
}
