//! Google Calendar API client.
//!
//! This module provides a low-level HTTP client for the Google Calendar API,
//! handling bearer authentication, request building, and response parsing.

use caldump_core::{CalendarSummary, EventTime, RawEvent};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::{BoxFuture, CalendarApi, EventQuery, Page};
use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};

use super::config::GoogleConfig;

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar API client bound to one access token.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl GoogleCalendarClient {
    /// Creates a new Google Calendar client with the given access token.
    pub fn new(access_token: impl Into<String>, config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = config.http_client().map_err(|e| {
            ProviderError::internal(format!("failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
        })
    }

    /// Sends an authenticated GET and parses the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("request timeout")
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {}", e))
                } else {
                    ProviderError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::authentication(
                "access token expired or invalid",
            ));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::new(
                ProviderErrorCode::RateLimited,
                format!(
                    "rate limit exceeded{}",
                    retry_after
                        .map(|s| format!(", retry after {} seconds", s))
                        .unwrap_or_default()
                ),
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })
    }

    async fn calendars_page(
        &self,
        page_token: Option<&str>,
    ) -> ProviderResult<Page<CalendarSummary>> {
        let url = format!("{}/users/me/calendarList", CALENDAR_API_BASE);

        let mut query = Vec::new();
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let list: CalendarListResponse = self.get_json(&url, &query).await?;
        debug!("calendar list page with {} entries", list.items.len());

        Ok(Page {
            items: list.items.into_iter().map(CalendarSummary::from).collect(),
            next_page_token: list.next_page_token,
        })
    }

    async fn events_page(
        &self,
        query: &EventQuery,
        page_token: Option<&str>,
    ) -> ProviderResult<Page<RawEvent>> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(&query.calendar_id)
        );

        let params = event_query_params(query, page_token);
        let list: EventListResponse = self.get_json(&url, &params).await?;
        debug!("event page with {} entries", list.items.len());

        Ok(Page {
            items: list.items.into_iter().filter_map(convert_event).collect(),
            next_page_token: list.next_page_token,
        })
    }
}

impl CalendarApi for GoogleCalendarClient {
    fn list_calendars_page<'a>(
        &'a self,
        page_token: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<Page<CalendarSummary>>> {
        Box::pin(self.calendars_page(page_token))
    }

    fn list_events_page<'a>(
        &'a self,
        query: &'a EventQuery,
        page_token: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<Page<RawEvent>>> {
        Box::pin(self.events_page(query, page_token))
    }
}

fn event_query_params(query: &EventQuery, page_token: Option<&str>) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("timeMin", query.time_min.clone()),
        ("timeMax", query.time_max.clone()),
        ("singleEvents", query.single_events.to_string()),
        ("timeZone", query.time_zone.clone()),
    ];
    if query.order_by_start_time {
        params.push(("orderBy", "startTime".to_string()));
    }
    if let Some(token) = page_token {
        params.push(("pageToken", token.to_string()));
    }
    params
}

/// Converts a Google Calendar API event to a RawEvent.
///
/// Unparseable timestamps are logged and left empty so the event is dropped
/// from the report as a whole.
fn convert_event(event: ApiEvent) -> Option<RawEvent> {
    // Skip cancelled events
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let label = event.id.clone().unwrap_or_else(|| "<no id>".to_string());
    let start = convert_time(event.start.as_ref(), &label, "start");
    let end = convert_time(event.end.as_ref(), &label, "end");

    Some(RawEvent {
        id: event.id,
        summary: event.summary,
        start,
        end,
    })
}

fn convert_time(time: Option<&ApiEventTime>, event_id: &str, which: &str) -> Option<EventTime> {
    let time = time?;
    match (&time.date_time, &time.date) {
        (Some(dt), _) => EventTime::parse_date_time(dt)
            .map_err(|e| warn!("event {}: failed to parse {} time {:?}: {}", event_id, which, dt, e))
            .ok(),
        (None, Some(date)) => EventTime::parse_date(date)
            .map_err(|e| warn!("event {}: failed to parse {} date {:?}: {}", event_id, which, date, e))
            .ok(),
        (None, None) => {
            warn!("event {} has no {} time", event_id, which);
            None
        }
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
    status: Option<String>,
}

/// Event time from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

/// A calendar from the calendar list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListEntry {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    summary_override: Option<String>,
}

impl From<CalendarListEntry> for CalendarSummary {
    fn from(entry: CalendarListEntry) -> Self {
        let summary = CalendarSummary::new(entry.id, entry.summary.unwrap_or_default());
        match entry.summary_override {
            Some(name) => summary.with_override(name),
            None => summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caldump_core::{RangeAnchor, ReportZone, YearRange};

    #[test]
    fn parse_event_list_response() {
        let json = r#"{
            "kind": "calendar#events",
            "items": [
                {
                    "id": "event1",
                    "summary": "Test Meeting",
                    "start": {
                        "dateTime": "2024-03-15T10:00:00-04:00",
                        "timeZone": "America/New_York"
                    },
                    "end": {
                        "dateTime": "2024-03-15T11:00:00-04:00"
                    },
                    "status": "confirmed"
                }
            ],
            "nextPageToken": "CiAKGjBpNDd2Nmp2Zml2cXRwYjBpOXA"
        }"#;

        let response: EventListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(
            response.next_page_token.as_deref(),
            Some("CiAKGjBpNDd2Nmp2Zml2cXRwYjBpOXA")
        );

        let raw = convert_event(response.items.into_iter().next().unwrap()).unwrap();
        assert_eq!(raw.summary.as_deref(), Some("Test Meeting"));
        let start = raw.start.unwrap();
        assert_eq!(start.as_datetime().unwrap().to_rfc3339(), "2024-03-15T10:00:00-04:00");
    }

    #[test]
    fn parse_all_day_event() {
        let json = r#"{
            "id": "event1",
            "summary": "All Day Event",
            "start": {
                "date": "2024-03-15"
            },
            "end": {
                "date": "2024-03-16"
            }
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let raw = convert_event(event).unwrap();
        assert!(raw.start.unwrap().is_all_day());
    }

    #[test]
    fn bad_timestamp_leaves_the_boundary_empty() {
        let json = r#"{
            "id": "event1",
            "summary": "Broken",
            "start": { "dateTime": "yesterday-ish" },
            "end": { "dateTime": "2024-03-15T11:00:00Z" }
        }"#;

        let raw = convert_event(serde_json::from_str(json).unwrap()).unwrap();
        assert!(raw.start.is_none());
        assert!(raw.end.is_some());
    }

    #[test]
    fn event_without_summary_or_times() {
        let raw = convert_event(serde_json::from_str(r#"{"id": "x"}"#).unwrap()).unwrap();
        assert!(raw.summary.is_none());
        assert!(raw.start.is_none());
        assert!(raw.end.is_none());
    }

    #[test]
    fn cancelled_events_are_skipped() {
        let json = r#"{"id": "x", "status": "cancelled"}"#;
        assert!(convert_event(serde_json::from_str(json).unwrap()).is_none());
    }

    #[test]
    fn parse_calendar_list() {
        let json = r#"{
            "items": [
                {
                    "id": "me@example.com",
                    "summary": "me@example.com",
                    "primary": true,
                    "timeZone": "America/New_York"
                },
                {
                    "id": "abc@group.calendar.google.com",
                    "summary": "Team",
                    "summaryOverride": "Work"
                }
            ],
            "nextPageToken": "next"
        }"#;

        let response: CalendarListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.next_page_token.as_deref(), Some("next"));

        let calendars: Vec<CalendarSummary> =
            response.items.into_iter().map(CalendarSummary::from).collect();
        assert_eq!(calendars[0].display_name(), "me@example.com");
        assert_eq!(calendars[1].display_name(), "Work");
        assert_eq!(calendars[1].name, "Team");
    }

    #[test]
    fn calendar_without_summary() {
        let entry: CalendarListEntry = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        let summary = CalendarSummary::from(entry);
        assert_eq!(summary.display_name(), "");
    }

    #[test]
    fn query_params() {
        let zone = ReportZone::default();
        let range = YearRange::new(2023, &zone, RangeAnchor::Zone).unwrap();
        let query = EventQuery::for_year("work@example.com", &range, &zone);

        let params = event_query_params(&query, Some("tok"));
        assert_eq!(
            params,
            vec![
                ("timeMin", "2023-01-01T00:00:00-05:00".to_string()),
                ("timeMax", "2023-12-31T23:59:59-05:00".to_string()),
                ("singleEvents", "true".to_string()),
                ("timeZone", "America/New_York".to_string()),
                ("orderBy", "startTime".to_string()),
                ("pageToken", "tok".to_string()),
            ]
        );

        let first = event_query_params(&query, None);
        assert!(first.iter().all(|(k, _)| *k != "pageToken"));
    }
}
