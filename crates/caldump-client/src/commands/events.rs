//! `caldump events`: dump one calendar's events for a year as TSV.

use std::io::Write;

use caldump_core::{ReportStats, YearRange, qualifying_events, resolve_calendar, write_report};
use caldump_providers::{CalendarApi, EventQuery, fetch_all_events, list_all_calendars};
use tracing::{debug, info};

use crate::config::ReportSettings;
use crate::error::{ClientError, ClientResult};

/// Resolves `calendar_name`, fetches every event of `year` and writes the
/// report.
///
/// Nothing is written unless all pages were fetched.
pub async fn dump(
    api: &dyn CalendarApi,
    calendar_name: &str,
    year: i32,
    settings: &ReportSettings,
    out: &mut impl Write,
) -> ClientResult<ReportStats> {
    let calendars = list_all_calendars(api).await?;
    let calendar = resolve_calendar(&calendars, calendar_name)
        .ok_or_else(|| ClientError::UnknownCalendar(calendar_name.to_string()))?;
    debug!("{:?} resolved to calendar {}", calendar_name, calendar.id);

    let range = YearRange::new(year, &settings.time_zone, settings.range)?;
    let query = EventQuery::for_year(calendar.id.clone(), &range, &settings.time_zone);

    let raw = fetch_all_events(api, &query).await?;
    let events = qualifying_events(&raw);
    info!("{} of {} events qualify", events.len(), raw.len());

    let stats = write_report(out, events)?;
    out.flush()?;
    Ok(stats)
}
