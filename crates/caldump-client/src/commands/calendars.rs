//! `caldump calendars`: list the calendars visible to the user.

use std::io::Write;

use caldump_providers::{CalendarApi, list_all_calendars};

use crate::error::ClientResult;

/// Prints `<display name> (<id>)` for every calendar, in provider order.
pub async fn list(api: &dyn CalendarApi, out: &mut impl Write) -> ClientResult<()> {
    for calendar in list_all_calendars(api).await? {
        writeln!(out, "{} ({})", calendar.display_name(), calendar.id)?;
    }
    Ok(())
}
