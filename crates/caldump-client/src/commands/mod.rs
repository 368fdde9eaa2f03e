//! Subcommand implementations.
//!
//! Commands write to any `io::Write` and read through `&dyn CalendarApi`, so
//! they run the same against Google and against test fakes.

pub mod auth;
pub mod calendars;
pub mod config;
pub mod events;

#[cfg(test)]
pub(crate) mod testing;
