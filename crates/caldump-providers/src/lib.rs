//! Calendar provider access for caldump.
//!
//! - [`CalendarApi`] - The read-only seam the commands are written against
//! - [`list_all_calendars`] / [`fetch_all_events`] - Pagination helpers
//! - [`google`] - Google Calendar client, OAuth flows, credential storage and
//!   the session manager
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │ CredentialStore │◀────│  SessionManager  │──▶ Authorizer (loopback / device)
//! └─────────────────┘     └────────┬─────────┘
//!                                  │ access token
//!                                  ▼
//!                       ┌──────────────────────┐
//!                       │ GoogleCalendarClient │
//!                       └──────────┬───────────┘
//!                                  │ CalendarApi
//!                                  ▼
//!                   CalendarSummary / RawEvent pages
//! ```

pub mod api;
pub mod error;
pub mod google;

// Re-export main types at crate root
pub use api::{BoxFuture, CalendarApi, EventQuery, Page, fetch_all_events, list_all_calendars};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
