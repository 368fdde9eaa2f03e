//! Core types: year ranges, event records, TSV report rendering

pub mod event;
pub mod report;
pub mod time;
pub mod tracing;

pub use event::{qualifying_events, resolve_calendar, CalendarSummary, EventRecord, RawEvent};
pub use report::{format_duration, format_row, format_timestamp, write_report, ReportStats};
pub use time::{EventTime, RangeAnchor, ReportZone, TimeError, YearRange, DEFAULT_ZONE};
pub use tracing::{init_tracing, TracingConfig, TracingError};
