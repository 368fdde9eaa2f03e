//! Command dispatch and the mapping from outcomes to exit statuses.

use std::io::Write;

use caldump_providers::google::SessionManager;
use chrono::Datelike;
use tracing::{debug, warn};

use crate::cli::{Cli, Command, ConfigAction};
use crate::commands;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::build_manager;

/// Exit status for a completed run.
pub const EXIT_OK: u8 = 0;

/// Exit status for any failure.
pub const EXIT_FAILURE: u8 = 1;

/// Runs the parsed command line, writing command output to `out`.
pub async fn run(cli: Cli, out: &mut impl Write) -> ClientResult<()> {
    let Some(command) = cli.command else {
        writeln!(out, "no command was given")?;
        return Ok(());
    };

    let config = ClientConfig::load(cli.config.as_deref())?;

    match command {
        Command::Config { action } => {
            let path = cli.config.unwrap_or_else(ClientConfig::default_path);
            match action {
                ConfigAction::Dump => commands::config::dump(&config, &path, out),
                ConfigAction::Path => commands::config::path(&path, out),
            }
        }
        Command::Auth { force } => {
            let google = config.google_config()?;
            let manager = build_manager(&config, &google, force)?;
            commands::auth::run(&manager, out).await.map(|_| ())
        }
        Command::Calendars => {
            let google = config.google_config()?;
            let manager = build_manager(&config, &google, false)?;
            let client = manager.authenticated_client(&google).await?;
            let result = commands::calendars::list(&client, out).await;
            forget_rejected_token(&manager, result)
        }
        Command::Events {
            calendar_name,
            year,
        } => {
            let year = year.unwrap_or_else(|| chrono::Local::now().year());
            let google = config.google_config()?;
            let manager = build_manager(&config, &google, false)?;
            let client = manager.authenticated_client(&google).await?;
            let result =
                commands::events::dump(&client, &calendar_name, year, &config.report, out).await;
            forget_rejected_token(&manager, result.map(|_| ()))
        }
    }
}

/// Reports the outcome of [`run`] and returns the process exit status.
///
/// Authentication failures and unknown calendars are part of the normal
/// output on `out`; anything else is an error on `err`.
pub fn finish(result: ClientResult<()>, out: &mut impl Write, err: &mut impl Write) -> u8 {
    let Err(e) = result else {
        return EXIT_OK;
    };

    // A closed stdout or stderr leaves nothing to report to.
    let _ = match e {
        e if e.is_authentication() => {
            debug!("{}", e);
            writeln!(out, "Authentication failed.")
        }
        ClientError::UnknownCalendar(name) => {
            debug!(calendar = %name, "no calendar matched");
            writeln!(out, "Unknown calendar")
        }
        e => writeln!(err, "error: {}", e),
    };
    EXIT_FAILURE
}

/// Marks the stored token invalid when the API refused it, so the next run
/// goes through the authorization flow instead of reusing it.
fn forget_rejected_token(manager: &SessionManager, result: ClientResult<()>) -> ClientResult<()> {
    if let Err(e) = &result
        && e.is_authentication()
        && let Err(store_err) = manager.invalidate_token()
    {
        warn!("could not mark the token invalid: {}", store_err);
    }
    result
}
