//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CONFIG_ENV;

/// caldump - dump Google Calendar events as a tab-separated report
#[derive(Debug, Parser)]
#[command(name = "caldump")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the calendars of the account
    #[command(visible_alias = "c")]
    Calendars,

    /// Print the timed events of a calendar for one year
    #[command(visible_alias = "e")]
    Events {
        /// Calendar name, override name or id
        calendar_name: String,

        /// Year to report, defaults to the current year
        year: Option<i32>,
    },

    /// Check the stored token or obtain a new one
    #[command(visible_alias = "a")]
    Auth {
        /// Run the authorization flow even if the stored token is usable
        #[arg(long, short)]
        force: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn aliases() {
        let cli = Cli::try_parse_from(["caldump", "e", "Work", "2023"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Events { ref calendar_name, year: Some(2023) }) if calendar_name == "Work"
        ));

        let cli = Cli::try_parse_from(["caldump", "c"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Calendars)));
    }

    #[test]
    fn year_is_optional() {
        let cli = Cli::try_parse_from(["caldump", "events", "Work"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Events { year: None, .. })));
    }

    #[test]
    fn no_command() {
        let cli = Cli::try_parse_from(["caldump", "-v"]).unwrap();
        assert!(cli.debug);
        assert!(cli.command.is_none());
    }

    #[test]
    fn unknown_command_is_an_invalid_subcommand() {
        let err = Cli::try_parse_from(["caldump", "frobnicate"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }
}
