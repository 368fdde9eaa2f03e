//! caldump CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

use caldump_client::app;
use caldump_client::cli::Cli;
use caldump_core::tracing::{TracingConfig, init_tracing};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.kind() == ErrorKind::InvalidSubcommand => {
            println!("{}", e.render());
            return ExitCode::SUCCESS;
        }
        Err(e) => e.exit(),
    };

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    let mut stdout = std::io::stdout();
    let result = app::run(cli, &mut stdout).await;
    ExitCode::from(app::finish(result, &mut stdout, &mut std::io::stderr()))
}
