//! Roster CLI - command-line client for the Roster backend
//!
//! Entry point: parses arguments, loads configuration, sets up logging and
//! dispatches to the subcommand handlers.

mod auth;
mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use handlers::{Session, SessionOptions};
use logging::{timing::Timer, LogSettings};
use output::OutputWriter;
use std::process;
use tracing::instrument;

#[tokio::main]
async fn main() {
    // A missing .env is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    control::set_override(cli.use_color());

    let result = match Config::load_with_file(cli.config.as_deref()) {
        Ok(config) => {
            if let Err(e) = init_logging(&cli, &config) {
                eprintln!("Failed to initialize logging: {}", e);
            }
            run(cli, config).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));

            if e.should_show_help() {
                eprintln!("\nFor more information, try '--help'");
            }

            process::exit(e.exit_code());
        }
    }
}

/// Main application logic
#[instrument(skip(cli, config), fields(command = ?cli.command))]
async fn run(cli: Cli, config: Config) -> Result<()> {
    let _timer = Timer::new("cli_execution");

    let mut output = OutputWriter::new(cli.output, cli.use_color(), cli.quiet);
    let session_options = SessionOptions {
        base_url: cli.base_url.as_deref(),
        token: cli.token.as_deref(),
        debug: cli.debug,
    };

    tracing::info!(verbosity = cli.verbosity_level(), "executing command");

    match cli.command {
        Commands::Me(args) => {
            let session = Session::open(session_options, &config)?;
            handlers::handle_me(args, session, &mut output).await
        }
        Commands::Request(args) => {
            let session = Session::open(session_options, &config)?;
            handlers::handle_request(args, session, &mut output).await
        }
        Commands::Config(args) => {
            handlers::handle_config(args, &config, cli.config.as_deref(), &mut output).await
        }
        Commands::Completions(args) => handlers::handle_completions(args),
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let mut settings = LogSettings::from_verbosity(cli.verbosity_level());
    settings.merge_with_file(&config.logging);
    settings.merge_with_env();

    if cli.quiet {
        settings.level = "error".to_string();
    }

    logging::init_logging(settings)
}
