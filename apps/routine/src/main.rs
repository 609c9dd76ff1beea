//! # Routine
//!
//! Manage reusable steps, ordered groups of steps, and the fixed recurring
//! systems (Daily, Saturday, Sunday, Weekly, Monthly) built from them.
//!
//! ## Usage
//!
//! ```bash
//! routine init
//! routine steps add "Brush teeth" --time 3
//! routine groups add "Morning" --steps 1,2
//! routine system set Daily group-1 step-4
//! routine status
//! ```

use clap::Parser;
use routine::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // ROUTINE_LOG_FORMAT=json enables machine-parseable logs. Logs go to
    // stderr so `--json-mode` output on stdout stays clean.
    let log_format = std::env::var("ROUTINE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_level = if cli.verbose {
        "routine=debug"
    } else if cli.quiet {
        "routine=warn"
    } else {
        "routine=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_level.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
