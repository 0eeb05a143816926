//! strata
//!
//! Operator console for schema migrations.
//!
//! ## Usage
//!
//! ```bash
//! strata create CreateUsers
//! strata migrate
//! strata migrate --to 20190101000000
//! strata rollback
//! strata rollback --to 0
//! strata status
//! strata schema dump users
//! strata schema load
//! ```
//!
//! Connection settings come from `strata.toml` (see `--config`) or
//! `DATABASE_URL`. Logs go to stderr; `RUST_LOG` overrides `-v`.

mod cli;
mod commands;
mod output;
mod settings;

use clap::Parser;
use console::style;
use std::process;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use settings::Settings;

fn init_logging(verbosity: u8) {
	let level = match verbosity {
		0 => "warn",
		1 => "info",
		_ => "debug",
	};
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("strata_db={level},strata={level}")));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	init_logging(cli.verbosity);

	let result = match Settings::load(&cli.config, cli.database_url.as_deref()) {
		Ok(settings) => commands::execute(cli.command, &settings).await,
		Err(e) => Err(e),
	};

	match result {
		Ok(true) => {}
		Ok(false) => process::exit(1),
		Err(e) => {
			eprintln!("{} {:#}", style("Error:").red().bold(), e);
			process::exit(1);
		}
	}
}
