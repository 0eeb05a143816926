//! Command-line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// strata migration console
#[derive(Debug, Parser)]
#[command(name = "strata")]
#[command(about = "Schema migrations for MySQL and PostgreSQL", long_about = None)]
#[command(version)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Commands,

	/// Configuration file
	#[arg(short, long, global = true, default_value = "strata.toml", value_name = "FILE")]
	pub config: PathBuf,

	/// Connection URL overriding the `[database]` section
	#[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
	pub database_url: Option<String>,

	/// Verbosity level (can be repeated for more output)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbosity: u8,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
	/// Apply pending migrations
	Migrate {
		/// Stop after this version
		#[arg(long, value_name = "VERSION")]
		to: Option<String>,
	},

	/// Roll back applied migrations
	Rollback {
		/// Roll back every unit newer than this version (`0` for all);
		/// without it only the latest unit is rolled back
		#[arg(long, value_name = "VERSION")]
		to: Option<String>,
	},

	/// Show applied and pending migrations
	Status,

	/// Create an empty migration file
	Create {
		/// PascalCase migration name, e.g. CreateUsers
		#[arg(value_name = "NAME")]
		name: String,
	},

	/// Dump or load table snapshots
	Schema {
		#[command(subcommand)]
		action: SchemaAction,
	},
}

#[derive(Debug, Clone, Subcommand)]
pub enum SchemaAction {
	/// Write one snapshot file per table
	Dump {
		/// Tables to dump; all tables when omitted
		#[arg(value_name = "TABLE")]
		tables: Vec<String>,
	},

	/// Create every dumped table that does not exist yet
	Load,
}
