//! Subcommand execution

use anyhow::Context;
use console::style;
use strata_db::backends::{DatabaseConnection, SchemaIntrospector, editor_for, introspector_for};
use strata_db::migrations::source::filesystem::create_migration_file;
use strata_db::migrations::{FilesystemSource, MigrationRunner, MigrationStatus, schema_dump};

use crate::cli::{Commands, SchemaAction};
use crate::output::{print_lines, report_lines, status_lines};
use crate::settings::Settings;

/// Whether the command finished without a failed unit
pub type Success = bool;

pub async fn execute(command: Commands, settings: &Settings) -> anyhow::Result<Success> {
	match command {
		Commands::Create { name } => create(&name, settings),
		Commands::Migrate { to } => {
			let runner = runner(settings).await?;
			let report = runner.migrate(to.as_deref()).await?;
			print_lines(&report_lines(&report));
			Ok(report.is_success())
		}
		Commands::Rollback { to } => {
			let runner = runner(settings).await?;
			let report = runner.rollback(to.as_deref()).await?;
			print_lines(&report_lines(&report));
			Ok(report.is_success())
		}
		Commands::Status => {
			let runner = runner(settings).await?;
			let status: MigrationStatus = runner.status().await?;
			print_lines(&status_lines(&status));
			Ok(true)
		}
		Commands::Schema { action } => match action {
			SchemaAction::Dump { tables } => dump(tables, settings).await,
			SchemaAction::Load => load(settings).await,
		},
	}
}

fn create(name: &str, settings: &Settings) -> anyhow::Result<Success> {
	let path = create_migration_file(&settings.migrations.directory, name, chrono::Utc::now())?;
	println!("{} {}", style("Created").green().bold(), path.display());
	Ok(true)
}

async fn connect(settings: &Settings) -> anyhow::Result<DatabaseConnection> {
	let config = settings.database()?;
	let connection = DatabaseConnection::connect(config)
		.await
		.with_context(|| format!("Failed to connect to {} database {}", config.database_type(), config.database))?;
	tracing::debug!(database_type = ?connection.database_type(), "connected");
	Ok(connection)
}

async fn runner(settings: &Settings) -> anyhow::Result<MigrationRunner<FilesystemSource>> {
	let connection = connect(settings).await?;
	let mut runner = MigrationRunner::new(connection, FilesystemSource::new(&settings.migrations.directory))
		.with_tracking_table(settings.migrations.table.clone())?;
	if let Some(options) = settings.database()?.table_options.as_deref() {
		runner = runner.with_table_options(options);
	}
	Ok(runner)
}

async fn dump(tables: Vec<String>, settings: &Settings) -> anyhow::Result<Success> {
	let mut connection = connect(settings).await?;
	let introspector = introspector_for(connection.database_type());
	let tables = if tables.is_empty() {
		introspector
			.list_tables(&mut connection)
			.await?
			.into_iter()
			.filter(|table| *table != settings.migrations.table)
			.collect()
	} else {
		tables
	};

	for table in &tables {
		let snapshot = introspector.describe(&mut connection, table).await?;
		if snapshot.is_empty() {
			println!("{} {} does not exist", style("Skipped").yellow().bold(), table);
			continue;
		}
		let path = schema_dump::write_table(&settings.migrations.schema_directory, table, &snapshot)?;
		println!("{} {}", style("Dumped").green().bold(), path.display());
	}
	Ok(true)
}

async fn load(settings: &Settings) -> anyhow::Result<Success> {
	let mut connection = connect(settings).await?;
	let database_type = connection.database_type();
	let introspector: Box<dyn SchemaIntrospector> = introspector_for(database_type);
	let editor = editor_for(database_type);
	let table_options = settings.database()?.table_options.clone();

	for (table, snapshot) in schema_dump::load_directory(&settings.migrations.schema_directory)? {
		if introspector.table_exists(&mut connection, &table).await? {
			println!("{} {} already exists", style("Skipped").dim(), table);
			continue;
		}
		let mut definition = snapshot.to_table_definition(&table);
		if let Some(options) = &table_options {
			definition = definition.with_options(options.clone());
		}
		let sql = editor.create_table_sql(&definition)?;
		tracing::info!(table = %table, "creating table from snapshot");
		println!("   {}", style(&sql).dim());
		connection.execute(&sql, vec![]).await?;
		println!("{} {}", style("Created").green().bold(), table);
	}
	Ok(true)
}
