//! Runner behaviour against the in-memory MySQL stand-in

mod common;

use common::FakeMySql;
use rstest::*;
use strata_db::migrations::{
	Direction, Migration, MigrationError, MigrationRunner, RegistrySource, ReverseStatement,
};

fn unit(version: &str, name: &str, body: &str) -> Migration {
	Migration::from_toml(version, name, body).unwrap()
}

fn create_users() -> Migration {
	unit(
		"20190101000000",
		"CreateUsers",
		r#"
[[up]]
op = "create_table"
name = "users"
columns = [
	{ name = "id", type = "primaryKey" },
	{ name = "email", type = "string", limit = 150, nullable = false },
]
"#,
	)
}

fn add_name_to_users() -> Migration {
	unit(
		"20190102000000",
		"AddNameToUsers",
		r#"
[[up]]
op = "add_column"
table = "users"
column = { name = "name", type = "string", nullable = true }
"#,
	)
}

fn runner(fake: &FakeMySql, migrations: Vec<Migration>) -> MigrationRunner<RegistrySource> {
	MigrationRunner::new(fake.connection(), RegistrySource::new(migrations))
}

#[fixture]
fn fake() -> FakeMySql {
	FakeMySql::new()
}

#[rstest]
#[tokio::test]
async fn test_migrate_applies_units_in_order_and_records_them(fake: FakeMySql) {
	// Arrange
	let runner = runner(&fake, vec![create_users(), add_name_to_users()]);

	// Act
	let report = runner.migrate(None).await.unwrap();

	// Assert
	assert_eq!(report.direction, Direction::Up);
	assert!(report.is_success());
	let versions: Vec<_> = report.outcomes().iter().map(|o| o.version.as_str()).collect();
	assert_eq!(versions, vec!["20190101000000", "20190102000000"]);
	assert_eq!(
		report.outcomes()[0].statements,
		vec!["CREATE TABLE users (\nid INT AUTO_INCREMENT PRIMARY KEY,\nemail VARCHAR(150) NOT NULL\n)"]
	);
	assert_eq!(
		report.outcomes()[1].statements,
		vec!["ALTER TABLE users ADD COLUMN name VARCHAR(255) NULL"]
	);
	assert_eq!(
		fake.records(),
		vec![
			("20190101000000".to_string(), "CreateUsers".to_string()),
			("20190102000000".to_string(), "AddNameToUsers".to_string()),
		]
	);
	assert_eq!(fake.columns("users"), vec!["id", "email", "name"]);
}

#[rstest]
#[tokio::test]
async fn test_each_unit_runs_in_its_own_transaction(fake: FakeMySql) {
	// Arrange
	let runner = runner(&fake, vec![create_users(), add_name_to_users()]);
	runner.ensure_tracking_table().await.unwrap();
	fake.clear_log();

	// Act
	runner.migrate(None).await.unwrap();

	// Assert
	let log = fake.log();
	let markers: Vec<_> = log
		.iter()
		.filter(|s| matches!(s.as_str(), "BEGIN" | "COMMIT"))
		.map(String::as_str)
		.collect();
	assert_eq!(markers, vec!["BEGIN", "COMMIT", "BEGIN", "COMMIT"]);
	assert!(log[2].starts_with("INSERT INTO migrations"));
}

#[rstest]
#[tokio::test]
async fn test_tracking_table_is_created_once(fake: FakeMySql) {
	// Arrange
	let runner = runner(&fake, vec![]);

	// Act
	let first = runner.ensure_tracking_table().await.unwrap();
	let second = runner.ensure_tracking_table().await.unwrap();

	// Assert
	assert!(first);
	assert!(!second);
	assert_eq!(fake.columns("migrations"), vec!["id", "version", "name", "rollback"]);
}

#[rstest]
#[tokio::test]
async fn test_order_is_independent_of_discovery(fake: FakeMySql) {
	// Arrange
	let runner = runner(&fake, vec![add_name_to_users(), create_users()]);

	// Act
	let up = runner.migrate(None).await.unwrap();
	let down = runner.rollback(Some("0")).await.unwrap();

	// Assert
	let applied: Vec<_> = up.outcomes().iter().map(|o| o.name.as_str()).collect();
	let reverted: Vec<_> = down.outcomes().iter().map(|o| o.name.as_str()).collect();
	assert_eq!(applied, vec!["CreateUsers", "AddNameToUsers"]);
	assert_eq!(reverted, vec!["AddNameToUsers", "CreateUsers"]);
}

#[rstest]
#[tokio::test]
async fn test_migrate_stops_at_target(fake: FakeMySql) {
	// Arrange
	let runner = runner(&fake, vec![create_users(), add_name_to_users()]);

	// Act
	let report = runner.migrate(Some("20190101000000")).await.unwrap();
	let status = runner.status().await.unwrap();

	// Assert
	assert_eq!(report.outcomes().len(), 1);
	assert_eq!(
		runner.last_migration().await.unwrap().as_deref(),
		Some("20190101000000")
	);
	let pending: Vec<_> = status.pending.iter().map(|m| m.version.as_str()).collect();
	assert_eq!(pending, vec!["20190102000000"]);
}

#[rstest]
#[tokio::test]
async fn test_failing_unit_does_not_stop_the_batch(fake: FakeMySql) {
	// Arrange
	fake.fail_on("broken_table");
	let broken = unit(
		"20190101120000",
		"Broken",
		"[[up]]\nop = \"execute\"\nsql = \"UPDATE broken_table SET a = 1\"\n",
	);
	let runner = runner(&fake, vec![create_users(), broken, add_name_to_users()]);

	// Act
	let report = runner.migrate(None).await.unwrap();

	// Assert
	assert!(!report.is_success());
	let failed: Vec<_> = report.failed().collect();
	assert_eq!(failed.len(), 1);
	let failure = failed[0].failure.as_ref().unwrap();
	assert_eq!(failure.statement.as_deref(), Some("UPDATE broken_table SET a = 1"));
	assert!(matches!(failure.error, MigrationError::DatabaseError(_)));
	assert!(fake.log().contains(&"ROLLBACK".to_string()));

	let recorded: Vec<_> = fake.records().into_iter().map(|(v, _)| v).collect();
	assert_eq!(recorded, vec!["20190101000000", "20190102000000"]);

	let status = runner.status().await.unwrap();
	assert!(status.pending.is_empty());
	let skipped: Vec<_> = status.skipped.iter().map(|m| m.name.as_str()).collect();
	assert_eq!(skipped, vec!["Broken"]);
}

#[rstest]
#[tokio::test]
async fn test_units_older_than_last_applied_are_not_applied(fake: FakeMySql) {
	// Arrange
	let create_posts = || {
		unit(
			"20190105000000",
			"CreatePosts",
			"[[up]]\nop = \"create_table\"\nname = \"posts\"\ncolumns = [{ name = \"id\", type = \"primaryKey\" }]\n",
		)
	};
	runner(&fake, vec![create_posts()]).migrate(None).await.unwrap();
	let runner = runner(&fake, vec![create_users(), create_posts()]);

	// Act
	let report = runner.migrate(None).await.unwrap();
	let status = runner.status().await.unwrap();

	// Assert
	assert!(report.is_empty());
	assert_eq!(
		runner.last_migration().await.unwrap().as_deref(),
		Some("20190105000000")
	);
	assert_eq!(
		fake.records(),
		vec![("20190105000000".to_string(), "CreatePosts".to_string())]
	);
	assert_eq!(fake.tables(), vec!["migrations", "posts"]);
	assert!(status.pending.is_empty());
	let skipped: Vec<_> = status.skipped.iter().map(|m| m.version.as_str()).collect();
	assert_eq!(skipped, vec!["20190101000000"]);
}

#[rstest]
#[tokio::test]
async fn test_rollback_defaults_to_latest_unit(fake: FakeMySql) {
	// Arrange
	let runner = runner(&fake, vec![create_users(), add_name_to_users()]);
	runner.migrate(None).await.unwrap();

	// Act
	let report = runner.rollback(None).await.unwrap();

	// Assert
	assert_eq!(report.direction, Direction::Down);
	assert_eq!(report.outcomes().len(), 1);
	assert_eq!(
		report.outcomes()[0].statements,
		vec!["ALTER TABLE users DROP COLUMN name"]
	);
	assert_eq!(fake.columns("users"), vec!["id", "email"]);
	assert_eq!(fake.records().len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_stored_rollback_undoes_later_operations_first(fake: FakeMySql) {
	// Arrange
	let both = unit(
		"20190101000000",
		"CreateTags",
		r#"
[[up]]
op = "create_table"
name = "tags"
columns = [{ name = "id", type = "primaryKey" }]

[[up]]
op = "add_index"
table = "tags"
columns = ["id"]
unique = true
"#,
	);
	let runner = runner(&fake, vec![both]);

	// Act
	runner.migrate(None).await.unwrap();

	// Assert
	let stored: Vec<ReverseStatement> =
		serde_json::from_str(&fake.rollback_json("20190101000000").unwrap()).unwrap();
	assert_eq!(
		stored,
		vec![
			ReverseStatement::Sql("DROP INDEX idx_tags_id ON tags".to_string()),
			ReverseStatement::Sql("DROP TABLE tags".to_string()),
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_raw_sql_without_reverse_is_irreversible(fake: FakeMySql) {
	// Arrange
	let backfill = unit(
		"20190101000000",
		"Backfill",
		"[[up]]\nop = \"execute\"\nsql = \"UPDATE users SET active = 1\"\n",
	);
	let runner = runner(&fake, vec![backfill]);
	let applied = runner.migrate(None).await.unwrap();
	fake.clear_log();

	// Act
	let report = runner.rollback(None).await.unwrap();

	// Assert
	assert!(applied.is_success());
	let failure = report.outcomes()[0].failure.as_ref().unwrap();
	match &failure.error {
		MigrationError::IrreversibleOperation { version, statement } => {
			assert_eq!(version, "20190101000000");
			assert_eq!(statement, "UPDATE users SET active = 1");
		}
		other => panic!("expected an irreversible operation, got {other:?}"),
	}
	assert!(fake.log().is_empty());
	assert_eq!(fake.records().len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_explicit_down_is_preferred(fake: FakeMySql) {
	// Arrange
	let toggle = unit(
		"20190101000000",
		"Activate",
		r#"
[[up]]
op = "execute"
sql = "UPDATE users SET active = 1"

[[down]]
op = "execute"
sql = "UPDATE users SET active = 0"
"#,
	);
	let runner = runner(&fake, vec![toggle]);
	runner.migrate(None).await.unwrap();

	// Act
	let report = runner.rollback(None).await.unwrap();

	// Assert
	assert!(report.is_success());
	assert_eq!(
		report.outcomes()[0].statements,
		vec!["UPDATE users SET active = 0"]
	);
	assert!(fake.records().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_dropped_table_is_recreated_on_rollback(fake: FakeMySql) {
	// Arrange
	fake.seed_table(
		"legacy",
		&[
			"id INT AUTO_INCREMENT PRIMARY KEY",
			"title VARCHAR(80) DEFAULT 'x' NOT NULL",
		],
	);
	let drop = unit(
		"20190101000000",
		"DropLegacy",
		"[[up]]\nop = \"drop_table\"\nname = \"legacy\"\n",
	);
	let runner = runner(&fake, vec![drop]);
	runner.migrate(None).await.unwrap();
	assert!(!fake.tables().contains(&"legacy".to_string()));

	// Act
	let report = runner.rollback(None).await.unwrap();

	// Assert
	assert_eq!(
		report.outcomes()[0].statements,
		vec!["CREATE TABLE legacy (\nid INT AUTO_INCREMENT PRIMARY KEY,\ntitle VARCHAR(80) DEFAULT 'x' NOT NULL\n)"]
	);
	assert_eq!(fake.columns("legacy"), vec!["id", "title"]);
}

#[rstest]
#[tokio::test]
async fn test_migrate_then_rollback_restores_schema(fake: FakeMySql) {
	// Arrange
	let migrations = vec![
		create_users(),
		add_name_to_users(),
		unit(
			"20190103000000",
			"IndexEmail",
			"[[up]]\nop = \"add_index\"\ntable = \"users\"\ncolumns = [\"email\"]\nunique = true\n",
		),
		unit(
			"20190104000000",
			"ShortenName",
			r#"
[[up]]
op = "change_column"
table = "users"
column = { name = "name", type = "string", limit = 100, nullable = false }
"#,
		),
		unit(
			"20190105000000",
			"RemoveName",
			"[[up]]\nop = \"remove_columns\"\ntable = \"users\"\ncolumns = [\"name\"]\n",
		),
	];
	let runner = runner(&fake, migrations);
	runner.ensure_tracking_table().await.unwrap();
	let tables_before = fake.tables();

	// Act
	let up = runner.migrate(None).await.unwrap();
	let columns_after_up = fake.columns("users");
	let down = runner.rollback(Some("0")).await.unwrap();

	// Assert
	assert!(up.is_success());
	assert!(down.is_success());
	assert_eq!(columns_after_up, vec!["id", "email"]);
	assert_eq!(
		down.outcomes()[0].statements,
		vec!["ALTER TABLE users ADD COLUMN name VARCHAR(100) NOT NULL"]
	);
	assert_eq!(
		down.outcomes()[1].statements,
		vec!["ALTER TABLE users MODIFY COLUMN name VARCHAR(255) NULL"]
	);
	assert_eq!(fake.tables(), tables_before);
	assert!(fake.records().is_empty());
}

#[rstest]
#[case("latest")]
#[case("2019")]
#[tokio::test]
async fn test_invalid_target_is_rejected(fake: FakeMySql, #[case] target: &str) {
	let runner = runner(&fake, vec![create_users()]);
	let result = runner.migrate(Some(target)).await;
	assert!(matches!(result, Err(MigrationError::InvalidMigration(_))));
}
