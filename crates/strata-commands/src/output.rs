//! Console rendering of runner results

use console::style;
use std::time::Duration;
use strata_db::migrations::{Direction, MigrationReport, MigrationStatus, UnitOutcome};

fn seconds(elapsed: Duration) -> String {
	format!("{:.4}s", elapsed.as_secs_f64())
}

fn unit_lines(direction: Direction, outcome: &UnitOutcome) -> Vec<String> {
	let verb = match direction {
		Direction::Up => "migrating",
		Direction::Down => "reverting",
	};
	let mut lines = vec![format!(
		"== {} {}: {}",
		style(&outcome.version).bold(),
		outcome.name,
		verb
	)];
	lines.extend(
		outcome
			.statements
			.iter()
			.map(|statement| format!("   {}", style(statement).dim())),
	);

	match &outcome.failure {
		None => lines.push(format!(
			"== {} {}: {} ({})",
			outcome.version,
			outcome.name,
			style("ok").green().bold(),
			seconds(outcome.elapsed)
		)),
		Some(failure) => {
			lines.push(format!(
				"== {} {}: {} {}",
				outcome.version,
				outcome.name,
				style("failed").red().bold(),
				failure.error
			));
			if let Some(statement) = &failure.statement {
				lines.push(format!("   {} {}", style("while executing").red(), statement));
			}
		}
	}
	lines
}

/// Lines describing a `migrate` or `rollback` batch
pub fn report_lines(report: &MigrationReport) -> Vec<String> {
	if report.is_empty() {
		let message = match report.direction {
			Direction::Up => "Nothing to migrate",
			Direction::Down => "Nothing to roll back",
		};
		return vec![style(message).dim().to_string()];
	}

	let mut lines = Vec::new();
	for outcome in report.outcomes() {
		lines.extend(unit_lines(report.direction, outcome));
	}
	let failed = report.failed().count();
	let summary = format!(
		"{} unit(s), {} failed, finished in {}",
		report.outcomes().len(),
		failed,
		seconds(report.elapsed)
	);
	lines.push(if failed == 0 {
		style(summary).green().to_string()
	} else {
		style(summary).red().to_string()
	});
	lines
}

/// Lines listing applied, skipped and pending units
pub fn status_lines(status: &MigrationStatus) -> Vec<String> {
	let mut lines = Vec::new();
	for record in &status.applied {
		lines.push(format!(
			"  {}  {} {}",
			style("up").green().bold(),
			record.version,
			record.name
		));
	}
	for migration in &status.skipped {
		lines.push(format!(
			"  {}  {} {} (older than {})",
			style("skip").red().bold(),
			migration.version,
			migration.name,
			status.last_applied().unwrap_or_default()
		));
	}
	for migration in &status.pending {
		lines.push(format!(
			"  {}  {} {}",
			style("down").yellow().bold(),
			migration.version,
			migration.name
		));
	}
	if lines.is_empty() {
		lines.push(style("No migrations").dim().to_string());
	}
	lines
}

pub fn print_lines(lines: &[String]) {
	for line in lines {
		println!("{}", line);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use strata_db::migrations::{Migration, MigrationError, MigrationRecord, UnitFailure};

	fn outcome(version: &str, failure: Option<UnitFailure>) -> UnitOutcome {
		UnitOutcome {
			version: version.to_string(),
			name: "CreateUsers".to_string(),
			statements: vec!["CREATE TABLE users (\nid INT\n)".to_string()],
			failure,
			elapsed: Duration::from_millis(5),
		}
	}

	#[rstest]
	fn test_report_lines_show_statements_and_summary() {
		// Arrange
		console::set_colors_enabled(false);
		let report = MigrationReport {
			direction: Direction::Up,
			outcomes: vec![
				outcome("20190101000000", None),
				outcome(
					"20190102000000",
					Some(UnitFailure {
						statement: Some("ALTER TABLE users ADD COLUMN x".to_string()),
						error: MigrationError::InvalidMigration("boom".to_string()),
					}),
				),
			],
			elapsed: Duration::from_millis(10),
		};

		// Act
		let lines = report_lines(&report);

		// Assert
		assert_eq!(lines[0], "== 20190101000000 CreateUsers: migrating");
		assert!(lines[1].contains("CREATE TABLE users"));
		assert_eq!(lines[2], "== 20190101000000 CreateUsers: ok (0.0050s)");
		assert_eq!(
			lines[5],
			"== 20190102000000 CreateUsers: failed Invalid migration: boom"
		);
		assert_eq!(lines[6], "   while executing ALTER TABLE users ADD COLUMN x");
		assert_eq!(lines[7], "2 unit(s), 1 failed, finished in 0.0100s");
	}

	#[rstest]
	#[case::up(Direction::Up, "Nothing to migrate")]
	#[case::down(Direction::Down, "Nothing to roll back")]
	fn test_empty_report(#[case] direction: Direction, #[case] expected: &str) {
		console::set_colors_enabled(false);
		let report = MigrationReport {
			direction,
			outcomes: vec![],
			elapsed: Duration::ZERO,
		};

		assert_eq!(report_lines(&report), vec![expected.to_string()]);
	}

	#[rstest]
	fn test_status_lines() {
		// Arrange
		console::set_colors_enabled(false);
		let status = MigrationStatus {
			applied: vec![MigrationRecord {
				version: "20190101000000".to_string(),
				name: "CreateUsers".to_string(),
				rollback: "[]".to_string(),
			}],
			pending: vec![Migration::new("20190102000000", "AddEmail").unwrap()],
			skipped: vec![Migration::new("20181231000000", "CreateTags").unwrap()],
		};

		// Act
		let lines = status_lines(&status);

		// Assert
		assert_eq!(
			lines,
			vec![
				"  up  20190101000000 CreateUsers",
				"  skip  20181231000000 CreateTags (older than 20190101000000)",
				"  down  20190102000000 AddEmail",
			]
		);
	}
}
