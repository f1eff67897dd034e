//! SQLite schema creation and migration.
//!
//! Migrations are a fixed, ordered list of SQL files. They are re-applied on
//! every start; there is no version table. Statements are idempotent either
//! structurally (`IF NOT EXISTS`) or through a condition marker:
//!
//! ```sql
//! -- condition: SELECT EXISTS(...) condition --
//! CREATE INDEX city_country_idx ON city(country_idx);
//! ```
//!
//! When the condition query returns true the statement is skipped.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to read migration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{file} #{statement}: condition query failed: {source}")]
    Condition {
        file: String,
        statement: usize,
        #[source]
        source: rusqlite::Error,
    },
    #[error("{file} #{statement}: {source}")]
    Statement {
        file: String,
        statement: usize,
        #[source]
        source: rusqlite::Error,
    },
}

/// Migration files, in application order.
pub const MIGRATION_FILES: [&str; 3] = [
    "01-create-table.sql",
    "02-create-trigger.sql",
    "03-create-index.sql",
];

/// Files applied as one batch instead of being split on `;`.
pub const WHOLE_FILE_MIGRATIONS: &[&str] = &["02-create-trigger.sql"];

const CONDITION_START: &str = "-- condition:";
const CONDITION_END: &str = "condition --";

const EMBEDDED: [&str; 3] = [
    include_str!("../sql/01-create-table.sql"),
    include_str!("../sql/02-create-trigger.sql"),
    include_str!("../sql/03-create-index.sql"),
];

/// One migration file.
#[derive(Debug, Clone)]
pub struct Migration {
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }

    /// Whether this file is applied as a single batch.
    pub fn is_whole_file(&self) -> bool {
        WHOLE_FILE_MIGRATIONS.contains(&self.name.as_str())
    }

    /// The statements of this file, in order. Comment-only fragments are dropped.
    pub fn statements(&self) -> Vec<String> {
        if self.is_whole_file() {
            if is_blank(&self.sql) {
                return Vec::new();
            }
            return vec![self.sql.trim().to_string()];
        }
        split_statements(&self.sql)
            .into_iter()
            .filter(|s| !is_blank(s))
            .map(|s| s.trim().to_string())
            .collect()
    }
}

/// An ordered set of migration files.
#[derive(Debug, Clone)]
pub struct Migrations {
    files: Vec<Migration>,
}

impl Migrations {
    /// The migrations compiled into this crate.
    pub fn embedded() -> Self {
        let files = MIGRATION_FILES
            .iter()
            .zip(EMBEDDED)
            .map(|(name, sql)| Migration::new(*name, sql))
            .collect();
        Self { files }
    }

    /// Read [`MIGRATION_FILES`] from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, MigrationError> {
        let mut files = Vec::with_capacity(MIGRATION_FILES.len());
        for name in MIGRATION_FILES {
            let path = dir.join(name);
            let sql = std::fs::read_to_string(&path)
                .map_err(|source| MigrationError::Io { path, source })?;
            files.push(Migration::new(name, sql));
        }
        Ok(Self { files })
    }

    /// An arbitrary ordered list, mostly for tests.
    pub fn from_files(files: Vec<Migration>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[Migration] {
        &self.files
    }
}

/// Counts from one migration run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Statements that changed the schema or rows.
    pub applied: usize,
    /// Statements that ran but changed nothing.
    pub unchanged: usize,
    /// Statements skipped by their condition marker.
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Apply every migration in order.
///
/// Any failure aborts the run; the caller must not keep using a partially
/// migrated database.
pub fn run_migrations(
    conn: &Connection,
    migrations: &Migrations,
) -> Result<MigrationReport, MigrationError> {
    let started = Instant::now();
    let mut report = MigrationReport::default();

    for migration in migrations.files() {
        for (i, stmt) in migration.statements().iter().enumerate() {
            let number = i + 1;
            let file = migration.name.as_str();

            if let Some(condition) = statement_condition(stmt) {
                let satisfied: bool = conn
                    .query_row(condition, [], |row| row.get(0))
                    .map_err(|source| MigrationError::Condition {
                        file: file.to_string(),
                        statement: number,
                        source,
                    })?;
                if satisfied {
                    log::info!("[sqlite] {file} #{number} skipped due to condition result is true");
                    report.skipped += 1;
                    continue;
                }
            }

            let had_rows = create_table_target(stmt).map(|table| table_has_rows(conn, table));

            let statement_started = Instant::now();
            let schema_before = schema_version(conn)?;
            let rows = execute_statement(conn, stmt, migration.is_whole_file()).map_err(
                |source| MigrationError::Statement {
                    file: file.to_string(),
                    statement: number,
                    source,
                },
            )?;
            let schema_changed = schema_version(conn)? != schema_before;
            let duration = statement_started.elapsed();

            let changed = schema_changed || rows > 0;
            if logs_at_info(changed, had_rows) {
                log::info!("[sqlite] {file} #{number} ran in {duration:?} ({rows} rows)");
            } else {
                log::debug!("[sqlite] {file} #{number} unchanged ({duration:?})");
            }
            if changed {
                report.applied += 1;
            } else {
                report.unchanged += 1;
            }
        }
    }

    report.elapsed = started.elapsed();
    log::info!(
        "[sqlite] migrations done in {:?}: {} applied, {} unchanged, {} skipped",
        report.elapsed,
        report.applied,
        report.unchanged,
        report.skipped
    );
    Ok(report)
}

/// Open or create a database at the given path and migrate it.
pub fn open_database(path: &Path, migrations: &Migrations) -> Result<Connection, MigrationError> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    configure_connection(&conn)?;
    run_migrations(&conn, migrations)?;
    Ok(conn)
}

/// Open an in-memory database with the full schema. Useful for testing.
pub fn open_memory() -> Result<Connection, MigrationError> {
    let conn = Connection::open_in_memory()?;
    configure_connection(&conn)?;
    run_migrations(&conn, &Migrations::embedded())?;
    Ok(conn)
}

/// Per-connection settings every connection needs.
pub fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_secs(30))?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")
}

/// The query embedded in a statement's condition marker, if any.
pub fn statement_condition(stmt: &str) -> Option<&str> {
    let start = stmt.find(CONDITION_START)? + CONDITION_START.len();
    let end = stmt[start..].find(CONDITION_END)? + start;
    let query = stmt[start..end].trim();
    (!query.is_empty()).then_some(query)
}

/// Target table of a `CREATE TABLE` statement, ignoring leading comments.
pub fn create_table_target(stmt: &str) -> Option<&str> {
    let body = strip_leading_comments(stmt);
    let mut words = body.split_whitespace();
    if !words.next()?.eq_ignore_ascii_case("CREATE") || !words.next()?.eq_ignore_ascii_case("TABLE") {
        return None;
    }
    let mut name = words.next()?;
    if name.eq_ignore_ascii_case("IF") {
        let not = words.next()?;
        let exists = words.next()?;
        if !not.eq_ignore_ascii_case("NOT") || !exists.eq_ignore_ascii_case("EXISTS") {
            return None;
        }
        name = words.next()?;
    }
    let name = name.split('(').next()?.trim_matches('"');
    (!name.is_empty()).then_some(name)
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Split on `;` outside `--` line comments and quoted text.
fn split_statements(sql: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut chars = sql.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '-' if matches!(chars.peek(), Some((_, '-'))) => {
                    for (_, c) in chars.by_ref() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                ';' => {
                    fragments.push(&sql[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    fragments.push(&sql[start..]);
    fragments
}

/// Info when the statement changed something or created a table that held no
/// rows; `had_rows` is `None` for statements other than `CREATE TABLE`.
fn logs_at_info(changed: bool, had_rows: Option<bool>) -> bool {
    changed || had_rows == Some(false)
}

fn execute_statement(conn: &Connection, stmt: &str, whole_file: bool) -> rusqlite::Result<usize> {
    if whole_file {
        conn.execute_batch(stmt)?;
        return Ok(0);
    }
    let is_dml = is_row_statement(stmt);
    let changed = conn.execute(stmt, [])?;
    // sqlite3_changes is not reset by DDL.
    Ok(if is_dml { changed } else { 0 })
}

fn is_row_statement(stmt: &str) -> bool {
    let first = strip_leading_comments(stmt)
        .split_whitespace()
        .next()
        .unwrap_or_default();
    ["INSERT", "UPDATE", "DELETE", "REPLACE"]
        .iter()
        .any(|kw| first.eq_ignore_ascii_case(kw))
}

/// Cheap existence probe; used only to classify log output.
fn table_has_rows(conn: &Connection, table: &str) -> bool {
    conn.query_row(&format!("SELECT 1 FROM \"{table}\" LIMIT 1"), [], |_| Ok(()))
        .is_ok()
}

fn schema_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("PRAGMA schema_version", [], |row| row.get(0))
}

fn strip_leading_comments(stmt: &str) -> &str {
    let mut rest = stmt.trim_start();
    while rest.starts_with("--") {
        rest = match rest.find('\n') {
            Some(pos) => rest[pos + 1..].trim_start(),
            None => "",
        };
    }
    rest
}

fn is_blank(fragment: &str) -> bool {
    strip_leading_comments(fragment).is_empty()
}
