use rusqlite::{params, Connection, OpenFlags, TransactionBehavior};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::StoreError;
use crate::record::{ProjectRecord, SnapshotRow};

/// Bumped whenever the table layout changes; older files are migrated in
/// `init_schema`, newer ones are refused.
pub const SCHEMA_VERSION: i64 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Per capture date summary of the stored history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSummary {
    pub captured_at: NaiveDate,
    pub projects: usize,
    pub total_votes: u64,
}

/// Get the database path (~/.local/share/votewatch/votewatch.db or platform equivalent)
pub fn default_db_path() -> Result<PathBuf, StoreError> {
    let data_dir = directories::ProjectDirs::from("", "", "votewatch")
        .ok_or(StoreError::NoDataDir)?
        .data_dir()
        .to_path_buf();

    Ok(data_dir.join("votewatch.db"))
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(StoreError::NewerSchema { found: version, supported: SCHEMA_VERSION });
    }

    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshot_rows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            link TEXT NOT NULL,
            votes INTEGER NOT NULL,
            captured_at TEXT NOT NULL
        )",
        [],
    )?;

    let missing = missing_columns(conn)?;
    if !missing.is_empty() {
        return Err(StoreError::MissingColumns(missing.join(", ")));
    }

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_snapshot_rows_link ON snapshot_rows(link)",
        [],
    )?;

    if version < SCHEMA_VERSION {
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    }

    Ok(())
}

fn missing_columns(conn: &Connection) -> Result<Vec<&'static str>, StoreError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('snapshot_rows')")?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(["title", "link", "votes", "captured_at"]
        .into_iter()
        .filter(|col| !present.iter().any(|p| p.as_str() == *col))
        .collect())
}

/// Append-only history of scraped vote counts.
///
/// Rows are never updated or deleted. Open once per command, reuse across
/// all operations.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        init_schema(&conn)?;
        Ok(Store { conn })
    }

    /// Most recent row per link, or an empty map when history is missing
    /// or unreadable. Latest capture date wins; on equal dates the row
    /// appended last wins.
    pub fn load_latest(&self) -> HashMap<String, SnapshotRow> {
        match self.try_load_latest() {
            Ok(latest) => latest,
            Err(e) => {
                warn!(error = %e, "history unreadable, treating as first run");
                HashMap::new()
            }
        }
    }

    fn try_load_latest(&self) -> Result<HashMap<String, SnapshotRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT title, link, votes, captured_at
             FROM snapshot_rows
             ORDER BY captured_at ASC, id ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut latest = HashMap::new();
        for row in rows {
            let (title, link, votes, captured_at) = row?;

            let Ok(captured_at) = NaiveDate::parse_from_str(&captured_at, DATE_FORMAT) else {
                warn!(%link, %captured_at, "skipping history row with bad capture date");
                continue;
            };

            let record = ProjectRecord { title, link: link.clone(), votes: votes.max(0) as u64 };
            latest.insert(link, SnapshotRow::new(record, captured_at));
        }

        debug!(links = latest.len(), "loaded latest history");
        Ok(latest)
    }

    /// Append rows to the end of history. Returns the number written.
    pub fn append(&mut self, rows: &[SnapshotRow]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut stmt = tx.prepare_cached(
            "INSERT INTO snapshot_rows (title, link, votes, captured_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?;

        for row in rows {
            stmt.execute(params![
                row.record.title,
                row.record.link,
                i64::try_from(row.record.votes).unwrap_or(i64::MAX),
                row.captured_at.format(DATE_FORMAT).to_string(),
            ])?;
        }

        drop(stmt);
        tx.commit()?;

        Ok(rows.len())
    }

    /// List capture dates, most recent first. A link captured twice on the
    /// same date counts once, with its last appended votes.
    pub fn list_captures(&self) -> Result<Vec<CaptureSummary>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT captured_at, COUNT(*), SUM(votes)
             FROM snapshot_rows
             WHERE id IN (SELECT MAX(id) FROM snapshot_rows GROUP BY captured_at, link)
             GROUP BY captured_at
             ORDER BY captured_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })?;

        let mut captures = Vec::new();
        for row in rows {
            let (captured_at, projects, total_votes) = row?;
            let Ok(captured_at) = NaiveDate::parse_from_str(&captured_at, DATE_FORMAT) else {
                continue;
            };
            captures.push(CaptureSummary {
                captured_at,
                projects: projects.max(0) as usize,
                total_votes: total_votes.unwrap_or(0).max(0) as u64,
            });
        }

        Ok(captures)
    }

    /// Every stored row for one capture date, in append order
    pub fn rows_on(&self, captured_at: NaiveDate) -> Result<Vec<SnapshotRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT title, link, votes
             FROM snapshot_rows
             WHERE captured_at = ?1
             ORDER BY id ASC",
        )?;

        let rows = stmt
            .query_map(params![captured_at.format(DATE_FORMAT).to_string()], |row| {
                Ok(ProjectRecord {
                    title: row.get(0)?,
                    link: row.get(1)?,
                    votes: row.get::<_, i64>(2)?.max(0) as u64,
                })
            })?
            .map(|record| record.map(|r| SnapshotRow::new(r, captured_at)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn row(link: &str, votes: u64, captured_at: &str) -> SnapshotRow {
        SnapshotRow::new(
            ProjectRecord { title: format!("title {link}"), link: link.to_string(), votes },
            date(captured_at),
        )
    }

    fn open_temp() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("history.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn empty_history_loads_nothing() {
        let (_dir, store) = open_temp();
        assert!(store.load_latest().is_empty());
        assert!(store.list_captures().unwrap().is_empty());
    }

    #[test]
    fn latest_date_wins_regardless_of_append_order() {
        let (_dir, mut store) = open_temp();
        store.append(&[row("a", 130, "2024-05-02")]).unwrap();
        store.append(&[row("a", 100, "2024-05-01")]).unwrap();

        let latest = store.load_latest();
        assert_eq!(latest["a"].record.votes, 130);
        assert_eq!(latest["a"].captured_at, date("2024-05-02"));
    }

    #[test]
    fn same_date_last_append_wins() {
        let (_dir, mut store) = open_temp();
        store.append(&[row("a", 10, "2024-05-01")]).unwrap();
        store.append(&[row("a", 12, "2024-05-01")]).unwrap();

        assert_eq!(store.load_latest()["a"].record.votes, 12);
    }

    #[test]
    fn append_is_additive_and_keeps_duplicates() {
        let (_dir, mut store) = open_temp();
        let rows = vec![row("a", 1, "2024-05-01"), row("b", 2, "2024-05-01")];
        assert_eq!(store.append(&rows).unwrap(), 2);
        assert_eq!(store.append(&rows).unwrap(), 2);

        assert_eq!(store.rows_on(date("2024-05-01")).unwrap().len(), 4);
        assert_eq!(store.load_latest().len(), 2);
    }

    #[test]
    fn history_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("history.db");
        {
            let mut store = Store::open(&path).unwrap();
            store.append(&[row("a", 5, "2024-05-01")]).unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(store.load_latest()["a"].record.votes, 5);
    }

    #[test]
    fn captures_summarized_newest_first() {
        let (_dir, mut store) = open_temp();
        store.append(&[row("a", 1, "2024-05-01"), row("b", 2, "2024-05-01")]).unwrap();
        store.append(&[row("a", 5, "2024-05-03")]).unwrap();
        store.append(&[row("a", 7, "2024-05-03")]).unwrap();

        let captures = store.list_captures().unwrap();
        assert_eq!(
            captures,
            vec![
                CaptureSummary { captured_at: date("2024-05-03"), projects: 1, total_votes: 7 },
                CaptureSummary { captured_at: date("2024-05-01"), projects: 2, total_votes: 3 },
            ]
        );
    }

    #[test]
    fn corrupted_file_is_an_open_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.db");
        std::fs::write(&path, b"this is definitely not sqlite, just some bytes padding it out").unwrap();

        assert!(Store::open(&path).is_err());
    }

    #[test]
    fn unexpected_columns_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE snapshot_rows (id INTEGER PRIMARY KEY, name TEXT, url TEXT);
                 INSERT INTO snapshot_rows (name, url) VALUES ('x', 'y');",
            )
            .unwrap();
        }

        match Store::open(&path) {
            Err(StoreError::MissingColumns(cols)) => assert_eq!(cols, "title, link, votes, captured_at"),
            other => panic!("expected missing columns, got {:?}", other.err()),
        }
    }

    #[test]
    fn bad_dates_are_skipped() {
        let (_dir, mut store) = open_temp();
        store.append(&[row("a", 1, "2024-05-01")]).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO snapshot_rows (title, link, votes, captured_at) VALUES ('b', 'b', 3, 'yesterday')",
                [],
            )
            .unwrap();

        let latest = store.load_latest();
        assert_eq!(latest.len(), 1);
        assert!(latest.contains_key("a"));
    }

    #[test]
    fn newer_schema_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("PRAGMA user_version = 99;").unwrap();
        }

        assert!(matches!(
            Store::open(&path),
            Err(StoreError::NewerSchema { found: 99, .. })
        ));
    }
}
