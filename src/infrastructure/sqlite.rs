//! SQLite-backed [`SearchStore`].
//!
//! One row per tree node, keyed by search name:
//!
//! ```sql
//! search_conditions(search, left_label, right_label, kind, field, attribute, value)
//! ```

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};
use tracing::{debug, instrument};

use crate::domain::ConditionRow;
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::{SearchStore, StoreResult};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS search_conditions (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        search      TEXT NOT NULL,
        left_label  INTEGER NOT NULL,
        right_label INTEGER NOT NULL,
        kind        TEXT NOT NULL,      -- 'AND' | 'OR' | 'CONDITION'
        field       TEXT,               -- NULL for AND/OR
        attribute   TEXT,               -- NULL for AND/OR
        value       TEXT,               -- NULL for AND/OR

        UNIQUE(search, left_label)
    );

    CREATE INDEX IF NOT EXISTS idx_search_conditions_search
    ON search_conditions(search, left_label);
";

/// Search store in a SQLite database file.
pub struct SqliteSearchStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteSearchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSearchStore").finish_non_exhaustive()
    }
}

impl SqliteSearchStore {
    /// Open (and create if needed) the database at `path`.
    #[instrument(level = "debug")]
    pub fn open(path: &Path) -> InfraResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| InfraError::sqlite(format!("open {}", path.display()), e))?;
        Self::with_connection(conn)
    }

    /// Database living only as long as the store.
    pub fn open_in_memory() -> InfraResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| InfraError::sqlite("open in-memory database", e))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> InfraResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| InfraError::sqlite("initialize schema", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| format!("database lock poisoned: {}", e).into())
    }
}

impl SearchStore for SqliteSearchStore {
    #[instrument(level = "debug", skip(self, rows), fields(rows = rows.len()))]
    fn save(&self, search: &str, rows: &[ConditionRow]) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM search_conditions WHERE search = ?1",
            params![search],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO search_conditions
                     (search, left_label, right_label, kind, field, attribute, value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for row in rows {
                stmt.execute(params![
                    search,
                    row.left_label,
                    row.right_label,
                    row.kind,
                    row.field,
                    row.attribute,
                    row.value,
                ])?;
            }
        }
        tx.commit()?;
        debug!("saved search '{}'", search);
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    fn load(&self, search: &str) -> StoreResult<Vec<ConditionRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT field, value, attribute, left_label, right_label, kind
             FROM search_conditions
             WHERE search = ?1
             ORDER BY left_label ASC",
        )?;
        let rows = stmt
            .query_map(params![search], |row| {
                Ok(ConditionRow {
                    field: row.get(0)?,
                    value: row.get(1)?,
                    attribute: row.get(2)?,
                    left_label: row.get(3)?,
                    right_label: row.get(4)?,
                    kind: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT search FROM search_conditions ORDER BY search")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn delete(&self, search: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM search_conditions WHERE search = ?1",
            params![search],
        )?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str, left: u32, right: u32) -> ConditionRow {
        ConditionRow {
            field: None,
            value: None,
            attribute: None,
            left_label: left,
            right_label: right,
            kind: kind.to_string(),
        }
    }

    #[test]
    fn given_rows_saved_out_of_order_when_loading_then_sorted_by_left_label() {
        let store = SqliteSearchStore::open_in_memory().unwrap();
        let rows = vec![row("AND", 3, 4), row("OR", 1, 6), row("AND", 5, 6)];

        store.save("s", &rows).unwrap();
        let loaded = store.load("s").unwrap();

        let lefts: Vec<u32> = loaded.iter().map(|r| r.left_label).collect();
        assert_eq!(lefts, vec![1, 3, 5]);
    }

    #[test]
    fn given_existing_search_when_saving_again_then_replaces_rows() {
        let store = SqliteSearchStore::open_in_memory().unwrap();
        store.save("s", &[row("OR", 1, 2), row("AND", 3, 4)]).unwrap();
        store.save("s", &[row("AND", 1, 2)]).unwrap();

        assert_eq!(store.load("s").unwrap(), vec![row("AND", 1, 2)]);
    }
}
