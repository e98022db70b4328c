use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Name of the table shared by every schema, holding one payload row per uid.
pub const DOCUMENTS_TABLE: &str = "documents";

/// The backing database: the shared `documents` table (uid -> payload) and
/// one index table per schema (uid -> id).
///
/// Every method is a single point read or point write. Nothing here groups
/// statements; callers that want atomicity use the transaction helpers.
pub struct SystemDb {
    conn: Connection,
}

impl SystemDb {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = SystemDb { conn };
        db.initialize_tables()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = SystemDb { conn };
        db.initialize_tables()?;
        Ok(db)
    }

    fn initialize_tables(&self) -> Result<()> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                uid TEXT PRIMARY KEY NOT NULL,
                data TEXT NOT NULL
            );",
            quoted(DOCUMENTS_TABLE)
        ))?;
        Ok(())
    }

    // ── Tables ───────────────────────────────────────────────────────

    /// Create a schema's index table if it does not exist yet.
    pub fn create_index_table(&self, table: &str) -> Result<()> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                uid TEXT PRIMARY KEY NOT NULL,
                id TEXT NOT NULL UNIQUE
            );",
            quoted(table)
        ))?;
        log::debug!("Index table '{table}' ready");
        Ok(())
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn row_count(&self, table: &str) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quoted(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ── Document Payloads ────────────────────────────────────────────

    /// Fetch the stored payload for a uid.
    pub fn get_payload(&self, uid: &str) -> Result<Option<String>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT data FROM {} WHERE uid = ?1", quoted(DOCUMENTS_TABLE)),
                params![uid],
                |row| row.get(0),
            )
            .optional()?;
        Ok(result)
    }

    pub fn payload_exists(&self, uid: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE uid = ?1", quoted(DOCUMENTS_TABLE)),
                params![uid],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn insert_payload(&self, uid: &str, data: &str) -> Result<()> {
        self.conn.execute(
            &format!("INSERT INTO {} (uid, data) VALUES (?1, ?2)", quoted(DOCUMENTS_TABLE)),
            params![uid, data],
        )?;
        Ok(())
    }

    /// Returns the number of rows changed (0 when the uid has no row).
    pub fn update_payload(&self, uid: &str, data: &str) -> Result<usize> {
        let changed = self.conn.execute(
            &format!("UPDATE {} SET data = ?2 WHERE uid = ?1", quoted(DOCUMENTS_TABLE)),
            params![uid, data],
        )?;
        Ok(changed)
    }

    // ── Index Tables ─────────────────────────────────────────────────

    /// Look up the uid indexed under `id`.
    pub fn find_indexed_uid(&self, table: &str, id: &str) -> Result<Option<String>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT uid FROM {} WHERE id = ?1", quoted(table)),
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(result)
    }

    pub fn insert_index_row(&self, table: &str, uid: &str, id: &str) -> Result<()> {
        self.conn.execute(
            &format!("INSERT INTO {} (uid, id) VALUES (?1, ?2)", quoted(table)),
            params![uid, id],
        )?;
        Ok(())
    }

    /// Returns the number of rows changed (0 when the uid has no row).
    pub fn update_index_row(&self, table: &str, uid: &str, id: &str) -> Result<usize> {
        let changed = self.conn.execute(
            &format!("UPDATE {} SET id = ?2 WHERE uid = ?1", quoted(table)),
            params![uid, id],
        )?;
        Ok(changed)
    }

    // ── Transaction Support ──────────────────────────────────────────

    pub fn begin_transaction(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        Ok(())
    }

    pub fn commit_transaction(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub fn rollback_transaction(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    /// Direct access to the connection, for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn quoted(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
