//! Database connection and schema management.

use rusqlite::Connection;
use tracing::info;

use crate::storage::error::StorageResult;

/// Database connection wrapper.
///
/// Manages the SQLite connection and schema initialization.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a new database connection at the specified path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    /// A new `Database` instance with initialized schema.
    ///
    /// # Errors
    /// * `StorageError::Connection` - If the database connection fails
    pub fn open(path: &str) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Opens an in-memory database for testing.
    ///
    /// # Errors
    /// * `StorageError::Connection` - If the database connection fails
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Gets a reference to the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Gets a mutable reference to the underlying connection.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Initializes the database schema.
    ///
    /// Creates the session, interaction, component, dependency and
    /// requirement tables.
    ///
    /// # Errors
    /// * `StorageError::Connection` - If schema creation fails
    fn init_schema(&self) -> StorageResult<()> {
        info!("Initializing database schema");

        self.conn.execute("PRAGMA foreign_keys = ON", [])?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                workflow TEXT NOT NULL,
                status TEXT NOT NULL,
                state_json TEXT NOT NULL,
                parent_session TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS interactions (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                step_id TEXT NOT NULL,
                command_json TEXT NOT NULL,
                result_json TEXT,
                seq INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            )
            "#,
            [],
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS components (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                component_type TEXT NOT NULL,
                module_path TEXT NOT NULL,
                parent TEXT,
                priority INTEGER NOT NULL DEFAULT 0,
                status_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS dependencies (
                source TEXT NOT NULL,
                target TEXT NOT NULL,
                PRIMARY KEY (source, target),
                FOREIGN KEY (source) REFERENCES components(id) ON DELETE CASCADE
            )
            "#,
            [],
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS requirements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                component_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                satisfied INTEGER NOT NULL,
                checked_at TEXT NOT NULL,
                details_json TEXT NOT NULL,
                satisfied_by TEXT,
                FOREIGN KEY (component_id) REFERENCES components(id) ON DELETE CASCADE
            )
            "#,
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_interactions_session_id ON interactions(session_id)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_parent ON sessions(parent_session)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_requirements_component_id ON requirements(component_id)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_dependencies_source ON dependencies(source)",
            [],
        )?;

        info!("Database schema initialized successfully");
        Ok(())
    }

    /// Runs a transaction with the provided closure.
    ///
    /// # Errors
    /// * `StorageError::Connection` - If the transaction fails
    pub fn transaction<F, R>(&mut self, f: F) -> StorageResult<R>
    where
        F: FnOnce(&rusqlite::Transaction) -> StorageResult<R>,
    {
        let tx = self.conn.transaction()?;
        match f(&tx) {
            Ok(result) => {
                tx.commit()?;
                Ok(result)
            }
            Err(e) => {
                tx.rollback()?;
                Err(e)
            }
        }
    }
}
