//! Relational session store on SQLite
//!
//! Owns a single table keyed by storage key:
//!
//! ```sql
//! id          TEXT PRIMARY KEY
//! value       BLOB NOT NULL
//! created_at  INTEGER NOT NULL   -- unix millis
//! expires_at  INTEGER            -- unix millis, NULL = never
//! ```
//!
//! Writes are upserts, reads filter expired rows in the predicate, and GC is
//! one `DELETE`. SQLite calls block, so they run on tokio's blocking pool, each
//! on its own pooled connection. File databases use WAL so readers are not
//! held up by a writer or by a GC sweep.

use super::error::{Result, SessionError};
use super::store::{Store, StoreOptions};
use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Default table name
pub const DEFAULT_TABLE: &str = "sessions";

/// Connections kept by a file-backed store
pub const DEFAULT_POOL_SIZE: u32 = 8;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct Statements {
    get: String,
    touch: String,
    set: String,
    del: String,
    gc: String,
    count: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        Self {
            get: format!(
                "SELECT value FROM {table} WHERE id = ?1 AND (expires_at IS NULL OR expires_at > ?2)"
            ),
            touch: format!(
                "UPDATE {table} SET expires_at = ?1 \
                 WHERE id = ?2 AND (expires_at IS NULL OR expires_at > ?3)"
            ),
            set: format!(
                "INSERT INTO {table} (id, value, created_at, expires_at) VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT (id) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at"
            ),
            del: format!("DELETE FROM {table} WHERE id = ?1"),
            gc: format!("DELETE FROM {table} WHERE expires_at <= ?1"),
            count: format!(
                "SELECT COUNT(*) FROM {table} WHERE expires_at IS NULL OR expires_at > ?1"
            ),
        }
    }
}

fn schema(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            value BLOB NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS {table}_expires_at_idx ON {table} (expires_at);"
    )
}

fn validate_table(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SessionError::Config(format!("invalid session table name: {:?}", table)))
    }
}

fn init_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "journal_mode", "WAL")
}

/// Expiry column value for a write or touch at `now`
fn expiry_millis(opts: &StoreOptions, now: chrono::DateTime<Utc>) -> Option<i64> {
    opts.expires_at(now).map(|at| at.timestamp_millis())
}

/// SQLite-backed session store
#[derive(Clone)]
pub struct SqlStore {
    pool: Pool<SqliteConnectionManager>,
    statements: Arc<Statements>,
}

impl SqlStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        Self::open_with_pool_size(path, table, DEFAULT_POOL_SIZE)
    }

    pub fn open_with_pool_size(path: impl AsRef<Path>, table: &str, size: u32) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(init_connection);
        let pool = Pool::builder().max_size(size.max(1)).build(manager)?;
        Self::with_pool(pool, table, true)
    }

    /// In-memory database, mostly for tests
    ///
    /// Shared-cache memory databases lock whole tables and ignore the busy
    /// timeout, so this pool holds a single connection.
    pub fn open_in_memory(table: &str) -> Result<Self> {
        let pool = Pool::builder().max_size(1).build(SqliteConnectionManager::memory())?;
        Self::with_pool(pool, table, true)
    }

    /// Wrap an existing pool, optionally creating the schema
    pub fn with_pool(
        pool: Pool<SqliteConnectionManager>,
        table: &str,
        init_schema: bool,
    ) -> Result<Self> {
        validate_table(table)?;
        if init_schema {
            pool.get()?.execute_batch(&schema(table))?;
        }
        log::debug!("SQL session store ready (table {}, pool of {})", table, pool.max_size());
        Ok(Self { pool, statements: Arc::new(Statements::for_table(table)) })
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &Statements) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let statements = Arc::clone(&self.statements);
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn, &statements)
        })
        .await
        .map_err(|e| SessionError::Store(format!("sqlite task failed: {}", e)))?
    }
}

#[async_trait::async_trait]
impl Store for SqlStore {
    async fn get(&self, key: &str, opts: &StoreOptions) -> Result<Vec<u8>> {
        let key = key.to_string();
        let opts = *opts;
        self.run(move |conn, sql| {
            let now = Utc::now();
            let value: Option<Vec<u8>> = conn
                .query_row(&sql.get, params![key, now.timestamp_millis()], |row| row.get(0))
                .optional()?;
            let value = value.ok_or(SessionError::NotFound)?;

            if opts.rolling && !opts.ttl.is_zero() {
                let now_ms = now.timestamp_millis();
                conn.execute(&sql.touch, params![expiry_millis(&opts, now), key, now_ms])?;
            }
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: Vec<u8>, opts: &StoreOptions) -> Result<()> {
        let key = key.to_string();
        let opts = *opts;
        self.run(move |conn, sql| {
            let now = Utc::now();
            let expires_at = expiry_millis(&opts, now);
            conn.execute(&sql.set, params![key, value, now.timestamp_millis(), expires_at])?;
            Ok(())
        })
        .await
    }

    async fn touch(&self, key: &str, opts: &StoreOptions) -> Result<()> {
        if opts.ttl.is_zero() {
            return Ok(());
        }
        let key = key.to_string();
        let opts = *opts;
        self.run(move |conn, sql| {
            let now = Utc::now();
            conn.execute(&sql.touch, params![expiry_millis(&opts, now), key, now.timestamp_millis()])?;
            Ok(())
        })
        .await
    }

    async fn del(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.run(move |conn, sql| {
            conn.execute(&sql.del, params![key])?;
            Ok(())
        })
        .await
    }

    async fn gc(&self) -> Result<usize> {
        self.run(|conn, sql| Ok(conn.execute(&sql.gc, params![Utc::now().timestamp_millis()])?))
            .await
    }

    async fn count(&self) -> Result<usize> {
        self.run(|conn, sql| {
            let count: i64 =
                conn.query_row(&sql.count, params![Utc::now().timestamp_millis()], |row| {
                    row.get(0)
                })?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
    }
}
