//! SQLite driver backed by an `r2d2` pool of `rusqlite` connections.
//!
//! Accepted URLs are the ones a [`Backend::Sqlite`](crate::database::Backend)
//! produces:
//!
//! | URL               | Database                         |
//! |-------------------|----------------------------------|
//! | `sqlite::memory`  | private in-memory database       |
//! | `sqlite:<path>`   | file at `<path>` (created if missing) |
//!
//! The pool is built on the first [`DataSource::get_connection`] call. An
//! in-memory database lives inside a single connection, so its pool is capped
//! at one connection that the pool never retires; callers must return a
//! connection before asking for the next one.

use std::sync::OnceLock;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde::Deserialize;
use tracing::debug;

use super::{Connection, Cursor, DataSource, DriverError, Resource, Statement, Value};
use crate::database::Protocol;

/// Pool sizing for file-backed databases.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Maximum number of pooled connections. In-memory databases always use 1.
    pub max_size: u32,
    /// How long to wait for a free connection before failing, in seconds.
    pub connection_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 10,
            connection_timeout_secs: 30,
        }
    }
}

// Where a `sqlite:` URL points.
#[derive(Debug, PartialEq, Eq)]
enum Target<'a> {
    Memory,
    File(&'a str),
}

fn parse_url(url: &str) -> Result<Target<'_>, DriverError> {
    let rest = url
        .strip_prefix(Protocol::Sqlite.scheme())
        .and_then(|rest| rest.strip_prefix(':'))
        .ok_or_else(|| DriverError::UnsupportedUrl(url.to_owned()))?;

    match rest {
        ":memory" | ":memory:" => Ok(Target::Memory),
        "" => Err(DriverError::UnsupportedUrl(url.to_owned())),
        path => Ok(Target::File(path)),
    }
}

/// A [`DataSource`] for SQLite databases.
///
/// # Examples
///
/// ```rust,no_run
/// use basicsql::driver::{DataSource, SqliteSource};
///
/// let mut source = SqliteSource::new();
/// source.set_url("sqlite::memory");
/// let mut conn = source.get_connection()?;
/// # Ok::<(), basicsql::driver::DriverError>(())
/// ```
#[derive(Default)]
pub struct SqliteSource {
    url: Option<String>,
    username: Option<String>,
    settings: PoolSettings,
    pool: OnceLock<Pool<SqliteConnectionManager>>,
}

impl SqliteSource {
    /// An unconfigured source with default [`PoolSettings`].
    pub fn new() -> Self {
        Self::default()
    }

    /// An unconfigured source whose file-backed pools use `settings`.
    pub fn with_settings(settings: PoolSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Returns the username set through [`DataSource::set_credentials`].
    ///
    /// SQLite has no authentication: the username is only kept for display and
    /// the password is discarded.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn build_pool(&self) -> Result<Pool<SqliteConnectionManager>, DriverError> {
        let url = self.url.as_deref().ok_or(DriverError::NotConfigured)?;
        let timeout = Duration::from_secs(self.settings.connection_timeout_secs.max(1));
        let builder = Pool::builder().connection_timeout(timeout);

        let (manager, builder) = match parse_url(url)? {
            // The database dies with its only connection, so the reaper must
            // never close it.
            Target::Memory => (
                SqliteConnectionManager::memory(),
                builder.max_size(1).idle_timeout(None).max_lifetime(None),
            ),
            Target::File(path) => (
                SqliteConnectionManager::file(path),
                builder.max_size(self.settings.max_size.max(1)),
            ),
        };

        debug!(url, "building sqlite connection pool");
        Ok(builder.build(manager)?)
    }
}

impl DataSource for SqliteSource {
    fn set_url(&mut self, url: &str) {
        self.url = Some(url.to_owned());
        // A pool built for the old URL is discarded.
        self.pool = OnceLock::new();
    }

    fn set_credentials(&mut self, username: &str, _password: &str) {
        self.username = Some(username.to_owned());
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn get_connection(&self) -> Result<Box<dyn Connection>, DriverError> {
        let pool = match self.pool.get() {
            Some(pool) => pool,
            None => {
                let built = self.build_pool()?;
                self.pool.get_or_init(|| built)
            }
        };
        let conn = pool.get()?;
        Ok(Box::new(SqliteConnection { inner: Some(conn) }))
    }
}

/// A pooled SQLite connection. Closing it returns it to the pool.
pub struct SqliteConnection {
    inner: Option<PooledConnection<SqliteConnectionManager>>,
}

impl Resource for SqliteConnection {
    fn close(&mut self) -> Result<(), DriverError> {
        self.inner = None;
        Ok(())
    }
}

impl Connection for SqliteConnection {
    fn prepare<'c>(&'c mut self, sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError> {
        let conn = self.inner.as_ref().ok_or(DriverError::Closed("connection"))?;
        let statement = conn.prepare(sql)?;
        Ok(Box::new(SqliteStatement {
            conn: &**conn,
            inner: Some(statement),
        }))
    }
}

/// A prepared SQLite statement.
pub struct SqliteStatement<'c> {
    conn: &'c rusqlite::Connection,
    inner: Option<rusqlite::Statement<'c>>,
}

impl<'c> SqliteStatement<'c> {
    fn open(&mut self) -> Result<&mut rusqlite::Statement<'c>, DriverError> {
        self.inner.as_mut().ok_or(DriverError::Closed("statement"))
    }
}

impl Resource for SqliteStatement<'_> {
    fn close(&mut self) -> Result<(), DriverError> {
        if let Some(statement) = self.inner.take() {
            statement.finalize()?;
        }
        Ok(())
    }
}

impl Statement for SqliteStatement<'_> {
    fn bind(&mut self, index: usize, value: Value) -> Result<(), DriverError> {
        self.open()?.raw_bind_parameter(index, to_sql(value))?;
        Ok(())
    }

    /// Runs the statement to completion. Rows it returns (`PRAGMA` reads,
    /// `RETURNING` clauses) are stepped through and discarded.
    fn execute(&mut self) -> Result<usize, DriverError> {
        let conn = self.conn;
        let statement = self.open()?;
        if statement.column_count() == 0 {
            return Ok(statement.raw_execute()?);
        }

        let readonly = statement.readonly();
        let mut rows = statement.raw_query();
        while rows.next()?.is_some() {}
        drop(rows);
        Ok(if readonly { 0 } else { conn.changes() as usize })
    }

    fn query<'s>(&'s mut self) -> Result<Box<dyn Cursor + 's>, DriverError> {
        let statement = self.open()?;
        let columns = statement
            .column_names()
            .into_iter()
            .map(str::to_owned)
            .collect();
        let rows = statement.raw_query();
        Ok(Box::new(SqliteCursor {
            rows: Some(rows),
            columns,
            current: None,
        }))
    }
}

/// Cursor over SQLite result rows. The current row is copied out of the
/// statement on every [`advance`](Cursor::advance).
pub struct SqliteCursor<'s> {
    rows: Option<rusqlite::Rows<'s>>,
    columns: Vec<String>,
    current: Option<Vec<Value>>,
}

impl Resource for SqliteCursor<'_> {
    fn close(&mut self) -> Result<(), DriverError> {
        self.rows = None;
        self.current = None;
        Ok(())
    }
}

impl Cursor for SqliteCursor<'_> {
    fn advance(&mut self) -> Result<bool, DriverError> {
        let rows = self.rows.as_mut().ok_or(DriverError::Closed("cursor"))?;
        match rows.next()? {
            Some(row) => {
                let mut values = Vec::with_capacity(self.columns.len());
                for index in 0..self.columns.len() {
                    values.push(from_sql(row.get_ref(index)?));
                }
                self.current = Some(values);
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn value(&self, index: usize) -> Result<&Value, DriverError> {
        let row = self.current.as_ref().ok_or(DriverError::NoRow)?;
        row.get(index).ok_or(DriverError::ColumnOutOfRange {
            index,
            count: row.len(),
        })
    }
}

fn to_sql(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(i),
        Value::Real(r) => SqlValue::Real(r),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}
