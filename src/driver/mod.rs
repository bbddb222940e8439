//! Driver contract: the pool, connection, statement and cursor traits.
//!
//! A [`Database`](crate::database::Database) never talks to a concrete driver.
//! It owns a [`DataSource`] and hands out [`Connection`]s from it; everything
//! below a connection is reached through these traits:
//!
//! | Trait          | Role                                                   |
//! |----------------|--------------------------------------------------------|
//! | [`DataSource`] | the connection pool, configured with a URL and credentials |
//! | [`Connection`] | one live connection borrowed from the pool             |
//! | [`Statement`]  | a prepared statement with 1-based parameter binding    |
//! | [`Cursor`]     | a forward-only cursor over result rows                 |
//!
//! Every resource implements [`Resource::close`]. Closing is explicit so that a
//! failure to release a resource can be reported instead of disappearing inside
//! a `Drop` impl.
//!
//! The crate ships one driver, [`sqlite`], built on `r2d2` and `rusqlite`.

use std::fmt;

use thiserror::Error;

pub mod sqlite;

#[cfg(test)]
pub(crate) mod fake;

pub use sqlite::{PoolSettings, SqliteSource};

/// Errors produced by a driver or by reading values out of a [`Cursor`].
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("data source has no url configured")]
    NotConfigured,

    #[error("{0} is already closed")]
    Closed(&'static str),

    #[error("unsupported connection url `{0}`")]
    UnsupportedUrl(String),

    #[error("no column named `{0}`")]
    NoSuchColumn(String),

    #[error("column index {index} out of range ({count} columns)")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("column `{column}` holds {actual}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("cursor is not positioned on a row")]
    NoRow,

    #[error("{0}")]
    Other(String),
}

/// A single SQL value, used both for parameters and for result cells.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Returns the SQL storage class name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Real(_) => "REAL",
            Self::Text(_) => "TEXT",
            Self::Blob(_) => "BLOB",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => f.write_str(s),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Blob(value.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A resource that must be released explicitly.
pub trait Resource {
    /// Releases the resource.
    ///
    /// Closing an already closed resource is a no-op. Any other use of a closed
    /// resource fails with [`DriverError::Closed`].
    fn close(&mut self) -> Result<(), DriverError>;
}

/// The connection pool behind a database handle.
///
/// A data source is configured once with a connection URL (and optionally
/// credentials) before the first connection is requested.
pub trait DataSource: Send + Sync {
    /// Sets the connection URL. Replaces any previously set URL.
    fn set_url(&mut self, url: &str);

    /// Sets the credentials used to open connections.
    fn set_credentials(&mut self, username: &str, password: &str);

    /// Returns the URL currently set, if any.
    fn url(&self) -> Option<&str>;

    /// Borrows a live connection from the pool.
    ///
    /// # Errors
    ///
    /// Fails when the backend is unreachable, the credentials are rejected or
    /// the pool is exhausted. Implementations must not retry on their own.
    fn get_connection(&self) -> Result<Box<dyn Connection>, DriverError>;
}

/// A live connection borrowed from a [`DataSource`].
pub trait Connection: Resource {
    /// Prepares `sql` for execution on this connection.
    fn prepare<'c>(&'c mut self, sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError>;
}

/// A prepared statement.
///
/// Parameter indexes are 1-based, matching `?` placeholders left to right.
pub trait Statement: Resource {
    /// Binds `value` to the parameter at `index`.
    fn bind(&mut self, index: usize, value: Value) -> Result<(), DriverError>;

    /// Runs the statement and returns the number of rows changed.
    fn execute(&mut self) -> Result<usize, DriverError>;

    /// Runs the statement as a query and returns a cursor over its rows.
    fn query<'s>(&'s mut self) -> Result<Box<dyn Cursor + 's>, DriverError>;

    /// Binds a TEXT parameter.
    fn set_string(&mut self, index: usize, value: &str) -> Result<(), DriverError> {
        self.bind(index, Value::from(value))
    }

    /// Binds an INTEGER parameter.
    fn set_i64(&mut self, index: usize, value: i64) -> Result<(), DriverError> {
        self.bind(index, Value::Integer(value))
    }

    /// Binds a REAL parameter.
    fn set_f64(&mut self, index: usize, value: f64) -> Result<(), DriverError> {
        self.bind(index, Value::Real(value))
    }

    /// Binds a boolean as INTEGER `0` or `1`.
    fn set_bool(&mut self, index: usize, value: bool) -> Result<(), DriverError> {
        self.bind(index, Value::from(value))
    }

    /// Binds a BLOB parameter.
    fn set_bytes(&mut self, index: usize, value: &[u8]) -> Result<(), DriverError> {
        self.bind(index, Value::from(value))
    }

    /// Binds SQL `NULL`.
    fn set_null(&mut self, index: usize) -> Result<(), DriverError> {
        self.bind(index, Value::Null)
    }
}

/// A forward-only cursor over the rows of a query.
///
/// The cursor starts *before* the first row; call [`advance`](Self::advance)
/// to move onto it.
///
/// # Examples
///
/// ```rust,no_run
/// use basicsql::driver::{Cursor, DriverError};
///
/// fn ages(cursor: &mut dyn Cursor) -> Result<Vec<i64>, DriverError> {
///     let mut ages = Vec::new();
///     while cursor.advance()? {
///         ages.push(cursor.get_i64("age")?);
///     }
///     Ok(ages)
/// }
/// ```
pub trait Cursor: Resource {
    /// Moves to the next row. Returns `false` once the rows are exhausted.
    fn advance(&mut self) -> Result<bool, DriverError>;

    /// Returns the column names of the result, in order.
    fn columns(&self) -> &[String];

    /// Returns the value at the 0-based column `index` of the current row.
    fn value(&self, index: usize) -> Result<&Value, DriverError>;

    /// Resolves a column name (case-insensitive) to its 0-based index.
    fn column_index(&self, name: &str) -> Result<usize, DriverError> {
        self.columns()
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| DriverError::NoSuchColumn(name.to_owned()))
    }

    /// Returns the value of the named column in the current row.
    fn get(&self, column: &str) -> Result<&Value, DriverError> {
        let index = self.column_index(column)?;
        self.value(index)
    }

    /// Returns `true` if the named column is SQL `NULL` in the current row.
    fn is_null(&self, column: &str) -> Result<bool, DriverError> {
        Ok(self.get(column)?.is_null())
    }

    /// Reads an INTEGER column.
    fn get_i64(&self, column: &str) -> Result<i64, DriverError> {
        match self.get(column)? {
            Value::Integer(i) => Ok(*i),
            other => Err(mismatch(column, "INTEGER", other)),
        }
    }

    /// Reads a REAL column. INTEGER values are widened.
    fn get_f64(&self, column: &str) -> Result<f64, DriverError> {
        match self.get(column)? {
            Value::Real(r) => Ok(*r),
            Value::Integer(i) => Ok(*i as f64),
            other => Err(mismatch(column, "REAL", other)),
        }
    }

    /// Reads an INTEGER column as a boolean (non-zero is `true`).
    fn get_bool(&self, column: &str) -> Result<bool, DriverError> {
        match self.get(column)? {
            Value::Integer(i) => Ok(*i != 0),
            other => Err(mismatch(column, "INTEGER", other)),
        }
    }

    /// Reads a column as text. Numeric values are rendered with `Display`.
    fn get_string(&self, column: &str) -> Result<String, DriverError> {
        match self.get(column)? {
            Value::Text(s) => Ok(s.clone()),
            v @ (Value::Integer(_) | Value::Real(_)) => Ok(v.to_string()),
            other => Err(mismatch(column, "TEXT", other)),
        }
    }

    /// Reads a BLOB column. TEXT values are returned as their UTF-8 bytes.
    fn get_bytes(&self, column: &str) -> Result<Vec<u8>, DriverError> {
        match self.get(column)? {
            Value::Blob(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            other => Err(mismatch(column, "BLOB", other)),
        }
    }
}

fn mismatch(column: &str, expected: &'static str, actual: &Value) -> DriverError {
    DriverError::TypeMismatch {
        column: column.to_owned(),
        expected,
        actual: actual.type_name(),
    }
}
