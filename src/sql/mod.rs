//! Statement helpers: run SQL with guaranteed release of every resource.
//!
//! Each helper borrows a connection from a [`Database`] (the one passed in, or
//! the registered default when `None` is passed), prepares the statement, lets
//! a callback bind its parameters, runs it, and for queries hands the cursor to
//! a second callback. The cursor, statement and connection are closed in that
//! order on every exit path.
//!
//! Two flavours exist for each operation:
//!
//! | Lenient          | Strict               | Result on failure                 |
//! |------------------|----------------------|-----------------------------------|
//! | [`execute`]      | [`try_execute`]      | nothing / `Err(SqlError)`         |
//! | [`query`]        | [`try_query`]        | nothing / `Err(SqlError)`         |
//! | [`return_query`] | [`try_return_query`] | `None` / `Err(SqlError)`          |
//!
//! The lenient helpers never fail: errors are logged at `error` level and
//! swallowed. A failed `execute` or `query` therefore looks the same to the
//! caller as one that had nothing to do; use the strict helpers when that
//! difference matters.
//!
//! # Examples
//!
//! ```rust,no_run
//! use basicsql::database::Database;
//! use basicsql::driver::Cursor;
//! use basicsql::sql;
//!
//! let db = Database::sqlite_memory();
//! sql::execute(Some(&db), "CREATE TABLE users (name TEXT, age INTEGER)", sql::no_params);
//! sql::execute(Some(&db), "INSERT INTO users VALUES (?, ?)", |s| {
//!     s.set_string(1, "FerusGrim")?;
//!     s.set_i64(2, 27)
//! });
//!
//! let age = sql::return_query(
//!     Some(&db),
//!     "SELECT age FROM users WHERE name = ?",
//!     |s| s.set_string(1, "FerusGrim"),
//!     |r| Ok(if r.advance()? { Some(r.get_i64("age")?) } else { None }),
//! )
//! .unwrap_or(-1);
//! assert_eq!(age, 27);
//! ```

use thiserror::Error;
use tracing::{debug, error};

mod scope;

use scope::{ResourceKind, Scoped};

use crate::database::{Database, registry};
use crate::driver::{Cursor, DriverError, Statement};

/// Errors reported by the statement helpers.
#[derive(Debug, Error)]
pub enum SqlError {
    #[error("no database given and no default database set")]
    NoDatabase,

    #[error("failed to acquire a connection for `{statement}`: {source}")]
    Connection {
        statement: String,
        #[source]
        source: DriverError,
    },

    #[error("failed to prepare `{statement}`: {source}")]
    Prepare {
        statement: String,
        #[source]
        source: DriverError,
    },

    #[error("failed to bind parameters of `{statement}`: {source}")]
    Bind {
        statement: String,
        #[source]
        source: DriverError,
    },

    #[error("failed to execute `{statement}`: {source}")]
    Execute {
        statement: String,
        #[source]
        source: DriverError,
    },

    #[error("failed to read the results of `{statement}`: {source}")]
    Extract {
        statement: String,
        #[source]
        source: DriverError,
    },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl SqlError {
    /// The statement text the failed call was running, if any.
    pub fn statement(&self) -> Option<&str> {
        match self {
            Self::Connection { statement, .. }
            | Self::Prepare { statement, .. }
            | Self::Bind { statement, .. }
            | Self::Execute { statement, .. }
            | Self::Extract { statement, .. } => Some(statement),
            Self::NoDatabase | Self::Driver(_) => None,
        }
    }
}

/// A bind callback for statements without parameters.
pub fn no_params(_: &mut dyn Statement) -> Result<(), DriverError> {
    Ok(())
}

/// Runs `statement`, logging instead of returning any failure.
pub fn execute<B>(database: Option<&Database>, statement: &str, bind: B)
where
    B: FnOnce(&mut dyn Statement) -> Result<(), DriverError>,
{
    if let Err(e) = try_execute(database, statement, bind) {
        error!(statement, error = %e, "failed to execute statement");
    }
}

/// Runs `statement` as a query and hands its cursor to `rows`, logging instead
/// of returning any failure.
pub fn query<B, R>(database: Option<&Database>, statement: &str, bind: B, rows: R)
where
    B: FnOnce(&mut dyn Statement) -> Result<(), DriverError>,
    R: FnOnce(&mut dyn Cursor) -> Result<(), DriverError>,
{
    if let Err(e) = try_query(database, statement, bind, rows) {
        error!(statement, error = %e, "failed to execute query");
    }
}

/// Runs `statement` as a query and returns what `extract` reads from its
/// cursor.
///
/// Returns `None` when `extract` yields `Ok(None)` and when anything fails;
/// failures are logged.
pub fn return_query<T, B, E>(
    database: Option<&Database>,
    statement: &str,
    bind: B,
    extract: E,
) -> Option<T>
where
    B: FnOnce(&mut dyn Statement) -> Result<(), DriverError>,
    E: FnOnce(&mut dyn Cursor) -> Result<Option<T>, DriverError>,
{
    try_return_query(database, statement, bind, extract).unwrap_or_else(|e| {
        error!(statement, error = %e, "failed to execute query");
        None
    })
}

/// Runs `statement` and returns the number of rows it changed.
///
/// # Errors
///
/// [`SqlError::NoDatabase`] if `database` is `None` and no default is set,
/// otherwise the step that failed. Failures while closing resources are only
/// logged.
pub fn try_execute<B>(
    database: Option<&Database>,
    statement: &str,
    bind: B,
) -> Result<usize, SqlError>
where
    B: FnOnce(&mut dyn Statement) -> Result<(), DriverError>,
{
    debug!(statement, "executing statement");
    let changed = run(database, statement, bind, |prepared| {
        prepared
            .execute()
            .map_err(|source| SqlError::Execute {
                statement: statement.to_owned(),
                source,
            })
    })?;
    debug!(statement, changed, "finished executing statement");
    Ok(changed)
}

/// Runs `statement` as a query and hands its cursor to `rows`.
///
/// # Errors
///
/// As [`try_execute`]; an error returned by `rows` becomes
/// [`SqlError::Extract`].
pub fn try_query<B, R>(
    database: Option<&Database>,
    statement: &str,
    bind: B,
    rows: R,
) -> Result<(), SqlError>
where
    B: FnOnce(&mut dyn Statement) -> Result<(), DriverError>,
    R: FnOnce(&mut dyn Cursor) -> Result<(), DriverError>,
{
    debug!(statement, "executing query");
    run(database, statement, bind, |prepared| {
        with_cursor(prepared, statement, rows)
    })?;
    debug!(statement, "finished query");
    Ok(())
}

/// Runs `statement` as a query and returns what `extract` reads from its
/// cursor.
///
/// # Errors
///
/// As [`try_query`].
pub fn try_return_query<T, B, E>(
    database: Option<&Database>,
    statement: &str,
    bind: B,
    extract: E,
) -> Result<Option<T>, SqlError>
where
    B: FnOnce(&mut dyn Statement) -> Result<(), DriverError>,
    E: FnOnce(&mut dyn Cursor) -> Result<Option<T>, DriverError>,
{
    debug!(statement, "executing query");
    let value = run(database, statement, bind, |prepared| {
        with_cursor(prepared, statement, extract)
    })?;
    debug!(statement, found = value.is_some(), "finished query");
    Ok(value)
}

// Resolves the database, borrows a connection, prepares and binds, then hands
// the bound statement to `action`. Guards release everything on the way out.
fn run<T, B, A>(
    database: Option<&Database>,
    statement: &str,
    bind: B,
    action: A,
) -> Result<T, SqlError>
where
    B: FnOnce(&mut dyn Statement) -> Result<(), DriverError>,
    A: FnOnce(&mut dyn Statement) -> Result<T, SqlError>,
{
    let fallback;
    let database = match database {
        Some(database) => database,
        None => {
            fallback = registry::default_database().ok_or(SqlError::NoDatabase)?;
            &*fallback
        }
    };

    let conn = database
        .connection()
        .map_err(|source| SqlError::Connection {
            statement: statement.to_owned(),
            source,
        })?;
    let mut conn = Scoped::new(conn, ResourceKind::Connection, statement);

    let prepared = conn
        .prepare(statement)
        .map_err(|source| SqlError::Prepare {
            statement: statement.to_owned(),
            source,
        })?;
    let mut prepared = Scoped::new(prepared, ResourceKind::Statement, statement);

    bind(&mut *prepared).map_err(|source| SqlError::Bind {
        statement: statement.to_owned(),
        source,
    })?;

    action(&mut *prepared)
}

fn with_cursor<T, F>(prepared: &mut dyn Statement, statement: &str, read: F) -> Result<T, SqlError>
where
    F: FnOnce(&mut dyn Cursor) -> Result<T, DriverError>,
{
    let cursor = prepared.query().map_err(|source| SqlError::Execute {
        statement: statement.to_owned(),
        source,
    })?;
    let mut cursor = Scoped::new(cursor, ResourceKind::Cursor, statement);

    read(&mut *cursor).map_err(|source| SqlError::Extract {
        statement: statement.to_owned(),
        source,
    })
}
