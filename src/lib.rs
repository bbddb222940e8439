//! # basicsql
//!
//! Pooled database handles, a process-wide default database, and statement
//! helpers that always release the cursor, statement and connection they use.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use basicsql::{Database, sql};
//!
//! let db = Arc::new(Database::sqlite_memory());
//! basicsql::set_default(Arc::clone(&db));
//!
//! sql::execute(None, "CREATE TABLE users (name TEXT, age INTEGER)", sql::no_params);
//! sql::execute(None, "INSERT INTO users VALUES (?, ?)", |s| {
//!     s.set_string(1, "Notch")?;
//!     s.set_i64(2, 45)
//! });
//!
//! let age = sql::return_query(
//!     None,
//!     "SELECT age FROM users WHERE name = ?",
//!     |s| s.set_string(1, "Notch"),
//!     |r| Ok(if r.advance()? { Some(r.get_i64("age")?) } else { None }),
//! );
//! assert_eq!(age, Some(45));
//! ```
//!
//! ## Modules
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`database`] | [`Protocol`], [`Backend`], [`Database`], default registry  |
//! | [`sql`]      | `execute` / `query` / `return_query` and strict variants  |
//! | [`driver`]   | Driver traits and the built-in pooled SQLite driver        |
//! | [`config`]   | JSON configuration for handles                             |

// ── Modules ───────────────────────────────────────────────────────────────────
pub mod config;
pub mod database;
pub mod driver;
pub mod sql;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use config::{ConfigError, DatabaseConfig};
pub use database::{
    Backend, Database, Protocol, UnknownProtocol, clear_default, default_database,
    is_default_set, set_default,
};
pub use driver::{Connection, Cursor, DataSource, DriverError, Resource, Statement, Value};
pub use sql::{SqlError, execute, query, return_query, try_execute, try_query, try_return_query};
