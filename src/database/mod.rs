//! Database handles: a configured data source plus its connection parameters.
//!
//! A [`Database`] owns exactly one [`DataSource`] for its whole lifetime. The
//! source is configured lazily: the first [`Database::connection`] call (or an
//! explicit [`Database::configure`]) hands it the URL built by the handle's
//! [`Backend`] and, for backends that authenticate, the credentials. Later
//! `configure` calls do nothing.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use basicsql::database::{self, Database};
//!
//! let db = Arc::new(Database::sqlite_memory());
//! database::set_default(Arc::clone(&db));
//! assert!(db.is_default());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::debug;

mod backend;
pub mod registry;

pub use backend::{Backend, Protocol, UnknownProtocol};
pub use registry::{
    clear_default, default_connection, default_database, is_default_set, set_default,
};

use crate::config::{ConfigError, DatabaseConfig};
use crate::driver::{Connection, Cursor, DataSource, DriverError, SqliteSource, Statement};
use crate::sql;

/// A handle to one database.
///
/// `Database` is `Send + Sync`; share it behind an [`Arc`](std::sync::Arc).
pub struct Database {
    backend: Backend,
    // Write-locked only while configuring.
    source: RwLock<Box<dyn DataSource>>,
    configured: AtomicBool,
}

impl Database {
    /// Creates a handle for `backend` that draws connections from `source`.
    ///
    /// Nothing is configured or opened until the first connection is requested.
    pub fn new(backend: Backend, source: impl DataSource + 'static) -> Self {
        Self {
            backend,
            source: RwLock::new(Box::new(source)),
            configured: AtomicBool::new(false),
        }
    }

    /// A file-backed SQLite database using the built-in driver.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new(Backend::sqlite(path), SqliteSource::new())
    }

    /// A private in-memory SQLite database using the built-in driver.
    ///
    /// The database lives inside a single pooled connection, so only one
    /// connection can be out at a time. Calling a helper on the same handle
    /// from inside another helper's row or extract callback waits for the
    /// pool's connection timeout (30 seconds by default) and then fails with
    /// [`DriverError::Pool`].
    pub fn sqlite_memory() -> Self {
        Self::new(Backend::sqlite_memory(), SqliteSource::new())
    }

    /// Builds a handle from configuration, using the built-in driver.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedBackend`] for backends this crate has
    /// no driver for. Use [`Database::new`] with your own [`DataSource`] for those.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, ConfigError> {
        match config.backend.protocol() {
            Protocol::Sqlite => Ok(Self::new(
                config.backend.clone(),
                SqliteSource::with_settings(config.pool.clone()),
            )),
            protocol => Err(ConfigError::UnsupportedBackend(protocol)),
        }
    }

    /// The connection settings this handle was built with.
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn protocol(&self) -> Protocol {
        self.backend.protocol()
    }

    pub fn is_memory(&self) -> bool {
        self.backend.is_memory()
    }

    /// Hands the connection URL and credentials to the data source.
    ///
    /// Only the first call has an effect; the data source keeps its settings
    /// for the rest of the handle's life.
    pub fn configure(&self) {
        if self.is_configured() {
            return;
        }

        let mut source = self.source.write();
        // Another thread may have configured while we waited for the lock.
        if self.is_configured() {
            return;
        }

        let url = self.backend.connection_url();
        source.set_url(&url);
        if let Some((username, password)) = self.backend.credentials() {
            source.set_credentials(username, password);
        }
        self.configured.store(true, Ordering::Release);

        debug!(protocol = %self.protocol(), url = %url, "database configured");
    }

    /// Returns `true` once the data source has been handed its URL.
    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    /// Returns the URL currently set on the data source.
    ///
    /// `None` until the handle has been configured.
    pub fn url(&self) -> Option<String> {
        self.source.read().url().map(str::to_owned)
    }

    /// Borrows a connection from the data source, configuring it first if needed.
    ///
    /// # Errors
    ///
    /// Whatever the data source reports; failures are never retried here.
    pub fn connection(&self) -> Result<Box<dyn Connection>, DriverError> {
        self.configure();
        self.source.read().get_connection()
    }

    /// Returns `true` if this handle is the registered default database.
    pub fn is_default(&self) -> bool {
        registry::is_default(self)
    }

    /// Runs [`sql::execute`] against this database.
    pub fn execute<B>(&self, statement: &str, bind: B)
    where
        B: FnOnce(&mut dyn Statement) -> Result<(), DriverError>,
    {
        sql::execute(Some(self), statement, bind);
    }

    /// Runs [`sql::query`] against this database.
    pub fn query<B, R>(&self, statement: &str, bind: B, rows: R)
    where
        B: FnOnce(&mut dyn Statement) -> Result<(), DriverError>,
        R: FnOnce(&mut dyn Cursor) -> Result<(), DriverError>,
    {
        sql::query(Some(self), statement, bind, rows);
    }

    /// Runs [`sql::return_query`] against this database.
    pub fn return_query<T, B, E>(&self, statement: &str, bind: B, extract: E) -> Option<T>
    where
        B: FnOnce(&mut dyn Statement) -> Result<(), DriverError>,
        E: FnOnce(&mut dyn Cursor) -> Result<Option<T>, DriverError>,
    {
        sql::return_query(Some(self), statement, bind, extract)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.backend)
            .field("configured", &self.is_configured())
            .finish_non_exhaustive()
    }
}
