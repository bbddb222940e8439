//! Process-wide default database.
//!
//! The embedding application registers one [`Database`] with [`set_default`];
//! the execution helpers in [`crate::sql`] fall back to it whenever they are
//! called without an explicit handle.
//!
//! The slot is guarded by a read-write lock, so a completed [`set_default`]
//! happens-before every later read on any thread. Nothing orders a
//! `set_default` against reads running at the same time: those see either the
//! old or the new database.

use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use super::Database;
use crate::driver::Connection;
use crate::sql::SqlError;

static DEFAULT_DATABASE: LazyLock<RwLock<Option<Arc<Database>>>> =
    LazyLock::new(|| RwLock::new(None));

/// Registers `database` as the default. The last caller wins.
pub fn set_default(database: Arc<Database>) {
    debug!(protocol = %database.protocol(), "setting default database");
    *DEFAULT_DATABASE.write() = Some(database);
}

/// Returns the default database, if one is set.
pub fn default_database() -> Option<Arc<Database>> {
    DEFAULT_DATABASE.read().clone()
}

/// Returns `true` if a default database is registered.
pub fn is_default_set() -> bool {
    DEFAULT_DATABASE.read().is_some()
}

/// Returns `true` if `database` is the very instance registered as default.
pub fn is_default(database: &Database) -> bool {
    DEFAULT_DATABASE
        .read()
        .as_ref()
        .is_some_and(|default| std::ptr::eq(Arc::as_ptr(default), database))
}

/// Removes the default database and returns it.
pub fn clear_default() -> Option<Arc<Database>> {
    DEFAULT_DATABASE.write().take()
}

/// Borrows a connection from the default database.
///
/// # Errors
///
/// Returns [`SqlError::NoDatabase`] if no default is set, or
/// [`SqlError::Driver`] if the default database cannot hand out a connection.
pub fn default_connection() -> Result<Box<dyn Connection>, SqlError> {
    let database = default_database().ok_or(SqlError::NoDatabase)?;
    Ok(database.connection()?)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::database::Backend;
    use crate::driver::fake::FakeSource;

    fn database() -> Arc<Database> {
        Arc::new(Database::new(Backend::sqlite_memory(), FakeSource::new()))
    }

    #[test]
    #[serial]
    fn set_and_get_return_same_instance() {
        clear_default();
        let db = database();
        set_default(Arc::clone(&db));

        let fetched = default_database().unwrap();
        assert!(Arc::ptr_eq(&db, &fetched));
        assert!(is_default_set());
        assert!(is_default(&db));
        assert!(db.is_default());

        clear_default();
    }

    #[test]
    #[serial]
    fn equal_but_distinct_handle_is_not_default() {
        clear_default();
        let registered = database();
        let twin = database();
        set_default(Arc::clone(&registered));

        assert!(!twin.is_default());
        assert!(!is_default(&twin));

        clear_default();
    }

    #[test]
    #[serial]
    fn last_write_wins() {
        clear_default();
        let first = database();
        let second = database();
        set_default(Arc::clone(&first));
        set_default(Arc::clone(&second));

        assert!(!first.is_default());
        assert!(second.is_default());

        let cleared = clear_default().unwrap();
        assert!(Arc::ptr_eq(&cleared, &second));
        assert!(!is_default_set());
    }

    #[test]
    #[serial]
    fn default_connection_requires_a_default() {
        clear_default();
        assert!(matches!(default_connection(), Err(SqlError::NoDatabase)));

        let db = database();
        set_default(Arc::clone(&db));
        let mut conn = default_connection().unwrap();
        conn.close().unwrap();
        assert!(db.is_configured());

        clear_default();
    }
}
