//! Scope guard that closes a driver resource when it goes out of scope.

use std::fmt;
use std::ops::{Deref, DerefMut};

use tracing::error;

use crate::driver::Resource;

/// The kind of resource a [`Scoped`] guard releases, for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResourceKind {
    Connection,
    Statement,
    Cursor,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connection => "connection",
            Self::Statement => "statement",
            Self::Cursor => "cursor",
        })
    }
}

/// Owns a boxed resource and closes it on drop.
///
/// Guards declared in acquisition order (connection, statement, cursor) are
/// dropped in reverse, so release always runs cursor → statement → connection.
/// A failed close is logged and does not stop the remaining guards from
/// closing their own resources.
pub(crate) struct Scoped<'a, T: Resource + ?Sized> {
    resource: Box<T>,
    kind: ResourceKind,
    statement: &'a str,
}

impl<'a, T: Resource + ?Sized> Scoped<'a, T> {
    pub(crate) fn new(resource: Box<T>, kind: ResourceKind, statement: &'a str) -> Self {
        Self {
            resource,
            kind,
            statement,
        }
    }
}

impl<T: Resource + ?Sized> Deref for Scoped<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.resource
    }
}

impl<T: Resource + ?Sized> DerefMut for Scoped<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.resource
    }
}

impl<T: Resource + ?Sized> Drop for Scoped<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.resource.close() {
            error!(
                resource = %self.kind,
                statement = self.statement,
                error = %e,
                "failed to close {}", self.kind
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::driver::DriverError;

    struct Probe {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
        fail: bool,
    }

    impl Resource for Probe {
        fn close(&mut self) -> Result<(), DriverError> {
            self.log.borrow_mut().push(self.name);
            if self.fail {
                Err(DriverError::Other("close failed".into()))
            } else {
                Ok(())
            }
        }
    }

    fn probe(name: &'static str, log: &Rc<RefCell<Vec<&'static str>>>, fail: bool) -> Box<Probe> {
        Box::new(Probe {
            name,
            log: Rc::clone(log),
            fail,
        })
    }

    #[test]
    fn releases_in_reverse_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let _conn = Scoped::new(probe("connection", &log, false), ResourceKind::Connection, "q");
            let _stmt = Scoped::new(probe("statement", &log, false), ResourceKind::Statement, "q");
            let _cursor = Scoped::new(probe("cursor", &log, false), ResourceKind::Cursor, "q");
        }
        assert_eq!(*log.borrow(), ["cursor", "statement", "connection"]);
    }

    #[test]
    fn failed_close_does_not_skip_the_rest() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let _conn = Scoped::new(probe("connection", &log, true), ResourceKind::Connection, "q");
            let _stmt = Scoped::new(probe("statement", &log, true), ResourceKind::Statement, "q");
            let _cursor = Scoped::new(probe("cursor", &log, true), ResourceKind::Cursor, "q");
        }
        assert_eq!(*log.borrow(), ["cursor", "statement", "connection"]);
    }

    #[test]
    fn releases_on_early_return() {
        fn early(log: &Rc<RefCell<Vec<&'static str>>>) -> Result<(), DriverError> {
            let _conn = Scoped::new(probe("connection", log, false), ResourceKind::Connection, "q");
            let missing: Option<()> = None;
            missing.ok_or(DriverError::NoRow)?;
            let _stmt = Scoped::new(probe("statement", log, false), ResourceKind::Statement, "q");
            Ok(())
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        assert!(early(&log).is_err());
        assert_eq!(*log.borrow(), ["connection"]);
    }
}
