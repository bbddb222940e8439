//! Supported protocols and the per-backend connection parameters.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Query string appended to every MySQL connection URL.
const MYSQL_OPTIONS: &str = "autoReconnect=true&useSSL=false&rewriteBatchedStatements=true";

/// A database protocol and its URL scheme.
///
/// # Examples
///
/// ```
/// use basicsql::database::Protocol;
///
/// let protocol: Protocol = "SQLite".parse().unwrap();
/// assert_eq!(protocol, Protocol::Sqlite);
/// assert_eq!(protocol.scheme(), "sqlite");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    MySql,
    Sqlite,
    H2,
}

impl Protocol {
    /// Every supported protocol.
    pub const ALL: [Protocol; 3] = [Self::MySql, Self::Sqlite, Self::H2];

    /// Returns the URL scheme for this protocol.
    pub fn scheme(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
            Self::H2 => "h2",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Returned when parsing text that names no supported protocol.
#[derive(Debug, Error)]
#[error("unknown protocol `{0}`")]
pub struct UnknownProtocol(pub String);

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.scheme().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownProtocol(s.to_owned()))
    }
}

/// Connection parameters for one database.
///
/// Each variant knows how to render the connection URL its data source
/// expects; see [`connection_url`](Self::connection_url).
///
/// Deserializes from a map tagged by `protocol`:
///
/// ```json
/// { "protocol": "mysql", "host": "localhost", "port": 3306,
///   "database": "basicsql", "username": "root", "password": "secret" }
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum Backend {
    MySql {
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
    },
    /// An empty `path` selects a private in-memory database.
    Sqlite {
        #[serde(default)]
        path: String,
    },
    H2 {
        #[serde(default)]
        path: String,
        #[serde(default)]
        memory: bool,
    },
}

impl Backend {
    /// A MySQL server database. The credentials are set on the data source,
    /// not written into the URL.
    pub fn mysql(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::MySql {
            host: host.into(),
            port,
            database: database.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// A file-backed SQLite database. An empty path means in-memory.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::Sqlite { path: path.into() }
    }

    /// A private in-memory SQLite database.
    pub fn sqlite_memory() -> Self {
        Self::sqlite("")
    }

    /// A file-backed H2 database.
    pub fn h2(path: impl Into<String>) -> Self {
        Self::H2 {
            path: path.into(),
            memory: false,
        }
    }

    /// A named in-memory H2 database.
    pub fn h2_memory(name: impl Into<String>) -> Self {
        Self::H2 {
            path: name.into(),
            memory: true,
        }
    }

    /// The protocol this backend speaks.
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::MySql { .. } => Protocol::MySql,
            Self::Sqlite { .. } => Protocol::Sqlite,
            Self::H2 { .. } => Protocol::H2,
        }
    }

    /// Returns `true` if the database lives only in memory.
    pub fn is_memory(&self) -> bool {
        match self {
            Self::MySql { .. } => false,
            Self::Sqlite { path } => path.is_empty(),
            Self::H2 { memory, .. } => *memory,
        }
    }

    /// Username and password, for backends that authenticate.
    ///
    /// Credentials are handed to the data source separately and never appear
    /// in [`connection_url`](Self::connection_url).
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match self {
            Self::MySql {
                username, password, ..
            } => Some((username.as_str(), password.as_str())),
            Self::Sqlite { .. } | Self::H2 { .. } => None,
        }
    }

    /// Builds the connection URL for this backend.
    ///
    /// | Backend          | URL                                             |
    /// |------------------|-------------------------------------------------|
    /// | MySQL            | `mysql://<host>:<port>/<database>?autoReconnect=true&useSSL=false&rewriteBatchedStatements=true` |
    /// | SQLite, memory   | `sqlite::memory`                                |
    /// | SQLite, file     | `sqlite:<path>`                                 |
    /// | H2, memory       | `h2:mem:<path>`                                 |
    /// | H2, file         | `h2:<path>`                                     |
    ///
    /// # Examples
    ///
    /// ```
    /// use basicsql::database::Backend;
    ///
    /// let backend = Backend::mysql("localhost", 3306, "basicsql", "root", "secret");
    /// assert_eq!(
    ///     backend.connection_url(),
    ///     "mysql://localhost:3306/basicsql?autoReconnect=true&useSSL=false&rewriteBatchedStatements=true"
    /// );
    /// ```
    pub fn connection_url(&self) -> String {
        let scheme = self.protocol().scheme();
        match self {
            Self::MySql {
                host,
                port,
                database,
                ..
            } => format!("{scheme}://{host}:{port}/{database}?{MYSQL_OPTIONS}"),
            Self::Sqlite { path } if path.is_empty() => format!("{scheme}::memory"),
            Self::Sqlite { path } => format!("{scheme}:{path}"),
            Self::H2 { path, memory: true } => format!("{scheme}:mem:{path}"),
            Self::H2 { path, memory: false } => format!("{scheme}:{path}"),
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MySql {
                host,
                port,
                database,
                username,
                ..
            } => f
                .debug_struct("MySql")
                .field("host", host)
                .field("port", port)
                .field("database", database)
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Sqlite { path } => f.debug_struct("Sqlite").field("path", path).finish(),
            Self::H2 { path, memory } => f
                .debug_struct("H2")
                .field("path", path)
                .field("memory", memory)
                .finish(),
        }
    }
}
