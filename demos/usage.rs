//! Walks through the statement helpers against an in-memory SQLite database.
//!
//! Run with `RUST_LOG=basicsql=debug cargo run --example usage` to watch each
//! statement being prepared and released.

use std::sync::Arc;

use basicsql::{Cursor, Database, DriverError, sql};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Helpers called with `None` use the default database.
    let db = Arc::new(Database::sqlite_memory());
    basicsql::set_default(Arc::clone(&db));

    sql::try_execute(
        None,
        "CREATE TABLE users (name TEXT PRIMARY KEY, age INTEGER NOT NULL)",
        sql::no_params,
    )?;

    for (name, age) in [("FerusGrim", 27), ("Notch", 45), ("jeb_", 44)] {
        sql::execute(None, "INSERT INTO users (name, age) VALUES (?, ?)", |s| {
            s.set_string(1, name)?;
            s.set_i64(2, age)
        });
    }

    // A handle can also be passed explicitly.
    db.execute("DELETE FROM users WHERE name = ?", |s| s.set_string(1, "jeb_"));

    sql::query(None, "SELECT name, age FROM users ORDER BY age", sql::no_params, |r| {
        while r.advance()? {
            info!(name = %r.get_string("name")?, age = r.get_i64("age")?, "user");
        }
        Ok(())
    });

    info!(age = get_age("FerusGrim"), "FerusGrim");
    info!(age = get_age("jeb_"), "jeb_ (deleted)");

    // Failures in the lenient helpers are logged, not returned.
    sql::execute(None, "INSERT INTO missing_table VALUES (1)", sql::no_params);

    Ok(())
}

fn get_age(user: &str) -> i64 {
    sql::return_query(
        None,
        "SELECT age FROM users WHERE name = ?",
        |s| s.set_string(1, user),
        first_age,
    )
    .unwrap_or(-1)
}

fn first_age(r: &mut dyn Cursor) -> Result<Option<i64>, DriverError> {
    if r.advance()? {
        Ok(Some(r.get_i64("age")?))
    } else {
        Ok(None)
    }
}
