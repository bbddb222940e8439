//! In-process fake driver that records every open and close.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{Connection, Cursor, DataSource, DriverError, Resource, Statement, Value};

/// Shared log of everything the fake driver did.
#[derive(Debug, Default)]
pub(crate) struct Tracker {
    state: Mutex<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    open: usize,
    prepared: Vec<String>,
    bound: Vec<(usize, Value)>,
    executed: usize,
    closed: Vec<&'static str>,
    url_writes: usize,
    credentials: Option<(String, String)>,
}

impl Tracker {
    /// Resources opened and not yet closed.
    pub(crate) fn open(&self) -> usize {
        self.state.lock().open
    }

    pub(crate) fn prepared(&self) -> Vec<String> {
        self.state.lock().prepared.clone()
    }

    pub(crate) fn bound(&self) -> Vec<(usize, Value)> {
        self.state.lock().bound.clone()
    }

    pub(crate) fn executed(&self) -> usize {
        self.state.lock().executed
    }

    /// Resource kinds in the order they were closed.
    pub(crate) fn closed(&self) -> Vec<&'static str> {
        self.state.lock().closed.clone()
    }

    /// How many times `set_url` was called on the source.
    pub(crate) fn url_writes(&self) -> usize {
        self.state.lock().url_writes
    }

    pub(crate) fn credentials(&self) -> Option<(String, String)> {
        self.state.lock().credentials.clone()
    }

    fn opened(&self) {
        self.state.lock().open += 1;
    }

    fn release(&self, kind: &'static str) {
        let mut state = self.state.lock();
        state.open -= 1;
        state.closed.push(kind);
    }
}

/// Which step of a call the fake should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    Connect,
    Prepare,
    Execute,
    Query,
    Close(&'static str),
}

#[derive(Debug, Clone, Default)]
struct Script {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    failures: Vec<Failure>,
}

impl Script {
    fn fails(&self, failure: Failure) -> bool {
        self.failures.contains(&failure)
    }

    fn fail(&self, failure: Failure) -> Result<(), DriverError> {
        if self.fails(failure) {
            Err(DriverError::Other(format!("injected {failure:?} failure")))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeSource {
    url: Option<String>,
    script: Script,
    tracker: Arc<Tracker>,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_rows(mut self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.script.columns = columns.iter().map(|c| (*c).to_owned()).collect();
        self.script.rows = rows;
        self
    }

    /// Adds a step to fail. Calls chain, so several steps can fail at once.
    pub(crate) fn failing(mut self, failure: Failure) -> Self {
        self.script.failures.push(failure);
        self
    }

    pub(crate) fn tracker(&self) -> Arc<Tracker> {
        Arc::clone(&self.tracker)
    }
}

impl DataSource for FakeSource {
    fn set_url(&mut self, url: &str) {
        self.url = Some(url.to_owned());
        self.tracker.state.lock().url_writes += 1;
    }

    fn set_credentials(&mut self, username: &str, password: &str) {
        self.tracker.state.lock().credentials = Some((username.to_owned(), password.to_owned()));
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn get_connection(&self) -> Result<Box<dyn Connection>, DriverError> {
        if self.url.is_none() {
            return Err(DriverError::NotConfigured);
        }
        self.script.fail(Failure::Connect)?;
        self.tracker.opened();
        Ok(Box::new(FakeConnection {
            script: self.script.clone(),
            tracker: Arc::clone(&self.tracker),
            closed: false,
        }))
    }
}

struct FakeConnection {
    script: Script,
    tracker: Arc<Tracker>,
    closed: bool,
}

fn close_once(
    closed: &mut bool,
    kind: &'static str,
    script: &Script,
    tracker: &Tracker,
) -> Result<(), DriverError> {
    if *closed {
        return Ok(());
    }
    *closed = true;
    tracker.release(kind);
    script.fail(Failure::Close(kind))
}

impl Resource for FakeConnection {
    fn close(&mut self) -> Result<(), DriverError> {
        close_once(&mut self.closed, "connection", &self.script, &self.tracker)
    }
}

impl Connection for FakeConnection {
    fn prepare<'c>(&'c mut self, sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError> {
        if self.closed {
            return Err(DriverError::Closed("connection"));
        }
        self.script.fail(Failure::Prepare)?;
        self.tracker.opened();
        self.tracker.state.lock().prepared.push(sql.to_owned());
        Ok(Box::new(FakeStatement {
            script: &self.script,
            tracker: &self.tracker,
            closed: false,
        }))
    }
}

struct FakeStatement<'c> {
    script: &'c Script,
    tracker: &'c Tracker,
    closed: bool,
}

impl Resource for FakeStatement<'_> {
    fn close(&mut self) -> Result<(), DriverError> {
        close_once(&mut self.closed, "statement", self.script, self.tracker)
    }
}

impl Statement for FakeStatement<'_> {
    fn bind(&mut self, index: usize, value: Value) -> Result<(), DriverError> {
        self.tracker.state.lock().bound.push((index, value));
        Ok(())
    }

    fn execute(&mut self) -> Result<usize, DriverError> {
        self.script.fail(Failure::Execute)?;
        self.tracker.state.lock().executed += 1;
        Ok(1)
    }

    fn query<'s>(&'s mut self) -> Result<Box<dyn Cursor + 's>, DriverError> {
        self.script.fail(Failure::Query)?;
        self.tracker.opened();
        Ok(Box::new(FakeCursor {
            script: self.script,
            tracker: self.tracker,
            position: None,
            closed: false,
        }))
    }
}

struct FakeCursor<'s> {
    script: &'s Script,
    tracker: &'s Tracker,
    position: Option<usize>,
    closed: bool,
}

impl Resource for FakeCursor<'_> {
    fn close(&mut self) -> Result<(), DriverError> {
        close_once(&mut self.closed, "cursor", self.script, self.tracker)
    }
}

impl Cursor for FakeCursor<'_> {
    fn advance(&mut self) -> Result<bool, DriverError> {
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next);
        Ok(next < self.script.rows.len())
    }

    fn columns(&self) -> &[String] {
        &self.script.columns
    }

    fn value(&self, index: usize) -> Result<&Value, DriverError> {
        let row = self
            .position
            .and_then(|p| self.script.rows.get(p))
            .ok_or(DriverError::NoRow)?;
        row.get(index).ok_or(DriverError::ColumnOutOfRange {
            index,
            count: row.len(),
        })
    }
}
