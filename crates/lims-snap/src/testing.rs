//! Testing utilities
//!
//! An in-memory [`Connection`] that answers queries with canned rows, so the
//! assembler can be exercised without a LIMS database.
//!
//! # Example
//!
//! ```rust,ignore
//! use lims_snap::queries::IMAGE_DIMS_SQL;
//! use lims_snap::testing::StubConnection;
//!
//! let stub = StubConnection::new()
//!     .with_rows(IMAGE_DIMS_SQL, vec![Row::from_pairs([("width", 1000), ("height", 800)])]);
//! let dims = query_image_dims(&stub, 1).await?;
//! ```

use async_trait::async_trait;
use lims_rdbc::{Connection, Error, Result, Row, Value};
use parking_lot::Mutex;
use std::collections::HashMap;

/// A query the stub received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    /// SQL text as issued
    pub sql: String,
    /// Bound parameters
    pub params: Vec<Value>,
}

#[derive(Debug, Clone)]
enum Canned {
    Rows(Vec<Row>),
    Fail(String),
}

/// Stub query capability keyed by exact SQL text.
///
/// Unregistered queries return no rows.
#[derive(Debug, Default)]
pub struct StubConnection {
    responses: HashMap<String, Canned>,
    calls: Mutex<Vec<RecordedQuery>>,
}

impl StubConnection {
    /// Create a stub with no canned responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with `rows`
    pub fn with_rows(mut self, sql: &str, rows: Vec<Row>) -> Self {
        self.responses.insert(sql.to_string(), Canned::Rows(rows));
        self
    }

    /// Fail `sql` with a connection error carrying `message`
    pub fn fail_with(mut self, sql: &str, message: impl Into<String>) -> Self {
        self.responses
            .insert(sql.to_string(), Canned::Fail(message.into()));
        self
    }

    /// Queries received so far, in order
    pub fn calls(&self) -> Vec<RecordedQuery> {
        self.calls.lock().clone()
    }

    /// Whether `sql` has been issued
    pub fn was_queried(&self, sql: &str) -> bool {
        self.calls.lock().iter().any(|c| c.sql == sql)
    }
}

#[async_trait]
impl Connection for StubConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.calls.lock().push(RecordedQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        match self.responses.get(sql) {
            Some(Canned::Rows(rows)) => Ok(rows.clone()),
            Some(Canned::Fail(message)) => Err(Error::connection(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}
