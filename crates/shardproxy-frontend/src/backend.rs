//! Backend connection boundary
//!
//! The front end never routes or executes SQL itself. It borrows a
//! `BackendConnection` (the logical session against the sharded backends)
//! for one command turn and gives it back on every exit path.

use crate::mysql::protocol::constants::MYSQL_TYPE_VAR_STRING;
use async_trait::async_trait;
use shardproxy_common::Result;
use std::sync::Arc;
use tracing::debug;

/// Name, type and display metadata for one result column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryHeader {
    pub schema: String,
    pub table: String,
    pub column_label: String,
    pub column_name: String,
    pub column_length: u32,
    pub column_type: u8,
    pub flags: u16,
    pub decimals: u8,
}

impl QueryHeader {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        column_name: impl Into<String>,
        column_type: u8,
    ) -> Self {
        let column_name = column_name.into();
        Self {
            schema: schema.into(),
            table: table.into(),
            column_label: column_name.clone(),
            column_name,
            column_length: 255,
            column_type,
            flags: 0,
            decimals: 0,
        }
    }

    /// Text column with no table, as produced by expressions like `SELECT 1`
    pub fn expression(label: impl Into<String>) -> Self {
        Self::new("", "", label, MYSQL_TYPE_VAR_STRING)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.column_label = label.into();
        self
    }
}

/// One row in text form; `None` is SQL NULL
pub type TextRow = Vec<Option<String>>;

/// Lazily pulled rows of a backend result set
#[async_trait]
pub trait ResultCursor: Send {
    /// Next row, or `None` once the result set is exhausted.
    /// Failures are reported as `ProxyError::RowMaterialization`.
    async fn next_row(&mut self) -> Result<Option<TextRow>>;
}

/// What the backend produced for one statement
pub enum ExecuteOutcome {
    ResultSet {
        headers: Vec<QueryHeader>,
        cursor: Box<dyn ResultCursor>,
    },
    Update {
        affected_rows: u64,
        last_insert_id: u64,
    },
}

impl std::fmt::Debug for ExecuteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecuteOutcome::ResultSet { headers, .. } => f
                .debug_struct("ResultSet")
                .field("columns", &headers.len())
                .finish(),
            ExecuteOutcome::Update {
                affected_rows,
                last_insert_id,
            } => f
                .debug_struct("Update")
                .field("affected_rows", affected_rows)
                .field("last_insert_id", last_insert_id)
                .finish(),
        }
    }
}

/// Logical session against the sharded backends.
///
/// Shared for a client connection's lifetime but held by exactly one command
/// turn at a time.
#[async_trait]
pub trait BackendConnection: Send + Sync {
    /// Block until a release/reset requested by a previous turn has completed
    async fn await_release_if_pending(&self);

    /// Return held backend resources. Called once at the end of every turn.
    fn close(&self);

    /// Number of physical backend connections currently held
    fn pool_size(&self) -> usize;

    async fn execute(&self, sql: &str) -> Result<ExecuteOutcome>;

    async fn use_schema(&self, schema: &str) -> Result<()>;

    async fn close_statement(&self, statement_id: u32) -> Result<()>;
}

/// Scoped borrow of a backend connection for one command turn.
///
/// Dropping the lease closes the connection, so every exit path of the turn
/// (normal return, mapped error, panic unwinding) releases it.
pub struct ConnectionLease {
    connection: Arc<dyn BackendConnection>,
}

impl ConnectionLease {
    pub fn new(connection: Arc<dyn BackendConnection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<dyn BackendConnection> {
        &self.connection
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        debug!(pool_size = self.connection.pool_size(), "Releasing backend connection");
        self.connection.close();
    }
}
