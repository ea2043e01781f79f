//! Test doubles: scripted backend, recording transport and hook

use crate::backend::{BackendConnection, ExecuteOutcome, QueryHeader, ResultCursor, TextRow};
use crate::hook::InvocationHook;
use crate::mysql::protocol::MySqlPacket;
use crate::transport::{Transport, WritabilitySignal};
use async_trait::async_trait;
use parking_lot::Mutex;
use shardproxy_common::{ProxyError, Result, SqlError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Single-column rows "1".."n"
pub fn text_rows(n: usize) -> Vec<TextRow> {
    (1..=n).map(|i| vec![Some(i.to_string())]).collect()
}

#[derive(Clone)]
enum RowFailure {
    Sql(SqlError),
    Internal(String),
}

impl RowFailure {
    fn to_error(&self) -> ProxyError {
        match self {
            RowFailure::Sql(e) => ProxyError::RowMaterialization(e.clone()),
            RowFailure::Internal(message) => ProxyError::Internal(message.clone()),
        }
    }
}

#[derive(Default)]
struct Script {
    result_set: Option<(Vec<QueryHeader>, Vec<TextRow>)>,
    update: Option<(u64, u64)>,
    execute_error: Option<SqlError>,
    row_failure: Option<(usize, RowFailure)>,
    schema_error: Option<SqlError>,
    panic: Option<String>,
    executed_sql: Vec<String>,
    schemas: Vec<String>,
    closed_statements: Vec<u32>,
}

/// Backend connection answering from a script
pub struct ScriptedBackend {
    script: Mutex<Script>,
    close_count: AtomicUsize,
    pool_size: AtomicUsize,
    release_pending: AtomicBool,
    released: Notify,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Script::default()),
            close_count: AtomicUsize::new(0),
            pool_size: AtomicUsize::new(1),
            release_pending: AtomicBool::new(false),
            released: Notify::new(),
        })
    }

    pub fn with_result_set(
        self: Arc<Self>,
        headers: Vec<QueryHeader>,
        rows: Vec<TextRow>,
    ) -> Arc<Self> {
        self.script.lock().result_set = Some((headers, rows));
        self
    }

    pub fn with_update(self: Arc<Self>, affected_rows: u64, last_insert_id: u64) -> Arc<Self> {
        self.script.lock().update = Some((affected_rows, last_insert_id));
        self
    }

    pub fn with_execute_error(self: Arc<Self>, error: SqlError) -> Arc<Self> {
        self.script.lock().execute_error = Some(error);
        self
    }

    /// The cursor yields `after` rows, then fails with a backend error
    pub fn with_row_failure(self: Arc<Self>, after: usize, error: SqlError) -> Arc<Self> {
        self.script.lock().row_failure = Some((after, RowFailure::Sql(error)));
        self
    }

    /// The cursor yields `after` rows, then fails with an internal error
    pub fn with_row_internal_failure(self: Arc<Self>, after: usize, message: &str) -> Arc<Self> {
        self.script.lock().row_failure = Some((after, RowFailure::Internal(message.to_string())));
        self
    }

    pub fn with_schema_error(self: Arc<Self>, error: SqlError) -> Arc<Self> {
        self.script.lock().schema_error = Some(error);
        self
    }

    /// `execute` panics with `message`
    pub fn with_panic(self: Arc<Self>, message: &str) -> Arc<Self> {
        self.script.lock().panic = Some(message.to_string());
        self
    }

    pub fn with_pool_size(self: Arc<Self>, pool_size: usize) -> Arc<Self> {
        self.pool_size.store(pool_size, Ordering::SeqCst);
        self
    }

    /// `await_release_if_pending` blocks until `complete_release`
    pub fn with_pending_release(self: Arc<Self>) -> Arc<Self> {
        self.release_pending.store(true, Ordering::SeqCst);
        self
    }

    pub fn complete_release(&self) {
        self.release_pending.store(false, Ordering::SeqCst);
        self.released.notify_one();
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.script.lock().executed_sql.clone()
    }

    pub fn schemas(&self) -> Vec<String> {
        self.script.lock().schemas.clone()
    }

    pub fn closed_statements(&self) -> Vec<u32> {
        self.script.lock().closed_statements.clone()
    }
}

#[async_trait]
impl BackendConnection for ScriptedBackend {
    async fn await_release_if_pending(&self) {
        while self.release_pending.load(Ordering::SeqCst) {
            self.released.notified().await;
        }
    }

    fn close(&self) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }

    fn pool_size(&self) -> usize {
        self.pool_size.load(Ordering::SeqCst)
    }

    async fn execute(&self, sql: &str) -> Result<ExecuteOutcome> {
        let mut script = self.script.lock();
        if let Some(message) = script.panic.clone() {
            drop(script);
            panic!("{}", message);
        }
        script.executed_sql.push(sql.to_string());
        if let Some(error) = script.execute_error.clone() {
            return Err(ProxyError::Execution(error));
        }
        if let Some((headers, rows)) = script.result_set.clone() {
            let cursor = ScriptedCursor {
                rows: rows.into(),
                delivered: 0,
                failure: script.row_failure.clone(),
            };
            return Ok(ExecuteOutcome::ResultSet {
                headers,
                cursor: Box::new(cursor),
            });
        }
        let (affected_rows, last_insert_id) = script.update.unwrap_or((0, 0));
        Ok(ExecuteOutcome::Update {
            affected_rows,
            last_insert_id,
        })
    }

    async fn use_schema(&self, schema: &str) -> Result<()> {
        let mut script = self.script.lock();
        script.schemas.push(schema.to_string());
        match script.schema_error.clone() {
            Some(error) => Err(ProxyError::Execution(error)),
            None => Ok(()),
        }
    }

    async fn close_statement(&self, statement_id: u32) -> Result<()> {
        self.script.lock().closed_statements.push(statement_id);
        Ok(())
    }
}

struct ScriptedCursor {
    rows: VecDeque<TextRow>,
    delivered: usize,
    failure: Option<(usize, RowFailure)>,
}

#[async_trait]
impl ResultCursor for ScriptedCursor {
    async fn next_row(&mut self) -> Result<Option<TextRow>> {
        if let Some((after, failure)) = &self.failure {
            if self.delivered == *after {
                return Err(failure.to_error());
            }
        }
        let row = self.rows.pop_front();
        if row.is_some() {
            self.delivered += 1;
        }
        Ok(row)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Write(MySqlPacket),
    Flush,
}

struct TransportState {
    events: Vec<TransportEvent>,
    writable: bool,
    active: bool,
    writes: usize,
    block_after: Option<usize>,
    close_after: Option<usize>,
    writes_while_unwritable: usize,
    blocked_observed: bool,
}

/// Transport that records every write and flush, with scriptable
/// writability. Clones share state so a test can steer it from another task.
#[derive(Clone)]
pub struct RecordingTransport {
    state: Arc<Mutex<TransportState>>,
    signal: Arc<WritabilitySignal>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TransportState {
                events: Vec::new(),
                writable: true,
                active: true,
                writes: 0,
                block_after: None,
                close_after: None,
                writes_while_unwritable: 0,
                blocked_observed: false,
            })),
            signal: Arc::new(WritabilitySignal::new()),
        }
    }

    /// Turn unwritable once `n` packets have been written
    pub fn block_after_writes(&self, n: usize) {
        self.state.lock().block_after = Some(n);
    }

    /// Turn inactive once `n` packets have been written
    pub fn close_after_writes(&self, n: usize) {
        self.state.lock().close_after = Some(n);
    }

    pub fn set_writable(&self, writable: bool) {
        self.state.lock().writable = writable;
        if writable {
            self.signal.notify();
        }
    }

    pub fn set_active(&self, active: bool) {
        self.state.lock().active = active;
        self.signal.notify();
    }

    /// Resolve once a writer has seen the transport unwritable
    pub async fn wait_until_blocked(&self) {
        loop {
            let blocked = self.state.lock().blocked_observed;
            if blocked {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    pub fn events(&self) -> Vec<TransportEvent> {
        self.state.lock().events.clone()
    }

    pub fn written(&self) -> Vec<MySqlPacket> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                TransportEvent::Write(packet) => Some(packet.clone()),
                TransportEvent::Flush => None,
            })
            .collect()
    }

    pub fn flush_count(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e, TransportEvent::Flush))
            .count()
    }

    /// For each flush, how many packets had been written before it
    pub fn writes_before_each_flush(&self) -> Vec<usize> {
        let mut writes = 0;
        let mut counts = Vec::new();
        for event in self.state.lock().events.iter() {
            match event {
                TransportEvent::Write(_) => writes += 1,
                TransportEvent::Flush => counts.push(writes),
            }
        }
        counts
    }

    pub fn writes_while_unwritable(&self) -> usize {
        self.state.lock().writes_while_unwritable
    }
}

impl Transport for RecordingTransport {
    fn write(&mut self, packet: MySqlPacket) -> std::io::Result<()> {
        let mut state = self.state.lock();
        if !state.active {
            return Ok(());
        }
        if !state.writable {
            state.writes_while_unwritable += 1;
        }
        state.events.push(TransportEvent::Write(packet));
        state.writes += 1;
        if state.block_after == Some(state.writes) {
            state.block_after = None;
            state.writable = false;
        }
        if state.close_after == Some(state.writes) {
            state.active = false;
        }
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut state = self.state.lock();
        if state.active {
            state.events.push(TransportEvent::Flush);
        }
        Ok(())
    }

    fn is_writable(&self) -> bool {
        let mut state = self.state.lock();
        if !state.writable {
            state.blocked_observed = true;
        }
        state.writable
    }

    fn is_active(&self) -> bool {
        self.state.lock().active
    }

    fn writability(&self) -> Arc<WritabilitySignal> {
        self.signal.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    Start,
    Finish(usize),
}

/// Hook that records its calls; clones share the record
#[derive(Clone, Default)]
pub struct RecordingHook {
    events: Arc<Mutex<Vec<HookEvent>>>,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().clone()
    }
}

impl InvocationHook for RecordingHook {
    fn start(&mut self) {
        self.events.lock().push(HookEvent::Start);
    }

    fn finish(&mut self, connection_count: usize) {
        self.events.lock().push(HookEvent::Finish(connection_count));
    }
}
