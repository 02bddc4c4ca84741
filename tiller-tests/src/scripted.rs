use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::Arc,
};
use tiller::{Envelope, Result, Transport, WireValue, future};

#[derive(Default)]
struct Script {
    tables: HashMap<String, Vec<String>>,
    replies: VecDeque<Envelope>,
    statements: Vec<String>,
    introspections: Vec<String>,
}

/// In memory transport replaying queued envelopes.
///
/// Introspection statements (`SELECT * FROM <table> LIMIT 0`) are answered from the registered
/// tables, every other statement is recorded and answered with the next queued envelope (an empty
/// successful envelope when the queue is empty). Clones share the same script, keep one around to
/// inspect the statements once the transport was moved into a database.
#[derive(Default, Clone)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers the live columns of `table`.
    pub fn table<S: Into<String>>(
        &self,
        table: &str,
        columns: impl IntoIterator<Item = S>,
    ) -> &Self {
        self.script.lock().tables.insert(
            table.into(),
            columns.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn reply(&self, envelope: Envelope) -> &Self {
        self.script.lock().replies.push_back(envelope);
        self
    }

    /// Queues a result set with the given columns and rows.
    pub fn reply_rows<S: Into<String>>(
        &self,
        columns: impl IntoIterator<Item = S>,
        rows: impl IntoIterator<Item = Vec<WireValue>>,
    ) -> &Self {
        self.reply(Envelope::rows(columns, rows))
    }

    pub fn reply_affected(&self, count: u64, last_insert_id: Option<i64>) -> &Self {
        self.reply(Envelope::affected(count, last_insert_id))
    }

    pub fn reply_error(&self, code: &str, message: &str) -> &Self {
        self.reply(Envelope::failed(code, message))
    }

    /// Statements received so far, introspection excluded.
    pub fn statements(&self) -> Vec<String> {
        self.script.lock().statements.clone()
    }

    /// Same as [`ScriptedTransport::statements`], clearing them.
    pub fn take_statements(&self) -> Vec<String> {
        std::mem::take(&mut self.script.lock().statements)
    }

    pub fn introspections(&self) -> Vec<String> {
        self.script.lock().introspections.clone()
    }

    /// Number of queued envelopes not consumed yet.
    pub fn pending(&self) -> usize {
        self.script.lock().replies.len()
    }

    fn respond(&self, sql: String) -> Envelope {
        let mut script = self.script.lock();
        let introspected = sql
            .strip_prefix("SELECT * FROM ")
            .and_then(|v| v.strip_suffix(" LIMIT 0"))
            .map(str::to_string);
        if let Some(table) = introspected {
            script.introspections.push(sql);
            return match script.tables.get(&table) {
                Some(columns) => Envelope::rows(columns.clone(), Vec::<Vec<WireValue>>::new()),
                None => Envelope::failed("SQLITE_ERROR", format!("no such table: {table}")),
            };
        }
        log::trace!("Scripted transport received: {sql}");
        script.statements.push(sql);
        script.replies.pop_front().unwrap_or_default()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&mut self, sql: String) -> impl Future<Output = Result<Envelope>> + Send {
        future::ready(Ok(self.respond(sql)))
    }
}
