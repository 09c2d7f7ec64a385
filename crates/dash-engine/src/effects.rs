//! Handler effect context
//!
//! Handlers touch the outside world only through [`HandlerContext`]:
//!
//! - `select`: synchronous read of the current snapshot
//! - `call`: await a collaborator future, racing cancellation
//! - `put`: synchronous, atomic store mutation
//! - `dispatch_event`: immediate delivery to subscribers
//!
//! Each effect is appended to a trace returned with the command outcome.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use dash_core::{DashboardState, EngineConfig};
use dash_store::{Mutation, MutationOutput, Selector, Snapshot};

use crate::backend::{Backend, BackendError};
use crate::command::{Command, CommandPayload};
use crate::dispatcher::{CommandOutcome, Dispatcher};
use crate::error::{CommandError, CommandResult};
use crate::event::{Event, EventPayload};
use crate::undo::{CommandOrigin, UndoEntry, UndoLog};

/// One recorded handler instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", content = "name", rename_all = "camelCase")]
pub enum Effect {
    Select(String),
    Call(String),
    Put(String),
    PushUndo(String),
    DispatchEvent(String),
}

/// Inverse recorded by a handler, committed to the undo log by the dispatcher
#[derive(Debug, Clone)]
pub(crate) struct PendingUndo {
    pub inverse: CommandPayload,
    pub description: String,
    pub tab: Option<String>,
}

pub struct HandlerContext {
    dispatcher: Dispatcher,
    correlation_id: String,
    command: &'static str,
    origin: CommandOrigin,
    cancel: watch::Receiver<bool>,
    trace: Vec<Effect>,
    puts: usize,
    pending_undo: Vec<PendingUndo>,
}

impl HandlerContext {
    pub(crate) fn new(
        dispatcher: Dispatcher,
        correlation_id: String,
        command: &'static str,
        origin: CommandOrigin,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            dispatcher,
            correlation_id,
            command,
            origin,
            cancel,
            trace: Vec::new(),
            puts: 0,
            pending_undo: Vec::new(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn origin(&self) -> CommandOrigin {
        self.origin
    }

    pub fn config(&self) -> &EngineConfig {
        self.dispatcher.config()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Read from the current snapshot
    pub fn select<T>(&mut self, name: &str, f: impl FnOnce(&DashboardState) -> T) -> T {
        self.trace.push(Effect::Select(name.to_string()));
        let snapshot = self.dispatcher.snapshot();
        f(snapshot.state())
    }

    /// Run a memoized selector against the current snapshot
    pub fn select_memo<S: Selector>(&mut self, selector: &S) -> Arc<S::Output> {
        let name = std::any::type_name::<S>()
            .rsplit("::")
            .next()
            .unwrap_or("selector");
        self.trace.push(Effect::Select(name.to_string()));
        self.dispatcher.snapshot().select(selector)
    }

    /// Current snapshot without recording an effect
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.dispatcher.snapshot()
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        self.dispatcher.backend()
    }

    /// Await a collaborator future.
    ///
    /// Cancellation wins over a pending future. Collaborator errors map to
    /// `INTERNAL_ERROR`; handlers that know better classify them with
    /// `map_err` on the future before passing it in.
    pub async fn call<T, F>(&mut self, name: &str, fut: F) -> CommandResult<T>
    where
        F: Future<Output = Result<T, BackendError>> + Send,
    {
        self.trace.push(Effect::Call(name.to_string()));
        if self.is_cancelled() {
            return Err(CommandError::Cancelled);
        }
        let mut cancel = self.cancel.clone();
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                debug!("{} cancelled during {}", self.correlation_id, name);
                Err(CommandError::Cancelled)
            }
            result = fut => result.map_err(|source| CommandError::Backend {
                operation: name.to_string(),
                source,
            }),
        }
    }

    /// Apply a mutation; refused once the command was cancelled
    pub fn put(&mut self, mutation: Mutation) -> CommandResult<MutationOutput> {
        if self.is_cancelled() {
            return Err(CommandError::Cancelled);
        }
        let (output, version) = self.dispatcher.store().apply(&mutation)?;
        debug!(
            "{} put {} -> version {}",
            self.correlation_id,
            mutation.name(),
            version
        );
        self.trace.push(Effect::Put(mutation.name().to_string()));
        self.puts += 1;
        Ok(output)
    }

    /// Record the command that reverts what this handler just applied
    pub fn push_undo(&mut self, inverse: CommandPayload, description: impl Into<String>) {
        self.trace.push(Effect::PushUndo(inverse.kind().to_string()));
        let tab = if inverse.is_tab_scoped() {
            self.dispatcher
                .snapshot()
                .state()
                .active_tab_local_identifier
                .clone()
        } else {
            None
        };
        self.pending_undo.push(PendingUndo {
            inverse,
            description: description.into(),
            tab,
        });
    }

    /// Emit an intermediate event under this command's correlation id
    pub fn dispatch_event(&mut self, payload: EventPayload) {
        self.trace.push(Effect::DispatchEvent(payload.kind().to_string()));
        self.dispatcher
            .emit(Event::new(self.correlation_id.clone(), payload));
    }

    /// Run another command to completion through the full pipeline
    pub(crate) async fn run_child(&mut self, command: Command, origin: CommandOrigin) -> CommandOutcome {
        self.trace
            .push(Effect::Call(format!("dispatch:{}", command.payload.kind())));
        let outcome = self.dispatcher.run(command, origin).await;
        if outcome.committed_puts > 0 {
            self.puts += outcome.committed_puts;
        }
        outcome
    }

    /// Exclusive access to the undo log
    pub(crate) fn with_undo_log<T>(&self, f: impl FnOnce(&mut UndoLog) -> T) -> T {
        self.dispatcher.with_undo_log(f)
    }

    pub(crate) fn puts(&self) -> usize {
        self.puts
    }

    pub(crate) fn record(&mut self, effect: Effect) {
        self.trace.push(effect);
    }

    pub(crate) fn into_parts(self) -> (Vec<Effect>, Vec<UndoEntry>) {
        let correlation_id = self.correlation_id;
        let command = self.command;
        let entries = self
            .pending_undo
            .into_iter()
            .map(|p| UndoEntry {
                correlation_id: correlation_id.clone(),
                command: command.to_string(),
                inverse: p.inverse,
                description: p.description,
                tab: p.tab,
                recorded_at: chrono::Utc::now(),
            })
            .collect();
        (self.trace, entries)
    }
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            // sender gone: nobody can cancel any more
            std::future::pending::<()>().await;
        }
    }
}
