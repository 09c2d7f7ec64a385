//! Command dispatcher
//!
//! Each dispatched command runs as its own tokio task:
//!
//! 1. `commandStarted` is emitted and start hooks run
//! 2. the handler runs against a [`HandlerContext`]
//! 3. recorded inverses are committed to the undo log
//! 4. exactly one terminal event is emitted and finish hooks run
//!
//! Handler panics are caught here and reported as `INTERNAL_ERROR`.
//! Commands may be cancelled by correlation id while suspended in a
//! collaborator call.

use futures::FutureExt;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{debug, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use dash_core::{DashboardState, EngineConfig, FailureReason, Result};
use dash_store::{Snapshot, Store};

use crate::backend::Backend;
use crate::command::Command;
use crate::effects::{Effect, HandlerContext};
use crate::error::CommandError;
use crate::event::{Event, EventPayload};
use crate::handlers;
use crate::hooks::{CommandHook, HookContext, HookPipeline};
use crate::undo::{CommandOrigin, UndoEntry, UndoLog};

/// Terminal result of one command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandStatus {
    Completed(Event),
    Failed(Event),
    Cancelled(Event),
}

impl CommandStatus {
    pub fn event(&self) -> &Event {
        match self {
            Self::Completed(e) | Self::Failed(e) | Self::Cancelled(e) => e,
        }
    }
}

/// Everything the caller learns about a finished command
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub correlation_id: String,
    pub result: CommandStatus,
    /// Handler instructions in program order
    pub effects: Vec<Effect>,
    /// Mutations that stayed committed
    pub committed_puts: usize,
}

impl CommandOutcome {
    pub fn event(&self) -> &Event {
        self.result.event()
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.result, CommandStatus::Completed(_))
    }

    /// Failure reason, if the command failed
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match &self.event().payload {
            EventPayload::CommandFailed { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Waiter for a dispatched command
pub struct CommandHandle {
    correlation_id: String,
    rx: oneshot::Receiver<CommandOutcome>,
}

impl CommandHandle {
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Wait for the command's terminal outcome
    pub async fn wait(self) -> CommandOutcome {
        let correlation_id = self.correlation_id;
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => {
                let event = Event::new(
                    correlation_id.clone(),
                    EventPayload::CommandFailed {
                        reason: FailureReason::InternalError,
                        message: "command task dropped before completing".into(),
                        partially_applied: false,
                    },
                );
                CommandOutcome {
                    correlation_id,
                    result: CommandStatus::Failed(event),
                    effects: Vec::new(),
                    committed_puts: 0,
                }
            }
        }
    }
}

struct Inner {
    store: Store,
    backend: Arc<dyn Backend>,
    config: EngineConfig,
    undo: Mutex<UndoLog>,
    events: broadcast::Sender<Event>,
    history: Mutex<VecDeque<Event>>,
    in_flight: Mutex<HashMap<String, watch::Sender<bool>>>,
    hooks: HookPipeline,
}

/// Builder for [`Dispatcher`]
pub struct DispatcherBuilder {
    state: DashboardState,
    backend: Arc<dyn Backend>,
    config: EngineConfig,
    hooks: HookPipeline,
}

impl DispatcherBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn hook(mut self, hook: Box<dyn CommandHook>) -> Self {
        self.hooks.add_hook(hook);
        self
    }

    /// Validate the initial state and start the dispatcher
    pub fn build(self) -> Result<Dispatcher> {
        self.config.validate()?;
        let store = Store::new(self.state, self.config.store.clone())?;
        let (events, _) = broadcast::channel(self.config.events.capacity);
        Ok(Dispatcher {
            inner: Arc::new(Inner {
                store,
                backend: self.backend,
                undo: Mutex::new(UndoLog::new(self.config.undo.limit)),
                events,
                history: Mutex::new(VecDeque::new()),
                in_flight: Mutex::new(HashMap::new()),
                hooks: self.hooks,
                config: self.config,
            }),
        })
    }
}

struct Prepared {
    correlation_id: String,
    command: Command,
    cancel: watch::Receiver<bool>,
}

/// Entry point for commands; cheap to clone
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn builder(state: DashboardState, backend: Arc<dyn Backend>) -> DispatcherBuilder {
        DispatcherBuilder {
            state,
            backend,
            config: EngineConfig::default(),
            hooks: HookPipeline::new(),
        }
    }

    pub fn new(state: DashboardState, backend: Arc<dyn Backend>, config: EngineConfig) -> Result<Self> {
        Self::builder(state, backend).config(config).build()
    }

    /// Start a command on its own task
    pub fn dispatch(&self, command: Command) -> CommandHandle {
        let prepared = self.prepare(command);
        let correlation_id = prepared.correlation_id.clone();
        let (tx, rx) = oneshot::channel();
        let this = self.clone();
        tokio::spawn(async move {
            let outcome = this.execute(prepared, CommandOrigin::User).await;
            let _ = tx.send(outcome);
        });
        CommandHandle { correlation_id, rx }
    }

    /// Dispatch and wait for the terminal outcome
    #[instrument(skip(self, command), fields(command = command.payload.kind()))]
    pub async fn dispatch_and_wait(&self, command: Command) -> CommandOutcome {
        self.dispatch(command).wait().await
    }

    /// Request cancellation of an in-flight command
    pub fn cancel(&self, correlation_id: &str) -> bool {
        let in_flight = self.inner.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        match in_flight.get(correlation_id) {
            Some(tx) => {
                info!("Cancelling {}", correlation_id);
                tx.send_replace(true);
                true
            }
            None => false,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.snapshot()
    }

    pub fn state(&self) -> Arc<DashboardState> {
        self.snapshot().state_arc()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Recently emitted events, oldest first
    pub fn emitted_events(&self) -> Vec<Event> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn undo_entries(&self) -> Vec<UndoEntry> {
        self.with_undo_log(|log| log.undo_entries())
    }

    pub fn redo_entries(&self) -> Vec<UndoEntry> {
        self.with_undo_log(|log| log.redo_entries())
    }

    pub(crate) fn store(&self) -> &Store {
        &self.inner.store
    }

    pub(crate) fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.inner.backend)
    }

    pub(crate) fn with_undo_log<T>(&self, f: impl FnOnce(&mut UndoLog) -> T) -> T {
        let mut log = self.inner.undo.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut log)
    }

    pub(crate) fn emit(&self, event: Event) {
        {
            let mut history = self.inner.history.lock().unwrap_or_else(|e| e.into_inner());
            history.push_back(event.clone());
            while history.len() > self.inner.config.events.history_limit {
                history.pop_front();
            }
        }
        // no subscribers is fine
        let _ = self.inner.events.send(event);
    }

    /// Run a command inline on the current task
    pub(crate) fn run(
        &self,
        command: Command,
        origin: CommandOrigin,
    ) -> Pin<Box<dyn Future<Output = CommandOutcome> + Send>> {
        let prepared = self.prepare(command);
        self.execute(prepared, origin)
    }

    fn prepare(&self, command: Command) -> Prepared {
        let correlation_id = command
            .correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let (tx, cancel) = watch::channel(false);
        let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if in_flight.insert(correlation_id.clone(), tx).is_some() {
            warn!("Correlation id {} reused while in flight", correlation_id);
        }
        Prepared {
            correlation_id,
            command,
            cancel,
        }
    }

    fn execute(
        &self,
        prepared: Prepared,
        origin: CommandOrigin,
    ) -> Pin<Box<dyn Future<Output = CommandOutcome> + Send>> {
        let this = self.clone();
        let span = info_span!(
            "command",
            correlation_id = %prepared.correlation_id,
            command = prepared.command.payload.kind()
        );
        Box::pin(
            async move {
                let Prepared {
                    correlation_id,
                    command,
                    cancel,
                } = prepared;
                let kind = command.payload.kind();
                let hook_context = HookContext {
                    correlation_id: correlation_id.clone(),
                    command: kind.to_string(),
                    origin,
                };

                this.inner.hooks.run_start(&hook_context).await;
                this.emit(Event::new(
                    correlation_id.clone(),
                    EventPayload::CommandStarted {
                        command: kind.to_string(),
                    },
                ));
                debug!("Running {:?} command", origin);

                let mut ctx =
                    HandlerContext::new(this.clone(), correlation_id.clone(), kind, origin, cancel);
                let handled = AssertUnwindSafe(handlers::handle(&mut ctx, command.payload))
                    .catch_unwind()
                    .await;
                let puts = ctx.puts();
                let partially_applied = puts > 0;

                let result = match handled {
                    Ok(Ok(payload)) => {
                        let event = Event::new(correlation_id.clone(), payload);
                        ctx.record(Effect::DispatchEvent(event.kind().to_string()));
                        CommandStatus::Completed(event)
                    }
                    Ok(Err(CommandError::Cancelled)) => {
                        info!("Command cancelled after {} put(s)", puts);
                        ctx.record(Effect::DispatchEvent("commandCancelled".into()));
                        CommandStatus::Cancelled(Event::new(
                            correlation_id.clone(),
                            EventPayload::CommandCancelled { partially_applied },
                        ))
                    }
                    Ok(Err(err)) => {
                        warn!("Command failed ({}): {}", err.reason(), err);
                        ctx.record(Effect::DispatchEvent("commandFailed".into()));
                        CommandStatus::Failed(Event::new(
                            correlation_id.clone(),
                            EventPayload::CommandFailed {
                                reason: err.reason(),
                                message: err.to_string(),
                                partially_applied,
                            },
                        ))
                    }
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        warn!("Handler panicked: {}", message);
                        ctx.record(Effect::DispatchEvent("commandFailed".into()));
                        CommandStatus::Failed(Event::new(
                            correlation_id.clone(),
                            EventPayload::CommandFailed {
                                reason: FailureReason::InternalError,
                                message: format!("handler panicked: {}", message),
                                partially_applied,
                            },
                        ))
                    }
                };

                let (effects, undo_entries) = ctx.into_parts();
                if !undo_entries.is_empty() {
                    this.with_undo_log(|log| {
                        for entry in undo_entries {
                            log.record(entry, origin);
                        }
                    });
                }

                this.emit(result.event().clone());
                this.inner
                    .hooks
                    .run_finish(&hook_context, result.event())
                    .await;
                this.inner
                    .in_flight
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&correlation_id);

                CommandOutcome {
                    correlation_id,
                    result,
                    effects,
                    committed_puts: puts,
                }
            }
            .instrument(span),
        )
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
