//! # dash-engine
//!
//! Command/event engine for dashboard editing.
//!
//! A [`Command`] goes through the [`Dispatcher`], which runs its handler
//! against a [`HandlerContext`] and emits a stream of [`Event`]s:
//!
//! ```text
//! Command -> Dispatcher -> handler (select / call / put / dispatch_event) -> Event
//!                 |                                   |
//!              hooks                               Store (dash-store)
//! ```
//!
//! Reversible handlers record inverse commands in the [`UndoLog`];
//! `undo`/`redo` commands replay them through the same pipeline.

pub mod backend;
pub mod command;
pub mod dispatcher;
pub mod effects;
pub mod error;
pub mod event;
mod handlers;
pub mod hooks;
pub mod undo;
pub mod validation;

pub use backend::{
    Backend, BackendError, CatalogDateDataset, DisplayFormMetadata, ExportFormat, ExportResult,
    InMemoryBackend,
};
pub use command::{Command, CommandPayload, FilterSelection, ItemSizeUpdate};
pub use dispatcher::{CommandHandle, CommandOutcome, CommandStatus, Dispatcher, DispatcherBuilder};
pub use effects::{Effect, HandlerContext};
pub use error::{CommandError, CommandResult};
pub use event::{Event, EventPayload};
pub use hooks::{AuditLogHook, CommandHook, HookContext, HookPipeline, HookResult};
pub use undo::{CommandOrigin, UndoEntry, UndoLog, UndoPoint};
