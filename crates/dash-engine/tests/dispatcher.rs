//! Dispatcher lifecycle: events, cancellation, panics, hooks and config

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use common::*;
use dash_core::{EngineConfig, FailureReason, ItemPath, ObjRef};
use dash_engine::{
    Backend, BackendError, CatalogDateDataset, Command, CommandHook, CommandPayload, CommandStatus,
    Dispatcher, DisplayFormMetadata, Event, EventPayload, ExportFormat, ExportResult, HookContext,
    HookResult,
};

fn rename(title: &str) -> CommandPayload {
    CommandPayload::RenameDashboard {
        title: title.to_string(),
    }
}

fn export(widget: &str) -> CommandPayload {
    CommandPayload::ExportInsightWidget {
        widget: ObjRef::id(widget),
        format: ExportFormat::Csv,
    }
}

/// Backend that panics on every call
struct PanickingBackend;

#[async_trait]
impl Backend for PanickingBackend {
    async fn resolve_display_forms(
        &self,
        _refs: &[ObjRef],
    ) -> Result<Vec<DisplayFormMetadata>, BackendError> {
        panic!("display form index corrupted")
    }

    async fn catalog_date_datasets(&self) -> Result<Vec<CatalogDateDataset>, BackendError> {
        panic!("catalog corrupted")
    }

    async fn export_insight(
        &self,
        _insight: &ObjRef,
        _format: ExportFormat,
    ) -> Result<ExportResult, BackendError> {
        panic!("exporter corrupted")
    }
}

#[derive(Default)]
struct CountingHook {
    started: Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
}

#[async_trait]
impl CommandHook for CountingHook {
    fn name(&self) -> &str {
        "counting"
    }

    async fn on_start(&self, _context: &HookContext) -> HookResult {
        self.started.fetch_add(1, Ordering::SeqCst);
        HookResult::success("counted")
    }

    async fn on_finish(&self, _context: &HookContext, outcome: &Event) -> HookResult {
        self.finished.fetch_add(1, Ordering::SeqCst);
        if outcome.is_failure() {
            HookResult::failure("saw a failure")
        } else {
            HookResult::success("counted")
        }
    }
}

#[tokio::test]
async fn test_started_then_terminal_event_share_correlation_id() {
    let d = dispatcher(dashboard(vec![vec!["a"]]));
    let mut rx = d.subscribe();

    let outcome = d
        .dispatch_and_wait(Command::new(rename("Q3 review")).with_correlation_id("c-1"))
        .await;
    assert_completed(&outcome);
    assert_eq!(outcome.correlation_id, "c-1");

    let started = rx.recv().await.unwrap();
    assert_eq!(started.correlation_id, "c-1");
    assert_eq!(
        started.payload,
        EventPayload::CommandStarted {
            command: "renameDashboard".into()
        }
    );
    let done = rx.recv().await.unwrap();
    assert_eq!(done.correlation_id, "c-1");
    assert_eq!(
        done.payload,
        EventPayload::DashboardRenamed {
            title: "Q3 review".into()
        }
    );

    let history = d.emitted_events();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1], done);
    assert_eq!(d.state().title, "Q3 review");
}

#[tokio::test]
async fn test_generated_correlation_ids_are_unique() {
    let d = dispatcher(dashboard(vec![vec!["a"]]));
    let first = run(&d, rename("one")).await;
    let second = run(&d, rename("two")).await;
    assert!(!first.correlation_id.is_empty());
    assert_ne!(first.correlation_id, second.correlation_id);
}

#[tokio::test]
async fn test_failed_command_emits_single_failure() {
    let d = dispatcher(dashboard(vec![vec!["a"]]));
    let outcome = run(
        &d,
        CommandPayload::ResizeWidth {
            item: ItemPath::single(0, 9),
            width: 4,
        },
    )
    .await;
    assert_failed(&outcome, FailureReason::NotFound);

    let kinds: Vec<&str> = d.emitted_events().iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["commandStarted", "commandFailed"]);
    assert!(d.undo_entries().is_empty());
}

#[tokio::test]
async fn test_cancel_pending_export() {
    let gate = Arc::new(Notify::new());
    let backend = catalog().with_export_gate(Arc::clone(&gate));
    let started = backend.export_started();
    let d = dispatcher_with(dashboard(vec![vec!["a"]]), Arc::new(backend));

    let handle = d.dispatch(Command::new(export("a")));
    let id = handle.correlation_id().to_string();
    started.notified().await;

    assert!(d.cancel(&id));
    let outcome = handle.wait().await;
    match &outcome.result {
        CommandStatus::Cancelled(event) => assert_eq!(
            event.payload,
            EventPayload::CommandCancelled {
                partially_applied: false
            }
        ),
        other => panic!("expected cancellation, got {:?}", other),
    }
    assert!(!d.cancel(&id));
    assert!(!d.cancel("never-dispatched"));
}

#[tokio::test]
async fn test_other_commands_progress_while_export_waits() {
    let gate = Arc::new(Notify::new());
    let backend = catalog().with_export_gate(Arc::clone(&gate));
    let started = backend.export_started();
    let d = dispatcher_with(dashboard(vec![vec!["a"]]), Arc::new(backend));

    let export_handle = d.dispatch(Command::new(export("a")));
    started.notified().await;

    assert_completed(&run(&d, rename("while exporting")).await);
    assert_eq!(d.state().title, "while exporting");

    gate.notify_one();
    let outcome = export_handle.wait().await;
    assert_completed(&outcome);
    assert_eq!(
        outcome.event().payload,
        EventPayload::InsightWidgetExportResolved {
            widget: ObjRef::id("a"),
            uri: "memory://exports/id:vis-a.csv".into(),
        }
    );
}

#[tokio::test]
async fn test_handler_panic_becomes_internal_error() {
    let d = dispatcher_with(dashboard(vec![vec!["a"]]), Arc::new(PanickingBackend));
    let outcome = run(&d, export("a")).await;
    assert_failed(&outcome, FailureReason::InternalError);
    match &outcome.event().payload {
        EventPayload::CommandFailed { message, .. } => {
            assert!(message.contains("exporter corrupted"))
        }
        other => panic!("unexpected {:?}", other),
    }

    // the dispatcher keeps serving after a panic
    assert_completed(&run(&d, rename("still alive")).await);
}

#[tokio::test]
async fn test_read_only_dashboard() {
    let mut state = dashboard(vec![vec!["a"]]);
    state.permissions.can_edit = false;
    let d = dispatcher(state);

    let outcome = run(&d, rename("nope")).await;
    assert_failed(&outcome, FailureReason::UserError);
    assert_eq!(d.state().title, "Sales overview");

    let outcome = run(
        &d,
        CommandPayload::SelectWidget {
            widget: Some(ObjRef::id("a")),
        },
    )
    .await;
    assert_completed(&outcome);
    assert_eq!(d.state().ui.selected_widget, Some(ObjRef::id("a")));
}

#[tokio::test]
async fn test_hooks_observe_every_command() {
    let hook = CountingHook::default();
    let started = Arc::clone(&hook.started);
    let finished = Arc::clone(&hook.finished);
    let d = Dispatcher::builder(dashboard(vec![vec!["a"]]), Arc::new(catalog()))
        .hook(Box::new(hook))
        .build()
        .unwrap();

    assert_completed(&run(&d, rename("one")).await);
    let outcome = run(
        &d,
        CommandPayload::ResizeWidth {
            item: ItemPath::single(3, 0),
            width: 4,
        },
    )
    .await;
    assert_failed(&outcome, FailureReason::NotFound);

    assert_eq!(started.load(Ordering::SeqCst), 2);
    assert_eq!(finished.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_height_limit_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "[layout]\nmax_height = 5\n").unwrap();
    let config = EngineConfig::load(&path).unwrap();
    assert_eq!(config.layout.max_height, 5);

    let d = Dispatcher::new(dashboard(vec![vec!["a"]]), Arc::new(catalog()), config).unwrap();
    let resize = |height| CommandPayload::ResizeHeight {
        parent: ItemPath::root(),
        section_index: 0,
        item_indexes: vec![0],
        height,
    };
    assert_failed(&run(&d, resize(6)).await, FailureReason::UserError);
    assert_completed(&run(&d, resize(5)).await);
}

#[tokio::test]
async fn test_invalid_initial_state_rejected() {
    let state = dashboard(vec![vec!["a", "a"]]);
    assert!(Dispatcher::new(state, Arc::new(catalog()), EngineConfig::default()).is_err());
}
