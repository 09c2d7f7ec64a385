//! Undo and redo through the dispatcher

mod common;

use common::*;
use dash_core::{FailureReason, ItemPath, SectionPath};
use dash_engine::{Command, CommandPayload, Dispatcher, EventPayload, UndoPoint};

fn rename(title: &str) -> CommandPayload {
    CommandPayload::RenameDashboard {
        title: title.to_string(),
    }
}

fn rename_tab(id: &str, title: &str) -> CommandPayload {
    CommandPayload::RenameDashboardTab {
        local_identifier: id.to_string(),
        title: title.to_string(),
    }
}

fn undo(undo_point: UndoPoint) -> CommandPayload {
    CommandPayload::Undo { undo_point }
}

async fn run_as(d: &Dispatcher, id: &str, payload: CommandPayload) {
    let outcome = d
        .dispatch_and_wait(Command::new(payload).with_correlation_id(id))
        .await;
    assert_completed(&outcome);
}

#[tokio::test]
async fn test_undo_redo_round_trip() {
    let d = dispatcher(dashboard(vec![vec!["a"]]));
    run_as(&d, "c-1", rename("Renamed")).await;
    assert_eq!(d.undo_entries().len(), 1);

    let outcome = run(&d, undo(UndoPoint::Last)).await;
    assert_completed(&outcome);
    assert_eq!(
        outcome.event().payload,
        EventPayload::DashboardUndone {
            undone: vec!["c-1".into()]
        }
    );
    assert_eq!(d.state().title, "Sales overview");
    assert!(d.undo_entries().is_empty());
    assert_eq!(d.redo_entries().len(), 1);

    let outcome = run(&d, CommandPayload::Redo {}).await;
    assert_completed(&outcome);
    assert_eq!(d.state().title, "Renamed");
    assert_eq!(d.undo_entries().len(), 1);
    assert!(d.redo_entries().is_empty());
}

#[tokio::test]
async fn test_undo_child_events_use_derived_correlation_ids() {
    let d = dispatcher(dashboard(vec![vec!["a"]]));
    run_as(&d, "c-1", rename("Renamed")).await;
    run_as(&d, "u-1", undo(UndoPoint::Last)).await;

    let ids: Vec<String> = d
        .emitted_events()
        .iter()
        .map(|e| e.correlation_id.clone())
        .collect();
    assert!(ids.contains(&"u-1/undo/c-1".to_string()));
    assert_eq!(ids.last().map(String::as_str), Some("u-1"));
}

#[tokio::test]
async fn test_new_command_clears_redo() {
    let d = dispatcher(dashboard(vec![vec!["a"]]));
    assert_completed(&run(&d, rename("one")).await);
    assert_completed(&run(&d, undo(UndoPoint::Last)).await);
    assert_eq!(d.redo_entries().len(), 1);

    assert_completed(&run(&d, rename("two")).await);
    assert!(d.redo_entries().is_empty());
    assert_failed(&run(&d, CommandPayload::Redo {}).await, FailureReason::NotFound);
}

#[tokio::test]
async fn test_empty_undo_and_bad_counts() {
    let d = dispatcher(dashboard(vec![vec!["a"]]));
    assert_failed(&run(&d, undo(UndoPoint::Last)).await, FailureReason::NotFound);

    assert_completed(&run(&d, rename("one")).await);
    assert_failed(
        &run(&d, undo(UndoPoint::Count { count: 0 })).await,
        FailureReason::UserError,
    );
    assert_failed(
        &run(&d, undo(UndoPoint::Count { count: 2 })).await,
        FailureReason::UserError,
    );
    assert_eq!(d.undo_entries().len(), 1);
}

#[tokio::test]
async fn test_undo_by_count_most_recent_first() {
    let d = dispatcher(dashboard(vec![vec!["a"]]));
    run_as(&d, "c-1", rename("one")).await;
    run_as(&d, "c-2", rename("two")).await;
    run_as(&d, "c-3", rename("three")).await;

    let outcome = run(&d, undo(UndoPoint::Count { count: 2 })).await;
    assert_completed(&outcome);
    assert_eq!(
        outcome.event().payload,
        EventPayload::DashboardUndone {
            undone: vec!["c-3".into(), "c-2".into()]
        }
    );
    assert_eq!(d.state().title, "one");
    assert_eq!(d.undo_entries().len(), 1);
}

#[tokio::test]
async fn test_undo_by_correlation_prefix() {
    let d = dispatcher(tabbed(&["t1", "t2"]));
    run_as(&d, "solo", rename("Solo")).await;
    run_as(&d, "batch-1", rename_tab("t1", "First")).await;
    run_as(&d, "batch-2", rename_tab("t2", "Second")).await;

    assert_completed(
        &run(
            &d,
            undo(UndoPoint::CorrelationPrefix {
                prefix: "batch".into(),
            }),
        )
        .await,
    );
    let state = d.state();
    assert_eq!(state.tabs[0].title, "T1");
    assert_eq!(state.tabs[1].title, "T2");
    assert_eq!(state.title, "Solo");

    let remaining: Vec<String> = d
        .undo_entries()
        .into_iter()
        .map(|e| e.correlation_id)
        .collect();
    assert_eq!(remaining, vec!["solo"]);

    assert_failed(
        &run(
            &d,
            undo(UndoPoint::CorrelationPrefix {
                prefix: "batch".into(),
            }),
        )
        .await,
        FailureReason::NotFound,
    );
}

#[tokio::test]
async fn test_failed_undo_keeps_entry() {
    let d = dispatcher(tabbed(&["t1", "t2"]));
    run_as(&d, "rename-t1", rename_tab("t1", "Renamed")).await;
    assert_completed(
        &run(
            &d,
            CommandPayload::DeleteDashboardTab {
                local_identifier: "t1".into(),
            },
        )
        .await,
    );

    let outcome = run(&d, undo(UndoPoint::Last)).await;
    assert_failed(&outcome, FailureReason::NotFound);
    if let EventPayload::CommandFailed {
        partially_applied, ..
    } = &outcome.event().payload
    {
        assert!(!partially_applied);
    }

    let entries = d.undo_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].correlation_id, "rename-t1");
    assert!(d.redo_entries().is_empty());
}

#[tokio::test]
async fn test_partially_applied_undo() {
    let d = dispatcher(tabbed(&["t1", "t2"]));
    run_as(&d, "rename-t1", rename_tab("t1", "Renamed")).await;
    assert_completed(
        &run(
            &d,
            CommandPayload::DeleteDashboardTab {
                local_identifier: "t1".into(),
            },
        )
        .await,
    );
    run_as(&d, "rename-dash", rename("Later")).await;

    let outcome = run(&d, undo(UndoPoint::Count { count: 2 })).await;
    assert_failed(&outcome, FailureReason::NotFound);
    match &outcome.event().payload {
        EventPayload::CommandFailed {
            partially_applied, ..
        } => assert!(*partially_applied),
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(d.state().title, "Sales overview");
    let undo_ids: Vec<String> = d
        .undo_entries()
        .into_iter()
        .map(|e| e.correlation_id)
        .collect();
    assert_eq!(undo_ids, vec!["rename-t1"]);
    assert_eq!(d.redo_entries().len(), 1);
}

#[tokio::test]
async fn test_undo_limit_from_config() {
    let mut config = dash_core::EngineConfig::default();
    config.undo.limit = 2;
    let d = Dispatcher::new(
        dashboard(vec![vec!["a"]]),
        std::sync::Arc::new(catalog()),
        config,
    )
    .unwrap();
    for title in ["one", "two", "three"] {
        assert_completed(&run(&d, rename(title)).await);
    }
    assert_eq!(d.undo_entries().len(), 2);
    assert_completed(&run(&d, undo(UndoPoint::Count { count: 2 })).await);
    assert_eq!(d.state().title, "one");
}

/// Tabs `t1` holding `[a, b, c]` and `t2` holding `[x, y, z]`, `t1` active
fn two_filled_tabs() -> dash_core::DashboardState {
    let mut state = tabbed(&["t1", "t2"]);
    state.tabs[0].content.layout = layout_of(vec![vec!["a", "b", "c"]]);
    state.tabs[1].content.layout = layout_of(vec![vec!["x", "y", "z"]]);
    state
}

fn switch(id: &str) -> CommandPayload {
    CommandPayload::SwitchDashboardTab {
        local_identifier: id.to_string(),
    }
}

fn move_first_to_end() -> CommandPayload {
    CommandPayload::MoveSectionItem {
        from: ItemPath::single(0, 0),
        to_section: SectionPath::root(0),
        to_index: 3,
    }
}

#[tokio::test]
async fn test_undo_waits_for_the_tab_it_was_recorded_on() {
    let initial = two_filled_tabs();
    let d = dispatcher(initial.clone());
    run_as(&d, "move-t1", move_first_to_end()).await;
    assert_eq!(ids(&d, 0), vec!["b", "c", "a"]);
    assert_eq!(d.undo_entries()[0].tab.as_deref(), Some("t1"));

    assert_completed(&run(&d, switch("t2")).await);
    assert_failed(&run(&d, undo(UndoPoint::Last)).await, FailureReason::UserError);
    assert_eq!(ids(&d, 0), vec!["x", "y", "z"]);
    assert_eq!(d.undo_entries().len(), 1);

    assert_completed(&run(&d, switch("t1")).await);
    assert_completed(&run(&d, undo(UndoPoint::Last)).await);
    let state = d.state();
    assert_eq!(state.tabs, initial.tabs);
}

#[tokio::test]
async fn test_undo_for_deleted_tab_is_not_found() {
    let d = dispatcher(two_filled_tabs());
    run_as(&d, "move-t1", move_first_to_end()).await;
    assert_completed(
        &run(
            &d,
            CommandPayload::DeleteDashboardTab {
                local_identifier: "t1".into(),
            },
        )
        .await,
    );

    assert_failed(&run(&d, undo(UndoPoint::Last)).await, FailureReason::NotFound);
    assert_eq!(ids(&d, 0), vec!["x", "y", "z"]);
    assert_eq!(d.undo_entries().len(), 1);
}

#[tokio::test]
async fn test_first_tab_takes_over_implicit_tab_history() {
    let d = dispatcher(dashboard(vec![vec!["a", "b", "c"]]));
    run_as(&d, "move", move_first_to_end()).await;
    assert_eq!(d.undo_entries()[0].tab, None);

    for (id, activate) in [("t1", false), ("t2", true)] {
        assert_completed(
            &run(
                &d,
                CommandPayload::CreateDashboardTab {
                    title: id.to_uppercase(),
                    local_identifier: Some(id.into()),
                    index: -1,
                    activate,
                },
            )
            .await,
        );
    }
    assert_eq!(d.undo_entries()[0].tab.as_deref(), Some("t1"));

    assert_failed(&run(&d, undo(UndoPoint::Last)).await, FailureReason::UserError);
    assert_completed(&run(&d, switch("t1")).await);
    assert_completed(&run(&d, undo(UndoPoint::Last)).await);
    assert_eq!(ids(&d, 0), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_dashboard_level_undo_ignores_active_tab() {
    let d = dispatcher(two_filled_tabs());
    run_as(&d, "rename", rename("Elsewhere")).await;
    assert_eq!(d.undo_entries()[0].tab, None);

    assert_completed(&run(&d, switch("t2")).await);
    assert_completed(&run(&d, undo(UndoPoint::Last)).await);
    assert_eq!(d.state().title, "Sales overview");
}
