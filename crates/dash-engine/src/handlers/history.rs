//! Undo and redo
//!
//! Both re-dispatch recorded inverse commands through the full pipeline, so
//! an inverse is validated like any other command and can fail. Entries that
//! could not be reverted go back onto their stack. An entry recorded on one
//! tab's content replays only while that tab is active.

use dash_store::selectors;
use tracing::{info, warn};

use crate::command::Command;
use crate::dispatcher::CommandOutcome;
use crate::effects::HandlerContext;
use crate::error::{CommandError, CommandResult};
use crate::event::EventPayload;
use crate::undo::{CommandOrigin, UndoEntry, UndoPoint};

pub(super) async fn undo(ctx: &mut HandlerContext, point: UndoPoint) -> CommandResult<EventPayload> {
    let mut pending = ctx.with_undo_log(|log| log.take_undo(&point))?;
    info!("Undoing {} command(s)", pending.len());

    let mut undone = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        if ctx.is_cancelled() {
            ctx.with_undo_log(|log| log.restore_undo(pending));
            return Err(CommandError::Cancelled);
        }
        let entry = pending.remove(0);
        if let Err(err) = ensure_tab(ctx, &entry) {
            pending.insert(0, entry);
            ctx.with_undo_log(|log| log.restore_undo(pending));
            return Err(err);
        }
        let command = Command::new(entry.inverse.clone())
            .with_correlation_id(format!("{}/undo/{}", ctx.correlation_id(), entry.correlation_id));
        let outcome = ctx.run_child(command, CommandOrigin::Undo).await;
        if !outcome.is_completed() {
            let err = child_failure("undo", &entry.description, &outcome);
            pending.insert(0, entry);
            ctx.with_undo_log(|log| log.restore_undo(pending));
            return Err(err);
        }
        undone.push(entry.correlation_id);
    }
    Ok(EventPayload::DashboardUndone { undone })
}

pub(super) async fn redo(ctx: &mut HandlerContext) -> CommandResult<EventPayload> {
    let entry = ctx.with_undo_log(|log| log.take_redo())?;
    if let Err(err) = ensure_tab(ctx, &entry) {
        ctx.with_undo_log(|log| log.restore_redo(entry));
        return Err(err);
    }

    let command = Command::new(entry.inverse.clone())
        .with_correlation_id(format!("{}/redo/{}", ctx.correlation_id(), entry.correlation_id));
    let outcome = ctx.run_child(command, CommandOrigin::Redo).await;
    if !outcome.is_completed() {
        let err = child_failure("redo", &entry.description, &outcome);
        ctx.with_undo_log(|log| log.restore_redo(entry));
        return Err(err);
    }
    Ok(EventPayload::DashboardRedone {
        redone: vec![entry.correlation_id],
    })
}

/// The entry's tab must still exist and be the active one
fn ensure_tab(ctx: &mut HandlerContext, entry: &UndoEntry) -> CommandResult<()> {
    let Some(tab) = entry.tab.as_deref() else {
        return Ok(());
    };
    ctx.select("undoTab", |s| {
        if selectors::select_tab_index(s, tab).is_none() {
            return Err(CommandError::not_found(format!(
                "tab '{}' of '{}'",
                tab, entry.description
            )));
        }
        if s.active_tab_local_identifier.as_deref() != Some(tab) {
            return Err(CommandError::user(format!(
                "'{}' was recorded on tab '{}'; switch to it first",
                entry.description, tab
            )));
        }
        Ok(())
    })
}

/// Carry the child's failure reason into the parent's failure
fn child_failure(action: &str, description: &str, outcome: &CommandOutcome) -> CommandError {
    warn!("Could not {} '{}': {}", action, description, outcome.event().kind());
    match &outcome.event().payload {
        EventPayload::CommandFailed { reason, message, .. } => CommandError::Rejected {
            reason: *reason,
            message: format!("cannot {} '{}': {}", action, description, message),
        },
        _ => CommandError::internal(format!(
            "cannot {} '{}': {}",
            action,
            description,
            outcome.event().kind()
        )),
    }
}
