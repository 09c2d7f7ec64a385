//! Tab and dashboard-level command handlers

use uuid::Uuid;

use dash_core::{DashboardTab, ObjRef, TabContent};
use dash_layout::index;
use dash_store::selectors;
use dash_store::{Mutation, MutationOutput};

use super::layout::unexpected;
use crate::command::CommandPayload;
use crate::effects::HandlerContext;
use crate::error::{CommandError, CommandResult};
use crate::event::EventPayload;
use crate::validation;

/// The first tab created takes over the implicit tab's content and becomes active
pub(super) fn create(
    ctx: &mut HandlerContext,
    title: String,
    local_identifier: Option<String>,
    index: i64,
    activate: bool,
) -> CommandResult<EventPayload> {
    validation::non_empty("tab title", &title)?;
    let local_identifier = local_identifier.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    validation::non_empty("tab local identifier", &local_identifier)?;

    let at = ctx.select("tabTarget", |s| -> CommandResult<usize> {
        if selectors::select_tab_index(s, &local_identifier).is_some() {
            return Err(CommandError::user(format!("tab '{}' already exists", local_identifier)));
        }
        Ok(index::check_insertion(index, selectors::select_tabs(s).len(), "tab")?)
    })?;

    let index = match ctx.put(Mutation::AddTab {
        index: at,
        tab: DashboardTab {
            local_identifier: local_identifier.clone(),
            title,
            content: TabContent::default(),
        },
        activate,
    })? {
        MutationOutput::TabAdded { index, adopted_root } => {
            if adopted_root {
                ctx.with_undo_log(|log| log.adopt_implicit_tab(&local_identifier));
            }
            index
        }
        other => return Err(unexpected(other)),
    };
    Ok(EventPayload::DashboardTabCreated {
        local_identifier,
        index,
    })
}

pub(super) fn delete(ctx: &mut HandlerContext, local_identifier: String) -> CommandResult<EventPayload> {
    match ctx.put(Mutation::RemoveTab {
        local_identifier: local_identifier.clone(),
    })? {
        MutationOutput::TabRemoved { .. } => {}
        other => return Err(unexpected(other)),
    }
    Ok(EventPayload::DashboardTabDeleted { local_identifier })
}

/// Both indexes name existing tabs; the tab is removed at `old_index` and
/// inserted at `new_index`.
pub(super) fn reposition(ctx: &mut HandlerContext, old_index: i64, new_index: i64) -> CommandResult<EventPayload> {
    let (from, to) = ctx.select("tabIndexes", |s| -> CommandResult<(usize, usize)> {
        let len = selectors::select_tabs(s).len();
        Ok((
            index::check_existing(old_index, len, "tab")?,
            index::check_existing(new_index, len, "tab")?,
        ))
    })?;

    ctx.put(Mutation::RepositionTab { from, to })?;
    ctx.push_undo(
        CommandPayload::RepositionDashboardTab {
            old_index: to as i64,
            new_index: from as i64,
        },
        format!("move tab {} back to {}", to, from),
    );

    let tabs = ctx.select("tabs", |s| {
        selectors::select_tabs(s)
            .iter()
            .map(|t| t.local_identifier.clone())
            .collect()
    });
    Ok(EventPayload::DashboardTabRepositioned {
        old_index: from,
        new_index: to,
        tabs,
    })
}

pub(super) fn switch(ctx: &mut HandlerContext, local_identifier: String) -> CommandResult<EventPayload> {
    let previous = match ctx.put(Mutation::SetActiveTab {
        local_identifier: local_identifier.clone(),
    })? {
        MutationOutput::ActiveTabChanged(previous) => previous,
        other => return Err(unexpected(other)),
    };
    Ok(EventPayload::DashboardTabSwitched {
        previous,
        current: local_identifier,
    })
}

pub(super) fn rename(ctx: &mut HandlerContext, local_identifier: String, title: String) -> CommandResult<EventPayload> {
    validation::non_empty("tab title", &title)?;
    let old = match ctx.put(Mutation::RenameTab {
        local_identifier: local_identifier.clone(),
        title: title.clone(),
    })? {
        MutationOutput::TabRenamed(old) => old,
        other => return Err(unexpected(other)),
    };

    ctx.push_undo(
        CommandPayload::RenameDashboardTab {
            local_identifier: local_identifier.clone(),
            title: old,
        },
        format!("restore title of tab '{}'", local_identifier),
    );
    Ok(EventPayload::DashboardTabRenamed {
        local_identifier,
        title,
    })
}

pub(super) fn rename_dashboard(ctx: &mut HandlerContext, title: String) -> CommandResult<EventPayload> {
    let old = match ctx.put(Mutation::SetDashboardTitle { title: title.clone() })? {
        MutationOutput::DashboardRenamed(old) => old,
        other => return Err(unexpected(other)),
    };
    ctx.push_undo(
        CommandPayload::RenameDashboard { title: old },
        "restore dashboard title",
    );
    Ok(EventPayload::DashboardRenamed { title })
}

pub(super) fn select_widget(ctx: &mut HandlerContext, widget: Option<ObjRef>) -> CommandResult<EventPayload> {
    ctx.put(Mutation::SetSelectedWidget {
        widget: widget.clone(),
    })?;
    Ok(EventPayload::WidgetSelected { widget })
}
