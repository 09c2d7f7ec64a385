//! Widget command handlers

use std::collections::HashSet;

use dash_core::{DrillDefinition, FilterReference, FilterSettings, InsightWidget, ObjRef, Widget};
use dash_layout as layout;
use dash_store::selectors::{self, WidgetByRef};
use dash_store::{Mutation, MutationOutput};

use super::classify_not_found;
use super::layout::unexpected;
use crate::backend::{ops, ExportFormat};
use crate::command::CommandPayload;
use crate::effects::HandlerContext;
use crate::error::{CommandError, CommandResult};
use crate::event::EventPayload;
use crate::validation;

pub(super) fn change_header(ctx: &mut HandlerContext, widget: ObjRef, title: String) -> CommandResult<EventPayload> {
    let current = (*ctx.select_memo(&WidgetByRef(widget.clone())))
        .clone()
        .ok_or_else(|| CommandError::not_found(format!("widget {}", widget)))?;
    if current.title().is_none() {
        return Err(CommandError::user(format!(
            "{} widget {} has no header",
            current.kind(),
            widget
        )));
    }

    let old = match ctx.put(Mutation::SetWidgetTitle {
        widget: widget.clone(),
        title: title.clone(),
    })? {
        MutationOutput::TitleChanged(old) => old,
        other => return Err(unexpected(other)),
    };

    ctx.push_undo(
        CommandPayload::ChangeWidgetHeader {
            widget: widget.clone(),
            title: old,
        },
        format!("restore header of {}", widget),
    );
    Ok(EventPayload::WidgetHeaderChanged { widget, title })
}

/// Upsert drills by local identifier; unknown ones are appended
pub(super) fn modify_drills(
    ctx: &mut HandlerContext,
    widget: ObjRef,
    drills: Vec<DrillDefinition>,
) -> CommandResult<EventPayload> {
    if drills.is_empty() {
        return Err(CommandError::user("no drills to modify"));
    }
    validation::unique_drills(&drills)?;
    let insight = ctx.select("insightWidget", |s| validation::insight(s, &widget))?;

    let mut merged = insight.drills.clone();
    let mut added = Vec::new();
    let mut updated = Vec::new();
    for drill in drills {
        match merged
            .iter_mut()
            .find(|d| d.local_identifier == drill.local_identifier)
        {
            Some(slot) => {
                *slot = drill.clone();
                updated.push(drill);
            }
            None => {
                merged.push(drill.clone());
                added.push(drill);
            }
        }
    }

    set_drills(ctx, &widget, merged)?;
    Ok(EventPayload::InsightWidgetDrillsModified {
        widget,
        added,
        updated,
    })
}

pub(super) fn remove_drills(
    ctx: &mut HandlerContext,
    widget: ObjRef,
    local_identifiers: Vec<String>,
) -> CommandResult<EventPayload> {
    if local_identifiers.is_empty() {
        return Err(CommandError::user("no drills to remove"));
    }
    let insight = ctx.select("insightWidget", |s| validation::insight(s, &widget))?;
    for id in &local_identifiers {
        if !insight.drills.iter().any(|d| &d.local_identifier == id) {
            return Err(CommandError::not_found(format!("drill '{}' on {}", id, widget)));
        }
    }

    let gone: HashSet<&str> = local_identifiers.iter().map(String::as_str).collect();
    let (removed, kept): (Vec<_>, Vec<_>) = insight
        .drills
        .into_iter()
        .partition(|d| gone.contains(d.local_identifier.as_str()));

    set_drills(ctx, &widget, kept)?;
    Ok(EventPayload::InsightWidgetDrillsRemoved { widget, removed })
}

pub(super) fn replace_drills(
    ctx: &mut HandlerContext,
    widget: ObjRef,
    drills: Vec<DrillDefinition>,
) -> CommandResult<EventPayload> {
    validation::unique_drills(&drills)?;
    ctx.select("insightWidget", |s| validation::insight(s, &widget))?;

    set_drills(ctx, &widget, drills.clone())?;
    Ok(EventPayload::InsightWidgetDrillsReplaced { widget, drills })
}

fn set_drills(ctx: &mut HandlerContext, widget: &ObjRef, drills: Vec<DrillDefinition>) -> CommandResult<()> {
    let old = match ctx.put(Mutation::SetInsightDrills {
        widget: widget.clone(),
        drills,
    })? {
        MutationOutput::DrillsChanged(old) => old,
        other => return Err(unexpected(other)),
    };
    ctx.push_undo(
        CommandPayload::ReplaceInsightWidgetDrills {
            widget: widget.clone(),
            drills: old,
        },
        format!("restore drills of {}", widget),
    );
    Ok(())
}

pub(super) fn change_rich_text(
    ctx: &mut HandlerContext,
    widget: ObjRef,
    content: String,
) -> CommandResult<EventPayload> {
    let current = ctx.select_memo(&WidgetByRef(widget.clone()));
    match &*current {
        Some(Widget::RichText(_)) => {}
        Some(other) => {
            return Err(CommandError::user(format!(
                "widget {} is {}, expected richText",
                widget,
                other.kind()
            )))
        }
        None => return Err(CommandError::not_found(format!("widget {}", widget))),
    }

    let old = match ctx.put(Mutation::SetRichTextContent {
        widget: widget.clone(),
        content: content.clone(),
    })? {
        MutationOutput::ContentChanged(old) => old,
        other => return Err(unexpected(other)),
    };

    ctx.push_undo(
        CommandPayload::ChangeRichTextWidgetContent {
            widget: widget.clone(),
            content: old,
        },
        format!("restore content of {}", widget),
    );
    Ok(EventPayload::RichTextWidgetContentChanged { widget, content })
}

/// Ignored filters must exist in the filter context; a date data set must be
/// known to the catalog.
pub(super) async fn change_filter_settings(
    ctx: &mut HandlerContext,
    widget: ObjRef,
    settings: FilterSettings,
) -> CommandResult<EventPayload> {
    ctx.select("filterSettings", |s| -> CommandResult<()> {
        let (_, current) = validation::widget(s, &widget)?;
        if current.filter_settings().is_none() {
            return Err(CommandError::user(format!(
                "{} widget {} has no filter settings",
                current.kind(),
                widget
            )));
        }
        let known: Vec<FilterReference> = selectors::select_filters(s)
            .iter()
            .filter_map(|f| f.reference())
            .collect();
        for reference in &settings.ignore_dashboard_filters {
            if !known.contains(reference) {
                return Err(CommandError::not_found(format!(
                    "ignored filter {:?} is not on the dashboard",
                    reference
                )));
            }
        }
        Ok(())
    })?;

    if let Some(data_set) = &settings.date_data_set {
        let backend = ctx.backend();
        let catalog = ctx
            .call(ops::CATALOG_DATE_DATASETS, async move {
                backend.catalog_date_datasets().await
            })
            .await?;
        if !catalog.iter().any(|d| &d.data_set == data_set) {
            return Err(CommandError::not_found(format!("date data set {}", data_set)));
        }
    }

    let old = match ctx.put(Mutation::SetWidgetFilterSettings {
        widget: widget.clone(),
        settings: settings.clone(),
    })? {
        MutationOutput::FilterSettingsChanged(old) => old,
        other => return Err(unexpected(other)),
    };

    ctx.push_undo(
        CommandPayload::ChangeWidgetFilterSettings {
            widget: widget.clone(),
            settings: old,
        },
        format!("restore filter settings of {}", widget),
    );
    Ok(EventPayload::WidgetFilterSettingsChanged { widget, settings })
}

pub(super) fn add_to_switcher(
    ctx: &mut HandlerContext,
    widget: ObjRef,
    visualization: InsightWidget,
) -> CommandResult<EventPayload> {
    ctx.select("switcher", |s| -> CommandResult<()> {
        match validation::widget(s, &widget)?.1 {
            Widget::VisualizationSwitcher(_) => {}
            other => {
                return Err(CommandError::user(format!(
                    "widget {} is {}, expected visualizationSwitcher",
                    widget,
                    other.kind()
                )))
            }
        }
        let in_use = s
            .contents()
            .flat_map(|c| layout::widget_refs(&c.layout))
            .any(|(r, _)| r == visualization.obj_ref);
        if in_use {
            return Err(CommandError::user(format!(
                "widget ref {} already in use",
                visualization.obj_ref
            )));
        }
        validation::unique_drills(&visualization.drills)
    })?;

    let added = visualization.obj_ref.clone();
    ctx.put(Mutation::AddSwitcherVisualization {
        widget: widget.clone(),
        visualization,
    })?;
    Ok(EventPayload::VisualizationSwitcherVisualizationAdded {
        widget,
        visualization: added,
    })
}

/// Export the insight behind a widget; cancellable while the export runs
pub(super) async fn export_insight(
    ctx: &mut HandlerContext,
    widget: ObjRef,
    format: ExportFormat,
) -> CommandResult<EventPayload> {
    let insight = ctx.select("insightWidget", |s| validation::insight(s, &widget))?;

    let backend = ctx.backend();
    let target = insight.insight.clone();
    let result = ctx
        .call(ops::EXPORT_INSIGHT, async move {
            backend.export_insight(&target, format).await
        })
        .await
        .map_err(classify_not_found)?;

    Ok(EventPayload::InsightWidgetExportResolved {
        widget,
        uri: result.uri,
    })
}
