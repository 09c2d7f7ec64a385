//! Filter command handlers
//!
//! Indexes in commands and events count draggable filters only: the common
//! date filter is pinned first and never moves.

use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use dash_core::{
    AttributeFilter, AttributeFilterParent, AttributeSelection, DashboardState, DateFilter,
    DateSelection, FilterContextItem, FilterGroup, FilterReference, ObjRef, SelectionMode,
};
use dash_layout::index;
use dash_store::selectors;
use dash_store::{FilterSelectionValue, Mutation, MutationOutput};

use super::classify_not_found;
use super::layout::unexpected;
use crate::backend::ops;
use crate::command::{CommandPayload, FilterSelection};
use crate::effects::HandlerContext;
use crate::error::{CommandError, CommandResult};
use crate::event::EventPayload;
use crate::validation;

pub(super) struct NewAttributeFilter {
    pub display_form: ObjRef,
    pub index: i64,
    pub local_identifier: Option<String>,
    pub initial_selection: Option<AttributeSelection>,
    pub selection_mode: SelectionMode,
    pub parents: Vec<AttributeFilterParent>,
}

/// Resolve the display form through the backend, then insert the filter
pub(super) async fn add_attribute_filter(
    ctx: &mut HandlerContext,
    request: NewAttributeFilter,
) -> CommandResult<EventPayload> {
    let local_identifier = request
        .local_identifier
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let selection = request.initial_selection.unwrap_or(match request.selection_mode {
        SelectionMode::Single => AttributeSelection::default(),
        SelectionMode::Multi => AttributeSelection::all(),
    });
    validation::attribute_selection(&selection, request.selection_mode)?;

    let position = ctx.select("attributeFilterTarget", |s| -> CommandResult<usize> {
        if selectors::select_attribute_filter_by_display_form(s, &request.display_form).is_some() {
            return Err(CommandError::user(format!(
                "display form {} is already filtered",
                request.display_form
            )));
        }
        validation::fresh_filter_identifier(s, &local_identifier)?;
        validation::parents(s, &local_identifier, &request.parents)?;
        validation::draggable_insertion(s, request.index)
    })?;

    let backend = ctx.backend();
    let refs = vec![request.display_form.clone()];
    let resolved = ctx
        .call(ops::RESOLVE_DISPLAY_FORMS, async move {
            backend.resolve_display_forms(&refs).await
        })
        .await
        .map_err(classify_not_found)?;
    let metadata = resolved
        .into_iter()
        .find(|m| m.obj_ref == request.display_form)
        .ok_or_else(|| CommandError::not_found(format!("display form {}", request.display_form)))?;

    let filter = AttributeFilter {
        local_identifier,
        display_form: request.display_form,
        title: Some(metadata.title),
        selection,
        selection_mode: request.selection_mode,
        parents: request.parents,
    };
    ctx.put(Mutation::AddFilter {
        position,
        filter: FilterContextItem::AttributeFilter(filter.clone()),
    })?;

    let index = ctx.select("draggableIndex", |s| validation::to_draggable(s, position));
    Ok(EventPayload::AttributeFilterAdded { filter, index })
}

/// Remove filters, then drop widget references to them
pub(super) fn remove_attribute_filters(
    ctx: &mut HandlerContext,
    local_identifiers: Vec<String>,
) -> CommandResult<EventPayload> {
    if local_identifiers.is_empty() {
        return Err(CommandError::user("no filters to remove"));
    }
    ctx.select("attributeFilters", |s| -> CommandResult<()> {
        for id in &local_identifiers {
            validation::attribute_filter(s, id)?;
        }
        Ok(())
    })?;

    let removed = remove_filters(ctx, local_identifiers)?;
    let removed = removed
        .into_iter()
        .filter_map(|f| match f {
            FilterContextItem::AttributeFilter(attr) => Some(attr),
            FilterContextItem::DateFilter(_) => None,
        })
        .collect();
    Ok(EventPayload::AttributeFiltersRemoved { removed })
}

pub(super) fn move_attribute_filter(
    ctx: &mut HandlerContext,
    local_identifier: String,
    index: i64,
) -> CommandResult<EventPayload> {
    let to_position = ctx.select("attributeFilterTarget", |s| -> CommandResult<usize> {
        validation::attribute_filter(s, &local_identifier)?;
        validation::draggable_slot(s, index)
    })?;

    let (original_index, final_index) = move_filter(ctx, &local_identifier, to_position)?;
    ctx.push_undo(
        CommandPayload::MoveAttributeFilter {
            local_identifier: local_identifier.clone(),
            index: original_index as i64,
        },
        format!("move filter '{}' back", local_identifier),
    );
    Ok(EventPayload::AttributeFilterMoved {
        local_identifier,
        original_index,
        final_index,
    })
}

pub(super) fn change_attribute_selection(
    ctx: &mut HandlerContext,
    local_identifier: String,
    selection: AttributeSelection,
    selection_mode: Option<SelectionMode>,
) -> CommandResult<EventPayload> {
    let current = ctx.select("attributeFilter", |s| validation::attribute_filter(s, &local_identifier))?;
    let mode = selection_mode.unwrap_or(current.selection_mode);
    validation::attribute_selection(&selection, mode)?;

    let (old_selection, old_mode) = match ctx.put(Mutation::SetAttributeFilterSelection {
        local_identifier: local_identifier.clone(),
        selection,
        mode,
    })? {
        MutationOutput::AttributeSelectionChanged { selection, mode } => (selection, mode),
        other => return Err(unexpected(other)),
    };

    ctx.push_undo(
        CommandPayload::ChangeAttributeFilterSelection {
            local_identifier: local_identifier.clone(),
            selection: old_selection,
            selection_mode: Some(old_mode),
        },
        format!("restore selection of '{}'", local_identifier),
    );
    let filter = ctx.select("attributeFilter", |s| validation::attribute_filter(s, &local_identifier))?;
    Ok(EventPayload::AttributeFilterSelectionChanged { filter })
}

pub(super) fn set_parents(
    ctx: &mut HandlerContext,
    local_identifier: String,
    parents: Vec<AttributeFilterParent>,
) -> CommandResult<EventPayload> {
    ctx.select("attributeFilterParents", |s| -> CommandResult<()> {
        validation::attribute_filter(s, &local_identifier)?;
        validation::parents(s, &local_identifier, &parents)
    })?;

    let old = match ctx.put(Mutation::SetAttributeFilterParents {
        local_identifier: local_identifier.clone(),
        parents,
    })? {
        MutationOutput::ParentsChanged(old) => old,
        other => return Err(unexpected(other)),
    };

    ctx.push_undo(
        CommandPayload::SetAttributeFilterParents {
            local_identifier: local_identifier.clone(),
            parents: old,
        },
        format!("restore parents of '{}'", local_identifier),
    );
    let filter = ctx.select("attributeFilter", |s| validation::attribute_filter(s, &local_identifier))?;
    Ok(EventPayload::AttributeFilterParentsChanged { filter })
}

/// Validate the data set against the catalog, then insert the filter
pub(super) async fn add_date_filter(
    ctx: &mut HandlerContext,
    data_set: ObjRef,
    index: i64,
    local_identifier: Option<String>,
    selection: DateSelection,
) -> CommandResult<EventPayload> {
    let local_identifier = local_identifier.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    validation::date_selection(&selection)?;

    let position = ctx.select("dateFilterTarget", |s| -> CommandResult<usize> {
        if selectors::select_date_filter_by_data_set(s, Some(&data_set)).is_some() {
            return Err(CommandError::user(format!(
                "data set {} already has a date filter",
                data_set
            )));
        }
        validation::fresh_filter_identifier(s, &local_identifier)?;
        validation::draggable_insertion(s, index)
    })?;

    let backend = ctx.backend();
    let catalog = ctx
        .call(ops::CATALOG_DATE_DATASETS, async move {
            backend.catalog_date_datasets().await
        })
        .await?;
    if !catalog.iter().any(|d| d.data_set == data_set) {
        return Err(CommandError::not_found(format!("date data set {}", data_set)));
    }

    let filter = DateFilter {
        local_identifier,
        data_set: Some(data_set),
        selection,
    };
    ctx.put(Mutation::AddFilter {
        position,
        filter: FilterContextItem::DateFilter(filter.clone()),
    })?;

    let index = ctx.select("draggableIndex", |s| validation::to_draggable(s, position));
    Ok(EventPayload::DateFilterAdded { filter, index })
}

pub(super) fn remove_date_filter(ctx: &mut HandlerContext, data_set: ObjRef) -> CommandResult<EventPayload> {
    let filter = ctx.select("dateFilter", |s| validation::date_filter(s, Some(&data_set)))?;
    remove_filters(ctx, vec![filter.local_identifier.clone()])?;
    Ok(EventPayload::DateFilterRemoved { filter })
}

pub(super) fn move_date_filter(ctx: &mut HandlerContext, data_set: ObjRef, index: i64) -> CommandResult<EventPayload> {
    let (filter, to_position) = ctx.select("dateFilterTarget", |s| -> CommandResult<_> {
        let filter = validation::date_filter(s, Some(&data_set))?;
        Ok((filter, validation::draggable_slot(s, index)?))
    })?;

    let (original_index, final_index) = move_filter(ctx, &filter.local_identifier, to_position)?;
    ctx.push_undo(
        CommandPayload::MoveDateFilter {
            data_set: data_set.clone(),
            index: original_index as i64,
        },
        format!("move date filter for {} back", data_set),
    );
    Ok(EventPayload::DateFilterMoved {
        data_set,
        original_index,
        final_index,
    })
}

pub(super) fn change_date_selection(
    ctx: &mut HandlerContext,
    data_set: Option<ObjRef>,
    selection: DateSelection,
) -> CommandResult<EventPayload> {
    validation::date_selection(&selection)?;
    let current = ctx.select("dateFilter", |s| validation::date_filter(s, data_set.as_ref()))?;

    let old = match ctx.put(Mutation::SetDateFilterSelection {
        local_identifier: current.local_identifier.clone(),
        selection,
    })? {
        MutationOutput::DateSelectionChanged(old) => old,
        other => return Err(unexpected(other)),
    };

    ctx.push_undo(
        CommandPayload::ChangeDateFilterSelection {
            data_set: data_set.clone(),
            selection: old,
        },
        format!("restore date selection of '{}'", current.local_identifier),
    );
    let filter = ctx.select("dateFilter", |s| validation::date_filter(s, data_set.as_ref()))?;
    Ok(EventPayload::DateFilterSelectionChanged { filter })
}

/// Match values to filters by display form or data set, then set every
/// selection in one put
pub(super) fn change_context_selection(
    ctx: &mut HandlerContext,
    selections: Vec<FilterSelection>,
    reset_others: bool,
) -> CommandResult<EventPayload> {
    let changes = ctx.select("filterContextSelection", |s| {
        matched_selections(s, &selections, reset_others)
    })?;
    if changes.is_empty() {
        return Ok(EventPayload::FilterContextSelectionChanged { filters: Vec::new() });
    }
    let ids: Vec<String> = changes
        .iter()
        .map(|c| c.local_identifier().to_string())
        .collect();

    let previous = match ctx.put(Mutation::SetFilterSelections { selections: changes })? {
        MutationOutput::SelectionsChanged(previous) => previous,
        other => return Err(unexpected(other)),
    };

    let filters = ctx.select("changedFilters", |s| -> Vec<FilterContextItem> {
        ids.iter()
            .filter_map(|id| selectors::select_filter(s, id).cloned())
            .collect()
    });
    let inverse = previous
        .into_iter()
        .zip(&filters)
        .filter_map(|(old, filter)| match (old, filter) {
            (FilterSelectionValue::Attribute { selection, .. }, FilterContextItem::AttributeFilter(attr)) => {
                Some(FilterSelection::Attribute {
                    display_form: attr.display_form.clone(),
                    selection,
                })
            }
            (FilterSelectionValue::Date { selection, .. }, FilterContextItem::DateFilter(date)) => {
                Some(FilterSelection::Date {
                    data_set: date.data_set.clone(),
                    selection,
                })
            }
            _ => None,
        })
        .collect();
    ctx.push_undo(
        CommandPayload::ChangeFilterContextSelection {
            filters: inverse,
            reset_others: false,
        },
        format!("restore selection of {} filter(s)", ids.len()),
    );
    Ok(EventPayload::FilterContextSelectionChanged { filters })
}

fn matched_selections(
    state: &DashboardState,
    selections: &[FilterSelection],
    reset_others: bool,
) -> CommandResult<Vec<FilterSelectionValue>> {
    let mut changes = Vec::new();
    let mut matched: HashSet<String> = HashSet::new();
    for value in selections {
        let change = match value {
            FilterSelection::Attribute {
                display_form,
                selection,
            } => match selectors::select_attribute_filter_by_display_form(state, display_form) {
                Some(attr) => {
                    validation::attribute_selection(selection, attr.selection_mode)?;
                    Some(FilterSelectionValue::Attribute {
                        local_identifier: attr.local_identifier.clone(),
                        selection: selection.clone(),
                    })
                }
                None => None,
            },
            FilterSelection::Date { data_set, selection } => {
                validation::date_selection(selection)?;
                selectors::select_date_filter_by_data_set(state, data_set.as_ref()).map(|date| {
                    FilterSelectionValue::Date {
                        local_identifier: date.local_identifier.clone(),
                        selection: selection.clone(),
                    }
                })
            }
        };
        match change {
            Some(change) if matched.insert(change.local_identifier().to_string()) => changes.push(change),
            Some(change) => debug!("Ignoring repeated selection for '{}'", change.local_identifier()),
            None => debug!("No filter matches {:?}", value),
        }
    }

    if reset_others {
        for filter in selectors::select_filters(state) {
            if matched.contains(filter.local_identifier()) {
                continue;
            }
            match filter {
                // single selection filters have no "all" selection
                FilterContextItem::AttributeFilter(attr)
                    if attr.selection_mode == SelectionMode::Multi && attr.selection != AttributeSelection::all() =>
                {
                    changes.push(FilterSelectionValue::Attribute {
                        local_identifier: attr.local_identifier.clone(),
                        selection: AttributeSelection::all(),
                    })
                }
                FilterContextItem::DateFilter(date) if date.selection != DateSelection::AllTime => {
                    changes.push(FilterSelectionValue::Date {
                        local_identifier: date.local_identifier.clone(),
                        selection: DateSelection::AllTime,
                    })
                }
                _ => {}
            }
        }
    }
    Ok(changes)
}

pub(super) fn add_group(
    ctx: &mut HandlerContext,
    title: String,
    filter_local_identifiers: Vec<String>,
    local_identifier: Option<String>,
    index: i64,
) -> CommandResult<EventPayload> {
    validation::non_empty("filter group title", &title)?;
    let local_identifier = local_identifier.unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    let position = ctx.select("filterGroupTarget", |s| -> CommandResult<usize> {
        let groups = selectors::select_filter_groups(s);
        if groups.iter().any(|g| g.local_identifier == local_identifier) {
            return Err(CommandError::user(format!(
                "filter group '{}' already exists",
                local_identifier
            )));
        }
        for id in &filter_local_identifiers {
            if selectors::select_filter(s, id).is_none() {
                return Err(CommandError::not_found(format!("filter '{}'", id)));
            }
        }
        Ok(index::check_insertion(index, groups.len(), "filter group")?)
    })?;

    let group = FilterGroup {
        local_identifier,
        title,
        filter_local_identifiers,
    };
    ctx.put(Mutation::AddFilterGroup {
        position,
        group: group.clone(),
    })?;

    ctx.push_undo(
        CommandPayload::RemoveFilterGroup {
            local_identifier: group.local_identifier.clone(),
        },
        format!("remove filter group '{}'", group.local_identifier),
    );
    Ok(EventPayload::FilterGroupAdded { group })
}

pub(super) fn remove_group(ctx: &mut HandlerContext, local_identifier: String) -> CommandResult<EventPayload> {
    let (group, position) = match ctx.put(Mutation::RemoveFilterGroup { local_identifier })? {
        MutationOutput::GroupRemoved { group, position } => (group, position),
        other => return Err(unexpected(other)),
    };

    ctx.push_undo(
        CommandPayload::AddFilterGroup {
            title: group.title.clone(),
            filter_local_identifiers: group.filter_local_identifiers.clone(),
            local_identifier: Some(group.local_identifier.clone()),
            index: position as i64,
        },
        format!("restore filter group '{}'", group.local_identifier),
    );
    Ok(EventPayload::FilterGroupRemoved { group })
}

/// Remove filters and purge widget ignore lists pointing at them.
///
/// The purge is a second put: if it fails the removal stays committed.
fn remove_filters(ctx: &mut HandlerContext, local_identifiers: Vec<String>) -> CommandResult<Vec<FilterContextItem>> {
    let removed = match ctx.put(Mutation::RemoveFilters { local_identifiers })? {
        MutationOutput::FiltersRemoved(removed) => removed,
        other => return Err(unexpected(other)),
    };
    let references: Vec<FilterReference> = removed.iter().filter_map(|f| f.reference()).collect();
    if !references.is_empty() {
        ctx.put(Mutation::PurgeIgnoredFilters { references })?;
    }
    Ok(removed)
}

/// Move a filter to an absolute position; returns draggable indexes
fn move_filter(
    ctx: &mut HandlerContext,
    local_identifier: &str,
    to_position: usize,
) -> CommandResult<(usize, usize)> {
    let (original, final_position) = match ctx.put(Mutation::MoveFilter {
        local_identifier: local_identifier.to_string(),
        to_position,
    })? {
        MutationOutput::FilterMoved {
            original,
            final_position,
        } => (original, final_position),
        other => return Err(unexpected(other)),
    };
    Ok(ctx.select("draggableIndex", |s| {
        (
            validation::to_draggable(s, original),
            validation::to_draggable(s, final_position),
        )
    }))
}
