//! Command validation
//!
//! Checks run against a snapshot before any `put`. Each returns the resolved
//! entities so handlers do not select them again.

use std::collections::HashSet;

use dash_core::{
    AttributeFilter, AttributeFilterParent, AttributeSelection, DashboardState, DateFilter,
    DateSelection, DrillDefinition, FilterContextItem, InsightWidget, ItemPath, ItemSize,
    LayoutItem, LayoutLimits, ObjRef, SelectionMode, Widget,
};
use dash_layout::{self as layout, index};
use dash_store::selectors;

use crate::command::CommandPayload;
use crate::error::{CommandError, CommandResult};

/// Read-only dashboards reject everything that edits the definition
pub fn ensure_can_edit(state: &DashboardState, payload: &CommandPayload) -> CommandResult<()> {
    if payload.is_mutating() && !selectors::select_can_edit(state) {
        return Err(CommandError::user(format!(
            "dashboard is read-only, {} not allowed",
            payload.kind()
        )));
    }
    Ok(())
}

pub fn non_empty(what: &str, value: &str) -> CommandResult<()> {
    if value.trim().is_empty() {
        return Err(CommandError::user(format!("{} must not be empty", what)));
    }
    Ok(())
}

/// Widget with `obj_ref` in the active layout, with its item path
pub fn widget(state: &DashboardState, obj_ref: &ObjRef) -> CommandResult<(ItemPath, Widget)> {
    let path = selectors::select_widget_path_by_ref(state, obj_ref)
        .ok_or_else(|| CommandError::not_found(format!("widget {}", obj_ref)))?;
    let widget = selectors::select_widget_by_ref(state, obj_ref)
        .cloned()
        .ok_or_else(|| CommandError::not_found(format!("widget {}", obj_ref)))?;
    Ok((path, widget))
}

pub fn insight(state: &DashboardState, obj_ref: &ObjRef) -> CommandResult<InsightWidget> {
    match widget(state, obj_ref)?.1 {
        Widget::Insight(insight) => Ok(insight),
        other => Err(CommandError::user(format!(
            "widget {} is {}, expected insight",
            obj_ref,
            other.kind()
        ))),
    }
}

pub fn check_height(height: u32, limits: &LayoutLimits) -> CommandResult<()> {
    Ok(layout::check_height(height, limits)?)
}

pub fn check_width(width: u32, limits: &LayoutLimits) -> CommandResult<()> {
    Ok(layout::check_width(width, limits)?)
}

pub fn check_size(size: &ItemSize, limits: &LayoutLimits) -> CommandResult<()> {
    check_width(size.grid_width, limits)?;
    if let Some(height) = size.grid_height {
        check_height(height, limits)?;
    }
    Ok(())
}

/// Targets of a height resize.
///
/// The height is checked before any index so an invalid height fails the
/// same way whatever the indexes are.
pub fn resize_height_targets(
    state: &DashboardState,
    limits: &LayoutLimits,
    parent: &ItemPath,
    section_index: i64,
    item_indexes: &[i64],
    height: u32,
) -> CommandResult<Vec<(ItemPath, ItemSize)>> {
    check_height(height, limits)?;
    if item_indexes.is_empty() {
        return Err(CommandError::user("no items to resize"));
    }
    let root = selectors::select_layout(state);
    let mut targets = Vec::with_capacity(item_indexes.len());
    for &item_index in item_indexes {
        let path = layout::item_path_from_indexes(root, parent, section_index, item_index)?;
        let current = layout::item(root, &path)?.size;
        targets.push((path, ItemSize::new(current.grid_width, Some(height))));
    }
    Ok(targets)
}

/// Items about to enter the layout: sizes in range, refs unused.
///
/// `replacing` names an item whose refs leave the layout in the same mutation.
pub fn new_items(
    state: &DashboardState,
    items: &[LayoutItem],
    limits: &LayoutLimits,
    replacing: Option<&ItemPath>,
) -> CommandResult<()> {
    let freed: HashSet<ObjRef> = match replacing {
        Some(path) => layout::refs_in_item(layout::item(selectors::select_layout(state), path)?)
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };
    let mut taken: HashSet<ObjRef> = state
        .contents()
        .flat_map(|c| layout::widget_refs(&c.layout))
        .map(|(obj_ref, _)| obj_ref)
        .filter(|r| !freed.contains(r))
        .collect();

    for item in items {
        check_size(&item.size, limits)?;
        for obj_ref in layout::refs_in_item(item) {
            if !taken.insert(obj_ref.clone()) {
                return Err(CommandError::user(format!("widget ref {} already in use", obj_ref)));
            }
        }
    }
    Ok(())
}

pub fn unique_drills(drills: &[DrillDefinition]) -> CommandResult<()> {
    let mut seen = HashSet::new();
    for drill in drills {
        non_empty("drill local identifier", &drill.local_identifier)?;
        if !seen.insert(drill.local_identifier.as_str()) {
            return Err(CommandError::user(format!(
                "duplicate drill '{}'",
                drill.local_identifier
            )));
        }
    }
    Ok(())
}

/// Single selection mode accepts at most one positively selected element
pub fn attribute_selection(selection: &AttributeSelection, mode: SelectionMode) -> CommandResult<()> {
    if mode == SelectionMode::Single && (selection.negative || selection.elements.len() > 1) {
        return Err(CommandError::user(
            "single selection mode needs a positive selection of at most one element",
        ));
    }
    Ok(())
}

pub fn date_selection(selection: &DateSelection) -> CommandResult<()> {
    match selection {
        DateSelection::AllTime => Ok(()),
        DateSelection::Relative { from, to, .. } if from > to => Err(CommandError::user(format!(
            "relative date range {}..{} is reversed",
            from, to
        ))),
        DateSelection::Absolute { from, to } if from > to => Err(CommandError::user(format!(
            "absolute date range {}..{} is reversed",
            from, to
        ))),
        _ => Ok(()),
    }
}

pub fn attribute_filter(state: &DashboardState, local_identifier: &str) -> CommandResult<AttributeFilter> {
    match selectors::select_filter(state, local_identifier) {
        Some(FilterContextItem::AttributeFilter(attr)) => Ok(attr.clone()),
        Some(FilterContextItem::DateFilter(_)) => Err(CommandError::user(format!(
            "filter '{}' is a date filter",
            local_identifier
        ))),
        None => Err(CommandError::not_found(format!(
            "attribute filter '{}'",
            local_identifier
        ))),
    }
}

/// Date filter for `data_set`; `None` is the common date filter
pub fn date_filter(state: &DashboardState, data_set: Option<&ObjRef>) -> CommandResult<DateFilter> {
    selectors::select_date_filter_by_data_set(state, data_set)
        .cloned()
        .ok_or_else(|| match data_set {
            Some(ds) => CommandError::not_found(format!("date filter for {}", ds)),
            None => CommandError::not_found("common date filter"),
        })
}

/// Parents must be other attribute filters of the same context
pub fn parents(
    state: &DashboardState,
    local_identifier: &str,
    parents: &[AttributeFilterParent],
) -> CommandResult<()> {
    let mut seen = HashSet::new();
    for parent in parents {
        let id = parent.filter_local_identifier.as_str();
        if id == local_identifier {
            return Err(CommandError::user(format!("filter '{}' cannot be its own parent", id)));
        }
        if !seen.insert(id) {
            return Err(CommandError::user(format!("parent '{}' listed twice", id)));
        }
        attribute_filter(state, id)?;
    }
    Ok(())
}

/// Local identifier not used by any filter of the active context
pub fn fresh_filter_identifier(state: &DashboardState, local_identifier: &str) -> CommandResult<()> {
    non_empty("filter local identifier", local_identifier)?;
    if selectors::select_filter(state, local_identifier).is_some() {
        return Err(CommandError::user(format!(
            "filter '{}' already exists",
            local_identifier
        )));
    }
    Ok(())
}

fn draggable_offset(state: &DashboardState) -> usize {
    usize::from(selectors::has_common_date_filter(state))
}

/// Absolute filter position for a draggable insertion index
pub fn draggable_insertion(state: &DashboardState, index: i64) -> CommandResult<usize> {
    let draggable = selectors::select_draggable_filters(state).len();
    let at = index::check_insertion(index, draggable, "filter")?;
    Ok(at + draggable_offset(state))
}

/// Absolute filter position for a draggable slot index
pub fn draggable_slot(state: &DashboardState, index: i64) -> CommandResult<usize> {
    let draggable = selectors::select_draggable_filters(state).len();
    let at = index::check_slot(index, draggable, "filter")?;
    Ok(at + draggable_offset(state))
}

/// Draggable index of an absolute filter position
pub fn to_draggable(state: &DashboardState, position: usize) -> usize {
    position.saturating_sub(draggable_offset(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dash_core::{InsightWidget, Layout, Section};

    fn insight_item(id: &str) -> LayoutItem {
        LayoutItem::new(
            ItemSize::new(6, Some(10)),
            Widget::Insight(InsightWidget {
                obj_ref: ObjRef::id(id),
                title: id.to_string(),
                insight: ObjRef::id(format!("vis-{}", id)),
                drills: vec![],
                ignore_dashboard_filters: vec![],
                date_data_set: None,
            }),
        )
    }

    fn state() -> DashboardState {
        DashboardState::new(
            "Test",
            Layout {
                sections: vec![Section::new(vec![insight_item("a"), insight_item("b")])],
            },
        )
    }

    fn common_date() -> FilterContextItem {
        FilterContextItem::DateFilter(DateFilter {
            local_identifier: "date".into(),
            data_set: None,
            selection: DateSelection::AllTime,
        })
    }

    #[test]
    fn test_height_checked_before_indexes() {
        let limits = LayoutLimits::default();
        let err = resize_height_targets(&state(), &limits, &ItemPath::root(), 7, &[9], 0).unwrap_err();
        assert!(err.to_string().contains("height"));
        assert_eq!(err.reason(), dash_core::FailureReason::UserError);

        let err = resize_height_targets(&state(), &limits, &ItemPath::root(), 0, &[2], 5).unwrap_err();
        assert_eq!(err.reason(), dash_core::FailureReason::UserError);

        let targets = resize_height_targets(&state(), &limits, &ItemPath::root(), 0, &[1], 5).unwrap();
        assert_eq!(targets, vec![(ItemPath::single(0, 1), ItemSize::new(6, Some(5)))]);
    }

    #[test]
    fn test_new_items_reject_duplicate_refs() {
        let limits = LayoutLimits::default();
        let state = state();
        assert!(new_items(&state, &[insight_item("c")], &limits, None).is_ok());
        assert!(new_items(&state, &[insight_item("a")], &limits, None).is_err());
        assert!(new_items(&state, &[insight_item("c"), insight_item("c")], &limits, None).is_err());
        // replacing a with a fresh copy of a is fine
        assert!(new_items(&state, &[insight_item("a")], &limits, Some(&ItemPath::single(0, 0))).is_ok());

        let mut wide = insight_item("w");
        wide.size.grid_width = 13;
        assert!(new_items(&state, &[wide], &limits, None).is_err());
    }

    #[test]
    fn test_single_mode_selection() {
        let one = AttributeSelection {
            elements: vec!["east".into()],
            negative: false,
        };
        assert!(attribute_selection(&one, SelectionMode::Single).is_ok());
        assert!(attribute_selection(&AttributeSelection::all(), SelectionMode::Single).is_err());
        assert!(attribute_selection(&AttributeSelection::all(), SelectionMode::Multi).is_ok());
    }

    #[test]
    fn test_draggable_indexes_skip_common_date_filter() {
        let mut state = state();
        state.root.filter_context.filters = vec![
            common_date(),
            FilterContextItem::DateFilter(DateFilter {
                local_identifier: "d1".into(),
                data_set: Some(ObjRef::id("ds1")),
                selection: DateSelection::AllTime,
            }),
        ];
        assert_eq!(draggable_insertion(&state, -1).unwrap(), 2);
        assert_eq!(draggable_insertion(&state, 0).unwrap(), 1);
        assert!(draggable_insertion(&state, 2).is_err());
        assert_eq!(draggable_slot(&state, -1).unwrap(), 1);
        assert_eq!(to_draggable(&state, 1), 0);
    }

    #[test]
    fn test_reversed_date_range() {
        let reversed = DateSelection::Relative {
            granularity: dash_core::DateGranularity::Month,
            from: 0,
            to: -3,
        };
        assert!(date_selection(&reversed).is_err());
        assert!(date_selection(&DateSelection::AllTime).is_ok());
    }
}
