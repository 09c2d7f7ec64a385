//! Structural invariant checker
//!
//! Runs on load and, when `store.verify_invariants` is set, after every
//! mutation. A violation here means a handler let an inconsistent state
//! through validation, so it surfaces as an internal error.

use std::collections::HashSet;

use dash_core::{
    DashError, DashboardState, FilterContext, FilterContextItem, Result, TabContent, Widget,
    GRID_COLUMNS,
};
use dash_layout as layout;

/// Fail with the first violation found
pub fn check(state: &DashboardState) -> Result<()> {
    match violations(state).into_iter().next() {
        Some(violation) => Err(DashError::InvariantViolation(violation)),
        None => Ok(()),
    }
}

/// Every violation, in a stable order
pub fn violations(state: &DashboardState) -> Vec<String> {
    let mut found = Vec::new();
    check_tabs(state, &mut found);
    check_widget_refs(state, &mut found);
    for (name, content) in named_contents(state) {
        check_items(&name, content, &mut found);
        check_filters(&name, &content.filter_context, &mut found);
    }
    if let Some(selected) = &state.ui.selected_widget {
        if layout::find_widget(&state.active_content().layout, selected).is_none() {
            found.push(format!("selected widget {} is not in the active layout", selected));
        }
    }
    found
}

fn named_contents(state: &DashboardState) -> Vec<(String, &TabContent)> {
    let mut out = vec![("implicit tab".to_string(), &state.root)];
    out.extend(
        state
            .tabs
            .iter()
            .map(|t| (format!("tab '{}'", t.local_identifier), &t.content)),
    );
    out
}

fn check_tabs(state: &DashboardState, found: &mut Vec<String>) {
    let mut ids = HashSet::new();
    for tab in &state.tabs {
        if !ids.insert(tab.local_identifier.as_str()) {
            found.push(format!("duplicate tab '{}'", tab.local_identifier));
        }
    }
    match (&state.active_tab_local_identifier, state.tabs.is_empty()) {
        (Some(active), true) => {
            found.push(format!("active tab '{}' set without tabs", active));
        }
        (Some(active), false) if !ids.contains(active.as_str()) => {
            found.push(format!("active tab '{}' does not exist", active));
        }
        (None, false) => found.push("tabs exist but none is active".into()),
        _ => {}
    }
    if !state.tabs.is_empty() {
        let root = &state.root;
        if !root.layout.sections.is_empty() || !root.filter_context.filters.is_empty() {
            found.push("implicit tab has content while tabs exist".into());
        }
    }
}

fn check_widget_refs(state: &DashboardState, found: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for content in state.contents() {
        for (obj_ref, path) in layout::widget_refs(&content.layout) {
            if !seen.insert(obj_ref.clone()) {
                found.push(format!("duplicate widget ref {} at {}", obj_ref, path));
            }
        }
    }
}

fn check_items(name: &str, content: &TabContent, found: &mut Vec<String>) {
    layout::for_each_item(&content.layout, &mut |path, item| {
        let width = item.size.grid_width;
        if width == 0 || width > GRID_COLUMNS {
            found.push(format!("{}: item {} has width {}", name, path, width));
        }
        if item.size.grid_height == Some(0) {
            found.push(format!("{}: item {} has zero height", name, path));
        }
        if let Widget::Insight(insight) = &item.widget {
            let mut drills = HashSet::new();
            for drill in &insight.drills {
                if !drills.insert(drill.local_identifier.as_str()) {
                    found.push(format!(
                        "{}: widget {} has duplicate drill '{}'",
                        name, insight.obj_ref, drill.local_identifier
                    ));
                }
            }
        }
    });
}

fn check_filters(name: &str, context: &FilterContext, found: &mut Vec<String>) {
    let mut ids = HashSet::new();
    let mut data_sets = HashSet::new();
    let mut display_forms = HashSet::new();
    for (idx, filter) in context.filters.iter().enumerate() {
        if !ids.insert(filter.local_identifier()) {
            found.push(format!("{}: duplicate filter '{}'", name, filter.local_identifier()));
        }
        match filter {
            FilterContextItem::DateFilter(date) => {
                if date.data_set.is_none() && idx != 0 {
                    found.push(format!("{}: common date filter at position {}", name, idx));
                }
                if !data_sets.insert(date.data_set.clone()) {
                    found.push(format!(
                        "{}: second date filter for data set {:?}",
                        name, date.data_set
                    ));
                }
            }
            FilterContextItem::AttributeFilter(attr) => {
                if !display_forms.insert(attr.display_form.clone()) {
                    found.push(format!(
                        "{}: second attribute filter for {}",
                        name, attr.display_form
                    ));
                }
            }
        }
    }
    for filter in &context.filters {
        if let FilterContextItem::AttributeFilter(attr) = filter {
            for parent in &attr.parents {
                if !ids.contains(parent.filter_local_identifier.as_str()) {
                    found.push(format!(
                        "{}: filter '{}' has unknown parent '{}'",
                        name, attr.local_identifier, parent.filter_local_identifier
                    ));
                }
            }
        }
    }
    let mut groups = HashSet::new();
    for group in &context.groups {
        if !groups.insert(group.local_identifier.as_str()) {
            found.push(format!("{}: duplicate filter group '{}'", name, group.local_identifier));
        }
        for member in &group.filter_local_identifiers {
            if !ids.contains(member.as_str()) {
                found.push(format!(
                    "{}: group '{}' lists unknown filter '{}'",
                    name, group.local_identifier, member
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use dash_core::{DateFilter, DateSelection, ObjRef};

    #[test]
    fn test_clean_state_passes() {
        let state = dashboard(vec![vec!["a", "b"], vec!["c"]]);
        assert!(check(&state).is_ok());
    }

    #[test]
    fn test_detects_duplicate_refs_across_nesting() {
        let mut state = dashboard(vec![vec!["a"]]);
        state.root.layout.sections[0]
            .items
            .push(nested_item("n", vec![vec!["a"]]));
        let found = violations(&state);
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("duplicate widget ref id:a"));
    }

    #[test]
    fn test_detects_dangling_active_tab() {
        let mut state = with_tabs(&["t1", "t2"]);
        state.active_tab_local_identifier = Some("gone".into());
        let err = check(&state).unwrap_err();
        assert_eq!(err.reason(), dash_core::FailureReason::InternalError);

        state.active_tab_local_identifier = None;
        assert!(check(&state).is_err());
    }

    #[test]
    fn test_common_date_filter_must_lead() {
        let mut state = dashboard(vec![]);
        state.root.filter_context.filters = vec![
            attribute_filter("f1", "df1"),
            FilterContextItem::DateFilter(DateFilter {
                local_identifier: "common".into(),
                data_set: None,
                selection: DateSelection::AllTime,
            }),
        ];
        let found = violations(&state);
        assert!(found.iter().any(|v| v.contains("common date filter at position 1")));
    }

    #[test]
    fn test_stale_selection_reported() {
        let mut state = dashboard(vec![vec!["a"]]);
        state.ui.selected_widget = Some(ObjRef::id("zzz"));
        assert!(check(&state).is_err());
    }
}
