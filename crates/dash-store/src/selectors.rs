//! Pure read-views over a dashboard state
//!
//! Plain functions borrow from the state. The [`Selector`] implementations
//! produce owned values and are memoized per snapshot, see
//! [`Snapshot::select`](crate::Snapshot::select). Selectors never fail on a
//! missing entity, they return `None`.

use std::collections::HashMap;

use dash_core::{
    AttributeFilter, DashboardState, DashboardTab, DateFilter, FilterContextItem, FilterGroup,
    ItemPath, Layout, LayoutItem, ObjRef, Widget,
};
use dash_layout as layout;

/// A memoizable derivation
pub trait Selector {
    type Output: Send + Sync + 'static;

    /// Distinguishes parameterizations of the same selector type
    fn key(&self) -> String;

    fn select(&self, state: &DashboardState) -> Self::Output;
}

pub fn select_title(state: &DashboardState) -> &str {
    &state.title
}

/// Layout of the active tab
pub fn select_layout(state: &DashboardState) -> &Layout {
    &state.active_content().layout
}

pub fn select_tabs(state: &DashboardState) -> &[DashboardTab] {
    &state.tabs
}

pub fn select_active_tab(state: &DashboardState) -> Option<&DashboardTab> {
    state.active_tab_index().map(|idx| &state.tabs[idx])
}

pub fn select_tab_index(state: &DashboardState, local_identifier: &str) -> Option<usize> {
    state
        .tabs
        .iter()
        .position(|t| t.local_identifier == local_identifier)
}

pub fn select_widget_path_by_ref(state: &DashboardState, obj_ref: &ObjRef) -> Option<ItemPath> {
    layout::find_widget(select_layout(state), obj_ref)
}

pub fn select_item_by_ref<'a>(state: &'a DashboardState, obj_ref: &ObjRef) -> Option<&'a LayoutItem> {
    let path = select_widget_path_by_ref(state, obj_ref)?;
    layout::item(select_layout(state), &path).ok()
}

pub fn select_widget_by_ref<'a>(state: &'a DashboardState, obj_ref: &ObjRef) -> Option<&'a Widget> {
    select_item_by_ref(state, obj_ref).map(|item| &item.widget)
}

pub fn select_filters(state: &DashboardState) -> &[FilterContextItem] {
    &state.active_content().filter_context.filters
}

pub fn select_filter<'a>(
    state: &'a DashboardState,
    local_identifier: &str,
) -> Option<&'a FilterContextItem> {
    select_filters(state)
        .iter()
        .find(|f| f.local_identifier() == local_identifier)
}

pub fn select_attribute_filter<'a>(
    state: &'a DashboardState,
    local_identifier: &str,
) -> Option<&'a AttributeFilter> {
    match select_filter(state, local_identifier)? {
        FilterContextItem::AttributeFilter(attr) => Some(attr),
        FilterContextItem::DateFilter(_) => None,
    }
}

pub fn select_attribute_filter_by_display_form<'a>(
    state: &'a DashboardState,
    display_form: &ObjRef,
) -> Option<&'a AttributeFilter> {
    select_filters(state).iter().find_map(|f| match f {
        FilterContextItem::AttributeFilter(attr) if &attr.display_form == display_form => Some(attr),
        _ => None,
    })
}

/// Date filter for `data_set`; `None` selects the common date filter
pub fn select_date_filter_by_data_set<'a>(
    state: &'a DashboardState,
    data_set: Option<&ObjRef>,
) -> Option<&'a DateFilter> {
    select_filters(state).iter().find_map(|f| match f {
        FilterContextItem::DateFilter(date) if date.data_set.as_ref() == data_set => Some(date),
        _ => None,
    })
}

pub fn has_common_date_filter(state: &DashboardState) -> bool {
    select_filters(state)
        .first()
        .is_some_and(FilterContextItem::is_common_date_filter)
}

/// Filters the user can reorder: everything except the common date filter
pub fn select_draggable_filters(state: &DashboardState) -> &[FilterContextItem] {
    let filters = select_filters(state);
    if has_common_date_filter(state) {
        &filters[1..]
    } else {
        filters
    }
}

pub fn select_filter_groups(state: &DashboardState) -> &[FilterGroup] {
    &state.active_content().filter_context.groups
}

pub fn select_can_edit(state: &DashboardState) -> bool {
    state.permissions.can_edit
}

pub fn select_selected_widget(state: &DashboardState) -> Option<&ObjRef> {
    state.ui.selected_widget.as_ref()
}

/// Flattened widget map of the active layout: ref to owning item path
pub struct WidgetIndex;

impl Selector for WidgetIndex {
    type Output = HashMap<ObjRef, ItemPath>;

    fn key(&self) -> String {
        String::new()
    }

    fn select(&self, state: &DashboardState) -> Self::Output {
        layout::widget_refs(select_layout(state)).into_iter().collect()
    }
}

/// Owned copy of the widget with a given ref
pub struct WidgetByRef(pub ObjRef);

impl Selector for WidgetByRef {
    type Output = Option<Widget>;

    fn key(&self) -> String {
        self.0.to_string()
    }

    fn select(&self, state: &DashboardState) -> Self::Output {
        select_widget_by_ref(state, &self.0).cloned()
    }
}

/// Owned copy of the draggable filters
pub struct DraggableFilters;

impl Selector for DraggableFilters {
    type Output = Vec<FilterContextItem>;

    fn key(&self) -> String {
        String::new()
    }

    fn select(&self, state: &DashboardState) -> Self::Output {
        select_draggable_filters(state).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use dash_core::DateSelection;

    fn date(id: &str, data_set: Option<&str>) -> FilterContextItem {
        FilterContextItem::DateFilter(DateFilter {
            local_identifier: id.into(),
            data_set: data_set.map(ObjRef::id),
            selection: DateSelection::AllTime,
        })
    }

    #[test]
    fn test_widget_lookup_reaches_nested_layouts() {
        let mut state = dashboard(vec![vec!["a"]]);
        state.root.layout.sections[0]
            .items
            .push(nested_item("n", vec![vec!["b"]]));

        let path = select_widget_path_by_ref(&state, &ObjRef::id("b")).unwrap();
        assert_eq!(path.to_string(), "0:1/0:0");
        assert!(select_widget_by_ref(&state, &ObjRef::id("b")).is_some());
        assert!(select_widget_by_ref(&state, &ObjRef::id("missing")).is_none());
    }

    #[test]
    fn test_draggable_filters_skip_common_date_filter() {
        let mut state = dashboard(vec![]);
        state.root.filter_context.filters = vec![
            date("common", None),
            attribute_filter("f1", "df1"),
            date("d1", Some("ds1")),
        ];
        let draggable: Vec<&str> = select_draggable_filters(&state)
            .iter()
            .map(|f| f.local_identifier())
            .collect();
        assert_eq!(draggable, vec!["f1", "d1"]);

        assert_eq!(
            select_date_filter_by_data_set(&state, None).map(|d| d.local_identifier.as_str()),
            Some("common")
        );
        assert_eq!(
            select_date_filter_by_data_set(&state, Some(&ObjRef::id("ds1")))
                .map(|d| d.local_identifier.as_str()),
            Some("d1")
        );
        assert!(select_date_filter_by_data_set(&state, Some(&ObjRef::id("zz"))).is_none());
    }

    #[test]
    fn test_filter_lookup_by_identifier() {
        let mut state = dashboard(vec![]);
        state.root.filter_context.filters = vec![date("d1", Some("ds1")), attribute_filter("f1", "df1")];

        // the lookup key is a temporary; the result borrows only the state
        let found = select_filter(&state, &String::from("f1"));
        assert_eq!(found.map(|f| f.local_identifier()), Some("f1"));
        assert_eq!(
            select_attribute_filter(&state, "f1").map(|f| f.display_form.clone()),
            Some(ObjRef::id("df1"))
        );
        assert!(select_attribute_filter(&state, "d1").is_none());
        assert!(select_filter(&state, "missing").is_none());
    }

    #[test]
    fn test_active_tab_selection() {
        let mut state = with_tabs(&["t1", "t2"]);
        state.active_tab_local_identifier = Some("t2".into());
        assert_eq!(select_active_tab(&state).map(|t| t.title.as_str()), Some("T2"));
        assert_eq!(select_tab_index(&state, "t1"), Some(0));
        assert_eq!(select_tab_index(&state, "t9"), None);
    }
}
