//! # dash-store
//!
//! Single normalized, versioned store of the dashboard state.
//!
//! - [`Mutation`] / [`reduce`]: pure `(state, mutation) -> state'` transitions
//! - [`Store`]: serialized writer handing out immutable [`Snapshot`]s
//! - [`selectors`]: read-views, memoized per snapshot
//! - [`invariants`]: structural checker run on load and after mutations

pub mod invariants;
pub mod mutation;
pub mod selectors;
mod store;

pub use mutation::{reduce, resolve_item_definitions, FilterSelectionValue, Mutation, MutationOutput};
pub use selectors::Selector;
pub use store::{Snapshot, Store};

#[cfg(test)]
pub(crate) mod testing {
    use dash_core::*;

    pub fn insight_item(id: &str) -> LayoutItem {
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

    pub fn layout_of(sections: Vec<Vec<&str>>) -> Layout {
        Layout {
            sections: sections
                .into_iter()
                .map(|ids| Section::new(ids.into_iter().map(insight_item).collect()))
                .collect(),
        }
    }

    pub fn nested_item(id: &str, sections: Vec<Vec<&str>>) -> LayoutItem {
        LayoutItem::new(
            ItemSize::new(12, None),
            Widget::NestedLayout(NestedLayoutWidget {
                obj_ref: ObjRef::id(id),
                layout: layout_of(sections),
            }),
        )
    }

    pub fn dashboard(sections: Vec<Vec<&str>>) -> DashboardState {
        DashboardState::new("Test", layout_of(sections))
    }

    pub fn item_refs(state: &DashboardState, section: usize) -> Vec<String> {
        state.active_content().layout.sections[section]
            .items
            .iter()
            .map(|i| i.widget.obj_ref().to_string())
            .collect()
    }

    pub fn attribute_filter(id: &str, display_form: &str) -> FilterContextItem {
        FilterContextItem::AttributeFilter(AttributeFilter {
            local_identifier: id.into(),
            display_form: ObjRef::id(display_form),
            title: None,
            selection: AttributeSelection::all(),
            selection_mode: SelectionMode::Multi,
            parents: vec![],
        })
    }

    pub fn tab(id: &str) -> DashboardTab {
        DashboardTab {
            local_identifier: id.into(),
            title: id.to_uppercase(),
            content: TabContent::default(),
        }
    }

    pub fn with_tabs(ids: &[&str]) -> DashboardState {
        let mut state = dashboard(vec![]);
        state.tabs = ids.iter().map(|id| tab(id)).collect();
        state.active_tab_local_identifier = ids.first().map(|id| id.to_string());
        state
    }
}
