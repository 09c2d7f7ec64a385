//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use std::sync::Arc;

use dash_core::{
    DashboardState, DashboardTab, DrillDefinition, DrillTarget, FailureReason, InsightWidget,
    ItemSize, Layout, LayoutItem, NestedLayoutWidget, ObjRef, RichTextWidget, Section, TabContent,
    Widget,
};
use dash_engine::{
    Backend, Command, CommandOutcome, CommandPayload, Dispatcher, EventPayload, InMemoryBackend,
};

pub fn insight(id: &str) -> InsightWidget {
    InsightWidget {
        obj_ref: ObjRef::id(id),
        title: id.to_string(),
        insight: ObjRef::id(format!("vis-{}", id)),
        drills: vec![],
        ignore_dashboard_filters: vec![],
        date_data_set: None,
    }
}

pub fn insight_item(id: &str) -> LayoutItem {
    LayoutItem::new(ItemSize::new(6, Some(10)), Widget::Insight(insight(id)))
}

pub fn rich_text_item(id: &str, content: &str) -> LayoutItem {
    LayoutItem::new(
        ItemSize::new(4, None),
        Widget::RichText(RichTextWidget {
            obj_ref: ObjRef::id(id),
            content: content.to_string(),
        }),
    )
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

pub fn layout_of(sections: Vec<Vec<&str>>) -> Layout {
    Layout {
        sections: sections
            .into_iter()
            .map(|ids| Section::new(ids.into_iter().map(insight_item).collect()))
            .collect(),
    }
}

pub fn dashboard(sections: Vec<Vec<&str>>) -> DashboardState {
    DashboardState::new("Sales overview", layout_of(sections))
}

/// Dashboard with tabs `ids`, the first one active
pub fn tabbed(ids: &[&str]) -> DashboardState {
    let mut state = dashboard(vec![]);
    state.tabs = ids
        .iter()
        .map(|id| DashboardTab {
            local_identifier: id.to_string(),
            title: id.to_uppercase(),
            content: TabContent::default(),
        })
        .collect();
    state.active_tab_local_identifier = ids.first().map(|id| id.to_string());
    state
}

pub fn drill(id: &str) -> DrillDefinition {
    DrillDefinition {
        local_identifier: id.to_string(),
        origin: "m1".into(),
        target: DrillTarget::ToUrl {
            url: format!("https://example.com/{}", id),
        },
    }
}

/// Backend knowing the region display form and two date data sets
pub fn catalog() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_display_form(ObjRef::id("label.region"), ObjRef::id("attr.region"), "Region")
        .with_display_form(ObjRef::id("label.product"), ObjRef::id("attr.product"), "Product")
        .with_date_dataset(ObjRef::id("ds.created"), "Created")
        .with_date_dataset(ObjRef::id("ds.closed"), "Closed")
}

pub fn dispatcher(state: DashboardState) -> Dispatcher {
    dispatcher_with(state, Arc::new(catalog()))
}

pub fn dispatcher_with(state: DashboardState, backend: Arc<dyn Backend>) -> Dispatcher {
    Dispatcher::new(state, backend, Default::default()).expect("valid initial state")
}

pub async fn run(dispatcher: &Dispatcher, payload: CommandPayload) -> CommandOutcome {
    dispatcher.dispatch_and_wait(Command::new(payload)).await
}

/// Widget identifiers of one section of the active layout
pub fn ids(dispatcher: &Dispatcher, section: usize) -> Vec<String> {
    dispatcher.state().active_content().layout.sections[section]
        .items
        .iter()
        .map(|item| match item.widget.obj_ref() {
            ObjRef::Identifier(id) | ObjRef::Uri(id) => id.clone(),
        })
        .collect()
}

#[track_caller]
pub fn assert_completed(outcome: &CommandOutcome) {
    assert!(
        outcome.is_completed(),
        "expected success, got {:?}",
        outcome.event().payload
    );
}

#[track_caller]
pub fn assert_failed(outcome: &CommandOutcome, reason: FailureReason) {
    match &outcome.event().payload {
        EventPayload::CommandFailed { reason: actual, .. } => assert_eq!(*actual, reason),
        other => panic!("expected commandFailed({}), got {:?}", reason, other),
    }
}
