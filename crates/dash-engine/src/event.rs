//! Events emitted by the dispatcher
//!
//! Every command produces `commandStarted` followed by exactly one terminal
//! event: its success event, `commandFailed` or `commandCancelled`. All carry
//! the originating correlation id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dash_core::{
    AttributeFilter, DateFilter, DrillDefinition, FailureReason, FilterContextItem, FilterGroup,
    FilterSettings, ItemPath, ObjRef, SectionHeader, SectionPath,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(correlation_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// False only for `commandStarted`
    pub fn is_terminal(&self) -> bool {
        !matches!(self.payload, EventPayload::CommandStarted { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.payload, EventPayload::CommandFailed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EventPayload {
    // Lifecycle
    CommandStarted {
        command: String,
    },
    CommandFailed {
        reason: FailureReason,
        message: String,
        partially_applied: bool,
    },
    CommandCancelled {
        partially_applied: bool,
    },

    // Layout
    LayoutSectionAdded {
        section: SectionPath,
        item_count: usize,
    },
    LayoutSectionMoved {
        from: SectionPath,
        to: SectionPath,
    },
    LayoutSectionRemoved {
        section: SectionPath,
        stash: Option<String>,
    },
    LayoutSectionHeaderChanged {
        section: SectionPath,
        header: Option<SectionHeader>,
    },
    LayoutSectionItemsAdded {
        first: ItemPath,
        count: usize,
    },
    LayoutSectionItemMoved {
        from: ItemPath,
        to: ItemPath,
    },
    LayoutSectionItemRemoved {
        item: ItemPath,
        widget: ObjRef,
        section_removed: bool,
        stash: Option<String>,
    },
    LayoutSectionItemReplaced {
        item: ItemPath,
        previous: ObjRef,
        replacement: ObjRef,
    },
    LayoutSectionItemsHeightResized {
        items: Vec<ItemPath>,
        height: u32,
    },
    LayoutSectionItemWidthResized {
        item: ItemPath,
        width: u32,
    },
    LayoutItemSizesUpdated {
        items: Vec<ItemPath>,
    },

    // Widgets
    WidgetHeaderChanged {
        widget: ObjRef,
        title: String,
    },
    InsightWidgetDrillsModified {
        widget: ObjRef,
        added: Vec<DrillDefinition>,
        updated: Vec<DrillDefinition>,
    },
    InsightWidgetDrillsRemoved {
        widget: ObjRef,
        removed: Vec<DrillDefinition>,
    },
    InsightWidgetDrillsReplaced {
        widget: ObjRef,
        drills: Vec<DrillDefinition>,
    },
    RichTextWidgetContentChanged {
        widget: ObjRef,
        content: String,
    },
    WidgetFilterSettingsChanged {
        widget: ObjRef,
        settings: FilterSettings,
    },
    VisualizationSwitcherVisualizationAdded {
        widget: ObjRef,
        visualization: ObjRef,
    },
    InsightWidgetExportResolved {
        widget: ObjRef,
        uri: String,
    },

    // Filters
    AttributeFilterAdded {
        filter: AttributeFilter,
        index: usize,
    },
    AttributeFiltersRemoved {
        removed: Vec<AttributeFilter>,
    },
    AttributeFilterMoved {
        local_identifier: String,
        original_index: usize,
        final_index: usize,
    },
    AttributeFilterSelectionChanged {
        filter: AttributeFilter,
    },
    AttributeFilterParentsChanged {
        filter: AttributeFilter,
    },
    DateFilterAdded {
        filter: DateFilter,
        index: usize,
    },
    DateFilterRemoved {
        filter: DateFilter,
    },
    DateFilterMoved {
        data_set: ObjRef,
        original_index: usize,
        final_index: usize,
    },
    DateFilterSelectionChanged {
        filter: DateFilter,
    },
    FilterContextSelectionChanged {
        filters: Vec<FilterContextItem>,
    },
    FilterGroupAdded {
        group: FilterGroup,
    },
    FilterGroupRemoved {
        group: FilterGroup,
    },

    // Tabs and dashboard
    DashboardTabCreated {
        local_identifier: String,
        index: usize,
    },
    DashboardTabDeleted {
        local_identifier: String,
    },
    DashboardTabRepositioned {
        old_index: usize,
        new_index: usize,
        tabs: Vec<String>,
    },
    DashboardTabSwitched {
        previous: Option<String>,
        current: String,
    },
    DashboardTabRenamed {
        local_identifier: String,
        title: String,
    },
    DashboardRenamed {
        title: String,
    },
    WidgetSelected {
        widget: Option<ObjRef>,
    },

    // History
    DashboardUndone {
        undone: Vec<String>,
    },
    DashboardRedone {
        redone: Vec<String>,
    },
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CommandStarted { .. } => "commandStarted",
            Self::CommandFailed { .. } => "commandFailed",
            Self::CommandCancelled { .. } => "commandCancelled",
            Self::LayoutSectionAdded { .. } => "layoutSectionAdded",
            Self::LayoutSectionMoved { .. } => "layoutSectionMoved",
            Self::LayoutSectionRemoved { .. } => "layoutSectionRemoved",
            Self::LayoutSectionHeaderChanged { .. } => "layoutSectionHeaderChanged",
            Self::LayoutSectionItemsAdded { .. } => "layoutSectionItemsAdded",
            Self::LayoutSectionItemMoved { .. } => "layoutSectionItemMoved",
            Self::LayoutSectionItemRemoved { .. } => "layoutSectionItemRemoved",
            Self::LayoutSectionItemReplaced { .. } => "layoutSectionItemReplaced",
            Self::LayoutSectionItemsHeightResized { .. } => "layoutSectionItemsHeightResized",
            Self::LayoutSectionItemWidthResized { .. } => "layoutSectionItemWidthResized",
            Self::LayoutItemSizesUpdated { .. } => "layoutItemSizesUpdated",
            Self::WidgetHeaderChanged { .. } => "widgetHeaderChanged",
            Self::InsightWidgetDrillsModified { .. } => "insightWidgetDrillsModified",
            Self::InsightWidgetDrillsRemoved { .. } => "insightWidgetDrillsRemoved",
            Self::InsightWidgetDrillsReplaced { .. } => "insightWidgetDrillsReplaced",
            Self::RichTextWidgetContentChanged { .. } => "richTextWidgetContentChanged",
            Self::WidgetFilterSettingsChanged { .. } => "widgetFilterSettingsChanged",
            Self::VisualizationSwitcherVisualizationAdded { .. } => {
                "visualizationSwitcherVisualizationAdded"
            }
            Self::InsightWidgetExportResolved { .. } => "insightWidgetExportResolved",
            Self::AttributeFilterAdded { .. } => "attributeFilterAdded",
            Self::AttributeFiltersRemoved { .. } => "attributeFiltersRemoved",
            Self::AttributeFilterMoved { .. } => "attributeFilterMoved",
            Self::AttributeFilterSelectionChanged { .. } => "attributeFilterSelectionChanged",
            Self::AttributeFilterParentsChanged { .. } => "attributeFilterParentsChanged",
            Self::DateFilterAdded { .. } => "dateFilterAdded",
            Self::DateFilterRemoved { .. } => "dateFilterRemoved",
            Self::DateFilterMoved { .. } => "dateFilterMoved",
            Self::DateFilterSelectionChanged { .. } => "dateFilterSelectionChanged",
            Self::FilterContextSelectionChanged { .. } => "filterContextSelectionChanged",
            Self::FilterGroupAdded { .. } => "filterGroupAdded",
            Self::FilterGroupRemoved { .. } => "filterGroupRemoved",
            Self::DashboardTabCreated { .. } => "dashboardTabCreated",
            Self::DashboardTabDeleted { .. } => "dashboardTabDeleted",
            Self::DashboardTabRepositioned { .. } => "dashboardTabRepositioned",
            Self::DashboardTabSwitched { .. } => "dashboardTabSwitched",
            Self::DashboardTabRenamed { .. } => "dashboardTabRenamed",
            Self::DashboardRenamed { .. } => "dashboardRenamed",
            Self::WidgetSelected { .. } => "widgetSelected",
            Self::DashboardUndone { .. } => "dashboardUndone",
            Self::DashboardRedone { .. } => "dashboardRedone",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_event_wire_shape() {
        let event = Event::new(
            "c-9",
            EventPayload::CommandFailed {
                reason: FailureReason::UserError,
                message: "height 0 outside 1..=40".into(),
                partially_applied: false,
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["correlationId"], "c-9");
        assert_eq!(json["payload"]["type"], "commandFailed");
        assert_eq!(json["payload"]["reason"], "USER_ERROR");
        assert_eq!(json["payload"]["partiallyApplied"], false);
        assert!(event.is_terminal());
        assert!(event.is_failure());
    }

    #[test]
    fn test_date_filter_moved_shape() {
        let payload = EventPayload::DateFilterMoved {
            data_set: ObjRef::id("ds"),
            original_index: 0,
            final_index: 1,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "dateFilterMoved");
        assert_eq!(json["originalIndex"], 0);
        assert_eq!(json["finalIndex"], 1);
        assert_eq!(payload.kind(), "dateFilterMoved");
    }
}
