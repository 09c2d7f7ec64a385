//! Commands accepted by the dispatcher
//!
//! JSON shape: `{"correlationId": "...", "payload": {"type": "resizeHeight", ...}}`.
//! Indexes are signed so `-1` can mean "last" / "append" where an operation
//! allows it; see each variant for the index flavor it validates.

use serde::{Deserialize, Serialize};

use dash_core::{
    AttributeFilterParent, AttributeSelection, DateSelection, DrillDefinition, FilterSettings,
    InsightWidget, ItemDefinition, ItemPath, ItemSize, ObjRef, SectionHeader, SectionPath,
    SelectionMode,
};

use crate::backend::ExportFormat;
use crate::undo::UndoPoint;

/// An intent to change (or read from) the dashboard, consumed exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub payload: CommandPayload,
}

impl Command {
    pub fn new(payload: CommandPayload) -> Self {
        Self {
            correlation_id: None,
            payload,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

impl From<CommandPayload> for Command {
    fn from(payload: CommandPayload) -> Self {
        Self::new(payload)
    }
}

/// New size for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSizeUpdate {
    pub item: ItemPath,
    pub size: ItemSize,
}

/// One filter value in a bulk selection change, matched by what it filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FilterSelection {
    Attribute {
        display_form: ObjRef,
        selection: AttributeSelection,
    },
    /// `data_set: None` matches the common date filter
    Date {
        #[serde(default)]
        data_set: Option<ObjRef>,
        selection: DateSelection,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CommandPayload {
    // Layout
    /// `index`: insertion flavor in the layout owned by `parent`
    AddLayoutSection {
        #[serde(default)]
        parent: ItemPath,
        index: i64,
        #[serde(default)]
        header: Option<SectionHeader>,
        #[serde(default)]
        items: Vec<ItemDefinition>,
    },
    /// `to_index`: slot flavor (`-1` or an existing index)
    MoveLayoutSection { section: SectionPath, to_index: i64 },
    RemoveLayoutSection {
        section: SectionPath,
        #[serde(default)]
        stash: Option<String>,
    },
    /// With `merge`, absent header fields keep their current value
    ChangeLayoutSectionHeader {
        section: SectionPath,
        header: SectionHeader,
        #[serde(default)]
        merge: bool,
    },
    /// `index`: insertion flavor
    AddSectionItems {
        section: SectionPath,
        index: i64,
        items: Vec<ItemDefinition>,
    },
    /// `to_index`: `-1` or `0..=len` of the target section before the move
    MoveSectionItem {
        from: ItemPath,
        to_section: SectionPath,
        to_index: i64,
    },
    RemoveSectionItem {
        item: ItemPath,
        #[serde(default)]
        eager: bool,
        #[serde(default)]
        stash: Option<String>,
    },
    ReplaceSectionItem {
        item: ItemPath,
        replacement: ItemDefinition,
        #[serde(default)]
        stash: Option<String>,
    },
    /// Bare indexes into the layout owned by `parent`: existing flavor
    ResizeHeight {
        #[serde(default)]
        parent: ItemPath,
        section_index: i64,
        item_indexes: Vec<i64>,
        height: u32,
    },
    ResizeWidth { item: ItemPath, width: u32 },
    UpdateItemSizes { sizes: Vec<ItemSizeUpdate> },

    // Widgets
    ChangeWidgetHeader { widget: ObjRef, title: String },
    /// Upsert drills by local identifier
    ModifyDrillsForInsightWidget {
        widget: ObjRef,
        drills: Vec<DrillDefinition>,
    },
    RemoveDrillsForInsightWidget {
        widget: ObjRef,
        local_identifiers: Vec<String>,
    },
    ReplaceInsightWidgetDrills {
        widget: ObjRef,
        drills: Vec<DrillDefinition>,
    },
    ChangeRichTextWidgetContent { widget: ObjRef, content: String },
    ChangeWidgetFilterSettings {
        widget: ObjRef,
        settings: FilterSettings,
    },
    AddVisualizationToSwitcher {
        widget: ObjRef,
        visualization: InsightWidget,
    },
    ExportInsightWidget { widget: ObjRef, format: ExportFormat },

    // Filters
    /// `index`: draggable insertion flavor
    AddAttributeFilter {
        display_form: ObjRef,
        index: i64,
        #[serde(default)]
        local_identifier: Option<String>,
        #[serde(default)]
        initial_selection: Option<AttributeSelection>,
        #[serde(default)]
        selection_mode: SelectionMode,
        #[serde(default)]
        parents: Vec<AttributeFilterParent>,
    },
    RemoveAttributeFilters { local_identifiers: Vec<String> },
    /// `index`: draggable slot flavor
    MoveAttributeFilter { local_identifier: String, index: i64 },
    ChangeAttributeFilterSelection {
        local_identifier: String,
        selection: AttributeSelection,
        #[serde(default)]
        selection_mode: Option<SelectionMode>,
    },
    SetAttributeFilterParents {
        local_identifier: String,
        parents: Vec<AttributeFilterParent>,
    },
    /// `index`: draggable insertion flavor
    AddDateFilter {
        data_set: ObjRef,
        index: i64,
        #[serde(default)]
        local_identifier: Option<String>,
        #[serde(default)]
        selection: DateSelection,
    },
    RemoveDateFilter { data_set: ObjRef },
    /// `index`: draggable slot flavor
    MoveDateFilter { data_set: ObjRef, index: i64 },
    /// `data_set: None` targets the common date filter
    ChangeDateFilterSelection {
        #[serde(default)]
        data_set: Option<ObjRef>,
        selection: DateSelection,
    },
    /// Apply several selections at once. Values matching no filter are
    /// skipped, repeats after the first are ignored; with `reset_others`
    /// every filter not mentioned goes back to its "all" selection.
    ChangeFilterContextSelection {
        filters: Vec<FilterSelection>,
        #[serde(default)]
        reset_others: bool,
    },
    /// `index`: insertion flavor among groups
    AddFilterGroup {
        title: String,
        filter_local_identifiers: Vec<String>,
        #[serde(default)]
        local_identifier: Option<String>,
        #[serde(default = "append")]
        index: i64,
    },
    RemoveFilterGroup { local_identifier: String },

    // Tabs and dashboard
    /// `index`: insertion flavor
    CreateDashboardTab {
        title: String,
        #[serde(default)]
        local_identifier: Option<String>,
        #[serde(default = "append")]
        index: i64,
        #[serde(default)]
        activate: bool,
    },
    DeleteDashboardTab { local_identifier: String },
    /// Both indexes: existing flavor
    RepositionDashboardTab { old_index: i64, new_index: i64 },
    SwitchDashboardTab { local_identifier: String },
    RenameDashboardTab { local_identifier: String, title: String },
    RenameDashboard { title: String },
    SelectWidget {
        #[serde(default)]
        widget: Option<ObjRef>,
    },

    // History
    Undo {
        #[serde(default)]
        undo_point: UndoPoint,
    },
    Redo {},
}

fn append() -> i64 {
    -1
}

impl CommandPayload {
    /// Wire name of the command type
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddLayoutSection { .. } => "addLayoutSection",
            Self::MoveLayoutSection { .. } => "moveLayoutSection",
            Self::RemoveLayoutSection { .. } => "removeLayoutSection",
            Self::ChangeLayoutSectionHeader { .. } => "changeLayoutSectionHeader",
            Self::AddSectionItems { .. } => "addSectionItems",
            Self::MoveSectionItem { .. } => "moveSectionItem",
            Self::RemoveSectionItem { .. } => "removeSectionItem",
            Self::ReplaceSectionItem { .. } => "replaceSectionItem",
            Self::ResizeHeight { .. } => "resizeHeight",
            Self::ResizeWidth { .. } => "resizeWidth",
            Self::UpdateItemSizes { .. } => "updateItemSizes",
            Self::ChangeWidgetHeader { .. } => "changeWidgetHeader",
            Self::ModifyDrillsForInsightWidget { .. } => "modifyDrillsForInsightWidget",
            Self::RemoveDrillsForInsightWidget { .. } => "removeDrillsForInsightWidget",
            Self::ReplaceInsightWidgetDrills { .. } => "replaceInsightWidgetDrills",
            Self::ChangeRichTextWidgetContent { .. } => "changeRichTextWidgetContent",
            Self::ChangeWidgetFilterSettings { .. } => "changeWidgetFilterSettings",
            Self::AddVisualizationToSwitcher { .. } => "addVisualizationToSwitcher",
            Self::ExportInsightWidget { .. } => "exportInsightWidget",
            Self::AddAttributeFilter { .. } => "addAttributeFilter",
            Self::RemoveAttributeFilters { .. } => "removeAttributeFilters",
            Self::MoveAttributeFilter { .. } => "moveAttributeFilter",
            Self::ChangeAttributeFilterSelection { .. } => "changeAttributeFilterSelection",
            Self::SetAttributeFilterParents { .. } => "setAttributeFilterParents",
            Self::AddDateFilter { .. } => "addDateFilter",
            Self::RemoveDateFilter { .. } => "removeDateFilter",
            Self::MoveDateFilter { .. } => "moveDateFilter",
            Self::ChangeDateFilterSelection { .. } => "changeDateFilterSelection",
            Self::ChangeFilterContextSelection { .. } => "changeFilterContextSelection",
            Self::AddFilterGroup { .. } => "addFilterGroup",
            Self::RemoveFilterGroup { .. } => "removeFilterGroup",
            Self::CreateDashboardTab { .. } => "createDashboardTab",
            Self::DeleteDashboardTab { .. } => "deleteDashboardTab",
            Self::RepositionDashboardTab { .. } => "repositionDashboardTab",
            Self::SwitchDashboardTab { .. } => "switchDashboardTab",
            Self::RenameDashboardTab { .. } => "renameDashboardTab",
            Self::RenameDashboard { .. } => "renameDashboard",
            Self::SelectWidget { .. } => "selectWidget",
            Self::Undo { .. } => "undo",
            Self::Redo {} => "redo",
        }
    }

    /// Whether the command edits the dashboard definition.
    ///
    /// Read-only dashboards still allow exporting, switching tabs and
    /// selecting widgets.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Self::ExportInsightWidget { .. }
                | Self::SwitchDashboardTab { .. }
                | Self::SelectWidget { .. }
        )
    }

    /// Whether the command works on the active tab's content.
    ///
    /// Tab-scoped inverses only replay while the same tab is active.
    pub fn is_tab_scoped(&self) -> bool {
        !matches!(
            self,
            Self::CreateDashboardTab { .. }
                | Self::DeleteDashboardTab { .. }
                | Self::RepositionDashboardTab { .. }
                | Self::SwitchDashboardTab { .. }
                | Self::RenameDashboardTab { .. }
                | Self::RenameDashboard { .. }
                | Self::SelectWidget { .. }
                | Self::Undo { .. }
                | Self::Redo {}
        )
    }
}
