//! Core type definitions for dashboard state

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference to a metadata object or widget
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjRef {
    Identifier(String),
    Uri(String),
}

impl ObjRef {
    /// Identifier reference
    pub fn id(identifier: impl Into<String>) -> Self {
        Self::Identifier(identifier.into())
    }
}

impl std::fmt::Display for ObjRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identifier(id) => write!(f, "id:{}", id),
            Self::Uri(uri) => write!(f, "uri:{}", uri),
        }
    }
}

// ---------------------------------------------------------------------------
// Layout

/// A grid layout: ordered sections of items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<SectionHeader>,
    #[serde(default)]
    pub items: Vec<LayoutItem>,
}

impl Section {
    pub fn new(items: Vec<LayoutItem>) -> Self {
        Self { header: None, items }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SectionHeader {
    /// Overlay the fields present in `update`
    pub fn merged(&self, update: &SectionHeader) -> SectionHeader {
        SectionHeader {
            title: update.title.clone().or_else(|| self.title.clone()),
            description: update
                .description
                .clone()
                .or_else(|| self.description.clone()),
        }
    }
}

/// Grid size of an item; height falls back to the widget default when absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSize {
    pub grid_width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_height: Option<u32>,
}

impl ItemSize {
    pub fn new(grid_width: u32, grid_height: Option<u32>) -> Self {
        Self {
            grid_width,
            grid_height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    pub size: ItemSize,
    pub widget: Widget,
}

impl LayoutItem {
    pub fn new(size: ItemSize, widget: Widget) -> Self {
        Self { size, widget }
    }
}

/// Item to place into a layout: a concrete item or the contents of a stash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemDefinition {
    Item(LayoutItem),
    Stash(String),
}

// ---------------------------------------------------------------------------
// Widgets

/// Widget variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetKind {
    Insight,
    RichText,
    Kpi,
    VisualizationSwitcher,
    NestedLayout,
    Placeholder,
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insight => write!(f, "insight"),
            Self::RichText => write!(f, "richText"),
            Self::Kpi => write!(f, "kpi"),
            Self::VisualizationSwitcher => write!(f, "visualizationSwitcher"),
            Self::NestedLayout => write!(f, "nestedLayout"),
            Self::Placeholder => write!(f, "placeholder"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Widget {
    Insight(InsightWidget),
    RichText(RichTextWidget),
    Kpi(KpiWidget),
    VisualizationSwitcher(VisualizationSwitcherWidget),
    NestedLayout(NestedLayoutWidget),
    Placeholder(PlaceholderWidget),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightWidget {
    #[serde(rename = "ref")]
    pub obj_ref: ObjRef,
    #[serde(default)]
    pub title: String,
    pub insight: ObjRef,
    #[serde(default)]
    pub drills: Vec<DrillDefinition>,
    #[serde(default)]
    pub ignore_dashboard_filters: Vec<FilterReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_data_set: Option<ObjRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichTextWidget {
    #[serde(rename = "ref")]
    pub obj_ref: ObjRef,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiWidget {
    #[serde(rename = "ref")]
    pub obj_ref: ObjRef,
    #[serde(default)]
    pub title: String,
    pub measure: ObjRef,
    #[serde(default)]
    pub ignore_dashboard_filters: Vec<FilterReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_data_set: Option<ObjRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationSwitcherWidget {
    #[serde(rename = "ref")]
    pub obj_ref: ObjRef,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub visualizations: Vec<InsightWidget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedLayoutWidget {
    #[serde(rename = "ref")]
    pub obj_ref: ObjRef,
    #[serde(default)]
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderWidget {
    #[serde(rename = "ref")]
    pub obj_ref: ObjRef,
}

/// Which dashboard filters a widget ignores and which date data set it follows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSettings {
    #[serde(default)]
    pub ignore_dashboard_filters: Vec<FilterReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_data_set: Option<ObjRef>,
}

impl Widget {
    pub fn obj_ref(&self) -> &ObjRef {
        match self {
            Self::Insight(w) => &w.obj_ref,
            Self::RichText(w) => &w.obj_ref,
            Self::Kpi(w) => &w.obj_ref,
            Self::VisualizationSwitcher(w) => &w.obj_ref,
            Self::NestedLayout(w) => &w.obj_ref,
            Self::Placeholder(w) => &w.obj_ref,
        }
    }

    pub fn kind(&self) -> WidgetKind {
        match self {
            Self::Insight(_) => WidgetKind::Insight,
            Self::RichText(_) => WidgetKind::RichText,
            Self::Kpi(_) => WidgetKind::Kpi,
            Self::VisualizationSwitcher(_) => WidgetKind::VisualizationSwitcher,
            Self::NestedLayout(_) => WidgetKind::NestedLayout,
            Self::Placeholder(_) => WidgetKind::Placeholder,
        }
    }

    /// Header title, for widgets that carry one
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Insight(w) => Some(&w.title),
            Self::Kpi(w) => Some(&w.title),
            Self::VisualizationSwitcher(w) => Some(&w.title),
            Self::RichText(_) | Self::NestedLayout(_) | Self::Placeholder(_) => None,
        }
    }

    pub fn title_mut(&mut self) -> Option<&mut String> {
        match self {
            Self::Insight(w) => Some(&mut w.title),
            Self::Kpi(w) => Some(&mut w.title),
            Self::VisualizationSwitcher(w) => Some(&mut w.title),
            Self::RichText(_) | Self::NestedLayout(_) | Self::Placeholder(_) => None,
        }
    }

    pub fn nested_layout(&self) -> Option<&Layout> {
        match self {
            Self::NestedLayout(w) => Some(&w.layout),
            _ => None,
        }
    }

    pub fn nested_layout_mut(&mut self) -> Option<&mut Layout> {
        match self {
            Self::NestedLayout(w) => Some(&mut w.layout),
            _ => None,
        }
    }

    /// Filter settings of insight and KPI widgets
    pub fn filter_settings(&self) -> Option<FilterSettings> {
        match self {
            Self::Insight(w) => Some(FilterSettings {
                ignore_dashboard_filters: w.ignore_dashboard_filters.clone(),
                date_data_set: w.date_data_set.clone(),
            }),
            Self::Kpi(w) => Some(FilterSettings {
                ignore_dashboard_filters: w.ignore_dashboard_filters.clone(),
                date_data_set: w.date_data_set.clone(),
            }),
            _ => None,
        }
    }

    /// Replace filter settings; false when the widget kind has none
    pub fn set_filter_settings(&mut self, settings: FilterSettings) -> bool {
        match self {
            Self::Insight(w) => {
                w.ignore_dashboard_filters = settings.ignore_dashboard_filters;
                w.date_data_set = settings.date_data_set;
                true
            }
            Self::Kpi(w) => {
                w.ignore_dashboard_filters = settings.ignore_dashboard_filters;
                w.date_data_set = settings.date_data_set;
                true
            }
            _ => false,
        }
    }

    /// Drop ignore-list entries matching `pred`, including switcher children.
    /// Returns the number of entries removed.
    pub fn retain_ignored_filters(&mut self, pred: impl Fn(&FilterReference) -> bool) -> usize {
        fn retain(list: &mut Vec<FilterReference>, pred: &dyn Fn(&FilterReference) -> bool) -> usize {
            let before = list.len();
            list.retain(|r| pred(r));
            before - list.len()
        }
        match self {
            Self::Insight(w) => retain(&mut w.ignore_dashboard_filters, &pred),
            Self::Kpi(w) => retain(&mut w.ignore_dashboard_filters, &pred),
            Self::VisualizationSwitcher(w) => w
                .visualizations
                .iter_mut()
                .map(|v| retain(&mut v.ignore_dashboard_filters, &pred))
                .sum(),
            Self::RichText(_) | Self::NestedLayout(_) | Self::Placeholder(_) => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Drills

/// A drill interaction configured on an insight widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillDefinition {
    pub local_identifier: String,
    /// Local identifier of the measure or attribute that triggers the drill
    pub origin: String,
    pub target: DrillTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DrillTarget {
    ToInsight { insight: ObjRef },
    ToDashboard {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dashboard: Option<ObjRef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab: Option<String>,
    },
    ToUrl { url: String },
}

// ---------------------------------------------------------------------------
// Filters

/// Pointer from a widget to a dashboard filter it ignores
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FilterReference {
    Attribute { display_form: ObjRef },
    Date { data_set: ObjRef },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionMode {
    Single,
    #[default]
    Multi,
}

/// Attribute element selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSelection {
    #[serde(default)]
    pub elements: Vec<String>,
    /// True when `elements` lists what is excluded
    #[serde(default)]
    pub negative: bool,
}

impl AttributeSelection {
    /// Selection passing every element
    pub fn all() -> Self {
        Self {
            elements: Vec::new(),
            negative: true,
        }
    }
}

/// Parent filter constraining which elements an attribute filter offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFilterParent {
    pub filter_local_identifier: String,
    #[serde(default)]
    pub over: Vec<ObjRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFilter {
    pub local_identifier: String,
    pub display_form: ObjRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub selection: AttributeSelection,
    #[serde(default)]
    pub selection_mode: SelectionMode,
    #[serde(default)]
    pub parents: Vec<AttributeFilterParent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateGranularity {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DateSelection {
    #[default]
    AllTime,
    Relative {
        granularity: DateGranularity,
        from: i32,
        to: i32,
    },
    Absolute { from: NaiveDate, to: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFilter {
    pub local_identifier: String,
    /// `None` for the common date filter applying to every date data set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set: Option<ObjRef>,
    #[serde(default)]
    pub selection: DateSelection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterContextItem {
    AttributeFilter(AttributeFilter),
    DateFilter(DateFilter),
}

impl FilterContextItem {
    pub fn local_identifier(&self) -> &str {
        match self {
            Self::AttributeFilter(f) => &f.local_identifier,
            Self::DateFilter(f) => &f.local_identifier,
        }
    }

    /// Reference a widget would use to ignore this filter
    pub fn reference(&self) -> Option<FilterReference> {
        match self {
            Self::AttributeFilter(f) => Some(FilterReference::Attribute {
                display_form: f.display_form.clone(),
            }),
            Self::DateFilter(f) => f.data_set.clone().map(|data_set| FilterReference::Date { data_set }),
        }
    }

    pub fn is_common_date_filter(&self) -> bool {
        matches!(self, Self::DateFilter(DateFilter { data_set: None, .. }))
    }
}

/// Presentation grouping of filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroup {
    pub local_identifier: String,
    pub title: String,
    #[serde(default)]
    pub filter_local_identifiers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterContext {
    #[serde(default)]
    pub filters: Vec<FilterContextItem>,
    #[serde(default)]
    pub groups: Vec<FilterGroup>,
}

// ---------------------------------------------------------------------------
// Tabs and dashboard

/// Layout, filters and stash owned by one tab
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabContent {
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub filter_context: FilterContext,
    /// Removed items kept for later re-insertion, keyed by stash identifier
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stash: BTreeMap<String, Vec<LayoutItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTab {
    pub local_identifier: String,
    pub title: String,
    #[serde(default)]
    pub content: TabContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    #[serde(default = "default_can_edit")]
    pub can_edit: bool,
}

fn default_can_edit() -> bool {
    true
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            can_edit: default_can_edit(),
        }
    }
}

/// Transient UI state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_widget: Option<ObjRef>,
}

/// Root aggregate of the engine.
///
/// Without tabs the dashboard has a single implicit tab whose content lives in
/// `root`. Once tabs exist, each owns its content and `root` stays empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub root: TabContent,
    #[serde(default)]
    pub tabs: Vec<DashboardTab>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tab_local_identifier: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub ui: UiState,
}

impl DashboardState {
    pub fn new(title: impl Into<String>, layout: Layout) -> Self {
        Self {
            title: title.into(),
            root: TabContent {
                layout,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Index of the active tab, if tabs exist
    pub fn active_tab_index(&self) -> Option<usize> {
        let id = self.active_tab_local_identifier.as_deref()?;
        self.tabs.iter().position(|t| t.local_identifier == id)
    }

    /// Content commands operate on: the active tab or the implicit tab
    pub fn active_content(&self) -> &TabContent {
        match self.active_tab_index() {
            Some(idx) => &self.tabs[idx].content,
            None => &self.root,
        }
    }

    pub fn active_content_mut(&mut self) -> &mut TabContent {
        match self.active_tab_index() {
            Some(idx) => &mut self.tabs[idx].content,
            None => &mut self.root,
        }
    }

    /// Every tab content, implicit one included
    pub fn contents(&self) -> impl Iterator<Item = &TabContent> {
        std::iter::once(&self.root).chain(self.tabs.iter().map(|t| &t.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insight(id: &str) -> Widget {
        Widget::Insight(InsightWidget {
            obj_ref: ObjRef::id(id),
            title: id.to_uppercase(),
            insight: ObjRef::id(format!("vis-{}", id)),
            drills: vec![],
            ignore_dashboard_filters: vec![],
            date_data_set: None,
        })
    }

    #[test]
    fn test_widget_json_shape() {
        let json = serde_json::to_value(insight("w1")).unwrap();
        assert_eq!(json["type"], "insight");
        assert_eq!(json["ref"]["identifier"], "w1");
        assert_eq!(json["insight"]["identifier"], "vis-w1");

        let back: Widget = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), WidgetKind::Insight);
        assert_eq!(back.title(), Some("W1"));
    }

    #[test]
    fn test_filter_item_json_shape() {
        let item: FilterContextItem = serde_json::from_str(
            r#"{"type":"dateFilter","localIdentifier":"d1","dataSet":{"identifier":"ds"},
                "selection":{"type":"relative","granularity":"month","from":-3,"to":0}}"#,
        )
        .unwrap();
        assert_eq!(item.local_identifier(), "d1");
        assert!(!item.is_common_date_filter());
        assert_eq!(
            item.reference(),
            Some(FilterReference::Date {
                data_set: ObjRef::id("ds")
            })
        );
    }

    #[test]
    fn test_header_merge_keeps_missing_fields() {
        let header = SectionHeader {
            title: Some("Sales".into()),
            description: Some("Q1".into()),
        };
        let merged = header.merged(&SectionHeader {
            title: None,
            description: Some("Q2".into()),
        });
        assert_eq!(merged.title.as_deref(), Some("Sales"));
        assert_eq!(merged.description.as_deref(), Some("Q2"));
    }

    #[test]
    fn test_active_content_falls_back_to_root() {
        let mut state = DashboardState::new("d", Layout::default());
        state.root.layout.sections.push(Section::new(vec![]));
        assert_eq!(state.active_content().layout.sections.len(), 1);

        state.tabs.push(DashboardTab {
            local_identifier: "t1".into(),
            title: "T1".into(),
            content: TabContent::default(),
        });
        state.active_tab_local_identifier = Some("t1".into());
        assert!(state.active_content().layout.sections.is_empty());
        assert_eq!(state.contents().count(), 2);
    }

    #[test]
    fn test_retain_ignored_filters_reaches_switcher_children() {
        let reference = FilterReference::Attribute {
            display_form: ObjRef::id("df"),
        };
        let mut child = match insight("v1") {
            Widget::Insight(w) => w,
            _ => unreachable!(),
        };
        child.ignore_dashboard_filters.push(reference.clone());
        let mut switcher = Widget::VisualizationSwitcher(VisualizationSwitcherWidget {
            obj_ref: ObjRef::id("sw"),
            title: "Switcher".into(),
            visualizations: vec![child],
        });

        let removed = switcher.retain_ignored_filters(|r| r != &reference);
        assert_eq!(removed, 1);
    }
}
