//! Named state mutations and the pure reducer applying them
//!
//! `reduce(state, mutation) -> (state', output)` has no side effects. Every
//! mutation validates completely before changing anything, so an error leaves
//! the input state as the current one. The output carries what the mutation
//! replaced or produced, which handlers use for events and inverse commands.

use serde::Serialize;
use std::collections::HashSet;

use dash_core::{
    AttributeFilterParent, AttributeSelection, DashError, DashboardState, DashboardTab,
    DateSelection, DrillDefinition, FilterContextItem, FilterGroup, FilterReference,
    FilterSettings, InsightWidget, ItemDefinition, ItemPath, ItemSize, LayoutItem, ObjRef, Result,
    Section, SectionHeader, SectionPath, SelectionMode, TabContent, Widget,
};
use dash_layout::{self as layout, MovedItem};

/// A parameterized state change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mutation", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Mutation {
    // Layout
    AddSection {
        parent: ItemPath,
        index: i64,
        header: Option<SectionHeader>,
        items: Vec<ItemDefinition>,
    },
    RemoveSection {
        path: SectionPath,
        stash: Option<String>,
    },
    MoveSection {
        from: SectionPath,
        to_index: i64,
    },
    SetSectionHeader {
        path: SectionPath,
        header: Option<SectionHeader>,
    },
    AddItems {
        section: SectionPath,
        index: i64,
        items: Vec<ItemDefinition>,
    },
    MoveItem {
        from: ItemPath,
        to_section: SectionPath,
        to_index: i64,
    },
    RemoveItem {
        path: ItemPath,
        eager: bool,
        stash: Option<String>,
    },
    ReplaceItem {
        path: ItemPath,
        item: ItemDefinition,
        stash: Option<String>,
    },
    SetItemSizes {
        sizes: Vec<(ItemPath, ItemSize)>,
    },

    // Widgets
    SetWidgetTitle {
        widget: ObjRef,
        title: String,
    },
    SetInsightDrills {
        widget: ObjRef,
        drills: Vec<DrillDefinition>,
    },
    SetRichTextContent {
        widget: ObjRef,
        content: String,
    },
    SetWidgetFilterSettings {
        widget: ObjRef,
        settings: FilterSettings,
    },
    AddSwitcherVisualization {
        widget: ObjRef,
        visualization: InsightWidget,
    },
    PurgeIgnoredFilters {
        references: Vec<FilterReference>,
    },

    // Filters
    AddFilter {
        position: usize,
        filter: FilterContextItem,
    },
    RemoveFilters {
        local_identifiers: Vec<String>,
    },
    MoveFilter {
        local_identifier: String,
        to_position: usize,
    },
    SetAttributeFilterSelection {
        local_identifier: String,
        selection: AttributeSelection,
        mode: SelectionMode,
    },
    SetAttributeFilterParents {
        local_identifier: String,
        parents: Vec<AttributeFilterParent>,
    },
    SetDateFilterSelection {
        local_identifier: String,
        selection: DateSelection,
    },
    /// Several selections at once; all or nothing
    SetFilterSelections {
        selections: Vec<FilterSelectionValue>,
    },
    AddFilterGroup {
        position: usize,
        group: FilterGroup,
    },
    RemoveFilterGroup {
        local_identifier: String,
    },

    // Tabs and dashboard
    AddTab {
        index: usize,
        tab: DashboardTab,
        activate: bool,
    },
    RemoveTab {
        local_identifier: String,
    },
    RepositionTab {
        from: usize,
        to: usize,
    },
    SetActiveTab {
        local_identifier: String,
    },
    RenameTab {
        local_identifier: String,
        title: String,
    },
    SetDashboardTitle {
        title: String,
    },
    SetSelectedWidget {
        widget: Option<ObjRef>,
    },
}

impl Mutation {
    /// Stable name used in logs and effect traces
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddSection { .. } => "addSection",
            Self::RemoveSection { .. } => "removeSection",
            Self::MoveSection { .. } => "moveSection",
            Self::SetSectionHeader { .. } => "setSectionHeader",
            Self::AddItems { .. } => "addItems",
            Self::MoveItem { .. } => "moveItem",
            Self::RemoveItem { .. } => "removeItem",
            Self::ReplaceItem { .. } => "replaceItem",
            Self::SetItemSizes { .. } => "setItemSizes",
            Self::SetWidgetTitle { .. } => "setWidgetTitle",
            Self::SetInsightDrills { .. } => "setInsightDrills",
            Self::SetRichTextContent { .. } => "setRichTextContent",
            Self::SetWidgetFilterSettings { .. } => "setWidgetFilterSettings",
            Self::AddSwitcherVisualization { .. } => "addSwitcherVisualization",
            Self::PurgeIgnoredFilters { .. } => "purgeIgnoredFilters",
            Self::AddFilter { .. } => "addFilter",
            Self::RemoveFilters { .. } => "removeFilters",
            Self::MoveFilter { .. } => "moveFilter",
            Self::SetAttributeFilterSelection { .. } => "setAttributeFilterSelection",
            Self::SetAttributeFilterParents { .. } => "setAttributeFilterParents",
            Self::SetDateFilterSelection { .. } => "setDateFilterSelection",
            Self::SetFilterSelections { .. } => "setFilterSelections",
            Self::AddFilterGroup { .. } => "addFilterGroup",
            Self::RemoveFilterGroup { .. } => "removeFilterGroup",
            Self::AddTab { .. } => "addTab",
            Self::RemoveTab { .. } => "removeTab",
            Self::RepositionTab { .. } => "repositionTab",
            Self::SetActiveTab { .. } => "setActiveTab",
            Self::RenameTab { .. } => "renameTab",
            Self::SetDashboardTitle { .. } => "setDashboardTitle",
            Self::SetSelectedWidget { .. } => "setSelectedWidget",
        }
    }
}

/// Selection of one filter, keyed by local identifier
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FilterSelectionValue {
    Attribute {
        local_identifier: String,
        selection: AttributeSelection,
    },
    Date {
        local_identifier: String,
        selection: DateSelection,
    },
}

impl FilterSelectionValue {
    pub fn local_identifier(&self) -> &str {
        match self {
            Self::Attribute { local_identifier, .. } | Self::Date { local_identifier, .. } => {
                local_identifier
            }
        }
    }
}

/// What a mutation produced or replaced
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutput {
    SectionAdded(SectionPath),
    SectionRemoved(Section),
    SectionMoved { to: SectionPath },
    HeaderChanged(Option<SectionHeader>),
    ItemsAdded { first: ItemPath, items: Vec<LayoutItem> },
    ItemMoved(MovedItem),
    ItemRemoved {
        item: LayoutItem,
        /// Set when an eager removal also dropped the emptied section
        removed_section: Option<(SectionPath, Option<SectionHeader>)>,
    },
    ItemReplaced(LayoutItem),
    SizesChanged(Vec<(ItemPath, ItemSize)>),
    TitleChanged(String),
    DrillsChanged(Vec<DrillDefinition>),
    ContentChanged(String),
    FilterSettingsChanged(FilterSettings),
    VisualizationAdded { count: usize },
    IgnoredFiltersPurged { entries: usize },
    FilterAdded { position: usize },
    FiltersRemoved(Vec<FilterContextItem>),
    FilterMoved { original: usize, final_position: usize },
    AttributeSelectionChanged { selection: AttributeSelection, mode: SelectionMode },
    ParentsChanged(Vec<AttributeFilterParent>),
    DateSelectionChanged(DateSelection),
    /// Previous selections, in the order they were replaced
    SelectionsChanged(Vec<FilterSelectionValue>),
    GroupAdded { position: usize },
    GroupRemoved { group: FilterGroup, position: usize },
    TabAdded { index: usize, adopted_root: bool },
    TabRemoved { tab: DashboardTab, index: usize },
    TabRepositioned,
    ActiveTabChanged(Option<String>),
    TabRenamed(String),
    DashboardRenamed(String),
    SelectionChanged(Option<ObjRef>),
}

/// Apply `mutation` to a copy of `state`
pub fn reduce(state: &DashboardState, mutation: &Mutation) -> Result<(DashboardState, MutationOutput)> {
    let mut next = state.clone();
    let output = apply(&mut next, mutation)?;
    clear_stale_selection(&mut next);
    Ok((next, output))
}

/// Expand item definitions against the stash.
///
/// Returns the concrete items and the stash identifiers consumed.
pub fn resolve_item_definitions(
    content: &TabContent,
    definitions: &[ItemDefinition],
) -> Result<(Vec<LayoutItem>, Vec<String>)> {
    let mut items = Vec::new();
    let mut used = Vec::new();
    for def in definitions {
        match def {
            ItemDefinition::Item(item) => items.push(item.clone()),
            ItemDefinition::Stash(id) => {
                let stashed = content
                    .stash
                    .get(id)
                    .ok_or_else(|| DashError::NotFound(format!("stash '{}'", id)))?;
                items.extend(stashed.iter().cloned());
                used.push(id.clone());
            }
        }
    }
    Ok((items, used))
}

fn apply(state: &mut DashboardState, mutation: &Mutation) -> Result<MutationOutput> {
    match mutation {
        Mutation::AddSection {
            parent,
            index,
            header,
            items,
        } => {
            let content = state.active_content_mut();
            let (items, used) = resolve_item_definitions(content, items)?;
            let section = Section {
                header: header.clone(),
                items,
            };
            let path = layout::add_section(&mut content.layout, parent, *index, section)?;
            consume_stashes(content, &used, None);
            Ok(MutationOutput::SectionAdded(path))
        }
        Mutation::RemoveSection { path, stash } => {
            let content = state.active_content_mut();
            let section = layout::remove_section(&mut content.layout, path)?;
            if let Some(id) = stash {
                content.stash.insert(id.clone(), section.items.clone());
            }
            Ok(MutationOutput::SectionRemoved(section))
        }
        Mutation::MoveSection { from, to_index } => {
            let to = layout::move_section(&mut state.active_content_mut().layout, from, *to_index)?;
            Ok(MutationOutput::SectionMoved { to })
        }
        Mutation::SetSectionHeader { path, header } => {
            let section = layout::section_mut(&mut state.active_content_mut().layout, path)?;
            let old = std::mem::replace(&mut section.header, header.clone());
            Ok(MutationOutput::HeaderChanged(old))
        }
        Mutation::AddItems {
            section,
            index,
            items,
        } => {
            let content = state.active_content_mut();
            let (items, used) = resolve_item_definitions(content, items)?;
            if items.is_empty() {
                return Err(DashError::InvalidInput("no items to add".into()));
            }
            let first = layout::insert_items(&mut content.layout, section, *index, items.clone())?;
            consume_stashes(content, &used, None);
            Ok(MutationOutput::ItemsAdded { first, items })
        }
        Mutation::MoveItem {
            from,
            to_section,
            to_index,
        } => {
            let moved = layout::move_item(
                &mut state.active_content_mut().layout,
                from,
                to_section,
                *to_index,
            )?;
            Ok(MutationOutput::ItemMoved(moved))
        }
        Mutation::RemoveItem { path, eager, stash } => {
            let content = state.active_content_mut();
            let item = layout::remove_item(&mut content.layout, path)?;
            let mut removed_section = None;
            if *eager {
                if let Some(section_path) = path.section_path() {
                    if layout::section(&content.layout, &section_path)?.items.is_empty() {
                        let section = layout::remove_section(&mut content.layout, &section_path)?;
                        removed_section = Some((section_path, section.header));
                    }
                }
            }
            if let Some(id) = stash {
                content.stash.insert(id.clone(), vec![item.clone()]);
            }
            Ok(MutationOutput::ItemRemoved {
                item,
                removed_section,
            })
        }
        Mutation::ReplaceItem { path, item, stash } => {
            let content = state.active_content_mut();
            let (mut items, used) = resolve_item_definitions(content, std::slice::from_ref(item))?;
            if items.len() != 1 {
                return Err(DashError::InvalidInput(format!(
                    "replacement must be exactly one item, got {}",
                    items.len()
                )));
            }
            let replacement = items.remove(0);
            let old = layout::replace_item(&mut content.layout, path, replacement)?;
            if let Some(id) = stash {
                content.stash.insert(id.clone(), vec![old.clone()]);
            }
            consume_stashes(content, &used, stash.as_deref());
            Ok(MutationOutput::ItemReplaced(old))
        }
        Mutation::SetItemSizes { sizes } => {
            let content = state.active_content_mut();
            let mut seen = HashSet::new();
            for (path, _) in sizes {
                if !seen.insert(path) {
                    return Err(DashError::InvalidInput(format!("item {} sized twice", path)));
                }
                layout::item(&content.layout, path)?;
            }
            let mut previous = Vec::with_capacity(sizes.len());
            for (path, size) in sizes {
                let old = layout::set_size(&mut content.layout, path, *size)?;
                previous.push((path.clone(), old));
            }
            Ok(MutationOutput::SizesChanged(previous))
        }

        Mutation::SetWidgetTitle { widget, title } => {
            let target = widget_mut(state, widget)?;
            let kind = target.kind();
            let slot = target.title_mut().ok_or_else(|| {
                DashError::InvalidInput(format!("{} widget {} has no header", kind, widget))
            })?;
            Ok(MutationOutput::TitleChanged(std::mem::replace(slot, title.clone())))
        }
        Mutation::SetInsightDrills { widget, drills } => match widget_mut(state, widget)? {
            Widget::Insight(insight) => Ok(MutationOutput::DrillsChanged(std::mem::replace(
                &mut insight.drills,
                drills.clone(),
            ))),
            other => Err(wrong_kind(widget, other, "insight")),
        },
        Mutation::SetRichTextContent { widget, content } => match widget_mut(state, widget)? {
            Widget::RichText(rich) => Ok(MutationOutput::ContentChanged(std::mem::replace(
                &mut rich.content,
                content.clone(),
            ))),
            other => Err(wrong_kind(widget, other, "richText")),
        },
        Mutation::SetWidgetFilterSettings { widget, settings } => {
            let target = widget_mut(state, widget)?;
            let old = target.filter_settings().ok_or_else(|| {
                DashError::InvalidInput(format!(
                    "{} widget {} has no filter settings",
                    target.kind(),
                    widget
                ))
            })?;
            target.set_filter_settings(settings.clone());
            Ok(MutationOutput::FilterSettingsChanged(old))
        }
        Mutation::AddSwitcherVisualization {
            widget,
            visualization,
        } => match widget_mut(state, widget)? {
            Widget::VisualizationSwitcher(switcher) => {
                switcher.visualizations.push(visualization.clone());
                Ok(MutationOutput::VisualizationAdded {
                    count: switcher.visualizations.len(),
                })
            }
            other => Err(wrong_kind(widget, other, "visualizationSwitcher")),
        },
        Mutation::PurgeIgnoredFilters { references } => {
            let mut entries = 0;
            layout::for_each_widget_mut(&mut state.active_content_mut().layout, &mut |w: &mut Widget| {
                entries += w.retain_ignored_filters(|r| !references.contains(r));
            });
            Ok(MutationOutput::IgnoredFiltersPurged { entries })
        }

        Mutation::AddFilter { position, filter } => {
            let filters = &mut state.active_content_mut().filter_context.filters;
            if *position > filters.len() {
                return Err(DashError::InvalidInput(format!(
                    "filter position {} beyond {}",
                    position,
                    filters.len()
                )));
            }
            filters.insert(*position, filter.clone());
            Ok(MutationOutput::FilterAdded {
                position: *position,
            })
        }
        Mutation::RemoveFilters { local_identifiers } => {
            let context = &mut state.active_content_mut().filter_context;
            for id in local_identifiers {
                if !context.filters.iter().any(|f| f.local_identifier() == id) {
                    return Err(DashError::NotFound(format!("filter '{}'", id)));
                }
            }
            let gone: HashSet<&str> = local_identifiers.iter().map(String::as_str).collect();
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut context.filters)
                .into_iter()
                .partition(|f| gone.contains(f.local_identifier()));
            context.filters = kept;
            for filter in &mut context.filters {
                if let FilterContextItem::AttributeFilter(attr) = filter {
                    attr.parents
                        .retain(|p| !gone.contains(p.filter_local_identifier.as_str()));
                }
            }
            for group in &mut context.groups {
                group
                    .filter_local_identifiers
                    .retain(|id| !gone.contains(id.as_str()));
            }
            Ok(MutationOutput::FiltersRemoved(removed))
        }
        Mutation::MoveFilter {
            local_identifier,
            to_position,
        } => {
            let filters = &mut state.active_content_mut().filter_context.filters;
            let original = position_of(filters, local_identifier)?;
            if *to_position >= filters.len() {
                return Err(DashError::InvalidInput(format!(
                    "filter position {} beyond {}",
                    to_position,
                    filters.len() - 1
                )));
            }
            let filter = filters.remove(original);
            filters.insert(*to_position, filter);
            Ok(MutationOutput::FilterMoved {
                original,
                final_position: *to_position,
            })
        }
        Mutation::SetAttributeFilterSelection {
            local_identifier,
            selection,
            mode,
        } => match filter_mut(state, local_identifier)? {
            FilterContextItem::AttributeFilter(attr) => {
                let old_selection = std::mem::replace(&mut attr.selection, selection.clone());
                let old_mode = std::mem::replace(&mut attr.selection_mode, *mode);
                Ok(MutationOutput::AttributeSelectionChanged {
                    selection: old_selection,
                    mode: old_mode,
                })
            }
            FilterContextItem::DateFilter(_) => Err(DashError::InvalidInput(format!(
                "filter '{}' is a date filter",
                local_identifier
            ))),
        },
        Mutation::SetAttributeFilterParents {
            local_identifier,
            parents,
        } => match filter_mut(state, local_identifier)? {
            FilterContextItem::AttributeFilter(attr) => Ok(MutationOutput::ParentsChanged(
                std::mem::replace(&mut attr.parents, parents.clone()),
            )),
            FilterContextItem::DateFilter(_) => Err(DashError::InvalidInput(format!(
                "filter '{}' is a date filter",
                local_identifier
            ))),
        },
        Mutation::SetDateFilterSelection {
            local_identifier,
            selection,
        } => match filter_mut(state, local_identifier)? {
            FilterContextItem::DateFilter(date) => Ok(MutationOutput::DateSelectionChanged(
                std::mem::replace(&mut date.selection, selection.clone()),
            )),
            FilterContextItem::AttributeFilter(_) => Err(DashError::InvalidInput(format!(
                "filter '{}' is an attribute filter",
                local_identifier
            ))),
        },
        Mutation::SetFilterSelections { selections } => {
            let mut seen = HashSet::new();
            let mut previous = Vec::with_capacity(selections.len());
            for value in selections {
                if !seen.insert(value.local_identifier()) {
                    return Err(DashError::InvalidInput(format!(
                        "filter '{}' selected twice",
                        value.local_identifier()
                    )));
                }
                let old = match (filter_mut(state, value.local_identifier())?, value) {
                    (
                        FilterContextItem::AttributeFilter(attr),
                        FilterSelectionValue::Attribute { selection, .. },
                    ) => FilterSelectionValue::Attribute {
                        local_identifier: attr.local_identifier.clone(),
                        selection: std::mem::replace(&mut attr.selection, selection.clone()),
                    },
                    (FilterContextItem::DateFilter(date), FilterSelectionValue::Date { selection, .. }) => {
                        FilterSelectionValue::Date {
                            local_identifier: date.local_identifier.clone(),
                            selection: std::mem::replace(&mut date.selection, selection.clone()),
                        }
                    }
                    (_, value) => {
                        return Err(DashError::InvalidInput(format!(
                            "filter '{}' has a different kind",
                            value.local_identifier()
                        )))
                    }
                };
                previous.push(old);
            }
            Ok(MutationOutput::SelectionsChanged(previous))
        }
        Mutation::AddFilterGroup { position, group } => {
            let groups = &mut state.active_content_mut().filter_context.groups;
            if *position > groups.len() {
                return Err(DashError::InvalidInput(format!(
                    "group position {} beyond {}",
                    position,
                    groups.len()
                )));
            }
            groups.insert(*position, group.clone());
            Ok(MutationOutput::GroupAdded {
                position: *position,
            })
        }
        Mutation::RemoveFilterGroup { local_identifier } => {
            let groups = &mut state.active_content_mut().filter_context.groups;
            let position = groups
                .iter()
                .position(|g| &g.local_identifier == local_identifier)
                .ok_or_else(|| DashError::NotFound(format!("filter group '{}'", local_identifier)))?;
            let group = groups.remove(position);
            Ok(MutationOutput::GroupRemoved { group, position })
        }

        Mutation::AddTab {
            index,
            tab,
            activate,
        } => {
            if *index > state.tabs.len() {
                return Err(DashError::InvalidInput(format!(
                    "tab index {} beyond {}",
                    index,
                    state.tabs.len()
                )));
            }
            let mut tab = tab.clone();
            let adopted_root = state.tabs.is_empty();
            if adopted_root {
                tab.content = std::mem::take(&mut state.root);
            }
            let id = tab.local_identifier.clone();
            state.tabs.insert(*index, tab);
            if *activate || adopted_root {
                state.active_tab_local_identifier = Some(id);
            }
            Ok(MutationOutput::TabAdded {
                index: *index,
                adopted_root,
            })
        }
        Mutation::RemoveTab { local_identifier } => {
            let index = tab_index(state, local_identifier)?;
            if state.tabs.len() == 1 {
                return Err(DashError::InvalidInput("cannot delete the last tab".into()));
            }
            let tab = state.tabs.remove(index);
            if state.active_tab_local_identifier.as_deref() == Some(local_identifier.as_str()) {
                let next = index.min(state.tabs.len() - 1);
                state.active_tab_local_identifier = Some(state.tabs[next].local_identifier.clone());
            }
            Ok(MutationOutput::TabRemoved { tab, index })
        }
        Mutation::RepositionTab { from, to } => {
            let len = state.tabs.len();
            if *from >= len || *to >= len {
                return Err(DashError::InvalidInput(format!(
                    "tab reposition {} -> {} out of range (0..{})",
                    from, to, len
                )));
            }
            let tab = state.tabs.remove(*from);
            state.tabs.insert(*to, tab);
            Ok(MutationOutput::TabRepositioned)
        }
        Mutation::SetActiveTab { local_identifier } => {
            tab_index(state, local_identifier)?;
            let previous = state
                .active_tab_local_identifier
                .replace(local_identifier.clone());
            Ok(MutationOutput::ActiveTabChanged(previous))
        }
        Mutation::RenameTab {
            local_identifier,
            title,
        } => {
            let index = tab_index(state, local_identifier)?;
            let old = std::mem::replace(&mut state.tabs[index].title, title.clone());
            Ok(MutationOutput::TabRenamed(old))
        }
        Mutation::SetDashboardTitle { title } => Ok(MutationOutput::DashboardRenamed(
            std::mem::replace(&mut state.title, title.clone()),
        )),
        Mutation::SetSelectedWidget { widget } => {
            if let Some(obj_ref) = widget {
                layout::find_widget(&state.active_content().layout, obj_ref)
                    .ok_or_else(|| DashError::NotFound(format!("widget {}", obj_ref)))?;
            }
            Ok(MutationOutput::SelectionChanged(std::mem::replace(
                &mut state.ui.selected_widget,
                widget.clone(),
            )))
        }
    }
}

/// Delete used stashes, keeping `keep` (a stash written by the same mutation)
fn consume_stashes(content: &mut TabContent, used: &[String], keep: Option<&str>) {
    for id in used {
        if Some(id.as_str()) != keep {
            content.stash.remove(id);
        }
    }
}

fn widget_mut<'a>(state: &'a mut DashboardState, obj_ref: &ObjRef) -> Result<&'a mut Widget> {
    let content = state.active_content_mut();
    let path = layout::find_widget(&content.layout, obj_ref)
        .ok_or_else(|| DashError::NotFound(format!("widget {}", obj_ref)))?;
    Ok(&mut layout::item_mut(&mut content.layout, &path)?.widget)
}

fn wrong_kind(obj_ref: &ObjRef, widget: &Widget, expected: &str) -> DashError {
    DashError::InvalidInput(format!(
        "widget {} is {}, expected {}",
        obj_ref,
        widget.kind(),
        expected
    ))
}

fn position_of(filters: &[FilterContextItem], local_identifier: &str) -> Result<usize> {
    filters
        .iter()
        .position(|f| f.local_identifier() == local_identifier)
        .ok_or_else(|| DashError::NotFound(format!("filter '{}'", local_identifier)))
}

fn filter_mut<'a>(state: &'a mut DashboardState, local_identifier: &str) -> Result<&'a mut FilterContextItem> {
    let filters = &mut state.active_content_mut().filter_context.filters;
    let index = position_of(filters, local_identifier)?;
    Ok(&mut filters[index])
}

fn tab_index(state: &DashboardState, local_identifier: &str) -> Result<usize> {
    state
        .tabs
        .iter()
        .position(|t| t.local_identifier == local_identifier)
        .ok_or_else(|| DashError::NotFound(format!("tab '{}'", local_identifier)))
}

/// Drop the UI selection once its widget left the active layout
fn clear_stale_selection(state: &mut DashboardState) {
    let stale = match &state.ui.selected_widget {
        Some(obj_ref) => layout::find_widget(&state.active_content().layout, obj_ref).is_none(),
        None => false,
    };
    if stale {
        state.ui.selected_widget = None;
    }
}
