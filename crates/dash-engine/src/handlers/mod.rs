//! Command handlers
//!
//! One handler per command type. Handlers validate against a snapshot, then
//! `put` mutations and record inverses through the [`HandlerContext`]; the
//! returned payload becomes the command's success event.

mod filters;
mod history;
mod layout;
mod tabs;
mod widgets;

use crate::backend::BackendError;
use crate::command::CommandPayload;
use crate::effects::HandlerContext;
use crate::error::{CommandError, CommandResult};
use crate::event::EventPayload;
use crate::validation;

/// Route a command to its handler
pub(crate) async fn handle(ctx: &mut HandlerContext, payload: CommandPayload) -> CommandResult<EventPayload> {
    ctx.select("canEdit", |s| validation::ensure_can_edit(s, &payload))?;

    use CommandPayload as C;
    match payload {
        C::AddLayoutSection {
            parent,
            index,
            header,
            items,
        } => layout::add_section(ctx, parent, index, header, items),
        C::MoveLayoutSection { section, to_index } => layout::move_section(ctx, section, to_index),
        C::RemoveLayoutSection { section, stash } => layout::remove_section(ctx, section, stash),
        C::ChangeLayoutSectionHeader {
            section,
            header,
            merge,
        } => layout::change_header(ctx, section, header, merge),
        C::AddSectionItems {
            section,
            index,
            items,
        } => layout::add_items(ctx, section, index, items),
        C::MoveSectionItem {
            from,
            to_section,
            to_index,
        } => layout::move_item(ctx, from, to_section, to_index),
        C::RemoveSectionItem { item, eager, stash } => layout::remove_item(ctx, item, eager, stash),
        C::ReplaceSectionItem {
            item,
            replacement,
            stash,
        } => layout::replace_item(ctx, item, replacement, stash),
        C::ResizeHeight {
            parent,
            section_index,
            item_indexes,
            height,
        } => layout::resize_height(ctx, parent, section_index, item_indexes, height),
        C::ResizeWidth { item, width } => layout::resize_width(ctx, item, width),
        C::UpdateItemSizes { sizes } => layout::update_sizes(ctx, sizes),

        C::ChangeWidgetHeader { widget, title } => widgets::change_header(ctx, widget, title),
        C::ModifyDrillsForInsightWidget { widget, drills } => widgets::modify_drills(ctx, widget, drills),
        C::RemoveDrillsForInsightWidget {
            widget,
            local_identifiers,
        } => widgets::remove_drills(ctx, widget, local_identifiers),
        C::ReplaceInsightWidgetDrills { widget, drills } => widgets::replace_drills(ctx, widget, drills),
        C::ChangeRichTextWidgetContent { widget, content } => {
            widgets::change_rich_text(ctx, widget, content)
        }
        C::ChangeWidgetFilterSettings { widget, settings } => {
            widgets::change_filter_settings(ctx, widget, settings).await
        }
        C::AddVisualizationToSwitcher {
            widget,
            visualization,
        } => widgets::add_to_switcher(ctx, widget, visualization),
        C::ExportInsightWidget { widget, format } => widgets::export_insight(ctx, widget, format).await,

        C::AddAttributeFilter {
            display_form,
            index,
            local_identifier,
            initial_selection,
            selection_mode,
            parents,
        } => {
            filters::add_attribute_filter(
                ctx,
                filters::NewAttributeFilter {
                    display_form,
                    index,
                    local_identifier,
                    initial_selection,
                    selection_mode,
                    parents,
                },
            )
            .await
        }
        C::RemoveAttributeFilters { local_identifiers } => {
            filters::remove_attribute_filters(ctx, local_identifiers)
        }
        C::MoveAttributeFilter {
            local_identifier,
            index,
        } => filters::move_attribute_filter(ctx, local_identifier, index),
        C::ChangeAttributeFilterSelection {
            local_identifier,
            selection,
            selection_mode,
        } => filters::change_attribute_selection(ctx, local_identifier, selection, selection_mode),
        C::SetAttributeFilterParents {
            local_identifier,
            parents,
        } => filters::set_parents(ctx, local_identifier, parents),
        C::AddDateFilter {
            data_set,
            index,
            local_identifier,
            selection,
        } => filters::add_date_filter(ctx, data_set, index, local_identifier, selection).await,
        C::RemoveDateFilter { data_set } => filters::remove_date_filter(ctx, data_set),
        C::MoveDateFilter { data_set, index } => filters::move_date_filter(ctx, data_set, index),
        C::ChangeDateFilterSelection {
            data_set,
            selection,
        } => filters::change_date_selection(ctx, data_set, selection),
        C::ChangeFilterContextSelection {
            filters: selections,
            reset_others,
        } => filters::change_context_selection(ctx, selections, reset_others),
        C::AddFilterGroup {
            title,
            filter_local_identifiers,
            local_identifier,
            index,
        } => filters::add_group(ctx, title, filter_local_identifiers, local_identifier, index),
        C::RemoveFilterGroup { local_identifier } => filters::remove_group(ctx, local_identifier),

        C::CreateDashboardTab {
            title,
            local_identifier,
            index,
            activate,
        } => tabs::create(ctx, title, local_identifier, index, activate),
        C::DeleteDashboardTab { local_identifier } => tabs::delete(ctx, local_identifier),
        C::RepositionDashboardTab {
            old_index,
            new_index,
        } => tabs::reposition(ctx, old_index, new_index),
        C::SwitchDashboardTab { local_identifier } => tabs::switch(ctx, local_identifier),
        C::RenameDashboardTab {
            local_identifier,
            title,
        } => tabs::rename(ctx, local_identifier, title),
        C::RenameDashboard { title } => tabs::rename_dashboard(ctx, title),
        C::SelectWidget { widget } => tabs::select_widget(ctx, widget),

        C::Undo { undo_point } => history::undo(ctx, undo_point).await,
        C::Redo {} => history::redo(ctx).await,
    }
}

/// Report a collaborator's "not found" as `NOT_FOUND` instead of an internal error
fn classify_not_found(err: CommandError) -> CommandError {
    match err {
        CommandError::Backend {
            source: BackendError::NotFound(what),
            ..
        } => CommandError::not_found(what),
        other => other,
    }
}
