//! Layout command handlers

use dash_core::{ItemDefinition, ItemPath, ItemSize, SectionHeader, SectionPath};
use dash_layout as layout;
use dash_store::{resolve_item_definitions, Mutation, MutationOutput};

use crate::command::{CommandPayload, ItemSizeUpdate};
use crate::effects::HandlerContext;
use crate::error::{CommandError, CommandResult};
use crate::event::EventPayload;
use crate::validation;

pub(super) fn add_section(
    ctx: &mut HandlerContext,
    parent: ItemPath,
    index: i64,
    header: Option<SectionHeader>,
    items: Vec<ItemDefinition>,
) -> CommandResult<EventPayload> {
    let limits = ctx.config().layout.clone();
    let item_count = ctx.select("newItems", |s| -> CommandResult<usize> {
        let (resolved, _) = resolve_item_definitions(s.active_content(), &items)?;
        validation::new_items(s, &resolved, &limits, None)?;
        Ok(resolved.len())
    })?;
    let restash = single_stash(&items);

    let section = match ctx.put(Mutation::AddSection {
        parent,
        index,
        header: normalized(header),
        items,
    })? {
        MutationOutput::SectionAdded(path) => path,
        other => return Err(unexpected(other)),
    };

    ctx.push_undo(
        CommandPayload::RemoveLayoutSection {
            section: section.clone(),
            stash: restash,
        },
        format!("remove section {}", section),
    );
    Ok(EventPayload::LayoutSectionAdded {
        section,
        item_count,
    })
}

pub(super) fn move_section(
    ctx: &mut HandlerContext,
    section: SectionPath,
    to_index: i64,
) -> CommandResult<EventPayload> {
    let to = match ctx.put(Mutation::MoveSection {
        from: section.clone(),
        to_index,
    })? {
        MutationOutput::SectionMoved { to } => to,
        other => return Err(unexpected(other)),
    };

    ctx.push_undo(
        CommandPayload::MoveLayoutSection {
            section: to.clone(),
            to_index: section.section() as i64,
        },
        format!("move section {} back to {}", to, section),
    );
    Ok(EventPayload::LayoutSectionMoved { from: section, to })
}

pub(super) fn remove_section(
    ctx: &mut HandlerContext,
    section: SectionPath,
    stash: Option<String>,
) -> CommandResult<EventPayload> {
    let removed = match ctx.put(Mutation::RemoveSection {
        path: section.clone(),
        stash: stash.clone(),
    })? {
        MutationOutput::SectionRemoved(removed) => removed,
        other => return Err(unexpected(other)),
    };

    ctx.push_undo(
        CommandPayload::AddLayoutSection {
            parent: section.parent().clone(),
            index: section.section() as i64,
            header: removed.header,
            items: match stash.clone() {
                Some(id) => vec![ItemDefinition::Stash(id)],
                None => removed.items.into_iter().map(ItemDefinition::Item).collect(),
            },
        },
        format!("restore section {}", section),
    );
    Ok(EventPayload::LayoutSectionRemoved { section, stash })
}

pub(super) fn change_header(
    ctx: &mut HandlerContext,
    section: SectionPath,
    header: SectionHeader,
    merge: bool,
) -> CommandResult<EventPayload> {
    let header = if merge {
        let current = ctx.select("sectionHeader", |s| {
            layout::section(&s.active_content().layout, &section).map(|sec| sec.header.clone())
        })?;
        current.unwrap_or_default().merged(&header)
    } else {
        header
    };
    let header = normalized(Some(header));

    let old = match ctx.put(Mutation::SetSectionHeader {
        path: section.clone(),
        header: header.clone(),
    })? {
        MutationOutput::HeaderChanged(old) => old,
        other => return Err(unexpected(other)),
    };

    ctx.push_undo(
        CommandPayload::ChangeLayoutSectionHeader {
            section: section.clone(),
            header: old.unwrap_or_default(),
            merge: false,
        },
        format!("restore header of section {}", section),
    );
    Ok(EventPayload::LayoutSectionHeaderChanged { section, header })
}

pub(super) fn add_items(
    ctx: &mut HandlerContext,
    section: SectionPath,
    index: i64,
    items: Vec<ItemDefinition>,
) -> CommandResult<EventPayload> {
    let limits = ctx.config().layout.clone();
    ctx.select("newItems", |s| -> CommandResult<()> {
        let (resolved, _) = resolve_item_definitions(s.active_content(), &items)?;
        validation::new_items(s, &resolved, &limits, None)
    })?;
    let restash = single_stash(&items);

    let (first, added) = match ctx.put(Mutation::AddItems {
        section,
        index,
        items,
    })? {
        MutationOutput::ItemsAdded { first, items } => (first, items),
        other => return Err(unexpected(other)),
    };

    // several items leave no single inverse
    if added.len() == 1 {
        ctx.push_undo(
            CommandPayload::RemoveSectionItem {
                item: first.clone(),
                eager: false,
                stash: restash,
            },
            format!("remove item {}", first),
        );
    }
    Ok(EventPayload::LayoutSectionItemsAdded {
        first,
        count: added.len(),
    })
}

pub(super) fn move_item(
    ctx: &mut HandlerContext,
    from: ItemPath,
    to_section: SectionPath,
    to_index: i64,
) -> CommandResult<EventPayload> {
    let moved = match ctx.put(Mutation::MoveItem {
        from,
        to_section,
        to_index,
    })? {
        MutationOutput::ItemMoved(moved) => moved,
        other => return Err(unexpected(other)),
    };

    ctx.push_undo(
        CommandPayload::MoveSectionItem {
            from: moved.final_path.clone(),
            to_section: moved.restore_section.clone(),
            to_index: moved.restore_index as i64,
        },
        format!("move item {} back to {}", moved.final_path, moved.original_path),
    );
    Ok(EventPayload::LayoutSectionItemMoved {
        from: moved.original_path,
        to: moved.final_path,
    })
}

pub(super) fn remove_item(
    ctx: &mut HandlerContext,
    item: ItemPath,
    eager: bool,
    stash: Option<String>,
) -> CommandResult<EventPayload> {
    let section = item
        .section_path()
        .ok_or_else(|| CommandError::user("the root path names no item"))?;
    let index = item.item_index().unwrap_or_default();

    let (removed, removed_section) = match ctx.put(Mutation::RemoveItem {
        path: item.clone(),
        eager,
        stash: stash.clone(),
    })? {
        MutationOutput::ItemRemoved {
            item,
            removed_section,
        } => (item, removed_section),
        other => return Err(unexpected(other)),
    };
    let widget = removed.widget.obj_ref().clone();
    let section_removed = removed_section.is_some();

    // a stashed item comes back out of its stash
    let restored = match stash.clone() {
        Some(id) => ItemDefinition::Stash(id),
        None => ItemDefinition::Item(removed),
    };
    let inverse = match removed_section {
        Some((path, header)) => CommandPayload::AddLayoutSection {
            parent: path.parent().clone(),
            index: path.section() as i64,
            header,
            items: vec![restored],
        },
        None => CommandPayload::AddSectionItems {
            section,
            index: index as i64,
            items: vec![restored],
        },
    };
    ctx.push_undo(inverse, format!("restore item {}", item));

    Ok(EventPayload::LayoutSectionItemRemoved {
        item,
        widget,
        section_removed,
        stash,
    })
}

pub(super) fn replace_item(
    ctx: &mut HandlerContext,
    item: ItemPath,
    replacement: ItemDefinition,
    stash: Option<String>,
) -> CommandResult<EventPayload> {
    let limits = ctx.config().layout.clone();
    let new_ref = ctx.select("newItems", |s| -> CommandResult<_> {
        let (resolved, _) = resolve_item_definitions(s.active_content(), std::slice::from_ref(&replacement))?;
        validation::new_items(s, &resolved, &limits, Some(&item))?;
        match resolved.as_slice() {
            [single] => Ok(single.widget.obj_ref().clone()),
            other => Err(CommandError::user(format!(
                "replacement must be exactly one item, got {}",
                other.len()
            ))),
        }
    })?;

    let restash = single_stash(std::slice::from_ref(&replacement));
    let old = match ctx.put(Mutation::ReplaceItem {
        path: item.clone(),
        item: replacement,
        stash: stash.clone(),
    })? {
        MutationOutput::ItemReplaced(old) => old,
        other => return Err(unexpected(other)),
    };
    let previous = old.widget.obj_ref().clone();

    ctx.push_undo(
        CommandPayload::ReplaceSectionItem {
            item: item.clone(),
            replacement: match stash {
                Some(id) => ItemDefinition::Stash(id),
                None => ItemDefinition::Item(old),
            },
            stash: restash,
        },
        format!("restore item {}", item),
    );
    Ok(EventPayload::LayoutSectionItemReplaced {
        item,
        previous,
        replacement: new_ref,
    })
}

pub(super) fn resize_height(
    ctx: &mut HandlerContext,
    parent: ItemPath,
    section_index: i64,
    item_indexes: Vec<i64>,
    height: u32,
) -> CommandResult<EventPayload> {
    let limits = ctx.config().layout.clone();
    let targets = ctx.select("resizeTargets", |s| {
        validation::resize_height_targets(s, &limits, &parent, section_index, &item_indexes, height)
    })?;
    let items: Vec<ItemPath> = targets.iter().map(|(path, _)| path.clone()).collect();

    set_sizes(ctx, targets, "restore heights")?;
    Ok(EventPayload::LayoutSectionItemsHeightResized { items, height })
}

pub(super) fn resize_width(ctx: &mut HandlerContext, item: ItemPath, width: u32) -> CommandResult<EventPayload> {
    let limits = ctx.config().layout.clone();
    validation::check_width(width, &limits)?;
    let current = ctx.select("itemSize", |s| {
        layout::item(&s.active_content().layout, &item).map(|i| i.size)
    })?;

    set_sizes(
        ctx,
        vec![(item.clone(), ItemSize::new(width, current.grid_height))],
        "restore width",
    )?;
    Ok(EventPayload::LayoutSectionItemWidthResized { item, width })
}

pub(super) fn update_sizes(ctx: &mut HandlerContext, sizes: Vec<ItemSizeUpdate>) -> CommandResult<EventPayload> {
    if sizes.is_empty() {
        return Err(CommandError::user("no sizes to update"));
    }
    let limits = ctx.config().layout.clone();
    for update in &sizes {
        validation::check_size(&update.size, &limits)?;
    }
    let items: Vec<ItemPath> = sizes.iter().map(|u| u.item.clone()).collect();

    set_sizes(
        ctx,
        sizes.into_iter().map(|u| (u.item, u.size)).collect(),
        "restore sizes",
    )?;
    Ok(EventPayload::LayoutItemSizesUpdated { items })
}

/// Apply sizes and record the previous ones as the inverse
fn set_sizes(ctx: &mut HandlerContext, sizes: Vec<(ItemPath, ItemSize)>, description: &str) -> CommandResult<()> {
    let previous = match ctx.put(Mutation::SetItemSizes { sizes })? {
        MutationOutput::SizesChanged(previous) => previous,
        other => return Err(unexpected(other)),
    };
    ctx.push_undo(
        CommandPayload::UpdateItemSizes {
            sizes: previous
                .into_iter()
                .map(|(item, size)| ItemSizeUpdate { item, size })
                .collect(),
        },
        description,
    );
    Ok(())
}

/// Stash that a lone stash definition draws from; undo puts the items back there
fn single_stash(items: &[ItemDefinition]) -> Option<String> {
    match items {
        [ItemDefinition::Stash(id)] => Some(id.clone()),
        _ => None,
    }
}

/// Headers without any field are stored as absent
fn normalized(header: Option<SectionHeader>) -> Option<SectionHeader> {
    header.filter(|h| h.title.is_some() || h.description.is_some())
}

pub(super) fn unexpected(output: MutationOutput) -> CommandError {
    CommandError::internal(format!("unexpected mutation output {:?}", output))
}
