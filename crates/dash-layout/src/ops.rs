//! Structural layout mutations
//!
//! All operations work in place on a layout owned by the caller (the store
//! reducer clones before mutating). Each validates fully before touching the
//! tree, so an `Err` leaves the layout unchanged.

use dash_core::{
    DashError, ItemPath, ItemSize, Layout, LayoutItem, LayoutLimits, Result, Section, SectionPath,
};
use tracing::debug;

use crate::index::{check_existing, check_insertion, check_slot};
use crate::resolve::{item, item_mut, layout_at, layout_at_mut, section, section_mut, split};

/// Where a moved item ended up, and how to move it back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedItem {
    pub original_path: ItemPath,
    pub final_path: ItemPath,
    /// Section that receives the item when moving it back from `final_path`
    pub restore_section: SectionPath,
    pub restore_index: usize,
}

/// Insert a section into the layout owned by `parent` (insertion flavor)
pub fn add_section(
    root: &mut Layout,
    parent: &ItemPath,
    index: i64,
    section: Section,
) -> Result<SectionPath> {
    let layout = layout_at_mut(root, parent)?;
    let at = check_insertion(index, layout.sections.len(), "section")?;
    layout.sections.insert(at, section);
    Ok(SectionPath::new(parent.clone(), at))
}

pub fn remove_section(root: &mut Layout, path: &SectionPath) -> Result<Section> {
    let layout = layout_at_mut(root, path.parent())?;
    if path.section() >= layout.sections.len() {
        return Err(DashError::NotFound(format!("section {}", path)));
    }
    Ok(layout.sections.remove(path.section()))
}

/// Reposition a section within its layout.
///
/// `to_index` uses the slot flavor (`-1` or an existing index) and is
/// interpreted after the section was taken out. Returns the final section path.
pub fn move_section(root: &mut Layout, from: &SectionPath, to_index: i64) -> Result<SectionPath> {
    let layout = layout_at_mut(root, from.parent())?;
    let len = layout.sections.len();
    if from.section() >= len {
        return Err(DashError::NotFound(format!("section {}", from)));
    }
    let to = check_slot(to_index, len, "section target")?;
    let moved = layout.sections.remove(from.section());
    layout.sections.insert(to, moved);
    Ok(from.with_section(to))
}

/// Insert items into a section (insertion flavor); returns the first item's path
pub fn insert_items(
    root: &mut Layout,
    target: &SectionPath,
    index: i64,
    items: Vec<LayoutItem>,
) -> Result<ItemPath> {
    let section = section_mut(root, target)?;
    let at = check_insertion(index, section.items.len(), "item")?;
    section.items.splice(at..at, items);
    Ok(target.item(at))
}

pub fn remove_item(root: &mut Layout, path: &ItemPath) -> Result<LayoutItem> {
    let (section_path, index) = split(path)?;
    let section = section_mut(root, &section_path)?;
    if index >= section.items.len() {
        return Err(DashError::NotFound(format!("item {}", path)));
    }
    Ok(section.items.remove(index))
}

/// Swap the item at `path` for `replacement`; returns the old item
pub fn replace_item(root: &mut Layout, path: &ItemPath, replacement: LayoutItem) -> Result<LayoutItem> {
    let slot = item_mut(root, path)?;
    Ok(std::mem::replace(slot, replacement))
}

/// Move an item between sections, possibly across nesting levels.
///
/// The source is removed first; the target section path is then recomputed
/// against the post-removal tree and `to_index` clamped to the post-removal
/// length. `to_index` must be `-1` (append) or within `0..=len` of the target
/// section as it was before the move.
pub fn move_item(
    root: &mut Layout,
    from: &ItemPath,
    to_section: &SectionPath,
    to_index: i64,
) -> Result<MovedItem> {
    item(root, from)?;
    let before = section(root, to_section)?.items.len();
    check_insertion(to_index, before, "move target")?;
    let target = to_section.after_item_removed(from).ok_or_else(|| {
        DashError::InvalidInput(format!("cannot move {} into its own nested layout", from))
    })?;
    let origin = split(from)?;

    let moved = remove_item(root, from)?;
    let dest = section_mut(root, &target)?;
    let at = if to_index == -1 {
        dest.items.len()
    } else {
        usize::try_from(to_index).unwrap_or(0).min(dest.items.len())
    };
    dest.items.insert(at, moved);

    let final_path = target.item(at);
    debug!("moved item {} to {}", from, final_path);
    Ok(MovedItem {
        original_path: from.clone(),
        restore_section: origin.0.after_item_inserted(&final_path),
        restore_index: origin.1,
        final_path,
    })
}

/// Validate a height against the configured limits
pub fn check_height(height: u32, limits: &LayoutLimits) -> Result<()> {
    if height < limits.min_height || height > limits.max_height {
        return Err(DashError::InvalidSize(format!(
            "height {} outside {}..={}",
            height, limits.min_height, limits.max_height
        )));
    }
    Ok(())
}

/// Validate a width against the configured limits
pub fn check_width(width: u32, limits: &LayoutLimits) -> Result<()> {
    if width < limits.min_width || width > limits.max_width {
        return Err(DashError::InvalidSize(format!(
            "width {} outside {}..={}",
            width, limits.min_width, limits.max_width
        )));
    }
    Ok(())
}

/// Set the size of the item at `path`; returns the previous size
pub fn set_size(root: &mut Layout, path: &ItemPath, size: ItemSize) -> Result<ItemSize> {
    let slot = item_mut(root, path)?;
    Ok(std::mem::replace(&mut slot.size, size))
}

/// Resolve bare section/item indexes of the layout at `parent` (existing flavor)
pub fn item_path_from_indexes(
    root: &Layout,
    parent: &ItemPath,
    section_index: i64,
    item_index: i64,
) -> Result<ItemPath> {
    let layout = layout_at(root, parent)?;
    let s = check_existing(section_index, layout.sections.len(), "section")?;
    let i = check_existing(item_index, layout.sections[s].items.len(), "item")?;
    Ok(parent.child(s, i))
}
