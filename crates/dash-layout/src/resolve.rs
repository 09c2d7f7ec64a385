//! Path resolution and traversal
//!
//! Resolution fails with `NotFound` when a segment is out of range at any
//! depth, and with `InvalidPath` when a path descends through a widget that
//! is not a nested layout.

use dash_core::{DashError, ItemPath, Layout, LayoutItem, ObjRef, Result, Section, SectionPath, Widget};

/// Layout owned by the item at `path`; the root layout for the empty path
pub fn layout_at<'a>(root: &'a Layout, path: &ItemPath) -> Result<&'a Layout> {
    let mut layout = root;
    for (depth, seg) in path.segments().iter().enumerate() {
        let item = layout
            .sections
            .get(seg.section)
            .and_then(|s| s.items.get(seg.item))
            .ok_or_else(|| not_found(path, depth))?;
        layout = item.widget.nested_layout().ok_or_else(|| {
            DashError::InvalidPath(format!(
                "{} does not address a nested layout ({} widget)",
                path,
                item.widget.kind()
            ))
        })?;
    }
    Ok(layout)
}

pub fn layout_at_mut<'a>(root: &'a mut Layout, path: &ItemPath) -> Result<&'a mut Layout> {
    let mut layout = root;
    for (depth, seg) in path.segments().iter().enumerate() {
        let item = layout
            .sections
            .get_mut(seg.section)
            .and_then(|s| s.items.get_mut(seg.item))
            .ok_or_else(|| not_found(path, depth))?;
        let kind = item.widget.kind();
        layout = item.widget.nested_layout_mut().ok_or_else(|| {
            DashError::InvalidPath(format!(
                "{} does not address a nested layout ({} widget)",
                path, kind
            ))
        })?;
    }
    Ok(layout)
}

pub fn section<'a>(root: &'a Layout, path: &SectionPath) -> Result<&'a Section> {
    layout_at(root, path.parent())?
        .sections
        .get(path.section())
        .ok_or_else(|| DashError::NotFound(format!("section {}", path)))
}

pub fn section_mut<'a>(root: &'a mut Layout, path: &SectionPath) -> Result<&'a mut Section> {
    layout_at_mut(root, path.parent())?
        .sections
        .get_mut(path.section())
        .ok_or_else(|| DashError::NotFound(format!("section {}", path)))
}

pub fn item<'a>(root: &'a Layout, path: &ItemPath) -> Result<&'a LayoutItem> {
    let (section_path, index) = split(path)?;
    section(root, &section_path)?
        .items
        .get(index)
        .ok_or_else(|| DashError::NotFound(format!("item {}", path)))
}

pub fn item_mut<'a>(root: &'a mut Layout, path: &ItemPath) -> Result<&'a mut LayoutItem> {
    let (section_path, index) = split(path)?;
    section_mut(root, &section_path)?
        .items
        .get_mut(index)
        .ok_or_else(|| DashError::NotFound(format!("item {}", path)))
}

pub(crate) fn split(path: &ItemPath) -> Result<(SectionPath, usize)> {
    match (path.section_path(), path.item_index()) {
        (Some(section), Some(index)) => Ok((section, index)),
        _ => Err(DashError::InvalidPath(
            "the root path does not address an item".into(),
        )),
    }
}

fn not_found(path: &ItemPath, depth: usize) -> DashError {
    DashError::NotFound(format!("{} (segment {} out of range)", path, depth))
}

/// Visit every item depth first, parents before their nested items
pub fn for_each_item<'a>(layout: &'a Layout, f: &mut dyn FnMut(&ItemPath, &'a LayoutItem)) {
    visit(layout, &ItemPath::root(), f);
}

fn visit<'a>(layout: &'a Layout, prefix: &ItemPath, f: &mut dyn FnMut(&ItemPath, &'a LayoutItem)) {
    for (s, section) in layout.sections.iter().enumerate() {
        for (i, item) in section.items.iter().enumerate() {
            let path = prefix.child(s, i);
            f(&path, item);
            if let Some(nested) = item.widget.nested_layout() {
                visit(nested, &path, f);
            }
        }
    }
}

/// Apply `f` to every widget, descending into nested layouts
pub fn for_each_widget_mut(layout: &mut Layout, f: &mut dyn FnMut(&mut Widget)) {
    for section in &mut layout.sections {
        for item in &mut section.items {
            f(&mut item.widget);
            if let Some(nested) = item.widget.nested_layout_mut() {
                for_each_widget_mut(nested, f);
            }
        }
    }
}

/// Every widget ref with the path of the layout item holding it.
///
/// Visualizations inside a switcher are reported with the switcher's path.
pub fn widget_refs(layout: &Layout) -> Vec<(ObjRef, ItemPath)> {
    let mut refs = Vec::new();
    for_each_item(layout, &mut |path, item| {
        refs.push((item.widget.obj_ref().clone(), path.clone()));
        if let Widget::VisualizationSwitcher(switcher) = &item.widget {
            for vis in &switcher.visualizations {
                refs.push((vis.obj_ref.clone(), path.clone()));
            }
        }
    });
    refs
}

/// Path of the layout item whose widget has `obj_ref`
pub fn find_widget(layout: &Layout, obj_ref: &ObjRef) -> Option<ItemPath> {
    let mut found = None;
    for_each_item(layout, &mut |path, item| {
        if found.is_none() && item.widget.obj_ref() == obj_ref {
            found = Some(path.clone());
        }
    });
    found
}

/// Widget refs contained in `item`, itself included
pub fn refs_in_item(item: &LayoutItem) -> Vec<ObjRef> {
    let layout = Layout {
        sections: vec![Section::new(vec![item.clone()])],
    };
    widget_refs(&layout).into_iter().map(|(r, _)| r).collect()
}
