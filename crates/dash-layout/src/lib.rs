//! # dash-layout
//!
//! Pure layout addressing and mutation engine. No state, no I/O: every
//! function takes the layout tree it works on.

pub mod index;
pub mod ops;
pub mod resolve;

pub use index::{check_existing, check_insertion, check_slot};
pub use ops::{
    add_section, check_height, check_width, insert_items, item_path_from_indexes, move_item,
    move_section, remove_item, remove_section, replace_item, set_size, MovedItem,
};
pub use resolve::{
    find_widget, for_each_item, for_each_widget_mut, item, item_mut, layout_at, layout_at_mut,
    refs_in_item, section, section_mut, widget_refs,
};

#[cfg(test)]
pub(crate) mod testing {
    use dash_core::*;

    pub fn insight(id: &str) -> LayoutItem {
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

    pub fn nested(id: &str, sections: Vec<Section>) -> LayoutItem {
        LayoutItem::new(
            ItemSize::new(12, None),
            Widget::NestedLayout(NestedLayoutWidget {
                obj_ref: ObjRef::id(id),
                layout: Layout { sections },
            }),
        )
    }

    pub fn section_of(items: Vec<LayoutItem>) -> Section {
        Section::new(items)
    }
}
