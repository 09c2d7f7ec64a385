//! Layout addressing
//!
//! An [`ItemPath`] is the ordered sequence of `(section, item)` pairs leading
//! from the root layout to an item; every segment except the last descends
//! into a nested layout widget. A [`SectionPath`] names a section inside the
//! layout owned by `parent` (the root layout when `parent` is empty).
//!
//! Canonical string forms:
//! - items: `"0:1/2:0"`
//! - sections: `"0:1#2"`, root sections `"#0"`
//!
//! Paths are plain values. They are never cached across mutations; the
//! `after_*` helpers recompute a path against the tree produced by a single
//! insertion or removal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DashError;

/// One step of a path: a section index and an item index within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathSegment {
    pub section: usize,
    pub item: usize,
}

impl PathSegment {
    pub fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.section, self.item)
    }
}

impl FromStr for PathSegment {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (section, item) = s
            .split_once(':')
            .ok_or_else(|| DashError::InvalidPath(format!("segment '{}' is not section:item", s)))?;
        let section = section
            .parse()
            .map_err(|_| DashError::InvalidPath(format!("bad section index in '{}'", s)))?;
        let item = item
            .parse()
            .map_err(|_| DashError::InvalidPath(format!("bad item index in '{}'", s)))?;
        Ok(Self { section, item })
    }
}

/// Address of a layout item; empty for the root layout itself
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemPath(Vec<PathSegment>);

impl ItemPath {
    /// The root layout (no segments)
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Path of item `item` in root section `section`
    pub fn single(section: usize, item: usize) -> Self {
        Self(vec![PathSegment::new(section, item)])
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn last(&self) -> Option<PathSegment> {
        self.0.last().copied()
    }

    /// Path of an item inside the nested layout addressed by `self`
    pub fn child(&self, section: usize, item: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::new(section, item));
        Self(segments)
    }

    /// The section directly containing this item
    pub fn section_path(&self) -> Option<SectionPath> {
        let (last, prefix) = self.0.split_last()?;
        Some(SectionPath::new(Self(prefix.to_vec()), last.section))
    }

    /// Index of this item within its section
    pub fn item_index(&self) -> Option<usize> {
        self.0.last().map(|s| s.item)
    }

    /// True when `self` equals `prefix` or lies inside it
    pub fn starts_with(&self, prefix: &ItemPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Recompute this path after the item at `removed` was taken out.
    ///
    /// Returns `None` when `self` addressed the removed item or something
    /// nested inside it.
    pub fn after_item_removed(&self, removed: &ItemPath) -> Option<ItemPath> {
        if removed.is_root() {
            return Some(self.clone());
        }
        if self.starts_with(removed) {
            return None;
        }
        let mut adjusted = self.clone();
        let depth = removed.depth() - 1;
        let gone = removed.0[depth];
        if self.0.len() > depth && self.0[..depth] == removed.0[..depth] {
            let seg = &mut adjusted.0[depth];
            if seg.section == gone.section && seg.item > gone.item {
                seg.item -= 1;
            }
        }
        Some(adjusted)
    }

    /// Recompute this path after an item was inserted at `inserted`
    pub fn after_item_inserted(&self, inserted: &ItemPath) -> ItemPath {
        let mut adjusted = self.clone();
        let Some(depth) = inserted.depth().checked_sub(1) else {
            return adjusted;
        };
        let new = inserted.0[depth];
        if self.0.len() > depth && self.0[..depth] == inserted.0[..depth] {
            let seg = &mut adjusted.0[depth];
            if seg.section == new.section && seg.item >= new.item {
                seg.item += 1;
            }
        }
        adjusted
    }

    /// Recompute this path after the section at `removed` was taken out.
    ///
    /// Returns `None` when `self` lived inside the removed section.
    pub fn after_section_removed(&self, removed: &SectionPath) -> Option<ItemPath> {
        let depth = removed.parent.depth();
        if self.0.len() <= depth || self.0[..depth] != removed.parent.0[..] {
            return Some(self.clone());
        }
        let mut adjusted = self.clone();
        let seg = &mut adjusted.0[depth];
        if seg.section == removed.section {
            return None;
        }
        if seg.section > removed.section {
            seg.section -= 1;
        }
        Some(adjusted)
    }

    /// Recompute this path after a section was inserted at `inserted`
    pub fn after_section_inserted(&self, inserted: &SectionPath) -> ItemPath {
        let depth = inserted.parent.depth();
        let mut adjusted = self.clone();
        if self.0.len() > depth && self.0[..depth] == inserted.parent.0[..] {
            let seg = &mut adjusted.0[depth];
            if seg.section >= inserted.section {
                seg.section += 1;
            }
        }
        adjusted
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, seg) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl FromStr for ItemPath {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        s.split('/')
            .map(PathSegment::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl TryFrom<String> for ItemPath {
    type Error = DashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ItemPath> for String {
    fn from(path: ItemPath) -> Self {
        path.to_string()
    }
}

/// Address of a section within the layout owned by `parent`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectionPath {
    parent: ItemPath,
    section: usize,
}

impl SectionPath {
    pub fn new(parent: ItemPath, section: usize) -> Self {
        Self { parent, section }
    }

    /// Section `section` of the root layout
    pub fn root(section: usize) -> Self {
        Self::new(ItemPath::root(), section)
    }

    /// Nested layout item owning the section; root when empty
    pub fn parent(&self) -> &ItemPath {
        &self.parent
    }

    pub fn section(&self) -> usize {
        self.section
    }

    /// Same layout, different section index
    pub fn with_section(&self, section: usize) -> Self {
        Self::new(self.parent.clone(), section)
    }

    /// Path of item `index` inside this section
    pub fn item(&self, index: usize) -> ItemPath {
        self.parent.child(self.section, index)
    }

    /// True when `item` is a direct child of this section
    pub fn contains(&self, item: &ItemPath) -> bool {
        item.section_path().as_ref() == Some(self)
    }

    /// Recompute after an item removal; `None` when the owning layout went with it
    pub fn after_item_removed(&self, removed: &ItemPath) -> Option<SectionPath> {
        self.parent
            .after_item_removed(removed)
            .map(|parent| Self::new(parent, self.section))
    }

    pub fn after_item_inserted(&self, inserted: &ItemPath) -> SectionPath {
        Self::new(self.parent.after_item_inserted(inserted), self.section)
    }
}

impl fmt::Display for SectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.parent, self.section)
    }
}

impl FromStr for SectionPath {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (parent, section) = s
            .rsplit_once('#')
            .ok_or_else(|| DashError::InvalidPath(format!("section path '{}' lacks '#'", s)))?;
        let section = section
            .parse()
            .map_err(|_| DashError::InvalidPath(format!("bad section index in '{}'", s)))?;
        Ok(Self::new(parent.parse()?, section))
    }
}

impl TryFrom<String> for SectionPath {
    type Error = DashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SectionPath> for String {
    fn from(path: SectionPath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_forms() {
        let item: ItemPath = "0:1/2:0".parse().unwrap();
        assert_eq!(item.depth(), 2);
        assert_eq!(item.to_string(), "0:1/2:0");

        let nested: SectionPath = "0:1#2".parse().unwrap();
        assert_eq!(nested.parent(), &ItemPath::single(0, 1));
        assert_eq!(nested.section(), 2);
        assert_eq!(nested.to_string(), "0:1#2");

        assert_eq!(SectionPath::root(0).to_string(), "#0");
        assert_eq!("#3".parse::<SectionPath>().unwrap(), SectionPath::root(3));
    }

    #[test]
    fn test_structurally_equal_paths_serialize_identically() {
        let a = ItemPath::single(0, 1).child(2, 0);
        let b: ItemPath = "0:1/2:0".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        let back: ItemPath = serde_json::from_str("\"0:1/2:0\"").unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("0".parse::<ItemPath>().is_err());
        assert!("0:x".parse::<ItemPath>().is_err());
        assert!("-1:0".parse::<ItemPath>().is_err());
        assert!("0:1".parse::<SectionPath>().is_err());
        assert!(serde_json::from_str::<ItemPath>("\"a:b\"").is_err());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut paths = vec![
            ItemPath::single(1, 0),
            ItemPath::single(0, 1).child(0, 0),
            ItemPath::single(0, 1),
            ItemPath::single(0, 0),
        ];
        paths.sort();
        let rendered: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        assert_eq!(rendered, vec!["0:0", "0:1", "0:1/0:0", "1:0"]);
    }

    #[test]
    fn test_section_path_of_item() {
        let item = ItemPath::single(0, 1).child(2, 3);
        let section = item.section_path().unwrap();
        assert_eq!(section.to_string(), "0:1#2");
        assert!(section.contains(&item));
        assert_eq!(section.item(3), item);
        assert!(ItemPath::root().section_path().is_none());
    }

    #[test]
    fn test_after_item_removed_shifts_later_siblings() {
        let removed = ItemPath::single(0, 1);
        assert_eq!(
            ItemPath::single(0, 3).after_item_removed(&removed),
            Some(ItemPath::single(0, 2))
        );
        assert_eq!(
            ItemPath::single(0, 0).after_item_removed(&removed),
            Some(ItemPath::single(0, 0))
        );
        // other section untouched
        assert_eq!(
            ItemPath::single(1, 3).after_item_removed(&removed),
            Some(ItemPath::single(1, 3))
        );
        // descendants of a shifted nested layout follow it
        assert_eq!(
            ItemPath::single(0, 2).child(0, 0).after_item_removed(&removed),
            Some(ItemPath::single(0, 1).child(0, 0))
        );
        // the removed item and anything inside it vanish
        assert_eq!(removed.after_item_removed(&removed), None);
        assert_eq!(removed.child(0, 0).after_item_removed(&removed), None);
    }

    #[test]
    fn test_after_item_inserted_shifts_from_insertion_point() {
        let inserted = ItemPath::single(0, 1);
        assert_eq!(
            ItemPath::single(0, 1).after_item_inserted(&inserted),
            ItemPath::single(0, 2)
        );
        assert_eq!(
            ItemPath::single(0, 0).after_item_inserted(&inserted),
            ItemPath::single(0, 0)
        );
        let section = SectionPath::new(ItemPath::single(0, 4), 0);
        assert_eq!(
            section.after_item_inserted(&inserted).to_string(),
            "0:5#0"
        );
    }

    #[test]
    fn test_after_section_removed() {
        let removed = SectionPath::root(1);
        assert_eq!(
            ItemPath::single(2, 0).after_section_removed(&removed),
            Some(ItemPath::single(1, 0))
        );
        assert_eq!(ItemPath::single(1, 4).after_section_removed(&removed), None);
        assert_eq!(
            ItemPath::single(0, 4).after_section_removed(&removed),
            Some(ItemPath::single(0, 4))
        );
        assert_eq!(
            ItemPath::single(1, 0).after_section_inserted(&removed),
            ItemPath::single(2, 0)
        );
    }
}
