//! Snapshot and item types.
//!
//! A snapshot is the ordered forest of items that gets versioned. It is plain
//! owned data: cloning a snapshot is a deep copy, so a snapshot embedded in a
//! commit can never be reached (let alone mutated) through the staging area
//! or another commit.
//!
//! Wire format of an item:
//! ```text
//! {
//!   "id": "01hx...",
//!   "type": "todo",
//!   "title": "Buy milk",
//!   "completed": false,
//!   "children": []
//! }
//! ```

use serde::{Deserialize, Serialize};

/// what an item represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// actionable entry, carries a completion flag
    Todo,
    /// plain text
    Text,
    Heading,
}

/// a single node of the versioned tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default)]
    pub children: Vec<Item>,
}

impl Item {
    /// create an item with a caller-chosen id
    pub fn new(id: impl Into<String>, kind: ItemKind, title: impl Into<String>) -> Self {
        let completed = match kind {
            ItemKind::Todo => Some(false),
            ItemKind::Text | ItemKind::Heading => None,
        };
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            completed,
            children: Vec::new(),
        }
    }

    /// a fresh, uncompleted todo with a generated id
    pub fn todo(title: impl Into<String>) -> Self {
        Self::new(generate_item_id(), ItemKind::Todo, title)
    }

    pub fn text(title: impl Into<String>) -> Self {
        Self::new(generate_item_id(), ItemKind::Text, title)
    }

    pub fn heading(title: impl Into<String>) -> Self {
        Self::new(generate_item_id(), ItemKind::Heading, title)
    }

    /// builder-style child append
    pub fn with_child(mut self, child: Item) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.completed.unwrap_or(false)
    }
}

fn generate_item_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

/// An ordered forest of items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    items: Vec<Item>,
}

impl Snapshot {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// true when there are no top-level items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// number of top-level items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// number of items at every depth
    pub fn item_count(&self) -> usize {
        self.iter().count()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    /// depth-first (pre-order) walk over every item
    pub fn iter(&self) -> SnapshotIter<'_> {
        SnapshotIter {
            stack: self.items.iter().rev().collect(),
        }
    }

    /// find an item anywhere in the tree
    pub fn find(&self, id: &str) -> Option<&Item> {
        self.iter().find(|item| item.id == id)
    }
}

impl From<Vec<Item>> for Snapshot {
    fn from(items: Vec<Item>) -> Self {
        Self::new(items)
    }
}

impl FromIterator<Item> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// pre-order iterator over a snapshot
pub struct SnapshotIter<'a> {
    stack: Vec<&'a Item>,
}

impl<'a> Iterator for SnapshotIter<'a> {
    type Item = &'a Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.stack.pop()?;
        self.stack.extend(item.children.iter().rev());
        Some(item)
    }
}
