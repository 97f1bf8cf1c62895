//! Core types for inbox tracking

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An inbox message as seen by the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub silent_inbox: bool,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Loaded asset payload. Only the tracker writes this.
    #[serde(skip)]
    pub image_data: Option<Bytes>,
}

impl Item {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            read: false,
            silent_inbox: false,
            image_url: None,
            image_data: None,
        }
    }

    pub fn with_read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn needs_asset(&self) -> bool {
        self.image_url.is_some() && self.image_data.is_none()
    }
}

/// Ordered, id-keyed view of the inbox at one instant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    items: Vec<Item>,
}

impl Snapshot {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Item> {
        self.items.get(row)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.read).count()
    }

    pub fn counts(&self) -> InboxCounts {
        InboxCounts {
            total: self.len(),
            unread: self.unread_count(),
        }
    }

    /// Row index of every item id
    pub fn row_index(&self) -> HashMap<&str, usize> {
        self.items
            .iter()
            .enumerate()
            .map(|(row, item)| (item.id.as_str(), row))
            .collect()
    }

    /// Attach an asset payload to `row`, but only if that row still holds
    /// the item `id`. Returns whether the payload was applied.
    pub fn attach_asset(&mut self, row: usize, id: &str, data: Bytes) -> bool {
        match self.items.get_mut(row) {
            Some(item) if item.id == id => {
                item.image_data = Some(data);
                true
            }
            _ => false,
        }
    }
}

impl From<Vec<Item>> for Snapshot {
    fn from(items: Vec<Item>) -> Self {
        Self::new(items)
    }
}

/// Total and unread message counts at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxCounts {
    pub total: usize,
    pub unread: usize,
}
