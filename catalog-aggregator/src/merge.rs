use crate::types::{Item, ItemKey};
use serde::Serialize;
use std::collections::HashSet;

/// Insertion-ordered collection of items, unique by (source id, item id).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct AggregatedSet {
    items: Vec<Item>,
    #[serde(skip)]
    keys: HashSet<ItemKey>,
}

impl AggregatedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.keys.contains(key)
    }

    /// Append every item whose key is not present yet, in arrival order.
    /// Returns how many were appended.
    pub fn extend_unique<I>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = Item>,
    {
        let before = self.items.len();
        for item in incoming {
            if self.keys.insert(item.key()) {
                self.items.push(item);
            }
        }
        self.items.len() - before
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.keys.clear();
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }
}

impl PartialEq for AggregatedSet {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl FromIterator<Item> for AggregatedSet {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend_unique(iter);
        set
    }
}

impl<'a> IntoIterator for &'a AggregatedSet {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Merge `incoming` into a copy of `existing`.
///
/// An incoming item is appended iff nothing already in the result shares its
/// key, so duplicates inside one batch collapse to their first occurrence.
pub fn merge<I>(existing: &AggregatedSet, incoming: I) -> AggregatedSet
where
    I: IntoIterator<Item = Item>,
{
    let mut merged = existing.clone();
    merged.extend_unique(incoming);
    merged
}
