use crate::merge::AggregatedSet;
use crate::types::{AggregatorError, Item};
use feruca::Collator;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Id,
    Name,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    pub fn by_id() -> Self {
        Self::new(SortKey::Id, SortDirection::Ascending)
    }

    pub fn by_name() -> Self {
        Self::new(SortKey::Name, SortDirection::Ascending)
    }

    pub fn compare(&self, collator: &mut NameCollator, a: &Item, b: &Item) -> Ordering {
        let ordering = match self.key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Name => collator.compare(&a.name, &b.name),
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

impl FromStr for SortKey {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(SortKey::Id),
            "name" => Ok(SortKey::Name),
            other => Err(AggregatorError::Config(format!("unknown sort key: {}", other))),
        }
    }
}

impl FromStr for SortDirection {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(AggregatorError::Config(format!("unknown sort direction: {}", other))),
        }
    }
}

/// Locale-aware name ordering using the Unicode Collation Algorithm with the
/// CLDR root tailoring. Accented letters sort next to their base letter and
/// case only decides between otherwise equal names.
pub struct NameCollator {
    inner: Collator,
}

impl NameCollator {
    pub fn new() -> Self {
        Self {
            inner: Collator::default(),
        }
    }

    pub fn compare(&mut self, a: &str, b: &str) -> Ordering {
        self.inner.collate(&a, &b)
    }
}

impl Default for NameCollator {
    fn default() -> Self {
        Self::new()
    }
}

/// One-off comparison. Prefer a shared `NameCollator` when sorting.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    NameCollator::new().compare(a, b)
}

/// Sorted copy of the set. The set itself is never touched and equal keys keep
/// their insertion order.
pub fn sort_items(set: &AggregatedSet, order: SortOrder) -> Vec<Item> {
    let mut items = set.items().to_vec();
    let mut collator = NameCollator::new();
    items.sort_by(|a, b| order.compare(&mut collator, a, b));
    items
}

/// Client-side window over an already sorted list, 1-based like the fetch
/// pages. Out of range pages come back empty.
pub fn page_window(items: &[Item], page: usize, per_page: usize) -> &[Item] {
    if per_page == 0 || page == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(per_page);
    if start >= items.len() {
        return &[];
    }
    let end = (start + per_page).min(items.len());
    &items[start..end]
}
