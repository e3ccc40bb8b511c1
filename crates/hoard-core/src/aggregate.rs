//! # Aggregation
//!
//! Recursive rollups over the hierarchy and the tag index.
//!
//! Totals walk every descendant reachable through Location nesting and
//! container Items. `include_in_total` gates only an Item's own
//! contribution: the walk always continues into its children. Traversals
//! keep a visited set and skip repeats, so a corrupted cycle yields a
//! partial total instead of looping.

use crate::catalog::Catalog;
use crate::store::EntityStore;
use crate::{EntityId, EntityKind, HoardError, Item, ItemPatch, Money};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

// =============================================================================
// TRAVERSAL
// =============================================================================

/// Every Item below `parent_id`, in depth-first order.
fn descendant_items(
    catalog: &Catalog,
    parent_id: &EntityId,
    parent_kind: EntityKind,
) -> Result<Vec<Item>, HoardError> {
    let store = catalog.backend();
    let mut found = Vec::new();
    let mut visited: HashSet<EntityId> = HashSet::from([parent_id.clone()]);
    let mut stack = vec![(parent_kind, parent_id.clone())];

    while let Some((kind, id)) = stack.pop() {
        if kind == EntityKind::Location {
            for location in store.child_locations(Some(&id))? {
                if visited.insert(location.id.clone()) {
                    stack.push((EntityKind::Location, location.id));
                } else {
                    tracing::warn!(id = %location.id, "cycle reached during aggregation");
                }
            }
        }
        for item in store.child_items(Some(&id))? {
            if !visited.insert(item.id.clone()) {
                tracing::warn!(id = %item.id, "cycle reached during aggregation");
                continue;
            }
            stack.push((EntityKind::Item, item.id.clone()));
            found.push(item);
        }
    }
    Ok(found)
}

// =============================================================================
// TOTALS
// =============================================================================

/// Sum of quantities of every counted Item below `parent_id`.
///
/// A missing parent yields zero.
pub fn total_item_count(
    catalog: &Catalog,
    parent_id: &EntityId,
    parent_kind: EntityKind,
) -> Result<u64, HoardError> {
    Ok(descendant_items(catalog, parent_id, parent_kind)?
        .iter()
        .filter(|item| item.include_in_total)
        .map(|item| u64::from(item.quantity))
        .sum())
}

/// Price rollup for a subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Valuation {
    /// Sum of purchase price times quantity.
    pub purchase: Money,
    /// Sum of current value times quantity.
    pub current: Money,
    /// Counted items carrying at least one price.
    pub priced_items: usize,
}

/// Value of every counted Item below `parent_id`, each price times quantity.
pub fn total_value(
    catalog: &Catalog,
    parent_id: &EntityId,
    parent_kind: EntityKind,
) -> Result<Valuation, HoardError> {
    let mut valuation = Valuation::default();
    for item in descendant_items(catalog, parent_id, parent_kind)?
        .iter()
        .filter(|item| item.include_in_total)
    {
        if item.purchase_price.is_none() && item.current_value.is_none() {
            continue;
        }
        valuation.priced_items += 1;
        if let Some(price) = item.purchase_price {
            valuation.purchase = valuation.purchase.saturating_add(price.times(item.quantity));
        }
        if let Some(value) = item.current_value {
            valuation.current = valuation.current.saturating_add(value.times(item.quantity));
        }
    }
    Ok(valuation)
}

/// Immediate children of one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChildCounts {
    pub locations: usize,
    pub items: usize,
}

/// Count immediate children. Items never hold Locations.
pub fn direct_child_counts(
    catalog: &Catalog,
    parent_id: &EntityId,
    parent_kind: EntityKind,
) -> Result<ChildCounts, HoardError> {
    let store = catalog.backend();
    let locations = match parent_kind {
        EntityKind::Location => store.child_locations(Some(parent_id))?.len(),
        EntityKind::Item => 0,
    };
    Ok(ChildCounts {
        locations,
        items: store.child_items(Some(parent_id))?.len(),
    })
}

// =============================================================================
// TAGS
// =============================================================================

/// Usage count of one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Every tag in use, most used first, ties by name.
pub fn tag_index(catalog: &Catalog) -> Result<Vec<TagCount>, HoardError> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for item in catalog.backend().items()? {
        for tag in item.tags {
            *counts.entry(tag).or_default() += 1;
        }
    }

    let mut index: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    index.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    Ok(index)
}

/// An item a tag rewrite could not update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRewriteFailure {
    pub id: EntityId,
    pub reason: String,
}

/// Outcome of a tag rename or delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagRewriteReport {
    /// Items that were rewritten.
    pub updated: Vec<EntityId>,
    pub errors: Vec<TagRewriteFailure>,
}

fn required_tag(tag: &str) -> Result<String, HoardError> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(HoardError::Validation("tag must not be empty".to_string()));
    }
    Ok(tag.to_string())
}

/// Rewrite the tags of every item carrying `tag`, one update per item.
fn rewrite_tag<F>(
    catalog: &mut Catalog,
    tag: &str,
    mut rewrite: F,
) -> Result<TagRewriteReport, HoardError>
where
    F: FnMut(&mut Vec<String>),
{
    let mut report = TagRewriteReport::default();
    let affected: Vec<Item> = catalog
        .backend()
        .items()?
        .into_iter()
        .filter(|item| item.tags.contains(tag))
        .collect();

    for item in affected {
        let mut tags: Vec<String> = item.tags.into_iter().collect();
        rewrite(&mut tags);
        let patch = ItemPatch {
            tags: Some(tags),
            ..ItemPatch::default()
        };
        match catalog.update_item(&item.id, patch) {
            Ok(_) => report.updated.push(item.id),
            Err(e) => {
                tracing::warn!(id = %item.id, error = %e, "tag rewrite failed");
                report.errors.push(TagRewriteFailure {
                    id: item.id,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(report)
}

/// Rename `old` to `new` on every item. Items that already carry `new`
/// simply lose `old`.
pub fn rename_tag(
    catalog: &mut Catalog,
    old: &str,
    new: &str,
) -> Result<TagRewriteReport, HoardError> {
    let old = required_tag(old)?;
    let new = required_tag(new)?;
    if old == new {
        return Ok(TagRewriteReport::default());
    }

    let report = rewrite_tag(catalog, &old, |tags| {
        tags.retain(|t| *t != old);
        tags.push(new.clone());
    })?;
    tracing::info!(from = %old, to = %new, items = report.updated.len(), "renamed tag");
    Ok(report)
}

/// Remove `tag` from every item.
pub fn delete_tag(catalog: &mut Catalog, tag: &str) -> Result<TagRewriteReport, HoardError> {
    let tag = required_tag(tag)?;
    let report = rewrite_tag(catalog, &tag, |tags| tags.retain(|t| *t != tag))?;
    tracing::info!(tag = %tag, items = report.updated.len(), "deleted tag");
    Ok(report)
}

// =============================================================================
// TESTS
// =============================================================================
