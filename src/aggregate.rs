// src/aggregate.rs
//! Grouping of flat clipping records by source item.
//!
//! Groups appear in first-occurrence order of their key and members keep
//! their relative import order. Grouping is a pure partition: every input
//! clipping lands in exactly one group.

use crate::model::{Clipping, IndexedClipping, SourceGroup, SourceKey};
use indexmap::IndexMap;
use std::hash::Hash;

/// Partitions `clippings` by `key_fn`, remembering each clipping's position.
pub fn group_by<K, F>(clippings: &[Clipping], key_fn: F) -> IndexMap<K, Vec<IndexedClipping>>
where
    K: Hash + Eq,
    F: Fn(&Clipping) -> K,
{
    partition(
        clippings
            .iter()
            .enumerate()
            .map(|(original_index, clipping)| IndexedClipping {
                original_index,
                clipping: clipping.clone(),
            }),
        key_fn,
    )
}

/// Groups clippings by their case-insensitive `(title, author)` key.
///
/// This is both the local display aggregation and the unit of remote write:
/// one group per remote page.
pub fn group_by_source(clippings: &[Clipping]) -> Vec<SourceGroup> {
    source_groups(group_by(clippings, Clipping::source_key))
}

/// Groups clippings that already carry their original positions.
///
/// Used when the input is a filtered view of an earlier import and the
/// positions must keep pointing at that import.
pub fn group_indexed(clippings: impl IntoIterator<Item = IndexedClipping>) -> Vec<SourceGroup> {
    source_groups(partition(clippings, Clipping::source_key))
}

fn partition<K, F>(
    entries: impl IntoIterator<Item = IndexedClipping>,
    key_fn: F,
) -> IndexMap<K, Vec<IndexedClipping>>
where
    K: Hash + Eq,
    F: Fn(&Clipping) -> K,
{
    let mut groups: IndexMap<K, Vec<IndexedClipping>> = IndexMap::new();
    for entry in entries {
        groups.entry(key_fn(&entry.clipping)).or_default().push(entry);
    }
    groups
}

// The first member names the group.
fn source_groups(groups: IndexMap<SourceKey, Vec<IndexedClipping>>) -> Vec<SourceGroup> {
    groups
        .into_iter()
        .filter_map(|(key, members)| {
            let mut group = SourceGroup::seeded_by(key, &members.first()?.clipping);
            group.clippings = members;
            Some(group)
        })
        .collect()
}
