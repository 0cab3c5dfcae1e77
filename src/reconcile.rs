// src/reconcile.rs
//! The diff between local source groups and the remote inventory.
//!
//! Source keys match case-insensitively. Content matches exactly: two notes
//! that differ only in whitespace are different notes. The remote side always
//! wins; only content missing remotely is ever scheduled for upload.

use crate::model::{
    AppendGroup, Clipping, IndexedClipping, ReconciliationResult, RemoteItem, SourceGroup,
    SourceKey,
};
use std::collections::{HashMap, HashSet};

/// Classifies local groups as new, partially new, or already synced.
///
/// Groups absent remotely go to `to_create` unchanged. Groups present
/// remotely keep only the clippings whose content the page does not hold yet
/// and go to `to_append` tagged with the page id; if nothing is left they
/// are dropped. Group order follows `local`.
pub fn reconcile(remote: &[RemoteItem], local: &[SourceGroup]) -> ReconciliationResult {
    // Last write wins on duplicate remote keys.
    let remote_by_key: HashMap<SourceKey, &RemoteItem> =
        remote.iter().map(|item| (item.key(), item)).collect();

    let mut result = ReconciliationResult::default();

    for group in local {
        let Some(remote_item) = remote_by_key.get(&group.key) else {
            result.to_create.push(group.clone());
            continue;
        };

        let (already_remote, new_content): (Vec<&IndexedClipping>, Vec<&IndexedClipping>) = group
            .clippings
            .iter()
            .partition(|c| remote_item.contents.contains(&c.clipping.content));
        result.already_synced += already_remote.len();

        if new_content.is_empty() {
            log::debug!("'{}' is fully synced", group.title);
            continue;
        }

        result.to_append.push(AppendGroup {
            remote_id: remote_item.id.clone(),
            group: group.with_clippings(new_content.into_iter().cloned().collect()),
        });
    }

    result
}

/// Returns the local clippings whose `(title, author, content)` is not
/// already remote, in import order and with their original positions.
///
/// This is the view a user selects from before a sync, so every selectable
/// item is guaranteed to be unsynced.
pub fn filter_unique_clippings(local: &[Clipping], remote: &[RemoteItem]) -> Vec<IndexedClipping> {
    let remote_contents: HashMap<SourceKey, &HashSet<String>> = remote
        .iter()
        .map(|item| (item.key(), &item.contents))
        .collect();

    local
        .iter()
        .enumerate()
        .filter(|(_, clipping)| {
            remote_contents
                .get(&clipping.source_key())
                .map_or(true, |contents| !contents.contains(&clipping.content))
        })
        .map(|(original_index, clipping)| IndexedClipping {
            original_index,
            clipping: clipping.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::group_by_source;
    use crate::types::PageId;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn clip(title: &str, author: &str, content: &str) -> Clipping {
        Clipping::new(title, author, Utc::now(), content)
    }

    fn remote(title: &str, author: &str, contents: &[&str]) -> RemoteItem {
        RemoteItem {
            id: Some(PageId::new_v4()),
            title: title.to_string(),
            author: author.to_string(),
            contents: contents.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn unknown_groups_are_created_whole() {
        let local = group_by_source(&[clip("Dune", "Frank Herbert", "a")]);
        let result = reconcile(&[], &local);
        assert_eq!(result.to_create, local);
        assert!(result.to_append.is_empty());
        assert_eq!(result.already_synced, 0);
    }

    #[test]
    fn keys_match_regardless_of_case() {
        let item = remote("dune", "frank herbert", &["a"]);
        let local = group_by_source(&[
            clip("Dune", "Frank Herbert", "a"),
            clip("Dune", "Frank Herbert", "b"),
        ]);
        let result = reconcile(std::slice::from_ref(&item), &local);

        assert!(result.to_create.is_empty());
        assert_eq!(result.to_append.len(), 1);
        assert_eq!(result.to_append[0].remote_id, item.id);
        assert_eq!(
            result.to_append[0].group.contents().collect::<Vec<_>>(),
            vec!["b"]
        );
        assert_eq!(result.to_append[0].group.original_indices(), vec![1]);
        assert_eq!(result.already_synced, 1);
    }

    #[test]
    fn content_comparison_is_exact() {
        let item = remote("Dune", "Frank Herbert", &["A quote. "]);
        let local = group_by_source(&[clip("Dune", "Frank Herbert", "A quote.")]);
        let result = reconcile(&[item], &local);
        assert_eq!(result.to_append.len(), 1);
        assert_eq!(result.already_synced, 0);
    }

    #[test]
    fn fully_synced_groups_are_dropped() {
        let item = remote("Dune", "Frank Herbert", &["a", "b"]);
        let local = group_by_source(&[
            clip("Dune", "Frank Herbert", "b"),
            clip("Dune", "Frank Herbert", "a"),
        ]);
        let result = reconcile(&[item], &local);
        assert!(result.is_empty());
        assert_eq!(result.already_synced, 2);
    }

    #[test]
    fn every_clipping_lands_in_exactly_one_bucket() {
        let inventory = vec![
            remote("Dune", "Frank Herbert", &["a", "c"]),
            remote("Emma", "Jane Austen", &["e"]),
        ];
        let clippings = vec![
            clip("Dune", "Frank Herbert", "a"),
            clip("Dune", "Frank Herbert", "b"),
            clip("Emma", "Jane Austen", "e"),
            clip("Walden", "Henry Thoreau", "w"),
            clip("Dune", "Frank Herbert", "c"),
            clip("Walden", "Henry Thoreau", "x"),
        ];
        let result = reconcile(&inventory, &group_by_source(&clippings));

        let mut indices: Vec<usize> = result
            .to_create
            .iter()
            .flat_map(SourceGroup::original_indices)
            .chain(result.to_append.iter().flat_map(|a| a.group.original_indices()))
            .collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![1, 3, 5]);
        assert_eq!(result.already_synced, 3);
        assert_eq!(
            result.pending_clippings() + result.already_synced,
            clippings.len()
        );
    }

    #[test]
    fn duplicate_remote_keys_last_write_wins() {
        let first = remote("Dune", "Frank Herbert", &["a"]);
        let second = remote("DUNE", "Frank Herbert", &["b"]);
        let local = group_by_source(&[clip("Dune", "Frank Herbert", "a")]);
        let result = reconcile(&[first, second.clone()], &local);
        assert_eq!(result.to_append[0].remote_id, second.id);
    }

    #[test]
    fn filter_keeps_only_unsynced_clippings_with_positions() {
        let inventory = vec![remote("dune", "frank herbert", &["a"])];
        let clippings = vec![
            clip("Dune", "Frank Herbert", "a"),
            clip("Emma", "Jane Austen", "a"),
            clip("Dune", "Frank Herbert", "a "),
        ];
        let unique = filter_unique_clippings(&clippings, &inventory);
        let positions: Vec<usize> = unique.iter().map(|c| c.original_index).collect();
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(unique[1].clipping.content, "a ");
    }

    #[test]
    fn filter_with_empty_remote_keeps_everything() {
        let clippings = vec![clip("A", "B", "x"), clip("A", "B", "y")];
        assert_eq!(filter_unique_clippings(&clippings, &[]).len(), 2);
        assert!(filter_unique_clippings(&[], &[]).is_empty());
    }
}
