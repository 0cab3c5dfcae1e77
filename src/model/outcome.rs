use super::SourceGroup;
use crate::types::PageId;
use std::fmt;

/// A group whose page already exists, carrying only the content not yet on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendGroup {
    /// The page to append to. A group without one is skipped by the writer.
    pub remote_id: Option<PageId>,
    pub group: SourceGroup,
}

/// The delta between local groups and the remote inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Groups with no remote counterpart, unchanged.
    pub to_create: Vec<SourceGroup>,
    /// Groups with a remote counterpart and at least one new content string.
    pub to_append: Vec<AppendGroup>,
    /// Local clippings dropped because their content is already remote.
    pub already_synced: usize,
}

impl ReconciliationResult {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_append.is_empty()
    }

    /// Clippings that would be uploaded if this result were written.
    pub fn pending_clippings(&self) -> usize {
        self.to_create.iter().map(SourceGroup::len).sum::<usize>()
            + self.to_append.iter().map(|a| a.group.len()).sum::<usize>()
    }
}

/// Which write path an entity went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Create,
    Append,
}

impl fmt::Display for WriteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Append => write!(f, "append"),
        }
    }
}

/// How one entity's write ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatus {
    /// All content written; `blocks` counts the quote blocks sent.
    Written { remote_id: PageId, blocks: usize },
    /// Not attempted because the group had no remote page id.
    Skipped { reason: String },
    /// The write failed; `remote_id` is set if the page was created first.
    Failed {
        remote_id: Option<PageId>,
        message: String,
    },
}

/// The tagged per-entity result of a write batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityOutcome {
    pub title: String,
    pub action: WriteAction,
    pub status: WriteStatus,
}

impl EntityOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, WriteStatus::Written { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, WriteStatus::Failed { .. })
    }
}
