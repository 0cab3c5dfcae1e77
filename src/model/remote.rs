use super::SourceKey;
use crate::types::PageId;
use std::collections::HashSet;

/// The remote counterpart of a source item: one page in the data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Present once the page exists remotely.
    pub id: Option<PageId>,
    pub title: String,
    pub author: String,
    /// Every content string already stored on the page.
    pub contents: HashSet<String>,
}

impl RemoteItem {
    pub fn key(&self) -> SourceKey {
        SourceKey::new(&self.title, &self.author)
    }
}

/// A page as returned by the data-source listing, before its content is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePage {
    pub id: PageId,
    /// `None` when the page has no title property at all.
    pub title: Option<String>,
    /// `None` when the page has no `Author` property.
    pub author: Option<String>,
}

/// One child block of a remote page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// A quote block; its text is the concatenated plain text of its segments.
    Quote { text: String },
    /// Any other block type. Not part of the synced content.
    Other { kind: String },
}

impl ContentBlock {
    pub fn quote(text: impl Into<String>) -> Self {
        Self::Quote { text: text.into() }
    }

    pub fn quote_text(&self) -> Option<&str> {
        match self {
            Self::Quote { text } => Some(text),
            Self::Other { .. } => None,
        }
    }
}

/// Properties written when a page is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityProperties {
    pub title: String,
    pub author: String,
}

/// A page whose content could not be read during the inventory fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedEntity {
    pub id: PageId,
    pub key: SourceKey,
    pub title: String,
    pub reason: String,
}

/// Everything known about the remote side after a fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub items: Vec<RemoteItem>,
    pub unresolved: Vec<UnresolvedEntity>,
    /// Pages skipped because they lack required properties.
    pub skipped_inconsistent: usize,
}

impl Inventory {
    /// Keys of pages that exist remotely but whose content is unknown.
    pub fn unresolved_keys(&self) -> HashSet<SourceKey> {
        self.unresolved.iter().map(|u| u.key.clone()).collect()
    }
}
