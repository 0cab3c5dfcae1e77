use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One highlighted note, as produced by the export parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clipping {
    pub source_title: String,
    pub source_author: String,
    pub captured_at: DateTime<Utc>,
    pub content: String,
}

impl Clipping {
    pub fn new(
        source_title: impl Into<String>,
        source_author: impl Into<String>,
        captured_at: DateTime<Utc>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            source_title: source_title.into(),
            source_author: source_author.into(),
            captured_at,
            content: content.into(),
        }
    }

    /// The grouping key of the source item this clipping belongs to.
    pub fn source_key(&self) -> SourceKey {
        SourceKey::new(&self.source_title, &self.source_author)
    }
}

/// Case-insensitive identity of a source item: lower-cased title and author.
///
/// Empty strings are legal and form an ordinary, if degenerate, key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey {
    title: String,
    author: String,
}

impl SourceKey {
    pub fn new(title: &str, author: &str) -> Self {
        Self {
            title: title.to_lowercase(),
            author: author.to_lowercase(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.title, self.author)
    }
}

/// A clipping together with its position in the original import.
///
/// Positions, not object identity, are how callers refer back to records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedClipping {
    pub original_index: usize,
    pub clipping: Clipping,
}

/// Clippings sharing one `SourceKey`, in import order.
///
/// `title` and `author` keep the spelling of the first clipping seen for the
/// key; that spelling is what a newly created page is titled with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceGroup {
    pub key: SourceKey,
    pub title: String,
    pub author: String,
    pub clippings: Vec<IndexedClipping>,
}

impl SourceGroup {
    /// Starts a group from its first member.
    pub fn seeded_by(key: SourceKey, first: &Clipping) -> Self {
        Self {
            key,
            title: first.source_title.clone(),
            author: first.source_author.clone(),
            clippings: Vec::new(),
        }
    }

    /// The same source item with a different set of members.
    pub fn with_clippings(&self, clippings: Vec<IndexedClipping>) -> Self {
        Self {
            key: self.key.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            clippings,
        }
    }

    pub fn len(&self) -> usize {
        self.clippings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clippings.is_empty()
    }

    /// The content strings of the group, in order.
    pub fn contents(&self) -> impl Iterator<Item = &str> {
        self.clippings.iter().map(|c| c.clipping.content.as_str())
    }

    /// Original import positions of every member.
    pub fn original_indices(&self) -> Vec<usize> {
        self.clippings.iter().map(|c| c.original_index).collect()
    }
}
