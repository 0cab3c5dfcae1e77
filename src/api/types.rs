// src/api/types.rs
//! Type definitions for the Notion API module.

use crate::constants::{INVENTORY_BATCH_DELAY, INVENTORY_BATCH_SIZE};
use serde::Deserialize;
use std::time::Duration;

// --- Pagination Types ---

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaginatedResponse<T> {
    pub results: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    /// The final page of a listing.
    pub fn last(results: Vec<T>) -> Self {
        Self {
            results,
            next_cursor: None,
            has_more: false,
        }
    }

    /// A page followed by more, continuing at `cursor`.
    pub fn more(results: Vec<T>, cursor: impl Into<String>) -> Self {
        Self {
            results,
            next_cursor: Some(cursor.into()),
            has_more: true,
        }
    }

    /// Maps every result, keeping the pagination state.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            results: self.results.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }

    /// Converts every result, keeping the pagination state.
    pub fn try_map<U, E>(
        self,
        f: impl FnMut(T) -> Result<U, E>,
    ) -> Result<PaginatedResponse<U>, E> {
        Ok(PaginatedResponse {
            results: self.results.into_iter().map(f).collect::<Result<_, _>>()?,
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        })
    }
}

/// Result of a pagination operation.
#[derive(Debug, Clone)]
pub struct PaginationResult<T> {
    pub items: Vec<T>,
    pub pages_fetched: u32,
}

// --- Admission control ---

/// Static admission control for inventory content resolution.
///
/// At most `batch_size` entities resolve concurrently; `batch_delay` is
/// waited between consecutive batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl BatchPolicy {
    pub fn new(batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self::new(INVENTORY_BATCH_SIZE, INVENTORY_BATCH_DELAY)
    }
}
