// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role. Reading these constants should tell you how the sync
//! engine behaves towards the remote service: how much it asks for per
//! request, how wide it fans out, and how long it waits.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// How many objects the Notion API returns per page of results.
///
/// The Notion API maximum is 100. We use the maximum to minimize
/// round-trips while walking the inventory.
pub const NOTION_API_PAGE_SIZE: u32 = 100;

/// How many content blocks are sent in a single append call.
///
/// Notion rejects append payloads with more than 100 children.
pub const APPEND_CHUNK_SIZE: usize = 100;

/// Maximum characters in a single rich-text text object.
pub const RICH_TEXT_MAX_CHARS: usize = 2000;

/// Name of the page property holding the source author.
pub const AUTHOR_PROPERTY: &str = "Author";

/// Name of the page property holding the source title on creation.
pub const TITLE_PROPERTY: &str = "Title";

// ---------------------------------------------------------------------------
// Admission control
// ---------------------------------------------------------------------------

/// How many entities have their content resolved concurrently.
pub const INVENTORY_BATCH_SIZE: usize = 5;

/// Pause between inventory batches, to stay under Notion's rate limit.
pub const INVENTORY_BATCH_DELAY: Duration = Duration::from_millis(200);

/// Upper bound on a single remote call before it counts as a transient failure.
pub const REMOTE_CALL_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Attempts per remote call, including the first one.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles on each further attempt.
pub const RETRY_INITIAL_DELAY: Duration = Duration::from_millis(250);

/// Ceiling for the backoff delay.
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 500;
