// src/api/simple_pagination.rs
//! Cursor pagination driven by async closures.

use super::types::{PaginatedResponse, PaginationResult};
use crate::constants::NOTION_API_PAGE_SIZE;
use crate::error::AppError;

/// Fetches every page of a cursor-paginated listing.
///
/// Requests are issued strictly one after another, each continuing at the
/// previous page's cursor, and no request follows a page that reports no
/// more results. The first failing page fails the whole listing.
pub async fn fetch_all_pages_simple<T, F, Fut>(mut fetch_fn: F) -> Result<PaginationResult<T>, AppError>
where
    F: FnMut(u32, Option<String>) -> Fut,
    Fut: std::future::Future<Output = Result<PaginatedResponse<T>, AppError>>,
{
    let mut all_items = Vec::new();
    let mut cursor = None;
    let mut pages_fetched = 0u32;

    loop {
        let response = fetch_fn(NOTION_API_PAGE_SIZE, cursor).await?;

        pages_fetched += 1;
        all_items.extend(response.results);
        cursor = response.next_cursor;

        if !response.has_more {
            break;
        }
        if cursor.is_none() {
            log::warn!("Listing reported more results without a cursor; stopping");
            break;
        }
    }

    Ok(PaginationResult {
        items: all_items,
        pages_fetched,
    })
}
