// src/api/parser.rs
//! Parsing of raw Notion API responses into the record model.
//!
//! Successful bodies are decoded into the wire shapes of `responses` and
//! converted; error bodies are decoded with notion-client's error object,
//! falling back to the HTTP status when the body is not a Notion error.

use super::client::ApiResponse;
use super::responses::{
    plain_text, CreatedPage, NotionError, WireBlock, WirePage, WireProperty,
};
use super::types::PaginatedResponse;
use crate::constants::{AUTHOR_PROPERTY, ERROR_BODY_PREVIEW_LENGTH};
use crate::error::{AppError, NotionClientError, NotionErrorCode};
use crate::model::{ContentBlock, RemotePage};
use crate::types::PageId;
use reqwest::StatusCode;

/// Parse any Notion API response
pub fn parse_api_response<T>(result: ApiResponse<String>) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    if result.status.is_success() {
        parse_body(&result.data, &result.url)
    } else {
        Err(parse_error_body(&result.data, result.status, &result.url))
    }
}

/// Checks a response that carries no body the engine needs.
pub fn ensure_success(result: ApiResponse<String>) -> Result<(), AppError> {
    if result.status.is_success() {
        Ok(())
    } else {
        Err(parse_error_body(&result.data, result.status, &result.url))
    }
}

fn parse_body<T>(body: &str, url: &str) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(body).map_err(|e| {
        log::error!("Failed to parse response from {}: {}", url, e);
        NotionClientError::Deserialization {
            source: e,
            body: preview(body),
        }
        .into()
    })
}

fn parse_error_body(body: &str, status: StatusCode, url: &str) -> AppError {
    if let Ok(notion_error) = serde_json::from_str::<NotionError>(body) {
        return NotionClientError::from(notion_error).into();
    }

    AppError::NotionService {
        code: NotionErrorCode::from_http_status(status.as_u16()),
        message: format!("HTTP {} from {}: {}", status, url, preview(body)),
        status,
    }
}

fn preview(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_PREVIEW_LENGTH) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Parse a page of data-source query results.
pub fn parse_pages_pagination(
    result: ApiResponse<String>,
) -> Result<PaginatedResponse<RemotePage>, AppError> {
    parse_api_response::<PaginatedResponse<WirePage>>(result)?.try_map(convert_page)
}

/// Parse a page of block children.
pub fn parse_blocks_pagination(
    result: ApiResponse<String>,
) -> Result<PaginatedResponse<ContentBlock>, AppError> {
    parse_api_response::<PaginatedResponse<WireBlock>>(result).map(|page| page.map(convert_block))
}

/// Parse the response of a page creation.
pub fn parse_created_page(result: ApiResponse<String>) -> Result<PageId, AppError> {
    let created: CreatedPage = parse_api_response(result)?;
    Ok(PageId::parse(&created.id)?)
}

/// Reads title and author from a listed page.
///
/// The title comes from whichever property has the `title` type (a data
/// source has exactly one); the author from the `Author` text property.
pub fn convert_page(page: WirePage) -> Result<RemotePage, AppError> {
    let id = PageId::parse(&page.id)?;

    let title = page.properties.values().find_map(|prop| match prop {
        WireProperty::Title { title } => Some(plain_text(title)),
        _ => None,
    });

    let author = page.properties.get(AUTHOR_PROPERTY).and_then(|prop| match prop {
        WireProperty::RichText { rich_text } => Some(plain_text(rich_text)),
        WireProperty::Title { title } => Some(plain_text(title)),
        WireProperty::Other => None,
    });

    Ok(RemotePage { id, title, author })
}

/// Classifies a child block; only quotes carry synced content.
pub fn convert_block(block: WireBlock) -> ContentBlock {
    match (block.kind.as_str(), block.quote) {
        ("quote", Some(quote)) => ContentBlock::Quote {
            text: plain_text(&quote.rich_text),
        },
        _ => ContentBlock::Other { kind: block.kind },
    }
}
