// src/api/mod.rs
//! Notion API interaction: reading the remote inventory and writing the delta.
//!
//! This module keeps I/O, parsing, and the sync protocol apart: the
//! `NotionRepository` trait is the remote contract, `client` and `parser`
//! implement it over HTTP, and `inventory` and `writer` run the protocol
//! against any implementation.

pub mod client;
pub mod inventory;
pub mod parser;
mod responses;
mod simple_pagination;
pub mod types;
pub mod writer;

use crate::error::AppError;
use crate::model::{ContentBlock, EntityProperties, RemotePage};
use crate::types::{DataSourceId, PageId};

/// The ability to read and extend pages in a Notion data source.
///
/// This is the fundamental algebra for API interaction.
/// The sync protocol depends on this trait, never on HTTP details.
#[async_trait::async_trait]
pub trait NotionRepository: Send + Sync {
    /// One page of the data source's pages, continuing at `cursor`.
    async fn list_entities(
        &self,
        data_source: &DataSourceId,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<PaginatedResponse<RemotePage>, AppError>;

    /// One page of a page's child blocks, continuing at `cursor`.
    async fn list_entity_content(
        &self,
        page: &PageId,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<PaginatedResponse<ContentBlock>, AppError>;

    /// Creates an empty page with the given properties.
    async fn create_entity(
        &self,
        data_source: &DataSourceId,
        properties: &EntityProperties,
    ) -> Result<PageId, AppError>;

    /// Appends blocks to a page. Must accept at least 100 blocks per call.
    async fn append_content(&self, page: &PageId, blocks: &[ContentBlock]) -> Result<(), AppError>;
}

// Re-export the public interface
pub use client::NotionHttpClient;
pub use inventory::InventoryFetcher;
pub use types::{BatchPolicy, PaginatedResponse};
pub use writer::RemoteWriter;
