// src/lib.rs
//! clipsync library: reconciles e-reader clippings against a Notion data source
//! and uploads only what is missing.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `RemoteCall`, `ValidationError`
//! - **Configuration**: `SyncConfig`, `CommandLineInput`
//! - **Record model**: `Clipping`, `SourceGroup`, `RemoteItem`, `ReconciliationResult`, etc.
//! - **Pure stages**: `group_by_source`, `reconcile`, `filter_unique_clippings`
//! - **API client**: `NotionRepository`, `NotionHttpClient`, `InventoryFetcher`, `RemoteWriter`
//! - **Orchestration**: `SyncEngine`, `SyncSession`, `ProgressSink`

pub mod aggregate;
pub mod api;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod error_recovery;
pub mod input;
pub mod model;
pub mod progress;
pub mod reconcile;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, NotionClientError, NotionErrorCode, RemoteCall};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, SyncConfig, SyncMode};

// --- Record Model ---
pub use crate::model::{
    AppendGroup, Clipping, ContentBlock, EntityOutcome, EntityProperties, IndexedClipping,
    Inventory, ReconciliationResult, RemoteItem, RemotePage, SourceGroup, SourceKey,
    UnresolvedEntity, WriteAction, WriteStatus,
};

// --- Domain Types ---
pub use crate::types::{ApiKey, DataSourceId, PageId};

// --- Pure Stages ---
pub use crate::aggregate::{group_by, group_by_source, group_indexed};
pub use crate::reconcile::{filter_unique_clippings, reconcile};

// --- API Client ---
pub use crate::api::{
    client::ApiResponse, BatchPolicy, InventoryFetcher,
    NotionHttpClient, NotionRepository, PaginatedResponse, RemoteWriter,
};

// --- Orchestration ---
pub use crate::engine::{
    CompareReport, RunPhase, SyncEngine, SyncOutcome, SyncPlan, SyncSession, WritePhase,
};
pub use crate::error_recovery::RetryPolicy;
pub use crate::input::load_clippings;
pub use crate::progress::{LogLevel, LogSink, ProgressSink};
