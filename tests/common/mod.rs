// tests/common/mod.rs
//! In-memory Notion double and helpers shared by the integration tests.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use clipsync::{
    AppError, BatchPolicy, Clipping, ContentBlock, DataSourceId, EntityProperties, LogLevel,
    NotionErrorCode, NotionRepository, PageId, PaginatedResponse, ProgressSink, RemotePage,
    RetryPolicy, SyncEngine,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const DATA_SOURCE: &str = "0123456789abcdef0123456789abcdef";

pub fn data_source() -> DataSourceId {
    DataSourceId::parse(DATA_SOURCE).unwrap()
}

pub fn clip(title: &str, author: &str, content: &str) -> Clipping {
    Clipping::new(
        title,
        author,
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap(),
        content,
    )
}

pub fn service_error(code: NotionErrorCode, status: u16) -> AppError {
    AppError::NotionService {
        code,
        message: "injected failure".to_string(),
        status: reqwest::StatusCode::from_u16(status).unwrap(),
    }
}

/// Every remote call the double received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListEntities { cursor: Option<String> },
    ListContent { page: PageId, cursor: Option<String> },
    Create { title: String },
    Append { page: PageId, blocks: usize },
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub id: PageId,
    pub title: Option<String>,
    pub author: Option<String>,
    pub blocks: Vec<ContentBlock>,
}

impl FakePage {
    pub fn quotes(&self) -> Vec<String> {
        self.blocks
            .iter()
            .filter_map(|b| b.quote_text().map(str::to_string))
            .collect()
    }
}

#[derive(Default)]
struct State {
    pages: Vec<FakePage>,
    calls: Vec<Call>,
    failing_creates: HashSet<String>,
    failing_appends: HashSet<String>,
    read_started: Vec<(PageId, Instant)>,
    unreadable: HashSet<PageId>,
    listing_down: bool,
}

/// A data source held in memory, with failure injection.
#[derive(Default)]
pub struct FakeNotion {
    state: Mutex<State>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeNotion {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a page with quote blocks for `contents`.
    pub fn add_page(&self, title: &str, author: &str, contents: &[&str]) -> PageId {
        self.add_raw_page(
            Some(title),
            Some(author),
            contents.iter().map(|c| ContentBlock::quote(*c)).collect(),
        )
    }

    pub fn add_raw_page(
        &self,
        title: Option<&str>,
        author: Option<&str>,
        blocks: Vec<ContentBlock>,
    ) -> PageId {
        let id = PageId::new_v4();
        self.state.lock().pages.push(FakePage {
            id: id.clone(),
            title: title.map(str::to_string),
            author: author.map(str::to_string),
            blocks,
        });
        id
    }

    pub fn fail_create_for(&self, title: &str) {
        self.state.lock().failing_creates.insert(title.to_string());
    }

    /// Fails every append to the page titled `title`, including a fresh one.
    pub fn fail_append_for(&self, title: &str) {
        self.state.lock().failing_appends.insert(title.to_string());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failing_creates.clear();
        state.failing_appends.clear();
        state.unreadable.clear();
    }

    pub fn make_unreadable(&self, id: &PageId) {
        self.state.lock().unreadable.insert(id.clone());
    }

    pub fn take_listing_down(&self) {
        self.state.lock().listing_down = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn pages(&self) -> Vec<FakePage> {
        self.state.lock().pages.clone()
    }

    pub fn page(&self, title: &str) -> Option<FakePage> {
        self.state
            .lock()
            .pages
            .iter()
            .find(|p| p.title.as_deref() == Some(title))
            .cloned()
    }

    pub fn creates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create { title } => Some(title),
                _ => None,
            })
            .collect()
    }

    pub fn append_sizes(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Append { blocks, .. } => Some(blocks),
                _ => None,
            })
            .collect()
    }

    pub fn listing_requests(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::ListEntities { .. }))
            .count()
    }

    /// When each content listing started, in start order.
    pub fn content_read_starts(&self) -> Vec<(PageId, Instant)> {
        self.state.lock().read_started.clone()
    }

    /// Most content listings that were ever in flight at once.
    pub fn max_concurrent_reads(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

fn page_of<T: Clone>(items: &[T], page_size: u32, cursor: Option<&str>) -> PaginatedResponse<T> {
    let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
    let end = (start + page_size as usize).min(items.len());
    let results = items[start..end].to_vec();
    if end < items.len() {
        PaginatedResponse::more(results, end.to_string())
    } else {
        PaginatedResponse::last(results)
    }
}

#[async_trait::async_trait]
impl NotionRepository for FakeNotion {
    async fn list_entities(
        &self,
        _data_source: &DataSourceId,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<PaginatedResponse<RemotePage>, AppError> {
        let mut state = self.state.lock();
        state.calls.push(Call::ListEntities {
            cursor: cursor.clone(),
        });
        if state.listing_down {
            return Err(service_error(NotionErrorCode::Unauthorized, 401));
        }
        let pages: Vec<RemotePage> = state
            .pages
            .iter()
            .map(|p| RemotePage {
                id: p.id.clone(),
                title: p.title.clone(),
                author: p.author.clone(),
            })
            .collect();
        Ok(page_of(&pages, page_size, cursor.as_deref()))
    }

    async fn list_entity_content(
        &self,
        page: &PageId,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<PaginatedResponse<ContentBlock>, AppError> {
        self.state
            .lock()
            .read_started
            .push((page.clone(), Instant::now()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Let sibling reads of the same batch start before this one finishes.
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut state = self.state.lock();
        state.calls.push(Call::ListContent {
            page: page.clone(),
            cursor: cursor.clone(),
        });
        if state.unreadable.contains(page) {
            return Err(service_error(NotionErrorCode::ObjectNotFound, 404));
        }
        let blocks = state
            .pages
            .iter()
            .find(|p| &p.id == page)
            .map(|p| p.blocks.clone())
            .unwrap_or_default();
        Ok(page_of(&blocks, page_size, cursor.as_deref()))
    }

    async fn create_entity(
        &self,
        _data_source: &DataSourceId,
        properties: &EntityProperties,
    ) -> Result<PageId, AppError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Create {
            title: properties.title.clone(),
        });
        if state.failing_creates.contains(&properties.title) {
            return Err(service_error(NotionErrorCode::ValidationFailed, 400));
        }
        let id = PageId::new_v4();
        state.pages.push(FakePage {
            id: id.clone(),
            title: Some(properties.title.clone()),
            author: Some(properties.author.clone()),
            blocks: Vec::new(),
        });
        Ok(id)
    }

    async fn append_content(&self, page: &PageId, blocks: &[ContentBlock]) -> Result<(), AppError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Append {
            page: page.clone(),
            blocks: blocks.len(),
        });
        let refused = state.pages.iter().any(|p| {
            &p.id == page
                && p
                    .title
                    .as_ref()
                    .is_some_and(|t| state.failing_appends.contains(t))
        });
        if refused {
            return Err(service_error(NotionErrorCode::ValidationFailed, 400));
        }
        match state.pages.iter_mut().find(|p| &p.id == page) {
            Some(target) => {
                target.blocks.extend_from_slice(blocks);
                Ok(())
            }
            None => Err(service_error(NotionErrorCode::ObjectNotFound, 404)),
        }
    }
}

/// Collects progress lines in memory.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().clone()
    }

    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn mentioning(&self, needle: &str) -> Vec<(LogLevel, String)> {
        self.lines()
            .into_iter()
            .filter(|(_, m)| m.contains(needle))
            .collect()
    }

    pub fn saw(&self, message: &str) -> bool {
        self.lines().iter().any(|(_, m)| m == message)
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, level: LogLevel, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

/// An engine over `repo` with no batch delay and no retries.
pub fn engine(repo: &Arc<FakeNotion>, sink: &Arc<RecordingSink>) -> SyncEngine {
    SyncEngine::new(repo.clone(), data_source())
        .with_sink(sink.clone())
        .with_batches(BatchPolicy::new(5, Duration::ZERO))
        .with_retry(RetryPolicy::none())
}
