// src/api/writer.rs
//! Applies a reconciled delta to the remote data source.
//!
//! Two write paths exist: creating a page (properties first, then its
//! content in chunks) and appending content to an existing page. Neither is
//! deduplicated remotely, so callers pass only content the reconciler has
//! shown to be missing. Within a batch every entity is written on its own:
//! a failure is logged with the entity's title and the batch carries on.

use super::NotionRepository;
use crate::constants::APPEND_CHUNK_SIZE;
use crate::error::{AppError, RemoteCall};
use crate::error_recovery::{retry_with_backoff, RetryPolicy};
use crate::model::{
    AppendGroup, ContentBlock, EntityOutcome, EntityProperties, SourceGroup, WriteAction,
    WriteStatus,
};
use crate::progress::ProgressSink;
use crate::types::{DataSourceId, PageId};

/// Writes source groups to a data source.
pub struct RemoteWriter<'a> {
    client: &'a dyn NotionRepository,
    data_source: &'a DataSourceId,
    sink: &'a dyn ProgressSink,
    retry: RetryPolicy,
}

impl<'a> RemoteWriter<'a> {
    pub fn new(
        client: &'a dyn NotionRepository,
        data_source: &'a DataSourceId,
        sink: &'a dyn ProgressSink,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            data_source,
            sink,
            retry,
        }
    }

    /// Creates a page for `group` and writes all of its content.
    pub async fn create(&self, group: &SourceGroup) -> Result<PageId, AppError> {
        let id = self.create_page(group).await?;
        self.append(&id, &group.title, group.contents()).await?;
        Ok(id)
    }

    /// Appends `contents` to an existing page as quote blocks.
    ///
    /// Content is sent in chunks of `APPEND_CHUNK_SIZE`; returns the number
    /// of blocks written.
    pub async fn append<'c>(
        &self,
        remote_id: &PageId,
        title: &str,
        contents: impl IntoIterator<Item = &'c str>,
    ) -> Result<usize, AppError> {
        let blocks: Vec<ContentBlock> = contents.into_iter().map(ContentBlock::quote).collect();

        for chunk in blocks.chunks(APPEND_CHUNK_SIZE) {
            // Only rate-limit rejections are retried: a timed-out append may
            // already have landed and would be duplicated.
            retry_with_backoff(
                || self.client.append_content(remote_id, chunk),
                self.retry,
                AppError::is_rate_limited,
            )
            .await
            .map_err(|e| write_failed(RemoteCall::AppendContent, title, e))?;
            log::debug!("Appended {} blocks to '{}'", chunk.len(), title);
        }

        Ok(blocks.len())
    }

    /// Creates one page per group. Never fails as a whole.
    pub async fn create_all(&self, groups: &[SourceGroup]) -> Vec<EntityOutcome> {
        if groups.is_empty() {
            self.sink.info("No new items to create.");
            return Vec::new();
        }

        let mut outcomes = Vec::with_capacity(groups.len());
        for group in groups {
            let status = match self.create_page(group).await {
                Err(e) => WriteStatus::Failed {
                    remote_id: None,
                    message: e.to_string(),
                },
                Ok(id) => match self.append(&id, &group.title, group.contents()).await {
                    Ok(blocks) => WriteStatus::Written {
                        remote_id: id,
                        blocks,
                    },
                    Err(e) => WriteStatus::Failed {
                        remote_id: Some(id),
                        message: e.to_string(),
                    },
                },
            };
            outcomes.push(self.report(&group.title, WriteAction::Create, status));
        }
        outcomes
    }

    /// Appends each group's content to its page. Never fails as a whole.
    ///
    /// Groups without a remote page id are skipped with a warning.
    pub async fn append_all(&self, groups: &[AppendGroup]) -> Vec<EntityOutcome> {
        let mut outcomes = Vec::with_capacity(groups.len());
        for append in groups {
            let title = &append.group.title;
            let status = match &append.remote_id {
                None => WriteStatus::Skipped {
                    reason: "no remote page ID".to_string(),
                },
                Some(id) => match self.append(id, title, append.group.contents()).await {
                    Ok(blocks) => WriteStatus::Written {
                        remote_id: id.clone(),
                        blocks,
                    },
                    Err(e) => WriteStatus::Failed {
                        remote_id: Some(id.clone()),
                        message: e.to_string(),
                    },
                },
            };
            outcomes.push(self.report(title, WriteAction::Append, status));
        }

        if !groups.is_empty() {
            let written = outcomes.iter().filter(|o| o.is_success()).count();
            self.sink.info(&format!(
                "Appended clippings to {} of {} existing items.",
                written,
                groups.len()
            ));
        }
        outcomes
    }

    async fn create_page(&self, group: &SourceGroup) -> Result<PageId, AppError> {
        let properties = EntityProperties {
            title: group.title.clone(),
            author: group.author.clone(),
        };
        retry_with_backoff(
            || self.client.create_entity(self.data_source, &properties),
            self.retry,
            AppError::is_rate_limited,
        )
        .await
        .map_err(|e| write_failed(RemoteCall::CreateEntity, &group.title, e))
    }

    fn report(&self, title: &str, action: WriteAction, status: WriteStatus) -> EntityOutcome {
        match &status {
            WriteStatus::Written { blocks, .. } => {
                log::info!("{} '{}': {} blocks", action, title, blocks);
                self.sink.info(&format!(
                    "{} \"{}\" with {} clipping(s).",
                    match action {
                        WriteAction::Create => "Created",
                        WriteAction::Append => "Updated",
                    },
                    title,
                    blocks
                ));
            }
            WriteStatus::Skipped { .. } => {
                self.sink.warn(&format!(
                    "Skipping \"{}\" as it does not have a remote page ID.",
                    title
                ));
            }
            WriteStatus::Failed { message, .. } => {
                log::warn!("{} '{}' failed", action, title);
                self.sink.error(message);
            }
        }
        EntityOutcome {
            title: title.to_string(),
            action,
            status,
        }
    }
}

fn write_failed(call: RemoteCall, title: &str, error: AppError) -> AppError {
    match error {
        already @ AppError::EntityWriteFailed { .. } => already,
        other => AppError::EntityWriteFailed {
            call,
            entity: title.to_string(),
            message: other.to_string(),
        },
    }
}
