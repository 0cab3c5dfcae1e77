// src/api/inventory.rs
//! Retrieval of the complete remote inventory.
//!
//! The data source is listed page by page; then every listed page has its
//! own children paginated to completion. Content resolution runs in fixed
//! batches: entities inside a batch resolve concurrently, and a fixed delay
//! separates consecutive batches.

use super::simple_pagination::fetch_all_pages_simple;
use super::types::BatchPolicy;
use super::NotionRepository;
use crate::error::{AppError, RemoteCall};
use crate::error_recovery::{retry_with_backoff, RetryPolicy};
use crate::model::{Inventory, RemoteItem, RemotePage, SourceKey, UnresolvedEntity};
use crate::types::{DataSourceId, PageId};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;

/// Fetches every page of a data source together with its quote content.
pub struct InventoryFetcher {
    client: Arc<dyn NotionRepository>,
    batches: BatchPolicy,
    retry: RetryPolicy,
}

/// A listed page that passed adaptation and awaits its content.
struct PendingEntity {
    id: PageId,
    title: String,
    author: String,
}

impl InventoryFetcher {
    pub fn new(client: Arc<dyn NotionRepository>, batches: BatchPolicy, retry: RetryPolicy) -> Self {
        Self {
            client,
            batches,
            retry,
        }
    }

    /// Fetches the full inventory of `data_source`.
    ///
    /// Fails with `RemoteUnavailable` only when the listing itself fails.
    /// An entity whose content cannot be read is reported in
    /// `Inventory::unresolved`; one without a title is skipped as an
    /// inconsistent record.
    pub async fn fetch_all(&self, data_source: &DataSourceId) -> Result<Inventory, AppError> {
        let pages = self
            .list_pages(data_source)
            .await
            .map_err(|e| AppError::remote_unavailable(RemoteCall::ListEntities, e))?;
        log::info!("Listed {} pages in data source {}", pages.len(), data_source);

        let mut inventory = Inventory::default();
        let mut pending = Vec::with_capacity(pages.len());
        for page in pages {
            match adapt_page(page) {
                Ok(entity) => pending.push(entity),
                Err(e) => {
                    log::warn!("Skipping remote page: {}", e);
                    inventory.skipped_inconsistent += 1;
                }
            }
        }

        for (batch_index, batch) in pending.chunks(self.batches.batch_size).enumerate() {
            if batch_index > 0 && !self.batches.batch_delay.is_zero() {
                tokio::time::sleep(self.batches.batch_delay).await;
            }
            log::debug!(
                "Resolving content batch {} ({} pages)",
                batch_index + 1,
                batch.len()
            );

            let resolved = join_all(batch.iter().map(|entity| self.resolve_contents(&entity.id))).await;

            for (entity, contents) in batch.iter().zip(resolved) {
                match contents {
                    Ok(contents) => inventory.items.push(RemoteItem {
                        id: Some(entity.id.clone()),
                        title: entity.title.clone(),
                        author: entity.author.clone(),
                        contents,
                    }),
                    Err(e) => {
                        log::warn!("Could not read content of '{}': {}", entity.title, e);
                        inventory.unresolved.push(UnresolvedEntity {
                            id: entity.id.clone(),
                            key: SourceKey::new(&entity.title, &entity.author),
                            title: entity.title.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok(inventory)
    }

    /// Lists every page of the data source, in remote order.
    async fn list_pages(&self, data_source: &DataSourceId) -> Result<Vec<RemotePage>, AppError> {
        let retry = self.retry;
        let result = fetch_all_pages_simple(|page_size, cursor| {
            let client = Arc::clone(&self.client);
            let data_source = data_source.clone();
            async move {
                retry_with_backoff(
                    || client.list_entities(&data_source, page_size, cursor.clone()),
                    retry,
                    AppError::is_transient,
                )
                .await
            }
        })
        .await?;
        log::debug!("Data source listing took {} pages", result.pages_fetched);
        Ok(result.items)
    }

    /// Reads all quote content of one page, in remote order.
    async fn resolve_contents(&self, page: &PageId) -> Result<HashSet<String>, AppError> {
        let retry = self.retry;
        let result = fetch_all_pages_simple(|page_size, cursor| {
            let client = Arc::clone(&self.client);
            let page = page.clone();
            async move {
                retry_with_backoff(
                    || client.list_entity_content(&page, page_size, cursor.clone()),
                    retry,
                    AppError::is_transient,
                )
                .await
            }
        })
        .await?;

        Ok(result
            .items
            .iter()
            .filter_map(|block| block.quote_text())
            .map(str::to_string)
            .collect())
    }
}

/// Checks a listed page for the properties the engine needs.
fn adapt_page(page: RemotePage) -> Result<PendingEntity, AppError> {
    let Some(title) = page.title else {
        return Err(AppError::InconsistentRemoteRecord {
            entity: page.id.to_string(),
            reason: "page has no title property".to_string(),
        });
    };
    Ok(PendingEntity {
        id: page.id,
        title,
        author: page.author.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_without_title_are_inconsistent() {
        let page = RemotePage {
            id: PageId::new_v4(),
            title: None,
            author: Some("Anon".into()),
        };
        assert!(matches!(
            adapt_page(page),
            Err(AppError::InconsistentRemoteRecord { .. })
        ));
    }

    #[test]
    fn missing_author_reads_as_empty() {
        let page = RemotePage {
            id: PageId::new_v4(),
            title: Some("Dune".into()),
            author: None,
        };
        let entity = adapt_page(page).unwrap();
        assert_eq!(entity.author, "");
    }
}
