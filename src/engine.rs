// src/engine.rs
//! Run orchestration: fetch the remote inventory, reconcile, write the delta.
//!
//! A run moves through `Idle → FetchingInventory → Reconciling →
//! Writing(Creating | Appending) → Done`. Only the inventory fetch can end in
//! `Failed`; once reconciliation starts the run always completes and
//! per-entity failures are reported through the progress sink and the
//! returned outcomes.
//!
//! The `SyncSession` carries the `(title, author) → page id` cache between a
//! compare and a selective sync. It is rebuilt once per fetch and only read
//! while writing.

use crate::aggregate::{group_by_source, group_indexed};
use crate::api::{BatchPolicy, InventoryFetcher, NotionRepository, RemoteWriter};
use crate::error::AppError;
use crate::error_recovery::RetryPolicy;
use crate::model::{
    AppendGroup, Clipping, EntityOutcome, IndexedClipping, Inventory, ReconciliationResult,
    SourceGroup, SourceKey,
};
use crate::progress::{LogSink, ProgressSink};
use crate::reconcile::{filter_unique_clippings, reconcile};
use crate::types::{DataSourceId, PageId, ValidationError};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

// --- Run phases ---

/// Which write path a run is currently on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    Creating,
    Appending,
}

/// Lifecycle of one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    FetchingInventory,
    Reconciling,
    Writing(WritePhase),
    Done,
    Failed,
}

impl RunPhase {
    /// Whether a run may move from `self` to `next`.
    pub fn can_transition_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Idle | Done | Failed, FetchingInventory)
                | (FetchingInventory, Reconciling | Failed)
                // a selective sync reuses the inventory of the last compare
                | (Done, Reconciling)
                | (Reconciling, Writing(_) | Done)
                | (Writing(_), Writing(_) | Done)
        )
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::FetchingInventory => write!(f, "fetching inventory"),
            Self::Reconciling => write!(f, "reconciling"),
            Self::Writing(WritePhase::Creating) => write!(f, "creating"),
            Self::Writing(WritePhase::Appending) => write!(f, "appending"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// --- Session ---

/// Remote identifiers and state remembered across the runs of one session.
#[derive(Debug, Default)]
pub struct SyncSession {
    ids: HashMap<SourceKey, PageId>,
    withheld: HashSet<SourceKey>,
    phase: RunPhase,
    fetched: bool,
    stale: bool,
}

impl SyncSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached page id for a source item, if it exists remotely.
    pub fn remote_id(&self, key: &SourceKey) -> Option<&PageId> {
        self.ids.get(key)
    }

    /// Number of cached page ids.
    pub fn cached_ids(&self) -> usize {
        self.ids.len()
    }

    /// Whether the content of `key`'s page could not be read on the last fetch.
    pub fn is_withheld(&self, key: &SourceKey) -> bool {
        self.withheld.contains(key)
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Fails unless the cache reflects the remote state after the last fetch.
    pub fn ensure_current(&self) -> Result<(), AppError> {
        if !self.fetched {
            return Err(AppError::StaleSession(
                "no inventory has been fetched since the session started or last failed",
            ));
        }
        if self.stale {
            return Err(AppError::StaleSession(
                "remote content changed since the last compare",
            ));
        }
        Ok(())
    }

    /// Forgets the cache after a fetch that did not complete.
    fn discard(&mut self) {
        self.ids.clear();
        self.withheld.clear();
        self.fetched = false;
    }

    fn enter(&mut self, next: RunPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "invalid run transition {} -> {}",
            self.phase,
            next
        );
        log::debug!("Run phase: {} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Replaces the cache with the identifiers of a fresh inventory.
    fn rebuild(&mut self, inventory: &Inventory) {
        self.ids = inventory
            .items
            .iter()
            .filter_map(|item| item.id.clone().map(|id| (item.key(), id)))
            .collect();
        self.withheld = inventory.unresolved_keys();
        self.fetched = true;
        self.stale = false;
        log::debug!(
            "Session cache rebuilt with {} ids ({} withheld)",
            self.ids.len(),
            self.withheld.len()
        );
    }
}

// --- Reports ---

/// Local clippings not yet present remotely, as shown to a user for selection.
#[derive(Debug, Clone, Default)]
pub struct CompareReport {
    /// Unsynced clippings in import order, with their import positions.
    pub unsynced: Vec<IndexedClipping>,
    /// Clippings hidden because their content is already remote.
    pub hidden: usize,
    /// Clippings held back because their page's content could not be read.
    pub withheld: usize,
    /// Number of remote items retrieved.
    pub remote_items: usize,
}

impl CompareReport {
    /// The unsynced clippings grouped by source item.
    pub fn groups(&self) -> Vec<SourceGroup> {
        group_indexed(self.unsynced.iter().cloned())
    }

    /// Picks entries of `unsynced` by their position in that list.
    ///
    /// Positions act as a set: repeats collapse and the picked clippings
    /// come back in import order whatever order they were given in.
    pub fn select(&self, positions: &[usize]) -> Result<Vec<IndexedClipping>, ValidationError> {
        let wanted: BTreeSet<usize> = positions.iter().copied().collect();
        if let Some(&index) = wanted.range(self.unsynced.len()..).next() {
            return Err(ValidationError::InvalidSelection {
                index,
                available: self.unsynced.len(),
            });
        }
        Ok(self
            .unsynced
            .iter()
            .enumerate()
            .filter(|(at, _)| wanted.contains(at))
            .map(|(_, clipping)| clipping.clone())
            .collect())
    }
}

/// The reconciled delta of a run, before anything is written.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub reconciliation: ReconciliationResult,
    /// Local groups matching a page whose content could not be read.
    pub withheld: Vec<SourceGroup>,
    pub remote_items: usize,
}

/// What a completed run decided and did.
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    pub plan: SyncPlan,
    /// One entry per entity the writer attempted or skipped, creates first.
    pub outcomes: Vec<EntityOutcome>,
}

impl SyncOutcome {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntityOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }
}

// --- Engine ---

/// Drives compare, plan and sync runs against one data source.
pub struct SyncEngine {
    client: Arc<dyn NotionRepository>,
    data_source: DataSourceId,
    sink: Arc<dyn ProgressSink>,
    batches: BatchPolicy,
    retry: RetryPolicy,
}

impl SyncEngine {
    pub fn new(client: Arc<dyn NotionRepository>, data_source: DataSourceId) -> Self {
        Self {
            client,
            data_source,
            sink: Arc::new(LogSink),
            batches: BatchPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_batches(mut self, batches: BatchPolicy) -> Self {
        self.batches = batches;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetches the inventory and filters `local` down to unsynced clippings.
    pub async fn compare(
        &self,
        session: &mut SyncSession,
        local: &[Clipping],
    ) -> Result<CompareReport, AppError> {
        let inventory = self.fetch_inventory(session).await?;
        session.enter(RunPhase::Reconciling);

        let mut withheld = 0;
        let unsynced: Vec<IndexedClipping> = filter_unique_clippings(local, &inventory.items)
            .into_iter()
            .filter(|c| {
                let held = session.is_withheld(&c.clipping.source_key());
                withheld += usize::from(held);
                !held
            })
            .collect();

        let hidden = local.len() - unsynced.len() - withheld;
        self.sink.info(&format!(
            "Hidden {} existing clippings. Showing {} new/unsynced items.",
            hidden,
            unsynced.len()
        ));
        if withheld > 0 {
            self.sink.warn(&format!(
                "Held back {} clippings whose items could not be read from Notion.",
                withheld
            ));
        }
        session.enter(RunPhase::Done);

        Ok(CompareReport {
            unsynced,
            hidden,
            withheld,
            remote_items: inventory.items.len(),
        })
    }

    /// Uploads a chosen subset of unsynced clippings.
    ///
    /// Groups route through the session cache: a cached page id means
    /// append, no id means create. The session must be current, i.e. a
    /// compare ran and nothing was written since.
    pub async fn sync_selected(
        &self,
        session: &mut SyncSession,
        selected: &[IndexedClipping],
    ) -> Result<Vec<EntityOutcome>, AppError> {
        if selected.is_empty() {
            self.sink.info("No items selected");
            return Ok(Vec::new());
        }
        session.ensure_current()?;
        session.enter(RunPhase::Reconciling);

        // Each import position is written at most once, in import order.
        let mut selected = selected.to_vec();
        selected.sort_by_key(|c| c.original_index);
        selected.dedup_by_key(|c| c.original_index);

        let mut to_create = Vec::new();
        let mut to_append = Vec::new();
        for group in group_indexed(selected) {
            if session.is_withheld(&group.key) {
                self.sink
                    .warn(&format!("Holding back \"{}\": its content could not be read.", group.title));
            } else if let Some(id) = session.remote_id(&group.key) {
                to_append.push(AppendGroup {
                    remote_id: Some(id.clone()),
                    group,
                });
            } else {
                to_create.push(group);
            }
        }

        let outcomes = self.write(session, &to_create, &to_append).await;
        session.stale = true;
        session.enter(RunPhase::Done);
        Ok(outcomes)
    }

    /// Fetches and reconciles without writing.
    pub async fn plan(
        &self,
        session: &mut SyncSession,
        local: &[Clipping],
    ) -> Result<SyncPlan, AppError> {
        let plan = self.prepare(session, local).await?;
        session.enter(RunPhase::Done);
        Ok(plan)
    }

    /// Runs a full sync: fetch, reconcile, then create and append.
    ///
    /// Fails only when the inventory cannot be fetched.
    pub async fn run(
        &self,
        session: &mut SyncSession,
        local: &[Clipping],
    ) -> Result<SyncOutcome, AppError> {
        let plan = self.prepare(session, local).await?;
        let outcomes = self
            .write(session, &plan.reconciliation.to_create, &plan.reconciliation.to_append)
            .await;
        session.stale = true;
        session.enter(RunPhase::Done);

        let outcome = SyncOutcome { plan, outcomes };
        self.sink.info(&format!(
            "Sync complete: {} items written, {} failed.",
            outcome.succeeded(),
            outcome.failed()
        ));
        Ok(outcome)
    }

    async fn prepare(
        &self,
        session: &mut SyncSession,
        local: &[Clipping],
    ) -> Result<SyncPlan, AppError> {
        let inventory = self.fetch_inventory(session).await?;
        session.enter(RunPhase::Reconciling);

        let (withheld, eligible): (Vec<SourceGroup>, Vec<SourceGroup>) = group_by_source(local)
            .into_iter()
            .partition(|group| session.is_withheld(&group.key));
        for group in &withheld {
            self.sink.warn(&format!(
                "Holding back \"{}\": its content could not be read from Notion.",
                group.title
            ));
        }

        let reconciliation = reconcile(&inventory.items, &eligible);
        self.sink.info(&format!(
            "{} new items, {} items with new clippings, {} clippings already synced.",
            reconciliation.to_create.len(),
            reconciliation.to_append.len(),
            reconciliation.already_synced
        ));

        Ok(SyncPlan {
            reconciliation,
            withheld,
            remote_items: inventory.items.len(),
        })
    }

    async fn fetch_inventory(&self, session: &mut SyncSession) -> Result<Inventory, AppError> {
        session.enter(RunPhase::FetchingInventory);
        self.sink.info("Fetching existing items from Notion...");

        let fetcher = InventoryFetcher::new(Arc::clone(&self.client), self.batches, self.retry);
        let inventory = match fetcher.fetch_all(&self.data_source).await {
            Ok(inventory) => inventory,
            Err(e) => {
                session.discard();
                session.enter(RunPhase::Failed);
                self.sink.error(&format!("Sync failed: {}", e));
                return Err(e);
            }
        };

        session.rebuild(&inventory);
        self.sink
            .info(&format!("Retrieved {} items", inventory.items.len()));
        if inventory.skipped_inconsistent > 0 {
            self.sink.warn(&format!(
                "Skipped {} Notion pages without a title.",
                inventory.skipped_inconsistent
            ));
        }
        Ok(inventory)
    }

    async fn write(
        &self,
        session: &mut SyncSession,
        to_create: &[SourceGroup],
        to_append: &[AppendGroup],
    ) -> Vec<EntityOutcome> {
        let writer = RemoteWriter::new(
            self.client.as_ref(),
            &self.data_source,
            self.sink.as_ref(),
            self.retry,
        );

        session.enter(RunPhase::Writing(WritePhase::Creating));
        let mut outcomes = writer.create_all(to_create).await;
        session.enter(RunPhase::Writing(WritePhase::Appending));
        outcomes.extend(writer.append_all(to_append).await);
        outcomes
    }
}
