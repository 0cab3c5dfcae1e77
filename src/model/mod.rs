//! Record model shared by every stage of a sync run.
//!
//! Local records (`Clipping`, `SourceGroup`) come from the export file,
//! remote records (`RemoteItem`, `RemotePage`, `ContentBlock`) come from the
//! Notion data source, and the outcome types describe what a run decided
//! and did.

mod clipping;
mod outcome;
mod remote;

pub use clipping::{Clipping, IndexedClipping, SourceGroup, SourceKey};
pub use outcome::{AppendGroup, EntityOutcome, ReconciliationResult, WriteAction, WriteStatus};
pub use remote::{ContentBlock, EntityProperties, Inventory, RemoteItem, RemotePage, UnresolvedEntity};
