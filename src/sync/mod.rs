pub mod keyring;
pub mod memory;
pub mod postgrest;
pub mod reconciler;
pub mod subscription;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::app::{AppDraft, AppId, AppPatch, AppRecord};

/// Failure to read the remote table. The cache is kept as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Failure of a create, update, delete or reorder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no app with id {0}")]
    NotFound(AppId),
    #[error("app {0} changed since it was read")]
    Conflict(AppId),
    #[error("app {0} is not in the visible list")]
    NotVisible(AppId),
}

/// Condition attached to an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// No precondition; last write wins.
    Unconditional,
    /// Apply only if the row still has this sort order.
    SortOrderIs(i64),
}

/// Cheap summary of the table, different whenever any row was inserted,
/// updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub rows: u64,
    pub marker: Option<String>,
}

/// A record's position as the client last saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSlot {
    pub id: AppId,
    pub sort_order: i64,
}

/// The remote table of launcher entries.
#[async_trait]
pub trait RemoteTable: Send + Sync {
    /// Every row, ordered by `sort_order` ascending.
    async fn fetch_all(&self) -> Result<Vec<AppRecord>, FetchError>;

    async fn insert(&self, draft: &AppDraft, sort_order: i64) -> Result<(), WriteError>;

    async fn update(
        &self,
        id: AppId,
        patch: &AppPatch,
        condition: WriteCondition,
    ) -> Result<(), WriteError>;

    async fn delete(&self, id: AppId) -> Result<(), WriteError>;

    async fn revision(&self) -> Result<Revision, FetchError>;

    /// Exchange the sort orders of two rows.
    ///
    /// Both writes are conditional on the sort order the caller saw. A failed
    /// second write reverts the first, so a partial swap only survives if the
    /// revert fails too. Stores with transactions can override this.
    async fn swap_sort_orders(&self, a: SortSlot, b: SortSlot) -> Result<(), WriteError> {
        self.update(
            a.id,
            &AppPatch::sort_order(b.sort_order),
            WriteCondition::SortOrderIs(a.sort_order),
        )
        .await?;

        if let Err(e) = self
            .update(
                b.id,
                &AppPatch::sort_order(a.sort_order),
                WriteCondition::SortOrderIs(b.sort_order),
            )
            .await
        {
            log::warn!("Swap of {} and {} failed halfway, reverting: {}", a.id, b.id, e);
            if let Err(revert) = self
                .update(
                    a.id,
                    &AppPatch::sort_order(a.sort_order),
                    WriteCondition::SortOrderIs(b.sort_order),
                )
                .await
            {
                log::error!(
                    "Failed to revert sort order of {}; it may share sort order {} with {}: {}",
                    a.id,
                    b.sort_order,
                    b.id,
                    revert
                );
            }
            return Err(e);
        }

        Ok(())
    }
}

/// Sync status shown next to the grid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Error(String),
    LastSynced(String), // formatted timestamp
}
