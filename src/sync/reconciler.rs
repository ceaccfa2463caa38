use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{FetchError, RemoteTable, SortSlot, WriteCondition, WriteError};
use crate::core::app::{AppDraft, AppId, AppPatch, AppRecord};

struct Cache {
    records: Vec<AppRecord>,
    // Ticket of the fetch whose result is in `records`; 0 before the first fetch.
    applied: u64,
}

/// Read cache over a remote table. Writes go to the remote only; the cache
/// changes solely by replacing it with a complete fetch.
pub struct Reconciler<R> {
    remote: Arc<R>,
    cache: Mutex<Cache>,
    next_ticket: AtomicU64,
}

impl<R: RemoteTable> Reconciler<R> {
    pub fn new(remote: Arc<R>) -> Self {
        Self {
            remote,
            cache: Mutex::new(Cache {
                records: Vec::new(),
                applied: 0,
            }),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the cache, ordered by sort order.
    pub fn cached(&self) -> Vec<AppRecord> {
        self.lock().records.clone()
    }

    pub fn has_fetched(&self) -> bool {
        self.lock().applied > 0
    }

    /// Replace the cache with the full remote table.
    ///
    /// On failure the previous cache stays in place. A fetch that completes
    /// after a later-issued one has been applied is discarded and the newer
    /// cache is returned instead.
    pub async fn fetch_all(&self) -> Result<Vec<AppRecord>, FetchError> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let mut records = self.remote.fetch_all().await?;
        // Stable: equal sort orders keep the order the store returned.
        records.sort_by_key(|r| r.sort_order);

        let mut cache = self.lock();
        if ticket < cache.applied {
            log::debug!(
                "Discarding fetch #{} (cache already at #{})",
                ticket,
                cache.applied
            );
            return Ok(cache.records.clone());
        }
        log::debug!("Applied fetch #{}: {} apps", ticket, records.len());
        cache.records = records;
        cache.applied = ticket;
        Ok(cache.records.clone())
    }

    /// Sort order for a new entry: one past the current maximum, or 0.
    pub fn next_sort_order(&self) -> i64 {
        self.lock()
            .records
            .iter()
            .map(|r| r.sort_order)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Insert `draft` after every existing entry. Fetches first if the cache
    /// has never been filled, so the sort order is not guessed from nothing.
    pub async fn create(&self, draft: &AppDraft) -> Result<(), WriteError> {
        if !self.has_fetched() {
            self.fetch_all().await.map_err(|e| match e {
                FetchError::Status { status, body } => WriteError::Status { status, body },
                other => WriteError::Transport(other.to_string()),
            })?;
        }
        let sort_order = self.next_sort_order();
        log::info!("Creating app {} at sort order {}", draft.name, sort_order);
        self.remote.insert(draft, sort_order).await
    }

    pub async fn update(&self, id: AppId, patch: &AppPatch) -> Result<(), WriteError> {
        log::info!("Updating app {}", id);
        self.remote
            .update(id, patch, WriteCondition::Unconditional)
            .await
    }

    pub async fn delete(&self, id: AppId) -> Result<(), WriteError> {
        log::info!("Deleting app {}", id);
        self.remote.delete(id).await
    }

    /// Swap the sort orders of the dragged and target records as they appear
    /// in `visible`, the currently filtered list.
    pub async fn reorder(
        &self,
        visible: &[AppRecord],
        dragged: AppId,
        target: AppId,
    ) -> Result<(), WriteError> {
        if dragged == target {
            return Ok(());
        }
        let slot = |id: AppId| {
            visible
                .iter()
                .find(|r| r.id == id)
                .map(|r| SortSlot {
                    id,
                    sort_order: r.sort_order,
                })
                .ok_or(WriteError::NotVisible(id))
        };
        let a = slot(dragged)?;
        let b = slot(target)?;
        log::info!(
            "Reordering {} ({}) <-> {} ({})",
            a.id,
            a.sort_order,
            b.id,
            b.sort_order
        );
        self.remote.swap_sort_orders(a, b).await
    }
}
