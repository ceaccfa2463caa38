//! In-process remote table with failure injection.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{FetchError, RemoteTable, Revision, WriteCondition, WriteError};
use crate::core::app::{AppDraft, AppId, AppPatch, AppRecord};

#[derive(Default)]
struct TableState {
    rows: Vec<AppRecord>,
    revision: u64,
    fail_fetches: bool,
    // Outcome of upcoming writes, front first: true succeeds, false fails.
    write_script: VecDeque<bool>,
}

#[derive(Default)]
pub struct InMemoryTable {
    state: Mutex<TableState>,
}

impl InMemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<AppRecord>) -> Self {
        let table = Self::new();
        table.lock().rows = rows;
        table
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rows in storage (arrival) order.
    pub fn rows(&self) -> Vec<AppRecord> {
        self.lock().rows.clone()
    }

    pub fn set_fail_fetches(&self, fail: bool) {
        self.lock().fail_fetches = fail;
    }

    /// Queue outcomes for the next writes; unscripted writes succeed.
    pub fn script_writes(&self, outcomes: impl IntoIterator<Item = bool>) {
        self.lock().write_script.extend(outcomes);
    }

    fn take_write_outcome(state: &mut TableState) -> Result<(), WriteError> {
        match state.write_script.pop_front() {
            Some(false) => Err(WriteError::Transport("injected write failure".into())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteTable for InMemoryTable {
    async fn fetch_all(&self) -> Result<Vec<AppRecord>, FetchError> {
        let state = self.lock();
        if state.fail_fetches {
            return Err(FetchError::Transport("injected fetch failure".into()));
        }
        let mut rows = state.rows.clone();
        rows.sort_by_key(|r| r.sort_order);
        Ok(rows)
    }

    async fn insert(&self, draft: &AppDraft, sort_order: i64) -> Result<(), WriteError> {
        let mut state = self.lock();
        Self::take_write_outcome(&mut state)?;
        state.rows.push(AppRecord {
            id: AppId::new(),
            name: draft.name.clone(),
            url: draft.url.clone(),
            icon: draft.icon.clone(),
            description: draft.description.clone(),
            category: draft.category,
            sort_order,
            updated_at: Some(Utc::now()),
        });
        state.revision += 1;
        Ok(())
    }

    async fn update(
        &self,
        id: AppId,
        patch: &AppPatch,
        condition: WriteCondition,
    ) -> Result<(), WriteError> {
        let mut state = self.lock();
        Self::take_write_outcome(&mut state)?;
        let row = state
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(WriteError::NotFound(id))?;
        if let WriteCondition::SortOrderIs(expected) = condition {
            if row.sort_order != expected {
                return Err(WriteError::Conflict(id));
            }
        }
        patch.apply_to(row);
        row.updated_at = Some(Utc::now());
        state.revision += 1;
        Ok(())
    }

    async fn delete(&self, id: AppId) -> Result<(), WriteError> {
        let mut state = self.lock();
        Self::take_write_outcome(&mut state)?;
        let before = state.rows.len();
        state.rows.retain(|r| r.id != id);
        if state.rows.len() == before {
            return Err(WriteError::NotFound(id));
        }
        state.revision += 1;
        Ok(())
    }

    async fn revision(&self) -> Result<Revision, FetchError> {
        let state = self.lock();
        if state.fail_fetches {
            return Err(FetchError::Transport("injected fetch failure".into()));
        }
        Ok(Revision {
            rows: state.rows.len() as u64,
            marker: Some(state.revision.to_string()),
        })
    }
}
