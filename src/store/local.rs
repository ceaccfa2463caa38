use super::StoreError;
use super::storage::{APPS_KEY, LocalStorage};
use crate::core::app::{AppDraft, FormError};
use crate::core::category::CategoryFilter;
use crate::view;

/// The local-only launcher: an ordered list mirrored wholesale to storage on
/// every mutation. Position in the list is both identity and display order.
pub struct LocalLauncher {
    storage: LocalStorage,
    apps: Vec<AppDraft>,
}

#[derive(Debug, thiserror::Error)]
pub enum LocalError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Form(#[from] FormError),
}

impl LocalLauncher {
    /// Load the stored list. A missing key starts empty; an unreadable value
    /// is an error so a later save cannot overwrite it.
    pub fn open(storage: LocalStorage) -> Result<Self, StoreError> {
        let apps = match storage.get_item(APPS_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                key: APPS_KEY.to_string(),
                source,
            })?,
            None => Vec::new(),
        };
        Ok(Self { storage, apps })
    }

    pub fn apps(&self) -> &[AppDraft] {
        &self.apps
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Visible entries with their positions in the full list.
    pub fn visible(&self, category: CategoryFilter, query: &str) -> Vec<(usize, &AppDraft)> {
        view::filter_positions(&self.apps, category, query)
            .into_iter()
            .map(|i| (i, &self.apps[i]))
            .collect()
    }

    pub fn add(&mut self, draft: AppDraft) -> Result<usize, LocalError> {
        let draft = draft.validated()?;
        log::info!("Adding local app: {}", draft.name);
        self.apps.push(draft);
        self.save()?;
        Ok(self.apps.len() - 1)
    }

    pub fn edit(&mut self, index: usize, draft: AppDraft) -> Result<(), LocalError> {
        self.check_index(index)?;
        let draft = draft.validated()?;
        log::info!("Updating local app {}: {}", index, draft.name);
        self.apps[index] = draft;
        self.save()?;
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> Result<AppDraft, StoreError> {
        self.check_index(index)?;
        let removed = self.apps.remove(index);
        log::info!("Deleted local app: {}", removed.name);
        self.save()?;
        Ok(removed)
    }

    /// Remove the entry at `from` and insert it at `to`.
    pub fn move_app(&mut self, from: usize, to: usize) -> Result<(), StoreError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let app = self.apps.remove(from);
        self.apps.insert(to, app);
        self.save()
    }

    fn check_index(&self, index: usize) -> Result<(), StoreError> {
        if index < self.apps.len() {
            Ok(())
        } else {
            Err(StoreError::OutOfRange {
                index,
                len: self.apps.len(),
            })
        }
    }

    fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.apps).map_err(|source| StoreError::Serialize {
            key: APPS_KEY.to_string(),
            source,
        })?;
        self.storage.set_item(APPS_KEY, &json)
    }
}
