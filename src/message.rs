use crate::core::app::{AppDraft, AppId, AppPatch, AppRecord};
use crate::core::category::{Category, CategoryFilter};
use crate::core::theme::Theme;
use crate::sync::subscription::SubscriptionState;
use crate::sync::{FetchError, WriteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Url,
    Icon,
    Description,
}

/// The remote write an effect performed, echoed back when it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update(AppId),
    Delete(AppId),
    Reorder { dragged: AppId, target: AppId },
}

impl std::fmt::Display for WriteOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteOp::Create => write!(f, "create"),
            WriteOp::Update(id) => write!(f, "update of {}", id),
            WriteOp::Delete(id) => write!(f, "delete of {}", id),
            WriteOp::Reorder { dragged, target } => {
                write!(f, "reorder of {} and {}", dragged, target)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    // Filtering
    SelectCategory(CategoryFilter),
    SearchChanged(String),
    ClearSearch,

    // Add / edit form
    OpenAddForm,
    OpenEditForm(AppId),
    FormInput(FormField, String),
    FormCategory(Category),
    CloseForm,
    SubmitForm,

    // Delete confirmation
    RequestDelete(AppId),
    CancelDelete,
    ConfirmDelete,

    // Drag to reorder
    DragStart(AppId),
    DragEnd,
    Drop(AppId),

    ToggleTheme,
    OpenApp(AppId),

    // Sync
    Refresh,
    RemoteChanged,
    Fetched(Result<Vec<AppRecord>, FetchError>),
    WriteSettled(WriteOp, Result<(), WriteError>),
    SubscriptionChanged(SubscriptionState),
}

/// Work requested by [`Launcher::update`](crate::application::Launcher::update).
/// Executing it is the runtime's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch,
    Create(AppDraft),
    Update(AppId, AppPatch),
    Delete(AppId),
    /// `visible` is the filtered list the drop happened in.
    Reorder {
        visible: Vec<AppRecord>,
        dragged: AppId,
        target: AppId,
    },
    PersistTheme(Theme),
    OpenUrl(String),
}
