use crate::core::app::{AppDraft, AppId, AppPatch, AppRecord, FormError};
use crate::core::category::{Category, CategoryFilter};
use crate::core::theme::Theme;
use crate::message::{Effect, FormField, Message, WriteOp};
use crate::sync::subscription::SubscriptionState;
use crate::sync::{SyncStatus, WriteError};
use crate::view::{self, EmptyState};

/// The add/edit form. `editing` is `None` when adding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppForm {
    editing: Option<AppId>,
    pub name: String,
    pub url: String,
    pub icon: String,
    pub description: String,
    pub category: Option<Category>,
    pub error: Option<FormError>,
}

impl AppForm {
    pub fn add() -> Self {
        Self::default()
    }

    pub fn edit(record: &AppRecord) -> Self {
        Self {
            editing: Some(record.id),
            name: record.name.clone(),
            url: record.url.clone(),
            icon: record.icon.clone(),
            description: record.description.clone(),
            category: Some(record.category),
            error: None,
        }
    }

    pub fn editing(&self) -> Option<AppId> {
        self.editing
    }

    pub fn title(&self) -> &'static str {
        if self.editing.is_some() {
            "Edit App"
        } else {
            "Add New App"
        }
    }

    pub fn subtitle(&self) -> &'static str {
        if self.editing.is_some() {
            "Update your app's information below."
        } else {
            "Fill in the details below to add a new app."
        }
    }

    pub fn submit_label(&self) -> &'static str {
        if self.editing.is_some() {
            "Update App"
        } else {
            "Add App"
        }
    }

    pub fn set(&mut self, field: FormField, value: String) {
        match field {
            FormField::Name => self.name = value,
            FormField::Url => self.url = value,
            FormField::Icon => self.icon = value,
            FormField::Description => self.description = value,
        }
    }

    pub fn to_draft(&self) -> Result<AppDraft, FormError> {
        let category = self.category.ok_or(FormError::MissingCategory)?;
        AppDraft {
            name: self.name.clone(),
            url: self.url.clone(),
            icon: self.icon.clone(),
            description: self.description.clone(),
            category,
        }
        .validated()
    }
}

/// Everything a view needs to draw one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub theme: Theme,
    pub category: CategoryFilter,
    pub query: String,
    pub visible: Vec<AppRecord>,
    /// The category strip with live counts, `All` first.
    pub counts: Vec<(CategoryFilter, usize)>,
    pub empty: Option<EmptyState>,
    pub form: Option<AppForm>,
    /// Id and name of the entry awaiting delete confirmation.
    pub pending_delete: Option<(AppId, String)>,
    pub dragging: Option<AppId>,
    pub sync_status: SyncStatus,
    pub subscription: SubscriptionState,
    pub loaded: bool,
}

/// Launcher state. All transitions go through [`Launcher::update`].
#[derive(Debug, Default)]
pub struct Launcher {
    apps: Vec<AppRecord>,
    loaded: bool,
    category: CategoryFilter,
    query: String,
    form: Option<AppForm>,
    pending_delete: Option<AppId>,
    dragging: Option<AppId>,
    theme: Theme,
    sync_status: SyncStatus,
    subscription: SubscriptionState,
    // Cleared when the next write is issued.
    last_write_error: Option<(WriteOp, WriteError)>,
    // Remote effects issued and not yet settled.
    in_flight: usize,
}

impl Launcher {
    pub fn init(theme: Theme) -> (Self, Vec<Effect>) {
        let mut launcher = Self {
            theme,
            ..Self::default()
        };
        launcher.begin_remote();
        (launcher, vec![Effect::Fetch])
    }

    pub fn apps(&self) -> &[AppRecord] {
        &self.apps
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn form(&self) -> Option<&AppForm> {
        self.form.as_ref()
    }

    pub fn sync_status(&self) -> &SyncStatus {
        &self.sync_status
    }

    pub fn subscription(&self) -> SubscriptionState {
        self.subscription
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The most recent failed write, until another write is issued.
    pub fn last_write_error(&self) -> Option<&(WriteOp, WriteError)> {
        self.last_write_error.as_ref()
    }

    /// No fetch or write is outstanding.
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }

    pub fn visible(&self) -> Vec<&AppRecord> {
        view::filter(&self.apps, self.category, &self.query)
    }

    pub fn counts(&self) -> Vec<(CategoryFilter, usize)> {
        let counts = view::category_counts(&self.apps);
        CategoryFilter::strip()
            .into_iter()
            .map(|f| (f, view::count_for(&counts, self.apps.len(), f)))
            .collect()
    }

    pub fn empty_state(&self) -> Option<EmptyState> {
        view::empty_state(self.visible().len(), &self.query)
    }

    pub fn pending_delete(&self) -> Option<(AppId, &str)> {
        let id = self.pending_delete?;
        self.find(id).map(|r| (id, r.name.as_str()))
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            theme: self.theme,
            category: self.category,
            query: self.query.clone(),
            visible: self.visible().into_iter().cloned().collect(),
            counts: self.counts(),
            empty: self.empty_state(),
            form: self.form.clone(),
            pending_delete: self.pending_delete().map(|(id, name)| (id, name.to_string())),
            dragging: self.dragging,
            sync_status: self.sync_status.clone(),
            subscription: self.subscription,
            loaded: self.loaded,
        }
    }

    fn find(&self, id: AppId) -> Option<&AppRecord> {
        self.apps.iter().find(|r| r.id == id)
    }

    fn begin_remote(&mut self) {
        self.in_flight += 1;
        self.sync_status = SyncStatus::Syncing;
    }

    fn end_remote(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    fn remote(&mut self, effect: Effect) -> Vec<Effect> {
        self.begin_remote();
        vec![effect]
    }

    fn write(&mut self, effect: Effect) -> Vec<Effect> {
        self.last_write_error = None;
        self.remote(effect)
    }

    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        match message {
            Message::SelectCategory(filter) => {
                self.category = filter;
            }
            Message::SearchChanged(query) => {
                self.query = query;
            }
            Message::ClearSearch => {
                self.query.clear();
            }

            Message::OpenAddForm => {
                self.form = Some(AppForm::add());
            }
            Message::OpenEditForm(id) => match self.find(id) {
                Some(record) => self.form = Some(AppForm::edit(record)),
                None => log::warn!("Cannot edit {}: not in the current list", id),
            },
            Message::FormInput(field, value) => {
                if let Some(ref mut form) = self.form {
                    form.set(field, value);
                }
            }
            Message::FormCategory(category) => {
                if let Some(ref mut form) = self.form {
                    form.category = Some(category);
                }
            }
            Message::CloseForm => {
                self.form = None;
            }
            Message::SubmitForm => {
                let Some(mut form) = self.form.take() else {
                    return Vec::new();
                };
                match form.to_draft() {
                    Ok(draft) => {
                        let effect = match form.editing() {
                            Some(id) => Effect::Update(id, AppPatch::from(draft)),
                            None => Effect::Create(draft),
                        };
                        return self.write(effect);
                    }
                    Err(e) => {
                        log::warn!("Form not submitted: {}", e);
                        form.error = Some(e);
                        self.form = Some(form);
                    }
                }
            }

            Message::RequestDelete(id) => {
                if self.find(id).is_some() {
                    self.pending_delete = Some(id);
                } else {
                    log::warn!("Cannot delete {}: not in the current list", id);
                }
            }
            Message::CancelDelete => {
                self.pending_delete = None;
            }
            Message::ConfirmDelete => {
                if let Some(id) = self.pending_delete.take() {
                    return self.write(Effect::Delete(id));
                }
            }

            Message::DragStart(id) => {
                self.dragging = Some(id);
            }
            Message::DragEnd => {
                self.dragging = None;
            }
            Message::Drop(target) => {
                let Some(dragged) = self.dragging.take() else {
                    return Vec::new();
                };
                if dragged == target {
                    return Vec::new();
                }
                let visible = self.visible().into_iter().cloned().collect();
                return self.write(Effect::Reorder {
                    visible,
                    dragged,
                    target,
                });
            }

            Message::ToggleTheme => {
                self.theme = self.theme.toggled();
                return vec![Effect::PersistTheme(self.theme)];
            }
            Message::OpenApp(id) => match self.find(id) {
                Some(record) => return vec![Effect::OpenUrl(record.url.clone())],
                None => log::warn!("Cannot open {}: not in the current list", id),
            },

            Message::Refresh | Message::RemoteChanged => {
                return self.remote(Effect::Fetch);
            }
            Message::Fetched(result) => {
                self.end_remote();
                match result {
                    Ok(records) => {
                        self.apps = records;
                        self.loaded = true;
                        if self.pending_delete.is_some_and(|id| self.find(id).is_none()) {
                            self.pending_delete = None;
                        }
                        if self.in_flight == 0 {
                            let now = chrono::Local::now().format("%H:%M").to_string();
                            self.sync_status = SyncStatus::LastSynced(now);
                        }
                    }
                    Err(e) => {
                        log::error!("Fetch failed: {}", e);
                        self.sync_status = SyncStatus::Error(e.to_string());
                    }
                }
            }
            Message::WriteSettled(op, result) => {
                self.end_remote();
                match result {
                    Ok(()) => {
                        log::debug!("{} settled", op);
                        return self.remote(Effect::Fetch);
                    }
                    Err(e) => {
                        log::error!("{} failed: {}", op, e);
                        self.sync_status = SyncStatus::Error(e.to_string());
                        let stale = matches!(e, WriteError::Conflict(_) | WriteError::NotFound(_));
                        self.last_write_error = Some((op, e));
                        // The view is behind the store; bring it up to date.
                        if stale {
                            return self.remote(Effect::Fetch);
                        }
                    }
                }
            }
            Message::SubscriptionChanged(state) => {
                let previous = std::mem::replace(&mut self.subscription, state);
                if state != previous {
                    log::debug!("Subscription: {:?} -> {:?}", previous, state);
                }
                // The first baseline is taken after the initial fetch was
                // issued; writes in between only show up in a fresh fetch.
                if previous == SubscriptionState::Disconnected
                    && state == SubscriptionState::Subscribed
                {
                    return self.remote(Effect::Fetch);
                }
            }
        }

        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::FetchError;

    fn record(name: &str, category: Category, sort_order: i64) -> AppRecord {
        AppRecord {
            id: AppId::new(),
            name: name.into(),
            url: format!("https://{}.example", name.to_lowercase()),
            icon: format!("https://{}.example/icon.png", name.to_lowercase()),
            description: format!("{} app", name),
            category,
            sort_order,
            updated_at: None,
        }
    }

    fn loaded(records: Vec<AppRecord>) -> Launcher {
        let (mut launcher, effects) = Launcher::init(Theme::Dark);
        assert_eq!(effects, vec![Effect::Fetch]);
        launcher.update(Message::Fetched(Ok(records)));
        launcher
    }

    fn fill_form(launcher: &mut Launcher) {
        for (field, value) in [
            (FormField::Name, "GitHub"),
            (FormField::Url, "https://github.com"),
            (FormField::Icon, "https://github.com/favicon.ico"),
            (FormField::Description, "Code hosting"),
        ] {
            launcher.update(Message::FormInput(field, value.into()));
        }
        launcher.update(Message::FormCategory(Category::Development));
    }

    #[test]
    fn init_fetches_and_reports_syncing() {
        let (launcher, effects) = Launcher::init(Theme::Light);
        assert_eq!(effects, vec![Effect::Fetch]);
        assert_eq!(*launcher.sync_status(), SyncStatus::Syncing);
        assert!(!launcher.is_loaded());
    }

    #[test]
    fn fetch_result_replaces_snapshot() {
        let launcher = loaded(vec![record("A", Category::Game, 0)]);
        assert!(launcher.is_loaded());
        assert_eq!(launcher.apps().len(), 1);
        assert!(matches!(launcher.sync_status(), SyncStatus::LastSynced(_)));
    }

    #[test]
    fn failed_fetch_keeps_snapshot_and_records_error() {
        let mut launcher = loaded(vec![record("A", Category::Game, 0)]);
        let effects = launcher.update(Message::Refresh);
        assert_eq!(effects, vec![Effect::Fetch]);
        launcher.update(Message::Fetched(Err(FetchError::Transport("down".into()))));
        assert_eq!(launcher.apps().len(), 1);
        assert!(matches!(launcher.sync_status(), SyncStatus::Error(_)));
    }

    #[test]
    fn filter_and_search_drive_visible_list() {
        let mut launcher = loaded(vec![
            record("Steam", Category::Game, 0),
            record("Mastodon", Category::Social, 1),
            record("Itch", Category::Game, 2),
        ]);
        launcher.update(Message::SelectCategory(CategoryFilter::Only(Category::Game)));
        assert_eq!(launcher.visible().len(), 2);

        launcher.update(Message::SearchChanged("STEAM".into()));
        let names: Vec<_> = launcher.visible().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["Steam"]);

        launcher.update(Message::SearchChanged("nothing".into()));
        assert_eq!(launcher.empty_state(), Some(EmptyState::NoMatches));

        launcher.update(Message::ClearSearch);
        assert_eq!(launcher.visible().len(), 2);
    }

    #[test]
    fn counts_follow_the_strip_order() {
        let launcher = loaded(vec![
            record("Steam", Category::Game, 0),
            record("Itch", Category::Game, 1),
        ]);
        let counts = launcher.counts();
        assert_eq!(counts.len(), 8);
        assert_eq!(counts[0], (CategoryFilter::All, 2));
        assert!(counts.contains(&(CategoryFilter::Only(Category::Game), 2)));
        assert!(counts.contains(&(CategoryFilter::Only(Category::Social), 0)));
    }

    #[test]
    fn empty_store_shows_get_started() {
        let launcher = loaded(Vec::new());
        assert_eq!(launcher.empty_state(), Some(EmptyState::NoApps));
    }

    #[test]
    fn add_form_submits_create() {
        let mut launcher = loaded(Vec::new());
        launcher.update(Message::OpenAddForm);
        assert_eq!(launcher.form().map(|f| f.title()), Some("Add New App"));
        assert_eq!(launcher.form().map(|f| f.submit_label()), Some("Add App"));
        fill_form(&mut launcher);

        let effects = launcher.update(Message::SubmitForm);
        assert!(launcher.form().is_none());
        match effects.as_slice() {
            [Effect::Create(draft)] => {
                assert_eq!(draft.name, "GitHub");
                assert_eq!(draft.category, Category::Development);
            }
            other => panic!("unexpected effects: {:?}", other),
        }
        assert_eq!(*launcher.sync_status(), SyncStatus::Syncing);
    }

    #[test]
    fn edit_form_submits_update_for_the_record() {
        let target = record("Steam", Category::Game, 0);
        let id = target.id;
        let mut launcher = loaded(vec![target]);
        launcher.update(Message::OpenEditForm(id));
        assert_eq!(launcher.form().map(|f| f.title()), Some("Edit App"));
        assert_eq!(launcher.form().map(|f| f.submit_label()), Some("Update App"));
        launcher.update(Message::FormInput(FormField::Name, "Steam Deck".into()));

        let effects = launcher.update(Message::SubmitForm);
        match effects.as_slice() {
            [Effect::Update(patched, patch)] => {
                assert_eq!(*patched, id);
                assert_eq!(patch.name.as_deref(), Some("Steam Deck"));
                assert_eq!(patch.sort_order, None);
            }
            other => panic!("unexpected effects: {:?}", other),
        }
    }

    #[test]
    fn invalid_form_stays_open() {
        let mut launcher = loaded(Vec::new());
        launcher.update(Message::OpenAddForm);
        fill_form(&mut launcher);
        launcher.update(Message::FormInput(FormField::Url, "not a url".into()));

        let effects = launcher.update(Message::SubmitForm);
        assert!(effects.is_empty());
        let form = launcher.form().unwrap();
        assert!(matches!(
            form.error,
            Some(FormError::InvalidUrl { field: "url", .. })
        ));
    }

    #[test]
    fn form_without_category_is_rejected() {
        let mut form = AppForm::add();
        form.name = "x".into();
        assert_eq!(form.to_draft(), Err(FormError::MissingCategory));
    }

    #[test]
    fn delete_needs_confirmation_and_names_the_target() {
        let target = record("Steam", Category::Game, 0);
        let id = target.id;
        let mut launcher = loaded(vec![target]);

        assert!(launcher.update(Message::RequestDelete(id)).is_empty());
        assert_eq!(launcher.pending_delete(), Some((id, "Steam")));

        launcher.update(Message::CancelDelete);
        assert!(launcher.pending_delete().is_none());
        assert!(launcher.update(Message::ConfirmDelete).is_empty());

        launcher.update(Message::RequestDelete(id));
        assert_eq!(launcher.update(Message::ConfirmDelete), vec![Effect::Delete(id)]);
        assert!(launcher.pending_delete().is_none());
    }

    #[test]
    fn drop_reorders_within_the_visible_list() {
        let a = record("A", Category::Game, 2);
        let b = record("B", Category::Game, 5);
        let c = record("C", Category::Social, 3);
        let (ida, idb) = (a.id, b.id);
        let mut launcher = loaded(vec![a, c, b]);
        launcher.update(Message::SelectCategory(CategoryFilter::Only(Category::Game)));

        launcher.update(Message::DragStart(ida));
        let effects = launcher.update(Message::Drop(idb));
        match effects.as_slice() {
            [Effect::Reorder {
                visible,
                dragged,
                target,
            }] => {
                assert_eq!((*dragged, *target), (ida, idb));
                let names: Vec<_> = visible.iter().map(|r| r.name.as_str()).collect();
                assert_eq!(names, vec!["A", "B"]);
            }
            other => panic!("unexpected effects: {:?}", other),
        }
    }

    #[test]
    fn drop_on_itself_or_without_drag_does_nothing() {
        let a = record("A", Category::Game, 0);
        let id = a.id;
        let mut launcher = loaded(vec![a]);
        assert!(launcher.update(Message::Drop(id)).is_empty());
        launcher.update(Message::DragStart(id));
        assert!(launcher.update(Message::Drop(id)).is_empty());
        launcher.update(Message::DragStart(id));
        launcher.update(Message::DragEnd);
        assert!(launcher.update(Message::Drop(id)).is_empty());
    }

    #[test]
    fn settled_write_triggers_refetch() {
        let mut launcher = loaded(Vec::new());
        let effects = launcher.update(Message::WriteSettled(WriteOp::Create, Ok(())));
        assert_eq!(effects, vec![Effect::Fetch]);
    }

    #[test]
    fn failed_create_leaves_snapshot_unchanged() {
        let mut launcher = loaded(vec![record("A", Category::Game, 0)]);
        let before = launcher.apps().to_vec();
        let effects = launcher.update(Message::WriteSettled(
            WriteOp::Create,
            Err(WriteError::Transport("down".into())),
        ));
        assert!(effects.is_empty());
        assert_eq!(launcher.apps(), before.as_slice());
        assert!(matches!(launcher.sync_status(), SyncStatus::Error(_)));
        assert!(matches!(
            launcher.last_write_error(),
            Some((WriteOp::Create, WriteError::Transport(_)))
        ));
    }

    #[test]
    fn conflicting_reorder_refetches() {
        let a = record("A", Category::Game, 0);
        let id = a.id;
        let mut launcher = loaded(vec![a]);
        let effects = launcher.update(Message::WriteSettled(
            WriteOp::Reorder {
                dragged: id,
                target: AppId::new(),
            },
            Err(WriteError::Conflict(id)),
        ));
        assert_eq!(effects, vec![Effect::Fetch]);

        // The refetch succeeding does not hide the failed write.
        launcher.update(Message::Fetched(Ok(Vec::new())));
        assert!(launcher.last_write_error().is_some());

        launcher.update(Message::RequestDelete(id));
        assert!(launcher.last_write_error().is_some());
    }

    #[test]
    fn remote_change_fetches() {
        let mut launcher = loaded(Vec::new());
        assert_eq!(launcher.update(Message::RemoteChanged), vec![Effect::Fetch]);
    }

    #[test]
    fn theme_toggle_persists() {
        let (mut launcher, _) = Launcher::init(Theme::Dark);
        assert_eq!(
            launcher.update(Message::ToggleTheme),
            vec![Effect::PersistTheme(Theme::Light)]
        );
        assert_eq!(launcher.theme(), Theme::Light);
    }

    #[test]
    fn open_app_emits_its_url() {
        let a = record("Steam", Category::Game, 0);
        let id = a.id;
        let mut launcher = loaded(vec![a]);
        assert_eq!(
            launcher.update(Message::OpenApp(id)),
            vec![Effect::OpenUrl("https://steam.example".into())]
        );
        assert!(launcher.update(Message::OpenApp(AppId::new())).is_empty());
    }

    #[test]
    fn pending_delete_clears_when_target_disappears() {
        let a = record("A", Category::Game, 0);
        let id = a.id;
        let mut launcher = loaded(vec![a]);
        launcher.update(Message::RequestDelete(id));
        launcher.update(Message::Fetched(Ok(Vec::new())));
        assert!(launcher.pending_delete().is_none());
    }

    #[test]
    fn first_subscription_refetches_but_reconnect_does_not() {
        let mut launcher = loaded(Vec::new());
        assert_eq!(
            launcher.update(Message::SubscriptionChanged(SubscriptionState::Subscribed)),
            vec![Effect::Fetch]
        );
        launcher.update(Message::Fetched(Ok(Vec::new())));
        assert!(launcher
            .update(Message::SubscriptionChanged(SubscriptionState::Reconnecting {
                attempt: 1,
                delay: std::time::Duration::from_secs(1),
            }))
            .is_empty());
        assert!(launcher
            .update(Message::SubscriptionChanged(SubscriptionState::Subscribed))
            .is_empty());
        assert!(launcher.is_idle());
    }

    #[test]
    fn snapshot_reflects_state() {
        let a = record("A", Category::Game, 0);
        let mut launcher = loaded(vec![a]);
        launcher.update(Message::SubscriptionChanged(SubscriptionState::Subscribed));
        let snap = launcher.snapshot();
        assert_eq!(snap.visible.len(), 1);
        assert_eq!(snap.subscription, SubscriptionState::Subscribed);
        assert_eq!(snap.theme, Theme::Dark);
        assert!(snap.loaded);
        assert!(snap.empty.is_none());
    }
}
