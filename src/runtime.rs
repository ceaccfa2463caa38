use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::application::{Launcher, ViewSnapshot};
use crate::message::{Effect, Message, WriteOp};
use crate::store::storage::LocalStorage;
use crate::sync::reconciler::Reconciler;
use crate::sync::subscription::{subscribe_to_changes, ChangeSubscription, PollPolicy};
use crate::sync::{RemoteTable, WriteError};

/// Hand `url` to the configured browser command without waiting for it. The
/// child is reaped on a background task once it exits.
///
/// Must be called from within a tokio runtime.
pub fn open_url(browser_command: &str, url: &str) -> std::io::Result<()> {
    let mut child = tokio::process::Command::new(browser_command)
        .arg(url)
        .spawn()?;
    let command = browser_command.to_string();
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if !status.success() => log::warn!("{} exited with {}", command, status),
            Ok(_) => {}
            Err(e) => log::warn!("Failed to wait for {}: {}", command, e),
        }
    });
    Ok(())
}

/// Drives a [`Launcher`]: executes its effects on tokio tasks and feeds the
/// completions back as messages. Every processed message republishes the
/// [`ViewSnapshot`].
pub struct Runtime<R> {
    launcher: Launcher,
    reconciler: Arc<Reconciler<R>>,
    storage: LocalStorage,
    browser_command: String,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
    view: watch::Sender<ViewSnapshot>,
}

impl<R: RemoteTable + 'static> Runtime<R> {
    /// Load the theme, then issue the initial fetch.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(reconciler: Arc<Reconciler<R>>, storage: LocalStorage, browser_command: &str) -> Self {
        let (launcher, effects) = Launcher::init(storage.load_theme());
        let (tx, rx) = mpsc::unbounded_channel();
        let (view, _) = watch::channel(launcher.snapshot());
        let runtime = Self {
            launcher,
            reconciler,
            storage,
            browser_command: browser_command.to_string(),
            tx,
            rx,
            view,
        };
        for effect in effects {
            runtime.execute(effect);
        }
        runtime
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<Message> {
        self.tx.clone()
    }

    pub fn watch(&self) -> watch::Receiver<ViewSnapshot> {
        self.view.subscribe()
    }

    /// Apply one message and start whatever it asks for. Never waits on the network.
    pub fn dispatch(&mut self, message: Message) {
        for effect in self.launcher.update(message) {
            self.execute(effect);
        }
        self.view.send_replace(self.launcher.snapshot());
    }

    fn execute(&self, effect: Effect) {
        match effect {
            Effect::Fetch => {
                let reconciler = self.reconciler.clone();
                self.spawn(async move { Message::Fetched(reconciler.fetch_all().await) });
            }
            Effect::Create(draft) => {
                let reconciler = self.reconciler.clone();
                self.spawn_write(WriteOp::Create, async move { reconciler.create(&draft).await });
            }
            Effect::Update(id, patch) => {
                let reconciler = self.reconciler.clone();
                self.spawn_write(WriteOp::Update(id), async move {
                    reconciler.update(id, &patch).await
                });
            }
            Effect::Delete(id) => {
                let reconciler = self.reconciler.clone();
                self.spawn_write(WriteOp::Delete(id), async move { reconciler.delete(id).await });
            }
            Effect::Reorder {
                visible,
                dragged,
                target,
            } => {
                let reconciler = self.reconciler.clone();
                let op = WriteOp::Reorder { dragged, target };
                self.spawn_write(op, async move {
                    reconciler.reorder(&visible, dragged, target).await
                });
            }
            Effect::PersistTheme(theme) => {
                if let Err(e) = self.storage.save_theme(theme) {
                    log::error!("Failed to save theme: {}", e);
                }
            }
            Effect::OpenUrl(url) => {
                if let Err(e) = open_url(&self.browser_command, &url) {
                    log::error!("Failed to open URL: {}", e);
                }
            }
        }
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = Message> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            // Receiver gone means the runtime shut down; nothing left to tell.
            let _ = tx.send(task.await);
        });
    }

    fn spawn_write<F>(&self, op: WriteOp, task: F)
    where
        F: Future<Output = Result<(), WriteError>> + Send + 'static,
    {
        self.spawn(async move { Message::WriteSettled(op, task.await) });
    }

    /// Process messages until no fetch or write is outstanding.
    pub async fn settle(&mut self) {
        while !self.launcher.is_idle() {
            match self.rx.recv().await {
                Some(message) => self.dispatch(message),
                None => break,
            }
        }
    }

    /// Start the change subscription. Notifications arrive as
    /// [`Message::RemoteChanged`].
    pub fn subscribe(&self, policy: PollPolicy) -> ChangeSubscription {
        let tx = self.tx.clone();
        subscribe_to_changes(self.reconciler.remote().clone(), policy, move || {
            let _ = tx.send(Message::RemoteChanged);
        })
    }

    /// Run the message loop with a live change subscription until `shutdown`
    /// resolves.
    pub async fn run<S>(mut self, policy: PollPolicy, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        let subscription = self.subscribe(policy);
        let mut states = subscription.watch_state();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutting down");
                    break;
                }
                changed = states.changed() => {
                    if changed.is_err() {
                        log::warn!("Change subscription ended");
                        break;
                    }
                    let state = *states.borrow_and_update();
                    self.dispatch(Message::SubscriptionChanged(state));
                }
                Some(message) = self.rx.recv() => {
                    self.dispatch(message);
                }
            }
        }
    }
}
