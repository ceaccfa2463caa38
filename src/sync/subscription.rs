use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{RemoteTable, Revision};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionState {
    #[default]
    Disconnected,
    Reconnecting {
        attempt: u32,
        delay: Duration,
    },
    Subscribed,
}

/// How often the table revision is polled, and how reconnects back off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl PollPolicy {
    /// `base * 2^(attempt - 1)`, capped at `backoff_max`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.backoff_base
            .saturating_mul(1u32 << shift)
            .min(self.backoff_max)
    }
}

/// Live change subscription. Dropping it stops the watcher.
pub struct ChangeSubscription {
    state: watch::Receiver<SubscriptionState>,
    task: JoinHandle<()>,
}

impl ChangeSubscription {
    pub fn state(&self) -> SubscriptionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SubscriptionState> {
        self.state.clone()
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Call `on_change` whenever the remote table changes. The callback carries no
/// payload; consumers re-fetch everything.
///
/// Must be called from within a tokio runtime.
pub fn subscribe_to_changes<R, F>(remote: Arc<R>, policy: PollPolicy, on_change: F) -> ChangeSubscription
where
    R: RemoteTable + 'static,
    F: Fn() + Send + 'static,
{
    let (state_tx, state_rx) = watch::channel(SubscriptionState::Disconnected);
    let task = tokio::spawn(watch_revisions(remote, policy, on_change, state_tx));
    ChangeSubscription {
        state: state_rx,
        task,
    }
}

async fn watch_revisions<R, F>(
    remote: Arc<R>,
    policy: PollPolicy,
    on_change: F,
    state: watch::Sender<SubscriptionState>,
) where
    R: RemoteTable + 'static,
    F: Fn() + Send + 'static,
{
    let mut last: Option<Revision> = None;
    let mut attempt: u32 = 0;

    loop {
        match remote.revision().await {
            Ok(revision) => {
                if *state.borrow() != SubscriptionState::Subscribed {
                    log::info!("Change subscription established");
                    state.send_replace(SubscriptionState::Subscribed);
                }
                // The first revision is the baseline; after an outage a
                // difference covers whatever happened meanwhile. Without a
                // baseline from before the outage, report once regardless.
                match last {
                    Some(ref previous) if *previous != revision => {
                        log::debug!("Remote changed: {:?} -> {:?}", previous, revision);
                        on_change();
                    }
                    None if attempt > 0 => {
                        log::debug!("First revision after {} failed polls", attempt);
                        on_change();
                    }
                    _ => {}
                }
                attempt = 0;
                last = Some(revision);
                tokio::time::sleep(policy.interval).await;
            }
            Err(e) => {
                attempt = attempt.saturating_add(1);
                let delay = policy.backoff(attempt);
                log::warn!(
                    "Change subscription lost (attempt {}): {}; retrying in {:?}",
                    attempt,
                    e,
                    delay
                );
                state.send_replace(SubscriptionState::Reconnecting { attempt, delay });
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::{AppDraft, AppId, AppPatch};
    use crate::core::category::Category;
    use crate::sync::memory::InMemoryTable;
    use crate::sync::WriteCondition;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(100),
            backoff_base: Duration::from_millis(200),
            backoff_max: Duration::from_secs(2),
        }
    }

    fn draft(name: &str) -> AppDraft {
        AppDraft {
            name: name.into(),
            url: "https://a.example".into(),
            icon: "https://a.example/i.png".into(),
            description: "d".into(),
            category: Category::Other,
        }
    }

    fn subscribe(table: Arc<InMemoryTable>) -> (ChangeSubscription, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = subscribe_to_changes(table, policy(), move || {
            let _ = tx.send(());
        });
        (sub, rx)
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let p = policy();
        assert_eq!(p.backoff(1), Duration::from_millis(200));
        assert_eq!(p.backoff(2), Duration::from_millis(400));
        assert_eq!(p.backoff(4), Duration::from_millis(1600));
        assert_eq!(p.backoff(5), Duration::from_secs(2));
        assert_eq!(p.backoff(u32::MAX), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_change_without_payload() {
        let table = Arc::new(InMemoryTable::new());
        let (sub, mut rx) = subscribe(table.clone());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(sub.state(), SubscriptionState::Subscribed);
        assert!(rx.try_recv().is_err(), "baseline must not fire");

        table.insert(&draft("A"), 0).await.unwrap();
        timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err(), "no change, no notification");
    }

    #[tokio::test(start_paused = true)]
    async fn updates_and_deletes_also_fire() {
        let table = Arc::new(InMemoryTable::new());
        table.insert(&draft("A"), 0).await.unwrap();
        let id = table.rows()[0].id;
        let (_sub, mut rx) = subscribe(table.clone());
        tokio::time::sleep(Duration::from_millis(150)).await;

        table
            .update(id, &AppPatch::sort_order(3), WriteCondition::Unconditional)
            .await
            .unwrap();
        timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();

        table.delete(id).await.unwrap();
        timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();

        // A write that fails changes nothing and notifies nobody.
        assert!(table.delete(AppId::new()).await.is_err());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_with_backoff_and_reports_missed_changes() {
        let table = Arc::new(InMemoryTable::new());
        let (sub, mut rx) = subscribe(table.clone());
        tokio::time::sleep(Duration::from_millis(150)).await;
        let mut states = sub.watch_state();
        assert_eq!(*states.borrow_and_update(), SubscriptionState::Subscribed);

        table.set_fail_fetches(true);
        states.changed().await.unwrap();
        assert_eq!(
            *states.borrow_and_update(),
            SubscriptionState::Reconnecting {
                attempt: 1,
                delay: Duration::from_millis(200)
            }
        );
        states.changed().await.unwrap();
        assert_eq!(
            *states.borrow_and_update(),
            SubscriptionState::Reconnecting {
                attempt: 2,
                delay: Duration::from_millis(400)
            }
        );

        // A write lands while the subscription is down.
        table.insert(&draft("A"), 0).await.unwrap();
        table.set_fail_fetches(false);

        timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(sub.state(), SubscriptionState::Subscribed);
    }

    #[tokio::test(start_paused = true)]
    async fn outage_before_first_poll_still_reports_changes() {
        let table = Arc::new(InMemoryTable::new());
        table.set_fail_fetches(true);
        let (sub, mut rx) = subscribe(table.clone());
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(matches!(sub.state(), SubscriptionState::Reconnecting { .. }));

        table.insert(&draft("A"), 0).await.unwrap();
        table.set_fail_fetches(false);

        timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(sub.state(), SubscriptionState::Subscribed);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err(), "reported once");
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_subscription_stops_notifications() {
        let table = Arc::new(InMemoryTable::new());
        let (sub, mut rx) = subscribe(table.clone());
        tokio::time::sleep(Duration::from_millis(150)).await;
        drop(sub);
        tokio::task::yield_now().await;

        table.insert(&draft("A"), 0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        // Sender was dropped with the task: the channel reports closed, never a change.
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
