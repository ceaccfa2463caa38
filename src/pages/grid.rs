use std::fmt::Write;

use vortex::application::ViewSnapshot;
use vortex::core::app::{AppDraft, AppRecord};
use vortex::core::category::{Category, CategoryFilter};
use vortex::core::theme::Theme;
use vortex::sync::subscription::SubscriptionState;
use vortex::sync::SyncStatus;
use vortex::view::EmptyState;

/// One entry of the grid. `position` is 1-based within the visible list.
pub struct Card<'a> {
    pub position: usize,
    pub name: &'a str,
    pub description: &'a str,
    pub category: Category,
    pub url: &'a str,
}

impl<'a> Card<'a> {
    pub fn from_record(position: usize, record: &'a AppRecord) -> Self {
        Self {
            position,
            name: &record.name,
            description: &record.description,
            category: record.category,
            url: &record.url,
        }
    }

    pub fn from_draft(position: usize, draft: &'a AppDraft) -> Self {
        Self {
            position,
            name: &draft.name,
            description: &draft.description,
            category: draft.category,
            url: &draft.url,
        }
    }
}

pub fn header(theme: Theme, status: Option<&SyncStatus>, subscription: Option<SubscriptionState>) -> String {
    let mut out = format!("Vortex Launcher  {}", theme.label());
    match status {
        Some(SyncStatus::Syncing) => out.push_str("  · syncing"),
        Some(SyncStatus::LastSynced(at)) => {
            let _ = write!(out, "  · synced {}", at);
        }
        Some(SyncStatus::Error(e)) => {
            let _ = write!(out, "  · error: {}", e);
        }
        Some(SyncStatus::Idle) | None => {}
    }
    match subscription {
        Some(SubscriptionState::Subscribed) => out.push_str("  · live"),
        Some(SubscriptionState::Reconnecting { attempt, delay }) => {
            let _ = write!(out, "  · reconnecting (#{}, {}s)", attempt, delay.as_secs());
        }
        Some(SubscriptionState::Disconnected) | None => {}
    }
    out
}

/// The category strip; the selected entry is bracketed.
pub fn strip(counts: &[(CategoryFilter, usize)], selected: CategoryFilter) -> String {
    counts
        .iter()
        .map(|(filter, count)| {
            if *filter == selected {
                format!("[{} {}]", filter.label(), count)
            } else {
                format!("{} {}", filter.label(), count)
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn cards(cards: &[Card<'_>]) -> String {
    let mut out = String::new();
    for card in cards {
        let _ = writeln!(out, "{:>3}. {}  [{}]", card.position, card.name, card.category);
        let _ = writeln!(out, "     {}", card.description);
        let _ = writeln!(out, "     {}", card.url);
    }
    out
}

pub fn empty(state: EmptyState) -> String {
    format!("No apps found\n{}\n", state.message())
}

/// Cards or the empty state, whichever applies.
pub fn body(list: &[Card<'_>], empty_state: Option<EmptyState>) -> String {
    match empty_state {
        Some(state) => empty(state),
        None => cards(list),
    }
}

/// Full frame for the live view.
pub fn snapshot(snap: &ViewSnapshot) -> String {
    let list: Vec<Card<'_>> = snap
        .visible
        .iter()
        .enumerate()
        .map(|(i, r)| Card::from_record(i + 1, r))
        .collect();
    let mut out = header(snap.theme, Some(&snap.sync_status), Some(snap.subscription));
    out.push('\n');
    out.push_str(&strip(&snap.counts, snap.category));
    out.push('\n');
    if !snap.query.is_empty() {
        let _ = writeln!(out, "Search: {}", snap.query);
    }
    out.push('\n');
    if snap.loaded {
        out.push_str(&body(&list, snap.empty));
    } else {
        out.push_str("Loading…\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn strip_brackets_the_selection() {
        let counts = vec![
            (CategoryFilter::All, 3),
            (CategoryFilter::Only(Category::Game), 2),
        ];
        assert_eq!(
            strip(&counts, CategoryFilter::Only(Category::Game)),
            "All 3  [Game 2]"
        );
    }

    #[test]
    fn cards_are_numbered() {
        let draft = AppDraft {
            name: "Steam".into(),
            url: "https://store.steampowered.com".into(),
            icon: "https://store.steampowered.com/favicon.ico".into(),
            description: "Games".into(),
            category: Category::Game,
        };
        let out = cards(&[Card::from_draft(1, &draft)]);
        assert!(out.starts_with("  1. Steam  [Game]\n"));
        assert!(out.contains("https://store.steampowered.com"));
    }

    #[test]
    fn body_prefers_empty_state() {
        assert_eq!(
            body(&[], Some(EmptyState::NoApps)),
            "No apps found\nGet started by adding your first app\n"
        );
    }

    #[test]
    fn header_shows_theme_and_connection() {
        let out = header(
            Theme::Dark,
            Some(&SyncStatus::LastSynced("14:02".into())),
            Some(SubscriptionState::Reconnecting {
                attempt: 2,
                delay: Duration::from_secs(2),
            }),
        );
        assert_eq!(
            out,
            "Vortex Launcher  🌙 Dark  · synced 14:02  · reconnecting (#2, 2s)"
        );
    }

    #[test]
    fn unloaded_snapshot_says_loading() {
        let out = snapshot(&ViewSnapshot::default());
        assert!(out.ends_with("Loading…\n"));
    }
}
