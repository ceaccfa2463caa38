use std::collections::HashMap;

use crate::core::app::Listing;
use crate::core::category::{Category, CategoryFilter};

/// Records matching the category and a case-insensitive substring of name or
/// description, in cache order. An empty query matches everything.
pub fn filter<'a, T: Listing>(apps: &'a [T], category: CategoryFilter, query: &str) -> Vec<&'a T> {
    let needle = query.to_lowercase();
    apps.iter()
        .filter(|app| matches(*app, category, &needle))
        .collect()
}

/// Same as [`filter`], returning positions into `apps` instead of references.
pub fn filter_positions<T: Listing>(apps: &[T], category: CategoryFilter, query: &str) -> Vec<usize> {
    let needle = query.to_lowercase();
    apps.iter()
        .enumerate()
        .filter(|(_, app)| matches(*app, category, &needle))
        .map(|(i, _)| i)
        .collect()
}

fn matches<T: Listing>(app: &T, category: CategoryFilter, needle: &str) -> bool {
    category.matches(app.category())
        && (app.name().to_lowercase().contains(needle)
            || app.description().to_lowercase().contains(needle))
}

/// Counts shown on the category strip. Categories without entries are absent.
pub fn category_counts<T: Listing>(apps: &[T]) -> HashMap<Category, usize> {
    apps.iter().fold(HashMap::new(), |mut acc, app| {
        *acc.entry(app.category()).or_insert(0) += 1;
        acc
    })
}

/// Count for one entry of the strip; `All` shows the total.
pub fn count_for(counts: &HashMap<Category, usize>, total: usize, filter: CategoryFilter) -> usize {
    match filter {
        CategoryFilter::All => total,
        CategoryFilter::Only(c) => counts.get(&c).copied().unwrap_or(0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    NoMatches,
    NoApps,
}

impl EmptyState {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoMatches => "Try adjusting your search query",
            Self::NoApps => "Get started by adding your first app",
        }
    }
}

/// What to show instead of the grid when nothing is visible.
pub fn empty_state(visible_len: usize, query: &str) -> Option<EmptyState> {
    if visible_len > 0 {
        None
    } else if query.is_empty() {
        Some(EmptyState::NoApps)
    } else {
        Some(EmptyState::NoMatches)
    }
}
