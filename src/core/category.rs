use serde::{Deserialize, Serialize};

/// Concrete category stored on every launcher entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Social,
    Productivity,
    Entertainment,
    Shopping,
    Development,
    Game,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Self::Social,
        Self::Productivity,
        Self::Entertainment,
        Self::Shopping,
        Self::Development,
        Self::Game,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Social => "Social",
            Self::Productivity => "Productivity",
            Self::Entertainment => "Entertainment",
            Self::Shopping => "Shopping",
            Self::Development => "Development",
            Self::Game => "Game",
            Self::Other => "Other",
        }
    }

    /// Case-insensitive lookup, used for CLI and form input.
    pub fn from_name(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category selector of the filter strip. `All` never appears on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// The filter strip in display order: `All` first, then every category.
    pub fn strip() -> Vec<CategoryFilter> {
        std::iter::once(Self::All)
            .chain(Category::ALL.into_iter().map(Self::Only))
            .collect()
    }

    pub fn matches(&self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(c) => *c == category,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Only(c) => c.as_str(),
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Some(Self::All)
        } else {
            Category::from_name(s).map(Self::Only)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_roundtrip_case_insensitively() {
        for c in Category::ALL {
            assert_eq!(Category::from_name(c.as_str()), Some(c));
            assert_eq!(Category::from_name(&c.as_str().to_lowercase()), Some(c));
        }
        assert_eq!(Category::from_name("Music"), None);
    }

    #[test]
    fn all_is_not_a_concrete_category() {
        assert_eq!(Category::from_name("All"), None);
        assert_eq!(CategoryFilter::from_name("all"), Some(CategoryFilter::All));
    }

    #[test]
    fn strip_starts_with_all() {
        let strip = CategoryFilter::strip();
        assert_eq!(strip.len(), 8);
        assert_eq!(strip[0], CategoryFilter::All);
        assert_eq!(strip[7], CategoryFilter::Only(Category::Other));
    }

    #[test]
    fn serializes_as_plain_name() {
        let json = serde_json::to_string(&Category::Game).unwrap();
        assert_eq!(json, "\"Game\"");
    }
}
