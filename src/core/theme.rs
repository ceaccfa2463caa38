#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Unknown values fall back to the default (dark).
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "light" => Self::Light,
            _ => Self::Dark,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Light => "🌞 Light",
            Self::Dark => "🌙 Dark",
        }
    }
}
