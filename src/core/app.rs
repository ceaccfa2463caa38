use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::category::Category;

/// Identifier assigned by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub Uuid);

impl AppId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AppId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One launcher entry as stored in the remote table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    pub id: AppId,
    pub name: String,
    pub url: String,
    pub icon: String,
    pub description: String,
    pub category: Category,
    pub sort_order: i64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AppRecord {
    pub fn draft(&self) -> AppDraft {
        AppDraft {
            name: self.name.clone(),
            url: self.url.clone(),
            icon: self.icon.clone(),
            description: self.description.clone(),
            category: self.category,
        }
    }
}

/// The user-editable fields of an entry. The local store persists exactly this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDraft {
    pub name: String,
    pub url: String,
    pub icon: String,
    pub description: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field} is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
    #[error("a category is required")]
    MissingCategory,
}

impl AppDraft {
    /// Trim every field and enforce the form rules: all fields required,
    /// `url` and `icon` absolute URLs.
    pub fn validated(self) -> Result<Self, FormError> {
        let name = required("name", &self.name)?;
        let url = required("url", &self.url)?;
        let icon = required("icon", &self.icon)?;
        let description = required("description", &self.description)?;
        check_url("url", &url)?;
        check_url("icon", &icon)?;
        Ok(Self {
            name,
            url,
            icon,
            description,
            category: self.category,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FormError::Missing(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), FormError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|_| FormError::InvalidUrl {
            field,
            value: value.to_string(),
        })
}

/// Partial update. `None` fields are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

impl AppPatch {
    pub fn sort_order(value: i64) -> Self {
        Self {
            sort_order: Some(value),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, record: &mut AppRecord) {
        if let Some(ref v) = self.name {
            record.name = v.clone();
        }
        if let Some(ref v) = self.url {
            record.url = v.clone();
        }
        if let Some(ref v) = self.icon {
            record.icon = v.clone();
        }
        if let Some(ref v) = self.description {
            record.description = v.clone();
        }
        if let Some(v) = self.category {
            record.category = v;
        }
        if let Some(v) = self.sort_order {
            record.sort_order = v;
        }
    }
}

impl From<AppDraft> for AppPatch {
    fn from(draft: AppDraft) -> Self {
        Self {
            name: Some(draft.name),
            url: Some(draft.url),
            icon: Some(draft.icon),
            description: Some(draft.description),
            category: Some(draft.category),
            sort_order: None,
        }
    }
}

/// The fields the filter/search view looks at, shared by remote records and
/// local entries.
pub trait Listing {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn category(&self) -> Category;
}

impl Listing for AppRecord {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn category(&self) -> Category {
        self.category
    }
}

impl Listing for AppDraft {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn category(&self) -> Category {
        self.category
    }
}
