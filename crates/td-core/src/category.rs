//! Categories that time is tracked against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, ValidationError, non_empty};

/// The seed categories created on first run: (name, icon, color).
pub const DEFAULT_CATEGORIES: [(&str, &str, &str); 8] = [
    ("Work", "briefcase.fill", "6A1B9A"),
    ("Rest", "bed.double.fill", "43A047"),
    ("Sport", "figure.run", "FF5722"),
    ("Learning", "book.fill", "6A1B9A"),
    ("Social", "person.2.fill", "E91E63"),
    ("Sleep", "moon.fill", "546E7A"),
    ("Hobby", "paintbrush.fill", "FF5722"),
    ("Other", "square.grid.2x2.fill", "546E7A"),
];

/// A user-visible bucket for tracked time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    /// Display name. Never blank.
    pub name: String,
    /// Presentation hint, passed through untouched.
    pub icon_name: String,
    /// Presentation hint, passed through untouched.
    pub color_hex: String,
    /// Seed categories cannot be deleted.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    /// Set whenever a timer starts against this category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Category {
    /// Creates a user category with a fresh ID.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Empty`] if `name` is blank.
    pub fn new(
        name: &str,
        icon_name: impl Into<String>,
        color_hex: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: CategoryId::new(),
            name: non_empty(name, "category name")?,
            icon_name: icon_name.into(),
            color_hex: color_hex.into(),
            is_default: false,
            created_at,
            last_used_at: None,
        })
    }

    /// Builds the eight seed categories.
    pub fn defaults(created_at: DateTime<Utc>) -> Vec<Self> {
        DEFAULT_CATEGORIES
            .iter()
            .map(|&(name, icon, color)| Self {
                id: CategoryId::new(),
                name: name.to_string(),
                icon_name: icon.to_string(),
                color_hex: color.to_string(),
                is_default: true,
                created_at,
                last_used_at: None,
            })
            .collect()
    }

    /// Renames the category, rejecting blank names.
    pub fn rename(&mut self, name: &str) -> Result<(), ValidationError> {
        self.name = non_empty(name, "category name")?;
        Ok(())
    }

    pub const fn can_delete(&self) -> bool {
        !self.is_default
    }
}
