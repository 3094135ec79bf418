//! The category registry.

use std::sync::mpsc::{self, Receiver, Sender};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::category::Category;
use crate::store::{Gateway, keys, log_failure};
use crate::types::{CategoryId, ValidationError, non_empty};

/// Number of categories offered as "recently used".
pub const RECENT_CATEGORY_LIMIT: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CategoryError {
    /// Seed categories cannot be deleted.
    #[error("category '{name}' is a default category and cannot be deleted")]
    ProtectedDefault { id: CategoryId, name: String },

    #[error("category already exists: {0}")]
    DuplicateId(CategoryId),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A change to the registry, delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryChange {
    Created(CategoryId),
    Updated(CategoryId),
    Deleted(CategoryId),
    /// `last_used_at` moved.
    Touched(CategoryId),
}

/// All categories, in insertion order.
///
/// The list is written back on every change. Deleting a category leaves
/// entries that reference it untouched.
#[derive(Debug)]
pub struct CategoryRegistry {
    categories: Vec<Category>,
    gateway: Gateway,
    subscribers: Vec<Sender<CategoryChange>>,
}

impl CategoryRegistry {
    /// Loads categories, seeding the defaults if none are stored.
    pub fn load(gateway: Gateway, now: DateTime<Utc>) -> Self {
        let stored: Vec<Category> = gateway.load(keys::CATEGORIES).unwrap_or_default();
        if stored.is_empty() {
            let defaults = Category::defaults(now);
            tracing::debug!(count = defaults.len(), "seeding default categories");
            let registry = Self {
                categories: defaults,
                gateway,
                subscribers: Vec::new(),
            };
            registry.persist();
            return registry;
        }
        tracing::debug!(count = stored.len(), "loaded categories");
        Self {
            categories: stored,
            gateway,
            subscribers: Vec::new(),
        }
    }

    /// Receives every subsequent change. The channel closes when the
    /// registry is dropped.
    pub fn subscribe(&mut self) -> Receiver<CategoryChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn all(&self) -> &[Category] {
        &self.categories
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&Category> {
        let name = name.trim();
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn create(&mut self, category: Category) -> Result<(), CategoryError> {
        if self.get(category.id).is_some() {
            return Err(CategoryError::DuplicateId(category.id));
        }
        let id = category.id;
        tracing::debug!(category = %id, name = %category.name, "creating category");
        self.categories.push(category);
        self.persist();
        self.notify(CategoryChange::Created(id));
        Ok(())
    }

    /// Replaces the category with the same ID. Returns `Ok(false)` if absent.
    ///
    /// The name is trimmed and must not be blank.
    pub fn update(&mut self, mut category: Category) -> Result<bool, CategoryError> {
        category.name = non_empty(&category.name, "category name")?;
        let Some(slot) = self.categories.iter_mut().find(|c| c.id == category.id) else {
            return Ok(false);
        };
        let id = category.id;
        *slot = category;
        self.persist();
        self.notify(CategoryChange::Updated(id));
        Ok(true)
    }

    /// Removes a category.
    ///
    /// Returns `Ok(None)` if no category has this ID.
    pub fn delete(&mut self, id: CategoryId) -> Result<Option<Category>, CategoryError> {
        let Some(index) = self.categories.iter().position(|c| c.id == id) else {
            return Ok(None);
        };
        let category = &self.categories[index];
        if !category.can_delete() {
            return Err(CategoryError::ProtectedDefault {
                id,
                name: category.name.clone(),
            });
        }
        let removed = self.categories.remove(index);
        tracing::debug!(category = %id, name = %removed.name, "deleted category");
        self.persist();
        self.notify(CategoryChange::Deleted(id));
        Ok(Some(removed))
    }

    /// Records that a timer started against `id`. Unknown IDs are ignored.
    pub fn touch_last_used(&mut self, id: CategoryId, now: DateTime<Utc>) {
        let Some(category) = self.categories.iter_mut().find(|c| c.id == id) else {
            return;
        };
        category.last_used_at = Some(now);
        self.persist();
        self.notify(CategoryChange::Touched(id));
    }

    /// Categories that have been used, most recent first, at most `limit`.
    pub fn recently_used(&self, limit: usize) -> Vec<&Category> {
        let mut used: Vec<&Category> = self
            .categories
            .iter()
            .filter(|c| c.last_used_at.is_some())
            .collect();
        used.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
        used.truncate(limit);
        used
    }

    /// Drops every category and re-seeds the defaults.
    pub(crate) fn reseed(&mut self, now: DateTime<Utc>) {
        self.categories = Category::defaults(now);
        self.persist();
        for category in &self.categories {
            let change = CategoryChange::Created(category.id);
            self.subscribers.retain(|tx| tx.send(change).is_ok());
        }
    }

    fn persist(&self) {
        log_failure(self.gateway.save(keys::CATEGORIES, &self.categories));
    }

    fn notify(&mut self, change: CategoryChange) {
        self.subscribers.retain(|tx| tx.send(change).is_ok());
    }
}
