use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::file_change::FileChange;

/// Reserved id of the undeletable default changelist
pub const DEFAULT_CHANGELIST_ID: &str = "default";

/// A named, ordered group of pending file changes.
///
/// Changelists are immutable: every mutator returns a new value. File paths
/// are unique within a changelist; a structural change refreshes
/// `modified_at`, a no-op (duplicate add, absent remove) returns a value
/// equal to the input with the timestamp untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changelist {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub files: Vec<FileChange>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Changelist {
    pub fn new(id: String, name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            is_default: id == DEFAULT_CHANGELIST_ID,
            id,
            name,
            description,
            files: Vec::new(),
            is_active: false,
            created_at: now,
            modified_at: now,
        }
    }

    /// The default changelist as created at store initialization
    pub fn default_list() -> Self {
        let mut list = Self::new(
            DEFAULT_CHANGELIST_ID.to_string(),
            "Default".to_string(),
            None,
        );
        list.is_active = true;
        list
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn contains_path(&self, relative_path: &str) -> bool {
        self.files.iter().any(|f| f.relative_path == relative_path)
    }

    pub fn file(&self, relative_path: &str) -> Option<&FileChange> {
        self.files.iter().find(|f| f.relative_path == relative_path)
    }

    /// Append a file, keeping insertion order. Duplicate paths are dropped
    /// silently and leave the changelist untouched.
    pub fn add_file(&self, file: FileChange) -> Self {
        if self.contains_path(&file.relative_path) {
            return self.clone();
        }
        let mut next = self.clone();
        next.files.push(file);
        next.modified_at = Utc::now();
        next
    }

    /// Remove a file by relative path; absent paths are a no-op
    pub fn remove_file(&self, relative_path: &str) -> Self {
        if !self.contains_path(relative_path) {
            return self.clone();
        }
        let mut next = self.clone();
        next.files.retain(|f| f.relative_path != relative_path);
        next.modified_at = Utc::now();
        next
    }

    /// Replace the entry with the same relative path as `file`
    pub fn update_file(&self, file: FileChange) -> Self {
        let mut next = self.clone();
        let mut changed = false;
        for slot in next.files.iter_mut() {
            if slot.relative_path == file.relative_path && *slot != file {
                *slot = file.clone();
                changed = true;
                break;
            }
        }
        if changed {
            next.modified_at = Utc::now();
        }
        next
    }

    /// Apply `f` to the entry at `relative_path`, if present
    pub fn map_file<F>(&self, relative_path: &str, f: F) -> Self
    where
        F: FnOnce(&FileChange) -> FileChange,
    {
        match self.file(relative_path) {
            Some(entry) => self.update_file(f(entry)),
            None => self.clone(),
        }
    }

    pub fn rename(&self, name: String) -> Self {
        let mut next = self.clone();
        next.name = name;
        next.modified_at = Utc::now();
        next
    }

    pub fn with_description(&self, description: Option<String>) -> Self {
        let mut next = self.clone();
        next.description = description;
        next.modified_at = Utc::now();
        next
    }

    /// Active-flag updater; only the store's set-active path calls this
    pub fn with_active(&self, is_active: bool) -> Self {
        let mut next = self.clone();
        next.is_active = is_active;
        next
    }

    pub fn select_all(&self) -> Self {
        let mut next = self.clone();
        for file in next.files.iter_mut() {
            *file = file.with_selection(true);
        }
        next
    }

    pub fn deselect_all(&self) -> Self {
        let mut next = self.clone();
        for file in next.files.iter_mut() {
            *file = file.with_selection(false);
        }
        next
    }

    /// Files currently ticked in the UI
    pub fn selected_files(&self) -> Vec<&FileChange> {
        self.files.iter().filter(|f| f.is_selected).collect()
    }
}
