use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Change classification of one file, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum FileChangeStatus {
    #[display(fmt = "Modified")]
    Modified,
    #[display(fmt = "Added")]
    Added,
    #[display(fmt = "Deleted")]
    Deleted,
    #[display(fmt = "Renamed")]
    Renamed,
    #[display(fmt = "Copied")]
    Copied,
    #[display(fmt = "Untracked")]
    Untracked,
    #[display(fmt = "Conflicted")]
    Conflicted,
}

/// One file's pending change plus its UI selection and staging flags.
///
/// Instances are immutable: the flag updaters return a new value and never
/// touch the receiver. A fresh set is produced on every status refresh, so
/// nothing but the path carries identity across refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Path relative to the workspace root
    pub relative_path: String,
    /// What kind of change this is
    pub status: FileChangeStatus,
    /// Whether the change is recorded in the index
    pub is_staged: bool,
    /// Whether the file is ticked in the UI
    pub is_selected: bool,
    /// Previous path, for renames
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
}

impl FileChange {
    pub fn new(path: PathBuf, relative_path: String, status: FileChangeStatus) -> Self {
        Self {
            path,
            relative_path,
            status,
            is_staged: false,
            is_selected: true,
            original_path: None,
        }
    }

    /// Same change with the staged flag set
    pub fn staged(mut self, is_staged: bool) -> Self {
        self.is_staged = is_staged;
        self
    }

    /// Same change with a rename origin recorded
    pub fn renamed_from(mut self, original_path: String) -> Self {
        self.original_path = Some(original_path);
        self
    }

    /// A copy with the selection flag set as given
    pub fn with_selection(&self, selected: bool) -> Self {
        Self {
            is_selected: selected,
            ..self.clone()
        }
    }

    /// A copy with the selection flag flipped
    pub fn toggled(&self) -> Self {
        self.with_selection(!self.is_selected)
    }

    /// A copy with the staging flag set as given
    pub fn with_staged(&self, staged: bool) -> Self {
        Self {
            is_staged: staged,
            ..self.clone()
        }
    }
}
