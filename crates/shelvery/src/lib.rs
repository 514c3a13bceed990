// Shelvery: changelist and shelve engine for a Git workflow UI.
//
// Raw status from the git backend becomes FileChange records, organized
// into named changelists; a changelist's files can be snapshotted into a
// shelf (baseline + working content) and later restored with conflict
// detection against intervening edits.

mod changelist;
mod changelist_store;
mod config;
mod error;
mod events;
mod file_change;
mod ids;
mod registry;
mod shelf;
mod shelve_store;
mod status_service;
mod storage;
mod watcher;

pub use changelist::{Changelist, DEFAULT_CHANGELIST_ID};
pub use changelist_store::ChangelistStore;
pub use config::Config;
pub use error::{Error, Result};
pub use events::{ChangeBus, Debouncer, StoreEvent};
pub use file_change::{FileChange, FileChangeStatus};
pub use registry::Registry;
pub use shelf::{ConflictLine, LineEdit, Shelf, ShelvedFile};
pub use shelve_store::{
    FileConflictReport, ShelveOptions, ShelveStore, UnshelveOptions, UnshelvePreview,
};
pub use status_service::{classify_path, ChangeListManager, FileStatusService, PathStatus};
pub use storage::{JsonFileStore, MemoryStore, StateStore};
pub use watcher::{FsWatcher, WatchEvent, WatchKind};
