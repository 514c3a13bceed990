use log::{debug, trace};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use git::{Repository, StatusSnapshot};

use crate::changelist_store::ChangelistStore;
use crate::config::Config;
use crate::error::Result;
use crate::events::{ChangeBus, StoreEvent};
use crate::file_change::{FileChange, FileChangeStatus};

/// A path's classified status plus whether the change is staged.
/// `None` status means the path is clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStatus {
    pub status: Option<FileChangeStatus>,
    pub is_staged: bool,
}

impl PathStatus {
    pub const CLEAN: PathStatus = PathStatus {
        status: None,
        is_staged: false,
    };
}

/// Classify one path from the backend's status buckets.
///
/// Precedence is fixed and UI badges depend on it:
/// Conflicted > Staged(index) > Untracked > Modified > Clean.
pub fn classify_path(path: &str, snapshot: &StatusSnapshot) -> PathStatus {
    let staged = snapshot.staged.iter().any(|p| p == path);
    let has = |bucket: &[String]| bucket.iter().any(|p| p == path);

    if has(&snapshot.conflicted) {
        return PathStatus {
            status: Some(FileChangeStatus::Conflicted),
            is_staged: staged,
        };
    }
    if staged {
        let status = if has(&snapshot.created) {
            FileChangeStatus::Added
        } else if has(&snapshot.deleted) {
            FileChangeStatus::Deleted
        } else if snapshot.renamed.iter().any(|r| r.new_path == path) {
            FileChangeStatus::Renamed
        } else {
            FileChangeStatus::Modified
        };
        return PathStatus {
            status: Some(status),
            is_staged: true,
        };
    }
    if has(&snapshot.untracked) {
        return PathStatus {
            status: Some(FileChangeStatus::Untracked),
            is_staged: false,
        };
    }
    if has(&snapshot.modified) {
        return PathStatus {
            status: Some(FileChangeStatus::Modified),
            is_staged: false,
        };
    }
    if has(&snapshot.deleted) {
        return PathStatus {
            status: Some(FileChangeStatus::Deleted),
            is_staged: false,
        };
    }
    if snapshot.renamed.iter().any(|r| r.new_path == path) {
        return PathStatus {
            status: Some(FileChangeStatus::Renamed),
            is_staged: false,
        };
    }
    PathStatus::CLEAN
}

struct CacheEntry {
    status: PathStatus,
    at: Instant,
}

/// Per-path status queries with a short-lived cache.
///
/// A hit inside the TTL skips the backend entirely; watcher events
/// invalidate affected paths explicitly, TTL expiry handles the rest.
pub struct FileStatusService {
    repo: Arc<Repository>,
    config: Arc<Config>,
    cache: HashMap<String, CacheEntry>,
    bus: ChangeBus,
}

impl FileStatusService {
    pub fn new(repo: Arc<Repository>, config: Arc<Config>) -> Self {
        Self {
            repo,
            config,
            cache: HashMap::new(),
            bus: ChangeBus::new(),
        }
    }

    /// Receive a `StatusInvalidated` event per explicitly invalidated path
    pub fn subscribe(&mut self) -> std::sync::mpsc::Receiver<StoreEvent> {
        self.bus.subscribe()
    }

    fn cached(&self, path: &str, now: Instant) -> Option<PathStatus> {
        let entry = self.cache.get(path)?;
        if now.duration_since(entry.at) < self.config.status_cache_ttl {
            Some(entry.status)
        } else {
            None
        }
    }

    /// Status of a single path, served from cache when fresh
    pub fn status_of(&mut self, path: &str, now: Instant) -> Result<PathStatus> {
        if let Some(hit) = self.cached(path, now) {
            trace!("status cache hit for {}", path);
            return Ok(hit);
        }

        let snapshot = self.repo.status()?;
        let status = classify_path(path, &snapshot);
        self.cache.insert(
            path.to_string(),
            CacheEntry { status, at: now },
        );
        Ok(status)
    }

    /// Batch query: cached paths are answered locally, the rest share one
    /// backend snapshot
    pub fn batch_status(
        &mut self,
        paths: &[String],
        now: Instant,
    ) -> Result<HashMap<String, PathStatus>> {
        let mut results = HashMap::with_capacity(paths.len());
        let mut uncached = Vec::new();

        for path in paths {
            match self.cached(path, now) {
                Some(hit) => {
                    results.insert(path.clone(), hit);
                }
                None => uncached.push(path.clone()),
            }
        }

        if !uncached.is_empty() {
            debug!(
                "status batch: {} cached, {} queried",
                results.len(),
                uncached.len()
            );
            let snapshot = self.repo.status()?;
            for path in uncached {
                let status = classify_path(&path, &snapshot);
                self.cache.insert(
                    path.clone(),
                    CacheEntry { status, at: now },
                );
                results.insert(path, status);
            }
        }

        Ok(results)
    }

    /// Drop one path's cache entry (watcher change/create/delete)
    pub fn invalidate(&mut self, path: &str) {
        self.cache.remove(path);
        self.bus.publish(StoreEvent::StatusInvalidated(path.to_string()));
    }

    pub fn invalidate_all(&mut self) {
        let paths: Vec<String> = self.cache.keys().cloned().collect();
        self.cache.clear();
        for path in paths {
            self.bus.publish(StoreEvent::StatusInvalidated(path));
        }
    }

    pub fn cached_path_count(&self) -> usize {
        self.cache.len()
    }
}

/// Turns backend status snapshots into fresh FileChange records and applies
/// them to the changelist store.
///
/// Every refresh discards and rebuilds the records wholesale; only the path
/// carries identity across refreshes. An in-flight refresh drops re-entrant
/// requests instead of queueing them.
pub struct ChangeListManager {
    repo: Arc<Repository>,
    is_loading: bool,
}

impl ChangeListManager {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self {
            repo,
            is_loading: false,
        }
    }

    /// Build FileChange records for every changed path and route new ones
    /// into the active changelist. Returns the fresh records, or an empty
    /// set when a refresh was already running.
    pub fn refresh(&mut self, store: &mut ChangelistStore) -> Result<Vec<FileChange>> {
        if self.is_loading {
            debug!("refresh dropped: another refresh is in flight");
            return Ok(Vec::new());
        }
        self.is_loading = true;
        let result = self.refresh_inner(store);
        self.is_loading = false;
        result
    }

    fn refresh_inner(&mut self, store: &mut ChangelistStore) -> Result<Vec<FileChange>> {
        let snapshot = self.repo.status()?;
        let work_dir = self.repo.work_dir().to_path_buf();

        let mut changes = Vec::new();
        for path in snapshot.all_paths() {
            let classified = classify_path(&path, &snapshot);
            let Some(status) = classified.status else {
                continue;
            };

            let mut change = FileChange::new(work_dir.join(&path), path.clone(), status)
                .staged(classified.is_staged);
            if status == FileChangeStatus::Renamed {
                if let Some(rename) = snapshot.renamed.iter().find(|r| r.new_path == path) {
                    change = change.renamed_from(rename.old_path.clone());
                }
            }
            changes.push(change);
        }

        self.apply(store, &changes)?;
        Ok(changes)
    }

    /// Replace stale records in whichever changelist holds each path; new
    /// paths go to the active changelist. Paths that went clean are removed.
    fn apply(&self, store: &mut ChangelistStore, changes: &[FileChange]) -> Result<()> {
        let changed_paths: Vec<String> =
            changes.iter().map(|c| c.relative_path.clone()).collect();

        // Remove entries whose path is no longer reported as changed
        let all_ids: Vec<String> = store
            .get_all_changelists()
            .iter()
            .map(|cl| cl.id.clone())
            .collect();
        for id in &all_ids {
            let stale: Vec<String> = store
                .get_changelist(id)
                .map(|cl| {
                    cl.files
                        .iter()
                        .map(|f| f.relative_path.clone())
                        .filter(|p| !changed_paths.contains(p))
                        .collect()
                })
                .unwrap_or_default();
            for path in stale {
                store.update_changelist(id, |cl| cl.remove_file(&path))?;
            }
        }

        for change in changes {
            let holder = store
                .changelist_containing(&change.relative_path)
                .map(|cl| cl.id.clone());
            match holder {
                Some(id) => {
                    // Keep the user's selection flag across the refresh
                    let replacement = store
                        .get_changelist(&id)
                        .and_then(|cl| cl.file(&change.relative_path))
                        .map(|old| change.with_selection(old.is_selected))
                        .unwrap_or_else(|| change.clone());
                    store.update_changelist(&id, |cl| cl.update_file(replacement.clone()))?;
                }
                None => {
                    let active_id = store.active_changelist().id.clone();
                    store.update_changelist(&active_id, |cl| cl.add_file(change.clone()))?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            modified: vec!["both.rs".into(), "plain.rs".into()],
            created: vec![],
            deleted: vec!["gone.rs".into()],
            renamed: vec![],
            conflicted: vec!["both.rs".into()],
            untracked: vec!["new.rs".into()],
            staged: vec!["staged.rs".into()],
        }
    }

    #[test]
    fn conflicted_wins_over_modified() {
        let status = classify_path("both.rs", &snapshot());
        assert_eq!(status.status, Some(FileChangeStatus::Conflicted));
    }

    #[test]
    fn staged_wins_over_untracked_and_modified() {
        let mut snap = snapshot();
        snap.untracked.push("staged.rs".into());
        snap.modified.push("staged.rs".into());

        let status = classify_path("staged.rs", &snap);
        assert_eq!(status.status, Some(FileChangeStatus::Modified));
        assert!(status.is_staged);
    }

    #[test]
    fn untracked_wins_over_modified() {
        let mut snap = snapshot();
        snap.modified.push("new.rs".into());

        let status = classify_path("new.rs", &snap);
        assert_eq!(status.status, Some(FileChangeStatus::Untracked));
    }

    #[test]
    fn unknown_path_is_clean() {
        assert_eq!(classify_path("quiet.rs", &snapshot()), PathStatus::CLEAN);
    }

    #[test]
    fn deleted_and_plain_modified_classified() {
        let snap = snapshot();
        assert_eq!(
            classify_path("gone.rs", &snap).status,
            Some(FileChangeStatus::Deleted)
        );
        assert_eq!(
            classify_path("plain.rs", &snap).status,
            Some(FileChangeStatus::Modified)
        );
    }
}
