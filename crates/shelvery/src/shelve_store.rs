use log::{debug, warn};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use git::Repository;

use crate::changelist::Changelist;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{ChangeBus, StoreEvent};
use crate::file_change::FileChange;
use crate::ids::generate_id;
use crate::registry::Registry;
use crate::shelf::{Shelf, ShelvedFile};
use crate::storage::StateStore;

/// Options for shelf creation
#[derive(Debug, Clone, Copy, Default)]
pub struct ShelveOptions {
    /// Reset the shelved files in the working tree afterwards: tracked
    /// files are checked out from HEAD, untracked ones are removed
    pub remove_from_workspace: bool,
}

/// Options for restoring a shelf
#[derive(Debug, Clone, Default)]
pub struct UnshelveOptions {
    /// Overwrite the working tree even where it diverged
    pub force_merge: bool,
    /// Keep the shelf after a successful restore
    pub keep_shelf: bool,
    /// Restrict the restore to these relative paths
    pub files: Option<Vec<String>>,
}

/// Per-file portion of an unshelve preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConflictReport {
    pub relative_path: String,
    /// 0-based lines where working tree and shelf diverged incompatibly
    pub conflict_lines: Vec<usize>,
    /// The file is gone from disk; restoring recreates it
    pub missing_on_disk: bool,
    pub description: String,
}

impl FileConflictReport {
    pub fn is_conflicting(&self) -> bool {
        !self.conflict_lines.is_empty()
    }
}

/// What an unshelve would run into, computed without touching the disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnshelvePreview {
    pub has_conflicts: bool,
    pub conflicting_paths: Vec<String>,
    /// Every conflicting file has exactly one conflict line; a heuristic,
    /// not a real three-way merge
    pub can_auto_merge: bool,
    pub files: Vec<FileConflictReport>,
}

/// Registry of shelves plus the create/preview/unshelve workflow against
/// the live working tree.
///
/// Shelf baselines come from the backend's HEAD blob at shelve time, so
/// conflict detection compares real pre-edit content, not a second read of
/// the working tree.
pub struct ShelveStore {
    registry: Registry<Shelf>,
    repo: Arc<Repository>,
    storage: Box<dyn StateStore>,
    bus: ChangeBus,
    config: Arc<Config>,
}

impl ShelveStore {
    /// Build the store and reload persisted shelves
    pub fn new(repo: Arc<Repository>, storage: Box<dyn StateStore>, config: Arc<Config>) -> Self {
        let mut store = Self {
            registry: Registry::default(),
            repo,
            storage,
            bus: ChangeBus::new(),
            config,
        };
        store.load();
        store
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.bus.subscribe()
    }

    pub fn get_shelf(&self, id: &str) -> Option<&Shelf> {
        self.registry.get(id)
    }

    /// All shelves, newest first
    pub fn get_all_shelves(&self) -> Vec<&Shelf> {
        let mut shelves: Vec<&Shelf> = self.registry.values().collect();
        shelves.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.id.cmp(&b.id)));
        shelves
    }

    /// Snapshot the given changes into a new shelf
    pub fn create_shelf(
        &mut self,
        name: &str,
        files: &[FileChange],
        options: ShelveOptions,
    ) -> Result<Shelf> {
        let shelf = self.build_shelf(name, files)?;
        self.finish_create(shelf, options)
    }

    /// Snapshot a whole changelist; the shelf records the changelist id as
    /// provenance
    pub fn create_shelf_from_changelist(
        &mut self,
        name: &str,
        changelist: &Changelist,
        options: ShelveOptions,
    ) -> Result<Shelf> {
        let shelf = self
            .build_shelf(name, &changelist.files)?
            .with_changelist_id(Some(changelist.id.clone()));
        self.finish_create(shelf, options)
    }

    fn build_shelf(&self, name: &str, files: &[FileChange]) -> Result<Shelf> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("shelf name must not be empty".into()));
        }
        if files.is_empty() {
            return Err(Error::Validation("cannot shelve an empty selection".into()));
        }

        let mut shelved_files = Vec::with_capacity(files.len());
        for file in files {
            let relative = &file.relative_path;
            let shelved_content = self.repo.working_content(relative)?.unwrap_or_default();
            // Baseline is the last committed blob, so conflict detection
            // compares against real pre-edit content
            let original_content = self.repo.head_content(relative)?.unwrap_or_default();

            shelved_files.push(ShelvedFile::new(
                file.path.clone(),
                relative.clone(),
                original_content,
                shelved_content,
                file.status,
            ));
        }

        let branch = self
            .repo
            .current_branch()
            .unwrap_or_else(|_| "HEAD".to_string());
        let parent_commit = self.repo.head_commit_id().unwrap_or_default();

        Ok(Shelf::new(
            generate_id("shelf"),
            name.to_string(),
            shelved_files,
            branch,
            parent_commit,
        ))
    }

    fn finish_create(&mut self, shelf: Shelf, options: ShelveOptions) -> Result<Shelf> {
        if options.remove_from_workspace {
            self.reset_workspace(&shelf.files)?;
        }

        debug!(
            "Created shelf '{}' ({}) with {} file(s) on {}",
            shelf.name,
            shelf.id,
            shelf.file_count(),
            shelf.branch
        );
        self.registry.insert(shelf.id.clone(), shelf.clone());
        self.save()?;
        self.bus.publish(StoreEvent::ShelvesChanged);
        Ok(shelf)
    }

    /// Put shelved files back to their pre-edit state: checkout for tracked
    /// files, removal for files HEAD does not know
    fn reset_workspace(&self, files: &[ShelvedFile]) -> Result<()> {
        let mut tracked = Vec::new();
        for file in files {
            if self.repo.head_content(&file.relative_path)?.is_some() {
                tracked.push(file.relative_path.clone());
            } else if file.path.exists() {
                fs::remove_file(&file.path)?;
            }
        }
        if !tracked.is_empty() {
            self.repo.checkout_paths(&tracked)?;
        }
        Ok(())
    }

    /// Compare every shelved file against the current working tree
    pub fn preview_unshelve(&self, shelf_id: &str) -> Result<UnshelvePreview> {
        let Some(shelf) = self.registry.get(shelf_id) else {
            return Err(Error::NotFound(format!("shelf '{}'", shelf_id)));
        };

        let mut files = Vec::with_capacity(shelf.file_count());
        for file in &shelf.files {
            let report = match self.repo.working_content(&file.relative_path)? {
                None => FileConflictReport {
                    relative_path: file.relative_path.clone(),
                    conflict_lines: Vec::new(),
                    missing_on_disk: true,
                    description: format!(
                        "{} does not exist on disk; unshelving will recreate it",
                        file.relative_path
                    ),
                },
                Some(current) => {
                    let conflicts = file.detect_conflicts(&current);
                    let description = if conflicts.is_empty() {
                        format!("{} can be restored cleanly", file.relative_path)
                    } else {
                        format!(
                            "{} has {} conflicting line(s)",
                            file.relative_path,
                            conflicts.len()
                        )
                    };
                    FileConflictReport {
                        relative_path: file.relative_path.clone(),
                        conflict_lines: conflicts.iter().map(|c| c.line).collect(),
                        missing_on_disk: false,
                        description,
                    }
                }
            };
            files.push(report);
        }

        let conflicting_paths: Vec<String> = files
            .iter()
            .filter(|r| r.is_conflicting())
            .map(|r| r.relative_path.clone())
            .collect();
        let has_conflicts = !conflicting_paths.is_empty();
        let can_auto_merge = files
            .iter()
            .filter(|r| r.is_conflicting())
            .all(|r| r.conflict_lines.len() == 1);

        Ok(UnshelvePreview {
            has_conflicts,
            conflicting_paths,
            can_auto_merge,
            files,
        })
    }

    /// Restore a shelf's content to the working tree.
    ///
    /// Conflicts block the restore unless `force_merge` is set. Without
    /// force, every selected file must still be at its baseline; the whole
    /// plan is validated before the first write. The shelf is consumed
    /// unless `keep_shelf` is set. Returns the restored relative paths.
    pub fn unshelve(&mut self, shelf_id: &str, options: &UnshelveOptions) -> Result<Vec<String>> {
        let Some(shelf) = self.registry.get(shelf_id).cloned() else {
            return Err(Error::NotFound(format!("shelf '{}'", shelf_id)));
        };

        let preview = self.preview_unshelve(shelf_id)?;
        if preview.has_conflicts && !options.force_merge {
            return Err(Error::Conflict(preview.conflicting_paths));
        }

        let selected: Vec<&ShelvedFile> = match &options.files {
            Some(subset) => shelf
                .files
                .iter()
                .filter(|f| subset.contains(&f.relative_path))
                .collect(),
            None => shelf.files.iter().collect(),
        };
        if selected.is_empty() {
            return Err(Error::Validation("no files selected for unshelve".into()));
        }

        // Validate the full write plan up front so a non-restorable file is
        // caught before anything touches the disk
        let mut plan: Vec<(PathBuf, &str, &str)> = Vec::with_capacity(selected.len());
        let mut blocked = Vec::new();
        for file in &selected {
            if !options.force_merge {
                let current = self.repo.working_content(&file.relative_path)?;
                if !file.can_restore(current.as_deref()) {
                    blocked.push(file.relative_path.clone());
                    continue;
                }
            }
            plan.push((
                file.path.clone(),
                file.shelved_content.as_str(),
                file.relative_path.as_str(),
            ));
        }
        if !blocked.is_empty() {
            return Err(Error::Conflict(blocked));
        }

        // Writes after this point are not rolled back on failure; a torn
        // restore leaves the already-written files in place
        let mut restored = Vec::with_capacity(plan.len());
        for (path, content, relative) in plan {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            if let Err(err) = fs::write(&path, content) {
                warn!(
                    "Restore of shelf '{}' stopped at {}: {} (earlier files stay restored)",
                    shelf_id, relative, err
                );
                return Err(err.into());
            }
            restored.push(relative.to_string());
        }

        if !options.keep_shelf {
            self.registry.remove(shelf_id, None);
            self.save()?;
        }
        debug!("Unshelved {} file(s) from '{}'", restored.len(), shelf_id);
        self.bus.publish(StoreEvent::ShelvesChanged);
        Ok(restored)
    }

    /// Restore a subset of a shelf, keeping the shelf around
    pub fn partial_unshelve(&mut self, shelf_id: &str, file_paths: &[String]) -> Result<Vec<String>> {
        self.unshelve(
            shelf_id,
            &UnshelveOptions {
                force_merge: false,
                keep_shelf: true,
                files: Some(file_paths.to_vec()),
            },
        )
    }

    pub fn delete_shelf(&mut self, id: &str) -> Result<()> {
        if self.registry.remove(id, None).is_none() {
            return Err(Error::NotFound(format!("shelf '{}'", id)));
        }
        self.save()?;
        self.bus.publish(StoreEvent::ShelvesChanged);
        Ok(())
    }

    pub fn rename_shelf(&mut self, id: &str, new_name: &str) -> Result<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(Error::Validation("shelf name must not be empty".into()));
        }
        let Some(shelf) = self.registry.get(id) else {
            return Err(Error::NotFound(format!("shelf '{}'", id)));
        };
        let renamed = shelf.with_name(new_name.to_string());
        self.registry.replace(id, renamed);
        self.save()?;
        self.bus.publish(StoreEvent::ShelvesChanged);
        Ok(())
    }

    pub fn update_shelf_description(&mut self, id: &str, description: Option<String>) -> Result<()> {
        let Some(shelf) = self.registry.get(id) else {
            return Err(Error::NotFound(format!("shelf '{}'", id)));
        };
        let updated = shelf.with_description(description);
        self.registry.replace(id, updated);
        self.save()?;
        self.bus.publish(StoreEvent::ShelvesChanged);
        Ok(())
    }

    /// Concatenated unified patches for the whole shelf
    pub fn export_shelf(&self, id: &str) -> Result<String> {
        match self.registry.get(id) {
            Some(shelf) => Ok(shelf.to_patch()),
            None => Err(Error::NotFound(format!("shelf '{}'", id))),
        }
    }

    /// Rebuild a shelf from exported patch text. Content pairs are
    /// reconstructed from the hunks, so files fully covered by their hunks
    /// round-trip exactly.
    pub fn import_shelf(&mut self, patch_content: &str, name: &str) -> Result<Shelf> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("shelf name must not be empty".into()));
        }

        let parsed = gutter_diff::parse_patch(patch_content);
        if parsed.is_empty() {
            return Err(Error::Validation(
                "patch contains no file sections".into(),
            ));
        }

        let files: Vec<ShelvedFile> = parsed
            .into_iter()
            .map(|fp| {
                let status = if fp.old_content.is_empty() {
                    crate::file_change::FileChangeStatus::Added
                } else {
                    crate::file_change::FileChangeStatus::Modified
                };
                ShelvedFile::new(
                    self.repo.work_dir().join(&fp.path),
                    fp.path,
                    fp.old_content,
                    fp.new_content,
                    status,
                )
            })
            .collect();

        let branch = self
            .repo
            .current_branch()
            .unwrap_or_else(|_| "HEAD".to_string());
        let parent_commit = self.repo.head_commit_id().unwrap_or_default();

        let shelf = Shelf::new(
            generate_id("shelf"),
            name.to_string(),
            files,
            branch,
            parent_commit,
        );
        self.registry.insert(shelf.id.clone(), shelf.clone());
        self.save()?;
        self.bus.publish(StoreEvent::ShelvesChanged);
        Ok(shelf)
    }

    /// Persist the full shelf collection
    pub fn save(&mut self) -> Result<()> {
        let shelves: Vec<Shelf> = self.get_all_shelves().into_iter().cloned().collect();
        let blob = serde_json::to_value(&shelves)?;
        self.storage.update(&self.config.shelves_key, blob)?;
        Ok(())
    }

    /// Reload from storage, skipping individually corrupt entries
    pub fn load(&mut self) {
        self.registry.clear();
        if let Some(Value::Array(items)) = self.storage.get(&self.config.shelves_key) {
            for item in items {
                match serde_json::from_value::<Shelf>(item) {
                    Ok(shelf) => self.registry.insert(shelf.id.clone(), shelf),
                    Err(err) => warn!("Skipping unreadable shelf entry: {}", err),
                }
            }
        }
        debug!("Loaded {} shelf(s)", self.registry.len());
    }
}
