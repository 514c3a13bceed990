use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use crate::changelist::{Changelist, DEFAULT_CHANGELIST_ID};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{ChangeBus, StoreEvent};
use crate::ids::generate_id;
use crate::registry::Registry;
use crate::storage::StateStore;

/// Registry of changelists with persistence and the single-active
/// invariant.
///
/// The `default` changelist exists from construction onward and can never
/// be deleted; exactly one changelist is active at all times and receives
/// newly discovered changes.
pub struct ChangelistStore {
    registry: Registry<Changelist>,
    storage: Box<dyn StateStore>,
    bus: ChangeBus,
    config: Arc<Config>,
}

impl ChangelistStore {
    /// Build the store and reload persisted state; a missing or corrupt
    /// blob falls back to a fresh default changelist
    pub fn new(storage: Box<dyn StateStore>, config: Arc<Config>) -> Self {
        let mut store = Self {
            registry: Registry::default(),
            storage,
            bus: ChangeBus::new(),
            config,
        };
        store.load();
        store
    }

    /// Receive a notification on every collection change
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.bus.subscribe()
    }

    pub fn get_changelist(&self, id: &str) -> Option<&Changelist> {
        self.registry.get(id)
    }

    /// All changelists: default first, then by creation time
    pub fn get_all_changelists(&self) -> Vec<&Changelist> {
        let mut lists: Vec<&Changelist> = self.registry.values().collect();
        lists.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        lists
    }

    /// The changelist new status-derived files land in
    pub fn active_changelist(&self) -> &Changelist {
        self.registry.active().unwrap_or_else(|| {
            // `load` guarantees the default entry
            self.registry
                .get(DEFAULT_CHANGELIST_ID)
                .expect("default changelist exists from construction onward")
        })
    }

    /// The changelist currently holding `relative_path`, if any
    pub fn changelist_containing(&self, relative_path: &str) -> Option<&Changelist> {
        self.registry
            .values()
            .find(|cl| cl.contains_path(relative_path))
    }

    /// Create a named changelist. The new list is registered and announced
    /// but not persisted; call `save` to persist.
    pub fn create_changelist(
        &mut self,
        name: &str,
        description: Option<String>,
    ) -> Result<Changelist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("changelist name must not be empty".into()));
        }
        if self.registry.values().any(|cl| cl.name == name) {
            return Err(Error::Validation(format!(
                "a changelist named '{}' already exists",
                name
            )));
        }

        let changelist = Changelist::new(generate_id("changelist"), name.to_string(), description);
        debug!("Created changelist {} ({})", changelist.name, changelist.id);
        self.registry.insert(changelist.id.clone(), changelist.clone());
        self.bus.publish(StoreEvent::ChangelistsChanged);
        Ok(changelist)
    }

    /// Delete a changelist, draining its files into the default list.
    /// Duplicate paths already in default are dropped silently; if the
    /// deleted list was active, default becomes active.
    pub fn delete_changelist(&mut self, id: &str) -> Result<()> {
        if id == DEFAULT_CHANGELIST_ID {
            return Err(Error::Validation(
                "the default changelist cannot be deleted".into(),
            ));
        }
        let Some(target) = self.registry.get(id).cloned() else {
            return Err(Error::NotFound(format!("changelist '{}'", id)));
        };

        if let Some(default) = self.registry.get(DEFAULT_CHANGELIST_ID).cloned() {
            let merged = target
                .files
                .iter()
                .fold(default, |acc, file| acc.add_file(file.clone()));
            self.registry.replace(DEFAULT_CHANGELIST_ID, merged);
        }

        let was_active = self.registry.active_id() == Some(id);
        self.registry.remove(id, Some(DEFAULT_CHANGELIST_ID));
        if was_active {
            self.apply_active(DEFAULT_CHANGELIST_ID);
        }

        debug!("Deleted changelist {} ({} files moved to default)", id, target.file_count());
        self.save()?;
        self.bus.publish(StoreEvent::ChangelistsChanged);
        Ok(())
    }

    /// Rename a changelist. Renaming to its current name is a no-op;
    /// colliding with another list's name is an error.
    pub fn rename_changelist(&mut self, id: &str, new_name: &str) -> Result<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(Error::Validation("changelist name must not be empty".into()));
        }
        let Some(current) = self.registry.get(id) else {
            return Err(Error::NotFound(format!("changelist '{}'", id)));
        };
        if current.name == new_name {
            return Ok(());
        }
        if self
            .registry
            .values()
            .any(|cl| cl.id != id && cl.name == new_name)
        {
            return Err(Error::Validation(format!(
                "a changelist named '{}' already exists",
                new_name
            )));
        }

        let renamed = current.rename(new_name.to_string());
        self.registry.replace(id, renamed);
        self.save()?;
        self.bus.publish(StoreEvent::ChangelistsChanged);
        Ok(())
    }

    /// Move files between changelists. Paths absent from the source are
    /// ignored; paths already in the target are dropped silently.
    pub fn move_files(&mut self, paths: &[String], from_id: &str, to_id: &str) -> Result<()> {
        if from_id == to_id {
            return Ok(());
        }
        let Some(mut from) = self.registry.get(from_id).cloned() else {
            return Err(Error::NotFound(format!("changelist '{}'", from_id)));
        };
        let Some(mut to) = self.registry.get(to_id).cloned() else {
            return Err(Error::NotFound(format!("changelist '{}'", to_id)));
        };

        let mut moved = 0usize;
        for path in paths {
            let Some(file) = from.file(path).cloned() else {
                continue;
            };
            from = from.remove_file(path);
            to = to.add_file(file);
            moved += 1;
        }

        if moved == 0 {
            return Ok(());
        }

        debug!("Moved {} file(s) from {} to {}", moved, from_id, to_id);
        self.registry.replace(from_id, from);
        self.registry.replace(to_id, to);
        self.save()?;
        self.bus.publish(StoreEvent::ChangelistsChanged);
        Ok(())
    }

    /// Make `id` the active changelist, unsetting every other one. This is
    /// the only path that maintains the exactly-one-active invariant.
    pub fn set_active_changelist(&mut self, id: &str) -> Result<()> {
        if !self.registry.contains(id) {
            return Err(Error::NotFound(format!("changelist '{}'", id)));
        }
        self.apply_active(id);
        self.save()?;
        self.bus.publish(StoreEvent::ChangelistsChanged);
        Ok(())
    }

    /// Generic immutable update: apply `f` and replace the entry when the
    /// result differs
    pub fn update_changelist<F>(&mut self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&Changelist) -> Changelist,
    {
        let Some(current) = self.registry.get(id) else {
            return Err(Error::NotFound(format!("changelist '{}'", id)));
        };
        let updated = f(current);
        if &updated == current {
            return Ok(());
        }
        self.registry.replace(id, updated);
        self.save()?;
        self.bus.publish(StoreEvent::ChangelistsChanged);
        Ok(())
    }

    /// Persist the full collection plus the active-id pointer
    pub fn save(&mut self) -> Result<()> {
        let lists: Vec<Changelist> = self
            .get_all_changelists()
            .into_iter()
            .cloned()
            .collect();
        let blob = serde_json::to_value(&lists)?;
        self.storage.update(&self.config.changelists_key, blob)?;

        let active = self
            .registry
            .active_id()
            .unwrap_or(DEFAULT_CHANGELIST_ID)
            .to_string();
        self.storage
            .update(&self.config.active_changelist_key, Value::String(active))?;
        Ok(())
    }

    /// Reload from storage. Individually corrupt entries are logged and
    /// skipped; a `default` entry always exists afterwards.
    pub fn load(&mut self) {
        self.registry.clear();

        if let Some(Value::Array(items)) = self.storage.get(&self.config.changelists_key) {
            for item in items {
                match serde_json::from_value::<Changelist>(item) {
                    Ok(changelist) => {
                        self.registry.insert(changelist.id.clone(), changelist);
                    }
                    Err(err) => {
                        warn!("Skipping unreadable changelist entry: {}", err);
                    }
                }
            }
        }

        if !self.registry.contains(DEFAULT_CHANGELIST_ID) {
            self.registry.insert(
                DEFAULT_CHANGELIST_ID.to_string(),
                Changelist::default_list(),
            );
        }

        let stored_active = self
            .storage
            .get(&self.config.active_changelist_key)
            .and_then(|v| v.as_str().map(str::to_string));
        let active = match stored_active {
            Some(id) if self.registry.contains(&id) => id,
            _ => DEFAULT_CHANGELIST_ID.to_string(),
        };
        self.apply_active(&active);
        debug!("Loaded {} changelist(s)", self.registry.len());
    }

    /// Point the active marker at `id` and resync every entity's flag
    fn apply_active(&mut self, id: &str) {
        for changelist in self.registry.values_mut() {
            let should_be_active = changelist.id == id;
            if changelist.is_active != should_be_active {
                *changelist = changelist.with_active(should_be_active);
            }
        }
        self.registry.set_active(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_change::{FileChange, FileChangeStatus};
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn store() -> ChangelistStore {
        ChangelistStore::new(Box::new(MemoryStore::new()), Arc::new(Config::default()))
    }

    fn change(rel: &str) -> FileChange {
        FileChange::new(
            PathBuf::from("/repo").join(rel),
            rel.to_string(),
            FileChangeStatus::Modified,
        )
    }

    fn exactly_one_active(store: &ChangelistStore) -> bool {
        store
            .get_all_changelists()
            .iter()
            .filter(|cl| cl.is_active)
            .count()
            == 1
    }

    #[test]
    fn fresh_store_has_active_default() {
        let store = store();
        let all = store.get_all_changelists();

        assert_eq!(all.len(), 1);
        assert!(all[0].is_default);
        assert!(all[0].is_active);
        assert_eq!(store.active_changelist().id, DEFAULT_CHANGELIST_ID);
    }

    #[test]
    fn create_rejects_empty_and_duplicate_names() {
        let mut store = store();
        assert!(matches!(
            store.create_changelist("   ", None),
            Err(Error::Validation(_))
        ));

        store.create_changelist("Feature", None).unwrap();
        assert!(matches!(
            store.create_changelist("Feature", None),
            Err(Error::Validation(_))
        ));
        // Case-sensitive exact match only
        store.create_changelist("feature", None).unwrap();
    }

    #[test]
    fn delete_default_always_fails() {
        let mut store = store();
        assert!(matches!(
            store.delete_changelist(DEFAULT_CHANGELIST_ID),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.delete_changelist("nope"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn delete_drains_files_into_default_without_duplicates() {
        let mut store = store();
        let cl = store.create_changelist("Feature", None).unwrap();

        // One path also present in default
        store
            .update_changelist(DEFAULT_CHANGELIST_ID, |d| d.add_file(change("shared.rs")))
            .unwrap();
        store
            .update_changelist(&cl.id, |c| {
                c.add_file(change("shared.rs")).add_file(change("own.rs"))
            })
            .unwrap();

        store.delete_changelist(&cl.id).unwrap();

        assert!(store.get_changelist(&cl.id).is_none());
        let default = store.get_changelist(DEFAULT_CHANGELIST_ID).unwrap();
        assert_eq!(default.file_count(), 2);
        assert!(default.contains_path("own.rs"));
    }

    #[test]
    fn deleting_active_changelist_reverts_active_to_default() {
        let mut store = store();
        let cl = store.create_changelist("Feature", None).unwrap();
        store.set_active_changelist(&cl.id).unwrap();
        assert_eq!(store.active_changelist().id, cl.id);

        store.delete_changelist(&cl.id).unwrap();
        assert_eq!(store.active_changelist().id, DEFAULT_CHANGELIST_ID);
        assert!(exactly_one_active(&store));
    }

    #[test]
    fn exactly_one_active_after_any_sequence() {
        let mut store = store();
        let a = store.create_changelist("A", None).unwrap();
        let b = store.create_changelist("B", None).unwrap();

        for id in [&a.id, &b.id, DEFAULT_CHANGELIST_ID, &a.id] {
            store.set_active_changelist(id).unwrap();
            assert!(exactly_one_active(&store));
        }
        assert_eq!(store.active_changelist().id, a.id);
    }

    #[test]
    fn rename_rules() {
        let mut store = store();
        let a = store.create_changelist("A", None).unwrap();
        store.create_changelist("B", None).unwrap();

        // Self-rename to the same name is a no-op, not an error
        store.rename_changelist(&a.id, "A").unwrap();
        // Collision with a different list is rejected
        assert!(matches!(
            store.rename_changelist(&a.id, "B"),
            Err(Error::Validation(_))
        ));

        store.rename_changelist(&a.id, "A2").unwrap();
        assert_eq!(store.get_changelist(&a.id).unwrap().name, "A2");
    }

    #[test]
    fn move_files_semantics() {
        let mut store = store();
        let a = store.create_changelist("A", None).unwrap();
        store
            .update_changelist(&a.id, |c| {
                c.add_file(change("one.rs")).add_file(change("two.rs"))
            })
            .unwrap();

        // Same source and target: no-op
        store
            .move_files(&["one.rs".into()], &a.id, &a.id)
            .unwrap();

        // Unknown target errors
        assert!(matches!(
            store.move_files(&["one.rs".into()], &a.id, "ghost"),
            Err(Error::NotFound(_))
        ));

        // Absent paths are silently ignored
        store
            .move_files(
                &["one.rs".into(), "ghost.rs".into()],
                &a.id,
                DEFAULT_CHANGELIST_ID,
            )
            .unwrap();

        assert!(!store.get_changelist(&a.id).unwrap().contains_path("one.rs"));
        assert!(store
            .get_changelist(DEFAULT_CHANGELIST_ID)
            .unwrap()
            .contains_path("one.rs"));
        assert!(store.get_changelist(&a.id).unwrap().contains_path("two.rs"));
    }

    #[test]
    fn state_survives_reload_through_storage() {
        let config = Arc::new(Config::default());
        let dir = tempfile::tempdir().unwrap();

        // First session
        {
            let backing = crate::storage::JsonFileStore::new(dir.path().to_path_buf());
            let mut store = ChangelistStore::new(Box::new(backing), config.clone());
            let cl = store.create_changelist("Feature", None).unwrap();
            store
                .update_changelist(&cl.id, |c| c.add_file(change("a.rs")))
                .unwrap();
            store.set_active_changelist(&cl.id).unwrap();
            store.save().unwrap();
        }

        let backing = crate::storage::JsonFileStore::new(dir.path().to_path_buf());
        let store = ChangelistStore::new(Box::new(backing), config);
        let all = store.get_all_changelists();
        assert_eq!(all.len(), 2);
        assert_eq!(store.active_changelist().name, "Feature");
        assert!(store.active_changelist().contains_path("a.rs"));
        assert!(exactly_one_active(&store));
    }

    #[test]
    fn load_falls_back_on_corrupt_entries() {
        let config = Arc::new(Config::default());
        let mut backing = MemoryStore::new();
        backing
            .update(
                &config.changelists_key,
                serde_json::json!([{ "garbage": true }, 42]),
            )
            .unwrap();
        backing
            .update(
                &config.active_changelist_key,
                Value::String("missing-id".into()),
            )
            .unwrap();

        let store = ChangelistStore::new(Box::new(backing), config);
        assert_eq!(store.get_all_changelists().len(), 1);
        assert_eq!(store.active_changelist().id, DEFAULT_CHANGELIST_ID);
    }

    #[test]
    fn update_changelist_notifies_only_on_change() {
        let mut store = store();
        let rx = store.subscribe();

        // No-op update publishes nothing
        store
            .update_changelist(DEFAULT_CHANGELIST_ID, |c| c.clone())
            .unwrap();
        assert!(rx.try_recv().is_err());

        store
            .update_changelist(DEFAULT_CHANGELIST_ID, |c| c.add_file(change("a.rs")))
            .unwrap();
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::ChangelistsChanged);
    }
}
