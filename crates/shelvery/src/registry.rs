use std::collections::BTreeMap;

/// Id-keyed entity map with a side "active id" pointer.
///
/// Both stores are built on this; keeping the active pointer here means the
/// at-most-one-active invariant is enforced in one place instead of in each
/// mutator.
#[derive(Debug, Clone)]
pub struct Registry<E> {
    entities: BTreeMap<String, E>,
    active_id: Option<String>,
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self {
            entities: BTreeMap::new(),
            active_id: None,
        }
    }
}

impl<E> Registry<E> {
    pub fn insert(&mut self, id: String, entity: E) {
        self.entities.insert(id, entity);
    }

    /// Remove an entity. If it was active, the active pointer moves to
    /// `fallback` when that id exists, otherwise clears.
    pub fn remove(&mut self, id: &str, fallback: Option<&str>) -> Option<E> {
        let removed = self.entities.remove(id);
        if removed.is_some() && self.active_id.as_deref() == Some(id) {
            self.active_id = fallback
                .filter(|f| self.entities.contains_key(*f))
                .map(str::to_string);
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &E> {
        self.entities.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut E> {
        self.entities.values_mut()
    }

    /// Replace an existing entity, returning false when the id is unknown
    pub fn replace(&mut self, id: &str, entity: E) -> bool {
        match self.entities.get_mut(id) {
            Some(slot) => {
                *slot = entity;
                true
            }
            None => false,
        }
    }

    /// Point the active marker at an existing entity
    pub fn set_active(&mut self, id: &str) -> bool {
        if !self.entities.contains_key(id) {
            return false;
        }
        self.active_id = Some(id.to_string());
        true
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&E> {
        self.active_id.as_deref().and_then(|id| self.entities.get(id))
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.active_id = None;
    }
}
