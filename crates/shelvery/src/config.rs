use std::time::Duration;

/// Runtime configuration, constructed once at startup and handed to every
/// component that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a cached per-path status stays valid
    pub status_cache_ttl: Duration,
    /// Quiet period before reacting to a burst of filesystem events
    pub fs_debounce: Duration,
    /// Storage key holding the serialized changelist array
    pub changelists_key: String,
    /// Storage key holding the active changelist id
    pub active_changelist_key: String,
    /// Storage key holding the serialized shelf array
    pub shelves_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            status_cache_ttl: Duration::from_secs(5),
            fs_debounce: Duration::from_millis(300),
            changelists_key: "shelvery.changelists".to_string(),
            active_changelist_key: "shelvery.activeChangelist".to_string(),
            shelves_key: "shelvery.shelves".to_string(),
        }
    }
}
