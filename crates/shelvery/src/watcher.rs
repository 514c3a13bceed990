//! Working-tree watcher feeding the status cache.
//!
//! Emits per-path change/create/delete events; consumers invalidate cached
//! statuses and arm the refresh debouncer.

use log::{trace, warn};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::status_service::FileStatusService;

/// What happened to a watched path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Created,
    Changed,
    Removed,
}

/// One filesystem event inside the working tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchKind,
}

/// Watches the working tree, filtering out `.git` internals
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<std::result::Result<Event, notify::Error>>,
    root: PathBuf,
}

impl FsWatcher {
    pub fn new(root: &Path) -> Result<Self> {
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            NotifyConfig::default().with_poll_interval(Duration::from_millis(500)),
        )
        .map_err(|err| Error::Backend(format!("failed to create watcher: {}", err)))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|err| Error::Backend(format!("failed to watch {}: {}", root.display(), err)))?;

        Ok(Self {
            _watcher: watcher,
            rx,
            root: root.to_path_buf(),
        })
    }

    /// Drain pending events into per-path notifications
    pub fn drain_events(&self) -> Vec<WatchEvent> {
        let mut events = Vec::new();

        while let Ok(result) = self.rx.try_recv() {
            let event = match result {
                Ok(event) => event,
                Err(err) => {
                    warn!("File watcher error: {:?}", err);
                    continue;
                }
            };

            let kind = match event.kind {
                EventKind::Create(_) => WatchKind::Created,
                EventKind::Modify(_) => WatchKind::Changed,
                EventKind::Remove(_) => WatchKind::Removed,
                _ => {
                    trace!("Ignoring event: {:?}", event.kind);
                    continue;
                }
            };

            for path in event.paths {
                if is_git_internal(&path) {
                    continue;
                }
                trace!("fs event {:?}: {}", kind, path.display());
                events.push(WatchEvent { path, kind });
            }
        }

        events
    }

    /// Drop cache entries for every pending event's path. Returns the
    /// number of invalidated paths.
    pub fn invalidate_into(&self, service: &mut FileStatusService) -> usize {
        let mut count = 0;
        for event in self.drain_events() {
            if let Some(relative) = self.relative(&event.path) {
                service.invalidate(&relative);
                count += 1;
            }
        }
        count
    }

    fn relative(&self, path: &Path) -> Option<String> {
        pathdiff::diff_paths(path, &self.root).map(|p| p.to_string_lossy().replace('\\', "/"))
    }
}

fn is_git_internal(path: &Path) -> bool {
    path.components()
        .any(|c| c.as_os_str() == ".git")
}
