use std::path::PathBuf;
use std::sync::Arc;

use standup_core::config::Config;
use standup_core::paths;
use standup_core::scheduler::{RunEvent, Scheduler};
use standup_core::store::Store;
use tokio::sync::broadcast;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub scheduler: Arc<Scheduler>,
    pub event_tx: broadcast::Sender<RunEvent>,
}

impl AppState {
    /// Wrap an already-built scheduler. Run events it emits are forwarded
    /// to SSE subscribers, and each run first syncs `root`'s roster file.
    pub fn new(root: PathBuf, scheduler: Scheduler) -> Self {
        let (tx, _) = broadcast::channel(64);
        let scheduler = scheduler
            .with_events(tx.clone())
            .with_roster_file(root.clone());
        Self {
            root,
            scheduler: Arc::new(scheduler),
            event_tx: tx,
        }
    }

    /// Load config, open the database and pick a notifier from the
    /// environment.
    pub fn load(root: PathBuf) -> anyhow::Result<Self> {
        let config = Config::load(&root)?;
        let store = Store::open(&paths::db_path(&root))?;
        let notifier = crate::slack::notifier_from_env(&config);
        let scheduler = Scheduler::new(store, &config, notifier)?;
        Ok(Self::new(root, scheduler))
    }

    pub fn store(&self) -> &Store {
        self.scheduler.store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use standup_core::notify::LogNotifier;

    #[test]
    fn new_state_forwards_scheduler_events() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Store::open(&paths::db_path(dir.path())).unwrap();
        let scheduler =
            Scheduler::new(store, &Config::new("acme"), Arc::new(LogNotifier)).unwrap();
        let state = AppState::new(dir.path().to_path_buf(), scheduler);
        assert_eq!(state.root, dir.path());
        assert_eq!(state.event_tx.receiver_count(), 0);
        let _rx = state.event_tx.subscribe();
        assert_eq!(state.event_tx.receiver_count(), 1);
    }

    #[test]
    fn load_without_config_is_not_initialized() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = AppState::load(dir.path().to_path_buf()).err().unwrap();
        assert!(err.to_string().contains("not initialized"));
    }
}
