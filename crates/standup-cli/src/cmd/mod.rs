pub mod calendar;
pub mod config;
pub mod init;
pub mod report;
pub mod roster;
pub mod run;
pub mod runs;
pub mod serve;
pub mod status;

use anyhow::Context;
use standup_core::config::Config;
use standup_core::notify::{LogNotifier, Notifier};
use standup_core::paths;
use standup_core::scheduler::Scheduler;
use standup_core::store::Store;
use std::path::Path;
use std::sync::Arc;

pub(crate) fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).context("failed to load config")
}

/// Open the project database. redb holds an exclusive lock, so this fails
/// while `standup serve` is running against the same root.
pub(crate) fn open_store(root: &Path) -> anyhow::Result<Store> {
    Store::open(&paths::db_path(root))
        .context("failed to open .standup/standup.db (is 'standup serve' running?)")
}

/// Scheduler that only logs notifications. Used by read-only commands.
pub(crate) fn open_scheduler(root: &Path) -> anyhow::Result<Scheduler> {
    let config = load_config(root)?;
    let store = open_store(root)?;
    scheduler_with(store, &config, Arc::new(LogNotifier))
}

pub(crate) fn scheduler_with(
    store: Store,
    config: &Config,
    notifier: Arc<dyn Notifier>,
) -> anyhow::Result<Scheduler> {
    Scheduler::new(store, config, notifier).context("invalid schedule in config.yaml")
}
