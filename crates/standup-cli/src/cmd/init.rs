use crate::output::print_json;
use anyhow::Context;
use standup_core::config::Config;
use standup_core::{io, paths};
use std::path::Path;

const ROSTER_TEMPLATE: &str = "\
# Team members tracked by the scheduler. Run 'standup roster sync' after editing.
#
# members:
#   - id: alice
#     name: Alice
#     target: U0123ABCD
members: []
";

pub fn run(root: &Path, team: &str, timezone: &str, json: bool) -> anyhow::Result<()> {
    let mut config = Config::new(team);
    config.schedule.timezone = timezone.to_string();
    config
        .resolve()
        .with_context(|| format!("cannot initialize with timezone '{timezone}'"))?;

    let dir = paths::standup_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut created = Vec::new();
    let mut existing = Vec::new();

    // 1. config.yaml
    let data = serde_yaml::to_string(&config)?;
    if io::write_if_missing(&paths::config_path(root), data.as_bytes())
        .context("failed to write config.yaml")?
    {
        created.push(paths::CONFIG_FILE);
    } else {
        existing.push(paths::CONFIG_FILE);
    }

    // 2. roster.yaml
    if io::write_if_missing(&paths::roster_path(root), ROSTER_TEMPLATE.as_bytes())
        .context("failed to write roster.yaml")?
    {
        created.push(paths::ROSTER_FILE);
    } else {
        existing.push(paths::ROSTER_FILE);
    }

    // 3. Database with all tables
    let db_existed = paths::db_path(root).exists();
    super::open_store(root)?;
    if db_existed {
        existing.push(paths::DB_FILE);
    } else {
        created.push(paths::DB_FILE);
    }

    if json {
        print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "created": created,
            "existing": existing,
        }))?;
    } else {
        println!("Initializing standup in: {}", root.display());
        for path in &created {
            println!("  created: {path}");
        }
        for path in &existing {
            println!("  exists:  {path}");
        }
        println!("\nNext: add members to {} and run 'standup roster sync'", paths::ROSTER_FILE);
    }
    Ok(())
}
