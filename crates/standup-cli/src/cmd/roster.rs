use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use standup_core::roster::{self, RosterFile};
use std::path::Path;

#[derive(Subcommand)]
pub enum RosterSubcommand {
    /// Apply .standup/roster.yaml to the stored members
    Sync,

    /// List stored members, including deactivated ones
    List,
}

pub fn run(root: &Path, subcmd: RosterSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        RosterSubcommand::Sync => sync(root, json),
        RosterSubcommand::List => list(root, json),
    }
}

fn sync(root: &Path, json: bool) -> anyhow::Result<()> {
    super::load_config(root)?;
    let file = RosterFile::load(root).context("failed to load roster.yaml")?;
    let store = super::open_store(root)?;
    let report = roster::sync(&store, &file)?;

    if json {
        return print_json(&report);
    }
    if report.added.is_empty() && report.updated.is_empty() && report.deactivated.is_empty() {
        println!("Roster is up to date ({} member(s)).", file.members.len());
        return Ok(());
    }
    for id in &report.added {
        println!("  added:       {id}");
    }
    for id in &report.updated {
        println!("  updated:     {id}");
    }
    for id in &report.deactivated {
        println!("  deactivated: {id}");
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let store = super::open_store(root)?;
    let members = store.list_members()?;

    if json {
        return print_json(&members);
    }
    if members.is_empty() {
        println!("No members. Edit .standup/roster.yaml and run 'standup roster sync'.");
        return Ok(());
    }
    let rows = members
        .iter()
        .map(|m| {
            vec![
                m.id.clone(),
                m.name.clone(),
                m.target.clone(),
                if m.active { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "TARGET", "ACTIVE"], rows);
    Ok(())
}
