//! Roster file (`.standup/roster.yaml`) and its sync into the store.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::paths::{self, validate_member_id};
use crate::store::Store;
use crate::types::Member;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterFile {
    #[serde(default)]
    pub members: Vec<RosterEntry>,
}

impl RosterFile {
    /// Load the roster. A missing file is an empty roster.
    pub fn load(root: &Path) -> Result<Self> {
        let roster: RosterFile =
            crate::io::read_yaml(&paths::roster_path(root))?.unwrap_or_default();
        for entry in &roster.members {
            validate_member_id(&entry.id)?;
        }
        Ok(roster)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::roster_path(root), self)
    }
}

/// Outcome of [`sync`], member ids per bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub deactivated: Vec<String>,
}

/// Make the stored members match `roster`: listed members are upserted and
/// activated, stored members absent from the file are deactivated.
pub fn sync(store: &Store, roster: &RosterFile) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    let listed: HashSet<&str> = roster.members.iter().map(|e| e.id.as_str()).collect();

    for entry in &roster.members {
        let existing = store.get_member(&entry.id)?;
        match existing {
            Some(m) if m.name == entry.name && m.target == entry.target && m.active => {}
            Some(mut m) => {
                m.name = entry.name.clone();
                m.target = entry.target.clone();
                m.active = true;
                store.upsert_member(m)?;
                report.updated.push(entry.id.clone());
            }
            None => {
                store.upsert_member(Member::new(&entry.id, &entry.name, &entry.target))?;
                report.added.push(entry.id.clone());
            }
        }
    }

    for m in store.list_members()? {
        if m.active && !listed.contains(m.id.as_str()) {
            store.set_member_active(&m.id, false)?;
            report.deactivated.push(m.id);
        }
    }

    tracing::info!(
        added = report.added.len(),
        updated = report.updated.len(),
        deactivated = report.deactivated.len(),
        "roster synced"
    );
    Ok(report)
}
