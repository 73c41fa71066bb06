use crate::error::{Result, StandupError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const STANDUP_DIR: &str = ".standup";
pub const CONFIG_FILE: &str = ".standup/config.yaml";
pub const ROSTER_FILE: &str = ".standup/roster.yaml";
pub const DB_FILE: &str = ".standup/standup.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn standup_dir(root: &Path) -> PathBuf {
    root.join(STANDUP_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn roster_path(root: &Path) -> PathBuf {
    root.join(ROSTER_FILE)
}

pub fn db_path(root: &Path) -> PathBuf {
    root.join(DB_FILE)
}

// ---------------------------------------------------------------------------
// Member id validation
// ---------------------------------------------------------------------------

fn member_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]{0,63}$").expect("valid regex"))
}

/// Member ids end up inside store keys (`<date>/<member>`), so `/` and
/// whitespace are rejected.
pub fn validate_member_id(id: &str) -> Result<()> {
    if member_id_re().is_match(id) {
        Ok(())
    } else {
        Err(StandupError::InvalidMemberId(id.to_string()))
    }
}
