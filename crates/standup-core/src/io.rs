use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `data` to `path` through a synced tempfile in the same directory,
/// so a crash leaves either the old file or the new one.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Returns true if the file was created.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// Read a YAML document. `None` when the file does not exist.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match std::fs::read_to_string(path) {
        Ok(data) => Ok(Some(serde_yaml::from_str(&data)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_yaml::to_string(value)?;
    atomic_write(path, data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".standup/nested/config.yaml");
        atomic_write(&path, b"timezone: UTC").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "timezone: UTC");
    }

    #[test]
    fn write_if_missing_keeps_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roster.yaml");
        std::fs::write(&path, b"members: [alice]").unwrap();
        assert!(!write_if_missing(&path, b"members: []").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "members: [alice]");
        std::fs::remove_file(&path).unwrap();
        assert!(write_if_missing(&path, b"members: []").unwrap());
    }

    #[test]
    fn yaml_roundtrip_and_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("targets.yaml");
        assert!(read_yaml::<BTreeMap<String, String>>(&path).unwrap().is_none());

        let mut targets = BTreeMap::new();
        targets.insert("alice".to_string(), "U1".to_string());
        write_yaml(&path, &targets).unwrap();
        assert_eq!(read_yaml(&path).unwrap(), Some(targets));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "team: [unclosed").unwrap();
        assert!(read_yaml::<BTreeMap<String, String>>(&path).is_err());
    }
}
