use super::KeyValueStore;
use crate::error::{CardError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File-backed store: each key lives in `<root>/<key>.json`.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CardError::Store(format!("invalid storage key `{}`", key)));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(CardError::Io)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FsBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(CardError::Io)?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        self.ensure_dir()?;

        // Atomic write
        let tmp_path = self.root.join(format!(".{}-{}.tmp", key, Uuid::new_v4()));
        fs::write(&tmp_path, value).map_err(CardError::Io)?;
        fs::rename(&tmp_path, path).map_err(CardError::Io)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        if path.exists() {
            fs::remove_file(path).map_err(CardError::Io)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DRAFT_KEY;

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path().join("nested"));
        assert_eq!(backend.get(DRAFT_KEY).unwrap(), None);
    }

    #[test]
    fn set_creates_directory_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path().join("nested"));

        backend.set(DRAFT_KEY, "{\"a\":1}").unwrap();
        backend.set(DRAFT_KEY, "{\"a\":2}").unwrap();

        assert_eq!(backend.get(DRAFT_KEY).unwrap().as_deref(), Some("{\"a\":2}"));
        assert!(dir.path().join("nested").join("lastCard.json").exists());
    }

    #[test]
    fn set_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path());
        backend.set("cardHistory", "[]").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cardHistory.json".to_string()]);
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path());
        backend.set("userInfo", "{}").unwrap();
        backend.remove("userInfo").unwrap();
        backend.remove("userInfo").unwrap();
        assert_eq!(backend.get("userInfo").unwrap(), None);
    }

    #[test]
    fn rejects_keys_that_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path());
        assert!(backend.set("../outside", "x").is_err());
        assert!(backend.get("").is_err());
    }
}
