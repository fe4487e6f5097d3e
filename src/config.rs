// src/config.rs
// =============================================================================
// Stores the user's GitHub API token between runs.
//
// The token lives in ~/.gitgrab/config.json:
//   { "git_token": "ghp_..." }
//
// The folder is created with 0700 and the file with 0600 permissions on
// unix, so other users on the machine can't read the token.
//
// Rust concepts:
// - anyhow::Context: Adds a human-readable message to any error
// - #[serde(flatten)]: Keeps fields we don't know about when rewriting the file
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    git_token: String,
    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

/// Reads and writes the token config file
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TokenStore { path: path.into() }
    }

    /// ~/.gitgrab/config.json
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find your home directory")?;
        Ok(TokenStore::new(home.join(".gitgrab").join("config.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored token, or None when there is no config file or the token is empty
    pub fn load(&self) -> Result<Option<String>> {
        let config = self.read()?.unwrap_or_default();
        Ok(Some(config.git_token).filter(|token| !token.is_empty()))
    }

    pub fn save(&self, token: &str) -> Result<()> {
        let mut config = self.read()?.unwrap_or_default();
        config.git_token = token.trim().to_string();
        self.write(&config)
    }

    pub fn clear(&self) -> Result<()> {
        self.save("")
    }

    fn read(&self) -> Result<Option<ConfigFile>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Could not read {}", self.path.display()))
            }
        };
        let config = serde_json::from_str(&data)
            .with_context(|| format!("{} is not valid JSON", self.path.display()))?;
        Ok(Some(config))
    }

    fn write(&self, config: &ConfigFile) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            create_private_dir(dir)
                .with_context(|| format!("Could not create {}", dir.display()))?;
        }
        let data = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, data)
            .with_context(|| format!("Could not write {}", self.path.display()))?;
        restrict_to_owner(&self.path)
            .with_context(|| format!("Could not set permissions on {}", self.path.display()))
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn restrict_to_owner(file: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(file, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_file: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> TokenStore {
        TokenStore::new(dir.path().join(".gitgrab").join("config.json"))
    }

    #[test]
    fn test_missing_file_means_no_token() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store_in(&dir).load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save("ghp_abc\n").unwrap();
        assert_eq!(store.load().unwrap(), Some("ghp_abc".to_string()));
    }

    #[test]
    fn test_clear_removes_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save("ghp_abc").unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_keeps_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"git_token": "old", "editor": "vim"}"#).unwrap();

        store.save("new").unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["git_token"], "new");
        assert_eq!(raw["editor"], "vim");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "not json").unwrap();
        assert!(store.load().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save("ghp_abc").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
