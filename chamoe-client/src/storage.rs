use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Fixed key under which the session token is persisted
pub const TOKEN_KEY: &str = "token";

/// Durable slot holding the single opaque session token
pub trait TokenStore: Send + Sync {
    fn store_token(&self, token: &str) -> Result<()>;

    /// `Ok(None)` when no usable token is stored
    fn load_token(&self) -> Result<Option<String>>;

    fn clear_token(&self) -> Result<()>;
}

/// Token stored in `<data dir>/token`.
///
/// The file is written atomically with 0600 permissions so only the owner can
/// read it. Contents that cannot be a token are treated as no session.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    file_path: PathBuf,
}

impl FileTokenStore {
    /// Store under `~/.chamoe/token`
    pub fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(Self::in_dir(home_dir.join(".chamoe")))
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            file_path: dir.as_ref().join(TOKEN_KEY),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.file_path
    }
}

impl TokenStore for FileTokenStore {
    fn store_token(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).context("Failed to create token directory")?;
        }

        let temp_path = self.file_path.with_extension("tmp");
        let mut file =
            fs::File::create(&temp_path).context("Failed to create temporary token file")?;
        file.write_all(token.as_bytes())
            .context("Failed to write session token")?;
        file.sync_all()
            .context("Failed to sync token file to disk")?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&temp_path, permissions)
                .context("Failed to set token file permissions")?;
        }

        fs::rename(&temp_path, &self.file_path)
            .context("Failed to rename temporary token file")?;

        log::info!(target: "session", "Saved session token to {}", self.file_path.display());
        Ok(())
    }

    fn load_token(&self) -> Result<Option<String>> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(&self.file_path).context("Failed to read token file")?;
        let token = content.trim();

        if token.is_empty() {
            log::warn!(target: "session", "Token file is empty, treating as no session");
            return Ok(None);
        }

        if token.len() < 8 || token.len() > 256 {
            log::warn!(
                target: "session",
                "Session token has invalid length: {}, treating as corrupted",
                token.len()
            );
            return Ok(None);
        }

        if token.chars().any(|c| c.is_control()) {
            log::warn!(target: "session", "Token file contains control characters, treating as corrupted");
            return Ok(None);
        }

        Ok(Some(token.to_string()))
    }

    fn clear_token(&self) -> Result<()> {
        if self.file_path.exists() {
            fs::remove_file(&self.file_path).context("Failed to delete token file")?;
            log::info!(target: "session", "Deleted token file at {}", self.file_path.display());
        } else {
            log::debug!(target: "session", "Token file does not exist, nothing to delete");
        }
        Ok(())
    }
}

/// Process-local token slot, for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn store_token(&self, token: &str) -> Result<()> {
        let mut slot = self
            .token
            .write()
            .map_err(|_| anyhow!("token slot lock poisoned"))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn load_token(&self) -> Result<Option<String>> {
        let slot = self
            .token
            .read()
            .map_err(|_| anyhow!("token slot lock poisoned"))?;
        Ok(slot.clone())
    }

    fn clear_token(&self) -> Result<()> {
        let mut slot = self
            .token
            .write()
            .map_err(|_| anyhow!("token slot lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(temp_dir.path());

        store.store_token("test-token-12345").unwrap();
        assert_eq!(store.load_token().unwrap(), Some("test-token-12345".to_string()));
        assert!(store.path().ends_with(TOKEN_KEY));
    }

    #[test]
    fn test_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(temp_dir.path());
        assert_eq!(store.load_token().unwrap(), None);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(temp_dir.path());

        store.store_token("test-token-12345").unwrap();
        store.clear_token().unwrap();
        assert!(!store.path().exists());
        store.clear_token().unwrap();
    }

    #[test]
    fn test_whitespace_only_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(temp_dir.path());
        fs::write(store.path(), "   \n\t  ").unwrap();
        assert_eq!(store.load_token().unwrap(), None);
    }

    #[test]
    fn test_corrupted_contents_return_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(temp_dir.path());

        fs::write(store.path(), "short").unwrap();
        assert_eq!(store.load_token().unwrap(), None);

        fs::write(store.path(), "a".repeat(300)).unwrap();
        assert_eq!(store.load_token().unwrap(), None);

        fs::write(store.path(), b"token\x00with\x01control").unwrap();
        assert_eq!(store.load_token().unwrap(), None);
    }

    #[test]
    fn test_save_overwrites_previous_token() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(temp_dir.path());

        store.store_token("first-token-value").unwrap();
        store.store_token("second-token-value").unwrap();

        assert_eq!(store.load_token().unwrap(), Some("second-token-value".to_string()));
        assert!(!temp_dir.path().join("token.tmp").exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(temp_dir.path());
        store.store_token("test-token-12345").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryTokenStore::with_token("restored-token");
        assert_eq!(store.load_token().unwrap(), Some("restored-token".to_string()));
        store.clear_token().unwrap();
        assert_eq!(store.load_token().unwrap(), None);
        store.store_token("next-token").unwrap();
        assert_eq!(store.load_token().unwrap(), Some("next-token".to_string()));
    }
}
