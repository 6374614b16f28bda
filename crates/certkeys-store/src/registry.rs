//! Directory-backed collection of identities.

use std::path::{Component, Path, PathBuf};

use certkeys_core::fs::{self, PUBLIC_FILE_MODE};
use certkeys_core::{CertError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::record::IdentityRecord;

/// Default registry file name inside a store's base directory.
pub const DEFAULT_CONFIG: &str = "certificates.toml";

/// Default identity directory, relative to the registry file.
const DEFAULT_CUSTOM_DIR: &str = "custom";

/// Default shared cache directory, relative to the registry file.
const DEFAULT_CACHE_DIR: &str = "cached";

/// On-disk form of the registry.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_cert: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cached_cert: Option<PathBuf>,
    #[serde(default)]
    globals: Vec<String>,
}

/// Identity files in one directory, plus global defaults.
///
/// Nothing is cached in memory: every lookup reads the identity file again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRegistry {
    path: PathBuf,
    custom_dir: PathBuf,
    cache_dir: PathBuf,
    global_names: Vec<String>,
}

impl IdentityRegistry {
    /// Load the registry file at `path`, falling back to defaults when it is
    /// absent. Both directories are created.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = fs::absolute(path.as_ref())?;
        let file = match fs::read_optional(&path).await? {
            Some(text) => toml::from_str(&text).map_err(|e| CertError::Config {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?,
            None => RegistryFile::default(),
        };

        let base = path.parent().unwrap_or_else(|| Path::new("/")).to_path_buf();
        let resolve = |configured: Option<PathBuf>, default: &str| {
            configured.map_or_else(|| base.join(default), |dir| base.join(dir))
        };
        let registry = Self {
            custom_dir: resolve(file.custom_cert, DEFAULT_CUSTOM_DIR),
            cache_dir: resolve(file.cached_cert, DEFAULT_CACHE_DIR),
            global_names: file.globals,
            path,
        };

        fs::create_private_dir(&registry.custom_dir).await?;
        fs::create_private_dir(&registry.cache_dir).await?;
        debug!(
            config = %registry.path.display(),
            custom = %registry.custom_dir.display(),
            cache = %registry.cache_dir.display(),
            "registry loaded"
        );
        Ok(registry)
    }

    /// Registry file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory of identity files
    #[must_use]
    pub fn custom_dir(&self) -> &Path {
        &self.custom_dir
    }

    /// Shared cache directory for the minting tool and bundles
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Names applied to every identity
    #[must_use]
    pub fn global_names(&self) -> &[String] {
        &self.global_names
    }

    /// Replace the global names
    pub fn set_global_names(&mut self, names: Vec<String>) {
        self.global_names = names;
    }

    /// Path of the identity file for `name`.
    ///
    /// Names must be a single plain path component not starting with `.`.
    pub fn record_path(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        let plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(part)), None) if part == name
        );
        if !plain || name.starts_with('.') {
            return Err(CertError::InvalidName(name.to_string()));
        }
        Ok(self.custom_dir.join(name))
    }

    /// Load the identity `name`, or an unsaved empty one.
    pub async fn lookup_record(&self, name: &str) -> Result<IdentityRecord> {
        IdentityRecord::load(self.record_path(name)?).await
    }

    /// Like [`lookup_record`](Self::lookup_record), but fails with
    /// [`CertError::AlreadyExists`] if `name` already has a file.
    pub async fn create_record(&self, name: &str) -> Result<IdentityRecord> {
        if self.contains(name).await? {
            return Err(CertError::already_exists(format!("identity '{name}'")));
        }
        self.lookup_record(name).await
    }

    /// Remove the identity file. True if `name` is absent afterwards.
    pub async fn delete_record(&self, name: &str) -> Result<bool> {
        let path = self.record_path(name)?;
        if fs::remove_if_exists(&path).await? {
            info!(identity = name, "identity deleted");
        }
        Ok(!fs::exists(&path).await?)
    }

    /// Whether `name` has a file.
    pub async fn contains(&self, name: &str) -> Result<bool> {
        fs::exists(&self.record_path(name)?).await
    }

    /// Identity names, sorted. Subdirectories and dot-files are skipped.
    pub async fn names(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.custom_dir)
            .await
            .map_err(|e| CertError::io(&self.custom_dir, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CertError::io(&self.custom_dir, e))?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') || !fs::is_regular_file(&entry.path()).await {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Number of identities
    pub async fn len(&self) -> Result<usize> {
        Ok(self.names().await?.len())
    }

    /// True if there are no identities
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.names().await?.is_empty())
    }

    /// Serialize to TOML.
    pub fn dumps(&self) -> Result<String> {
        let file = RegistryFile {
            custom_cert: Some(self.custom_dir.clone()),
            cached_cert: Some(self.cache_dir.clone()),
            globals: self.global_names.clone(),
        };
        toml::to_string_pretty(&file).map_err(|e| CertError::Config {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Atomically write to `path`, or to the registry's own path.
    pub async fn dump(&self, path: Option<&Path>) -> Result<()> {
        fs::write_atomic(path.unwrap_or(&self.path), self.dumps()?, PUBLIC_FILE_MODE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn registry(dir: &TempDir) -> IdentityRegistry {
        let path = dir.path().join(DEFAULT_CONFIG);
        IdentityRegistry::load(&path).await.unwrap().dump(None).await.unwrap();
        IdentityRegistry::load(&path).await.unwrap()
    }

    #[tokio::test]
    async fn defaults_live_next_to_config() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir).await;

        assert_eq!(registry.custom_dir(), dir.path().join("custom"));
        assert_eq!(registry.cache_dir(), dir.path().join("cached"));
        assert!(registry.custom_dir().is_dir());
        assert!(registry.cache_dir().is_dir());
        assert!(registry.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn config_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG);
        std::fs::write(
            &path,
            "custom_cert = \"ids\"\nglobals = [\"localhost\", \"127.0.0.1\"]\n",
        )
        .unwrap();

        let mut registry = IdentityRegistry::load(&path).await.unwrap();
        assert_eq!(registry.custom_dir(), dir.path().join("ids"));
        assert_eq!(registry.global_names(), ["localhost", "127.0.0.1"]);

        registry.set_global_names(vec!["example.com".into()]);
        registry.dump(None).await.unwrap();
        let reloaded = IdentityRegistry::load(&path).await.unwrap();
        assert_eq!(reloaded, registry);
    }

    #[tokio::test]
    async fn create_lookup_delete() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir).await;

        registry.create_record("example").await.unwrap().dump(None).await.unwrap();
        assert_eq!(registry.names().await.unwrap(), ["example"]);
        assert!(registry.contains("example").await.unwrap());
        assert_eq!(registry.len().await.unwrap(), 1);
        assert!(registry.lookup_record("example").await.unwrap().is_empty());

        assert!(registry.delete_record("example").await.unwrap());
        assert!(!registry.contains("example").await.unwrap());
        assert!(registry.delete_record("example").await.unwrap());
    }

    #[tokio::test]
    async fn create_twice_fails() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir).await;

        registry.create_record("dup").await.unwrap().dump(None).await.unwrap();
        let err = registry.create_record("dup").await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn names_skip_directories_and_dotfiles() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir).await;

        std::fs::create_dir(registry.custom_dir().join("subdir")).unwrap();
        std::fs::write(registry.custom_dir().join(".tmp123"), "").unwrap();
        std::fs::write(registry.custom_dir().join("b"), "").unwrap();
        std::fs::write(registry.custom_dir().join("a"), "").unwrap();

        assert_eq!(registry.names().await.unwrap(), ["a", "b"]);
    }

    #[tokio::test]
    async fn rejects_path_like_names() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir).await;

        for bad in ["", ".", "..", "../escape", "a/b", ".hidden", "/abs"] {
            let err = registry.lookup_record(bad).await.unwrap_err();
            assert!(matches!(err, CertError::InvalidName(_)), "{bad:?}");
        }
    }
}
