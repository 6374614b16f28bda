//! One identity: a named set of general names backed by a TOML file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use certkeys_core::fs::{self, PUBLIC_FILE_MODE};
use certkeys_core::{CertError, GeneralName, GeneralNameOptions, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// On-disk form of an identity.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IdentityFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    validity: Option<u32>,
    #[serde(rename = "SubjectAlternativeName", default)]
    subject_alternative_name: Vec<GeneralNameOptions>,
}

/// General names of one identity, keyed by canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    path: PathBuf,
    name: String,
    names: BTreeMap<String, GeneralName>,
    validity_days: Option<u32>,
}

impl IdentityRecord {
    /// An empty record bound to `path`; nothing is written yet.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = fs::absolute(path.as_ref())?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CertError::InvalidName(path.display().to_string()))?;
        Ok(Self {
            path,
            name,
            names: BTreeMap::new(),
            validity_days: None,
        })
    }

    /// Load the record at `path`, or an empty one if the file is absent.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut record = Self::new(path)?;
        let Some(text) = fs::read_optional(&record.path).await? else {
            debug!(path = %record.path.display(), "identity file absent, starting empty");
            return Ok(record);
        };

        let file: IdentityFile = toml::from_str(&text).map_err(|e| CertError::Config {
            path: record.path.display().to_string(),
            reason: e.to_string(),
        })?;
        record.validity_days = file.validity;
        record.names = file
            .subject_alternative_name
            .iter()
            .map(GeneralName::load)
            .map(|gn| (gn.name().to_string(), gn))
            .collect();
        Ok(record)
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity name (the file name)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the entry for `name`, creating a bare one if absent.
    ///
    /// IP literals are canonicalized first, so `"::0001"` and `"::1"` are
    /// the same entry.
    pub fn lookup(&mut self, name: &str) -> &mut GeneralName {
        let (key, _) = GeneralName::format(name);
        self.names
            .entry(key)
            .or_insert_with(|| GeneralName::new(name))
    }

    /// Get the entry for `name` without creating it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&GeneralName> {
        self.names.get(&GeneralName::format(name).0)
    }

    /// Whether `name` has an entry.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove `name`. True if it is absent afterwards, including when it
    /// never existed.
    pub fn delete(&mut self, name: &str) -> bool {
        let key = GeneralName::format(name).0;
        self.names.remove(&key);
        !self.names.contains_key(&key)
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &GeneralName> {
        self.names.values()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if there is nothing to certify
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Requested leaf validity; `None` leaves it to the tool.
    #[must_use]
    pub const fn validity_days(&self) -> Option<u32> {
        self.validity_days
    }

    /// Set the requested leaf validity.
    pub fn set_validity_days(&mut self, days: Option<u32>) {
        self.validity_days = days;
    }

    /// Serialize to TOML.
    pub fn dumps(&self) -> Result<String> {
        let file = IdentityFile {
            validity: self.validity_days,
            subject_alternative_name: self.iter().map(GeneralName::options).collect(),
        };
        toml::to_string_pretty(&file).map_err(|e| CertError::Config {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Atomically write to `path`, or to the record's own path.
    pub async fn dump(&self, path: Option<&Path>) -> Result<()> {
        let target = path.unwrap_or(&self.path);
        fs::write_atomic(target, self.dumps()?, PUBLIC_FILE_MODE).await?;
        debug!(path = %target.display(), entries = self.len(), "identity saved");
        Ok(())
    }
}

impl<'a> IntoIterator for &'a IdentityRecord {
    type Item = &'a GeneralName;
    type IntoIter = std::collections::btree_map::Values<'a, String, GeneralName>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn seeded(dir: &TempDir) -> IdentityRecord {
        let path = dir.path().join("example");
        IdentityRecord::load(&path).await.unwrap().dump(None).await.unwrap();

        let mut record = IdentityRecord::load(&path).await.unwrap();
        record.lookup("example.com");
        record.lookup("localhost");
        record
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let record = IdentityRecord::load(dir.path().join("nothing")).await.unwrap();
        assert!(record.is_empty());
        assert_eq!(record.name(), "nothing");
        assert!(record.path().is_absolute());
        assert!(!record.path().exists());
    }

    #[tokio::test]
    async fn lookup_is_get_or_create() {
        let dir = TempDir::new().unwrap();
        let mut record = seeded(&dir).await;

        record.lookup("example.com").set_include_subdomains(true);
        assert!(record.lookup("example.com").include_subdomains());
        assert_eq!(record.len(), 2);
        assert!(record.get("unknown").is_none());
        assert!(!record.contains("unknown"));
    }

    #[tokio::test]
    async fn lookup_canonicalizes_addresses() {
        let dir = TempDir::new().unwrap();
        let mut record = seeded(&dir).await;

        assert_eq!(record.lookup("0:0::1").name(), "::1");
        assert!(record.contains("::1"));
        assert_eq!(record.len(), 3);
        for gn in &record {
            assert_eq!(record.get(gn.name()), Some(gn));
        }
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut record = seeded(&dir).await;

        assert!(record.contains("example.com"));
        assert!(record.delete("example.com"));
        assert_eq!(record.len(), 1);
        assert!(record.delete("example.com"));
        assert!(record.delete("localhost"));
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn dump_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut record = seeded(&dir).await;
        record.lookup("example.com").set_include_subdomains(true);
        record.lookup("127.0.0.1");
        record.set_validity_days(Some(1000));
        record.dump(None).await.unwrap();

        let text = std::fs::read_to_string(record.path()).unwrap();
        assert!(text.contains("[[SubjectAlternativeName]]"));
        assert!(text.contains("validity = 1000"));

        let reloaded = IdentityRecord::load(record.path()).await.unwrap();
        assert_eq!(reloaded, record);
        assert!(reloaded.get("example.com").unwrap().include_subdomains());
        assert!(!reloaded.get("127.0.0.1").unwrap().is_domain());
    }

    #[tokio::test]
    async fn dump_to_other_path() {
        let dir = TempDir::new().unwrap();
        let record = seeded(&dir).await;
        let copy = dir.path().join("copy");
        record.dump(Some(&copy)).await.unwrap();

        let loaded = IdentityRecord::load(&copy).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.name(), "copy");
    }

    #[tokio::test]
    async fn malformed_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken");
        std::fs::write(&path, "SubjectAlternativeName = 3").unwrap();

        let err = IdentityRecord::load(&path).await.unwrap_err();
        assert!(matches!(err, CertError::Config { .. }));
    }
}
