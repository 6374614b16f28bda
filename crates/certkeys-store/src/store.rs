//! Top-level entry point: a registry plus the tool shared by its identities.

use std::path::Path;

use certkeys_core::{fs, Result};
use certkeys_mint::{MintConfig, MintingTool, RootCa};
use tracing::info;

use crate::binding::CertificateBinding;
use crate::registry::{IdentityRegistry, DEFAULT_CONFIG};

/// Certificates for every identity under one base directory.
#[derive(Debug, Clone)]
pub struct CertificateStore {
    registry: IdentityRegistry,
    tool: MintingTool,
}

impl CertificateStore {
    /// Open the store at `base` with the default mkcert tool.
    pub async fn open(base: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(base, |cache| MintingTool::new(cache)).await
    }

    /// Open the store at `base` with a custom [`MintConfig`].
    pub async fn open_with_config(base: impl AsRef<Path>, config: MintConfig) -> Result<Self> {
        Self::open_with(base, |cache| {
            MintingTool::builder(cache).config(config).build()
        })
        .await
    }

    /// Open the store at `base`, building the tool for its cache directory
    /// with `make_tool`.
    ///
    /// The base directory and registry file are created when missing.
    pub async fn open_with<F>(base: impl AsRef<Path>, make_tool: F) -> Result<Self>
    where
        F: FnOnce(&Path) -> MintingTool,
    {
        let base = fs::absolute(base.as_ref())?;
        fs::create_private_dir(&base).await?;

        let config = base.join(DEFAULT_CONFIG);
        let registry = IdentityRegistry::load(&config).await?;
        if !fs::exists(&config).await? {
            registry.dump(None).await?;
            info!(config = %config.display(), "store initialised");
        }

        let tool = make_tool(registry.cache_dir());
        Ok(Self { registry, tool })
    }

    /// Registry of identities
    #[must_use]
    pub const fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// Registry of identities, mutable. Call [`save`](Self::save) to persist.
    pub fn registry_mut(&mut self) -> &mut IdentityRegistry {
        &mut self.registry
    }

    /// Shared minting tool
    #[must_use]
    pub const fn tool(&self) -> &MintingTool {
        &self.tool
    }

    /// Write the registry file.
    pub async fn save(&self) -> Result<()> {
        self.registry.dump(None).await
    }

    /// Binding for `name`, with an unsaved empty record if it is new.
    pub async fn lookup(&self, name: &str) -> Result<CertificateBinding> {
        let record = self.registry.lookup_record(name).await?;
        Ok(CertificateBinding::new(record, self.tool.clone()))
    }

    /// Binding for a new identity; fails if `name` already exists.
    pub async fn create(&self, name: &str) -> Result<CertificateBinding> {
        let record = self.registry.create_record(name).await?;
        Ok(CertificateBinding::new(record, self.tool.clone()))
    }

    /// Remove the identity file. The cached bundle is left in place.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        self.registry.delete_record(name).await
    }

    /// Remove the identity file and its cached bundle.
    pub async fn purge(&self, name: &str) -> Result<bool> {
        let binding = self.lookup(name).await?;
        if binding.forget().await? {
            info!(identity = name, "cached bundle removed");
        }
        self.delete(name).await
    }

    /// Saved identity names, sorted.
    pub async fn names(&self) -> Result<Vec<String>> {
        self.registry.names().await
    }

    /// The root CA, created on first use.
    pub async fn root_ca(&self) -> Result<RootCa> {
        self.tool.root_ca().await
    }

    /// Delete the root CA so the next generation creates a new one.
    pub async fn reset_root_ca(&self) -> Result<()> {
        self.tool.reset().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certkeys_core::CertError;
    use certkeys_mint::testing::FakeMkcert;
    use tempfile::TempDir;

    async fn store(dir: &TempDir, fake: FakeMkcert) -> CertificateStore {
        CertificateStore::open_with(dir.path(), |cache| {
            MintingTool::builder(cache).backend(fake).build()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn open_lays_out_base() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, FakeMkcert::new()).await;

        assert!(dir.path().join(DEFAULT_CONFIG).is_file());
        assert!(dir.path().join("custom").is_dir());
        assert_eq!(store.tool().cache_dir(), dir.path().join("cached"));
        assert!(store.names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fresh_store_scenario() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, FakeMkcert::new()).await;

        let mut binding = store.lookup("example").await.unwrap();
        assert!(binding.record().is_empty());
        binding.lookup("example.com");
        assert_eq!(binding.record().len(), 1);

        let bundle = binding.read(true).await.unwrap();
        assert_eq!(bundle.general_names(), ["example.com"]);
        assert!(bundle.pem().contains("PRIVATE KEY"));
    }

    #[tokio::test]
    async fn bindings_share_root_ca() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMkcert::new();
        let counters = fake.counters();
        let store = store(&dir, fake).await;

        for (identity, name) in [("one", "one.test"), ("two", "two.test")] {
            let mut binding = store.lookup(identity).await.unwrap();
            binding.lookup(name);
            binding.read(true).await.unwrap();
        }

        assert_eq!(counters.root_created(), 1);
        assert_eq!(counters.leaves(), 2);
        let root = store.root_ca().await.unwrap();
        assert!(root.to_string().starts_with("CA(expire after "));
    }

    #[tokio::test]
    async fn create_save_delete() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, FakeMkcert::new()).await;

        let mut binding = store.create("dup").await.unwrap();
        binding.lookup("dup.test");
        binding.save().await.unwrap();

        let err = store.create("dup").await.unwrap_err();
        assert!(matches!(err, CertError::AlreadyExists { .. }));
        assert_eq!(store.names().await.unwrap(), ["dup"]);

        let reloaded = store.lookup("dup").await.unwrap();
        assert!(reloaded.get("dup.test").is_some());

        assert!(store.delete("dup").await.unwrap());
        assert!(store.delete("dup").await.unwrap());
        assert!(store.names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_removes_bundle() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, FakeMkcert::new()).await;

        let mut binding = store.lookup("web").await.unwrap();
        binding.lookup("web.test");
        binding.save().await.unwrap();
        binding.read(true).await.unwrap();

        assert!(store.delete("web").await.unwrap());
        let [crt_file, ..] = certkeys_core::CertBundle::side_files(binding.slot());
        assert!(crt_file.exists());

        binding.save().await.unwrap();
        assert!(store.purge("web").await.unwrap());
        assert!(!crt_file.exists());
        assert!(store.names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_root_ca_recreates() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMkcert::new();
        let counters = fake.counters();
        let store = store(&dir, fake).await;

        let before = store.root_ca().await.unwrap();
        store.reset_root_ca().await.unwrap();
        assert!(!before.crt_file().exists());

        let after = store.root_ca().await.unwrap();
        assert_ne!(before.crt(), after.crt());
        assert_eq!(counters.root_created(), 2);
    }

    #[tokio::test]
    async fn globals_persist() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir, FakeMkcert::new()).await;
        store
            .registry_mut()
            .set_global_names(vec!["localhost".to_string()]);
        store.save().await.unwrap();

        let reopened = CertificateStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.registry().global_names(), ["localhost"]);
    }

    #[tokio::test]
    async fn invalid_identity_names_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, FakeMkcert::new()).await;

        let err = store.lookup("../etc").await.unwrap_err();
        assert!(matches!(err, CertError::InvalidName(_)));
    }
}
