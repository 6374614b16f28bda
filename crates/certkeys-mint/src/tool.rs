//! The minting tool and its cached state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use certkeys_core::{fs, x509, CertBundle, CertError, GeneralName, Result};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::{MintBackend, MintRequest, MkcertBackend};
use crate::config::MintConfig;
use crate::root::RootCa;

/// Handle to the minting tool for one cache directory.
///
/// Clones share the resolved binary and the loaded root CA.
#[derive(Clone)]
pub struct MintingTool {
    inner: Arc<ToolInner>,
}

struct ToolInner {
    cache_dir: PathBuf,
    config: MintConfig,
    backend: Box<dyn MintBackend>,
    state: Mutex<ToolState>,
}

/// What has been resolved so far in this process.
#[derive(Debug, Default)]
struct ToolState {
    binary: Option<PathBuf>,
    root_ca: Option<RootCa>,
}

impl MintingTool {
    /// Create a tool backed by mkcert with default settings
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        MintingToolBuilder::new(cache_dir).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(cache_dir: impl Into<PathBuf>) -> MintingToolBuilder {
        MintingToolBuilder::new(cache_dir)
    }

    /// Directory holding the binary, the root CA and temporary output
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.inner.cache_dir
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &MintConfig {
        &self.inner.config
    }

    /// Where a downloaded binary is kept
    #[must_use]
    pub fn cached_binary(&self) -> PathBuf {
        self.inner.cache_dir.join(self.inner.config.binary_name())
    }

    /// Resolve the tool binary, downloading it if needed.
    ///
    /// Order: cached binary, then PATH, then a download into the cache.
    /// The result is remembered until [`MintingTool::reset`].
    pub async fn which(&self) -> Result<PathBuf> {
        let mut state = self.inner.state.lock().await;
        self.resolve_binary(&mut state).await
    }

    /// Load the root CA, creating it with the tool on first use.
    pub async fn root_ca(&self) -> Result<RootCa> {
        let mut state = self.inner.state.lock().await;
        self.ensure_root_ca(&mut state).await
    }

    /// Delete the cached root CA files and forget all resolved state.
    pub async fn reset(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        let dir = self.cache_dir();
        fs::remove_if_exists(&RootCa::crt_file_in(dir)).await?;
        fs::remove_if_exists(&RootCa::key_file_in(dir)).await?;
        *state = ToolState::default();
        info!(cache = %dir.display(), "root CA reset");
        Ok(())
    }

    /// Mint a leaf certificate covering `names`.
    ///
    /// Every name is expanded to its values (wildcard, resolved address)
    /// before the tool runs; the bundle reports the unexpanded names.
    pub async fn generate(
        &self,
        names: &[GeneralName],
        validity_days: Option<u32>,
    ) -> Result<CertBundle> {
        if names.is_empty() {
            return Err(CertError::Generation(
                "at least one general name is required".to_string(),
            ));
        }

        let mut values: Vec<String> = Vec::new();
        for name in names {
            for value in name.values().await? {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }

        let mut state = self.inner.state.lock().await;
        self.ensure_root_ca(&mut state).await?;
        let binary = self.resolve_binary(&mut state).await?;

        let workdir = tempfile::Builder::new()
            .prefix(".mint-")
            .tempdir_in(self.cache_dir())
            .map_err(|e| CertError::io(self.cache_dir(), e))?;
        let cert_file = workdir.path().join("leaf.crt");
        let key_file = workdir.path().join("leaf.key");
        let validity = validity_days.or(self.inner.config.default_validity_days);

        let request = MintRequest::leaf(
            self.cache_dir(),
            values.clone(),
            cert_file.clone(),
            key_file.clone(),
            validity,
        );
        self.inner.backend.invoke(&binary, &request).await?;

        let crt = read_output(&cert_file).await?;
        let key = read_output(&key_file).await?;
        x509::inspect(&crt).map_err(|e| CertError::Generation(format!("unreadable certificate: {e}")))?;

        info!(values = ?values, validity_days = ?validity, "certificate generated");
        Ok(CertBundle::new(
            crt,
            key,
            names.iter().map(|name| name.name().to_string()).collect(),
        ))
    }

    /// Download the tool to `file`, or to the cache when `None`.
    ///
    /// An existing file is left alone.
    pub async fn download(&self, file: Option<&Path>) -> Result<()> {
        let target = file.map_or_else(|| self.cached_binary(), Path::to_path_buf);
        if fs::exists(&target).await? {
            info!(target = %target.display(), "tool already present, skipping download");
            return Ok(());
        }
        self.inner.backend.acquire(&target).await
    }

    async fn resolve_binary(&self, state: &mut ToolState) -> Result<PathBuf> {
        if let Some(binary) = &state.binary {
            return Ok(binary.clone());
        }
        let binary = self.locate_binary().await?;
        debug!(binary = %binary.display(), "minting tool resolved");
        state.binary = Some(binary.clone());
        Ok(binary)
    }

    async fn locate_binary(&self) -> Result<PathBuf> {
        let cached = self.cached_binary();
        if fs::is_regular_file(&cached).await {
            return Ok(cached);
        }
        if let Some(found) = self.inner.backend.search_path() {
            return Ok(found);
        }

        // Whatever occupies the cache path is not a usable binary.
        if let Ok(meta) = tokio::fs::symlink_metadata(&cached).await {
            if meta.is_dir() {
                return Err(CertError::ToolUnavailable(format!(
                    "{} is a directory",
                    cached.display()
                )));
            }
            warn!(path = %cached.display(), "removing unusable cached tool");
            fs::remove_if_exists(&cached).await?;
        }

        fs::create_private_dir(self.cache_dir()).await?;
        match self.inner.backend.acquire(&cached).await {
            Ok(()) if fs::is_regular_file(&cached).await => Ok(cached),
            Ok(()) => Err(CertError::ToolUnavailable(format!(
                "download did not produce {}",
                cached.display()
            ))),
            Err(e) => Err(CertError::ToolUnavailable(format!(
                "{} not in {} or on PATH, and download failed: {e}",
                self.inner.config.program,
                self.cache_dir().display()
            ))),
        }
    }

    async fn ensure_root_ca(&self, state: &mut ToolState) -> Result<RootCa> {
        if let Some(ca) = &state.root_ca {
            return Ok(ca.clone());
        }

        let ca = if let Some(ca) = RootCa::load(self.cache_dir()).await? {
            debug!(ca = %ca, "cached root CA loaded");
            ca
        } else {
            self.create_root_ca(state).await?
        };
        state.root_ca = Some(ca.clone());
        Ok(ca)
    }

    async fn create_root_ca(&self, state: &mut ToolState) -> Result<RootCa> {
        fs::create_private_dir(self.cache_dir()).await?;
        let binary = self.resolve_binary(state).await?;
        self.inner
            .backend
            .invoke(&binary, &MintRequest::root_ca(self.cache_dir()))
            .await?;

        let ca = RootCa::load(self.cache_dir()).await?.ok_or_else(|| {
            CertError::Generation(format!(
                "tool did not create {} and {}",
                RootCa::CRT_NAME,
                RootCa::KEY_NAME
            ))
        })?;
        info!(ca = %ca, "root CA generated");
        Ok(ca)
    }
}

async fn read_output(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        CertError::Generation(format!("unreadable output {}: {e}", path.display()))
    })
}

impl fmt::Debug for MintingTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MintingTool")
            .field("cache_dir", &self.inner.cache_dir)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`MintingTool`]
pub struct MintingToolBuilder {
    cache_dir: PathBuf,
    config: MintConfig,
    backend: Option<Box<dyn MintBackend>>,
}

impl MintingToolBuilder {
    /// Create a builder for `cache_dir`
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            config: MintConfig::default(),
            backend: None,
        }
    }

    /// Set the configuration
    #[must_use]
    pub fn config(mut self, config: MintConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the process/network backend
    #[must_use]
    pub fn backend(mut self, backend: impl MintBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Build the tool
    #[must_use]
    pub fn build(self) -> MintingTool {
        let backend = self
            .backend
            .unwrap_or_else(|| Box::new(MkcertBackend::new(self.config.clone())));
        MintingTool {
            inner: Arc::new(ToolInner {
                cache_dir: self.cache_dir,
                config: self.config,
                backend,
                state: Mutex::new(ToolState::default()),
            }),
        }
    }
}
