//! Process and network access for the minting tool.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use certkeys_core::{CertError, Result};
use reqwest::Client as HttpClient;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::MintConfig;
use crate::download;

/// Environment variable mkcert reads its CA directory from.
const CAROOT_ENV: &str = "CAROOT";

/// One invocation of the minting tool.
///
/// With no names the tool only makes sure a root CA exists in `caroot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
    /// Directory holding the root CA
    pub caroot: PathBuf,
    /// Subject alternative names, already expanded
    pub names: Vec<String>,
    /// Where the leaf certificate is written
    pub cert_file: Option<PathBuf>,
    /// Where the leaf key is written
    pub key_file: Option<PathBuf>,
    /// Requested leaf validity
    pub validity_days: Option<u32>,
}

impl MintRequest {
    /// Create (or keep) the root CA in `caroot`.
    #[must_use]
    pub fn root_ca(caroot: &Path) -> Self {
        Self {
            caroot: caroot.to_path_buf(),
            names: Vec::new(),
            cert_file: None,
            key_file: None,
            validity_days: None,
        }
    }

    /// Mint a leaf certificate for `names`.
    #[must_use]
    pub fn leaf(
        caroot: &Path,
        names: Vec<String>,
        cert_file: PathBuf,
        key_file: PathBuf,
        validity_days: Option<u32>,
    ) -> Self {
        Self {
            caroot: caroot.to_path_buf(),
            names,
            cert_file: Some(cert_file),
            key_file: Some(key_file),
            validity_days,
        }
    }

    /// True if this request only initializes the root CA.
    #[must_use]
    pub fn is_root_ca(&self) -> bool {
        self.names.is_empty()
    }

    /// Command line arguments for mkcert.
    #[must_use]
    pub fn args(&self, validity_flag: Option<&str>) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(cert_file) = &self.cert_file {
            args.push("-cert-file".to_string());
            args.push(cert_file.display().to_string());
        }
        if let Some(key_file) = &self.key_file {
            args.push("-key-file".to_string());
            args.push(key_file.display().to_string());
        }
        if let (Some(flag), Some(days)) = (validity_flag, self.validity_days) {
            args.push(flag.to_string());
            args.push(days.to_string());
        }
        args.extend(self.names.iter().cloned());
        args
    }
}

/// Capabilities the minting tool needs from the outside world.
#[async_trait]
pub trait MintBackend: Send + Sync {
    /// Look for an installed tool on the process search path.
    fn search_path(&self) -> Option<PathBuf>;

    /// Fetch the tool binary to `target`.
    async fn acquire(&self, target: &Path) -> Result<()>;

    /// Run the tool. Fails with [`CertError::Generation`] on a non-zero exit.
    async fn invoke(&self, binary: &Path, request: &MintRequest) -> Result<()>;
}

/// The real backend: PATH lookup, release download and `mkcert` processes
#[derive(Debug, Clone)]
pub struct MkcertBackend {
    config: MintConfig,
    http: HttpClient,
}

impl MkcertBackend {
    /// Create a backend for `config`
    #[must_use]
    pub fn new(config: MintConfig) -> Self {
        Self {
            config,
            http: HttpClient::new(),
        }
    }
}

#[async_trait]
impl MintBackend for MkcertBackend {
    fn search_path(&self) -> Option<PathBuf> {
        let binary = self.config.binary_name();
        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths)
            .map(|dir| dir.join(&binary))
            .find(|candidate| candidate.is_file())
    }

    async fn acquire(&self, target: &Path) -> Result<()> {
        let url = self.config.download_url()?;
        download::fetch(&self.http, &url, target).await
    }

    async fn invoke(&self, binary: &Path, request: &MintRequest) -> Result<()> {
        if request.validity_days.is_some() && self.config.validity_flag.is_none() {
            warn!(
                days = ?request.validity_days,
                "no validity flag configured, tool default lifetime applies"
            );
        }

        let args = request.args(self.config.validity_flag.as_deref());
        debug!(binary = %binary.display(), args = ?args, "running minting tool");

        let output = Command::new(binary)
            .env(CAROOT_ENV, &request.caroot)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                CertError::Generation(format!("cannot run {}: {e}", binary.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CertError::Generation(format!(
                "{} exited with {}: {}",
                binary.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_request_has_no_arguments() {
        let request = MintRequest::root_ca(Path::new("/cache"));
        assert!(request.is_root_ca());
        assert!(request.args(Some("-days")).is_empty());
    }

    #[test]
    fn leaf_request_arguments() {
        let request = MintRequest::leaf(
            Path::new("/cache"),
            vec!["example.com".into(), "*.example.com".into()],
            PathBuf::from("/tmp/leaf.crt"),
            PathBuf::from("/tmp/leaf.key"),
            Some(30),
        );
        assert_eq!(
            request.args(None),
            vec![
                "-cert-file",
                "/tmp/leaf.crt",
                "-key-file",
                "/tmp/leaf.key",
                "example.com",
                "*.example.com"
            ]
        );
        let with_days = request.args(Some("-days"));
        assert_eq!(&with_days[4..6], ["-days", "30"]);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn failing_process_is_a_generation_error() {
        let backend = MkcertBackend::new(MintConfig::default());
        let request = MintRequest::root_ca(Path::new("/nonexistent"));
        let err = backend
            .invoke(Path::new("/bin/false"), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, CertError::Generation(_)));

        let err = backend
            .invoke(Path::new("/nonexistent/mkcert"), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, CertError::Generation(_)));
    }
}
