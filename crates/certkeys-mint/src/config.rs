//! Minting tool configuration.

use std::env::consts;

use certkeys_core::{CertError, Result};
use url::Url;

/// Program name of the minting tool.
pub const DEFAULT_PROGRAM: &str = "mkcert";

/// Release downloaded when the tool is missing.
pub const DEFAULT_VERSION: &str = "1.4.4";

/// Base URL of the tool's release artifacts.
pub const DEFAULT_RELEASE_URL: &str = "https://github.com/FiloSottile/mkcert/releases/download";

/// Where to find the minting tool and how to call it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintConfig {
    /// Program name, also the cached binary's file name
    pub program: String,

    /// Release version to download
    pub version: String,

    /// Base URL of release artifacts
    pub release_url: String,

    /// Flag that passes a validity period in days, for tool builds that
    /// support one. Upstream mkcert does not.
    pub validity_flag: Option<String>,

    /// Validity used when neither the caller nor the identity sets one
    pub default_validity_days: Option<u32>,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            version: DEFAULT_VERSION.to_string(),
            release_url: DEFAULT_RELEASE_URL.to_string(),
            validity_flag: None,
            default_validity_days: None,
        }
    }
}

impl MintConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the program name
    #[must_use]
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the release version
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the release base URL
    #[must_use]
    pub fn release_url(mut self, url: impl Into<String>) -> Self {
        self.release_url = url.into();
        self
    }

    /// Set the validity flag
    #[must_use]
    pub fn validity_flag(mut self, flag: impl Into<String>) -> Self {
        self.validity_flag = Some(flag.into());
        self
    }

    /// Set the fallback validity
    #[must_use]
    pub const fn default_validity_days(mut self, days: u32) -> Self {
        self.default_validity_days = Some(days);
        self
    }

    /// File name of the binary on this platform
    #[must_use]
    pub fn binary_name(&self) -> String {
        format!("{}{}", self.program, consts::EXE_SUFFIX)
    }

    /// Release artifact name for this platform, e.g. `mkcert-v1.4.4-linux-amd64`
    pub fn artifact_name(&self) -> Result<String> {
        let os = match consts::OS {
            "linux" => "linux",
            "macos" => "darwin",
            "windows" => "windows",
            other => return Err(unsupported("operating system", other)),
        };
        let arch = match consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "arm" => "arm",
            other => return Err(unsupported("architecture", other)),
        };
        Ok(format!(
            "{}-v{}-{os}-{arch}{}",
            self.program,
            self.version,
            consts::EXE_SUFFIX
        ))
    }

    /// Full download URL of the release artifact
    pub fn download_url(&self) -> Result<Url> {
        let raw = format!(
            "{}/v{}/{}",
            self.release_url.trim_end_matches('/'),
            self.version,
            self.artifact_name()?
        );
        Url::parse(&raw).map_err(|e| CertError::Download(format!("invalid URL {raw}: {e}")))
    }
}

fn unsupported(what: &str, value: &str) -> CertError {
    CertError::Download(format!("no {DEFAULT_PROGRAM} release for {what} '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MintConfig::default();
        assert_eq!(config.program, "mkcert");
        assert_eq!(config.version, "1.4.4");
        assert!(config.validity_flag.is_none());
        assert!(config.binary_name().starts_with("mkcert"));
    }

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[test]
    fn test_download_url() {
        let url = MintConfig::new()
            .release_url("https://example.test/releases/")
            .version("1.4.4")
            .download_url()
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/releases/v1.4.4/mkcert-v1.4.4-linux-amd64"
        );
    }

    #[test]
    fn test_invalid_release_url() {
        let err = MintConfig::new().release_url("not a url").download_url();
        assert!(matches!(err, Err(CertError::Download(_))));
    }
}
