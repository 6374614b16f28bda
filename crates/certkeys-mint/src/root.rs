//! Locally generated root certificate authority.

use std::fmt;
use std::path::{Path, PathBuf};

use certkeys_core::{fs, x509, CertError, Result};
use chrono::{DateTime, Utc};

/// Root CA files in the tool's cache directory, with their expiry.
///
/// Expiry is informational: nothing regenerates an old CA until
/// [`MintingTool::reset`](crate::MintingTool::reset) is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootCa {
    crt_file: PathBuf,
    key_file: PathBuf,
    crt: String,
    key: String,
    not_after: DateTime<Utc>,
    not_after_days: i64,
}

impl RootCa {
    /// Certificate file name, as mkcert writes it under `CAROOT`.
    pub const CRT_NAME: &'static str = "rootCA.pem";
    /// Key file name, as mkcert writes it under `CAROOT`.
    pub const KEY_NAME: &'static str = "rootCA-key.pem";

    /// Certificate path inside `dir`
    #[must_use]
    pub fn crt_file_in(dir: &Path) -> PathBuf {
        dir.join(Self::CRT_NAME)
    }

    /// Key path inside `dir`
    #[must_use]
    pub fn key_file_in(dir: &Path) -> PathBuf {
        dir.join(Self::KEY_NAME)
    }

    /// Load the CA from `dir`, or `None` unless both files are present.
    pub async fn load(dir: &Path) -> Result<Option<Self>> {
        let crt_file = Self::crt_file_in(dir);
        let key_file = Self::key_file_in(dir);

        let (Some(crt), Some(key)) = (
            fs::read_optional(&crt_file).await?,
            fs::read_optional(&key_file).await?,
        ) else {
            return Ok(None);
        };

        let summary = x509::inspect(&crt).map_err(|e| {
            CertError::Certificate(format!("{}: {e}", crt_file.display()))
        })?;

        Ok(Some(Self {
            crt_file,
            key_file,
            crt,
            key,
            not_after: summary.not_after,
            not_after_days: summary.days_remaining(),
        }))
    }

    /// Certificate path
    #[must_use]
    pub fn crt_file(&self) -> &Path {
        &self.crt_file
    }

    /// Key path
    #[must_use]
    pub fn key_file(&self) -> &Path {
        &self.key_file
    }

    /// Certificate PEM
    #[must_use]
    pub fn crt(&self) -> &str {
        &self.crt
    }

    /// Key PEM
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Not valid after
    #[must_use]
    pub const fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Days left when the CA was loaded
    #[must_use]
    pub const fn not_after_days(&self) -> i64 {
        self.not_after_days
    }
}

impl fmt::Display for RootCa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CA(expire after {} days)", self.not_after_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_requires_both_files() {
        let dir = TempDir::new().unwrap();
        assert!(RootCa::load(dir.path()).await.unwrap().is_none());

        crate::testing::write_root_ca(dir.path());
        std::fs::remove_file(RootCa::key_file_in(dir.path())).unwrap();
        assert!(RootCa::load(dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn load_reads_expiry() {
        let dir = TempDir::new().unwrap();
        crate::testing::write_root_ca(dir.path());

        let ca = RootCa::load(dir.path()).await.unwrap().unwrap();
        assert!(ca.not_after_days() > 0);
        assert_eq!(
            ca.to_string(),
            format!("CA(expire after {} days)", ca.not_after_days())
        );
        assert_eq!(ca.crt_file(), dir.path().join("rootCA.pem"));
    }

    #[tokio::test]
    async fn corrupt_certificate_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(RootCa::crt_file_in(dir.path()), "garbage").unwrap();
        std::fs::write(RootCa::key_file_in(dir.path()), "garbage").unwrap();

        let err = RootCa::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, CertError::Certificate(_)));
    }
}
