//! Generated certificate artifacts.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CertError, Result};
use crate::fs::{self, PUBLIC_FILE_MODE, SECRET_FILE_MODE};
use crate::x509::{self, CertSummary};

/// Certificate, private key and combined PEM produced by the minting tool.
///
/// On disk a bundle at `path` is three side-files: `path.crt`, `path.key`
/// and `path.pem`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertBundle {
    crt: String,
    key: String,
    pem: String,
    general_names: Vec<String>,
}

impl CertBundle {
    /// Side-file extension for the certificate.
    pub const CRT_EXT: &'static str = "crt";
    /// Side-file extension for the private key.
    pub const KEY_EXT: &'static str = "key";
    /// Side-file extension for the combined PEM.
    pub const PEM_EXT: &'static str = "pem";

    /// Build a bundle; the PEM is the certificate followed by the key.
    #[must_use]
    pub fn new(crt: String, key: String, general_names: Vec<String>) -> Self {
        let pem = Self::combine(&crt, &key);
        Self {
            crt,
            key,
            pem,
            general_names,
        }
    }

    /// Combined PEM form of a certificate and key.
    #[must_use]
    pub fn combine(crt: &str, key: &str) -> String {
        format!("{}\n{}\n", crt.trim_end(), key.trim_end())
    }

    /// Certificate PEM
    #[must_use]
    pub fn crt(&self) -> &str {
        &self.crt
    }

    /// Private key PEM
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Certificate followed by key
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// Names this bundle was requested for
    #[must_use]
    pub fn general_names(&self) -> &[String] {
        &self.general_names
    }

    /// Parse the certificate.
    pub fn inspect(&self) -> Result<CertSummary> {
        x509::inspect(&self.crt)
    }

    /// Paths of the `crt`, `key` and `pem` side-files for `path`.
    #[must_use]
    pub fn side_files(path: &Path) -> [PathBuf; 3] {
        [Self::CRT_EXT, Self::KEY_EXT, Self::PEM_EXT].map(|ext| {
            let mut file = OsString::from(path.as_os_str());
            file.push(".");
            file.push(ext);
            PathBuf::from(file)
        })
    }

    /// Write the side-files, creating parent directories.
    ///
    /// Nothing is overwritten: if any side-file already exists this fails
    /// with [`CertError::AlreadyExists`].
    pub async fn dump(&self, path: &Path) -> Result<()> {
        let files = Self::side_files(path);
        for file in &files {
            if fs::exists(file).await? {
                return Err(CertError::already_exists(file.display().to_string()));
            }
        }

        self.write_side_files(&files).await?;
        debug!(path = %path.display(), "bundle written");
        Ok(())
    }

    /// Write each side-file with no-clobber semantics. On failure only the
    /// files written by this call are removed.
    async fn write_side_files(&self, files: &[PathBuf; 3]) -> Result<()> {
        let contents = [
            (self.crt.as_str(), PUBLIC_FILE_MODE),
            (self.key.as_str(), SECRET_FILE_MODE),
            (self.pem.as_str(), SECRET_FILE_MODE),
        ];

        let mut written: Vec<&PathBuf> = Vec::with_capacity(files.len());
        for (file, (content, mode)) in files.iter().zip(contents) {
            if let Err(e) = fs::write_new(file, content, mode).await {
                for done in written {
                    let _ = fs::remove_if_exists(done).await;
                }
                return Err(e);
            }
            written.push(file);
        }
        Ok(())
    }

    /// Read a bundle written by [`CertBundle::dump`].
    ///
    /// General names are recovered from the certificate's subjectAltName
    /// extension.
    pub async fn load(path: &Path) -> Result<Self> {
        let [crt_file, key_file, pem_file] = Self::side_files(path);
        let crt = fs::read_required(&crt_file).await?;
        let key = fs::read_required(&key_file).await?;
        let pem = fs::read_required(&pem_file).await?;
        let general_names = x509::inspect(&crt)?.alt_names;

        Ok(Self {
            crt,
            key,
            pem,
            general_names,
        })
    }

    /// Delete the side-files. Returns whether any existed.
    pub async fn remove(path: &Path) -> Result<bool> {
        let mut removed = false;
        for file in Self::side_files(path) {
            removed |= fs::remove_if_exists(&file).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn minted(names: &[&str]) -> CertBundle {
        let names: Vec<String> = names.iter().map(ToString::to_string).collect();
        let certified = rcgen::generate_simple_self_signed(names.clone()).unwrap();
        CertBundle::new(
            certified.cert.pem(),
            certified.key_pair.serialize_pem(),
            names,
        )
    }

    #[test]
    fn pem_is_crt_then_key() {
        let bundle = CertBundle::new("CRT\n".into(), "KEY".into(), vec![]);
        assert_eq!(bundle.pem(), "CRT\nKEY\n");
    }

    #[test]
    fn side_files_keep_dotted_names() {
        let [crt, key, pem] = CertBundle::side_files(Path::new("/cache/example.com"));
        assert_eq!(crt, Path::new("/cache/example.com.crt"));
        assert_eq!(key, Path::new("/cache/example.com.key"));
        assert_eq!(pem, Path::new("/cache/example.com.pem"));
    }

    #[tokio::test]
    async fn load_missing_bundle() {
        let dir = TempDir::new().unwrap();
        let err = CertBundle::load(&dir.path().join("test")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn dump_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test").join("example");
        let bundle = minted(&["example.com", "localhost", "127.0.0.1"]);

        bundle.dump(&path).await.unwrap();
        let err = bundle.dump(&path).await.unwrap_err();
        assert!(err.is_already_exists());

        let loaded = CertBundle::load(&path).await.unwrap();
        assert_eq!(loaded.crt(), bundle.crt());
        assert_eq!(loaded.key(), bundle.key());
        assert_eq!(loaded.pem(), bundle.pem());
        assert_eq!(loaded.general_names(), bundle.general_names());

        assert!(CertBundle::remove(&path).await.unwrap());
        assert!(!CertBundle::remove(&path).await.unwrap());
    }

    #[tokio::test]
    async fn failed_dump_keeps_foreign_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("race");
        let bundle = minted(&["example.com"]);
        let files = CertBundle::side_files(&path);
        let [crt_file, key_file, pem_file] = &files;
        std::fs::write(pem_file, "written by someone else").unwrap();

        let err = bundle.write_side_files(&files).await.unwrap_err();
        assert!(err.is_already_exists());
        assert!(!crt_file.exists());
        assert!(!key_file.exists());
        assert_eq!(std::fs::read_to_string(pem_file).unwrap(), "written by someone else");
    }
}
