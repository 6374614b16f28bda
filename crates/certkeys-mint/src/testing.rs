//! Fake minting backend for tests.
//!
//! Behaves like mkcert against a `CAROOT` directory but mints with `rcgen`,
//! so certificates are real X.509 and can be inspected.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use certkeys_core::fs::{self, EXECUTABLE_MODE};
use certkeys_core::{CertError, Result};

use crate::backend::{MintBackend, MintRequest};
use crate::root::RootCa;

/// Call counts observed by a [`FakeMkcert`].
#[derive(Debug, Default)]
pub struct FakeCounters {
    /// Successful downloads
    pub acquired: AtomicUsize,
    /// Root CAs created
    pub root_created: AtomicUsize,
    /// Leaf certificates minted
    pub leaves: AtomicUsize,
}

/// In-process stand-in for the mkcert binary.
#[derive(Debug, Clone, Default)]
pub struct FakeMkcert {
    on_path: Option<PathBuf>,
    offline: bool,
    broken: bool,
    counters: Arc<FakeCounters>,
}

impl FakeMkcert {
    /// A fake with no tool on PATH and working downloads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `path` as the tool found on PATH.
    #[must_use]
    pub fn on_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.on_path = Some(path.into());
        self
    }

    /// Make every download fail.
    #[must_use]
    pub const fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Make every invocation exit non-zero.
    #[must_use]
    pub const fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    /// Shared call counters, still readable after the fake is moved.
    #[must_use]
    pub fn counters(&self) -> Arc<FakeCounters> {
        Arc::clone(&self.counters)
    }
}

impl FakeCounters {
    /// Downloads so far
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Root CAs created so far
    pub fn root_created(&self) -> usize {
        self.root_created.load(Ordering::SeqCst)
    }

    /// Leaves minted so far
    pub fn leaves(&self) -> usize {
        self.leaves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MintBackend for FakeMkcert {
    fn search_path(&self) -> Option<PathBuf> {
        self.on_path.clone()
    }

    async fn acquire(&self, target: &Path) -> Result<()> {
        if self.offline {
            return Err(CertError::Download("network unreachable".to_string()));
        }
        fs::write_atomic(target, "#!/bin/sh\nexit 0\n", EXECUTABLE_MODE).await?;
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn invoke(&self, _binary: &Path, request: &MintRequest) -> Result<()> {
        if self.broken {
            return Err(CertError::Generation("exit status: 1".to_string()));
        }

        // mkcert creates its CA on every run that finds none.
        if RootCa::load(&request.caroot).await?.is_none() {
            write_root_ca(&request.caroot);
            self.counters.root_created.fetch_add(1, Ordering::SeqCst);
        }
        if request.is_root_ca() {
            return Ok(());
        }

        let (Some(cert_file), Some(key_file)) = (&request.cert_file, &request.key_file) else {
            return Err(CertError::Generation("missing output files".to_string()));
        };
        let minted = rcgen::generate_simple_self_signed(request.names.clone())
            .map_err(|e| CertError::Generation(e.to_string()))?;
        tokio::fs::write(cert_file, minted.cert.pem())
            .await
            .map_err(|e| CertError::io(cert_file, e))?;
        tokio::fs::write(key_file, minted.key_pair.serialize_pem())
            .await
            .map_err(|e| CertError::io(key_file, e))?;
        self.counters.leaves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Write a self-signed root CA into `dir` using mkcert's file names.
///
/// # Panics
///
/// Panics if the CA cannot be generated or written.
pub fn write_root_ca(dir: &Path) {
    let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).expect("params");
    params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, "certkeys test root");
    params.not_after = rcgen::date_time_ymd(2099, 12, 31);
    let key = rcgen::KeyPair::generate().expect("key pair");
    let cert = params.self_signed(&key).expect("self-signed root");

    std::fs::create_dir_all(dir).expect("caroot");
    std::fs::write(RootCa::crt_file_in(dir), cert.pem()).expect("root crt");
    std::fs::write(RootCa::key_file_in(dir), key.serialize_pem()).expect("root key");
}
