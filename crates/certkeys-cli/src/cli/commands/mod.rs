//! Command implementations.

pub mod cert;
pub mod config;
pub mod rootca;
pub mod tool;

use std::path::PathBuf;

use certkeys::{CertificateStore, MintConfig};

use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Store base directory
    pub home: PathBuf,

    /// Minting tool settings
    pub mint: MintConfig,

    /// Output format
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,
}

impl Context {
    /// Open the store at the configured home.
    pub async fn store(&self) -> anyhow::Result<CertificateStore> {
        let store = CertificateStore::open_with_config(&self.home, self.mint.clone()).await?;
        Ok(store)
    }
}
