//! Local development certificates backed by mkcert.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use certkeys::CertificateStore;
//!
//! #[tokio::main]
//! async fn main() -> certkeys::Result<()> {
//!     let store = CertificateStore::open("~/.certkeys").await?;
//!
//!     let mut web = store.lookup("web").await?;
//!     web.lookup("example.test").set_include_subdomains(true);
//!     web.lookup("127.0.0.1");
//!     web.save().await?;
//!
//!     let bundle = web.read(true).await?;
//!     println!("{}", bundle.pem());
//!     println!("{}", store.root_ca().await?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Uses rustls for the tool download
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS
//! - `testing` - Expose `mint::testing::FakeMkcert` for tests without mkcert

// Re-export core types
pub use certkeys_core::*;

// Re-export the minting tool
pub use certkeys_mint as mint;
pub use certkeys_mint::{MintConfig, MintingTool, RootCa};

// Re-export the store
pub use certkeys_store::{
    CertificateBinding, CertificateStore, IdentityRecord, IdentityRegistry, DEFAULT_CONFIG,
};

// Re-export runtime for convenience
pub use tokio;
