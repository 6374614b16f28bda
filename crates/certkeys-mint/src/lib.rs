//! Minting tool management for certkeys.
//!
//! [`MintingTool`] wraps an external certificate minting binary (mkcert):
//! it finds or downloads the binary, keeps a root CA in its cache directory
//! and produces leaf [`CertBundle`](certkeys_core::CertBundle)s for a set of
//! general names.
//!
//! Process and network access sit behind the [`MintBackend`] trait so the
//! state machines here can run against a fake backend.

#![doc(html_root_url = "https://docs.rs/certkeys-mint/0.3.0")]

mod backend;
mod config;
mod download;
mod root;
mod tool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{MintBackend, MintRequest, MkcertBackend};
pub use config::*;
pub use download::fetch;
pub use root::RootCa;
pub use tool::{MintingTool, MintingToolBuilder};
pub use certkeys_core::{CertError, Result};
