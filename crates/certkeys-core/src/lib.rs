//! Core types and errors for the certkeys certificate store.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - **Types**: [`GeneralName`] entries and generated [`CertBundle`]s
//! - **Errors**: a single taxonomy in [`CertError`]
//! - **Files**: atomic write / complete read helpers in [`fs`]
//!
//! # Example
//!
//! ```rust,ignore
//! use certkeys_core::{GeneralName, Result};
//!
//! async fn expand() -> Result<Vec<String>> {
//!     let mut name = GeneralName::new("example.com");
//!     name.set_include_subdomains(true);
//!     name.values().await // ["example.com", "*.example.com"]
//! }
//! ```

mod error;
pub mod fs;
pub mod types;
pub mod x509;

pub use error::{CertError, Result};
pub use types::*;
