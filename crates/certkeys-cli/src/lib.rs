//! # certkeys-cli
//!
//! Command-line interface for the certkeys store.
//!
//! ## Features
//!
//! - **Identities**: add, remove and inspect the names an identity covers
//! - **Certificates**: read cached bundles or mint new ones with mkcert
//! - **Root CA**: show expiry or start over with a fresh CA
//! - **Multiple output formats**: Pretty tables or JSON

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
