//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Local development certificates
///
/// Group hostnames and addresses into identities, then mint certificates
/// for them with mkcert and a private root CA.
#[derive(Parser, Debug)]
#[command(name = "certkeys")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Store base directory (or set CERTKEYS_HOME env var)
    #[arg(long, env = "CERTKEYS_HOME", global = true)]
    pub home: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage identities and their certificates
    Cert(CertArgs),

    /// Inspect or replace the local root CA
    Rootca(RootcaArgs),

    /// Locate or download the mkcert binary
    Tool(ToolArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),
}

// ============================================================================
// Cert command
// ============================================================================

#[derive(Args, Debug)]
pub struct CertArgs {
    #[command(subcommand)]
    pub command: CertCommands,
}

#[derive(Subcommand, Debug)]
pub enum CertCommands {
    /// List identities
    List,

    /// Add names to an identity, creating it if needed
    Add {
        /// Identity name
        identity: String,

        /// Domains or IP addresses
        #[arg(required = true)]
        names: Vec<String>,

        /// Also cover every subdomain (*.name)
        #[arg(long)]
        subdomains: bool,

        /// Also cover the address the domain resolves to
        #[arg(long)]
        getaddress: bool,
    },

    /// Remove names from an identity
    Remove {
        /// Identity name
        identity: String,

        /// Domains or IP addresses
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Show the names of an identity and its certificate status
    Show {
        /// Identity name
        identity: String,
    },

    /// Set the requested certificate validity
    Validity {
        /// Identity name
        identity: String,

        /// Days; 0 clears the setting
        days: u32,
    },

    /// Print or export the certificate of an identity
    Read {
        /// Identity name
        identity: String,

        /// Mint a certificate when none is cached
        #[arg(short, long)]
        generate: bool,

        /// Write PATH.crt, PATH.key and PATH.pem instead of printing
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// Delete an identity
    Delete {
        /// Identity name
        identity: String,

        /// Also remove the cached certificate
        #[arg(long)]
        purge: bool,
    },
}

// ============================================================================
// Root CA command
// ============================================================================

#[derive(Args, Debug)]
pub struct RootcaArgs {
    #[command(subcommand)]
    pub command: RootcaCommands,
}

#[derive(Subcommand, Debug)]
pub enum RootcaCommands {
    /// Show the root CA, creating it on first use
    Show,

    /// Delete the root CA; the next certificate creates a new one
    Reset,
}

// ============================================================================
// Tool command
// ============================================================================

#[derive(Args, Debug)]
pub struct ToolArgs {
    #[command(subcommand)]
    pub command: ToolCommands,
}

#[derive(Subcommand, Debug)]
pub enum ToolCommands {
    /// Print the mkcert binary in use, downloading it if needed
    Which,

    /// Download mkcert
    Download {
        /// Target file (defaults to the store cache)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Key to set (e.g., home, output_format)
        key: String,

        /// Value to set
        value: String,
    },

    /// Show config file path
    Path,
}
