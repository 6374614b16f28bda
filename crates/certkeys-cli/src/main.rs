//! certkeys - local development certificates
//!
//! Keeps named identities, a private root CA and the leaf certificates
//! minted for them.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    certkeys_cli::run().await
}
