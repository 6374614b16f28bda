//! `certkeys rootca` - The local root CA.

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use super::Context;
use crate::cli::args::{RootcaArgs, RootcaCommands};
use crate::output::OutputFormat;

pub async fn execute(ctx: Context, args: RootcaArgs) -> Result<()> {
    match args.command {
        RootcaCommands::Show => show(ctx).await,
        RootcaCommands::Reset => reset(ctx).await,
    }
}

async fn show(ctx: Context) -> Result<()> {
    let store = ctx.store().await?;
    let root = store.root_ca().await?;

    match ctx.output_format {
        OutputFormat::Json => OutputFormat::print_json(&json!({
            "crt_file": root.crt_file(),
            "key_file": root.key_file(),
            "not_after": root.not_after().to_rfc3339(),
            "days_remaining": root.not_after_days(),
        }))?,
        OutputFormat::Pretty => {
            let days = root.not_after_days();
            let status = format!("{root}");
            let status = if days > 90 {
                status.green()
            } else if days > 0 {
                status.yellow()
            } else {
                status.red()
            };
            println!("{} {}", "Root CA:".bold(), status);
            println!("  {} {}", "Certificate:".bold(), root.crt_file().display());
            println!("  {} {}", "Key:".bold(), root.key_file().display());
            println!("  {} {}", "Expires:".bold(), root.not_after().to_rfc3339());
        }
    }

    Ok(())
}

async fn reset(ctx: Context) -> Result<()> {
    let store = ctx.store().await?;
    store.reset_root_ca().await?;

    println!("{} root CA removed.", "Success:".green().bold());
    println!(
        "{}",
        "Certificates minted from now on use a new CA; existing ones are no longer trusted by it."
            .dimmed()
    );
    Ok(())
}
