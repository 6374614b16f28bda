//! `certkeys tool` - The mkcert binary.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use super::Context;
use crate::cli::args::{ToolArgs, ToolCommands};
use crate::output::OutputFormat;

pub async fn execute(ctx: Context, args: ToolArgs) -> Result<()> {
    match args.command {
        ToolCommands::Which => which(ctx).await,
        ToolCommands::Download { file } => download(ctx, file.as_deref()).await,
    }
}

async fn which(ctx: Context) -> Result<()> {
    let store = ctx.store().await?;
    let binary = store.tool().which().await?;

    match ctx.output_format {
        OutputFormat::Json => OutputFormat::print_json(&json!({ "binary": binary }))?,
        OutputFormat::Pretty => println!("{}", binary.display()),
    }
    Ok(())
}

async fn download(ctx: Context, file: Option<&Path>) -> Result<()> {
    let store = ctx.store().await?;
    let tool = store.tool();
    let target = file.map_or_else(|| tool.cached_binary(), Path::to_path_buf);

    if ctx.verbose {
        println!("{} {}", "Source:".bold(), tool.config().download_url()?);
    }
    tool.download(Some(&target)).await?;

    println!("{} {}", "Ready:".green().bold(), target.display());
    Ok(())
}
