//! `certkeys config` - CLI configuration management.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::Config;
use crate::output::OutputFormat;

pub async fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Set { key, value } => set_config(&key, &value),
        ConfigCommands::Path => show_path(),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = Config::load()?;

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        OutputFormat::Pretty => {
            let unset = || "(not set)".dimmed().to_string();

            println!("{}", "Current Configuration:".bold());
            println!();
            println!(
                "  {} {}",
                "home:".bold(),
                config.home.clone().unwrap_or_else(unset)
            );
            println!("  {} {}", "  resolved:".dimmed(), ctx.home.display());
            println!(
                "  {} {}",
                "output_format:".bold(),
                config.output_format.unwrap_or_default()
            );
            println!(
                "  {} {}",
                "validity_flag:".bold(),
                config.validity_flag.clone().unwrap_or_else(unset)
            );
            println!(
                "  {} {}",
                "default_validity_days:".bold(),
                config
                    .default_validity_days
                    .map_or_else(unset, |d| d.to_string())
            );
        }
    }

    Ok(())
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;

    match key {
        "home" => {
            config.home = Some(value.to_string());
            println!("{} home set to {}.", "Success:".green().bold(), value.cyan());
        }
        "output_format" | "output" => {
            config.output_format = Some(value.parse()?);
            println!("{} Output format set to {}.", "Success:".green().bold(), value.cyan());
        }
        "validity_flag" => {
            config.validity_flag = Some(value.to_string()).filter(|v| !v.is_empty());
            println!("{} validity_flag set to {}.", "Success:".green().bold(), value);
        }
        "default_validity_days" | "validity" => {
            let days: u32 = value.parse()?;
            config.default_validity_days = (days > 0).then_some(days);
            println!("{} default_validity_days set to {}.", "Success:".green().bold(), value);
        }
        _ => {
            anyhow::bail!(
                "Unknown config key: {}\n\n\
                 Available keys:\n  \
                 home                  - Store base directory\n  \
                 output_format         - Default output format (pretty/json)\n  \
                 validity_flag         - mkcert flag taking a validity in days\n  \
                 default_validity_days - Validity for identities without one (0 clears)",
                key
            );
        }
    }

    config.save()?;

    Ok(())
}

fn show_path() -> Result<()> {
    let path = Config::path()?;
    println!("{}", path.display());
    Ok(())
}
