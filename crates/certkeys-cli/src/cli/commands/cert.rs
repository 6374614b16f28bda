//! `certkeys cert` - Identities and their certificates.

use std::path::Path;

use anyhow::{bail, Result};
use certkeys::{CertBundle, CertificateBinding, CertificateStore, GeneralName};
use colored::Colorize;
use serde_json::json;
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::args::{CertArgs, CertCommands};
use crate::output::OutputFormat;

#[derive(Tabled)]
struct IdentityRow {
    #[tabled(rename = "Identity")]
    name: String,
    #[tabled(rename = "Names")]
    names: usize,
    #[tabled(rename = "Validity")]
    validity: String,
}

#[derive(Tabled)]
struct NameRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Subdomains")]
    subdomains: &'static str,
    #[tabled(rename = "Address")]
    address: &'static str,
}

impl From<&GeneralName> for NameRow {
    fn from(gn: &GeneralName) -> Self {
        Self {
            name: gn.name().to_string(),
            kind: if gn.is_domain() { "domain" } else { "ip" },
            subdomains: yes_no(gn.include_subdomains()),
            address: yes_no(gn.resolve_address()),
        }
    }
}

const fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn validity_label(days: Option<u32>) -> String {
    days.map_or_else(|| "default".to_string(), |d| format!("{d} days"))
}

pub async fn execute(ctx: Context, args: CertArgs) -> Result<()> {
    let store = ctx.store().await?;

    match args.command {
        CertCommands::List => list(&ctx, &store).await,
        CertCommands::Add {
            identity,
            names,
            subdomains,
            getaddress,
        } => add(&store, &identity, &names, subdomains, getaddress).await,
        CertCommands::Remove { identity, names } => remove(&store, &identity, &names).await,
        CertCommands::Show { identity } => show(&ctx, &store, &identity).await,
        CertCommands::Validity { identity, days } => validity(&store, &identity, days).await,
        CertCommands::Read {
            identity,
            generate,
            out,
        } => read(&ctx, &store, &identity, generate, out.as_deref()).await,
        CertCommands::Delete { identity, purge } => delete(&store, &identity, purge).await,
    }
}

/// Binding for an identity that must already be saved.
async fn existing(store: &CertificateStore, identity: &str) -> Result<CertificateBinding> {
    if !store.registry().contains(identity).await? {
        bail!(
            "Unknown identity: {}\n\n\
             Create it with: certkeys cert add {} <names..>",
            identity,
            identity
        );
    }
    Ok(store.lookup(identity).await?)
}

async fn list(ctx: &Context, store: &CertificateStore) -> Result<()> {
    let mut bindings = Vec::new();
    for name in store.names().await? {
        bindings.push(store.lookup(&name).await?);
    }

    match ctx.output_format {
        OutputFormat::Json => {
            let items: Vec<_> = bindings
                .iter()
                .map(|b| {
                    json!({
                        "identity": b.name(),
                        "names": b.record().iter().map(GeneralName::name).collect::<Vec<_>>(),
                        "validity_days": b.validity(),
                    })
                })
                .collect();
            OutputFormat::print_json(&json!(items))?;
        }
        OutputFormat::Pretty => {
            if bindings.is_empty() {
                println!("{}", "No identities yet.".dimmed());
                println!("{}", "Tip: certkeys cert add <identity> <names..>".dimmed());
                return Ok(());
            }
            let rows: Vec<IdentityRow> = bindings
                .iter()
                .map(|b| IdentityRow {
                    name: b.name().to_string(),
                    names: b.record().len(),
                    validity: validity_label(b.validity()),
                })
                .collect();
            println!("{}", Table::new(&rows).with(Style::rounded()));
        }
    }

    Ok(())
}

async fn add(
    store: &CertificateStore,
    identity: &str,
    names: &[String],
    subdomains: bool,
    getaddress: bool,
) -> Result<()> {
    let mut binding = store.lookup(identity).await?;
    for name in names {
        let gn = binding.lookup(name);
        if subdomains {
            gn.set_include_subdomains(true);
        }
        if getaddress {
            gn.set_resolve_address(true);
        }
    }
    binding.save().await?;

    println!(
        "{} {} now covers {} name(s).",
        "Success:".green().bold(),
        identity.cyan(),
        binding.record().len()
    );
    Ok(())
}

async fn remove(store: &CertificateStore, identity: &str, names: &[String]) -> Result<()> {
    let mut binding = existing(store, identity).await?;
    for name in names {
        if binding.get(name).is_none() {
            println!("{} {} is not part of {}", "Skipped:".yellow(), name, identity);
        }
        binding.delete(name);
    }
    binding.save().await?;

    println!(
        "{} {} now covers {} name(s).",
        "Success:".green().bold(),
        identity.cyan(),
        binding.record().len()
    );
    Ok(())
}

async fn show(ctx: &Context, store: &CertificateStore, identity: &str) -> Result<()> {
    let binding = existing(store, identity).await?;
    let cached = binding.cached().await?;
    let summary = cached.as_ref().map(CertBundle::inspect).transpose()?;

    match ctx.output_format {
        OutputFormat::Json => {
            let names: Vec<_> = binding
                .record()
                .iter()
                .map(|gn| {
                    json!({
                        "generalname": gn.name(),
                        "is_domain": gn.is_domain(),
                        "subdomains": gn.include_subdomains(),
                        "getaddress": gn.resolve_address(),
                    })
                })
                .collect();
            OutputFormat::print_json(&json!({
                "identity": binding.name(),
                "validity_days": binding.validity(),
                "names": names,
                "certificate": summary.as_ref().map(|s| json!({
                    "not_after": s.not_after.to_rfc3339(),
                    "alt_names": s.alt_names,
                })),
            }))?;
        }
        OutputFormat::Pretty => {
            println!("{} {}", "Identity:".bold(), binding.name().cyan());
            println!("{} {}", "Validity:".bold(), validity_label(binding.validity()));
            if ctx.verbose {
                println!("{} {}", "File:".bold(), binding.record().path().display());
            }
            println!();

            let rows: Vec<NameRow> = binding.record().iter().map(NameRow::from).collect();
            if rows.is_empty() {
                println!("{}", "No names yet.".dimmed());
            } else {
                println!("{}", Table::new(&rows).with(Style::rounded()));
            }

            println!();
            match summary {
                Some(s) => println!(
                    "{} cached, expires in {} days",
                    "Certificate:".bold(),
                    s.days_remaining()
                ),
                None => println!(
                    "{} {}",
                    "Certificate:".bold(),
                    "none (use 'cert read --generate')".dimmed()
                ),
            }
        }
    }

    Ok(())
}

async fn validity(store: &CertificateStore, identity: &str, days: u32) -> Result<()> {
    let mut binding = existing(store, identity).await?;
    binding.set_validity((days > 0).then_some(days));
    binding.save().await?;

    println!(
        "{} validity of {} set to {}.",
        "Success:".green().bold(),
        identity.cyan(),
        validity_label(binding.validity())
    );
    Ok(())
}

async fn read(
    ctx: &Context,
    store: &CertificateStore,
    identity: &str,
    generate: bool,
    out: Option<&Path>,
) -> Result<()> {
    let binding = existing(store, identity).await?;
    let bundle = binding.read(generate).await?;

    if let Some(out) = out {
        bundle.dump(out).await?;
        for file in CertBundle::side_files(out) {
            println!("{} {}", "Wrote".green(), file.display());
        }
        return Ok(());
    }

    match ctx.output_format {
        OutputFormat::Json => OutputFormat::print_json(&json!({
            "identity": identity,
            "general_names": bundle.general_names(),
            "crt": bundle.crt(),
            "key": bundle.key(),
            "pem": bundle.pem(),
        }))?,
        OutputFormat::Pretty => print!("{}", bundle.pem()),
    }

    Ok(())
}

async fn delete(store: &CertificateStore, identity: &str, purge: bool) -> Result<()> {
    let removed = if purge {
        store.purge(identity).await?
    } else {
        store.delete(identity).await?
    };
    if removed {
        println!("{} {} deleted.", "Success:".green().bold(), identity.cyan());
    }
    Ok(())
}
