//! Status command - backend availability per language.

use anyhow::{Context, Result};
use codeintel_core::{Config, Registry, Tier};
use console::style;
use std::path::Path;

/// Show every registered backend and which one each language would use.
pub fn run(root: &Path) -> Result<()> {
    let config = Config::load(root).context("Failed to load configuration")?;
    let registry = Registry::with_defaults(&config).context("Failed to build backend registry")?;

    println!("{}", style("Backend Status:").bold());
    if !registry.lsp_enabled() {
        println!("  {} language servers disabled by configuration", style("ℹ").blue());
    }
    println!();

    let mut missing_servers = Vec::new();
    for language in registry.languages() {
        let selected = registry.get_parser(language).ok().map(|p| p.name().to_string());
        println!("  {}", style(language).bold());

        for parser in registry.parsers_for(language) {
            let available = parser.is_available();
            let mark = if !available {
                style("✗").red()
            } else if parser.tier() == Tier::Lsp && !registry.lsp_enabled() {
                style("-").dim()
            } else {
                style("✓").green()
            };
            let active = if selected.as_deref() == Some(parser.name()) {
                style(" (active)").cyan().to_string()
            } else {
                String::new()
            };
            println!("    {} {:12} {}{}", mark, parser.tier().to_string(), parser.name(), active);

            if parser.tier() == Tier::Lsp && !available {
                missing_servers.push(parser.name().trim_start_matches("lsp:").to_string());
            }
        }
    }

    if !missing_servers.is_empty() {
        missing_servers.sort();
        missing_servers.dedup();
        println!();
        println!(
            "{} Language servers not found on PATH: {}",
            style("⚠").yellow(),
            missing_servers.join(", ")
        );
        println!(
            "  {} Install them or set {} in codeintel.toml",
            style("→").cyan(),
            style("[servers.<language>] command").cyan()
        );
    }

    Ok(())
}
