//! Calls command - call-hierarchy edges for one symbol.

use anyhow::{Context, Result};
use codeintel_core::lsp::uri::{clean_path, path_to_url};
use codeintel_core::{detect_language, Config, LspClient, LspQueries};
use console::style;
use std::path::Path;

/// Print incoming and outgoing calls for the symbol at `line`:`column` of `file`.
pub fn run(root: &Path, file: &Path, line: u32, column: u32, language: Option<&str>) -> Result<()> {
    let config = Config::load(root).context("Failed to load configuration")?;

    let language = match language {
        Some(language) => language.to_string(),
        None => detect_language(file)
            .with_context(|| format!("Cannot detect language of {}", file.display()))?
            .to_string(),
    };
    let servers = config.effective_servers();
    let server_config = servers
        .get(&language)
        .with_context(|| format!("No language server configured for '{}'", language))?;

    let file = clean_path(&std::env::current_dir()?.join(file));
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let workspace = clean_path(&std::env::current_dir()?.join(root));
    let workspace = config.lsp.root.clone().unwrap_or(workspace);

    println!(
        "{} Starting {} in {}...",
        style("→").cyan(),
        style(&server_config.command).cyan(),
        workspace.display()
    );

    let client = LspClient::connect(
        &server_config.command,
        &server_config.args,
        &workspace,
        config.lsp.client_options(),
    )?;
    let queries = LspQueries::new(client).with_language_id(server_config.language_id.clone());

    let result = queries.initialize(&workspace).and_then(|_| {
        let uri = path_to_url(&file)?;
        queries.with_document(&uri, &text, |q| {
            q.extract_calls_for_symbol(&file, line, column)
        })
    });
    queries.shutdown();
    let calls = result.context("Call hierarchy query failed")?;

    if calls.is_empty() {
        println!("{} No calls found at {}:{}:{}", style("ℹ").blue(), file.display(), line, column);
        return Ok(());
    }

    println!();
    println!("{}", style("Call Hierarchy:").bold());
    for call in &calls {
        println!(
            "  {} {} {} {}",
            style(&call.caller_symbol).yellow(),
            style("→").cyan(),
            style(&call.callee_symbol).yellow(),
            style(format!("({}:{})", call.caller_file, call.caller_line)).dim()
        );
    }
    println!();
    println!("  Edges: {}", style(calls.len()).cyan());

    Ok(())
}
