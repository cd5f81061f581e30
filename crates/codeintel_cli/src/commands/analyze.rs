//! Analyze command - extract symbols and relationships.

use anyhow::{Context, Result};
use codeintel_core::lsp::uri::clean_path;
use codeintel_core::{
    detect_language, scan_files_with_progress, Config, FileAnalysis, Registry, ScanReport, Symbol,
};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Analyze every recognized file under `paths`.
pub fn run(root: &Path, paths: &[PathBuf], format: &str, no_lsp: bool) -> Result<()> {
    if format != "json" && format != "text" {
        anyhow::bail!("Unsupported format: {}. Use 'json' or 'text'.", format);
    }

    let config = load_config(root, no_lsp)?;
    let registry = Registry::with_defaults(&config).context("Failed to build backend registry")?;

    let files = collect_files(paths);
    if files.is_empty() {
        println!("{} No source files found.", style("ℹ").blue());
        return Ok(());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:30} [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("█▓▒░  "),
    );

    let pb_clone = pb.clone();
    let progress = move |current: usize, total: usize, path: &Path| {
        pb_clone.set_length(total as u64);
        pb_clone.set_position(current as u64);
        if let Some(name) = path.file_name() {
            pb_clone.set_message(name.to_string_lossy().into_owned());
        }
    };
    let report = scan_files_with_progress(&registry, &files, Some(&progress));
    pb.finish_and_clear();
    registry.shutdown();

    match format {
        "json" => print_json(&report)?,
        _ => print_text(&report),
    }
    Ok(())
}

/// Configuration for a scan of `root`; servers are rooted there unless configured otherwise.
fn load_config(root: &Path, no_lsp: bool) -> Result<Config> {
    let mut config = Config::load(root).context("Failed to load configuration")?;
    if no_lsp {
        config.lsp.enabled = false;
    }
    if config.lsp.root.is_none() {
        config.lsp.root = Some(clean_path(&std::env::current_dir()?.join(root)));
    }
    Ok(config)
}

/// Expand directories (honoring ignore files) into recognized source files.
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }

        let walker = ignore::WalkBuilder::new(path)
            .hidden(false)
            .require_git(false)
            .filter_entry(|entry| entry.file_name() != OsStr::new(".git"))
            .build();
        for entry in walker {
            let entry = match entry {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(error = %err, "walk error");
                    continue;
                }
            };
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }
            if detect_language(entry.path()).is_some() {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    files
}

fn print_json(report: &ScanReport) -> Result<()> {
    let failures: Vec<serde_json::Value> = report
        .failures
        .iter()
        .map(|f| {
            serde_json::json!({
                "path": f.path.display().to_string(),
                "error": f.error.to_string(),
            })
        })
        .collect();
    let output = serde_json::json!({
        "files": report.analyses,
        "failures": failures,
        "summary": report.summary(),
    });
    let json = serde_json::to_string_pretty(&output).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

fn print_text(report: &ScanReport) {
    for analysis in &report.analyses {
        print_analysis(analysis);
    }

    if !report.failures.is_empty() {
        println!();
        println!("{}", style("Errors encountered:").red().bold());
        for failure in &report.failures {
            println!(
                "  {} {}: {}",
                style("×").red(),
                failure.path.display(),
                failure.error
            );
            if let Some(hint) = failure.error.recovery_suggestion() {
                println!("    {} {}", style("→").cyan(), hint);
            }
        }
    }

    let summary = report.summary();
    println!();
    println!("{}", style("Analysis Report:").bold());
    println!("  Files analyzed:  {}", style(summary.analyzed).cyan());
    println!("  Symbols found:   {}", style(summary.symbols).cyan());
    println!("  Relationships:   {}", style(summary.relationships).cyan());
    if summary.failed > 0 {
        println!("  Files failed:    {}", style(summary.failed).red());
    }
    for (language, count) in &summary.languages {
        println!("    {:12} {}", language, count);
    }
}

fn print_analysis(analysis: &FileAnalysis) {
    if analysis.is_empty() {
        return;
    }
    println!(
        "{} {}",
        style(&analysis.path).bold(),
        style(format!("({})", analysis.language)).dim()
    );
    for symbol in &analysis.symbols {
        print_symbol(symbol, 1);
        for child in &symbol.children {
            print_symbol(child, 2);
        }
    }
    for rel in &analysis.relationships {
        let target = rel
            .target_symbol
            .as_deref()
            .or(rel.target_file.as_deref())
            .unwrap_or("?");
        println!(
            "  {} {} {}{}",
            style("→").cyan(),
            rel.kind,
            target,
            style(format!(" :{}", rel.line)).dim()
        );
    }
}

fn print_symbol(symbol: &Symbol, depth: usize) {
    let marker = if symbol.exported { "+" } else { "-" };
    println!(
        "{:indent$}{} {} {}{}",
        "",
        marker,
        style(symbol.kind).yellow(),
        symbol.name,
        style(format!(" :{}-{}", symbol.line_start, symbol.line_end)).dim(),
        indent = depth * 2
    );
}
