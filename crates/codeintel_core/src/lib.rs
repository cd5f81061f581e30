//! Codeintel Core Library
//!
//! Structural code intelligence for source files, providing:
//! - A JSON-RPC client for language servers over stdio
//! - Typed semantic queries (document symbols, call hierarchy)
//! - Tree-sitter and regex extraction backends
//! - A registry that picks the best available backend per language
//!
//! # Quick Start
//!
//! ```
//! use codeintel_core::{Config, Registry, SymbolKind};
//! use std::path::Path;
//!
//! let mut config = Config::default();
//! config.lsp.enabled = false;
//! let registry = Registry::with_defaults(&config).unwrap();
//!
//! let analysis = registry
//!     .parse(b"package main\nfunc Run() {}\n", Path::new("main.go"))
//!     .unwrap();
//! assert_eq!(analysis.language, "go");
//! assert_eq!(analysis.symbols[0].name, "Run");
//! assert_eq!(analysis.symbols[0].kind, SymbolKind::Function);
//! ```
//!
//! # Features
//!
//! ## Backend Selection
//!
//! Each language may have several backends. The registry tries them in
//! [`Tier`] order and falls back once when a language server fails:
//!
//! ```
//! use codeintel_core::{Config, Registry, Tier};
//!
//! let mut config = Config::default();
//! config.lsp.enabled = false;
//! let registry = Registry::with_defaults(&config).unwrap();
//!
//! assert_eq!(registry.get_parser("rust").unwrap().tier(), Tier::SyntaxTree);
//! assert_eq!(registry.get_parser("ruby").unwrap().tier(), Tier::Pattern);
//! assert!(registry.get_parser("cobol").is_err());
//! ```
//!
//! ## Batch Scans
//!
//! ```
//! use codeintel_core::{scan_files, Config, Registry};
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let file = tmp.path().join("util.py");
//! std::fs::write(&file, "def helper():\n    pass\n").unwrap();
//!
//! let mut config = Config::default();
//! config.lsp.enabled = false;
//! let registry = Registry::with_defaults(&config).unwrap();
//!
//! let report = scan_files(&registry, &[file]);
//! assert_eq!(report.summary().symbols, 1);
//! ```

mod config;
mod error;
mod language;
pub mod lsp;
pub mod parser;
mod scan;
mod types;

pub use config::{default_servers, ClientOptions, Config, LspConfig, ServerConfig, CONFIG_FILE};
pub use error::{CodeintelError, Result};
pub use language::{detect_language, lsp_language_id};
pub use lsp::{LspClient, LspParser, LspQueries, OutlineSymbol};
pub use parser::{Parser, PatternParser, Registry, RegistryBuilder, SyntaxParser, Tier};
pub use scan::{
    scan_files, scan_files_with_progress, ScanFailure, ScanProgressCallback, ScanReport,
    ScanSummary,
};
pub use types::*;
