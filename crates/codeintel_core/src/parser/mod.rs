//! Extraction backends and the registry that chooses between them.
//!
//! Every backend implements [`Parser`]. Backends are ranked by [`Tier`]:
//! language servers give the most accurate results but need an external
//! tool; tree-sitter grammars are bundled; regex patterns always work.

pub mod pattern;
pub mod registry;
pub mod syntax;

pub use pattern::PatternParser;
pub use registry::{Registry, RegistryBuilder};
pub use syntax::SyntaxParser;

use crate::error::Result;
use crate::types::FileAnalysis;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Backend priority, most preferred first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Language server (semantic, needs an external tool).
    Lsp,
    /// Concrete syntax tree from a bundled grammar.
    SyntaxTree,
    /// Line-oriented regular expressions.
    Pattern,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lsp => "lsp",
            Self::SyntaxTree => "syntax-tree",
            Self::Pattern => "pattern",
        })
    }
}

/// Uniform extraction contract.
pub trait Parser: Send + Sync {
    /// Language tag this backend handles.
    fn language(&self) -> &str;

    /// Priority tier.
    fn tier(&self) -> Tier;

    /// Short backend name for logs and status output.
    fn name(&self) -> &str;

    /// Whether the backend can run right now. Backends that depend on an
    /// external tool override this.
    fn is_available(&self) -> bool {
        true
    }

    /// Extract symbols and relationships from one file.
    fn parse(&self, content: &[u8], path: &Path) -> Result<FileAnalysis>;

    /// Release external resources (language server processes).
    fn shutdown(&self) {}
}
