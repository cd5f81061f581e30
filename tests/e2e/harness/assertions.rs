use anyhow::Result;
use codeintel_core::{RelationshipKind, ScanReport, SymbolKind, Tier};

/// Declarative assertions on the latest scan
pub enum Assertion {
    // Report shape
    AnalyzedCount(usize),
    FailureCount(usize),
    Failed {
        path: String,
    },

    // Per-file results
    Language {
        path: String,
        language: String,
    },
    Symbol {
        path: String,
        name: String,
        kind: SymbolKind,
    },
    SymbolLines {
        path: String,
        name: String,
        start: u32,
        end: u32,
    },
    Member {
        path: String,
        container: String,
        name: String,
    },
    Relationship {
        path: String,
        kind: RelationshipKind,
        target: String,
    },
    NoSymbols {
        path: String,
    },

    // Backend selection
    SelectedTier {
        language: String,
        tier: Tier,
    },
    Unsupported {
        language: String,
    },

    // Custom
    Custom(Box<dyn Fn(&ScanReport) -> Result<()> + Send + Sync>),
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AnalyzedCount(n) => write!(f, "AnalyzedCount({})", n),
            Self::FailureCount(n) => write!(f, "FailureCount({})", n),
            Self::Failed { path } => write!(f, "Failed {{ path: {:?} }}", path),
            Self::Language { path, language } => {
                write!(f, "Language {{ path: {:?}, language: {:?} }}", path, language)
            }
            Self::Symbol { path, name, kind } => {
                write!(f, "Symbol {{ path: {:?}, name: {:?}, kind: {} }}", path, name, kind)
            }
            Self::SymbolLines {
                path,
                name,
                start,
                end,
            } => write!(
                f,
                "SymbolLines {{ path: {:?}, name: {:?}, lines: {}..{} }}",
                path, name, start, end
            ),
            Self::Member {
                path,
                container,
                name,
            } => write!(
                f,
                "Member {{ path: {:?}, container: {:?}, name: {:?} }}",
                path, container, name
            ),
            Self::Relationship { path, kind, target } => write!(
                f,
                "Relationship {{ path: {:?}, kind: {}, target: {:?} }}",
                path, kind, target
            ),
            Self::NoSymbols { path } => write!(f, "NoSymbols {{ path: {:?} }}", path),
            Self::SelectedTier { language, tier } => {
                write!(f, "SelectedTier {{ language: {:?}, tier: {} }}", language, tier)
            }
            Self::Unsupported { language } => write!(f, "Unsupported({:?})", language),
            Self::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}
