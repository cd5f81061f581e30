use codeintel_core::{
    CodeintelError, FileAnalysis, Parser, Result, Symbol, SymbolKind, Tier,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// What a scripted backend does when asked to parse
#[derive(Clone, Debug)]
pub enum Outcome {
    /// Return one function symbol with this name on line 1
    Symbol(String),
    /// Fail as if the server had died
    ServerGone,
}

/// In-process backend with a fixed outcome, for exercising selection and fallback
pub struct ScriptedParser {
    language: String,
    name: String,
    tier: Tier,
    available: bool,
    outcome: Outcome,
    calls: AtomicUsize,
}

impl ScriptedParser {
    pub fn new(language: &str, tier: Tier, outcome: Outcome) -> Self {
        Self {
            language: language.to_string(),
            name: format!("scripted-{}-{}", language, tier),
            tier,
            available: true,
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Parser for ScriptedParser {
    fn language(&self) -> &str {
        &self.language
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn parse(&self, _content: &[u8], path: &Path) -> Result<FileAnalysis> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Symbol(name) => {
                let mut analysis = FileAnalysis::empty(path.to_string_lossy(), &self.language);
                analysis
                    .symbols
                    .push(Symbol::new(name.as_str(), SymbolKind::Function, 1, 1));
                Ok(analysis)
            }
            Outcome::ServerGone => Err(CodeintelError::LspCancelled {
                method: "textDocument/documentSymbol".to_string(),
            }),
        }
    }
}
