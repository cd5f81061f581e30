//! Per-language backend selection with tiered fallback.

use crate::config::Config;
use crate::error::{CodeintelError, Result};
use crate::language::detect_language;
use crate::lsp::LspParser;
use crate::parser::{pattern, syntax, Parser, Tier};
use crate::types::FileAnalysis;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Collects backends before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    parsers: BTreeMap<String, Vec<Arc<dyn Parser>>>,
    lsp_enabled: bool,
}

impl RegistryBuilder {
    /// Empty builder with LSP backends enabled.
    pub fn new() -> Self {
        Self {
            parsers: BTreeMap::new(),
            lsp_enabled: true,
        }
    }

    /// Enable or disable every LSP-tier backend.
    pub fn lsp_enabled(mut self, enabled: bool) -> Self {
        self.lsp_enabled = enabled;
        self
    }

    /// Register a backend under its own language tag.
    pub fn register(mut self, parser: Arc<dyn Parser>) -> Self {
        self.parsers
            .entry(parser.language().to_string())
            .or_default()
            .push(parser);
        self
    }

    /// Register several backends.
    pub fn register_all(self, parsers: impl IntoIterator<Item = Arc<dyn Parser>>) -> Self {
        parsers.into_iter().fold(self, Self::register)
    }

    /// Freeze the registry. Lists are sorted by tier; registration order
    /// breaks ties.
    pub fn build(mut self) -> Registry {
        for list in self.parsers.values_mut() {
            list.sort_by_key(|p| p.tier());
        }
        Registry {
            parsers: self.parsers,
            lsp_enabled: self.lsp_enabled,
        }
    }
}

/// Tier-sorted backends per language. Read-only after construction.
pub struct Registry {
    parsers: BTreeMap<String, Vec<Arc<dyn Parser>>>,
    lsp_enabled: bool,
}

impl Registry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry with the built-in backends: configured language servers,
    /// tree-sitter grammars and regex patterns.
    pub fn with_defaults(config: &Config) -> Result<Self> {
        let mut builder = RegistryBuilder::new().lsp_enabled(config.lsp.enabled);

        for (language, server) in config.effective_servers() {
            builder = builder.register(Arc::new(LspParser::new(&language, server, config.lsp.clone())));
        }
        builder = builder.register_all(syntax::default_parsers());
        builder = builder.register_all(pattern::default_parsers()?);

        Ok(builder.build())
    }

    /// Whether LSP-tier backends may be selected.
    pub fn lsp_enabled(&self) -> bool {
        self.lsp_enabled
    }

    /// Languages with at least one registered backend.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(String::as_str)
    }

    /// All backends for `language`, most preferred first.
    pub fn parsers_for(&self, language: &str) -> &[Arc<dyn Parser>] {
        self.parsers.get(language).map_or(&[], Vec::as_slice)
    }

    fn is_selectable(&self, parser: &dyn Parser) -> bool {
        if parser.tier() == Tier::Lsp && !self.lsp_enabled {
            return false;
        }
        parser.is_available()
    }

    /// Highest-priority available backend for `language`.
    ///
    /// # Errors
    ///
    /// `UnsupportedLanguage` when no backend is registered or none is
    /// currently available.
    pub fn get_parser(&self, language: &str) -> Result<&Arc<dyn Parser>> {
        self.parsers_for(language)
            .iter()
            .find(|p| self.is_selectable(p.as_ref()))
            .ok_or_else(|| CodeintelError::UnsupportedLanguage(language.to_string()))
    }

    /// First available backend ranked strictly below `tier`.
    fn fallback_for(&self, language: &str, tier: Tier) -> Option<&Arc<dyn Parser>> {
        self.parsers_for(language)
            .iter()
            .find(|p| p.tier() > tier && self.is_selectable(p.as_ref()))
    }

    /// Detect the language of `path` and parse `content` with the best
    /// available backend.
    ///
    /// Unrecognized paths yield an empty analysis tagged `"unknown"`.
    pub fn parse(&self, content: &[u8], path: &Path) -> Result<FileAnalysis> {
        match detect_language(path) {
            Some(language) => self.parse_as(language, content, path),
            None => {
                debug!(path = %path.display(), "Unrecognized language");
                Ok(FileAnalysis::unknown(path.to_string_lossy()))
            }
        }
    }

    /// Parse with an explicit language tag.
    ///
    /// A recognized language with no usable backend yields an empty analysis
    /// tagged with that language. If an available LSP-tier backend fails, the
    /// next lower tier is tried once before the error is surfaced.
    pub fn parse_as(&self, language: &str, content: &[u8], path: &Path) -> Result<FileAnalysis> {
        let parser = match self.get_parser(language) {
            Ok(parser) => parser,
            Err(_) => {
                debug!(language, path = %path.display(), "No backend available");
                return Ok(FileAnalysis::empty(path.to_string_lossy(), language));
            }
        };

        debug!(language, backend = parser.name(), tier = %parser.tier(), path = %path.display(), "Selected parser");
        let error = match parser.parse(content, path) {
            Ok(analysis) => return Ok(tag(analysis, language, path)),
            Err(e) => e,
        };

        if parser.tier() != Tier::Lsp {
            return Err(error);
        }
        let Some(fallback) = self.fallback_for(language, parser.tier()) else {
            return Err(error);
        };

        warn!(
            language,
            path = %path.display(),
            backend = parser.name(),
            fallback = fallback.name(),
            error = %error,
            "LSP backend failed; falling back"
        );
        fallback
            .parse(content, path)
            .map(|analysis| tag(analysis, language, path))
    }

    /// Shut down every backend that holds external resources.
    pub fn shutdown(&self) {
        for parser in self.parsers.values().flatten() {
            parser.shutdown();
        }
    }
}

fn tag(mut analysis: FileAnalysis, language: &str, path: &Path) -> FileAnalysis {
    if analysis.language.is_empty() {
        analysis.language = language.to_string();
    }
    if analysis.path.is_empty() {
        analysis.path = path.to_string_lossy().into_owned();
    }
    analysis
}
