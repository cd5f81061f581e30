use super::assertions::Assertion;
use super::steps::ScenarioStep;
use super::workspace::TestWorkspace;
use anyhow::{anyhow, Context, Result};
use codeintel_core::parser::{pattern, syntax};
use codeintel_core::{
    scan_files, FileAnalysis, Parser, Registry, RelationshipKind, ScanReport, Symbol, SymbolKind,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Executes scenarios against a real registry in a temp workspace
pub struct ScenarioRunner {
    workspace: TestWorkspace,
    extra_parsers: Vec<Arc<dyn Parser>>,
    registry: Option<Registry>,
    report: Option<ScanReport>,
    current_step: usize,
}

impl ScenarioRunner {
    /// Create a new runner with initial files
    pub fn new(initial_files: HashMap<String, Vec<u8>>, fixture: Option<&str>) -> Result<Self> {
        let workspace = TestWorkspace::with_files(initial_files)?;
        if let Some(name) = fixture {
            workspace.load_fixture(name)?;
        }

        Ok(Self {
            workspace,
            extra_parsers: Vec::new(),
            registry: None,
            report: None,
            current_step: 0,
        })
    }

    /// Get current step number
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Execute all steps in sequence
    pub fn execute(&mut self, steps: &[ScenarioStep]) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            self.current_step = i;
            self.execute_step(step)
                .with_context(|| format!("Step {}: {:?}", i, step))?;
        }
        if let Some(registry) = &self.registry {
            registry.shutdown();
        }
        Ok(())
    }

    fn execute_step(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::WriteFile { path, content } => self.workspace.write_file(path, content),
            ScenarioStep::RemoveFile { path } => self.workspace.remove_file(path),
            ScenarioStep::WriteConfig { toml } => {
                self.registry = None;
                self.workspace
                    .write_file(codeintel_core::CONFIG_FILE, toml.as_bytes())
            }
            ScenarioStep::RegisterParser { parser } => {
                self.registry = None;
                self.extra_parsers.push(Arc::clone(parser));
                Ok(())
            }
            ScenarioStep::Rebuild => {
                self.registry = Some(self.build_registry()?);
                Ok(())
            }
            ScenarioStep::Scan { paths } => self.handle_scan(paths.clone()),
            ScenarioStep::ScanAll => {
                let paths = self.workspace.source_files()?;
                self.handle_scan(paths)
            }
            ScenarioStep::Assert { assertion } => self.handle_assertion(assertion),
        }
    }

    /// Bundled backends plus any registered by the scenario. Real language
    /// servers are left out so results never depend on the host's PATH.
    fn build_registry(&self) -> Result<Registry> {
        let config = self.workspace.config()?;
        let registry = Registry::builder()
            .lsp_enabled(config.lsp.enabled)
            .register_all(self.extra_parsers.iter().cloned())
            .register_all(syntax::default_parsers())
            .register_all(pattern::default_parsers()?)
            .build();
        Ok(registry)
    }

    fn registry(&mut self) -> Result<&Registry> {
        if self.registry.is_none() {
            self.registry = Some(self.build_registry()?);
        }
        self.registry
            .as_ref()
            .ok_or_else(|| anyhow!("Registry not built"))
    }

    fn handle_scan(&mut self, paths: Vec<String>) -> Result<()> {
        let files: Vec<PathBuf> = paths.iter().map(|p| self.workspace.resolve(p)).collect();
        let report = scan_files(self.registry()?, &files);
        self.report = Some(report);
        Ok(())
    }

    fn report(&self) -> Result<&ScanReport> {
        self.report
            .as_ref()
            .ok_or_else(|| anyhow!("No scan has run yet"))
    }

    fn analysis(&self, path: &str) -> Result<&FileAnalysis> {
        let wanted = self.workspace.resolve(path).to_string_lossy().into_owned();
        self.report()?
            .analyses
            .iter()
            .find(|a| a.path == wanted)
            .ok_or_else(|| anyhow!("No analysis for {}", path))
    }

    fn symbol<'a>(analysis: &'a FileAnalysis, name: &str) -> Result<&'a Symbol> {
        analysis
            .symbols
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| {
                let names: Vec<&str> = analysis.symbols.iter().map(|s| s.name.as_str()).collect();
                anyhow!("Symbol {} not found in {} (have {:?})", name, analysis.path, names)
            })
    }

    fn handle_assertion(&mut self, assertion: &Assertion) -> Result<()> {
        match assertion {
            Assertion::AnalyzedCount(n) => {
                let actual = self.report()?.analyses.len();
                if actual != *n {
                    return Err(anyhow!("Expected {} analyses, found {}", n, actual));
                }
                Ok(())
            }
            Assertion::FailureCount(n) => {
                let report = self.report()?;
                if report.failures.len() != *n {
                    let failures: Vec<String> = report
                        .failures
                        .iter()
                        .map(|f| format!("{}: {}", f.path.display(), f.error))
                        .collect();
                    return Err(anyhow!("Expected {} failures, found {:?}", n, failures));
                }
                Ok(())
            }
            Assertion::Failed { path } => {
                let wanted = self.workspace.resolve(path);
                if !self.report()?.failures.iter().any(|f| f.path == wanted) {
                    return Err(anyhow!("Expected {} to fail", path));
                }
                Ok(())
            }
            Assertion::Language { path, language } => {
                let analysis = self.analysis(path)?;
                if analysis.language != *language {
                    return Err(anyhow!(
                        "Expected {} to be {}, found {}",
                        path,
                        language,
                        analysis.language
                    ));
                }
                Ok(())
            }
            Assertion::Symbol { path, name, kind } => {
                let symbol = Self::symbol(self.analysis(path)?, name)?;
                self.assert_kind(symbol, *kind)
            }
            Assertion::SymbolLines {
                path,
                name,
                start,
                end,
            } => {
                let symbol = Self::symbol(self.analysis(path)?, name)?;
                if (symbol.line_start, symbol.line_end) != (*start, *end) {
                    return Err(anyhow!(
                        "Expected {} at lines {}..{}, found {}..{}",
                        name,
                        start,
                        end,
                        symbol.line_start,
                        symbol.line_end
                    ));
                }
                Ok(())
            }
            Assertion::Member {
                path,
                container,
                name,
            } => {
                let parent = Self::symbol(self.analysis(path)?, container)?;
                if !parent.children.iter().any(|c| c.name == *name) {
                    let members: Vec<&str> = parent.children.iter().map(|c| c.name.as_str()).collect();
                    return Err(anyhow!(
                        "{} has no member {} (have {:?})",
                        container,
                        name,
                        members
                    ));
                }
                Ok(())
            }
            Assertion::Relationship { path, kind, target } => {
                self.assert_relationship(self.analysis(path)?, *kind, target)
            }
            Assertion::NoSymbols { path } => {
                let analysis = self.analysis(path)?;
                if !analysis.symbols.is_empty() {
                    return Err(anyhow!(
                        "Expected no symbols in {}, found {}",
                        path,
                        analysis.symbols.len()
                    ));
                }
                Ok(())
            }
            Assertion::SelectedTier { language, tier } => {
                let selected = self.registry()?.get_parser(language)?.tier();
                if selected != *tier {
                    return Err(anyhow!(
                        "Expected {} to use {}, selected {}",
                        language,
                        tier,
                        selected
                    ));
                }
                Ok(())
            }
            Assertion::Unsupported { language } => {
                if self.registry()?.get_parser(language).is_ok() {
                    return Err(anyhow!("Expected no backend for {}", language));
                }
                Ok(())
            }
            Assertion::Custom(check) => check(self.report()?),
        }
    }

    fn assert_kind(&self, symbol: &Symbol, kind: SymbolKind) -> Result<()> {
        if symbol.kind != kind {
            return Err(anyhow!(
                "Expected {} to be {}, found {}",
                symbol.name,
                kind,
                symbol.kind
            ));
        }
        Ok(())
    }

    fn assert_relationship(
        &self,
        analysis: &FileAnalysis,
        kind: RelationshipKind,
        target: &str,
    ) -> Result<()> {
        let found = analysis.relationships.iter().any(|r| {
            r.kind == kind
                && (r.target_symbol.as_deref() == Some(target)
                    || r.target_file.as_deref() == Some(target))
        });
        if !found {
            return Err(anyhow!(
                "No {} relationship to {} in {}",
                kind,
                target,
                analysis.path
            ));
        }
        Ok(())
    }
}
