use super::assertions::Assertion;
use super::runner::ScenarioRunner;
use super::steps::ScenarioStep;
use codeintel_core::{Parser, RelationshipKind, SymbolKind, Tier};
use std::collections::HashMap;
use std::sync::Arc;

/// Fluent DSL for building test scenarios
pub struct Scenario {
    name: String,
    initial_files: HashMap<String, Vec<u8>>,
    fixture: Option<String>,
    steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Create a new scenario with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            initial_files: HashMap::new(),
            fixture: None,
            steps: Vec::new(),
        }
    }

    // ===== Initial setup =====

    /// Add a single file to initial workspace
    pub fn with_file(mut self, path: &str, content: &[u8]) -> Self {
        self.initial_files
            .insert(path.to_string(), content.to_vec());
        self
    }

    /// Add multiple files to initial workspace
    pub fn with_files(mut self, files: HashMap<&str, &[u8]>) -> Self {
        for (path, content) in files {
            self.initial_files
                .insert(path.to_string(), content.to_vec());
        }
        self
    }

    /// Load initial workspace from tests/fixtures/<name>
    pub fn from_fixture(mut self, fixture_name: &str) -> Self {
        self.fixture = Some(fixture_name.to_string());
        self
    }

    // ===== Workspace edits =====

    /// Write or overwrite a file
    pub fn writes(mut self, path: &str, content: &[u8]) -> Self {
        self.steps.push(ScenarioStep::WriteFile {
            path: path.to_string(),
            content: content.to_vec(),
        });
        self
    }

    /// Delete a file
    pub fn removes(mut self, path: &str) -> Self {
        self.steps.push(ScenarioStep::RemoveFile {
            path: path.to_string(),
        });
        self
    }

    /// Write codeintel.toml; the registry is rebuilt on next use
    pub fn configures(mut self, toml: &str) -> Self {
        self.steps.push(ScenarioStep::WriteConfig {
            toml: toml.to_string(),
        });
        self
    }

    // ===== Registry control =====

    /// Add a backend alongside the bundled ones
    pub fn registers(mut self, parser: Arc<dyn Parser>) -> Self {
        self.steps.push(ScenarioStep::RegisterParser { parser });
        self
    }

    /// Rebuild the registry now
    pub fn rebuilds(mut self) -> Self {
        self.steps.push(ScenarioStep::Rebuild);
        self
    }

    // ===== Extraction =====

    /// Scan specific workspace-relative files
    pub fn scans(mut self, paths: &[&str]) -> Self {
        self.steps.push(ScenarioStep::Scan {
            paths: paths.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    /// Scan every recognized file in the workspace
    pub fn scans_all(mut self) -> Self {
        self.steps.push(ScenarioStep::ScanAll);
        self
    }

    // ===== Assertions =====

    /// Add a custom assertion
    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.steps.push(ScenarioStep::Assert { assertion });
        self
    }

    /// Assert the number of analyzed files
    pub fn assert_analyzed(self, count: usize) -> Self {
        self.assert(Assertion::AnalyzedCount(count))
    }

    /// Assert the number of failed files
    pub fn assert_failures(self, count: usize) -> Self {
        self.assert(Assertion::FailureCount(count))
    }

    /// Assert a file was detected as `language`
    pub fn assert_language(self, path: &str, language: &str) -> Self {
        self.assert(Assertion::Language {
            path: path.to_string(),
            language: language.to_string(),
        })
    }

    /// Assert a top-level symbol of the given kind
    pub fn assert_symbol(self, path: &str, name: &str, kind: SymbolKind) -> Self {
        self.assert(Assertion::Symbol {
            path: path.to_string(),
            name: name.to_string(),
            kind,
        })
    }

    /// Assert a top-level symbol's line range
    pub fn assert_lines(self, path: &str, name: &str, start: u32, end: u32) -> Self {
        self.assert(Assertion::SymbolLines {
            path: path.to_string(),
            name: name.to_string(),
            start,
            end,
        })
    }

    /// Assert a container has a member
    pub fn assert_member(self, path: &str, container: &str, name: &str) -> Self {
        self.assert(Assertion::Member {
            path: path.to_string(),
            container: container.to_string(),
            name: name.to_string(),
        })
    }

    /// Assert a relationship to a symbol or file exists
    pub fn assert_relationship(self, path: &str, kind: RelationshipKind, target: &str) -> Self {
        self.assert(Assertion::Relationship {
            path: path.to_string(),
            kind,
            target: target.to_string(),
        })
    }

    /// Assert which tier serves a language
    pub fn assert_tier(self, language: &str, tier: Tier) -> Self {
        self.assert(Assertion::SelectedTier {
            language: language.to_string(),
            tier,
        })
    }

    // ===== Execution =====

    /// Execute the scenario and return results
    pub fn run(self) -> ScenarioResult {
        let failed = |name: String, step: usize, error: String| ScenarioResult {
            name,
            success: false,
            steps_executed: step,
            failure_step: Some(step),
            error: Some(error),
        };

        let mut runner = match ScenarioRunner::new(self.initial_files, self.fixture.as_deref()) {
            Ok(r) => r,
            Err(e) => return failed(self.name, 0, format!("workspace setup failed: {:?}", e)),
        };

        match runner.execute(&self.steps) {
            Ok(()) => ScenarioResult {
                name: self.name,
                success: true,
                steps_executed: self.steps.len(),
                failure_step: None,
                error: None,
            },
            Err(e) => failed(self.name, runner.current_step(), format!("{:?}", e)),
        }
    }
}

/// Result of running a scenario
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub steps_executed: usize,
    pub failure_step: Option<usize>,
    pub error: Option<String>,
}

impl ScenarioResult {
    fn failure_message(&self) -> String {
        format!(
            "scenario '{}' failed at step {}: {}",
            self.name,
            self.failure_step.unwrap_or(0),
            self.error.as_deref().unwrap_or("unknown error")
        )
    }

    /// Panic with the failing step if the scenario did not pass
    pub fn unwrap(self) {
        if !self.success {
            panic!("{}", self.failure_message());
        }
    }

    /// Like `unwrap`, prefixed with `msg`
    pub fn expect(self, msg: &str) {
        if !self.success {
            panic!("{}: {}", msg, self.failure_message());
        }
    }
}
