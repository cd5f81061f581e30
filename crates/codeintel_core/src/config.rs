//! Configuration for backend selection and language servers.

use crate::error::{CodeintelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up in the project root.
pub const CONFIG_FILE: &str = "codeintel.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Language server behaviour.
    #[serde(default)]
    pub lsp: LspConfig,

    /// Per-language server commands, keyed by language tag.
    /// Entries override the built-in table.
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
}

impl Config {
    /// Load configuration from `<root>/codeintel.toml`, or defaults if absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| CodeintelError::ConfigError(format!("failed to read config: {}", e)))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| CodeintelError::ConfigError(format!("failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to `<root>/codeintel.toml`.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = root.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self).map_err(|e| {
            CodeintelError::ConfigError(format!("failed to serialize config: {}", e))
        })?;
        fs::write(&path, content)
            .map_err(|e| CodeintelError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    /// Reject values that would make requests unbounded or servers unlaunchable.
    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("request_timeout_ms", self.lsp.request_timeout_ms),
            ("initialize_timeout_ms", self.lsp.initialize_timeout_ms),
            ("call_hierarchy_timeout_ms", self.lsp.call_hierarchy_timeout_ms),
            ("shutdown_grace_ms", self.lsp.shutdown_grace_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(CodeintelError::ConfigError(format!(
                    "lsp.{} must be greater than zero",
                    name
                )));
            }
        }
        for (language, server) in &self.servers {
            if server.command.trim().is_empty() {
                return Err(CodeintelError::ConfigError(format!(
                    "servers.{}.command must not be empty",
                    language
                )));
            }
        }
        Ok(())
    }
}

/// Language server behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LspConfig {
    /// Use LSP backends at all (default: true).
    pub enabled: bool,

    /// Deadline for ordinary requests in milliseconds (default: 5000).
    pub request_timeout_ms: u64,

    /// Deadline for the initialize handshake (default: 30000).
    pub initialize_timeout_ms: u64,

    /// Deadline for call-hierarchy requests (default: 10000).
    pub call_hierarchy_timeout_ms: u64,

    /// Time allowed for the server to exit after `exit` (default: 5000).
    pub shutdown_grace_ms: u64,

    /// Resolve call edges through call hierarchy when parsing (default: false).
    /// One extra round trip per function, so it is opt-in.
    pub include_calls: bool,

    /// Workspace root handed to servers. When unset, a session is rooted at
    /// the directory of the first file it parses and reused for later files.
    pub root: Option<PathBuf>,
}

impl Default for LspConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            request_timeout_ms: 5_000,
            initialize_timeout_ms: 30_000,
            call_hierarchy_timeout_ms: 10_000,
            shutdown_grace_ms: 5_000,
            include_calls: false,
            root: None,
        }
    }
}

impl LspConfig {
    /// Transport timeouts derived from this configuration.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            initialize_timeout: Duration::from_millis(self.initialize_timeout_ms),
            call_hierarchy_timeout: Duration::from_millis(self.call_hierarchy_timeout_ms),
            shutdown_grace: Duration::from_millis(self.shutdown_grace_ms),
        }
    }
}

/// Timeouts used by the LSP client and query layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Default request deadline.
    pub request_timeout: Duration,
    /// Deadline for `initialize`.
    pub initialize_timeout: Duration,
    /// Deadline for call-hierarchy requests.
    pub call_hierarchy_timeout: Duration,
    /// Grace period for process exit on close.
    pub shutdown_grace: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        LspConfig::default().client_options()
    }
}

/// How to launch one language server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Executable name or path.
    pub command: String,

    /// Command-line arguments.
    #[serde(default)]
    pub args: Vec<String>,

    /// `languageId` sent in `didOpen`; inferred from the extension if unset.
    #[serde(default)]
    pub language_id: Option<String>,
}

impl ServerConfig {
    /// Server launched with the given command and arguments.
    pub fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            language_id: None,
        }
    }
}

/// Built-in server table, keyed by language tag.
pub fn default_servers() -> BTreeMap<String, ServerConfig> {
    let mut servers = BTreeMap::new();
    servers.insert("go".to_string(), ServerConfig::new("gopls", &[]));
    servers.insert("rust".to_string(), ServerConfig::new("rust-analyzer", &[]));
    servers.insert(
        "python".to_string(),
        ServerConfig::new("pyright-langserver", &["--stdio"]),
    );
    servers.insert(
        "typescript".to_string(),
        ServerConfig::new("typescript-language-server", &["--stdio"]),
    );
    servers.insert(
        "javascript".to_string(),
        ServerConfig::new("typescript-language-server", &["--stdio"]),
    );
    servers.insert("java".to_string(), ServerConfig::new("jdtls", &[]));
    servers.insert("c".to_string(), ServerConfig::new("clangd", &[]));
    servers.insert("cpp".to_string(), ServerConfig::new("clangd", &[]));
    servers
}

impl Config {
    /// Built-in servers merged with configured overrides.
    pub fn effective_servers(&self) -> BTreeMap<String, ServerConfig> {
        let mut servers = default_servers();
        for (language, server) in &self.servers {
            servers.insert(language.clone(), server.clone());
        }
        servers
    }
}
