//! Language-server-backed parser.
//!
//! Owns one lazily started server session per language. The session mutex
//! doubles as a one-slot semaphore: parses through the same server never
//! overlap, so per-document open/close pairs cannot interleave.

use crate::config::{ClientOptions, LspConfig, ServerConfig};
use crate::error::{CodeintelError, Result};
use crate::lsp::client::{lock, LspClient};
use crate::lsp::edges::{call_relationships, callable_positions, outline_to_symbols};
use crate::lsp::queries::LspQueries;
use crate::lsp::uri::{clean_path, path_to_url};
use crate::parser::{Parser, Tier};
use crate::types::{CallInfo, FileAnalysis};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

type Connector = Box<dyn Fn(&Path, ClientOptions) -> Result<LspClient> + Send + Sync>;

/// How the session's transport is created.
enum Launcher {
    /// Spawn the configured command.
    Process,
    /// Caller-supplied transport (in-process servers, tests).
    Custom(Connector),
}

/// LSP-tier backend for one language.
pub struct LspParser {
    language: String,
    name: String,
    server: ServerConfig,
    config: LspConfig,
    launcher: Launcher,
    session: Mutex<Option<LspQueries>>,
}

impl LspParser {
    /// Backend that launches `server` on first use.
    pub fn new(language: &str, server: ServerConfig, config: LspConfig) -> Self {
        Self {
            language: language.to_string(),
            name: format!("lsp:{}", server.command),
            server,
            config,
            launcher: Launcher::Process,
            session: Mutex::new(None),
        }
    }

    /// Backend whose transport comes from `connect` instead of a process.
    pub fn with_connector<F>(language: &str, server: ServerConfig, config: LspConfig, connect: F) -> Self
    where
        F: Fn(&Path, ClientOptions) -> Result<LspClient> + Send + Sync + 'static,
    {
        let mut parser = Self::new(language, server, config);
        parser.launcher = Launcher::Custom(Box::new(connect));
        parser
    }

    /// Launch configuration.
    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    /// Whether a session is currently running.
    pub fn has_session(&self) -> bool {
        lock(&self.session).is_some()
    }

    /// Workspace root for a session started by a parse of `file`.
    fn root_for(&self, file: &Path) -> PathBuf {
        if let Some(root) = &self.config.root {
            return root.clone();
        }
        file.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn start(&self, root: &Path) -> Result<LspQueries> {
        let options = self.config.client_options();
        let client = match &self.launcher {
            Launcher::Process => {
                LspClient::connect(&self.server.command, &self.server.args, root, options)?
            }
            Launcher::Custom(connect) => connect(root, options)?,
        };

        let queries = LspQueries::new(client).with_language_id(self.server.language_id.clone());
        if let Err(e) = queries.initialize(root) {
            queries.shutdown();
            return Err(e);
        }
        info!(language = %self.language, server = %self.server.command, root = %root.display(), "Language server ready");
        Ok(queries)
    }

    fn analyze(&self, queries: &LspQueries, file: &Path, text: &str, display_path: &str) -> Result<FileAnalysis> {
        let uri = path_to_url(file)?;
        queries.with_document(&uri, text, |q| {
            let outline = q.query_document_symbols(&uri)?;
            let mut analysis = FileAnalysis::empty(display_path, &self.language);
            analysis.symbols = outline_to_symbols(&outline, &self.language, text);

            if self.config.include_calls {
                let mut calls: Vec<CallInfo> = Vec::new();
                for (line, column) in callable_positions(&outline) {
                    match q.extract_calls_for_symbol(file, line, column) {
                        Ok(found) => calls.extend(found),
                        Err(e) if e.is_server_unavailable() => return Err(e),
                        Err(e) => debug!(line, column, error = %e, "Call hierarchy failed for symbol"),
                    }
                }
                analysis.relationships = call_relationships(&calls, file);
            }
            Ok(analysis)
        })
    }

    /// Stop the running session, if any.
    pub fn shutdown_session(&self) {
        if let Some(queries) = lock(&self.session).take() {
            debug!(language = %self.language, "Shutting down language server");
            queries.shutdown();
        }
    }
}

impl Parser for LspParser {
    fn language(&self) -> &str {
        &self.language
    }

    fn tier(&self) -> Tier {
        Tier::Lsp
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        match self.launcher {
            Launcher::Process => which::which(&self.server.command).is_ok(),
            Launcher::Custom(_) => true,
        }
    }

    fn parse(&self, content: &[u8], path: &Path) -> Result<FileAnalysis> {
        let text = String::from_utf8_lossy(content);
        let absolute = if path.is_absolute() {
            clean_path(path)
        } else {
            clean_path(&std::env::current_dir()?.join(path))
        };

        let mut session = lock(&self.session);
        if session.is_none() {
            *session = Some(self.start(&self.root_for(&absolute))?);
        }
        let queries = session
            .as_ref()
            .ok_or_else(|| CodeintelError::LspNotInitialized(self.language.clone()))?;

        let result = self.analyze(queries, &absolute, &text, &path.to_string_lossy());
        if let Err(e) = &result {
            if e.is_server_unavailable() || queries.client().is_closed() {
                warn!(language = %self.language, error = %e, "Discarding language server session");
                if let Some(dead) = session.take() {
                    dead.shutdown();
                }
            }
        }
        result
    }

    fn shutdown(&self) {
        self.shutdown_session();
    }
}

impl Drop for LspParser {
    fn drop(&mut self) {
        self.shutdown_session();
    }
}
