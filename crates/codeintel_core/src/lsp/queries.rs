//! High-level LSP query wrappers.
//!
//! Implements the request sequences the extraction layer needs on top of
//! [`LspClient`]: the initialize handshake, scoped document open/close,
//! document symbols, and call hierarchy.

use crate::error::{CodeintelError, Result};
use crate::language::lsp_language_id;
use crate::lsp::client::LspClient;
use crate::lsp::edges::{incoming_to_call_info, outgoing_to_call_info};
use crate::lsp::protocol::{
    CallHierarchyClientCapabilities, CallHierarchyIncomingCall, CallHierarchyIncomingCallsParams,
    CallHierarchyItem, CallHierarchyOutgoingCall, CallHierarchyOutgoingCallsParams,
    CallHierarchyPrepareParams, ClientCapabilities, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DocumentSymbol, DocumentSymbolClientCapabilities,
    DocumentSymbolParams, DocumentSymbolResponse, InitializeParams, InitializeResult,
    InitializedParams, LspSymbolKind, PartialResultParams, Position, Range, SymbolInformation,
    TextDocumentClientCapabilities, TextDocumentIdentifier, TextDocumentItem,
    TextDocumentPositionParams, Url, WorkDoneProgressParams, WorkspaceFolder,
};
use crate::lsp::uri::{path_to_url, url_to_path};
use crate::types::CallInfo;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// A document symbol with 1-based line numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineSymbol {
    /// Symbol name.
    pub name: String,
    /// Server-provided detail (often the signature).
    pub detail: Option<String>,
    /// LSP symbol kind.
    pub kind: LspSymbolKind,
    /// First line of the full range, 1-based.
    pub line_start: u32,
    /// Last line of the full range, 1-based.
    pub line_end: u32,
    /// Line of the name, 1-based.
    pub name_line: u32,
    /// Column of the name, 1-based.
    pub name_column: u32,
    /// Nested symbols.
    pub children: Vec<OutlineSymbol>,
}

impl OutlineSymbol {
    fn from_document_symbol(sym: &DocumentSymbol) -> Self {
        let (line_start, line_end) = one_based_lines(&sym.range);
        Self {
            name: sym.name.clone(),
            detail: sym.detail.clone().filter(|d| !d.is_empty()),
            kind: sym.kind,
            line_start,
            line_end,
            name_line: sym.selection_range.start.line + 1,
            name_column: sym.selection_range.start.character + 1,
            children: sym
                .children
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(Self::from_document_symbol)
                .collect(),
        }
    }

    fn from_symbol_information(sym: &SymbolInformation) -> Self {
        let (line_start, line_end) = one_based_lines(&sym.location.range);
        Self {
            name: sym.name.clone(),
            detail: None,
            kind: sym.kind,
            line_start,
            line_end,
            name_line: line_start,
            name_column: sym.location.range.start.character + 1,
            children: Vec::new(),
        }
    }
}

fn one_based_lines(range: &Range) -> (u32, u32) {
    let start = range.start.line + 1;
    let end = (range.end.line + 1).max(start);
    (start, end)
}

/// Flat responses carry `containerName`; nest members under their container.
fn nest_flat_symbols(symbols: &[SymbolInformation]) -> Vec<OutlineSymbol> {
    let mut roots: Vec<OutlineSymbol> = Vec::new();
    for sym in symbols {
        let outline = OutlineSymbol::from_symbol_information(sym);
        let parent = sym
            .container_name
            .as_deref()
            .filter(|c| !c.is_empty())
            .and_then(|c| roots.iter_mut().rev().find(|r| r.name == c));
        match parent {
            Some(parent) => parent.children.push(outline),
            None => roots.push(outline),
        }
    }
    roots
}

/// Convert 1-based line/column to an LSP position.
fn position(line: u32, column: u32) -> Position {
    Position {
        line: line.saturating_sub(1),
        character: column.saturating_sub(1),
    }
}

/// Request sequences over one language server connection.
pub struct LspQueries {
    client: LspClient,
    ready: AtomicBool,
    language_id: Option<String>,
}

impl LspQueries {
    /// Wrap a connected client. Call [`initialize`](Self::initialize) next.
    pub fn new(client: LspClient) -> Self {
        Self {
            client,
            ready: AtomicBool::new(false),
            language_id: None,
        }
    }

    /// Use a fixed `languageId` for `didOpen` instead of inferring it.
    pub fn with_language_id(mut self, language_id: Option<String>) -> Self {
        self.language_id = language_id;
        self
    }

    /// Underlying transport.
    pub fn client(&self) -> &LspClient {
        &self.client
    }

    /// Whether the handshake has completed.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn ensure_ready(&self, method: &str) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(CodeintelError::LspNotInitialized(method.to_string()))
        }
    }

    /// Perform the `initialize` / `initialized` handshake.
    pub fn initialize(&self, root_path: &Path) -> Result<InitializeResult> {
        let root_uri = path_to_url(root_path)?;
        let root_name = root_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());

        #[allow(deprecated)]
        let params = InitializeParams {
            process_id: Some(std::process::id()),
            root_path: None, // Deprecated: use root_uri instead
            root_uri: Some(root_uri.clone()),
            initialization_options: None,
            capabilities: ClientCapabilities {
                text_document: Some(TextDocumentClientCapabilities {
                    call_hierarchy: Some(CallHierarchyClientCapabilities {
                        dynamic_registration: Some(false),
                    }),
                    document_symbol: Some(DocumentSymbolClientCapabilities {
                        hierarchical_document_symbol_support: Some(true),
                        dynamic_registration: None,
                        symbol_kind: None,
                        tag_support: None,
                    }),
                    ..Default::default()
                }),
                workspace: None,
                window: None,
                general: None,
                experimental: None,
            },
            trace: None,
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: root_uri,
                name: root_name,
            }]),
            client_info: Some(lsp_types::ClientInfo {
                name: "codeintel".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            locale: None,
        };

        let timeout = self.client.options().initialize_timeout;
        let result: InitializeResult = self.client.call("initialize", &params, timeout)?;
        self.client.notify("initialized", &InitializedParams {})?;
        self.ready.store(true, Ordering::SeqCst);

        debug!(
            server = %self.client.server(),
            root = %root_path.display(),
            document_symbols = result.capabilities.document_symbol_provider.is_some(),
            call_hierarchy = result.capabilities.call_hierarchy_provider.is_some(),
            "Language server initialized"
        );
        Ok(result)
    }

    /// Send `textDocument/didOpen`.
    pub fn open_document(&self, uri: &Url, text: &str) -> Result<()> {
        self.ensure_ready("textDocument/didOpen")?;
        let language_id = self
            .language_id
            .clone()
            .unwrap_or_else(|| lsp_language_id(&url_to_path(uri)).to_string());

        let params = DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id,
                version: 1,
                text: text.to_string(),
            },
        };
        self.client.notify("textDocument/didOpen", &params)
    }

    /// Send `textDocument/didClose`.
    pub fn close_document(&self, uri: &Url) -> Result<()> {
        self.ensure_ready("textDocument/didClose")?;
        let params = DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
        };
        self.client.notify("textDocument/didClose", &params)
    }

    /// Open `uri`, run `f`, then close it whatever `f` returned.
    pub fn with_document<T>(
        &self,
        uri: &Url,
        text: &str,
        f: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        self.open_document(uri, text)?;
        let result = f(self);
        if let Err(e) = self.close_document(uri) {
            debug!(uri = %uri, error = %e, "didClose failed");
        }
        result
    }

    /// Document outline for an already-open document.
    pub fn query_document_symbols(&self, uri: &Url) -> Result<Vec<OutlineSymbol>> {
        self.ensure_ready("textDocument/documentSymbol")?;
        let params = DocumentSymbolParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        };

        let timeout = self.client.options().request_timeout;
        let response: Option<DocumentSymbolResponse> =
            self.client.call("textDocument/documentSymbol", &params, timeout)?;

        Ok(match response {
            None => Vec::new(),
            Some(DocumentSymbolResponse::Nested(symbols)) => symbols
                .iter()
                .map(OutlineSymbol::from_document_symbol)
                .collect(),
            Some(DocumentSymbolResponse::Flat(symbols)) => nest_flat_symbols(&symbols),
        })
    }

    /// Open, query symbols, close. Server-side state does not accumulate
    /// across files.
    pub fn document_symbols(&self, uri: &Url, text: &str) -> Result<Vec<OutlineSymbol>> {
        self.with_document(uri, text, |q| q.query_document_symbols(uri))
    }

    /// Call-hierarchy item for the symbol at a 1-based line/column.
    pub fn prepare_call_hierarchy(
        &self,
        uri: &Url,
        line: u32,
        column: u32,
    ) -> Result<Option<CallHierarchyItem>> {
        self.ensure_ready("textDocument/prepareCallHierarchy")?;
        let params = CallHierarchyPrepareParams {
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri: uri.clone() },
                position: position(line, column),
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
        };

        let timeout = self.client.options().call_hierarchy_timeout;
        let response: Option<Vec<CallHierarchyItem>> =
            self.client
                .call("textDocument/prepareCallHierarchy", &params, timeout)?;
        Ok(response.unwrap_or_default().into_iter().next())
    }

    /// Callers of `item`.
    pub fn incoming_calls(&self, item: &CallHierarchyItem) -> Result<Vec<CallHierarchyIncomingCall>> {
        self.ensure_ready("callHierarchy/incomingCalls")?;
        let params = CallHierarchyIncomingCallsParams {
            item: item.clone(),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        };
        let timeout = self.client.options().call_hierarchy_timeout;
        let response: Option<Vec<CallHierarchyIncomingCall>> =
            self.client.call("callHierarchy/incomingCalls", &params, timeout)?;
        Ok(response.unwrap_or_default())
    }

    /// Callees of `item`.
    pub fn outgoing_calls(&self, item: &CallHierarchyItem) -> Result<Vec<CallHierarchyOutgoingCall>> {
        self.ensure_ready("callHierarchy/outgoingCalls")?;
        let params = CallHierarchyOutgoingCallsParams {
            item: item.clone(),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        };
        let timeout = self.client.options().call_hierarchy_timeout;
        let response: Option<Vec<CallHierarchyOutgoingCall>> =
            self.client.call("callHierarchy/outgoingCalls", &params, timeout)?;
        Ok(response.unwrap_or_default())
    }

    /// Incoming and outgoing call edges for the symbol at a 1-based
    /// line/column of `file`, as one flat list (incoming first).
    pub fn extract_calls_for_symbol(&self, file: &Path, line: u32, column: u32) -> Result<Vec<CallInfo>> {
        let uri = path_to_url(file)?;
        let Some(item) = self.prepare_call_hierarchy(&uri, line, column)? else {
            debug!(file = %file.display(), line, column, "No call hierarchy item at position");
            return Ok(Vec::new());
        };

        let mut calls: Vec<CallInfo> = self
            .incoming_calls(&item)?
            .iter()
            .flat_map(|call| incoming_to_call_info(&item, call))
            .collect();
        calls.extend(
            self.outgoing_calls(&item)?
                .iter()
                .flat_map(|call| outgoing_to_call_info(&item, call)),
        );

        debug!(symbol = %item.name, calls = calls.len(), "Extracted call edges");
        Ok(calls)
    }

    /// Close the session. Idempotent.
    pub fn shutdown(&self) {
        self.ready.store(false, Ordering::SeqCst);
        self.client.close();
    }
}
