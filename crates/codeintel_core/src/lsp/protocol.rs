//! LSP protocol types and JSON-RPC framing.
//!
//! Re-exports LSP types from the lsp-types crate and implements the
//! `Content-Length: N\r\n\r\n` + N bytes wire format.

pub use lsp_types::{
    CallHierarchyClientCapabilities, CallHierarchyIncomingCall, CallHierarchyIncomingCallsParams,
    CallHierarchyItem, CallHierarchyOutgoingCall, CallHierarchyOutgoingCallsParams,
    CallHierarchyPrepareParams, ClientCapabilities, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DocumentSymbol, DocumentSymbolClientCapabilities,
    DocumentSymbolParams, DocumentSymbolResponse, InitializeParams, InitializeResult,
    InitializedParams, Location, PartialResultParams, Position, Range, SymbolInformation,
    SymbolKind as LspSymbolKind, TextDocumentClientCapabilities, TextDocumentIdentifier,
    TextDocumentItem, TextDocumentPositionParams, Url, WorkDoneProgressParams, WorkspaceFolder,
};

use crate::error::{CodeintelError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, BufRead, ErrorKind, Write};

/// Frames larger than this are treated as malformed and skipped.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

const CONTENT_LENGTH: &str = "content-length";

/// JSON-RPC message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcMessage {
    pub jsonrpc: String, // Always "2.0"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<JsonRpcError> for CodeintelError {
    fn from(error: JsonRpcError) -> Self {
        CodeintelError::LspError {
            code: error.code,
            message: error.message,
        }
    }
}

impl JsonRpcMessage {
    /// Create a request message. `id` must be non-zero.
    pub fn request(id: u64, method: impl Into<String>, params: Value) -> Self {
        debug_assert!(id != 0, "request ids start at 1");
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(Value::Number(id.into())),
            method: Some(method.into()),
            params: Some(params),
            result: None,
            error: None,
        }
    }

    /// Create a notification message.
    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: Some(method.into()),
            params: Some(params),
            result: None,
            error: None,
        }
    }

    /// Create a successful response to a server-initiated request.
    pub fn response(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    /// Check if this is a response.
    pub fn is_response(&self) -> bool {
        self.id.is_some() && self.method.is_none()
    }

    /// Check if this is a request sent by the server.
    pub fn is_request(&self) -> bool {
        self.id.is_some() && self.method.is_some()
    }

    /// Check if this is a notification.
    pub fn is_notification(&self) -> bool {
        self.id.is_none() && self.method.is_some()
    }

    /// Get request ID as u64. Numeric strings are accepted.
    pub fn get_id_u64(&self) -> Option<u64> {
        match self.id.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Serialize into a complete wire frame.
    pub fn to_frame(&self) -> Result<Vec<u8>> {
        let body =
            serde_json::to_vec(self).map_err(|e| CodeintelError::Serialization(e.to_string()))?;
        let mut frame = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Parse a frame body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| CodeintelError::Deserialization(e.to_string()))
    }
}

/// Write one framed message and flush.
pub fn write_message<W: Write>(writer: &mut W, message: &JsonRpcMessage) -> Result<()> {
    let frame = message.to_frame()?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame body.
///
/// Returns `Ok(None)` at end of stream, `Err(LspProtocolError)` for a
/// malformed header block (the block is consumed, so the caller may keep
/// reading), and `Err(Io)` when the stream itself failed.
pub fn read_frame<R: BufRead>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut content_length: Option<usize> = None;
    let mut bad_header: Option<String> = None;
    let mut saw_header = false;

    loop {
        let mut raw = Vec::new();
        let n = reader.read_until(b'\n', &mut raw)?;
        if n == 0 {
            // EOF, possibly mid-header
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();

        // Empty line marks end of headers; leading blank lines are noise
        if line.is_empty() {
            if saw_header {
                break;
            }
            continue;
        }
        saw_header = true;

        let Some((name, value)) = line.split_once(':') else {
            bad_header = Some(format!("invalid header line: {:?}", line));
            continue;
        };
        if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            match value.trim().parse::<usize>() {
                Ok(len) => content_length = Some(len),
                Err(_) => bad_header = Some(format!("invalid Content-Length: {:?}", value.trim())),
            }
        }
    }

    if let Some(reason) = bad_header {
        return Err(CodeintelError::LspProtocolError(reason));
    }
    let content_length = content_length
        .ok_or_else(|| CodeintelError::LspProtocolError("missing Content-Length header".into()))?;
    if content_length > MAX_FRAME_LEN {
        // Drain the body so the next header starts at a frame boundary
        io::copy(&mut io::Read::take(&mut *reader, content_length as u64), &mut io::sink())?;
        return Err(CodeintelError::LspProtocolError(format!(
            "frame of {} bytes exceeds limit of {} bytes",
            content_length, MAX_FRAME_LEN
        )));
    }

    let mut body = vec![0u8; content_length];
    match reader.read_exact(&mut body) {
        Ok(()) => Ok(Some(body)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}
