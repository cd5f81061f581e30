//! Language Server Protocol (LSP) integration.
//!
//! Layers, bottom up: wire framing ([`protocol`]), the request/response
//! transport over a server's stdio ([`client`]), typed query sequences
//! ([`queries`]), conversion into the shared data model ([`edges`]), and
//! the parser backend built on all of them ([`analyzer`]).

pub mod analyzer;
pub mod client;
pub mod edges;
pub mod protocol;
pub mod queries;
pub mod uri;


pub use analyzer::LspParser;
pub use client::LspClient;
pub use edges::{call_relationships, outline_to_symbols};
pub use protocol::{JsonRpcError, JsonRpcMessage};
pub use queries::{LspQueries, OutlineSymbol};
pub use uri::{clean_path, path_to_uri, uri_to_path};
