//! Convert LSP query results into the shared data model.
//!
//! Bridges protocol types (call-hierarchy items, document outlines) to
//! [`CallInfo`], [`Symbol`] and [`Relationship`] records.

use crate::lsp::protocol::{
    CallHierarchyIncomingCall, CallHierarchyItem, CallHierarchyOutgoingCall, LspSymbolKind, Range,
};
use crate::lsp::queries::OutlineSymbol;
use crate::lsp::uri::url_to_path;
use crate::types::{CallInfo, Relationship, Symbol, SymbolKind};
use std::path::Path;

fn item_file(item: &CallHierarchyItem) -> String {
    url_to_path(&item.uri).to_string_lossy().into_owned()
}

fn item_line(item: &CallHierarchyItem) -> u32 {
    item.selection_range.start.line + 1
}

/// Call sites as 1-based lines; falls back to `fallback` when the server
/// sent no ranges.
fn call_site_lines(ranges: &[Range], fallback: u32) -> Vec<u32> {
    if ranges.is_empty() {
        vec![fallback]
    } else {
        ranges.iter().map(|r| r.start.line + 1).collect()
    }
}

/// One [`CallInfo`] per call site of `call.from` calling `target`.
pub fn incoming_to_call_info(
    target: &CallHierarchyItem,
    call: &CallHierarchyIncomingCall,
) -> Vec<CallInfo> {
    let caller_file = item_file(&call.from);
    call_site_lines(&call.from_ranges, item_line(&call.from))
        .into_iter()
        .map(|line| CallInfo {
            caller_file: caller_file.clone(),
            caller_symbol: call.from.name.clone(),
            caller_line: line,
            callee_file: item_file(target),
            callee_symbol: target.name.clone(),
            callee_line: item_line(target),
        })
        .collect()
}

/// One [`CallInfo`] per call site of `source` calling `call.to`.
pub fn outgoing_to_call_info(
    source: &CallHierarchyItem,
    call: &CallHierarchyOutgoingCall,
) -> Vec<CallInfo> {
    let caller_file = item_file(source);
    call_site_lines(&call.from_ranges, item_line(source))
        .into_iter()
        .map(|line| CallInfo {
            caller_file: caller_file.clone(),
            caller_symbol: source.name.clone(),
            caller_line: line,
            callee_file: item_file(&call.to),
            callee_symbol: call.to.name.clone(),
            callee_line: item_line(&call.to),
        })
        .collect()
}

/// Call relationships originating in `file`, in source order.
pub fn call_relationships(calls: &[CallInfo], file: &Path) -> Vec<Relationship> {
    let file = file.to_string_lossy();
    let mut relationships: Vec<Relationship> = calls
        .iter()
        .filter(|c| c.caller_file == file)
        .map(CallInfo::to_relationship)
        .collect();
    relationships.sort_by_key(|r| (r.line, r.column));
    relationships.dedup();
    relationships
}

fn map_kind(kind: LspSymbolKind) -> Option<SymbolKind> {
    match kind {
        LspSymbolKind::CLASS | LspSymbolKind::STRUCT => Some(SymbolKind::Class),
        LspSymbolKind::INTERFACE => Some(SymbolKind::Interface),
        LspSymbolKind::FUNCTION => Some(SymbolKind::Function),
        LspSymbolKind::METHOD => Some(SymbolKind::Method),
        LspSymbolKind::CONSTRUCTOR => Some(SymbolKind::Constructor),
        LspSymbolKind::VARIABLE => Some(SymbolKind::Variable),
        LspSymbolKind::CONSTANT => Some(SymbolKind::Constant),
        LspSymbolKind::ENUM => Some(SymbolKind::Enum),
        LspSymbolKind::ENUM_MEMBER | LspSymbolKind::FIELD | LspSymbolKind::PROPERTY => {
            Some(SymbolKind::Property)
        }
        LspSymbolKind::TYPE_PARAMETER => Some(SymbolKind::Type),
        _ => None,
    }
}

fn is_namespace(kind: LspSymbolKind) -> bool {
    matches!(
        kind,
        LspSymbolKind::MODULE | LspSymbolKind::NAMESPACE | LspSymbolKind::PACKAGE
    )
}

/// Visibility guess from naming conventions and the declaring line.
fn is_exported(language: &str, name: &str, line: &str) -> bool {
    let line = line.trim_start();
    match language {
        "go" => name.chars().next().is_some_and(char::is_uppercase),
        "python" => !name.starts_with('_'),
        "rust" => line.starts_with("pub"),
        "javascript" | "typescript" => line.starts_with("export"),
        "java" | "csharp" | "kotlin" => !line.contains("private"),
        _ => true,
    }
}

struct Converter<'a> {
    language: &'a str,
    lines: Vec<&'a str>,
}

impl Converter<'_> {
    fn source_line(&self, line: u32) -> &str {
        self.lines
            .get(line.saturating_sub(1) as usize)
            .copied()
            .unwrap_or_default()
    }

    fn symbol(&self, outline: &OutlineSymbol, kind: SymbolKind) -> Symbol {
        let declaring = self.source_line(outline.name_line);
        let signature = outline
            .detail
            .clone()
            .unwrap_or_else(|| declaring.trim().trim_end_matches('{').trim_end().to_string());
        Symbol::new(&outline.name, kind, outline.line_start, outline.line_end)
            .with_signature(signature)
            .exported(is_exported(self.language, &outline.name, declaring))
    }

    fn convert(&self, outline: &[OutlineSymbol], out: &mut Vec<Symbol>) {
        for entry in outline {
            if is_namespace(entry.kind) {
                self.convert(&entry.children, out);
                continue;
            }
            let Some(kind) = map_kind(entry.kind) else {
                continue;
            };
            let mut symbol = self.symbol(entry, kind);
            if kind.is_container() {
                for child in &entry.children {
                    if let Some(child_kind) = map_kind(child.kind) {
                        symbol.push_child(self.symbol(child, child_kind));
                    }
                }
            }
            out.push(symbol);
        }
    }
}

/// Convert a document outline to top-level [`Symbol`]s with one level of
/// members under containers. Module-like entries are flattened away.
pub fn outline_to_symbols(outline: &[OutlineSymbol], language: &str, text: &str) -> Vec<Symbol> {
    let converter = Converter {
        language,
        lines: text.lines().collect(),
    };
    let mut symbols = Vec::new();
    converter.convert(outline, &mut symbols);
    symbols
}

/// Name positions (1-based line, column) of every callable in `outline`,
/// including members of containers.
pub fn callable_positions(outline: &[OutlineSymbol]) -> Vec<(u32, u32)> {
    let mut positions = Vec::new();
    for entry in outline {
        let kind = map_kind(entry.kind);
        if is_namespace(entry.kind) || kind.is_some_and(SymbolKind::is_container) {
            positions.extend(callable_positions(&entry.children));
        } else if kind.is_some_and(SymbolKind::is_callable) {
            positions.push((entry.name_line, entry.name_column));
        }
    }
    positions
}
