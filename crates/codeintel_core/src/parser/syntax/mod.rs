//! Syntax-tree backends built on bundled tree-sitter grammars.

mod go;
mod python;
mod rust;

use crate::error::{CodeintelError, Result};
use crate::parser::{Parser, Tier};
use crate::types::{FileAnalysis, Relationship, RelationshipKind};
use std::path::Path;
use std::sync::Arc;
use tree_sitter::{Language, Node};

type Extractor = fn(Node<'_>, &str, &mut FileAnalysis);

/// Tree-sitter backend for one language.
pub struct SyntaxParser {
    language: &'static str,
    name: &'static str,
    grammar: Language,
    extract: Extractor,
}

impl SyntaxParser {
    /// Go grammar.
    pub fn go() -> Self {
        Self {
            language: "go",
            name: "tree-sitter-go",
            grammar: tree_sitter_go::LANGUAGE.into(),
            extract: go::extract,
        }
    }

    /// Python grammar.
    pub fn python() -> Self {
        Self {
            language: "python",
            name: "tree-sitter-python",
            grammar: tree_sitter_python::LANGUAGE.into(),
            extract: python::extract,
        }
    }

    /// Rust grammar.
    pub fn rust() -> Self {
        Self {
            language: "rust",
            name: "tree-sitter-rust",
            grammar: tree_sitter_rust::LANGUAGE.into(),
            extract: rust::extract,
        }
    }

    fn failed(&self, path: &Path, reason: impl Into<String>) -> CodeintelError {
        CodeintelError::ParseFailed {
            backend: self.name.to_string(),
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

impl Parser for SyntaxParser {
    fn language(&self) -> &str {
        self.language
    }

    fn tier(&self) -> Tier {
        Tier::SyntaxTree
    }

    fn name(&self) -> &str {
        self.name
    }

    fn parse(&self, content: &[u8], path: &Path) -> Result<FileAnalysis> {
        let source = String::from_utf8_lossy(content);

        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&self.grammar)
            .map_err(|e| self.failed(path, e.to_string()))?;
        let tree = parser
            .parse(source.as_bytes(), None)
            .ok_or_else(|| self.failed(path, "parser produced no tree"))?;

        let mut analysis = FileAnalysis::empty(path.to_string_lossy(), self.language);
        (self.extract)(tree.root_node(), &source, &mut analysis);
        Ok(analysis)
    }
}

/// All bundled syntax-tree backends.
pub fn default_parsers() -> Vec<Arc<dyn Parser>> {
    vec![
        Arc::new(SyntaxParser::go()),
        Arc::new(SyntaxParser::python()),
        Arc::new(SyntaxParser::rust()),
    ]
}

fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("").trim()
}

fn start_line(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

fn end_line(node: Node<'_>) -> u32 {
    let end = node.end_position();
    // A node ending at column 0 stops at the previous line's newline.
    let row = if end.column == 0 && end.row > node.start_position().row {
        end.row - 1
    } else {
        end.row
    };
    row as u32 + 1
}

fn start_column(node: Node<'_>) -> u32 {
    node.start_position().column as u32 + 1
}

fn field_text<'a>(node: Node<'_>, field: &str, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field)
        .map(|n| node_text(n, source))
        .filter(|t| !t.is_empty())
}

/// Declaration text up to (not including) the body node.
fn signature_before(node: Node<'_>, body_field: &str, source: &str) -> String {
    let end = node
        .child_by_field_name(body_field)
        .map_or(node.end_byte(), |b| b.start_byte());
    let text = source.get(node.start_byte()..end).unwrap_or("");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comment block directly above `node`, with `prefix` stripped from each line.
fn doc_comment_above(node: Node<'_>, source: &str, comment_kinds: &[&str], prefix: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut expected_end = node.start_position().row;
    let mut current = node.prev_named_sibling();

    while let Some(comment) = current {
        if comment.kind() == "attribute_item" && lines.is_empty() {
            expected_end = comment.start_position().row;
            current = comment.prev_named_sibling();
            continue;
        }
        if !comment_kinds.contains(&comment.kind()) {
            break;
        }
        // Line comments in some grammars include the trailing newline.
        let end_row = if comment.end_position().column == 0 {
            comment.end_position().row.saturating_sub(1)
        } else {
            comment.end_position().row
        };
        if end_row + 1 != expected_end {
            break;
        }
        let text = node_text(comment, source);
        let Some(stripped) = text.strip_prefix(prefix) else {
            break;
        };
        lines.push(stripped.strip_prefix(' ').unwrap_or(stripped).trim_end().to_string());
        expected_end = comment.start_position().row;
        current = comment.prev_named_sibling();
    }

    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}

/// Call edges for every `call_kind` node under `node`, attributed to `scope`.
fn collect_calls(
    node: Node<'_>,
    source: &str,
    call_kind: &str,
    scope: &str,
    out: &mut Vec<Relationship>,
) {
    if node.kind() == call_kind {
        if let Some(function) = node.child_by_field_name("function") {
            let target = node_text(function, source);
            if is_simple_call_target(target) {
                out.push(
                    Relationship::to_symbol(
                        RelationshipKind::Call,
                        target,
                        start_line(function),
                        start_column(function),
                    )
                    .from_symbol(scope),
                );
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_calls(child, source, call_kind, scope, out);
    }
}

fn is_simple_call_target(raw: &str) -> bool {
    !raw.is_empty()
        && raw
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '.' || ch == ':')
}

fn unquote(raw: &str) -> &str {
    let trimmed = raw.trim();
    for quote in ['"', '\'', '`'] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}
