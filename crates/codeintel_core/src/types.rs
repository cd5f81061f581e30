//! Core data types produced by every extraction backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language tag used when a path matches no known language.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Kind of a declared symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Class or struct.
    Class,
    /// Interface, trait or protocol.
    Interface,
    /// Free function.
    Function,
    /// Function bound to a type.
    Method,
    /// Variable or static.
    Variable,
    /// Constant.
    Constant,
    /// Type alias or other named type.
    Type,
    /// Enumeration.
    Enum,
    /// Field, property or enum member.
    Property,
    /// Constructor.
    Constructor,
}

impl SymbolKind {
    /// Container kinds may carry one level of children.
    pub fn is_container(self) -> bool {
        matches!(self, Self::Class | Self::Interface | Self::Enum)
    }

    /// Kinds that participate in call graphs.
    pub fn is_callable(self) -> bool {
        matches!(self, Self::Function | Self::Method | Self::Constructor)
    }

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Function => "function",
            Self::Method => "method",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Type => "type",
            Self::Enum => "enum",
            Self::Property => "property",
            Self::Constructor => "constructor",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named program construct with a source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Simple name.
    pub name: String,
    /// Symbol kind.
    pub kind: SymbolKind,
    /// First line, 1-based inclusive.
    pub line_start: u32,
    /// Last line, 1-based inclusive. Never less than `line_start`.
    pub line_end: u32,
    /// Declaration signature, free text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
    /// Attached documentation comment.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc_comment: String,
    /// Whether the symbol is visible outside its module.
    pub exported: bool,
    /// Members of a container symbol (one level only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Symbol>,
}

impl Symbol {
    /// Create a symbol, clamping `line_end` so it never precedes `line_start`.
    pub fn new(name: impl Into<String>, kind: SymbolKind, line_start: u32, line_end: u32) -> Self {
        let line_start = line_start.max(1);
        Self {
            name: name.into(),
            kind,
            line_start,
            line_end: line_end.max(line_start),
            signature: String::new(),
            doc_comment: String::new(),
            exported: false,
            children: Vec::new(),
        }
    }

    /// Set the signature.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Set the doc comment.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc_comment = doc.into();
        self
    }

    /// Set the exported flag.
    pub fn exported(mut self, exported: bool) -> Self {
        self.exported = exported;
        self
    }

    /// Attach a member. Ignored unless this symbol is a container.
    pub fn push_child(&mut self, child: Symbol) {
        if self.kind.is_container() {
            self.children.push(child);
        }
    }

    /// Whether `line` falls inside this symbol's range.
    pub fn contains_line(&self, line: u32) -> bool {
        self.line_start <= line && line <= self.line_end
    }
}

/// Kind of a relationship edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    /// Module or package import.
    Import,
    /// Function or method call.
    Call,
    /// Generic reference to a symbol.
    Reference,
    /// Class inheritance.
    Extends,
    /// Interface implementation.
    Implements,
    /// Type usage.
    Uses,
}

impl RelationshipKind {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Call => "call",
            Self::Reference => "reference",
            Self::Extends => "extends",
            Self::Implements => "implements",
            Self::Uses => "uses",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed edge discovered during extraction.
///
/// At least one of `target_file` and `target_symbol` is populated; the
/// constructors enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Edge kind.
    pub kind: RelationshipKind,
    /// Enclosing symbol at the edge's origin, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_symbol: Option<String>,
    /// Target file or module path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
    /// Target symbol name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_symbol: Option<String>,
    /// 1-based line of the edge's origin.
    pub line: u32,
    /// 1-based column of the edge's origin.
    pub column: u32,
}

impl Relationship {
    /// Edge pointing at a file or module (imports).
    pub fn to_file(kind: RelationshipKind, target_file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            source_symbol: None,
            target_file: Some(target_file.into()),
            target_symbol: None,
            line,
            column,
        }
    }

    /// Edge pointing at a symbol (calls, inheritance, references).
    pub fn to_symbol(
        kind: RelationshipKind,
        target_symbol: impl Into<String>,
        line: u32,
        column: u32,
    ) -> Self {
        Self {
            kind,
            source_symbol: None,
            target_file: None,
            target_symbol: Some(target_symbol.into()),
            line,
            column,
        }
    }

    /// Set the originating symbol.
    pub fn from_symbol(mut self, source: impl Into<String>) -> Self {
        self.source_symbol = Some(source.into());
        self
    }

    /// Set the target file alongside a symbol target.
    pub fn in_file(mut self, target_file: impl Into<String>) -> Self {
        self.target_file = Some(target_file.into());
        self
    }
}

/// Per-file output of a parser backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileAnalysis {
    /// Path as supplied by the caller.
    pub path: String,
    /// Language tag.
    pub language: String,
    /// Top-level declarations.
    pub symbols: Vec<Symbol>,
    /// Relationships in source order.
    pub relationships: Vec<Relationship>,
}

impl FileAnalysis {
    /// Empty analysis tagged with a language.
    pub fn empty(path: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            symbols: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Empty analysis for a path with no recognized language.
    pub fn unknown(path: impl Into<String>) -> Self {
        Self::empty(path, UNKNOWN_LANGUAGE)
    }

    /// True if nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.relationships.is_empty()
    }

    /// Total symbols including one level of children.
    pub fn symbol_count(&self) -> usize {
        self.symbols.iter().map(|s| 1 + s.children.len()).sum()
    }

    /// Innermost symbol name whose range covers `line` (member before container).
    pub fn enclosing_symbol(&self, line: u32) -> Option<&str> {
        let top = self.symbols.iter().find(|s| s.contains_line(line))?;
        let inner = top.children.iter().find(|c| c.contains_line(line));
        Some(inner.map_or(top.name.as_str(), |c| c.name.as_str()))
    }
}

/// A call edge derived from a call-hierarchy query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInfo {
    /// File containing the caller.
    pub caller_file: String,
    /// Calling symbol name.
    pub caller_symbol: String,
    /// 1-based line of the call site.
    pub caller_line: u32,
    /// File containing the callee.
    pub callee_file: String,
    /// Called symbol name.
    pub callee_symbol: String,
    /// 1-based line of the callee declaration.
    pub callee_line: u32,
}

impl CallInfo {
    /// Convert into a relationship anchored at the call site.
    pub fn to_relationship(&self) -> Relationship {
        Relationship::to_symbol(RelationshipKind::Call, &self.callee_symbol, self.caller_line, 1)
            .from_symbol(&self.caller_symbol)
            .in_file(&self.callee_file)
    }
}
