//! Regex pattern backends.
//!
//! Last-resort extraction that always works: declarations are recognized
//! line by line and their extent is estimated from braces, indentation or
//! `end` keywords depending on the language.

use crate::error::{CodeintelError, Result};
use crate::parser::{Parser, Tier};
use crate::types::{FileAnalysis, Relationship, RelationshipKind, Symbol, SymbolKind};
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::Arc;

/// How a declaration's extent is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockStyle {
    /// `{ ... }`
    Braces,
    /// Deeper-indented lines after the header.
    Indent,
    /// Matching `end` at the header's indentation.
    EndKeyword,
}

/// Naming or syntax convention for visibility.
#[derive(Debug, Clone, Copy)]
enum Visibility {
    Capitalized,
    NoLeadingUnderscore,
    Prefix(&'static str),
    NotContaining(&'static str),
    Always,
}

struct RuleSpec {
    pattern: &'static str,
    /// `None` for rules that only contribute relationships.
    kind: Option<SymbolKind>,
    /// Only recognized inside a container.
    member_only: bool,
}

const fn rule(pattern: &'static str, kind: SymbolKind) -> RuleSpec {
    RuleSpec {
        pattern,
        kind: Some(kind),
        member_only: false,
    }
}

const fn member(pattern: &'static str, kind: SymbolKind) -> RuleSpec {
    RuleSpec {
        pattern,
        kind: Some(kind),
        member_only: true,
    }
}

const fn relation(pattern: &'static str) -> RuleSpec {
    RuleSpec {
        pattern,
        kind: None,
        member_only: false,
    }
}

struct LanguageSpec {
    language: &'static str,
    style: BlockStyle,
    visibility: Visibility,
    rules: &'static [RuleSpec],
    imports: &'static [&'static str],
    /// Opening line of a grouped import and the pattern for its entries.
    import_block: Option<(&'static str, &'static str)>,
    doc_prefixes: &'static [&'static str],
    /// Lines skipped between a doc comment and its declaration.
    annotation_prefixes: &'static [&'static str],
    constructors: &'static [&'static str],
    keywords: &'static [&'static str],
}

const BLOCK_DOC: &[&str] = &["/**", "*/", "*", "//"];
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "with", "else", "new", "throw",
    "synchronized",
];

const GO: LanguageSpec = LanguageSpec {
    language: "go",
    style: BlockStyle::Braces,
    visibility: Visibility::Capitalized,
    rules: &[
        rule(r"^func\s+\([^)]*\)\s*(?P<name>\w+)", SymbolKind::Method),
        rule(r"^func\s+(?P<name>\w+)", SymbolKind::Function),
        rule(r"^type\s+(?P<name>\w+)(?:\[[^\]]*\])?\s+struct\b", SymbolKind::Class),
        rule(r"^type\s+(?P<name>\w+)(?:\[[^\]]*\])?\s+interface\b", SymbolKind::Interface),
        rule(r"^type\s+(?P<name>\w+)", SymbolKind::Type),
        rule(r"^const\s+(?P<name>\w+)", SymbolKind::Constant),
        rule(r"^var\s+(?P<name>\w+)", SymbolKind::Variable),
    ],
    imports: &[r#"^import\s+(?:[\w.]+\s+)?"(?P<path>[^"]+)""#],
    import_block: Some((r"^import\s*\(", r#"^\s*(?:[\w.]+\s+)?"(?P<path>[^"]+)""#)),
    doc_prefixes: &["//"],
    annotation_prefixes: &[],
    constructors: &[],
    keywords: &[],
};

const PYTHON: LanguageSpec = LanguageSpec {
    language: "python",
    style: BlockStyle::Indent,
    visibility: Visibility::NoLeadingUnderscore,
    rules: &[
        rule(r"^\s*(?:async\s+)?def\s+(?P<name>\w+)", SymbolKind::Function),
        rule(r"^\s*class\s+(?P<name>\w+)(?:\((?P<extends>[^)]*)\))?", SymbolKind::Class),
        rule(r"^(?P<name>[A-Z][A-Z0-9_]*)\s*(?::[^=]+)?=[^=]", SymbolKind::Constant),
    ],
    imports: &[
        r"^\s*import\s+(?P<path>[\w.]+)",
        r"^\s*from\s+(?P<path>[\w.]+)\s+import\b",
    ],
    import_block: None,
    doc_prefixes: &[],
    annotation_prefixes: &[],
    constructors: &["__init__"],
    keywords: &[],
};

const RUST: LanguageSpec = LanguageSpec {
    language: "rust",
    style: BlockStyle::Braces,
    visibility: Visibility::Prefix("pub"),
    rules: &[
        rule(
            r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+(?P<name>\w+)"#,
            SymbolKind::Function,
        ),
        rule(r"^\s*(?:pub(?:\([^)]*\))?\s+)?struct\s+(?P<name>\w+)", SymbolKind::Class),
        rule(r"^\s*(?:pub(?:\([^)]*\))?\s+)?enum\s+(?P<name>\w+)", SymbolKind::Enum),
        rule(
            r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?trait\s+(?P<name>\w+)(?:<[^>]*>)?(?:\s*:\s*(?P<extends>[^{]+?))?\s*(?:where\b|\{|$)",
            SymbolKind::Interface,
        ),
        rule(r"^\s*(?:pub(?:\([^)]*\))?\s+)?type\s+(?P<name>\w+)", SymbolKind::Type),
        rule(r"^\s*(?:pub(?:\([^)]*\))?\s+)?const\s+(?P<name>\w+)\s*:", SymbolKind::Constant),
        rule(r"^\s*(?:pub(?:\([^)]*\))?\s+)?static\s+(?:mut\s+)?(?P<name>\w+)", SymbolKind::Variable),
        relation(r"^\s*(?:unsafe\s+)?impl(?:<[^>]*>)?\s+(?P<implements>[\w:]+)(?:<[^>]*>)?\s+for\s+(?P<name>[\w:]+)"),
    ],
    imports: &[r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+(?P<path>[^;]+);"],
    import_block: None,
    doc_prefixes: &["///"],
    annotation_prefixes: &["#["],
    constructors: &[],
    keywords: &[],
};

const JS_IMPORTS: &[&str] = &[
    r#"^\s*import\s+(?:[^'"]*?\s+from\s+)?['"](?P<path>[^'"]+)['"]"#,
    r#"^\s*export\s+[^'"]*?\s+from\s+['"](?P<path>[^'"]+)['"]"#,
    r#"\brequire\(\s*['"](?P<path>[^'"]+)['"]\s*\)"#,
];

const JAVASCRIPT: LanguageSpec = LanguageSpec {
    language: "javascript",
    style: BlockStyle::Braces,
    visibility: Visibility::Prefix("export"),
    rules: &[
        rule(
            r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[\w$]+)",
            SymbolKind::Function,
        ),
        rule(
            r"^\s*(?:export\s+)?(?:default\s+)?class\s+(?P<name>[\w$]+)(?:\s+extends\s+(?P<extends>[\w$.]+))?",
            SymbolKind::Class,
        ),
        rule(
            r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[\w$]+)\s*=\s*(?:async\s+)?(?:function\b|(?:\([^)]*\)|[\w$]+)\s*=>)",
            SymbolKind::Function,
        ),
        rule(r"^\s*(?:export\s+)?const\s+(?P<name>[A-Z][A-Z0-9_]*)\s*=", SymbolKind::Constant),
        member(
            r"^\s+(?:static\s+)?(?:async\s+)?(?:get\s+|set\s+)?\*?(?P<name>[\w$#]+)\s*\([^)]*\)\s*\{",
            SymbolKind::Function,
        ),
    ],
    imports: JS_IMPORTS,
    import_block: None,
    doc_prefixes: BLOCK_DOC,
    annotation_prefixes: &["@"],
    constructors: &["constructor"],
    keywords: CONTROL_KEYWORDS,
};

const TYPESCRIPT: LanguageSpec = LanguageSpec {
    language: "typescript",
    style: BlockStyle::Braces,
    visibility: Visibility::Prefix("export"),
    rules: &[
        rule(
            r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[\w$]+)",
            SymbolKind::Function,
        ),
        rule(
            r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?class\s+(?P<name>[\w$]+)(?:<[^>]*>)?(?:\s+extends\s+(?P<extends>[\w$.]+)(?:<[^>]*>)?)?(?:\s+implements\s+(?P<implements>[\w$.]+(?:\s*,\s*[\w$.]+)*))?",
            SymbolKind::Class,
        ),
        rule(
            r"^\s*(?:export\s+)?(?:declare\s+)?interface\s+(?P<name>[\w$]+)(?:<[^>]*>)?(?:\s+extends\s+(?P<extends>[\w$.]+(?:\s*,\s*[\w$.]+)*))?",
            SymbolKind::Interface,
        ),
        rule(
            r"^\s*(?:export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+(?P<name>[\w$]+)",
            SymbolKind::Enum,
        ),
        rule(
            r"^\s*(?:export\s+)?(?:declare\s+)?type\s+(?P<name>[\w$]+)\s*(?:<[^>]*>)?\s*=",
            SymbolKind::Type,
        ),
        rule(
            r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[\w$]+)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|(?:\([^)]*\)|[\w$]+)\s*(?::\s*[^=]+)?=>)",
            SymbolKind::Function,
        ),
        rule(r"^\s*(?:export\s+)?const\s+(?P<name>[A-Z][A-Z0-9_]*)\s*(?::[^=]+)?=", SymbolKind::Constant),
        member(
            r"^\s+(?:(?:public|private|protected|static|readonly|async|abstract|override)\s+)*(?:get\s+|set\s+)?(?P<name>[\w$#]+)\??\s*(?:<[^>]*>)?\s*\([^)]*\)\s*(?::\s*[^{;]+)?[{;]",
            SymbolKind::Function,
        ),
    ],
    imports: JS_IMPORTS,
    import_block: None,
    doc_prefixes: BLOCK_DOC,
    annotation_prefixes: &["@"],
    constructors: &["constructor"],
    keywords: CONTROL_KEYWORDS,
};

const JAVA: LanguageSpec = LanguageSpec {
    language: "java",
    style: BlockStyle::Braces,
    visibility: Visibility::NotContaining("private"),
    rules: &[
        rule(
            r"^\s*(?:(?:public|protected|private|abstract|final|static|sealed|non-sealed|strictfp)\s+)*class\s+(?P<name>\w+)(?:<[^>]*>)?(?:\s+extends\s+(?P<extends>[\w.]+)(?:<[^>]*>)?)?(?:\s+implements\s+(?P<implements>[\w.]+(?:<[^>]*>)?(?:\s*,\s*[\w.]+(?:<[^>]*>)?)*))?",
            SymbolKind::Class,
        ),
        rule(
            r"^\s*(?:(?:public|protected|private|abstract|static|sealed|non-sealed|strictfp)\s+)*interface\s+(?P<name>\w+)(?:<[^>]*>)?(?:\s+extends\s+(?P<extends>[\w.]+(?:\s*,\s*[\w.]+)*))?",
            SymbolKind::Interface,
        ),
        rule(
            r"^\s*(?:(?:public|protected|private|static|final)\s+)*enum\s+(?P<name>\w+)",
            SymbolKind::Enum,
        ),
        rule(
            r"^\s*(?:(?:public|protected|private|static|final)\s+)*record\s+(?P<name>\w+)",
            SymbolKind::Class,
        ),
        member(
            r"^\s+(?:(?:public|protected|private)\s+)?(?P<name>[A-Z]\w*)\s*\(",
            SymbolKind::Constructor,
        ),
        member(
            r"^\s+(?:(?:public|protected|private|static|final|abstract|synchronized|native|default|strictfp)\s+)*(?:<[^>]*>\s+)?[\w.$\[\]]+(?:<[^>]*>)?(?:\[\])*\s+(?P<name>\w+)\s*\(",
            SymbolKind::Function,
        ),
    ],
    imports: &[r"^\s*import\s+(?:static\s+)?(?P<path>[\w.*]+)\s*;"],
    import_block: None,
    doc_prefixes: BLOCK_DOC,
    annotation_prefixes: &["@"],
    constructors: &[],
    keywords: CONTROL_KEYWORDS,
};

const RUBY: LanguageSpec = LanguageSpec {
    language: "ruby",
    style: BlockStyle::EndKeyword,
    visibility: Visibility::Always,
    rules: &[
        rule(r"^\s*def\s+(?:self\.)?(?P<name>[\w?!=]+)", SymbolKind::Function),
        rule(r"^\s*class\s+(?P<name>[\w:]+)(?:\s*<\s*(?P<extends>[\w:]+))?", SymbolKind::Class),
        rule(r"^(?P<name>[A-Z][A-Z0-9_]*)\s*=[^=]", SymbolKind::Constant),
    ],
    imports: &[r#"^\s*require(?:_relative)?\s*\(?\s*['"](?P<path>[^'"]+)['"]"#],
    import_block: None,
    doc_prefixes: &["#"],
    annotation_prefixes: &[],
    constructors: &["initialize"],
    keywords: &[],
};

const LANGUAGES: &[&LanguageSpec] = &[&GO, &PYTHON, &RUST, &JAVASCRIPT, &TYPESCRIPT, &JAVA, &RUBY];

struct Rule {
    regex: Regex,
    kind: Option<SymbolKind>,
    member_only: bool,
}

/// Regex backend for one language.
pub struct PatternParser {
    spec: &'static LanguageSpec,
    name: String,
    rules: Vec<Rule>,
    imports: Vec<Regex>,
    import_block: Option<(Regex, Regex)>,
}

impl PatternParser {
    /// Pattern backend for `language`.
    ///
    /// # Errors
    ///
    /// `UnsupportedLanguage` if no patterns exist for the language.
    pub fn for_language(language: &str) -> Result<Self> {
        let spec = LANGUAGES
            .iter()
            .find(|spec| spec.language == language)
            .ok_or_else(|| CodeintelError::UnsupportedLanguage(language.to_string()))?;
        Self::compile(spec)
    }

    fn compile(spec: &'static LanguageSpec) -> Result<Self> {
        let rules = spec
            .rules
            .iter()
            .map(|r| {
                Ok(Rule {
                    regex: Regex::new(r.pattern)?,
                    kind: r.kind,
                    member_only: r.member_only,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let imports = spec
            .imports
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let import_block = match spec.import_block {
            Some((start, entry)) => Some((Regex::new(start)?, Regex::new(entry)?)),
            None => None,
        };

        Ok(Self {
            spec,
            name: format!("pattern-{}", spec.language),
            rules,
            imports,
            import_block,
        })
    }

    /// Languages that have pattern rules.
    pub fn languages() -> impl Iterator<Item = &'static str> {
        LANGUAGES.iter().map(|spec| spec.language)
    }

    fn match_rule<'l>(&self, line: &'l str) -> Option<(&Rule, Captures<'l>)> {
        self.rules
            .iter()
            .find_map(|rule| rule.regex.captures(line).map(|caps| (rule, caps)))
    }

    /// Record imports on `line`. Returns whether a grouped import is still open.
    fn scan_imports(&self, line: &str, line_no: u32, in_block: bool, out: &mut Vec<Relationship>) -> bool {
        if in_block {
            if line.trim_start().starts_with(')') {
                return false;
            }
            if let Some((_, entry)) = &self.import_block {
                push_import(entry.captures(line), line_no, out);
            }
            return true;
        }

        if let Some((start, _)) = &self.import_block {
            if start.is_match(line) {
                return true;
            }
        }
        for regex in &self.imports {
            for caps in regex.captures_iter(line) {
                push_import(Some(caps), line_no, out);
            }
        }
        false
    }

    fn push_inheritance(&self, caps: &Captures<'_>, source: &str, line_no: u32, out: &mut Vec<Relationship>) {
        for (group, kind) in [
            ("extends", RelationshipKind::Extends),
            ("implements", RelationshipKind::Implements),
        ] {
            let Some(m) = caps.name(group) else {
                continue;
            };
            for target in split_type_list(m.as_str()) {
                out.push(
                    Relationship::to_symbol(kind, target, line_no, m.start() as u32 + 1)
                        .from_symbol(source),
                );
            }
        }
    }

    fn is_exported(&self, name: &str, line: &str) -> bool {
        match self.spec.visibility {
            Visibility::Capitalized => name.chars().next().is_some_and(char::is_uppercase),
            Visibility::NoLeadingUnderscore => !name.starts_with('_'),
            Visibility::Prefix(prefix) => line.trim_start().starts_with(prefix),
            Visibility::NotContaining(marker) => !line.contains(marker),
            Visibility::Always => true,
        }
    }

    fn member_exported(&self, parent: &Symbol, name: &str, line: &str) -> bool {
        match self.spec.visibility {
            Visibility::Prefix(_) => parent.exported && !line.contains("private") && !name.starts_with('#'),
            _ => self.is_exported(name, line),
        }
    }

    fn member_kind(&self, kind: SymbolKind, name: &str) -> SymbolKind {
        match kind {
            SymbolKind::Function if self.spec.constructors.contains(&name) => SymbolKind::Constructor,
            SymbolKind::Function => SymbolKind::Method,
            other => other,
        }
    }

    fn signature(&self, line: &str) -> String {
        let trimmed = line.trim().trim_end_matches('{').trim_end();
        match self.spec.style {
            BlockStyle::Indent => trimmed.trim_end_matches(':').to_string(),
            _ => trimmed.to_string(),
        }
    }

    fn block_end(&self, lines: &[&str], start: usize) -> usize {
        match self.spec.style {
            BlockStyle::Braces => brace_end(lines, start),
            BlockStyle::Indent => indent_end(lines, start),
            BlockStyle::EndKeyword => keyword_end(lines, start),
        }
    }

    fn doc_comment(&self, lines: &[&str], idx: usize) -> Option<String> {
        if self.spec.style == BlockStyle::Indent {
            return docstring(lines, idx);
        }

        let mut collected = Vec::new();
        let mut i = idx;
        while i > 0 {
            i -= 1;
            let line = lines[i].trim();
            if collected.is_empty()
                && self
                    .spec
                    .annotation_prefixes
                    .iter()
                    .any(|p| line.starts_with(p))
            {
                continue;
            }
            let Some(prefix) = self.spec.doc_prefixes.iter().find(|p| line.starts_with(**p)) else {
                break;
            };
            collected.push(line[prefix.len()..].trim_end_matches("*/").trim().to_string());
        }

        collected.retain(|l| !l.is_empty());
        if collected.is_empty() {
            return None;
        }
        collected.reverse();
        Some(collected.join("\n"))
    }
}

impl Parser for PatternParser {
    fn language(&self) -> &str {
        self.spec.language
    }

    fn tier(&self) -> Tier {
        Tier::Pattern
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, content: &[u8], path: &Path) -> Result<FileAnalysis> {
        let text = String::from_utf8_lossy(content);
        let lines: Vec<&str> = text.lines().collect();
        let mut out = FileAnalysis::empty(path.to_string_lossy(), self.spec.language);

        let mut in_import_block = false;
        let mut container: Option<usize> = None;
        let mut skip_until = 0u32;

        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx as u32 + 1;
            in_import_block = self.scan_imports(line, line_no, in_import_block, &mut out.relationships);
            if in_import_block || line_no <= skip_until {
                continue;
            }

            let Some((rule, caps)) = self.match_rule(line) else {
                continue;
            };
            let Some(name) = caps.name("name").map(|m| m.as_str()) else {
                continue;
            };
            if self.spec.keywords.contains(&name) {
                continue;
            }

            let parent = container.filter(|&c| {
                let open = &out.symbols[c];
                line_no > open.line_start && line_no <= open.line_end
            });
            if parent.is_none() && rule.member_only {
                continue;
            }

            let source = match (rule.kind, parent) {
                (None, _) => name.rsplit("::").next().unwrap_or(name),
                _ => name,
            };
            self.push_inheritance(&caps, source, line_no, &mut out.relationships);
            let Some(kind) = rule.kind else {
                continue;
            };

            let end = self.block_end(&lines, idx) as u32 + 1;
            let mut symbol = Symbol::new(name, kind, line_no, end).with_signature(self.signature(line));
            if let Some(doc) = self.doc_comment(&lines, idx) {
                symbol = symbol.with_doc(doc);
            }

            match parent {
                Some(c) => {
                    symbol.kind = self.member_kind(kind, name);
                    symbol.exported = self.member_exported(&out.symbols[c], name, line);
                    skip_until = symbol.line_end;
                    out.symbols[c].push_child(symbol);
                }
                None => {
                    symbol.exported = self.is_exported(name, line);
                    if kind.is_container() {
                        container = Some(out.symbols.len());
                    } else {
                        container = None;
                        skip_until = symbol.line_end;
                    }
                    out.symbols.push(symbol);
                }
            }
        }

        Ok(out)
    }
}

/// Pattern backends for every supported language.
pub fn default_parsers() -> Result<Vec<Arc<dyn Parser>>> {
    LANGUAGES
        .iter()
        .map(|spec| Ok(Arc::new(PatternParser::compile(spec)?) as Arc<dyn Parser>))
        .collect()
}

fn push_import(caps: Option<Captures<'_>>, line_no: u32, out: &mut Vec<Relationship>) {
    let Some(path) = caps.as_ref().and_then(|c| c.name("path")) else {
        return;
    };
    let target = path.as_str().trim();
    if !target.is_empty() {
        out.push(Relationship::to_file(
            RelationshipKind::Import,
            target,
            line_no,
            path.start() as u32 + 1,
        ));
    }
}

/// `A, b.C<T, U>, metaclass=M` yields `A` and `b.C`.
fn split_type_list(list: &str) -> Vec<&str> {
    let mut depth = 0i32;
    let mut items = Vec::new();
    let mut start = 0;
    for (i, ch) in list.char_indices() {
        match ch {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' | '+' if depth == 0 => {
                items.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&list[start..]);

    items
        .into_iter()
        .map(|item| item.split('<').next().unwrap_or(item).trim())
        .filter(|item| !item.is_empty() && !item.contains('=') && !item.starts_with('\''))
        .collect()
}

/// The code part of `line`, with string and char literals and any
/// trailing `//` comment removed.
fn code_only(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '/' if chars.get(i + 1) == Some(&'/') => break,
            quote @ ('"' | '`') => {
                i += 1;
                while i < chars.len() && chars[i] != quote {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            // Char literals only; a lone quote is a lifetime or label.
            '\'' => match (chars.get(i + 1), chars.get(i + 2), chars.get(i + 3)) {
                (Some('\\'), Some(_), Some('\'')) => i += 3,
                (Some(_), Some('\''), _) => i += 2,
                _ => out.push('\''),
            },
            ch => out.push(ch),
        }
        i += 1;
    }
    out
}

fn brace_end(lines: &[&str], start: usize) -> usize {
    let header = code_only(lines[start]);
    if !header.contains('{') {
        // Allow the opening brace on the following line only.
        let next_opens = lines
            .get(start + 1)
            .is_some_and(|l| l.trim_start().starts_with('{'));
        if !next_opens {
            return start;
        }
    }

    let mut depth = 0i32;
    let mut opened = false;
    for (i, line) in lines.iter().enumerate().skip(start) {
        for ch in code_only(line).chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return i;
        }
    }
    lines.len().saturating_sub(1).max(start)
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn indent_end(lines: &[&str], start: usize) -> usize {
    let base = indentation(lines[start]);
    let mut end = start;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indentation(line) <= base {
            break;
        }
        end = i;
    }
    end
}

fn keyword_end(lines: &[&str], start: usize) -> usize {
    let header = lines[start].trim();
    if header.ends_with(" end") || header.contains("; end") {
        return start;
    }

    let base = indentation(lines[start]);
    let mut last = start;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let indent = indentation(line);
        if indent == base && (trimmed == "end" || trimmed.starts_with("end ") || trimmed.starts_with("end#")) {
            return i;
        }
        if indent < base {
            break;
        }
        last = i;
    }
    last
}

fn docstring(lines: &[&str], idx: usize) -> Option<String> {
    let first = lines.get(idx + 1)?.trim();
    let quote = ["\"\"\"", "'''"].into_iter().find(|q| first.starts_with(q))?;
    let rest = &first[quote.len()..];

    if let Some(end) = rest.find(quote) {
        let doc = rest[..end].trim();
        return (!doc.is_empty()).then(|| doc.to_string());
    }

    let mut collected = vec![rest.trim().to_string()];
    for line in lines.iter().skip(idx + 2) {
        let line = line.trim();
        if let Some(end) = line.find(quote) {
            collected.push(line[..end].trim().to_string());
            break;
        }
        collected.push(line.to_string());
    }
    collected.retain(|l| !l.is_empty());
    (!collected.is_empty()).then(|| collected.join("\n"))
}
