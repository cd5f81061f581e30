use super::{collect_calls, end_line, field_text, node_text, signature_before, start_column, start_line};
use crate::types::{FileAnalysis, Relationship, RelationshipKind, Symbol, SymbolKind};
use tree_sitter::Node;

pub(super) fn extract(root: Node<'_>, source: &str, out: &mut FileAnalysis) {
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        let node = unwrap_decorated(node);
        match node.kind() {
            "import_statement" => handle_import(node, source, out),
            "import_from_statement" => handle_import_from(node, source, out),
            "function_definition" => {
                if let Some(symbol) = function_symbol(node, source, SymbolKind::Function, out) {
                    out.symbols.push(symbol);
                }
            }
            "class_definition" => handle_class(node, source, out),
            "expression_statement" => {
                if let Some((name, assignment)) = assignment_target(node, source) {
                    let kind = if is_constant_name(name) {
                        SymbolKind::Constant
                    } else {
                        SymbolKind::Variable
                    };
                    out.symbols.push(
                        Symbol::new(name, kind, start_line(assignment), end_line(assignment))
                            .with_signature(first_line(node_text(assignment, source)))
                            .exported(is_exported(name)),
                    );
                }
            }
            _ => {}
        }
    }
}

fn is_exported(name: &str) -> bool {
    !name.starts_with('_')
}

fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim_end()
}

fn unwrap_decorated(node: Node<'_>) -> Node<'_> {
    if node.kind() == "decorated_definition" {
        if let Some(definition) = node.child_by_field_name("definition") {
            return definition;
        }
    }
    node
}

fn handle_import(node: Node<'_>, source: &str, out: &mut FileAnalysis) {
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        let module = match name.kind() {
            "aliased_import" => field_text(name, "name", source),
            _ => Some(node_text(name, source)),
        };
        if let Some(module) = module.filter(|m| !m.is_empty()) {
            out.relationships.push(Relationship::to_file(
                RelationshipKind::Import,
                module,
                start_line(name),
                start_column(name),
            ));
        }
    }
}

fn handle_import_from(node: Node<'_>, source: &str, out: &mut FileAnalysis) {
    if let Some(module) = node.child_by_field_name("module_name") {
        let target = node_text(module, source);
        if !target.is_empty() {
            out.relationships.push(Relationship::to_file(
                RelationshipKind::Import,
                target,
                start_line(module),
                start_column(module),
            ));
        }
    }
}

/// First statement of a block when it is a bare string literal.
fn docstring(body: Node<'_>, source: &str) -> Option<String> {
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = first.named_child(0).filter(|n| n.kind() == "string")?;
    let raw = node_text(string, source);
    let raw = raw.trim_start_matches(|c: char| "rRuUbBfF".contains(c));
    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|q| raw.strip_prefix(q).and_then(|r| r.strip_suffix(q)))
        .unwrap_or(raw);
    let doc = inner.trim();
    (!doc.is_empty()).then(|| doc.to_string())
}

fn function_symbol(node: Node<'_>, source: &str, kind: SymbolKind, out: &mut FileAnalysis) -> Option<Symbol> {
    let name = field_text(node, "name", source)?;
    let kind = if kind == SymbolKind::Method && name == "__init__" {
        SymbolKind::Constructor
    } else {
        kind
    };

    let signature = signature_before(node, "body", source);
    let mut symbol = Symbol::new(name, kind, start_line(node), end_line(node))
        .with_signature(signature.trim_end_matches(':'))
        .exported(is_exported(name));

    if let Some(body) = node.child_by_field_name("body") {
        if let Some(doc) = docstring(body, source) {
            symbol = symbol.with_doc(doc);
        }
        collect_calls(body, source, "call", name, &mut out.relationships);
    }
    Some(symbol)
}

fn handle_class(node: Node<'_>, source: &str, out: &mut FileAnalysis) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };

    let signature = signature_before(node, "body", source);
    let mut class = Symbol::new(name, SymbolKind::Class, start_line(node), end_line(node))
        .with_signature(signature.trim_end_matches(':'))
        .exported(is_exported(name));

    if let Some(bases) = node.child_by_field_name("superclasses") {
        let mut cursor = bases.walk();
        for base in bases.named_children(&mut cursor) {
            if matches!(base.kind(), "identifier" | "attribute") {
                out.relationships.push(
                    Relationship::to_symbol(
                        RelationshipKind::Extends,
                        node_text(base, source),
                        start_line(base),
                        start_column(base),
                    )
                    .from_symbol(name),
                );
            }
        }
    }

    if let Some(body) = node.child_by_field_name("body") {
        if let Some(doc) = docstring(body, source) {
            class = class.with_doc(doc);
        }
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            let member = unwrap_decorated(member);
            match member.kind() {
                "function_definition" => {
                    if let Some(method) = function_symbol(member, source, SymbolKind::Method, out) {
                        class.push_child(method);
                    }
                }
                "expression_statement" => {
                    if let Some((attr, assignment)) = assignment_target(member, source) {
                        class.push_child(
                            Symbol::new(attr, SymbolKind::Property, start_line(assignment), end_line(assignment))
                                .with_signature(first_line(node_text(assignment, source)))
                                .exported(is_exported(attr)),
                        );
                    }
                }
                _ => {}
            }
        }
    }
    out.symbols.push(class);
}

/// `name = ...` or `name: T = ...` with a plain identifier target.
fn assignment_target<'a, 't>(statement: Node<'t>, source: &'a str) -> Option<(&'a str, Node<'t>)> {
    let assignment = statement
        .named_child(0)
        .filter(|n| n.kind() == "assignment")?;
    let left = assignment
        .child_by_field_name("left")
        .filter(|n| n.kind() == "identifier")?;
    Some((node_text(left, source), assignment))
}
