use super::{
    collect_calls, doc_comment_above, end_line, field_text, node_text, signature_before,
    start_column, start_line, unquote,
};
use crate::types::{FileAnalysis, Relationship, RelationshipKind, Symbol, SymbolKind};
use tree_sitter::Node;

const COMMENT: &[&str] = &["comment"];

pub(super) fn extract(root: Node<'_>, source: &str, out: &mut FileAnalysis) {
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        match node.kind() {
            "import_declaration" => handle_imports(node, source, out),
            "function_declaration" => handle_function(node, source, out, SymbolKind::Function),
            "method_declaration" => handle_function(node, source, out, SymbolKind::Method),
            "type_declaration" => handle_types(node, source, out),
            "const_declaration" => handle_values(node, source, out, "const_spec", SymbolKind::Constant),
            "var_declaration" => handle_values(node, source, out, "var_spec", SymbolKind::Variable),
            _ => {}
        }
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn handle_imports(node: Node<'_>, source: &str, out: &mut FileAnalysis) {
    if node.kind() == "import_spec" {
        if let Some(path) = node.child_by_field_name("path") {
            let target = unquote(node_text(path, source));
            if !target.is_empty() {
                out.relationships.push(Relationship::to_file(
                    RelationshipKind::Import,
                    target,
                    start_line(path),
                    start_column(path),
                ));
            }
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        handle_imports(child, source, out);
    }
}

fn receiver_type(node: Node<'_>, source: &str) -> Option<String> {
    let receiver = node.child_by_field_name("receiver")?;
    let mut cursor = receiver.walk();
    let found = receiver
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "parameter_declaration")
        .find_map(|c| field_text(c, "type", source))
        .map(|t| t.trim_start_matches('*').trim().to_string());
    found
}

fn handle_function(node: Node<'_>, source: &str, out: &mut FileAnalysis, kind: SymbolKind) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };

    let mut symbol = Symbol::new(name, kind, start_line(node), end_line(node))
        .with_signature(signature_before(node, "body", source))
        .exported(is_exported(name));
    if let Some(doc) = doc_comment_above(node, source, COMMENT, "//") {
        symbol = symbol.with_doc(doc);
    }
    out.symbols.push(symbol);

    if let Some(receiver) = receiver_type(node, source) {
        out.relationships.push(
            Relationship::to_symbol(RelationshipKind::Uses, receiver, start_line(node), start_column(node))
                .from_symbol(name),
        );
    }
    if let Some(body) = node.child_by_field_name("body") {
        collect_calls(body, source, "call_expression", name, &mut out.relationships);
    }
}

fn handle_types(node: Node<'_>, source: &str, out: &mut FileAnalysis) {
    let mut cursor = node.walk();
    for spec in node.named_children(&mut cursor) {
        if spec.kind() == "type_spec" || spec.kind() == "type_alias" {
            handle_type_spec(node, spec, source, out);
        }
    }
}

fn handle_type_spec(decl: Node<'_>, spec: Node<'_>, source: &str, out: &mut FileAnalysis) {
    let Some(name) = field_text(spec, "name", source) else {
        return;
    };
    let type_node = spec.child_by_field_name("type");
    let kind = match type_node.map(|t| t.kind()) {
        Some("struct_type") => SymbolKind::Class,
        Some("interface_type") => SymbolKind::Interface,
        _ => SymbolKind::Type,
    };

    // A lone `type X ...` spans the declaration; grouped specs span themselves.
    let span = if decl.named_child_count() == 1 { decl } else { spec };
    let mut symbol = Symbol::new(name, kind, start_line(span), end_line(span))
        .with_signature(format!("type {}", first_line(node_text(spec, source))))
        .exported(is_exported(name));
    if let Some(doc) = doc_comment_above(span, source, COMMENT, "//") {
        symbol = symbol.with_doc(doc);
    }

    if let Some(type_node) = type_node {
        match kind {
            SymbolKind::Class => struct_members(type_node, name, source, &mut symbol, out),
            SymbolKind::Interface => interface_members(type_node, name, source, &mut symbol, out),
            _ => {}
        }
    }
    out.symbols.push(symbol);
}

fn struct_members(type_node: Node<'_>, owner: &str, source: &str, symbol: &mut Symbol, out: &mut FileAnalysis) {
    let Some(fields) = type_node
        .named_child(0)
        .filter(|n| n.kind() == "field_declaration_list")
    else {
        return;
    };

    let mut cursor = fields.walk();
    for field in fields.named_children(&mut cursor) {
        if field.kind() != "field_declaration" {
            continue;
        }
        let mut names = Vec::new();
        let mut name_cursor = field.walk();
        for name in field.children_by_field_name("name", &mut name_cursor) {
            names.push(node_text(name, source));
        }

        if names.is_empty() {
            // Embedded field
            if let Some(embedded) = field_text(field, "type", source) {
                out.relationships.push(
                    Relationship::to_symbol(
                        RelationshipKind::Extends,
                        embedded.trim_start_matches('*'),
                        start_line(field),
                        start_column(field),
                    )
                    .from_symbol(owner),
                );
            }
            continue;
        }

        let signature = node_text(field, source).to_string();
        for name in names {
            symbol.push_child(
                Symbol::new(name, SymbolKind::Property, start_line(field), end_line(field))
                    .with_signature(signature.clone())
                    .exported(is_exported(name)),
            );
        }
    }
}

fn interface_members(type_node: Node<'_>, owner: &str, source: &str, symbol: &mut Symbol, out: &mut FileAnalysis) {
    let mut cursor = type_node.walk();
    for member in type_node.named_children(&mut cursor) {
        match member.kind() {
            "method_elem" | "method_spec" => {
                if let Some(name) = field_text(member, "name", source) {
                    symbol.push_child(
                        Symbol::new(name, SymbolKind::Method, start_line(member), end_line(member))
                            .with_signature(node_text(member, source))
                            .exported(is_exported(name)),
                    );
                }
            }
            "type_elem" | "qualified_type" | "type_identifier" => {
                let base = node_text(member, source);
                if !base.is_empty() {
                    out.relationships.push(
                        Relationship::to_symbol(
                            RelationshipKind::Extends,
                            base,
                            start_line(member),
                            start_column(member),
                        )
                        .from_symbol(owner),
                    );
                }
            }
            _ => {}
        }
    }
}

fn handle_values(node: Node<'_>, source: &str, out: &mut FileAnalysis, spec_kind: &str, kind: SymbolKind) {
    let mut cursor = node.walk();
    for spec in node.named_children(&mut cursor) {
        if spec.kind() != spec_kind {
            continue;
        }
        let mut name_cursor = spec.walk();
        for name_node in spec.children_by_field_name("name", &mut name_cursor) {
            let name = node_text(name_node, source);
            if name.is_empty() || name == "_" {
                continue;
            }
            out.symbols.push(
                Symbol::new(name, kind, start_line(spec), end_line(spec))
                    .with_signature(first_line(node_text(spec, source)))
                    .exported(is_exported(name)),
            );
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim_end_matches('{').trim_end()
}
