use super::{
    collect_calls, doc_comment_above, end_line, field_text, node_text, signature_before,
    start_column, start_line,
};
use crate::types::{FileAnalysis, Relationship, RelationshipKind, Symbol, SymbolKind};
use tree_sitter::Node;

const COMMENT: &[&str] = &["line_comment"];

/// Methods from `impl` blocks, attached to their type after the walk.
struct ImplMethod {
    owner: String,
    method: Symbol,
}

pub(super) fn extract(root: Node<'_>, source: &str, out: &mut FileAnalysis) {
    let mut methods = Vec::new();
    walk_items(root, source, out, &mut methods);

    for ImplMethod { owner, method } in methods {
        match out
            .symbols
            .iter_mut()
            .find(|s| s.kind.is_container() && s.name == owner)
        {
            Some(container) => container.push_child(method),
            None => out.symbols.push(method),
        }
    }
    out.symbols.sort_by_key(|s| s.line_start);
}

fn walk_items(list: Node<'_>, source: &str, out: &mut FileAnalysis, methods: &mut Vec<ImplMethod>) {
    let mut cursor = list.walk();
    for node in list.named_children(&mut cursor) {
        match node.kind() {
            "use_declaration" => {
                if let Some(argument) = node.child_by_field_name("argument") {
                    out.relationships.push(Relationship::to_file(
                        RelationshipKind::Import,
                        node_text(argument, source),
                        start_line(argument),
                        start_column(argument),
                    ));
                }
            }
            "function_item" => {
                if let Some(symbol) = function_symbol(node, source, SymbolKind::Function, out) {
                    out.symbols.push(symbol);
                }
            }
            "struct_item" => handle_struct(node, source, out),
            "enum_item" => handle_enum(node, source, out),
            "trait_item" => handle_trait(node, source, out),
            "impl_item" => handle_impl(node, source, out, methods),
            "const_item" => push_simple(node, source, out, SymbolKind::Constant),
            "static_item" => push_simple(node, source, out, SymbolKind::Variable),
            "type_item" => push_simple(node, source, out, SymbolKind::Type),
            "mod_item" => {
                if let Some(body) = node.child_by_field_name("body") {
                    walk_items(body, source, out, methods);
                }
            }
            _ => {}
        }
    }
}

fn is_pub(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| c.kind() == "visibility_modifier");
    found
}

fn declared(node: Node<'_>, source: &str, name: &str, kind: SymbolKind) -> Symbol {
    let mut symbol = Symbol::new(name, kind, start_line(node), end_line(node)).exported(is_pub(node));
    if let Some(doc) = doc_comment_above(node, source, COMMENT, "///") {
        symbol = symbol.with_doc(doc);
    }
    symbol
}

fn function_symbol(node: Node<'_>, source: &str, kind: SymbolKind, out: &mut FileAnalysis) -> Option<Symbol> {
    let name = field_text(node, "name", source)?;
    let symbol = declared(node, source, name, kind).with_signature(signature_before(node, "body", source));
    if let Some(body) = node.child_by_field_name("body") {
        collect_calls(body, source, "call_expression", name, &mut out.relationships);
    }
    Some(symbol)
}

fn header(node: Node<'_>, source: &str) -> String {
    signature_before(node, "body", source)
        .trim_end_matches(';')
        .trim_end()
        .to_string()
}

fn handle_struct(node: Node<'_>, source: &str, out: &mut FileAnalysis) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };
    let mut symbol = declared(node, source, name, SymbolKind::Class).with_signature(header(node, source));

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for field in body.named_children(&mut cursor) {
            if field.kind() != "field_declaration" {
                continue;
            }
            if let Some(field_name) = field_text(field, "name", source) {
                symbol.push_child(
                    Symbol::new(field_name, SymbolKind::Property, start_line(field), end_line(field))
                        .with_signature(node_text(field, source))
                        .exported(is_pub(field)),
                );
            }
        }
    }
    out.symbols.push(symbol);
}

fn handle_enum(node: Node<'_>, source: &str, out: &mut FileAnalysis) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };
    let exported = is_pub(node);
    let mut symbol = declared(node, source, name, SymbolKind::Enum).with_signature(header(node, source));

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for variant in body.named_children(&mut cursor) {
            if variant.kind() != "enum_variant" {
                continue;
            }
            if let Some(variant_name) = field_text(variant, "name", source) {
                symbol.push_child(
                    Symbol::new(variant_name, SymbolKind::Property, start_line(variant), end_line(variant))
                        .with_signature(node_text(variant, source))
                        .exported(exported),
                );
            }
        }
    }
    out.symbols.push(symbol);
}

fn handle_trait(node: Node<'_>, source: &str, out: &mut FileAnalysis) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };
    let exported = is_pub(node);
    let mut symbol = declared(node, source, name, SymbolKind::Interface).with_signature(header(node, source));

    if let Some(bounds) = node.child_by_field_name("bounds") {
        let mut cursor = bounds.walk();
        for bound in bounds.named_children(&mut cursor) {
            out.relationships.push(
                Relationship::to_symbol(
                    RelationshipKind::Extends,
                    node_text(bound, source),
                    start_line(bound),
                    start_column(bound),
                )
                .from_symbol(name),
            );
        }
    }

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for item in body.named_children(&mut cursor) {
            if !matches!(item.kind(), "function_signature_item" | "function_item") {
                continue;
            }
            if let Some(mut method) = function_symbol(item, source, SymbolKind::Method, out) {
                method.exported = exported;
                if item.kind() == "function_signature_item" {
                    method.signature = header(item, source);
                }
                symbol.push_child(method);
            }
        }
    }
    out.symbols.push(symbol);
}

/// `Foo<T>` and `crate::Foo` both name `Foo`.
fn base_type_name(text: &str) -> &str {
    let text = text.split('<').next().unwrap_or(text);
    text.rsplit("::").next().unwrap_or(text).trim()
}

fn handle_impl(node: Node<'_>, source: &str, out: &mut FileAnalysis, methods: &mut Vec<ImplMethod>) {
    let Some(type_text) = field_text(node, "type", source) else {
        return;
    };
    let owner = base_type_name(type_text).to_string();

    if let Some(trait_node) = node.child_by_field_name("trait") {
        out.relationships.push(
            Relationship::to_symbol(
                RelationshipKind::Implements,
                node_text(trait_node, source),
                start_line(trait_node),
                start_column(trait_node),
            )
            .from_symbol(owner.as_str()),
        );
    }

    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for item in body.named_children(&mut cursor) {
        if item.kind() != "function_item" {
            continue;
        }
        if let Some(method) = function_symbol(item, source, SymbolKind::Method, out) {
            methods.push(ImplMethod {
                owner: owner.clone(),
                method,
            });
        }
    }
}

fn push_simple(node: Node<'_>, source: &str, out: &mut FileAnalysis, kind: SymbolKind) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };
    let signature = node_text(node, source)
        .lines()
        .next()
        .unwrap_or("")
        .trim_end_matches(';')
        .to_string();
    out.symbols
        .push(declared(node, source, name, kind).with_signature(signature));
}
