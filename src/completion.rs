/// Schema-driven completion.
///
/// Resolves the sub-schema at the cursor and produces property-name or
/// value-literal suggestions from it: enum members first, then `true`/
/// `false`/`null` literals for boolean and null types (a union type
/// accumulates both), then declared property names. An unconstrained scalar
/// schema yields an empty list; `None` is reserved for an unusable schema
/// or an unresolvable position.
use crate::navigator::Path;
use crate::parse::parse;
use crate::position::build_path_to_position;
use crate::schema::info::extract_schema_info;
use crate::schema::resolver::navigate_schema_by_document_path;
use crate::value::{Value, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Property,
    Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionItem {
    pub label: String,
    pub detail: Option<String>,
    pub documentation: Option<String>,
    pub kind: CompletionKind,
}

/// Produce completion items for the document position under `schema_text`.
pub fn get_completions_at_location(
    document_text: &str,
    schema_text: &str,
    line: u32,
    column: u32,
) -> Option<Vec<CompletionItem>> {
    let schema_tree = parse(schema_text).tree?;

    // With the cursor after the last non-blank content, append a synthetic
    // empty string so the trailing value position resolves to a real node.
    let document: String = if cursor_at_document_end(document_text, line, column) {
        let mut patched = document_text.to_string();
        patched.push_str("\"\"");
        patched
    } else {
        document_text.to_string()
    };

    let path: Path = build_path_to_position(&document, line, column)?;
    let resolved = navigate_schema_by_document_path(&schema_tree, &path, "")?;
    Some(items_for_schema(resolved.node))
}

fn items_for_schema(schema: &Value) -> Vec<CompletionItem> {
    let Some(map) = schema.as_object() else {
        return Vec::new();
    };
    let mut items = Vec::new();

    if let Some(values) = map.get("enum").and_then(Value::as_list) {
        let documentation = extract_schema_info(schema);
        for value in values {
            items.push(CompletionItem {
                label: value.display_string(),
                detail: None,
                documentation: documentation.clone(),
                kind: CompletionKind::Value,
            });
        }
        return items;
    }

    let types = type_names(schema);
    if types.iter().any(|t| t == "boolean") {
        items.push(value_item("true"));
        items.push(value_item("false"));
    }
    if types.iter().any(|t| t == "null") {
        items.push(value_item("null"));
    }
    if !items.is_empty() {
        return items;
    }

    // Presence of `properties` implies an object schema even without an
    // explicit `type: object`.
    if let Some(properties) = map.get("properties").and_then(Value::as_object) {
        for (name, prop_schema) in properties.entries() {
            let detail = type_names(prop_schema).join(" | ");
            items.push(CompletionItem {
                label: name.clone(),
                detail: (!detail.is_empty()).then_some(detail),
                documentation: extract_schema_info(prop_schema),
                kind: CompletionKind::Property,
            });
        }
    }

    items
}

fn type_names(schema: &Value) -> Vec<String> {
    match schema.get("type").map(|v| &v.kind) {
        Some(ValueKind::String(name)) => vec![name.clone()],
        Some(ValueKind::List(entries)) => entries
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}

fn value_item(label: &str) -> CompletionItem {
    CompletionItem {
        label: label.to_string(),
        detail: None,
        documentation: None,
        kind: CompletionKind::Value,
    }
}

/// True when nothing but blank space follows the cursor: the rest of the
/// current line and every subsequent line.
fn cursor_at_document_end(text: &str, line: u32, column: u32) -> bool {
    for (i, source_line) in text.split('\n').enumerate() {
        let i = i as u32;
        if i < line {
            continue;
        }
        let rest: String = if i == line {
            source_line.chars().skip(column as usize).collect()
        } else {
            source_line.to_string()
        };
        if !rest.trim().is_empty() {
            return false;
        }
    }
    true
}
