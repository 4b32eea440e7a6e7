/// Formats a resolved schema node's descriptive fields into hover text.
use crate::value::{Value, ValueKind};

/// Build Markdown-ish display text from a schema node's descriptive fields,
/// in a fixed order. `None` unless the node is an object with at least one
/// presentable field — callers must be able to tell "no info" apart from
/// "empty info".
pub fn extract_schema_info(node: &Value) -> Option<String> {
    let map = node.as_object()?;
    let mut sections: Vec<String> = Vec::new();

    if let Some(title) = map.get("title").and_then(Value::as_str) {
        sections.push(format!("**{title}**"));
    }
    if let Some(description) = map.get("description").and_then(Value::as_str) {
        sections.push(description.to_string());
    }

    // `type` may be a single name or a list of names; anything else is not
    // an authoring error, it just renders nothing.
    match map.get("type").map(|v| &v.kind) {
        Some(ValueKind::String(name)) => sections.push(format!("*Type:* `{name}`")),
        Some(ValueKind::List(items)) => {
            let names: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if !names.is_empty() {
                sections.push(format!("*Type:* `{}`", names.join(" | ")));
            }
        }
        _ => {}
    }

    if let Some(default) = map.get("default") {
        sections.push(format!("*Default:* `{}`", default.display_string()));
    }
    if let Some(values) = map.get("enum").and_then(Value::as_list) {
        let rendered: Vec<String> = values
            .iter()
            .map(|v| format!("`{}`", v.display_string()))
            .collect();
        sections.push(format!("*Allowed values:* {}", rendered.join(", ")));
    }
    if let Some(pattern) = map.get("pattern").and_then(Value::as_str) {
        sections.push(format!("*Pattern:* `{pattern}`"));
    }

    push_constraint(&mut sections, map.get("minimum"), "Minimum");
    push_constraint(&mut sections, map.get("maximum"), "Maximum");
    push_constraint(&mut sections, map.get("minLength"), "Min length");
    push_constraint(&mut sections, map.get("maxLength"), "Max length");
    push_constraint(&mut sections, map.get("minItems"), "Min items");
    push_constraint(&mut sections, map.get("maxItems"), "Max items");

    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

fn push_constraint(sections: &mut Vec<String>, value: Option<&Value>, label: &str) {
    if let Some(v) = value {
        sections.push(format!("*{label}:* `{}`", v.display_string()));
    }
}
