/// Translates a raw cursor position into a document path.
///
/// This has to work on possibly-invalid documents — the common case while a
/// user is typing. The strategy: anchor on the last lexical token at or
/// before the cursor (more stable than the raw position against trailing
/// whitespace), repair the document once if it failed to parse, then adjust
/// the path for the two mid-edit situations that matter: "entering a value
/// after a colon" and "cursor past the last value, starting a new entry".
use tracing::debug;

use crate::navigator::{Path, build_path, find_value_at_location};
use crate::parse::{Token, TokenKind, parse};
use crate::value::Value;

/// Compute the document path under the cursor; `None` when even the repair
/// heuristic cannot produce a tree or no node covers the position.
pub fn build_path_to_position(document_text: &str, line: u32, column: u32) -> Option<Path> {
    let result = parse(document_text);

    // Last token starting at or before the cursor, ignoring the Eof sentinel.
    let anchor: Option<Token> = result
        .tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .filter(|t| (t.location.start_line, t.location.start_column) <= (line, column))
        .next_back()
        .cloned();
    let inside_anchor = anchor
        .as_ref()
        .is_some_and(|t| (line, column) < (t.location.end_line, t.location.end_column));

    let tree = match result.tree {
        Some(tree) => tree,
        None => recover_document(document_text, line, column)?,
    };

    let (target_line, target_column) = match &anchor {
        Some(t) => (t.location.start_line, t.location.start_column),
        None => (line, column),
    };
    let node = find_value_at_location(&tree, target_line, target_column)?;
    let mut path = build_path(&tree, node).unwrap_or_default();

    if anchor.as_ref().is_some_and(|t| t.kind == TokenKind::Colon) {
        // The user is entering a value for the property being typed: the
        // most recently inserted key of the enclosing object.
        if let Some(key) = node.as_object().and_then(|map| map.last_key()) {
            path.push(key.to_string());
        }
    } else if anchor.is_some() && !inside_anchor {
        // Past the anchored token, on trailing blank space: target the
        // parent container (new property / next list element position).
        path.pop();
    }

    Some(path)
}

/// One-shot repair for unparseable documents: splice an empty string
/// literal at the cursor (clipped to the line length) and reparse.
fn recover_document(text: &str, line: u32, column: u32) -> Option<Value> {
    let mut lines: Vec<String> = text.split('\n').map(String::from).collect();
    let index = (line as usize).min(lines.len().saturating_sub(1));
    let target = &lines[index];

    let clipped = (column as usize).min(target.chars().count());
    let byte = target
        .char_indices()
        .nth(clipped)
        .map_or(target.len(), |(i, _)| i);
    let patched = format!("{}\"\"{}", &target[..byte], &target[byte..]);
    lines[index] = patched;

    let repaired = lines.join("\n");
    debug!(line, column, "reparsing with spliced placeholder");
    parse(&repaired).tree
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_at(text: &str, line: u32, column: u32) -> Option<Vec<String>> {
        build_path_to_position(text, line, column)
    }

    #[test]
    fn cursor_inside_a_value() {
        let text = "name: kson\ncount: 42\n";
        assert_eq!(path_at(text, 0, 7), Some(vec!["name".to_string()]));
        assert_eq!(path_at(text, 1, 8), Some(vec!["count".to_string()]));
    }

    #[test]
    fn cursor_inside_nested_value() {
        let text = "server: {host: localhost}\n";
        assert_eq!(
            path_at(text, 0, 17),
            Some(vec!["server".to_string(), "host".to_string()])
        );
    }

    #[test]
    fn cursor_inside_list_element() {
        let text = "tags: [alpha, beta]\n";
        assert_eq!(
            path_at(text, 0, 15),
            Some(vec!["tags".to_string(), "1".to_string()])
        );
    }

    #[test]
    fn cursor_after_colon_targets_the_property() {
        // Invalid document: `status:` has no value yet. The repair heuristic
        // splices in a placeholder and the colon rule appends the key.
        assert_eq!(path_at("status:", 0, 7), Some(vec!["status".to_string()]));
    }

    #[test]
    fn cursor_after_colon_mid_document() {
        let text = "name: x\nstatus:\n";
        assert_eq!(path_at(text, 1, 7), Some(vec!["status".to_string()]));
    }

    #[test]
    fn cursor_past_value_targets_parent() {
        // Cursor on blank space after `1`: the anchored token is `1` and the
        // cursor is past it, so the last path token is dropped.
        let text = "{a: 1   }";
        assert_eq!(path_at(text, 0, 7), Some(vec![]));
    }

    #[test]
    fn unrecoverable_document_is_none() {
        assert!(path_at("{{{", 0, 3).is_none());
    }

    #[test]
    fn empty_document_recovers_to_root() {
        // The splice turns the empty document into a bare `""` literal.
        assert_eq!(path_at("", 0, 0), Some(vec![]));
    }

    #[test]
    fn column_is_clipped_to_line_length() {
        assert_eq!(path_at("status:", 0, 900), Some(vec!["status".to_string()]));
    }
}
