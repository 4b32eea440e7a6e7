/// Schema navigation: `$ref`/`$id` reference resolution and mapping a
/// document path onto the governing sub-schema.
///
/// A schema here is an ordinary parsed `Value` tree interpreted under
/// JSON-Schema conventions (`properties`, `items`, `patternProperties`,
/// `$ref`, `$id`, ...). Resolution threads an explicit running base URI:
/// every hop through an object carrying `$id` advances the base by standard
/// relative-URI resolution, and `$ref` targets are located by their absolute
/// `$id` (plus an optional JSON-Pointer fragment).
///
/// Everything here is fail-soft: a broken `$ref` degrades to "no reference"
/// and an unparseable `patternProperties` pattern is skipped, so one bad
/// schema entry never stops the rest of navigation from working.
use percent_encoding::percent_decode_str;
use regex::Regex;
use tracing::{debug, warn};

use crate::value::{Value, ValueKind};

/// A schema node paired with the base URI in effect on arrival at that node
/// (the node's own `$id`, if any, has not yet been applied — the next
/// navigation hop applies it).
#[derive(Debug, Clone)]
pub struct ResolvedSchemaRef<'a> {
    pub node: &'a Value,
    pub base_uri: String,
}

// ---------------------------------------------------------------------------
// Document-path navigation
// ---------------------------------------------------------------------------

/// Map a document path onto the schema node governing that location.
///
/// The empty path resolves to the schema root paired with `base_uri`.
/// Per token, in this fixed order:
/// - the current node must be an object, else the result is `None`;
/// - an index token (non-negative integer) navigates to `items`, else
///   `additionalItems` — the index value itself is discarded, all elements
///   share one item schema;
/// - a property token is looked up under `properties`, then against each
///   `patternProperties` entry in insertion order (unanchored regex search;
///   invalid patterns are skipped), then falls back to
///   `additionalProperties`;
/// - a `$ref` on the landed node is resolved immediately and navigation
///   continues from its target; an unresolvable `$ref` is ignored.
pub fn navigate_schema_by_document_path<'a>(
    schema_root: &'a Value,
    document_path: &[String],
    base_uri: &str,
) -> Option<ResolvedSchemaRef<'a>> {
    let resolver = SchemaResolver::new(schema_root, base_uri);
    let mut node = schema_root;
    let mut base = base_uri.to_string();

    for token in document_path {
        let map = node.as_object()?;
        base = advance_base(node, &base);

        let next = if is_index_token(token) {
            map.get("items").or_else(|| map.get("additionalItems"))?
        } else {
            match map.get("properties").and_then(|p| p.get(token)) {
                Some(prop) => prop,
                None => pattern_property_match(node, token)
                    .or_else(|| map.get("additionalProperties"))?,
            }
        };

        if let Some(reference) = next.get("$ref").and_then(Value::as_str) {
            if let Some(resolved) = resolver.resolve(reference, &base) {
                node = resolved.node;
                base = resolved.base_uri;
                continue;
            }
            debug!(reference, "unresolvable $ref, continuing from raw node");
        }
        node = next;
    }

    Some(ResolvedSchemaRef {
        node,
        base_uri: base,
    })
}

fn is_index_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// First `patternProperties` entry, in insertion order, whose pattern
/// matches the token anywhere (substring-containing, not full-match).
fn pattern_property_match<'a>(node: &'a Value, token: &str) -> Option<&'a Value> {
    let patterns = node.get("patternProperties")?.as_object()?;
    for (pattern, sub) in patterns.entries() {
        match Regex::new(pattern) {
            Ok(re) if re.is_match(token) => return Some(sub),
            Ok(_) => {}
            Err(_) => warn!(pattern = pattern.as_str(), "skipping invalid patternProperties pattern"),
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Reference resolution
// ---------------------------------------------------------------------------

/// Resolves `$ref` strings against a schema tree, with `$id`-aware base-URI
/// tracking.
pub struct SchemaResolver<'a> {
    root: &'a Value,
    root_base: String,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(root: &'a Value, root_base: &str) -> Self {
        SchemaResolver {
            root,
            root_base: root_base.to_string(),
        }
    }

    /// Resolve `reference` against the base URI in effect at the `$ref`
    /// site. `None` when any step fails; callers treat that as "no
    /// reference" rather than an error.
    pub fn resolve(&self, reference: &str, base_uri: &str) -> Option<ResolvedSchemaRef<'a>> {
        let target = resolve_uri(base_uri, reference);
        let (doc, fragment) = split_fragment(&target);

        let root_id = advance_base(self.root, &self.root_base);
        let (anchor, anchor_base) = if doc.is_empty() || strip_fragment(&root_id) == doc {
            (self.root, self.root_base.clone())
        } else {
            find_by_id(self.root, &self.root_base, doc)?
        };

        match fragment {
            Some(pointer) if !pointer.is_empty() => walk_pointer(anchor, &anchor_base, pointer),
            _ => Some(ResolvedSchemaRef {
                node: anchor,
                base_uri: anchor_base,
            }),
        }
    }
}

/// Apply a node's `$id`, if any, to the running base URI.
fn advance_base(node: &Value, base: &str) -> String {
    match node.get("$id").and_then(Value::as_str) {
        Some(id) => resolve_uri(base, id),
        None => base.to_string(),
    }
}

/// Depth-first search for an object whose absolute `$id` equals `doc`.
/// Returns the node and the base URI arriving at it.
fn find_by_id<'a>(node: &'a Value, base: &str, doc: &str) -> Option<(&'a Value, String)> {
    match &node.kind {
        ValueKind::Object(map) => {
            if map.get("$id").is_some() && strip_fragment(&advance_base(node, base)) == doc {
                return Some((node, base.to_string()));
            }
            let inner_base = advance_base(node, base);
            for (_key, child) in map.entries() {
                if let Some(hit) = find_by_id(child, &inner_base, doc) {
                    return Some(hit);
                }
            }
            None
        }
        ValueKind::List(items) => items.iter().find_map(|child| find_by_id(child, base, doc)),
        _ => None,
    }
}

/// Walk a JSON-Pointer fragment (`/a/b/0`) from `node`, advancing the base
/// URI through every object hop.
fn walk_pointer<'a>(node: &'a Value, base: &str, pointer: &str) -> Option<ResolvedSchemaRef<'a>> {
    let mut current = node;
    let mut current_base = base.to_string();
    for raw_token in pointer.split('/').skip(1) {
        let token = unescape_pointer_token(raw_token)?;
        current_base = advance_base(current, &current_base);
        current = match &current.kind {
            ValueKind::Object(map) => map.get(&token)?,
            ValueKind::List(items) => {
                if !is_index_token(&token) {
                    return None;
                }
                items.get(token.parse::<usize>().ok()?)?
            }
            _ => return None,
        };
    }
    Some(ResolvedSchemaRef {
        node: current,
        base_uri: current_base,
    })
}

/// Percent-decode, then apply the JSON-Pointer escapes `~1` and `~0`.
fn unescape_pointer_token(token: &str) -> Option<String> {
    let decoded = percent_decode_str(token).decode_utf8().ok()?;
    Some(decoded.replace("~1", "/").replace("~0", "~"))
}

// ---------------------------------------------------------------------------
// URI arithmetic
// ---------------------------------------------------------------------------

pub(crate) fn strip_fragment(uri: &str) -> &str {
    match uri.find('#') {
        Some(i) => &uri[..i],
        None => uri,
    }
}

fn split_fragment(uri: &str) -> (&str, Option<&str>) {
    match uri.find('#') {
        Some(i) => (&uri[..i], Some(&uri[i + 1..])),
        None => (uri, None),
    }
}

fn has_scheme(uri: &str) -> bool {
    let Some(colon) = uri.find(':') else {
        return false;
    };
    let scheme = &uri[..colon];
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
}

/// Resolve `reference` against `base`: fragment-only, scheme-relative,
/// absolute-path, and relative-path forms are all supported.
pub fn resolve_uri(base: &str, reference: &str) -> String {
    if reference.is_empty() {
        return base.to_string();
    }
    if let Some(fragment) = reference.strip_prefix('#') {
        return format!("{}#{fragment}", strip_fragment(base));
    }
    if has_scheme(reference) {
        return reference.to_string();
    }

    let base = strip_fragment(base);
    if let Some(rest) = reference.strip_prefix("//") {
        return match base.find(':') {
            Some(i) => format!("{}://{rest}", &base[..i]),
            None => reference.to_string(),
        };
    }

    let (prefix, path) = split_base(base);
    if reference.starts_with('/') {
        return format!("{prefix}{reference}");
    }
    let dir = match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    };
    format!("{prefix}{dir}{reference}")
}

/// Split a base URI into its scheme-and-authority prefix and its path.
fn split_base(base: &str) -> (&str, &str) {
    if let Some(scheme_end) = base.find("://") {
        let after = scheme_end + 3;
        match base[after..].find('/') {
            Some(i) => base.split_at(after + i),
            None => (base, ""),
        }
    } else if let Some(colon) = base.find(':').filter(|_| has_scheme(base)) {
        base.split_at(colon + 1)
    } else {
        ("", base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn schema(text: &str) -> Value {
        parse(text).tree.expect("schema fixture should parse")
    }

    fn path(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn empty_path_resolves_to_root_with_base() {
        let s = schema(r#"{"type": "object"}"#);
        let r = navigate_schema_by_document_path(&s, &[], "https://x/base.json").unwrap();
        assert!(std::ptr::eq(r.node, &s));
        assert_eq!(r.base_uri, "https://x/base.json");
    }

    #[test]
    fn navigates_nested_properties() {
        let s = schema(
            r#"{
                "properties": {
                    "server": {
                        "properties": {
                            "host": {"type": "string", "description": "Host name"}
                        }
                    }
                }
            }"#,
        );
        let r = navigate_schema_by_document_path(&s, &path(&["server", "host"]), "").unwrap();
        assert_eq!(
            r.node.get("description").and_then(Value::as_str),
            Some("Host name")
        );
    }

    #[test]
    fn index_tokens_share_one_items_schema() {
        let s = schema(
            r#"{"properties": {"tags": {"items": {"type": "string"}}}}"#,
        );
        let a = navigate_schema_by_document_path(&s, &path(&["tags", "0"]), "").unwrap();
        let b = navigate_schema_by_document_path(&s, &path(&["tags", "5"]), "").unwrap();
        let c = navigate_schema_by_document_path(&s, &path(&["tags", "99"]), "").unwrap();
        assert!(std::ptr::eq(a.node, b.node));
        assert!(std::ptr::eq(b.node, c.node));
        assert_eq!(a.node.get("type").and_then(Value::as_str), Some("string"));
    }

    #[test]
    fn index_token_falls_back_to_additional_items() {
        let s = schema(r#"{"additionalItems": {"type": "number"}}"#);
        let r = navigate_schema_by_document_path(&s, &path(&["3"]), "").unwrap();
        assert_eq!(r.node.get("type").and_then(Value::as_str), Some("number"));
    }

    #[test]
    fn properties_outrank_pattern_properties() {
        let s = schema(
            r#"{
                "properties": {"name": {"const": "direct"}},
                "patternProperties": {"name": {"const": "pattern"}}
            }"#,
        );
        let r = navigate_schema_by_document_path(&s, &path(&["name"]), "").unwrap();
        assert_eq!(r.node.get("const").and_then(Value::as_str), Some("direct"));
    }

    #[test]
    fn pattern_properties_match_as_substring_in_insertion_order() {
        let s = schema(
            r#"{
                "patternProperties": {
                    "foo": {"const": "first"},
                    "o": {"const": "second"}
                }
            }"#,
        );
        // Both patterns occur in "xxfooyy"; the first-inserted entry wins.
        let r = navigate_schema_by_document_path(&s, &path(&["xxfooyy"]), "").unwrap();
        assert_eq!(r.node.get("const").and_then(Value::as_str), Some("first"));
    }

    #[test]
    fn invalid_pattern_is_skipped_not_fatal() {
        let s = schema(
            r#"{
                "patternProperties": {
                    "[unclosed": {"const": "bad"},
                    "ok": {"const": "good"}
                }
            }"#,
        );
        let r = navigate_schema_by_document_path(&s, &path(&["look-ok"]), "").unwrap();
        assert_eq!(r.node.get("const").and_then(Value::as_str), Some("good"));
    }

    #[test]
    fn falls_back_to_additional_properties() {
        let s = schema(r#"{"additionalProperties": {"type": "boolean"}}"#);
        let r = navigate_schema_by_document_path(&s, &path(&["anything"]), "").unwrap();
        assert_eq!(r.node.get("type").and_then(Value::as_str), Some("boolean"));
    }

    #[test]
    fn missing_token_is_not_found_not_partial() {
        let s = schema(r#"{"properties": {"a": {"type": "string"}}}"#);
        assert!(navigate_schema_by_document_path(&s, &path(&["b"]), "").is_none());
        assert!(navigate_schema_by_document_path(&s, &path(&["a", "b"]), "").is_none());
    }

    #[test]
    fn ref_resolves_to_defs_target() {
        let s = schema(
            r##"{
                "properties": {"item": {"$ref": "#/$defs/Item"}},
                "$defs": {"Item": {"description": "One item"}}
            }"##,
        );
        let r = navigate_schema_by_document_path(&s, &path(&["item"]), "").unwrap();
        assert_eq!(
            r.node.get("description").and_then(Value::as_str),
            Some("One item")
        );
        assert!(r.node.get("$ref").is_none());
    }

    #[test]
    fn broken_ref_degrades_to_raw_node() {
        let s = schema(
            r##"{
                "properties": {
                    "a": {
                        "$ref": "#/$defs/Missing",
                        "properties": {"b": {"type": "string"}}
                    }
                }
            }"##,
        );
        let r = navigate_schema_by_document_path(&s, &path(&["a", "b"]), "").unwrap();
        assert_eq!(r.node.get("type").and_then(Value::as_str), Some("string"));
    }

    #[test]
    fn ref_by_absolute_id() {
        let s = schema(
            r#"{
                "$id": "https://example.com/root.json",
                "properties": {"a": {"$ref": "item.json"}},
                "$defs": {"item": {"$id": "item.json", "type": "number"}}
            }"#,
        );
        let r = navigate_schema_by_document_path(&s, &path(&["a"]), "").unwrap();
        assert_eq!(r.node.get("type").and_then(Value::as_str), Some("number"));
    }

    #[test]
    fn ref_with_pointer_into_id_anchor() {
        let s = schema(
            r#"{
                "$id": "https://example.com/root.json",
                "properties": {"a": {"$ref": "item.json#/properties/name"}},
                "$defs": {
                    "item": {
                        "$id": "item.json",
                        "properties": {"name": {"type": "string"}}
                    }
                }
            }"#,
        );
        let r = navigate_schema_by_document_path(&s, &path(&["a"]), "").unwrap();
        assert_eq!(r.node.get("type").and_then(Value::as_str), Some("string"));
    }

    #[test]
    fn pointer_tokens_are_unescaped() {
        let s = schema(
            r##"{
                "properties": {"x": {"$ref": "#/$defs/a%20b"}},
                "$defs": {"a b": {"type": "null"}}
            }"##,
        );
        let r = navigate_schema_by_document_path(&s, &path(&["x"]), "").unwrap();
        assert_eq!(r.node.get("type").and_then(Value::as_str), Some("null"));
    }

    #[test]
    fn navigating_through_primitive_schema_is_not_found() {
        let s = schema(r#"{"properties": {"a": {"items": true}}}"#);
        // `items: true` is not an object schema, so the next hop fails.
        assert!(navigate_schema_by_document_path(&s, &path(&["a", "0", "b"]), "").is_none());
    }

    #[test]
    fn uri_resolution_forms() {
        assert_eq!(
            resolve_uri("https://e.com/a/b.json", "#/x"),
            "https://e.com/a/b.json#/x"
        );
        assert_eq!(
            resolve_uri("https://e.com/a/b.json", "c.json"),
            "https://e.com/a/c.json"
        );
        assert_eq!(
            resolve_uri("https://e.com/a/b.json", "/c.json"),
            "https://e.com/c.json"
        );
        assert_eq!(
            resolve_uri("https://e.com/a/b.json", "//other.org/d.json"),
            "https://other.org/d.json"
        );
        assert_eq!(
            resolve_uri("https://e.com/a/b.json", "http://x.org/y.json"),
            "http://x.org/y.json"
        );
        assert_eq!(resolve_uri("", "item.json"), "item.json");
        assert_eq!(
            resolve_uri("https://e.com/a/b.json#frag", "c.json"),
            "https://e.com/a/c.json"
        );
    }
}
