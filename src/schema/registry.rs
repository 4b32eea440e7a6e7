/// Registry of schema associations contributed by external sources.
///
/// Each contributor registers under an id; re-registering the same id
/// replaces that contributor's schemas wholesale. File lookup runs two
/// passes over all registrations in order: file-extension suffix matches
/// first, then custom `fileMatch` glob patterns. An extension match from a
/// later registration still beats a glob match from an earlier one.
use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

type ChangeListener = Box<dyn Fn(&str) + Send + Sync>;

/// One schema association as contributed by a registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSchema {
    /// Identifier of the schema itself.
    pub uri: String,
    /// Inline schema text; when absent the schema is fetched by `uri`.
    #[serde(default)]
    pub schema: Option<String>,
    /// Extensions, bare or dotted. `myext` and `.myext` both match
    /// `*.myext` and `*.myext.kson`.
    #[serde(default)]
    pub file_extensions: Vec<String>,
    /// Glob patterns matched against the normalized file path.
    #[serde(default)]
    pub file_match: Vec<String>,
}

#[derive(Default)]
struct RegistryState {
    registrations: Vec<(String, Vec<ExtensionSchema>)>,
    on_change: Option<ChangeListener>,
}

#[derive(Default)]
pub struct SchemaRegistry {
    state: Mutex<RegistryState>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or wholesale replace) the schemas for `id`. Registration
    /// order is preserved; a replacement keeps its original slot.
    pub fn register(&self, id: &str, schemas: Vec<ExtensionSchema>) {
        let mut state = self.state.lock();
        match state.registrations.iter().position(|(k, _)| k == id) {
            Some(slot) => state.registrations[slot].1 = schemas,
            None => state.registrations.push((id.to_string(), schemas)),
        }
        debug!(id, "schema registration updated");
        if let Some(listener) = &state.on_change {
            listener(id);
        }
    }

    /// Remove the registration for `id`. The change listener fires only
    /// when something was actually removed.
    pub fn unregister(&self, id: &str) {
        let mut state = self.state.lock();
        let before = state.registrations.len();
        state.registrations.retain(|(k, _)| k != id);
        if state.registrations.len() == before {
            return;
        }
        debug!(id, "schema registration removed");
        if let Some(listener) = &state.on_change {
            listener(id);
        }
    }

    /// Replace the single change listener slot. Does not fire.
    pub fn set_on_change_listener(&self, listener: ChangeListener) {
        self.state.lock().on_change = Some(listener);
    }

    /// All registered schemas in registration order.
    pub fn get_all_schemas(&self) -> Vec<ExtensionSchema> {
        self.state
            .lock()
            .registrations
            .iter()
            .flat_map(|(_, schemas)| schemas.iter().cloned())
            .collect()
    }

    /// Drop every registration without firing the listener.
    pub fn clear(&self) {
        self.state.lock().registrations.clear();
    }

    /// The schema associated with `file_uri`, if any.
    pub fn get_schema_for_file(&self, file_uri: &str) -> Option<ExtensionSchema> {
        let path = normalize_uri_to_path(file_uri);
        let state = self.state.lock();

        for (_, schemas) in &state.registrations {
            for schema in schemas {
                if schema
                    .file_extensions
                    .iter()
                    .any(|ext| extension_matches(&path, ext))
                {
                    return Some(schema.clone());
                }
            }
        }
        for (_, schemas) in &state.registrations {
            for schema in schemas {
                if schema
                    .file_match
                    .iter()
                    .any(|pattern| glob_matches(pattern, &path))
                {
                    return Some(schema.clone());
                }
            }
        }
        None
    }
}

/// Reduce a document URI to a plain forward-slash path: strip the `file://`
/// scheme, percent-decode, normalize backslashes, and drop the leading slash
/// of Windows drive paths (`/C:/...`).
fn normalize_uri_to_path(uri: &str) -> String {
    let stripped = uri.strip_prefix("file://").unwrap_or(uri);
    let mut path = percent_decode_str(stripped).decode_utf8_lossy().into_owned();
    path = path.replace('\\', "/");
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        path.remove(0);
    }
    path
}

fn extension_matches(path: &str, ext: &str) -> bool {
    // Extensions may be declared bare (`myext`) or dotted (`.myext`).
    let ext = ext.strip_prefix('.').unwrap_or(ext);
    path.ends_with(&format!(".{ext}")) || path.ends_with(&format!(".{ext}.kson"))
}

fn glob_matches(pattern: &str, path: &str) -> bool {
    match glob_to_regex(pattern) {
        Some(re) => re.is_match(path),
        None => {
            warn!(pattern, "invalid file match pattern ignored");
            false
        }
    }
}

/// Translate a glob into an anchored regex. A pattern without a leading `/`
/// may match at any directory depth; `**` spans directories, `*` and `?`
/// stop at separators.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut out = if pattern.starts_with('/') {
        String::from("^")
    } else {
        String::from("^(?:.*/)?")
    };
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        out.push_str("(?:.*/)?");
                    } else {
                        out.push_str(".*");
                    }
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).ok()
}
