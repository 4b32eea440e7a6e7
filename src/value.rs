/// Parsed KSON value tree.
///
/// One tagged variant per literal kind, each carrying the source `Location`
/// it was parsed from. Values are immutable once constructed; edits reparse
/// the document rather than mutating the tree.
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// Source span of a value or token. Lines and columns are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl Location {
    /// Whether the span contains (or exactly touches) the given position.
    pub fn contains(&self, line: u32, column: u32) -> bool {
        let after_start = (line, column) >= (self.start_line, self.start_column);
        let before_end = (line, column) <= (self.end_line, self.end_column);
        after_start && before_end
    }

    /// Whether the position falls strictly inside the span (boundaries excluded).
    pub fn contains_strictly(&self, line: u32, column: u32) -> bool {
        let after_start = (line, column) > (self.start_line, self.start_column);
        let before_end = (line, column) < (self.end_line, self.end_column);
        after_start && before_end
    }
}

// ---------------------------------------------------------------------------
// Object map
// ---------------------------------------------------------------------------

/// Ordered string-keyed map with O(1) lookup.
///
/// Entry order is insertion order; a duplicate key appends a new entry and
/// the lookup index points at the most recent one (last write wins, order
/// preserved). The last-inserted key is what the cursor translator treats as
/// "the property currently being typed."
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectMap {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl ObjectMap {
    pub fn new() -> Self {
        ObjectMap::default()
    }

    pub fn insert(&mut self, key: String, value: Value) {
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// The most recently inserted key, if any.
    pub fn last_key(&self) -> Option<&str> {
        self.entries.last().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for ObjectMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut map = ObjectMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// An opaque tagged content block: `%tag` ... `%%`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmbedBlock {
    pub tag: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Object(ObjectMap),
    List(Vec<Value>),
    /// Unescaped string content.
    String(String),
    /// The exact lexical form from the source, not a machine float.
    Number(String),
    Bool(bool),
    Null,
    Embed(EmbedBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub kind: ValueKind,
    pub location: Location,
}

impl Value {
    pub fn new(kind: ValueKind, location: Location) -> Self {
        Value { kind, location }
    }

    pub fn as_object(&self) -> Option<&ObjectMap> {
        match &self.kind {
            ValueKind::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match &self.kind {
            ValueKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    /// The lexical text of a number value.
    pub fn as_number_text(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.kind {
            ValueKind::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    /// Object member lookup; `None` for non-objects and missing keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object()?.get(key)
    }

    /// Render the value for display in hover text and completion labels.
    ///
    /// Scalars render literally (strings without quotes, numbers in their
    /// lexical form); lists render element-wise in brackets; objects and
    /// embeds collapse to placeholders.
    pub fn display_string(&self) -> String {
        match &self.kind {
            ValueKind::String(s) => s.clone(),
            ValueKind::Number(n) => n.clone(),
            ValueKind::Bool(b) => b.to_string(),
            ValueKind::Null => "null".into(),
            ValueKind::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::display_string).collect();
                format!("[{}]", parts.join(", "))
            }
            ValueKind::Object(_) => "{...}".into(),
            ValueKind::Embed(_) => "<embed>".into(),
        }
    }
}
