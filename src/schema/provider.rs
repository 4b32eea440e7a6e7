/// Schema sourcing: the provider seam, registry-backed lookup, and a parse
/// cache keyed by schema text.
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::parse::parse;
use crate::schema::registry::SchemaRegistry;
use crate::value::Value;

/// A schema located for a document: where it came from and, when available,
/// its inline text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaContent {
    pub uri: String,
    pub text: Option<String>,
}

/// A source of schema associations. Implementations decide which documents
/// they apply to; callers compose them and take the first answer.
pub trait SchemaProvider: Send + Sync {
    /// The schema for `document_uri`, or `None` when this source has no
    /// opinion about it.
    fn get_schema_for_document(&self, document_uri: &str) -> Option<SchemaContent>;

    /// Drop any cached state so the next lookup re-reads the source.
    fn reload(&self);

    /// Whether `uri` identifies a schema this source serves, used to react
    /// to schema file edits.
    fn is_schema_file(&self, uri: &str) -> bool;

    /// Install a callback fired when this source's associations change.
    fn set_on_change_listener(&self, _listener: Box<dyn Fn() + Send + Sync>) {}
}

/// First-match-wins composition of providers in the order given.
pub struct CompositeSchemaProvider {
    providers: Vec<Box<dyn SchemaProvider>>,
}

impl CompositeSchemaProvider {
    pub fn new(providers: Vec<Box<dyn SchemaProvider>>) -> Self {
        Self { providers }
    }
}

impl SchemaProvider for CompositeSchemaProvider {
    fn get_schema_for_document(&self, document_uri: &str) -> Option<SchemaContent> {
        self.providers
            .iter()
            .find_map(|p| p.get_schema_for_document(document_uri))
    }

    fn reload(&self) {
        for provider in &self.providers {
            provider.reload();
        }
    }

    fn is_schema_file(&self, uri: &str) -> bool {
        self.providers.iter().any(|p| p.is_schema_file(uri))
    }

    fn set_on_change_listener(&self, listener: Box<dyn Fn() + Send + Sync>) {
        let shared: Arc<dyn Fn() + Send + Sync> = Arc::from(listener);
        for provider in &self.providers {
            let shared = Arc::clone(&shared);
            provider.set_on_change_listener(Box::new(move || shared()));
        }
    }
}

/// Serves schemas from a shared [`SchemaRegistry`].
pub struct RegistrySchemaProvider {
    registry: Arc<SchemaRegistry>,
}

impl RegistrySchemaProvider {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }
}

impl SchemaProvider for RegistrySchemaProvider {
    fn get_schema_for_document(&self, document_uri: &str) -> Option<SchemaContent> {
        let schema = self.registry.get_schema_for_file(document_uri)?;
        Some(SchemaContent {
            uri: schema.uri,
            text: schema.schema,
        })
    }

    fn reload(&self) {}

    fn is_schema_file(&self, uri: &str) -> bool {
        self.registry
            .get_all_schemas()
            .iter()
            .any(|s| s.uri == uri)
    }

    fn set_on_change_listener(&self, listener: Box<dyn Fn() + Send + Sync>) {
        self.registry
            .set_on_change_listener(Box::new(move |_| listener()));
    }
}

/// LRU cache of parsed schema trees keyed by schema URI. Parse failures are
/// not cached, so a corrected schema takes effect on the next lookup.
pub struct SchemaCache {
    trees: Mutex<LruCache<String, Arc<Value>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(64).unwrap_or(NonZeroUsize::MIN);
        Self {
            trees: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get_or_parse(&self, uri: &str, text: &str) -> Option<Arc<Value>> {
        let mut trees = self.trees.lock();
        if let Some(tree) = trees.get(uri) {
            return Some(Arc::clone(tree));
        }
        let tree = Arc::new(parse(text).tree?);
        debug!(uri, "schema parsed and cached");
        trees.put(uri.to_string(), Arc::clone(&tree));
        Some(tree)
    }

    pub fn invalidate(&self, uri: &str) {
        self.trees.lock().pop(uri);
    }

    pub fn clear(&self) {
        self.trees.lock().clear();
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}
