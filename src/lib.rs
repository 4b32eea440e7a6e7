//! Schema-aware analysis for KSON documents.
//!
//! The pipeline: [`parse`] turns document text into a located value tree,
//! [`position`] translates a cursor into a document path (tolerating the
//! broken documents a user mid-edit produces), and the [`schema`] modules
//! walk a JSON Schema along that path to back [`hover`] and [`completion`].
//! [`navigator`] holds the schema-agnostic tree plumbing underneath.

pub mod completion;
pub mod hover;
pub mod navigator;
pub mod parse;
pub mod position;
pub mod schema;
pub mod value;

pub use completion::{CompletionItem, CompletionKind, get_completions_at_location};
pub use hover::get_schema_info_at_location;
pub use navigator::{
    Path, build_path, find_all, find_first, find_parent, find_value_at_location, resolve_path,
    walk,
};
pub use parse::{Diagnostic, ParseResult, Token, TokenKind, parse};
pub use position::build_path_to_position;
pub use schema::{
    CompositeSchemaProvider, ExtensionSchema, RegistrySchemaProvider, ResolvedSchemaRef,
    SchemaCache, SchemaContent, SchemaProvider, SchemaRegistry, extract_schema_info,
    navigate_schema_by_document_path,
};
pub use value::{EmbedBlock, Location, ObjectMap, Value, ValueKind};
