pub mod info;
pub mod provider;
pub mod registry;
pub mod resolver;

pub use info::extract_schema_info;
pub use provider::{
    CompositeSchemaProvider, RegistrySchemaProvider, SchemaCache, SchemaContent, SchemaProvider,
};
pub use registry::{ExtensionSchema, SchemaRegistry};
pub use resolver::{ResolvedSchemaRef, navigate_schema_by_document_path};
