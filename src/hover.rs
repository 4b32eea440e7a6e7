/// Schema-driven hover.
///
/// Translates the cursor into a document path, walks the schema along that
/// path, and renders the resolved sub-schema's descriptive fields.
use crate::parse::parse;
use crate::position::build_path_to_position;
use crate::schema::info::extract_schema_info;
use crate::schema::resolver::navigate_schema_by_document_path;

/// Hover text for the document position under `schema_text`; `None` when the
/// schema does not parse, no path resolves, or the resolved node carries no
/// presentable fields.
pub fn get_schema_info_at_location(
    document_text: &str,
    schema_text: &str,
    line: u32,
    column: u32,
) -> Option<String> {
    let schema_tree = parse(schema_text).tree?;
    let path = build_path_to_position(document_text, line, column)?;
    let resolved = navigate_schema_by_document_path(&schema_tree, &path, "")?;
    extract_schema_info(resolved.node)
}
