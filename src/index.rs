//! Maps content types to Algolia index names.

/// Resolve the target index for a content type.
///
/// Unmapped types use the type name itself, so each custom type still lands
/// in its own index without needing an entry here.
pub fn resolve_index(doc_type: &str) -> &str {
    match doc_type {
        "blog" => "Blog",
        "post" => "Posts",
        "page" => "Pages",
        other => other,
    }
}
