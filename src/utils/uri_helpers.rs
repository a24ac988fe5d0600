use crate::utils::constants::CHARTS_EXTENSIONS;
use std::path::Path;
use tower_lsp::lsp_types::Url;

/// Extract file name from URL
pub fn extract_filename(uri: &Url) -> &str {
    uri.path_segments()
        .and_then(|mut segs| segs.next_back())
        .unwrap_or("document")
}

/// Whether a path looks like a charts document
///
/// # Examples
/// - "portal/cpu.config" → true
/// - "README.md" → false
pub fn has_charts_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| CHARTS_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
