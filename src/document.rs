use std::collections::HashMap;
use tower_lsp::lsp_types::Url;

/// Immutable text of one document version; every request runs against one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub uri: Url,
    pub version: i32,
    pub text: String,
}

impl DocumentSnapshot {
    pub fn new(uri: Url, version: i32, text: impl Into<String>) -> Self {
        DocumentSnapshot {
            uri,
            version,
            text: text.into(),
        }
    }
}

/// Store `snapshot` unless the store already holds a newer version of it
pub fn store_if_newer(documents: &mut HashMap<Url, DocumentSnapshot>, snapshot: DocumentSnapshot) -> bool {
    if let Some(stored) = documents.get(&snapshot.uri) {
        if stored.version > snapshot.version {
            return false;
        }
    }
    documents.insert(snapshot.uri.clone(), snapshot);
    true
}
