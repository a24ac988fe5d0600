use tracing::{debug, info, warn};

pub fn log_catalog_excluded(label: &str, reason: &str) {
    warn!("[Catalog] Excluding setting '{}': {}", label, reason);
}

pub fn log_catalog_duplicate(display_name: &str) {
    warn!(
        "[Catalog] Duplicate definition for '{}', keeping the later one",
        display_name
    );
}

pub fn log_catalog_built(count: usize) {
    debug!("[Catalog] Built catalog with {} settings", count);
}

pub fn log_close_on_empty_stack() {
    debug!("[Resolver] close_section called with no open sections");
}

pub fn log_section_opened(kind: &str, depth: usize, line: u32) {
    debug!("[Resolver] Opened [{}] at depth {} (line {})", kind, depth, line);
}

pub fn log_request_at_position(method: &str, line: u32, character: u32) {
    debug!("[ChartsLsp] Request: {} at line:{} char:{}", method, line, character);
}

pub fn log_document_stored(uri: &str, version: i32, len: usize) {
    debug!("[ChartsLsp] Stored {} (version {}, {} bytes)", uri, version, len);
}

pub fn log_stale_version(uri: &str, version: i32) {
    debug!("[ChartsLsp] Dropping stale version {} of {}", version, uri);
}

pub fn log_document_missing(uri: &str) {
    debug!("[ChartsLsp] No open document for {}", uri);
}

pub fn log_diagnostics_published(uri: &str, count: usize) {
    debug!("[ChartsLsp] Published {} diagnostics for {}", count, uri);
}

pub fn log_config_layer_merged(layer: &str) {
    info!("[Config] Merging {}", layer);
}

pub fn log_config_layer_failed(layer: &str, error: &str) {
    warn!("[Config] Failed to load {}: {}", layer, error);
}

pub fn log_config_option_ignored(key: &str) {
    debug!("[Config] Ignoring unknown option '{}'", key);
}
