use crate::catalog::SettingCatalog;
use crate::completion::Completer;
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::document::DocumentSnapshot;
use crate::formatter::{format_document, FormatOptions};
use crate::hierarchy::SectionHierarchy;
use crate::hover::HoverProvider;
use crate::scanner::LinePatterns;
use crate::validator::{ValidationOptions, Validator};
use anyhow::{Context, Result};
use tower_lsp::lsp_types::{CompletionItem, Hover, Position, TextEdit};

/// Features the host wants; disabled ones answer with empty results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub completion: bool,
    pub hover: bool,
    pub validation: bool,
    pub formatting: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            completion: true,
            hover: true,
            validation: true,
            formatting: true,
        }
    }
}

/// Owns the catalog and hierarchy and hands out per-request engines
pub struct LanguageService {
    catalog: SettingCatalog,
    hierarchy: SectionHierarchy,
    patterns: LinePatterns,
    capabilities: Capabilities,
    validation: ValidationOptions,
    format: FormatOptions,
}

impl LanguageService {
    /// Service over the embedded catalog
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_catalog(SettingCatalog::builtin()?, config)
    }

    /// Service over the embedded catalog with default configuration
    pub fn builtin() -> Result<Self> {
        Self::new(&Config::default())
    }

    pub fn with_catalog(catalog: SettingCatalog, config: &Config) -> Result<Self> {
        let hierarchy = SectionHierarchy::builtin(&catalog)?;
        let patterns = LinePatterns::new().context("Failed to compile line patterns")?;
        Ok(LanguageService {
            catalog,
            hierarchy,
            patterns,
            capabilities: config.capabilities(),
            validation: config.validation_options(),
            format: config.format_options(),
        })
    }

    /// Replace the options taken from configuration
    pub fn configure(&mut self, config: &Config) {
        self.capabilities = config.capabilities();
        self.validation = config.validation_options();
        self.format = config.format_options();
    }

    pub fn catalog(&self) -> &SettingCatalog {
        &self.catalog
    }

    pub fn hierarchy(&self) -> &SectionHierarchy {
        &self.hierarchy
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn validator(&self) -> Validator<'_> {
        Validator::new(&self.catalog, &self.hierarchy, &self.patterns, &self.validation)
    }

    pub fn validate(&self, snapshot: &DocumentSnapshot) -> Vec<Diagnostic> {
        self.validate_text(&snapshot.text)
    }

    pub fn validate_text(&self, text: &str) -> Vec<Diagnostic> {
        if !self.capabilities.validation {
            return Vec::new();
        }
        self.validator().validate_document(text)
    }

    pub fn completions(&self, snapshot: &DocumentSnapshot, position: Position) -> Vec<CompletionItem> {
        if !self.capabilities.completion {
            return Vec::new();
        }
        Completer::new(&self.catalog, &self.hierarchy, &self.patterns).completions_at(snapshot, position)
    }

    pub fn hover(&self, snapshot: &DocumentSnapshot, position: Position) -> Option<Hover> {
        if !self.capabilities.hover {
            return None;
        }
        HoverProvider::new(&self.catalog, &self.hierarchy, &self.patterns).hover_at(snapshot, position)
    }

    pub fn format(&self, snapshot: &DocumentSnapshot) -> Vec<TextEdit> {
        if !self.capabilities.formatting {
            return Vec::new();
        }
        format_document(&snapshot.text, &self.hierarchy, &self.patterns, &self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(text: &str) -> DocumentSnapshot {
        DocumentSnapshot::new("file:///p.config".parse().unwrap(), 1, text)
    }

    #[test]
    fn test_service_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LanguageService>();
    }

    #[test]
    fn test_disabled_capabilities_return_nothing() {
        let config = Config::default()
            .with_overrides(&json!({"features": {
                "completion": false, "hover": false, "validation": false, "formatting": false
            }}))
            .unwrap();
        let service = LanguageService::new(&config).unwrap();
        let doc = snapshot("[widget]\ntype=chart\n");

        assert!(service.validate(&doc).is_empty());
        assert!(service.completions(&doc, Position::new(1, 0)).is_empty());
        assert!(service.hover(&doc, Position::new(1, 1)).is_none());
        assert!(service.format(&doc).is_empty());
    }

    #[test]
    fn test_configure_switches_options() {
        let mut service = LanguageService::builtin().unwrap();
        let doc = snapshot("[configuration]\n[group]\n[widget]\n  type = chart\n  bogus = 1\n  [series]\n    entity = a\n    metric = b\n");
        assert_eq!(service.validate(&doc).len(), 1);

        let quiet = Config::default()
            .with_overrides(&json!({"validation": {"unknown-settings": "off"}}))
            .unwrap();
        service.configure(&quiet);
        assert!(service.validate(&doc).is_empty());
    }
}
