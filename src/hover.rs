use crate::catalog::{Setting, SettingCatalog, ValueContext};
use crate::completion::replay;
use crate::document::DocumentSnapshot;
use crate::hierarchy::SectionHierarchy;
use crate::position::{line_range, LineIndex};
use crate::scanner::{LineKind, LinePatterns, Scanner};
use crate::section::SectionKind;
use crate::utils::constants::NO_REQUIREMENTS;
use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position};

pub struct HoverProvider<'a> {
    catalog: &'a SettingCatalog,
    hierarchy: &'a SectionHierarchy,
    patterns: &'a LinePatterns,
}

impl<'a> HoverProvider<'a> {
    pub fn new(
        catalog: &'a SettingCatalog,
        hierarchy: &'a SectionHierarchy,
        patterns: &'a LinePatterns,
    ) -> Self {
        HoverProvider {
            catalog,
            hierarchy,
            patterns,
        }
    }

    /// Documentation for the setting key or section name under the cursor
    pub fn hover_at(&self, snapshot: &DocumentSnapshot, position: Position) -> Option<Hover> {
        let replay = replay(&snapshot.text, position.line, self.hierarchy, self.patterns);
        if replay.hidden {
            return None;
        }

        let index = LineIndex::new(&snapshot.text);
        let line = index.line(position.line);
        let column = index.byte_column(position);
        let scanned = Scanner::new(line, self.patterns).next()?;

        match scanned.kind {
            LineKind::Section { name, span } if span.start <= column && column <= span.end => {
                let kind = name.parse::<SectionKind>().ok()?;
                Some(hover(
                    self.section_markdown(kind),
                    line_range(position.line, line, span.start, span.end),
                ))
            }
            LineKind::Setting { key, key_span, .. }
                if key_span.start <= column && column <= key_span.end =>
            {
                if replay
                    .resolver
                    .current()
                    .is_some_and(|f| f.kind.is_free_form())
                {
                    return None;
                }
                let setting = self.catalog.lookup(key)?;
                let ctx = ValueContext {
                    widget_type: replay.resolver.widget_type(),
                    section: replay.resolver.current().map(|f| f.kind),
                };
                Some(hover(
                    setting_markdown(setting, &ctx),
                    line_range(position.line, line, key_span.start, key_span.end),
                ))
            }
            _ => None,
        }
    }

    fn section_markdown(&self, kind: SectionKind) -> String {
        let mut doc = format!("**[{}]**\n\n", kind);

        let parents = self.hierarchy.parents_of(kind);
        if parents.is_empty() {
            doc.push_str("Outermost section.\n\n");
        } else {
            doc.push_str(&format!("Nested in: {}\n\n", bracketed(parents)));
        }
        if kind.is_free_form() {
            doc.push_str("Holds arbitrary `name = value` entries.\n\n");
        }

        let rule = self.hierarchy.requirements_for(kind, None);
        if rule.settings.is_empty() && rule.sections.is_empty() {
            doc.push_str(NO_REQUIREMENTS);
            return doc;
        }
        for group in &rule.settings {
            let names: Vec<String> = group
                .iter()
                .map(|n| {
                    let display = self.catalog.lookup(n).map(|s| s.display_name.as_str()).unwrap_or(n);
                    format!("`{}`", display)
                })
                .collect();
            doc.push_str(&format!("- requires {}\n", names.join(" or ")));
        }
        for group in &rule.sections {
            doc.push_str(&format!("- requires {}\n", bracketed(group).replace(", ", " or ")));
        }
        doc
    }
}

fn bracketed(kinds: &[SectionKind]) -> String {
    kinds
        .iter()
        .map(|k| format!("[{}]", k))
        .collect::<Vec<_>>()
        .join(", ")
}

fn hover(value: String, range: tower_lsp::lsp_types::Range) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range: Some(range),
    }
}

/// Markdown documentation for one setting
pub fn setting_markdown(setting: &Setting, ctx: &ValueContext<'_>) -> String {
    let mut doc = format!("**{}**\n\n", setting.display_name);
    if let Some(description) = &setting.description {
        doc.push_str(description);
        doc.push_str("\n\n");
    }

    doc.push_str(&format!("- type: `{}`\n", setting.value_type));
    if let Some(default) = &setting.default_value {
        doc.push_str(&format!("- default: `{}`\n", default));
    }
    doc.push_str(&format!("- example: `{} = {}`\n", setting.display_name, setting.example));

    let values = setting.resolve_enum(ctx);
    if !values.is_empty() {
        let values: Vec<String> = values.iter().map(|v| format!("`{}`", v)).collect();
        doc.push_str(&format!("- values: {}\n", values.join(", ")));
    }
    if let (Some(min), Some(max)) = (setting.min_value, setting.max_value) {
        doc.push_str(&format!("- range: {} to {}\n", min, max));
    } else if let Some(min) = setting.min_value {
        doc.push_str(&format!("- minimum: {}\n", min));
    } else if let Some(max) = setting.max_value {
        doc.push_str(&format!("- maximum: {}\n", max));
    }
    if !setting.allowed_sections.is_empty() {
        doc.push_str(&format!("- sections: {}\n", bracketed(&setting.allowed_sections)));
    }
    if !setting.allowed_widget_types.is_empty() {
        doc.push_str(&format!("- widgets: {}\n", setting.allowed_widget_types.join(", ")));
    }
    if let Some(script) = &setting.script {
        doc.push_str(&format!("- script returning `{}`\n", script.return_type));
    }
    doc
}
