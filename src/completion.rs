use crate::catalog::{Setting, SettingCatalog, ValueContext, ValueType};
use crate::document::DocumentSnapshot;
use crate::hierarchy::SectionHierarchy;
use crate::position::{line_range, LineIndex};
use crate::resolver::{widget_type, NestingResolver, SettingEntry};
use crate::scanner::{LineKind, LinePatterns, Scanner};
use crate::section::SectionKind;
use crate::utils::constants::CONTROL_SNIPPETS;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, Documentation, InsertTextFormat, MarkupContent,
    MarkupKind, Position,
};

/// Resolver state at the start of a line
pub(crate) struct Replay<'h> {
    pub resolver: NestingResolver<'h>,
    /// The line starts inside a block comment or an opaque block
    pub hidden: bool,
}

/// Feed the lines before `line` through the scanner and resolver
pub(crate) fn replay<'h>(
    text: &str,
    line: u32,
    hierarchy: &'h SectionHierarchy,
    patterns: &LinePatterns,
) -> Replay<'h> {
    let mut resolver = NestingResolver::new(hierarchy);
    let mut scanner = Scanner::new(text, patterns);
    let mut skipping = false;

    for scanned in scanner.by_ref().take(line as usize) {
        match scanned.kind {
            LineKind::Section { name, span } => match name.parse::<SectionKind>() {
                Ok(kind) => {
                    skipping = false;
                    let range = line_range(scanned.number, scanned.text, span.start, span.end);
                    resolver.open_section(kind, range, |_, _| {});
                }
                Err(_) => skipping = true,
            },
            LineKind::Setting {
                key,
                key_span,
                value,
                value_span,
            } if !skipping => {
                let entry = SettingEntry::new(
                    key,
                    value,
                    line_range(scanned.number, scanned.text, key_span.start, key_span.end),
                    line_range(scanned.number, scanned.text, value_span.start, value_span.end),
                );
                resolver.record_setting(entry);
            }
            _ => {}
        }
    }

    Replay {
        hidden: scanner.in_comment() || scanner.in_opaque(),
        resolver,
    }
}

pub(crate) fn markdown(value: String) -> Documentation {
    Documentation::MarkupContent(MarkupContent {
        kind: MarkupKind::Markdown,
        value,
    })
}

/// Replays the resolver over the lines above the cursor
pub struct Completer<'a> {
    catalog: &'a SettingCatalog,
    hierarchy: &'a SectionHierarchy,
    patterns: &'a LinePatterns,
}

impl<'a> Completer<'a> {
    pub fn new(
        catalog: &'a SettingCatalog,
        hierarchy: &'a SectionHierarchy,
        patterns: &'a LinePatterns,
    ) -> Self {
        Completer {
            catalog,
            hierarchy,
            patterns,
        }
    }

    pub fn completions_at(&self, snapshot: &DocumentSnapshot, position: Position) -> Vec<CompletionItem> {
        let replay = replay(&snapshot.text, position.line, self.hierarchy, self.patterns);
        if replay.hidden {
            return Vec::new();
        }

        let index = LineIndex::new(&snapshot.text);
        let line = index.line(position.line);
        let before = &line[..index.byte_column(position)];
        let trimmed = before.trim_start();

        if trimmed.starts_with('#') || trimmed.starts_with("//") || trimmed.starts_with("/*") {
            return Vec::new();
        }
        if let Some(rest) = trimmed.strip_prefix('[') {
            if rest.contains(']') {
                return Vec::new();
            }
            return self.section_items(&replay.resolver);
        }
        if let Some((key, _)) = before.split_once('=') {
            return self.value_items(key.trim(), &replay.resolver);
        }
        self.setting_items(&replay.resolver)
    }

    /// Kinds that may open under one of the open frames
    fn section_items(&self, resolver: &NestingResolver<'_>) -> Vec<CompletionItem> {
        let frames = resolver.frames();
        let mut kinds: Vec<SectionKind> = SectionKind::ALL
            .iter()
            .copied()
            .filter(|kind| {
                let parents = self.hierarchy.parents_of(*kind);
                if parents.is_empty() {
                    frames.is_empty()
                } else {
                    frames.iter().any(|f| parents.contains(&f.kind))
                }
            })
            .collect();
        kinds.sort_by_key(|k| k.as_str());

        kinds
            .into_iter()
            .map(|kind| CompletionItem {
                label: kind.as_str().to_string(),
                kind: Some(CompletionItemKind::MODULE),
                detail: Some("section".to_string()),
                insert_text: Some(kind.as_str().to_string()),
                sort_text: Some(kind.as_str().to_string()),
                ..Default::default()
            })
            .collect()
    }

    fn value_items(&self, key: &str, resolver: &NestingResolver<'_>) -> Vec<CompletionItem> {
        let Some(setting) = self.catalog.lookup(key) else {
            return Vec::new();
        };
        let ctx = ValueContext {
            widget_type: resolver.widget_type(),
            section: resolver.current().map(|f| f.kind),
        };

        let values: Vec<(String, Option<String>)> = if setting.value_type == ValueType::Boolean {
            vec![("true".to_string(), None), ("false".to_string(), None)]
        } else {
            let enum_values = setting.resolve_enum(&ctx);
            if enum_values.is_empty() {
                setting
                    .possible_values
                    .iter()
                    .map(|p| (p.value.clone(), p.detail.clone()))
                    .collect()
            } else {
                enum_values.iter().map(|v| (v.clone(), None)).collect()
            }
        };

        values
            .into_iter()
            .enumerate()
            .map(|(i, (value, detail))| CompletionItem {
                label: value.clone(),
                kind: Some(CompletionItemKind::ENUM_MEMBER),
                detail,
                insert_text: Some(value),
                sort_text: Some(format!("{:04}", i)),
                ..Default::default()
            })
            .collect()
    }

    fn setting_items(&self, resolver: &NestingResolver<'_>) -> Vec<CompletionItem> {
        let mut items = Vec::new();

        if let Some((frame, ancestors)) = resolver.split_current() {
            if !frame.kind.is_free_form() {
                let widget = widget_type(Some(frame), ancestors);
                let nested = self.hierarchy.descendants(frame.kind);
                let mut ranked: Vec<(u8, &Setting)> = Vec::new();

                for setting in self.catalog.iter() {
                    if frame.has_setting(&setting.name) {
                        continue;
                    }
                    if widget.is_some_and(|w| !setting.applies_to_widget(w)) {
                        continue;
                    }
                    let rank = if setting.allowed_sections.contains(&frame.kind) {
                        0
                    } else if setting.allowed_sections.is_empty() {
                        1
                    } else if setting
                        .allowed_sections
                        .iter()
                        .any(|k| nested.contains(k) || ancestors.iter().any(|a| a.kind == *k))
                    {
                        2
                    } else {
                        continue;
                    };
                    ranked.push((rank, setting));
                }

                // catalog order is alphabetical, the stable sort keeps it within a rank
                ranked.sort_by_key(|(rank, _)| *rank);
                items.extend(ranked.into_iter().map(|(rank, s)| setting_item(rank, s)));
            }
        }

        items.extend(CONTROL_SNIPPETS.iter().map(|(label, body)| CompletionItem {
            label: label.to_string(),
            kind: Some(CompletionItemKind::SNIPPET),
            detail: Some("control structure".to_string()),
            insert_text: Some(body.to_string()),
            insert_text_format: Some(InsertTextFormat::SNIPPET),
            sort_text: Some(format!("3{}", label)),
            ..Default::default()
        }));
        items
    }
}

fn setting_item(rank: u8, setting: &Setting) -> CompletionItem {
    CompletionItem {
        label: setting.display_name.clone(),
        kind: Some(CompletionItemKind::PROPERTY),
        detail: Some(setting.value_type.to_string()),
        documentation: setting.description.clone().map(markdown),
        insert_text: Some(format!("{} = ", setting.display_name)),
        filter_text: Some(setting.display_name.clone()),
        sort_text: Some(format!("{}{}", rank, setting.display_name)),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        catalog: SettingCatalog,
        hierarchy: SectionHierarchy,
        patterns: LinePatterns,
    }

    impl Fixture {
        fn new() -> Self {
            let catalog = SettingCatalog::builtin().unwrap();
            let hierarchy = SectionHierarchy::builtin(&catalog).unwrap();
            Fixture {
                catalog,
                hierarchy,
                patterns: LinePatterns::new().unwrap(),
            }
        }

        fn labels(&self, text: &str, line: u32, character: u32) -> Vec<String> {
            let snapshot = DocumentSnapshot::new(
                "file:///portal.config".parse().unwrap(),
                1,
                text,
            );
            Completer::new(&self.catalog, &self.hierarchy, &self.patterns)
                .completions_at(&snapshot, Position::new(line, character))
                .into_iter()
                .map(|i| i.label)
                .collect()
        }
    }

    #[test]
    fn test_section_names_after_bracket() {
        let fixture = Fixture::new();
        let labels = fixture.labels("[configuration]\n[group]\n[widget]\n  [", 3, 3);
        assert!(labels.contains(&"series".to_string()));
        assert!(labels.contains(&"tags".to_string()));
        assert!(!labels.contains(&"configuration".to_string()));
        assert!(!labels.contains(&"tag".to_string()));
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);

        assert_eq!(fixture.labels("[", 0, 1), vec!["configuration".to_string()]);
    }

    #[test]
    fn test_enum_values_follow_overrides() {
        let fixture = Fixture::new();
        let text = "[configuration]\n[group]\n[widget]\n  type = chart\n  mode = ";
        assert_eq!(fixture.labels(text, 4, 9), vec!["column", "column-stack", "range"]);

        let text = "[configuration]\n[group]\n[widget]\n  type = bar\n  mode = ";
        assert_eq!(fixture.labels(text, 4, 9).len(), 5);
    }

    #[test]
    fn test_boolean_and_possible_values() {
        let fixture = Fixture::new();
        let text = "[configuration]\n[group]\n[widget]\n  type = chart\n  [series]\n    add-meta = ";
        assert_eq!(fixture.labels(text, 5, 15), vec!["true", "false"]);

        let text = "[configuration]\n[group]\n[widget]\n  type = chart\n  color-range = ";
        assert_eq!(fixture.labels(text, 4, 16)[0], "blue");
    }

    #[test]
    fn test_settings_ranked_by_scope() {
        let fixture = Fixture::new();
        let text = "[configuration]\n[group]\n[widget]\n  type = chart\n  [series]\n    metric = cpu\n    ";
        let snapshot = DocumentSnapshot::new("file:///p.config".parse().unwrap(), 1, text);
        let items = Completer::new(&fixture.catalog, &fixture.hierarchy, &fixture.patterns)
            .completions_at(&snapshot, Position::new(6, 4));

        let rank_of = |label: &str| {
            items
                .iter()
                .find(|i| i.label == label)
                .and_then(|i| i.sort_text.clone())
                .map(|s| s[..1].to_string())
        };
        assert_eq!(rank_of("entity").as_deref(), Some("0"));
        assert_eq!(rank_of("author").as_deref(), Some("1"));
        assert_eq!(rank_of("title").as_deref(), Some("2"));
        assert_eq!(rank_of("for").as_deref(), Some("3"));
        assert_eq!(rank_of("metric"), None);
        assert_eq!(rank_of("on-change"), None);

        let sort_texts: Vec<_> = items.iter().filter_map(|i| i.sort_text.clone()).collect();
        let mut sorted = sort_texts.clone();
        sorted.sort();
        assert_eq!(sort_texts, sorted);
    }

    #[test]
    fn test_free_form_sections_offer_only_snippets() {
        let fixture = Fixture::new();
        let labels = fixture.labels("[configuration]\n[group]\n[widget]\n  type = chart\n  [tags]\n    ", 5, 4);
        assert_eq!(labels, vec!["csv", "for", "if", "list", "script", "var"]);
    }

    #[test]
    fn test_nothing_inside_comments_or_scripts() {
        let fixture = Fixture::new();
        assert!(fixture.labels("[configuration]\n/*\n  ", 2, 2).is_empty());
        assert!(fixture.labels("[configuration]\nscript\n  ", 2, 2).is_empty());
        assert!(fixture.labels("[configuration]\n# ", 1, 2).is_empty());
    }
}
