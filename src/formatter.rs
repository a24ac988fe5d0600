use crate::hierarchy::SectionHierarchy;
use crate::position::full_line_range;
use crate::resolver::NestingResolver;
use crate::scanner::{Control, LineKind, LinePatterns, Scanner};
use crate::section::SectionKind;
use tower_lsp::lsp_types::TextEdit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub indent_width: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        FormatOptions { indent_width: 2 }
    }
}

/// Indent level of a section header: `[configuration]`, `[group]` and
/// `[widget]` start at column 0, deeper sections step in one level each.
fn header_level(depth: usize) -> usize {
    depth.saturating_sub(2)
}

/// Re-indent a document and normalise `key=value` spacing.
///
/// Returns one edit per changed line. Comments and opaque control bodies are
/// left as written.
pub fn format_document(
    text: &str,
    hierarchy: &SectionHierarchy,
    patterns: &LinePatterns,
    options: &FormatOptions,
) -> Vec<TextEdit> {
    let mut edits = Vec::new();
    let mut resolver = NestingResolver::new(hierarchy);
    // indent level for settings of the innermost section
    let mut content_level = 0usize;
    // open `for`/`if` blocks with the indent level of their opening line
    let mut controls: Vec<(Control, usize)> = Vec::new();
    let indent = |level: usize| " ".repeat(level * options.indent_width);

    for line in Scanner::new(text, patterns) {
        let formatted = match line.kind {
            LineKind::Section { name, .. } => match name.parse::<SectionKind>() {
                Ok(kind) => {
                    resolver.open_section(kind, full_line_range(line.number, line.text), |_, _| {});
                    let level = resolver.current().map(|f| header_level(f.depth)).unwrap_or(0);
                    content_level = level + 1;
                    Some(format!("{}{}", indent(level + controls.len()), line.text.trim()))
                }
                Err(_) => Some(line.text.trim_end().to_string()),
            },
            LineKind::Setting { key, value, .. } => {
                let assignment = format!("{} = {}", key, value);
                Some(format!(
                    "{}{}",
                    indent(content_level + controls.len()),
                    assignment.trim_end()
                ))
            }
            LineKind::Control {
                keyword,
                opens_block,
                ..
            } => {
                let open = controls.last().copied();
                let level = match open {
                    Some((top, level)) if keyword.opener() == Some(top) => {
                        controls.pop();
                        level
                    }
                    Some((Control::If, level)) if keyword.is_branch() => level,
                    _ => content_level + controls.len(),
                };
                if opens_block && matches!(keyword, Control::For | Control::If) {
                    controls.push((keyword, level));
                }
                Some(format!("{}{}", indent(level), line.text.trim()))
            }
            LineKind::Blank => Some(String::new()),
            LineKind::Text => Some(line.text.trim_end().to_string()),
            LineKind::Comment | LineKind::Opaque => None,
        };

        if let Some(formatted) = formatted {
            if formatted != line.text {
                edits.push(TextEdit {
                    range: full_line_range(line.number, line.text),
                    new_text: formatted,
                });
            }
        }
    }

    edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SettingCatalog;

    fn apply(text: &str, width: usize) -> String {
        let catalog = SettingCatalog::builtin().unwrap();
        let hierarchy = SectionHierarchy::builtin(&catalog).unwrap();
        let patterns = LinePatterns::new().unwrap();
        let edits = format_document(
            text,
            &hierarchy,
            &patterns,
            &FormatOptions { indent_width: width },
        );
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        for edit in edits {
            assert_eq!(edit.range.start.line, edit.range.end.line);
            lines[edit.range.start.line as usize] = edit.new_text;
        }
        lines.join("\n")
    }

    #[test]
    fn test_reindents_sections_and_settings() {
        let text = "[configuration]\n[group]\n    [widget]\ntype=chart\n[series]\n  entity =   srv1   \nmetric = cpu\n";
        assert_eq!(
            apply(text, 2),
            "[configuration]\n[group]\n[widget]\n  type = chart\n  [series]\n    entity = srv1\n    metric = cpu\n"
        );
    }

    #[test]
    fn test_formatted_document_has_no_edits() {
        let catalog = SettingCatalog::builtin().unwrap();
        let hierarchy = SectionHierarchy::builtin(&catalog).unwrap();
        let patterns = LinePatterns::new().unwrap();
        let text = "[configuration]\n[group]\n[widget]\n  type = chart\n  [series]\n    entity = srv1\n    metric = cpu_busy";
        assert!(format_document(text, &hierarchy, &patterns, &FormatOptions::default()).is_empty());
    }

    #[test]
    fn test_control_bodies_step_in() {
        let text = "[configuration]\n[group]\n[widget]\ntype = chart\nfor s in servers\n[series]\nentity = @{s}\nif s == 'a'\nmetric = a\nelse\nmetric = b\nendif\nendfor\n";
        assert_eq!(
            apply(text, 2),
            "[configuration]\n[group]\n[widget]\n  type = chart\n  for s in servers\n    [series]\n      entity = @{s}\n      if s == 'a'\n        metric = a\n      else\n        metric = b\n      endif\n  endfor\n"
        );
    }

    #[test]
    fn test_comments_and_scripts_are_untouched() {
        let text = "[configuration]\n   # note   \n/*\n   keep   \n*/\nscript\n      raw = 1   \nendscript\n";
        assert_eq!(
            apply(text, 4),
            "[configuration]\n   # note   \n/*\n   keep   \n*/\n    script\n      raw = 1   \n    endscript\n"
        );
    }
}
