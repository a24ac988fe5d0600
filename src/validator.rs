use crate::catalog::{Setting, SettingCatalog, ValueContext, ValueType};
use crate::diagnostic::{Diagnostic, DiagnosticCode, Severity};
use crate::hierarchy::SectionHierarchy;
use crate::position::line_range;
use crate::resolver::{widget_type, Frame, NestingResolver, SettingEntry, StructuralError};
use crate::scanner::{Control, LineKind, LinePatterns, Scanner};
use crate::section::SectionKind;
use std::collections::HashSet;
use tower_lsp::lsp_types::Range;

const INTERVAL_UNITS: &[&str] = &[
    "millisecond",
    "second",
    "minute",
    "hour",
    "day",
    "week",
    "month",
    "quarter",
    "year",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Severity for settings missing from the catalog; `None` disables the check
    pub unknown_settings: Option<Severity>,
    pub duplicate_settings: bool,
    pub value_checks: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationOptions {
            unknown_settings: Some(Severity::Information),
            duplicate_settings: true,
            value_checks: true,
        }
    }
}

/// Single pass over a document. Structural problems are reported while
/// scanning, per-section rules when a section closes.
pub struct Validator<'a> {
    catalog: &'a SettingCatalog,
    hierarchy: &'a SectionHierarchy,
    patterns: &'a LinePatterns,
    options: &'a ValidationOptions,
}

impl<'a> Validator<'a> {
    pub fn new(
        catalog: &'a SettingCatalog,
        hierarchy: &'a SectionHierarchy,
        patterns: &'a LinePatterns,
        options: &'a ValidationOptions,
    ) -> Self {
        Validator {
            catalog,
            hierarchy,
            patterns,
            options,
        }
    }

    /// Validate a whole document; diagnostics come back in document order
    pub fn validate_document(&self, text: &str) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut resolver = NestingResolver::new(self.hierarchy);
        let mut controls: Vec<(Control, Range)> = Vec::new();
        // body of an unknown section
        let mut skipping = false;

        for line in Scanner::new(text, self.patterns) {
            match line.kind {
                LineKind::Section { name, span } => {
                    let range = line_range(line.number, line.text, span.start, span.end);
                    let Ok(kind) = name.parse::<SectionKind>() else {
                        skipping = true;
                        diagnostics.push(Diagnostic::warning(
                            range,
                            DiagnosticCode::UnknownSection,
                            format!("Unknown section [{}]", name),
                        ));
                        continue;
                    };
                    skipping = false;

                    let error = resolver.open_section(kind, range, |frame, ancestors| {
                        diagnostics.extend(self.validate_frame(&frame, ancestors));
                    });
                    if let Some(error) = error {
                        let code = match error {
                            StructuralError::Depth { .. } => DiagnosticCode::SectionDepth,
                            StructuralError::Parent { .. } => DiagnosticCode::SectionParent,
                        };
                        diagnostics.push(Diagnostic::error(range, code, error.message()));
                    }
                }
                LineKind::Setting {
                    key,
                    key_span,
                    value,
                    value_span,
                } => {
                    if skipping {
                        continue;
                    }
                    let key_range = line_range(line.number, line.text, key_span.start, key_span.end);
                    let value_range =
                        line_range(line.number, line.text, value_span.start, value_span.end);
                    let mut entry = SettingEntry::new(key, value, key_range, value_range);
                    entry.in_control = controls
                        .iter()
                        .any(|(c, _)| matches!(c, Control::For | Control::If));

                    if !resolver.record_setting(entry) {
                        diagnostics.push(Diagnostic::warning(
                            key_range,
                            DiagnosticCode::OutsideSection,
                            format!("{} is declared outside of any section", key),
                        ));
                    }
                }
                LineKind::Control {
                    keyword,
                    span,
                    opens_block,
                } => {
                    let range = line_range(line.number, line.text, span.start, span.end);
                    track_control(&mut controls, keyword, range, opens_block, &mut diagnostics);
                }
                LineKind::Blank | LineKind::Comment | LineKind::Opaque | LineKind::Text => {}
            }
        }

        resolver.finish(|frame, ancestors| {
            diagnostics.extend(self.validate_frame(&frame, ancestors));
        });

        for (keyword, range) in controls {
            diagnostics.push(unclosed(keyword, range));
        }

        diagnostics.sort_by_key(|d| (d.range.start.line, d.range.start.character));
        diagnostics
    }

    /// Check one closed section against its requirement rule and the catalog.
    ///
    /// `ancestors` are the frames enclosing `frame`, outermost first. Required
    /// settings may be inherited from them.
    pub fn validate_frame(&self, frame: &Frame, ancestors: &[Frame]) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let widget_type = widget_type(Some(frame), ancestors);
        let rule = self.hierarchy.requirements_for(frame.kind, widget_type);

        for group in &rule.settings {
            let satisfied = group
                .iter()
                .any(|name| frame.has_setting(name) || ancestors.iter().any(|a| a.has_setting(name)));
            if satisfied {
                continue;
            }
            if let Some(first) = group.first() {
                let display = self
                    .catalog
                    .lookup(first)
                    .map(|s| s.display_name.as_str())
                    .unwrap_or(first);
                diagnostics.push(Diagnostic::error(
                    frame.header,
                    DiagnosticCode::MissingSetting,
                    format!("{} is required", display),
                ));
            }
        }

        for group in &rule.sections {
            if group.iter().any(|kind| frame.children.contains(kind)) {
                continue;
            }
            if let Some(first) = group.first() {
                diagnostics.push(Diagnostic::error(
                    frame.header,
                    DiagnosticCode::MissingSection,
                    format!("[{}] is required", first),
                ));
            }
        }

        if !frame.kind.is_free_form() {
            self.check_settings(frame, ancestors, widget_type, &mut diagnostics);
        }
        diagnostics
    }

    fn check_settings(
        &self,
        frame: &Frame,
        ancestors: &[Frame],
        widget_type: Option<&str>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let ctx = ValueContext {
            widget_type,
            section: Some(frame.kind),
        };
        let mut reported_pairs: HashSet<(&str, &str)> = HashSet::new();

        for (index, entry) in frame.settings.iter().enumerate() {
            let Some(setting) = self.catalog.lookup(&entry.name) else {
                self.report_unknown(entry, diagnostics);
                continue;
            };
            let earlier = &frame.settings[..index];

            if self.options.duplicate_settings
                && !entry.in_control
                && earlier.iter().any(|e| e.name == entry.name && !e.in_control)
            {
                diagnostics.push(Diagnostic::warning(
                    entry.key_range,
                    DiagnosticCode::DuplicateSetting,
                    format!("{} is already defined in [{}]", setting.display_name, frame.kind),
                ));
            }

            for previous in earlier {
                if previous.name == entry.name {
                    continue;
                }
                let other = self.catalog.lookup(&previous.name);
                let excluded = setting.excludes(&previous.name)
                    || other.is_some_and(|o| o.excludes(&entry.name));
                if !excluded {
                    continue;
                }
                let pair = if entry.name < previous.name {
                    (entry.name.as_str(), previous.name.as_str())
                } else {
                    (previous.name.as_str(), entry.name.as_str())
                };
                if reported_pairs.insert(pair) {
                    let other_name = other.map(|o| o.display_name.as_str()).unwrap_or(&previous.key);
                    diagnostics.push(Diagnostic::error(
                        entry.key_range,
                        DiagnosticCode::MutualExclusion,
                        format!(
                            "{} can not be specified simultaneously with {}",
                            setting.display_name, other_name
                        ),
                    ));
                }
            }

            if !self.in_scope(setting, frame, ancestors) {
                let allowed = setting
                    .allowed_sections
                    .iter()
                    .map(|k| format!("[{}]", k))
                    .collect::<Vec<_>>()
                    .join(", ");
                diagnostics.push(Diagnostic::warning(
                    entry.key_range,
                    DiagnosticCode::SettingScope,
                    format!(
                        "{} is not allowed in [{}], expected in {}",
                        setting.display_name, frame.kind, allowed
                    ),
                ));
            }

            if let Some(widget) = widget_type {
                if !setting.applies_to_widget(widget) {
                    diagnostics.push(Diagnostic::warning(
                        entry.key_range,
                        DiagnosticCode::WidgetType,
                        format!(
                            "{} is not applicable to widget type '{}', expected {}",
                            setting.display_name,
                            widget,
                            setting.allowed_widget_types.join(", ")
                        ),
                    ));
                }
            }

            if self.options.value_checks {
                if let Some(message) = check_value(setting, &entry.value, &ctx) {
                    diagnostics.push(Diagnostic::error(
                        entry.value_range,
                        DiagnosticCode::InvalidValue,
                        message,
                    ));
                }
            }
        }
    }

    /// Legal in the frame's kind, in an enclosing kind, or in a kind that nests under the frame
    fn in_scope(&self, setting: &Setting, frame: &Frame, ancestors: &[Frame]) -> bool {
        setting.is_allowed_in(frame.kind)
            || ancestors.iter().any(|a| setting.is_allowed_in(a.kind))
            || setting
                .allowed_sections
                .iter()
                .any(|kind| self.hierarchy.is_nested_under(*kind, frame.kind))
    }

    fn report_unknown(&self, entry: &SettingEntry, diagnostics: &mut Vec<Diagnostic>) {
        let Some(severity) = self.options.unknown_settings else {
            return;
        };
        let mut message = format!("{} is unknown.", entry.key);
        if let Some(suggestion) = self.catalog.suggest(&entry.key) {
            message.push_str(&format!(" Did you mean {}?", suggestion.display_name));
        }
        diagnostics.push(Diagnostic::new(
            severity,
            entry.key_range,
            DiagnosticCode::UnknownSetting,
            message,
        ));
    }
}

fn track_control(
    controls: &mut Vec<(Control, Range)>,
    keyword: Control,
    range: Range,
    opens_block: bool,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(opener) = keyword.opener() {
        match controls.iter().rposition(|(c, _)| *c == opener) {
            Some(index) => {
                for (inner, inner_range) in controls.drain(index + 1..) {
                    diagnostics.push(unclosed(inner, inner_range));
                }
                controls.pop();
            }
            None => diagnostics.push(Diagnostic::error(
                range,
                DiagnosticCode::UnmatchedControl,
                format!("{} has no matching {}", keyword.as_str(), opener.as_str()),
            )),
        }
    } else if keyword.is_branch() {
        if !matches!(controls.last(), Some((Control::If, _))) {
            diagnostics.push(Diagnostic::error(
                range,
                DiagnosticCode::UnmatchedControl,
                format!("{} has no matching if", keyword.as_str()),
            ));
        }
    } else if opens_block && keyword.terminator().is_some() {
        controls.push((keyword, range));
    }
}

fn unclosed(keyword: Control, range: Range) -> Diagnostic {
    let terminator = keyword.terminator().map(|t| t.as_str()).unwrap_or("end");
    Diagnostic::error(
        range,
        DiagnosticCode::UnclosedControl,
        format!("{} has no matching {}", keyword.as_str(), terminator),
    )
}

/// Problem with a setting value, if any
pub fn check_value(setting: &Setting, value: &str, ctx: &ValueContext<'_>) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.contains("@{") {
        return None;
    }
    let name = &setting.display_name;

    match setting.value_type {
        ValueType::Boolean => {
            if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
                None
            } else {
                Some(format!("{} must be true or false", name))
            }
        }
        ValueType::Integer | ValueType::Number => {
            let (number, percent) = match value.strip_suffix('%') {
                Some(number) => (number.trim(), true),
                None => (value, false),
            };
            let parsed = if setting.value_type == ValueType::Integer {
                number.parse::<i64>().ok().map(|n| n as f64)
            } else {
                number.parse::<f64>().ok().filter(|n| n.is_finite())
            };
            match parsed {
                None => Some(format!("{} must be {}", name, article(setting.value_type))),
                Some(_) if percent => None,
                Some(n) => check_bounds(setting, n),
            }
        }
        ValueType::Enum => {
            let allowed = setting.resolve_enum(ctx);
            if allowed.is_empty() || allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) {
                None
            } else {
                Some(format!(
                    "{} is not a valid value for {}, expected one of: {}",
                    value,
                    name,
                    allowed.join(", ")
                ))
            }
        }
        ValueType::Interval => {
            if is_interval(value) {
                None
            } else {
                Some(format!(
                    "{} must be an interval such as '1 hour' or 'all'",
                    name
                ))
            }
        }
        ValueType::String | ValueType::Date => None,
    }
}

fn article(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Integer => "an integer",
        _ => "a number",
    }
}

fn check_bounds(setting: &Setting, n: f64) -> Option<String> {
    if let Some(min) = setting.min_value {
        if n < min {
            return Some(format!("{} must be at least {}", setting.display_name, min));
        }
    }
    if let Some(max) = setting.max_value {
        if n > max {
            return Some(format!("{} must be at most {}", setting.display_name, max));
        }
    }
    None
}

/// `<count> <unit>` (plural units allowed) or `all`
pub fn is_interval(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    if lower == "all" {
        return true;
    }
    let split = lower
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(lower.len());
    let (count, unit) = lower.split_at(split);
    if count.is_empty() || count.parse::<f64>().is_err() {
        return false;
    }
    let unit = unit.trim();
    let unit = unit.strip_suffix('s').unwrap_or(unit);
    INTERVAL_UNITS.contains(&unit)
}
