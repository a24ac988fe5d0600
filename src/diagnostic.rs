use crate::utils::constants::DIAGNOSTIC_SOURCE;
use std::fmt;
use std::str::FromStr;
use tower_lsp::lsp_types::{self, DiagnosticSeverity, NumberOrString, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
            Severity::Hint => "hint",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "information" | "info" => Ok(Severity::Information),
            "hint" => Ok(Severity::Hint),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

impl From<Severity> for DiagnosticSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => DiagnosticSeverity::ERROR,
            Severity::Warning => DiagnosticSeverity::WARNING,
            Severity::Information => DiagnosticSeverity::INFORMATION,
            Severity::Hint => DiagnosticSeverity::HINT,
        }
    }
}

/// Machine-readable diagnostic codes, published as kebab-case strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    SectionDepth,
    SectionParent,
    UnknownSection,
    MissingSetting,
    MissingSection,
    MutualExclusion,
    UnknownSetting,
    SettingScope,
    WidgetType,
    InvalidValue,
    DuplicateSetting,
    OutsideSection,
    UnmatchedControl,
    UnclosedControl,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::SectionDepth => "section-depth",
            DiagnosticCode::SectionParent => "section-parent",
            DiagnosticCode::UnknownSection => "unknown-section",
            DiagnosticCode::MissingSetting => "missing-setting",
            DiagnosticCode::MissingSection => "missing-section",
            DiagnosticCode::MutualExclusion => "mutual-exclusion",
            DiagnosticCode::UnknownSetting => "unknown-setting",
            DiagnosticCode::SettingScope => "setting-scope",
            DiagnosticCode::WidgetType => "widget-type",
            DiagnosticCode::InvalidValue => "invalid-value",
            DiagnosticCode::DuplicateSetting => "duplicate-setting",
            DiagnosticCode::OutsideSection => "outside-section",
            DiagnosticCode::UnmatchedControl => "unmatched-control",
            DiagnosticCode::UnclosedControl => "unclosed-control",
        }
    }

    /// Section placed at the wrong depth or under the wrong parent
    pub fn is_structural(&self) -> bool {
        matches!(self, DiagnosticCode::SectionDepth | DiagnosticCode::SectionParent)
    }

    /// A required setting or child section is absent
    pub fn is_missing_requirement(&self) -> bool {
        matches!(self, DiagnosticCode::MissingSetting | DiagnosticCode::MissingSection)
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub range: Range,
    pub message: String,
    pub code: Option<DiagnosticCode>,
}

impl Diagnostic {
    pub fn new(severity: Severity, range: Range, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            range,
            message: message.into(),
            code: Some(code),
        }
    }

    pub fn error(range: Range, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, range, code, message)
    }

    pub fn warning(range: Range, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, range, code, message)
    }
}

impl From<Diagnostic> for lsp_types::Diagnostic {
    fn from(diagnostic: Diagnostic) -> Self {
        lsp_types::Diagnostic {
            range: diagnostic.range,
            severity: Some(diagnostic.severity.into()),
            code: diagnostic
                .code
                .map(|c| NumberOrString::String(c.as_str().to_string())),
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message: diagnostic.message,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::Position;

    #[test]
    fn test_lsp_conversion_carries_code_and_source() {
        let range = Range::new(Position::new(2, 0), Position::new(2, 8));
        let diagnostic = Diagnostic::error(range, DiagnosticCode::MissingSetting, "metric is required");
        let lsp: lsp_types::Diagnostic = diagnostic.into();
        assert_eq!(lsp.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(lsp.source.as_deref(), Some("charts"));
        assert_eq!(
            lsp.code,
            Some(NumberOrString::String("missing-setting".to_string()))
        );
        assert_eq!(lsp.range, range);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("Warning".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("info".parse::<Severity>(), Ok(Severity::Information));
        assert!("loud".parse::<Severity>().is_err());
    }
}
