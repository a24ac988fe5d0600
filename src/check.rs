use crate::catalog::SettingCatalog;
use crate::diagnostic::{Diagnostic, Severity};
use crate::section::SectionKind;
use crate::service::LanguageService;
use crate::utils::constants::ERROR_UNKNOWN_SECTION;
use crate::utils::uri_helpers::has_charts_extension;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Validation outcome for one file given to `--check`
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
    /// Set when the file could not be read
    pub read_error: Option<String>,
}

impl FileReport {
    pub fn has_errors(&self) -> bool {
        self.read_error.is_some()
            || self
                .diagnostics
                .iter()
                .any(|d| d.severity == Severity::Error)
    }

    /// `file:line:col: severity: message [code]`, one entry per diagnostic
    pub fn lines(&self) -> Vec<String> {
        let file = self.path.display();
        if let Some(error) = &self.read_error {
            return vec![format!("{}: error: {}", file, error)];
        }
        self.diagnostics
            .iter()
            .map(|d| {
                let mut line = format!(
                    "{}:{}:{}: {}: {}",
                    file,
                    d.range.start.line + 1,
                    d.range.start.character + 1,
                    d.severity,
                    d.message
                );
                if let Some(code) = d.code {
                    line.push_str(&format!(" [{}]", code.as_str()));
                }
                line
            })
            .collect()
    }
}

/// Expand directories (recursively) into the charts documents they contain
pub fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            collect_dir(path, &mut files);
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn collect_dir(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();
    for path in paths {
        if path.is_dir() {
            collect_dir(&path, files);
        } else if has_charts_extension(&path) {
            files.push(path);
        }
    }
}

/// Validate every file in parallel; reports keep the order of `files`
pub fn check_files(service: &LanguageService, files: &[PathBuf]) -> Vec<FileReport> {
    files
        .par_iter()
        .map(|path| match std::fs::read_to_string(path) {
            Ok(text) => FileReport {
                path: path.clone(),
                diagnostics: service.validate_text(&text),
                read_error: None,
            },
            Err(e) => FileReport {
                path: path.clone(),
                diagnostics: Vec::new(),
                read_error: Some(e.to_string()),
            },
        })
        .collect()
}

/// `--check`: print diagnostics for the given files and directories
///
/// Returns true when any file has an error-level diagnostic.
pub fn run_check(service: &LanguageService, paths: &[PathBuf]) -> bool {
    let files = collect_files(paths);
    if files.is_empty() {
        eprintln!("No charts documents found");
        return false;
    }

    let reports = check_files(service, &files);
    let mut failed = false;
    let mut total = 0;
    for report in &reports {
        for line in report.lines() {
            println!("{}", line);
        }
        total += report.diagnostics.len();
        failed |= report.has_errors();
    }
    eprintln!("Checked {} file(s), {} diagnostic(s)", reports.len(), total);
    failed
}

/// Rows for `--settings [section]`, ordered by display name
pub fn settings_listing(catalog: &SettingCatalog, section: Option<&str>) -> Result<Vec<String>, String> {
    let settings = match section {
        Some(name) => {
            let kind = name.parse::<SectionKind>().map_err(|_| {
                let known: Vec<&str> = SectionKind::ALL.iter().map(|k| k.as_str()).collect();
                format!(
                    "{} '{}'. Known sections: {}",
                    ERROR_UNKNOWN_SECTION,
                    name,
                    known.join(", ")
                )
            })?;
            catalog.settings_for_section(kind)
        }
        None => catalog.iter().collect(),
    };

    Ok(settings
        .into_iter()
        .map(|s| {
            let mut row = format!("{:<32} {}", s.display_name, s.value_type);
            if !s.allowed_widget_types.is_empty() {
                row.push_str(&format!(" ({})", s.allowed_widget_types.join(", ")));
            }
            row
        })
        .collect())
}

/// `--settings`: print the listing, or the error for an unknown section
pub fn list_settings(catalog: &SettingCatalog, section: Option<&str>) -> bool {
    match settings_listing(catalog, section) {
        Ok(rows) => {
            match section {
                Some(name) => println!("Settings allowed in [{}]:\n", name.trim().to_lowercase()),
                None => println!("Settings:\n"),
            }
            for row in rows {
                println!("  {}", row);
            }
            true
        }
        Err(message) => {
            eprintln!("{}", message);
            false
        }
    }
}
