/// Completion trigger characters: section headers, values and the space after `=`
pub const COMPLETION_TRIGGERS: &[&str] = &["[", "=", " "];

/// Language identifier sent by editors for charts documents
pub const LANGUAGE_ID: &str = "axibasecharts";

/// File extensions treated as charts documents by `--check` on directories
pub const CHARTS_EXTENSIONS: &[&str] = &["config", "charts"];

/// `source` attached to every published diagnostic
pub const DIAGNOSTIC_SOURCE: &str = "charts";

/// Control-structure snippets offered after settings: (label, snippet body)
pub const CONTROL_SNIPPETS: &[(&str, &str)] = &[
    ("csv", "csv ${1:name} =\n\t${2:header1}, ${3:header2}\n\t${4:value1}, ${5:value2}\nendcsv"),
    ("for", "for ${1:item} in ${2:collection}\n\t$0\nendfor"),
    ("if", "if ${1:condition}\n\t$0\nendif"),
    ("list", "list ${1:name} = ${2:value1}, ${3:value2}"),
    ("script", "script\n\t$0\nendscript"),
    ("var", "var ${1:name} = ${2:value}"),
];

/// Hover text for a section header with no requirements
pub const NO_REQUIREMENTS: &str = "No required settings or child sections.";

/// Prefix of the `--settings` error for a section name that does not exist
pub const ERROR_UNKNOWN_SECTION: &str = "Unknown section";
