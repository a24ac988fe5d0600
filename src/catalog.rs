use crate::descriptions::parse_descriptions;
use crate::section::SectionKind;
use crate::utils::logging;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use strsim::normalized_levenshtein;

const DICTIONARY_JSON: &str = include_str!("../data/dictionary.json");
const DESCRIPTIONS_MD: &str = include_str!("../data/descriptions.md");

/// Minimum similarity for "did you mean" suggestions
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// Canonical lookup key for a setting: lower-case alphanumerics only
///
/// # Examples
/// - "alert-expression" → "alertexpression"
/// - "Entity_Group" → "entitygroup"
pub fn canonical_name(display_name: &str) -> String {
    display_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Boolean,
    String,
    Integer,
    Number,
    Enum,
    Interval,
    Date,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::Enum => "enum",
            ValueType::Interval => "interval",
            ValueType::Date => "date",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(ValueType::Boolean),
            "string" => Ok(ValueType::String),
            "integer" => Ok(ValueType::Integer),
            "number" => Ok(ValueType::Number),
            "enum" => Ok(ValueType::Enum),
            "interval" => Ok(ValueType::Interval),
            "date" => Ok(ValueType::Date),
            other => Err(format!("unknown value type '{}'", other)),
        }
    }
}

/// Ambient facts an override predicate is evaluated against
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueContext<'a> {
    pub widget_type: Option<&'a str>,
    pub section: Option<SectionKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideSubject {
    Widget,
    Section,
}

/// Disjunction of `subject == 'value'` comparisons, e.g. `[widget == 'console' || widget == 'property']`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideCondition {
    alternatives: Vec<(OverrideSubject, String)>,
}

impl OverrideCondition {
    pub fn parse(predicate: &str) -> Option<Self> {
        let inner = predicate
            .trim()
            .strip_prefix('[')?
            .strip_suffix(']')?;

        let mut alternatives = Vec::new();
        for clause in inner.split("||") {
            let (subject, value) = clause.split_once("==")?;
            let subject = match subject.trim() {
                "widget" => OverrideSubject::Widget,
                "section" => OverrideSubject::Section,
                _ => return None,
            };
            let value = value.trim();
            let value = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))?;
            alternatives.push((subject, value.to_lowercase()));
        }

        if alternatives.is_empty() {
            None
        } else {
            Some(OverrideCondition { alternatives })
        }
    }

    pub fn matches(&self, ctx: &ValueContext<'_>) -> bool {
        self.alternatives.iter().any(|(subject, expected)| match subject {
            OverrideSubject::Widget => ctx
                .widget_type
                .is_some_and(|w| w.eq_ignore_ascii_case(expected)),
            OverrideSubject::Section => ctx.section.is_some_and(|s| s.as_str() == expected),
        })
    }
}

/// Replacement enum list applied when its condition holds
#[derive(Debug, Clone)]
pub struct EnumOverride {
    pub condition: OverrideCondition,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PossibleValue {
    pub value: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptField {
    pub name: String,
    pub kind: String,
    pub arity: usize,
    pub required_args: usize,
}

/// Signature of a setting whose value is a script expression.
/// Carried as documentation only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSignature {
    pub return_type: String,
    pub fields: Vec<ScriptField>,
}

#[derive(Debug, Clone)]
pub struct Setting {
    pub name: String,
    pub display_name: String,
    pub value_type: ValueType,
    pub allowed_sections: Vec<SectionKind>,
    pub allowed_widget_types: Vec<String>,
    pub enum_values: Vec<String>,
    pub overrides: Vec<EnumOverride>,
    pub possible_values: Vec<PossibleValue>,
    pub excludes: Vec<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub default_value: Option<String>,
    pub example: String,
    pub description: Option<String>,
    pub multi_line: bool,
    pub script: Option<ScriptSignature>,
}

impl Setting {
    /// True when the setting has no section restriction or lists `kind`
    pub fn is_allowed_in(&self, kind: SectionKind) -> bool {
        self.allowed_sections.is_empty() || self.allowed_sections.contains(&kind)
    }

    /// True when the setting has no widget restriction or lists `widget_type`
    pub fn applies_to_widget(&self, widget_type: &str) -> bool {
        self.allowed_widget_types.is_empty()
            || self
                .allowed_widget_types
                .iter()
                .any(|w| w.eq_ignore_ascii_case(widget_type))
    }

    /// Enum values after applying override rules; the first matching rule wins
    pub fn resolve_enum(&self, ctx: &ValueContext<'_>) -> &[String] {
        self.overrides
            .iter()
            .find(|o| o.condition.matches(ctx))
            .map(|o| o.values.as_slice())
            .unwrap_or(&self.enum_values)
    }

    /// True when this setting must not appear together with `other` (canonical name)
    pub fn excludes(&self, other: &str) -> bool {
        self.excludes.iter().any(|e| e == other)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Deserialize)]
struct RawPossibleValue {
    value: String,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Deserialize)]
struct RawScriptArg {
    #[serde(default)]
    required: bool,
}

#[derive(Deserialize)]
struct RawScriptField {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    args: Vec<RawScriptArg>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScript {
    #[serde(default)]
    return_value: Option<String>,
    #[serde(default)]
    fields: Vec<RawScriptField>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSetting {
    display_name: Option<String>,
    #[serde(rename = "type")]
    value_type: Option<String>,
    section: Option<OneOrMany>,
    widget: Option<OneOrMany>,
    example: Option<Value>,
    default_value: Option<Value>,
    #[serde(rename = "enum")]
    enum_values: Option<Vec<String>>,
    possible_values: Option<Vec<RawPossibleValue>>,
    excludes: Option<Vec<String>>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    multi_line: Option<bool>,
    #[serde(rename = "override")]
    overrides: Option<serde_json::Map<String, Value>>,
    script: Option<RawScript>,
}

#[derive(Deserialize)]
struct RawDictionary {
    settings: Vec<Value>,
}

/// Render a JSON scalar the way it would be written in a document
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl RawSetting {
    /// Validate a raw definition, returning the reason it was rejected on failure
    fn into_setting(self, descriptions: &HashMap<String, String>) -> Result<Setting, String> {
        let display_name = self.display_name.ok_or("missing displayName")?;
        let value_type = self
            .value_type
            .ok_or("missing type")?
            .parse::<ValueType>()?;
        let example = self.example.as_ref().map(value_to_text).ok_or("missing example")?;

        let allowed_sections = self
            .section
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .iter()
            .map(|s| s.parse::<SectionKind>())
            .collect::<Result<Vec<_>, _>>()?;

        let mut overrides = Vec::new();
        for (predicate, body) in self.overrides.unwrap_or_default() {
            let condition = OverrideCondition::parse(&predicate)
                .ok_or_else(|| format!("unparsable override predicate {}", predicate))?;
            let values = body
                .get("enum")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().map(value_to_text).collect())
                .ok_or_else(|| format!("override {} has no enum list", predicate))?;
            overrides.push(EnumOverride { condition, values });
        }

        let script = self.script.map(|raw| ScriptSignature {
            return_type: raw.return_value.unwrap_or_else(|| "string".to_string()),
            fields: raw
                .fields
                .into_iter()
                .map(|f| ScriptField {
                    required_args: f.args.iter().filter(|a| a.required).count(),
                    arity: f.args.len(),
                    name: f.name,
                    kind: f.kind,
                })
                .collect(),
        });

        let name = canonical_name(&display_name);
        Ok(Setting {
            description: descriptions.get(&name).cloned(),
            name,
            display_name,
            value_type,
            allowed_sections,
            allowed_widget_types: self.widget.map(OneOrMany::into_vec).unwrap_or_default(),
            enum_values: self.enum_values.unwrap_or_default(),
            overrides,
            possible_values: self
                .possible_values
                .unwrap_or_default()
                .into_iter()
                .map(|p| PossibleValue {
                    value: p.value,
                    detail: p.detail,
                })
                .collect(),
            excludes: self
                .excludes
                .unwrap_or_default()
                .iter()
                .map(|e| canonical_name(e))
                .collect(),
            min_value: self.min_value,
            max_value: self.max_value,
            default_value: self.default_value.as_ref().map(value_to_text),
            example,
            multi_line: self.multi_line.unwrap_or(false),
            script,
        })
    }
}

/// Immutable table of known settings keyed by canonical name
#[derive(Debug, Clone)]
pub struct SettingCatalog {
    settings: HashMap<String, Setting>,
    /// Canonical names ordered by display name
    ordered: Vec<String>,
}

impl SettingCatalog {
    /// Catalog built from the embedded dictionary and descriptions
    pub fn builtin() -> Result<Self> {
        Self::from_sources(DICTIONARY_JSON, DESCRIPTIONS_MD)
    }

    /// Build a catalog from a JSON settings dictionary and a Markdown description document
    ///
    /// A malformed dictionary is an error. Individual incomplete or invalid
    /// definitions are excluded and logged.
    pub fn from_sources(dictionary_json: &str, descriptions_md: &str) -> Result<Self> {
        let dictionary: RawDictionary =
            serde_json::from_str(dictionary_json).context("Failed to parse settings dictionary")?;
        let descriptions = parse_descriptions(descriptions_md);
        Ok(Self::from_definitions(dictionary.settings, &descriptions))
    }

    fn from_definitions(definitions: Vec<Value>, descriptions: &HashMap<String, String>) -> Self {
        let mut settings = HashMap::new();

        for (index, definition) in definitions.into_iter().enumerate() {
            let label = definition
                .get("displayName")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", index));

            let parsed = serde_json::from_value::<RawSetting>(definition)
                .map_err(|e| e.to_string())
                .and_then(|raw| raw.into_setting(descriptions));

            match parsed {
                Ok(setting) => {
                    if settings.contains_key(&setting.name) {
                        logging::log_catalog_duplicate(&setting.display_name);
                    }
                    settings.insert(setting.name.clone(), setting);
                }
                Err(reason) => logging::log_catalog_excluded(&label, &reason),
            }
        }

        let mut ordered: Vec<String> = settings.keys().cloned().collect();
        ordered.sort_by(|a, b| settings[a].display_name.cmp(&settings[b].display_name));

        logging::log_catalog_built(ordered.len());
        SettingCatalog { settings, ordered }
    }

    /// Look up a setting by display or canonical name
    pub fn lookup(&self, name: &str) -> Option<&Setting> {
        self.settings.get(&canonical_name(name))
    }

    /// All settings ordered by display name
    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.ordered.iter().filter_map(|name| self.settings.get(name))
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Settings legal in `kind`: unrestricted ones plus those listing it
    pub fn settings_for_section(&self, kind: SectionKind) -> Vec<&Setting> {
        self.iter().filter(|s| s.is_allowed_in(kind)).collect()
    }

    /// Settings applicable to a widget type: unrestricted ones plus those listing it
    pub fn settings_for_widget_type(&self, widget_type: &str) -> Vec<&Setting> {
        self.iter().filter(|s| s.applies_to_widget(widget_type)).collect()
    }

    /// Closest known setting to an unknown name, if any is similar enough
    pub fn suggest(&self, name: &str) -> Option<&Setting> {
        let wanted = canonical_name(name);
        if wanted.is_empty() {
            return None;
        }
        self.iter()
            .map(|s| (normalized_levenshtein(&wanted, &s.name), s))
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, s)| s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_from(json: &str) -> SettingCatalog {
        SettingCatalog::from_sources(json, "## entity\n\nEntity name.\n").unwrap()
    }

    #[test]
    fn test_canonical_name_strips_separators() {
        assert_eq!(canonical_name("alert-expression"), "alertexpression");
        assert_eq!(canonical_name("Entity_Group"), "entitygroup");
        assert_eq!(canonical_name("percentile_90"), "percentile90");
    }

    #[test]
    fn test_incomplete_definitions_are_excluded() {
        let catalog = catalog_from(
            r#"{"settings": [
                {"displayName": "entity", "type": "string", "section": "series", "example": "srv1"},
                {"displayName": "no-example", "type": "string"},
                {"displayName": "no-type", "example": "x"},
                {"type": "string", "example": "x"},
                {"displayName": "bad-type", "type": "color", "example": "red"},
                {"displayName": "bad-section", "type": "string", "section": "nowhere", "example": "x"}
            ]}"#,
        );
        assert_eq!(catalog.len(), 1);
        let entity = catalog.lookup("entity").unwrap();
        assert_eq!(entity.description.as_deref(), Some("Entity name."));
        assert_eq!(entity.allowed_sections, vec![SectionKind::Series]);
        assert!(catalog.lookup("no-example").is_none());
    }

    #[test]
    fn test_malformed_dictionary_is_an_error() {
        assert!(SettingCatalog::from_sources("{not json", "").is_err());
    }

    #[test]
    fn test_lookup_accepts_any_spelling() {
        let catalog = SettingCatalog::builtin().unwrap();
        let a = catalog.lookup("entity-expression").unwrap();
        let b = catalog.lookup("entityexpression").unwrap();
        let c = catalog.lookup("Entity_Expression").unwrap();
        assert_eq!(a.name, b.name);
        assert_eq!(b.name, c.name);
        assert_eq!(a.display_name, "entity-expression");
    }

    #[test]
    fn test_first_matching_override_wins() {
        let catalog = catalog_from(
            r#"{"settings": [{
                "displayName": "class", "type": "enum", "example": "terminal",
                "enum": ["terminal", "metro"],
                "override": {
                    "[widget == 'console' || widget == 'property']": {"enum": ["terminal"]},
                    "[section == 'widget']": {"enum": ["metro"]}
                }
            }]}"#,
        );
        let class = catalog.lookup("class").unwrap();

        let console = ValueContext {
            widget_type: Some("console"),
            section: Some(SectionKind::Widget),
        };
        assert_eq!(class.resolve_enum(&console), ["terminal".to_string()]);

        let chart = ValueContext {
            widget_type: Some("chart"),
            section: Some(SectionKind::Widget),
        };
        assert_eq!(class.resolve_enum(&chart), ["metro".to_string()]);

        let none = ValueContext::default();
        assert_eq!(class.resolve_enum(&none).len(), 2);
    }

    #[test]
    fn test_unparsable_override_excludes_setting() {
        let catalog = catalog_from(
            r#"{"settings": [{
                "displayName": "class", "type": "enum", "example": "terminal",
                "enum": ["terminal"],
                "override": {"widget = console": {"enum": ["terminal"]}}
            }]}"#,
        );
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_override_condition_parse() {
        assert!(OverrideCondition::parse("[widget == 'chart']").is_some());
        assert!(OverrideCondition::parse("[section == \"configuration\"]").is_some());
        assert!(OverrideCondition::parse("widget == 'chart'").is_none());
        assert!(OverrideCondition::parse("[colour == 'red']").is_none());
    }

    #[test]
    fn test_excludes_are_canonical() {
        let catalog = SettingCatalog::builtin().unwrap();
        let colors = catalog.lookup("colors").unwrap();
        assert!(colors.excludes("colorrange"));
        assert!(colors.excludes("color"));
    }

    #[test]
    fn test_section_and_widget_filters() {
        let catalog = SettingCatalog::builtin().unwrap();
        let series: Vec<_> = catalog
            .settings_for_section(SectionKind::Series)
            .iter()
            .map(|s| s.display_name.clone())
            .collect();
        assert!(series.contains(&"metric".to_string()));
        assert!(series.contains(&"author".to_string()));
        assert!(!series.contains(&"type".to_string()));

        let gauge: Vec<_> = catalog
            .settings_for_widget_type("gauge")
            .iter()
            .map(|s| s.display_name.clone())
            .collect();
        assert!(gauge.contains(&"arrow-length".to_string()));
        assert!(!gauge.contains(&"bar-count".to_string()));
    }

    #[test]
    fn test_script_signature_is_kept() {
        let catalog = SettingCatalog::builtin().unwrap();
        let script = catalog.lookup("alert-expression").unwrap().script.as_ref().unwrap();
        assert_eq!(script.return_type, "boolean");
        let movavg = script.fields.iter().find(|f| f.name == "movavg").unwrap();
        assert_eq!(movavg.arity, 3);
        assert_eq!(movavg.required_args, 2);
    }

    #[test]
    fn test_suggest_close_names() {
        let catalog = SettingCatalog::builtin().unwrap();
        assert_eq!(catalog.suggest("metrc").map(|s| s.name.as_str()), Some("metric"));
        assert!(catalog.suggest("zzzzzz").is_none());
    }
}
