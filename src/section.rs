use std::fmt;
use std::str::FromStr;

/// Kinds of bracketed sections known to the charts language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    Configuration,
    Group,
    Widget,
    Series,
    Column,
    Dropdown,
    Keys,
    Link,
    Node,
    Option,
    Other,
    Placeholders,
    Properties,
    Property,
    Tag,
    Tags,
    Threshold,
}

impl SectionKind {
    pub const ALL: [SectionKind; 17] = [
        SectionKind::Configuration,
        SectionKind::Group,
        SectionKind::Widget,
        SectionKind::Series,
        SectionKind::Column,
        SectionKind::Dropdown,
        SectionKind::Keys,
        SectionKind::Link,
        SectionKind::Node,
        SectionKind::Option,
        SectionKind::Other,
        SectionKind::Placeholders,
        SectionKind::Properties,
        SectionKind::Property,
        SectionKind::Tag,
        SectionKind::Tags,
        SectionKind::Threshold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Configuration => "configuration",
            SectionKind::Group => "group",
            SectionKind::Widget => "widget",
            SectionKind::Series => "series",
            SectionKind::Column => "column",
            SectionKind::Dropdown => "dropdown",
            SectionKind::Keys => "keys",
            SectionKind::Link => "link",
            SectionKind::Node => "node",
            SectionKind::Option => "option",
            SectionKind::Other => "other",
            SectionKind::Placeholders => "placeholders",
            SectionKind::Properties => "properties",
            SectionKind::Property => "property",
            SectionKind::Tag => "tag",
            SectionKind::Tags => "tags",
            SectionKind::Threshold => "threshold",
        }
    }

    /// Sections whose entries are arbitrary `key = value` pairs rather than catalog settings
    pub fn is_free_form(&self) -> bool {
        matches!(
            self,
            SectionKind::Tags | SectionKind::Keys | SectionKind::Placeholders
        )
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        SectionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| format!("unknown section '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Series".parse::<SectionKind>(), Ok(SectionKind::Series));
        assert_eq!(" tags ".parse::<SectionKind>(), Ok(SectionKind::Tags));
        assert!("foo".parse::<SectionKind>().is_err());
    }

    #[test]
    fn test_display_round_trips_every_kind() {
        for kind in SectionKind::ALL {
            assert_eq!(kind.to_string().parse::<SectionKind>(), Ok(kind));
        }
    }
}
