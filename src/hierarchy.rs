use crate::catalog::SettingCatalog;
use crate::section::SectionKind;
use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet, VecDeque};

use SectionKind::*;

const DEPTHS: &[(SectionKind, usize)] = &[
    (Configuration, 0),
    (Group, 1),
    (Widget, 2),
    (Column, 3),
    (Dropdown, 3),
    (Keys, 3),
    (Link, 3),
    (Node, 3),
    (Other, 3),
    (Placeholders, 3),
    (Property, 3),
    (Series, 3),
    (Threshold, 3),
    (Option, 4),
    (Properties, 4),
    (Tag, 4),
    (Tags, 4),
];

const PARENTS: &[(SectionKind, &[SectionKind])] = &[
    (Group, &[Configuration]),
    (Widget, &[Group, Configuration]),
    (Series, &[Widget, Link]),
    (Column, &[Widget]),
    (Dropdown, &[Widget]),
    (Link, &[Widget]),
    (Node, &[Widget]),
    (Other, &[Widget]),
    (Placeholders, &[Widget]),
    (Property, &[Widget]),
    (Threshold, &[Widget]),
    (Keys, &[Widget, Group, Configuration]),
    (Option, &[Dropdown]),
    (Properties, &[Property]),
    (Tag, &[Series]),
    (Tags, &[Series, Widget, Group, Configuration]),
];

/// Kinds accepted at any depth from 1 up to their table depth
const REPEATABLE: &[SectionKind] = &[Keys, Tags];

type SettingGroups = &'static [&'static [&'static str]];
type SectionGroups = &'static [&'static [SectionKind]];

const SECTION_REQUIREMENTS: &[(SectionKind, SettingGroups, SectionGroups)] = &[
    (Configuration, &[], &[&[Group]]),
    (Group, &[], &[&[Widget]]),
    (Widget, &[&["type"]], &[&[Series]]),
    (
        Series,
        &[
            &["entity", "value", "entities", "entity-group", "entity-expression"],
            &["metric", "value", "table", "attribute"],
        ],
        &[],
    ),
    (Dropdown, &[&["on-change", "change-field"]], &[]),
    (Node, &[&["id"]], &[]),
];

/// Widget rules refined by the widget's `type`
const WIDGET_REQUIREMENTS: &[(&str, SettingGroups, SectionGroups)] = &[
    ("console", &[&["type"]], &[]),
    ("page", &[&["type"]], &[]),
    ("property", &[&["type"]], &[&[Property]]),
    ("graph", &[&["type"]], &[&[Series, Node, Link]]),
];

/// Plain-data form of the hierarchy, resolved against a catalog by [`SectionHierarchy::from_tables`]
#[derive(Debug, Clone)]
pub struct HierarchyTables {
    pub depths: Vec<(SectionKind, usize)>,
    pub parents: Vec<(SectionKind, Vec<SectionKind>)>,
    pub repeatable: Vec<SectionKind>,
    pub section_requirements: Vec<(SectionKind, Vec<Vec<String>>, Vec<Vec<SectionKind>>)>,
    pub widget_requirements: Vec<(String, Vec<Vec<String>>, Vec<Vec<SectionKind>>)>,
}

fn owned_groups(groups: SettingGroups) -> Vec<Vec<String>> {
    groups
        .iter()
        .map(|g| g.iter().map(|s| s.to_string()).collect())
        .collect()
}

fn owned_sections(groups: SectionGroups) -> Vec<Vec<SectionKind>> {
    groups.iter().map(|g| g.to_vec()).collect()
}

impl HierarchyTables {
    pub fn builtin() -> Self {
        HierarchyTables {
            depths: DEPTHS.to_vec(),
            parents: PARENTS.iter().map(|(k, p)| (*k, p.to_vec())).collect(),
            repeatable: REPEATABLE.to_vec(),
            section_requirements: SECTION_REQUIREMENTS
                .iter()
                .map(|(k, s, c)| (*k, owned_groups(s), owned_sections(c)))
                .collect(),
            widget_requirements: WIDGET_REQUIREMENTS
                .iter()
                .map(|(w, s, c)| (w.to_string(), owned_groups(s), owned_sections(c)))
                .collect(),
        }
    }
}

/// Requirements attached to a section kind.
///
/// Each inner list is an alias group: one member satisfies the whole group,
/// and the first member is the one named when none is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementRule {
    /// Canonical setting names
    pub settings: Vec<Vec<String>>,
    pub sections: Vec<Vec<SectionKind>>,
}

/// How sections nest and what each section instance must contain
#[derive(Debug, Clone)]
pub struct SectionHierarchy {
    depths: HashMap<SectionKind, usize>,
    parents: HashMap<SectionKind, Vec<SectionKind>>,
    repeatable: HashSet<SectionKind>,
    requirements: HashMap<SectionKind, RequirementRule>,
    widget_requirements: HashMap<String, RequirementRule>,
    no_requirements: RequirementRule,
}

impl SectionHierarchy {
    /// Built-in hierarchy, with requirement names resolved against `catalog`
    pub fn builtin(catalog: &SettingCatalog) -> Result<Self> {
        Self::from_tables(HierarchyTables::builtin(), catalog)
    }

    /// Resolve `tables` against `catalog`.
    ///
    /// Fails when a requirement names a setting the catalog does not define,
    /// when a kind has no depth, or when the parent graph has a cycle.
    pub fn from_tables(tables: HierarchyTables, catalog: &SettingCatalog) -> Result<Self> {
        let depths: HashMap<_, _> = tables.depths.into_iter().collect();
        for kind in SectionKind::ALL {
            if !depths.contains_key(&kind) {
                bail!("Section [{}] has no depth", kind);
            }
        }

        let parents: HashMap<_, _> = tables.parents.into_iter().collect();
        check_acyclic(&parents)?;

        let resolve = |owner: &str, groups: Vec<Vec<String>>| -> Result<Vec<Vec<String>>> {
            let mut resolved = Vec::with_capacity(groups.len());
            for group in groups {
                let mut names = Vec::with_capacity(group.len());
                for member in group {
                    match catalog.lookup(&member) {
                        Some(setting) => names.push(setting.name.clone()),
                        None => bail!(
                            "Requirement for {} references unknown setting '{}'",
                            owner,
                            member
                        ),
                    }
                }
                if !names.is_empty() {
                    resolved.push(names);
                }
            }
            Ok(resolved)
        };

        let mut requirements = HashMap::new();
        for (kind, settings, sections) in tables.section_requirements {
            let rule = RequirementRule {
                settings: resolve(&format!("[{}]", kind), settings)?,
                sections: sections.into_iter().filter(|g| !g.is_empty()).collect(),
            };
            requirements.insert(kind, rule);
        }

        let mut widget_requirements = HashMap::new();
        for (widget_type, settings, sections) in tables.widget_requirements {
            let rule = RequirementRule {
                settings: resolve(&format!("widget type '{}'", widget_type), settings)?,
                sections: sections.into_iter().filter(|g| !g.is_empty()).collect(),
            };
            widget_requirements.insert(widget_type.to_lowercase(), rule);
        }

        Ok(SectionHierarchy {
            depths,
            parents,
            repeatable: tables.repeatable.into_iter().collect(),
            requirements,
            widget_requirements,
            no_requirements: RequirementRule::default(),
        })
    }

    /// Direct parents in declaration order
    pub fn parents_of(&self, kind: SectionKind) -> &[SectionKind] {
        self.parents.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Transitive parents, nearest first, without duplicates
    pub fn all_ancestors(&self, kind: SectionKind) -> Vec<SectionKind> {
        let mut ancestors = Vec::new();
        let mut visited = HashSet::from([kind]);
        let mut queue: VecDeque<SectionKind> = self.parents_of(kind).iter().copied().collect();

        while let Some(next) = queue.pop_front() {
            if !visited.insert(next) {
                continue;
            }
            ancestors.push(next);
            queue.extend(self.parents_of(next).iter().copied());
        }

        ancestors
    }

    pub fn is_nested_under(&self, child: SectionKind, ancestor: SectionKind) -> bool {
        self.all_ancestors(child).contains(&ancestor)
    }

    /// Kinds that can appear somewhere below `kind`
    pub fn descendants(&self, kind: SectionKind) -> Vec<SectionKind> {
        SectionKind::ALL
            .iter()
            .copied()
            .filter(|k| self.is_nested_under(*k, kind))
            .collect()
    }

    /// Kinds that may be opened directly inside `kind`
    pub fn children_of(&self, kind: SectionKind) -> Vec<SectionKind> {
        SectionKind::ALL
            .iter()
            .copied()
            .filter(|k| self.parents_of(*k).contains(&kind))
            .collect()
    }

    /// Depth from the depth table
    pub fn depth_of(&self, kind: SectionKind) -> usize {
        self.depths.get(&kind).copied().unwrap_or(0)
    }

    pub fn is_repeatable(&self, kind: SectionKind) -> bool {
        self.repeatable.contains(&kind)
    }

    /// Deepest level a kind may be opened at
    pub fn max_depth(&self, kind: SectionKind) -> usize {
        self.depth_of(kind)
    }

    /// Whether `kind` may be opened with `depth` sections already open, where
    /// `parent` is the kind and depth of the frame it would be nested in.
    ///
    /// Any kind opened directly below an allowed parent frame is accepted.
    /// Otherwise repeatable kinds accept `1..=max_depth`, kinds without parents
    /// are only valid at depth 0, and other kinds accept their table depth or
    /// the table depth directly below one of their parents.
    pub fn accepts_depth(
        &self,
        kind: SectionKind,
        depth: usize,
        parent: std::option::Option<(SectionKind, usize)>,
    ) -> bool {
        let parents = self.parents_of(kind);
        let under_parent =
            parent.is_some_and(|(p, parent_depth)| parents.contains(&p) && parent_depth + 1 == depth);
        if under_parent {
            return true;
        }
        if self.is_repeatable(kind) {
            return (1..=self.max_depth(kind)).contains(&depth);
        }
        if parents.is_empty() {
            return depth == 0;
        }
        depth == self.depth_of(kind) || parents.iter().any(|p| self.depth_of(*p) + 1 == depth)
    }

    /// Requirement rule for a section, refined by widget type for `[widget]`
    pub fn requirements_for(
        &self,
        kind: SectionKind,
        widget_type: std::option::Option<&str>,
    ) -> &RequirementRule {
        if kind == Widget {
            if let Some(rule) = widget_type.and_then(|w| self.widget_requirements.get(&w.to_lowercase())) {
                return rule;
            }
        }
        self.requirements.get(&kind).unwrap_or(&self.no_requirements)
    }
}

/// Reject parent tables containing a cycle (Kahn's algorithm)
fn check_acyclic(parents: &HashMap<SectionKind, Vec<SectionKind>>) -> Result<()> {
    let mut pending: HashMap<SectionKind, usize> = SectionKind::ALL
        .iter()
        .map(|k| (*k, parents.get(k).map_or(0, Vec::len)))
        .collect();
    let mut ready: Vec<SectionKind> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(k, _)| *k)
        .collect();
    let mut resolved = 0;

    while let Some(kind) = ready.pop() {
        resolved += 1;
        for (child, child_parents) in parents {
            let occurrences = child_parents.iter().filter(|p| **p == kind).count();
            if occurrences == 0 {
                continue;
            }
            if let Some(count) = pending.get_mut(child) {
                *count -= occurrences;
                if *count == 0 {
                    ready.push(*child);
                }
            }
        }
    }

    if resolved < SectionKind::ALL.len() {
        let mut cyclic: Vec<_> = pending
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(k, _)| k.as_str())
            .collect();
        cyclic.sort();
        bail!("Section parent graph has a cycle through: {}", cyclic.join(", "));
    }
    Ok(())
}
