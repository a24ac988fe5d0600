use crate::catalog::canonical_name;
use crate::hierarchy::SectionHierarchy;
use crate::section::SectionKind;
use crate::utils::logging;
use tower_lsp::lsp_types::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct SettingEntry {
    /// Canonical name
    pub name: String,
    /// Key as written
    pub key: String,
    pub value: String,
    pub key_range: Range,
    pub value_range: Range,
    /// Declared inside a `for`/`if` block
    pub in_control: bool,
}

impl SettingEntry {
    pub fn new(key: &str, value: &str, key_range: Range, value_range: Range) -> Self {
        SettingEntry {
            name: canonical_name(key),
            key: key.to_string(),
            value: value.to_string(),
            key_range,
            value_range,
            in_control: false,
        }
    }
}

/// One open section instance
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: SectionKind,
    /// Number of frames open below this one
    pub depth: usize,
    /// Range of the section name inside its header
    pub header: Range,
    pub settings: Vec<SettingEntry>,
    pub children: Vec<SectionKind>,
}

impl Frame {
    pub fn new(kind: SectionKind, depth: usize, header: Range) -> Self {
        Frame {
            kind,
            depth,
            header,
            settings: Vec::new(),
            children: Vec::new(),
        }
    }

    /// First declaration of a setting by canonical name
    pub fn setting(&self, name: &str) -> Option<&SettingEntry> {
        self.settings.iter().find(|s| s.name == name)
    }

    pub fn has_setting(&self, name: &str) -> bool {
        self.setting(name).is_some()
    }
}

/// Widget type in effect for a frame: its own `type`, else the nearest ancestor's
pub fn widget_type<'f>(frame: Option<&'f Frame>, ancestors: &'f [Frame]) -> Option<&'f str> {
    frame
        .into_iter()
        .chain(ancestors.iter().rev())
        .find_map(|f| f.setting("type"))
        .map(|s| s.value.as_str())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    Depth {
        kind: SectionKind,
        depth: usize,
        expected: usize,
    },
    Parent {
        kind: SectionKind,
        found: Option<SectionKind>,
        allowed: Vec<SectionKind>,
    },
}

impl StructuralError {
    pub fn message(&self) -> String {
        match self {
            StructuralError::Depth {
                kind,
                depth,
                expected,
            } => format!(
                "[{}] is opened at depth {}, expected depth {}",
                kind, depth, expected
            ),
            StructuralError::Parent {
                kind,
                found,
                allowed,
            } => {
                let allowed = allowed
                    .iter()
                    .map(|k| format!("[{}]", k))
                    .collect::<Vec<_>>()
                    .join(" or ");
                match found {
                    Some(parent) => format!(
                        "[{}] can not be nested in [{}], expected {}",
                        kind, parent, allowed
                    ),
                    None if allowed.is_empty() => format!("[{}] must be the outermost section", kind),
                    None => format!("[{}] must be nested in {}", kind, allowed),
                }
            }
        }
    }
}

/// Rebuilds the open-section stack from headers. Each header closes frames
/// until it sits under an allowed parent; misplaced sections are reported and
/// pushed anyway.
pub struct NestingResolver<'h> {
    hierarchy: &'h SectionHierarchy,
    stack: Vec<Frame>,
}

impl<'h> NestingResolver<'h> {
    pub fn new(hierarchy: &'h SectionHierarchy) -> Self {
        NestingResolver {
            hierarchy,
            stack: Vec::new(),
        }
    }

    /// Open frames, outermost first
    pub fn frames(&self) -> &[Frame] {
        &self.stack
    }

    pub fn current(&self) -> Option<&Frame> {
        self.stack.last()
    }

    /// Innermost frame and the frames enclosing it
    pub fn split_current(&self) -> Option<(&Frame, &[Frame])> {
        self.stack.split_last()
    }

    /// Widget type in effect at the top of the stack
    pub fn widget_type(&self) -> Option<&str> {
        widget_type(None, &self.stack)
    }

    /// Open a section of `kind` whose name sits at `header`.
    ///
    /// Frames closed to make room are handed to `on_close` top-first, together
    /// with the frames still open below them.
    pub fn open_section<F>(
        &mut self,
        kind: SectionKind,
        header: Range,
        mut on_close: F,
    ) -> Option<StructuralError>
    where
        F: FnMut(Frame, &[Frame]),
    {
        let keep = self.frames_to_keep(kind);
        while self.stack.len() > keep {
            if let Some(frame) = self.stack.pop() {
                on_close(frame, &self.stack);
            }
        }

        let depth = self.stack.len();
        let error = self.check_placement(kind, depth);

        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(kind);
        }
        logging::log_section_opened(kind.as_str(), depth, header.start.line);
        self.stack.push(Frame::new(kind, depth, header));
        error
    }

    fn frames_to_keep(&self, kind: SectionKind) -> usize {
        let parents = self.hierarchy.parents_of(kind);
        if parents.is_empty() {
            return 0;
        }

        // nearest allowed parent, wherever it sits
        match self.stack.iter().rposition(|frame| parents.contains(&frame.kind)) {
            Some(index) => index + 1,
            None => self.stack.len().min(self.hierarchy.max_depth(kind)),
        }
    }

    fn check_placement(&self, kind: SectionKind, depth: usize) -> Option<StructuralError> {
        let parent = self.stack.last().map(|f| (f.kind, f.depth));
        if !self.hierarchy.accepts_depth(kind, depth, parent) {
            return Some(StructuralError::Depth {
                kind,
                depth,
                expected: self.hierarchy.depth_of(kind),
            });
        }

        let parents = self.hierarchy.parents_of(kind);
        let found = self.stack.last().map(|f| f.kind);
        let placed = match found {
            Some(parent) => parents.contains(&parent),
            None => parents.is_empty(),
        };
        if placed {
            None
        } else {
            Some(StructuralError::Parent {
                kind,
                found,
                allowed: parents.to_vec(),
            })
        }
    }

    /// Append a setting to the innermost frame; false when no section is open
    pub fn record_setting(&mut self, entry: SettingEntry) -> bool {
        match self.stack.last_mut() {
            Some(frame) => {
                frame.settings.push(entry);
                true
            }
            None => false,
        }
    }

    pub fn close_section(&mut self) -> Option<Frame> {
        let frame = self.stack.pop();
        if frame.is_none() {
            logging::log_close_on_empty_stack();
        }
        frame
    }

    /// Close every open frame at end of input, innermost first
    pub fn finish<F>(mut self, mut on_close: F)
    where
        F: FnMut(Frame, &[Frame]),
    {
        while let Some(frame) = self.stack.pop() {
            on_close(frame, &self.stack);
        }
    }
}
