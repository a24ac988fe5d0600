use crate::position::split_lines;
use regex::Regex;
use std::iter::Enumerate;

/// Byte range within one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    For,
    EndFor,
    If,
    ElseIf,
    Else,
    EndIf,
    List,
    EndList,
    Csv,
    EndCsv,
    Script,
    EndScript,
    Var,
    EndVar,
    Import,
}

impl Control {
    fn parse(word: &str) -> Option<Self> {
        let control = match word {
            "for" => Control::For,
            "endfor" => Control::EndFor,
            "if" => Control::If,
            "elseif" => Control::ElseIf,
            "else" => Control::Else,
            "endif" => Control::EndIf,
            "list" => Control::List,
            "endlist" => Control::EndList,
            "csv" => Control::Csv,
            "endcsv" => Control::EndCsv,
            "script" => Control::Script,
            "endscript" => Control::EndScript,
            "var" => Control::Var,
            "endvar" => Control::EndVar,
            "import" => Control::Import,
            _ => return None,
        };
        Some(control)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Control::For => "for",
            Control::EndFor => "endfor",
            Control::If => "if",
            Control::ElseIf => "elseif",
            Control::Else => "else",
            Control::EndIf => "endif",
            Control::List => "list",
            Control::EndList => "endlist",
            Control::Csv => "csv",
            Control::EndCsv => "endcsv",
            Control::Script => "script",
            Control::EndScript => "endscript",
            Control::Var => "var",
            Control::EndVar => "endvar",
            Control::Import => "import",
        }
    }

    /// Keyword that closes a block opened by `self`
    pub fn terminator(&self) -> Option<Control> {
        match self {
            Control::For => Some(Control::EndFor),
            Control::If => Some(Control::EndIf),
            Control::List => Some(Control::EndList),
            Control::Csv => Some(Control::EndCsv),
            Control::Script => Some(Control::EndScript),
            Control::Var => Some(Control::EndVar),
            _ => None,
        }
    }

    /// Opening keyword closed by `self`
    pub fn opener(&self) -> Option<Control> {
        match self {
            Control::EndFor => Some(Control::For),
            Control::EndIf => Some(Control::If),
            Control::EndList => Some(Control::List),
            Control::EndCsv => Some(Control::Csv),
            Control::EndScript => Some(Control::Script),
            Control::EndVar => Some(Control::Var),
            _ => None,
        }
    }

    /// `elseif` and `else`, valid only directly inside an `if` block
    pub fn is_branch(&self) -> bool {
        matches!(self, Control::ElseIf | Control::Else)
    }

    fn has_opaque_body(&self) -> bool {
        matches!(self, Control::Script | Control::Csv | Control::List | Control::Var)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    /// `#` or `//` line, or any line touched by a block comment
    Comment,
    /// Body line of a `script`, `csv` or multi-line `var`/`list` block
    Opaque,
    Section {
        name: &'a str,
        span: Span,
    },
    Setting {
        key: &'a str,
        key_span: Span,
        value: &'a str,
        value_span: Span,
    },
    Control {
        keyword: Control,
        span: Span,
        opens_block: bool,
    },
    /// Anything else, e.g. continuation lines
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedLine<'a> {
    pub number: u32,
    pub text: &'a str,
    /// Byte length of the leading whitespace
    pub indent: usize,
    pub kind: LineKind<'a>,
}

/// Compiled line patterns, built once and shared by every scan
#[derive(Debug, Clone)]
pub struct LinePatterns {
    section: Regex,
    control: Regex,
    setting: Regex,
}

impl LinePatterns {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(LinePatterns {
            section: Regex::new(r"^\s*\[\s*([A-Za-z][A-Za-z0-9_-]*)\s*\]\s*$")?,
            control: Regex::new(
                r"^\s*(for|endfor|if|elseif|else|endif|list|endlist|csv|endcsv|script|endscript|var|endvar|import)(?:\s|=|$)",
            )?,
            setting: Regex::new(r"^\s*([A-Za-z0-9_][^=]*?)\s*=\s*(.*?)\s*$")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Comment,
    Opaque(Control),
}

/// Line classifier that tracks block comments and opaque control bodies
pub struct Scanner<'a, 'p> {
    patterns: &'p LinePatterns,
    lines: Enumerate<Box<dyn Iterator<Item = &'a str> + 'a>>,
    block: Block,
}

impl<'a, 'p> Scanner<'a, 'p> {
    pub fn new(text: &'a str, patterns: &'p LinePatterns) -> Self {
        let lines: Box<dyn Iterator<Item = &'a str> + 'a> = Box::new(split_lines(text));
        Scanner {
            patterns,
            lines: lines.enumerate(),
            block: Block::None,
        }
    }

    /// True when the next line starts inside a block comment
    pub fn in_comment(&self) -> bool {
        self.block == Block::Comment
    }

    /// True when the next line starts inside an opaque control body
    pub fn in_opaque(&self) -> bool {
        matches!(self.block, Block::Opaque(_))
    }

    fn classify(&mut self, line: &'a str) -> LineKind<'a> {
        let trimmed = line.trim();

        match self.block {
            Block::Comment => {
                if trimmed.contains("*/") {
                    self.block = Block::None;
                }
                return LineKind::Comment;
            }
            Block::Opaque(terminator) => {
                if let Some(kind) = self.control(line) {
                    if let LineKind::Control { keyword, .. } = kind {
                        if keyword == terminator {
                            self.block = Block::None;
                            return kind;
                        }
                    }
                }
                return LineKind::Opaque;
            }
            Block::None => {}
        }

        if trimmed.is_empty() {
            return LineKind::Blank;
        }
        if let Some(rest) = trimmed.strip_prefix("/*") {
            if !rest.contains("*/") {
                self.block = Block::Comment;
            }
            return LineKind::Comment;
        }
        if trimmed.starts_with('#') || trimmed.starts_with("//") {
            return LineKind::Comment;
        }

        if let Some(caps) = self.patterns.section.captures(line) {
            if let Some(name) = caps.get(1) {
                return LineKind::Section {
                    name: name.as_str(),
                    span: Span {
                        start: name.start(),
                        end: name.end(),
                    },
                };
            }
        }

        if let Some(kind) = self.control(line) {
            if let LineKind::Control {
                keyword,
                opens_block: true,
                ..
            } = kind
            {
                if keyword.has_opaque_body() {
                    if let Some(terminator) = keyword.terminator() {
                        self.block = Block::Opaque(terminator);
                    }
                }
            }
            return kind;
        }

        if let Some(caps) = self.patterns.setting.captures(line) {
            if let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) {
                return LineKind::Setting {
                    key: key.as_str(),
                    key_span: Span {
                        start: key.start(),
                        end: key.end(),
                    },
                    value: value.as_str(),
                    value_span: Span {
                        start: value.start(),
                        end: value.end(),
                    },
                };
            }
        }

        LineKind::Text
    }

    fn control(&self, line: &'a str) -> Option<LineKind<'a>> {
        let caps = self.patterns.control.captures(line)?;
        let word = caps.get(1)?;
        let keyword = Control::parse(word.as_str())?;
        let rest = line[word.end()..].trim();
        Some(LineKind::Control {
            keyword,
            span: Span {
                start: word.start(),
                end: word.end(),
            },
            opens_block: opens_block(keyword, rest),
        })
    }
}

/// Whether a control line starts a block that needs its terminator
fn opens_block(keyword: Control, rest: &str) -> bool {
    match keyword {
        Control::For | Control::If | Control::Csv => true,
        // `script = expr` is a one-line script
        Control::Script => !rest.starts_with('='),
        Control::Var => {
            let value = rest.split_once('=').map(|(_, v)| v.trim()).unwrap_or("");
            value.is_empty() || !brackets_balanced(value)
        }
        Control::List => {
            let value = rest.split_once('=').map(|(_, v)| v.trim()).unwrap_or("");
            value.is_empty() || value.ends_with(',')
        }
        _ => false,
    }
}

fn brackets_balanced(value: &str) -> bool {
    let mut depth = 0i32;
    for c in value.chars() {
        match c {
            '[' | '{' | '(' => depth += 1,
            ']' | '}' | ')' => depth -= 1,
            _ => {}
        }
    }
    depth <= 0
}

impl<'a> Iterator for Scanner<'a, '_> {
    type Item = ScannedLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, text) = self.lines.next()?;
        let kind = self.classify(text);
        let indent = text.len() - text.trim_start().len();
        Some(ScannedLine {
            number: index as u32,
            text,
            indent,
            kind,
        })
    }
}
