use crate::catalog::canonical_name;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use std::collections::HashMap;
use tracing::debug;

/// Parse the long-form description document.
///
/// Every second-level heading names a setting; the Markdown source between that
/// heading and the next heading of any level is its description. Keys are
/// canonical setting names, so `## alert-expression` and `## alertexpression`
/// describe the same setting.
pub fn parse_descriptions(markdown: &str) -> HashMap<String, String> {
    let mut descriptions = HashMap::new();
    let mut current: Option<(String, usize)> = None;
    let mut heading: Option<(HeadingLevel, String)> = None;

    for (event, range) in Parser::new(markdown).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                if let Some((name, body_start)) = current.take() {
                    insert_description(&mut descriptions, &name, &markdown[body_start..range.start]);
                }
                heading = Some((level, String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, title)) = heading.as_mut() {
                    title.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, title)) = heading.take() {
                    if level == HeadingLevel::H2 {
                        current = Some((title, range.end));
                    }
                }
            }
            _ => {}
        }
    }

    if let Some((name, body_start)) = current {
        insert_description(&mut descriptions, &name, &markdown[body_start..]);
    }

    debug!("[Catalog] Parsed {} setting descriptions", descriptions.len());
    descriptions
}

fn insert_description(descriptions: &mut HashMap<String, String>, title: &str, body: &str) {
    let name = canonical_name(title);
    let body = body.trim();
    if name.is_empty() || body.is_empty() {
        return;
    }
    descriptions.insert(name, body.to_string());
}
