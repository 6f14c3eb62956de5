//! Tag parser - turns template source into a node tree

use super::TemplateError;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Variable(String),
    Section {
        name: String,
        inverted: bool,
        children: Vec<Node>,
        /// Unparsed source between the opening and closing tag
        raw: String,
    },
}

struct OpenSection {
    name: String,
    inverted: bool,
    tag_offset: usize,
    inner_start: usize,
    children: Vec<Node>,
}

enum Tag<'s> {
    Variable(&'s str),
    Open { name: &'s str, inverted: bool },
    Close(&'s str),
    Comment,
}

pub fn parse(source: &str) -> Result<Vec<Node>, TemplateError> {
    let mut root: Vec<Node> = vec![];
    let mut open: Vec<OpenSection> = vec![];
    let mut pos = 0;

    while let Some(rel) = source[pos..].find("{{") {
        let tag_start = pos + rel;
        let (tag, tag_end) = read_tag(source, tag_start)?;

        let text = &source[pos..tag_start];
        if !text.is_empty() {
            current(&mut root, &mut open).push(Node::Text(text.to_string()));
        }

        match tag {
            Tag::Variable(name) => {
                current(&mut root, &mut open).push(Node::Variable(name.to_string()));
            }
            Tag::Open { name, inverted } => open.push(OpenSection {
                name: name.to_string(),
                inverted,
                tag_offset: tag_start,
                inner_start: tag_end,
                children: vec![],
            }),
            Tag::Close(name) => {
                let section = match open.pop() {
                    Some(section) if section.name == name => section,
                    Some(section) => {
                        return Err(TemplateError::syntax(
                            tag_start,
                            format!("closing tag '{}' does not match open section '{}'", name, section.name),
                        ))
                    }
                    None => {
                        return Err(TemplateError::syntax(
                            tag_start,
                            format!("closing tag '{}' has no open section", name),
                        ))
                    }
                };
                let node = Node::Section {
                    raw: source[section.inner_start..tag_start].to_string(),
                    name: section.name,
                    inverted: section.inverted,
                    children: section.children,
                };
                current(&mut root, &mut open).push(node);
            }
            Tag::Comment => {}
        }

        pos = tag_end;
    }

    if let Some(section) = open.pop() {
        return Err(TemplateError::syntax(
            section.tag_offset,
            format!("section '{}' is never closed", section.name),
        ));
    }

    if pos < source.len() {
        root.push(Node::Text(source[pos..].to_string()));
    }

    Ok(root)
}

fn current<'n>(root: &'n mut Vec<Node>, open: &'n mut [OpenSection]) -> &'n mut Vec<Node> {
    match open.last_mut() {
        Some(section) => &mut section.children,
        None => root,
    }
}

/// Read the tag starting at `start` (pointing at `{{`); returns the tag and
/// the offset just past its closing braces.
fn read_tag(source: &str, start: usize) -> Result<(Tag<'_>, usize), TemplateError> {
    let after_open = start + 2;

    if source[after_open..].starts_with('{') {
        let inner_start = after_open + 1;
        let close = source[inner_start..]
            .find("}}}")
            .ok_or_else(|| TemplateError::syntax(start, "unclosed tag '{{{'"))?;
        let name = tag_name(&source[inner_start..inner_start + close], start)?;
        return Ok((Tag::Variable(name), inner_start + close + 3));
    }

    let close = source[after_open..]
        .find("}}")
        .ok_or_else(|| TemplateError::syntax(start, "unclosed tag '{{'"))?;
    let end = after_open + close + 2;
    let content = source[after_open..after_open + close].trim();

    let tag = match content.chars().next() {
        Some('!') => Tag::Comment,
        Some('#') => Tag::Open { name: tag_name(&content[1..], start)?, inverted: false },
        Some('^') => Tag::Open { name: tag_name(&content[1..], start)?, inverted: true },
        Some('/') => Tag::Close(tag_name(&content[1..], start)?),
        Some('&') => Tag::Variable(tag_name(&content[1..], start)?),
        Some('=') => {
            return Err(TemplateError::syntax(start, "delimiter changes are not supported"))
        }
        Some('>') => return Err(TemplateError::syntax(start, "partials are not supported")),
        _ => Tag::Variable(tag_name(content, start)?),
    };

    Ok((tag, end))
}

fn tag_name(raw: &str, offset: usize) -> Result<&str, TemplateError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(TemplateError::syntax(offset, "empty tag name"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(TemplateError::syntax(offset, format!("invalid tag name '{}'", name)));
    }
    Ok(name)
}
