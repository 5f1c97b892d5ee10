//! Generic markup tree
//!
//! The first stage of reading a TMX file: raw text is turned into a tree of
//! [`Element`]s without any knowledge of what the elements mean. Unknown
//! elements and attributes are kept so later stages can decide what to use.

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use std::str;

use crate::error::{Error, Result};

/// A single markup element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<Element>,
    /// Concatenated character data directly inside this element
    pub text: String,
}

impl Element {
    /// Create an element with no attributes or children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over the direct children with the given tag name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First direct child with the given tag name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }
}

/// A parsed markup document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The single root element
    pub root: Element,
}

/// Parse markup text into a [`Document`]
///
/// Fails with [`Error::MalformedDocument`] carrying the byte offset and the
/// derived line/column when the input is not well formed.
pub fn parse_document(text: &str) -> Result<Document> {
    let mut reader = Reader::from_str(text);
    let config = reader.config_mut();
    config.check_end_names = true;
    config.expand_empty_elements = false;

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(text, reader.error_position() as usize, e.to_string()))?;

        match event {
            Event::Start(start) => {
                let element = start_element(&start)
                    .map_err(|message| malformed(text, reader.buffer_position() as usize, message))?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = start_element(&start)
                    .map_err(|message| malformed(text, reader.buffer_position() as usize, message))?;
                attach(&mut stack, &mut root, element)
                    .map_err(|message| malformed(text, reader.buffer_position() as usize, message))?;
            }
            Event::End(_) => {
                // check_end_names guarantees the stack is non-empty and matching
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element).map_err(|message| {
                        malformed(text, reader.buffer_position() as usize, message)
                    })?;
                }
            }
            Event::Text(content) => {
                let decoded = content
                    .decode()
                    .map_err(|e| malformed(text, reader.buffer_position() as usize, e.to_string()))?;
                push_text(&mut stack, &decoded);
            }
            Event::CData(content) => {
                let decoded = content
                    .decode()
                    .map_err(|e| malformed(text, reader.buffer_position() as usize, e.to_string()))?;
                push_text(&mut stack, &decoded);
            }
            Event::GeneralRef(reference) => {
                let position = reader.buffer_position() as usize;
                let resolved = match reference
                    .resolve_char_ref()
                    .map_err(|e| malformed(text, position, e.to_string()))?
                {
                    Some(ch) => ch.to_string(),
                    None => {
                        let name = reference
                            .decode()
                            .map_err(|e| malformed(text, position, e.to_string()))?;
                        resolve_predefined_entity(&name)
                            .ok_or_else(|| {
                                malformed(text, position, format!("unknown entity '&{name};'"))
                            })?
                            .to_string()
                    }
                };
                push_text(&mut stack, &resolved);
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry no map data
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(
            text,
            text.len(),
            format!("unclosed element <{}>", open.name),
        ));
    }

    match root {
        Some(root) => Ok(Document { root }),
        None => Err(malformed(text, text.len(), "document has no root element")),
    }
}

fn start_element(start: &BytesStart<'_>) -> std::result::Result<Element, String> {
    let name = str::from_utf8(start.name().as_ref())
        .map_err(|e| e.to_string())?
        .to_string();

    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = str::from_utf8(attribute.key.as_ref())
            .map_err(|e| e.to_string())?
            .to_string();
        let value = attribute
            .unescape_value()
            .map_err(|e| e.to_string())?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> std::result::Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(format!(
            "multiple root elements: <{}> follows the document root",
            element.name
        )),
    }
}

fn push_text(stack: &mut [Element], text: &str) {
    // Character data outside the root is whitespace between prolog items
    if let Some(current) = stack.last_mut() {
        current.text.push_str(text);
    }
}

fn malformed(text: &str, offset: usize, message: impl Into<String>) -> Error {
    let offset = offset.min(text.len());
    let (line, column) = line_and_column(text, offset);
    Error::MalformedDocument {
        path: None,
        line,
        column,
        offset,
        message: message.into(),
    }
}

/// 1-based line and column of a byte offset
fn line_and_column(text: &str, offset: usize) -> (usize, usize) {
    let prefix = &text.as_bytes()[..offset];
    let line = prefix.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = prefix
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1);
    (line, offset - line_start + 1)
}
