//! Generic element tree for the XML footer.
//!
//! The footer schema is small and tag matching is case-insensitive, so the
//! footer is read once into an owned tree with namespace prefixes stripped.
//! Layout parsing walks the tree directly; settings extraction works on the
//! flattened `path -> node` list produced by [`XmlNode::flatten`].

use crate::error::SpeError;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    /// Local name, namespace prefix removed
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

/// A node of the flattened tree with its slash-delimited, lowercased path
/// from (but excluding) the root element.
#[derive(Debug, Clone)]
pub struct FlatNode<'a> {
    pub path: String,
    pub node: &'a XmlNode,
    /// False when the node or any ancestor carries `relevance="False"`
    pub relevant: bool,
}

impl XmlNode {
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Case-insensitive attribute lookup
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.is_named(name))
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |child| child.is_named(name))
    }

    /// Whether this element is explicitly marked not relevant
    pub fn is_irrelevant(&self) -> bool {
        self.attr("relevance")
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("false"))
    }

    /// Every descendant in document order, paired with its path.
    pub fn flatten(&self) -> Vec<FlatNode<'_>> {
        let mut out = Vec::new();
        for child in &self.children {
            flatten_into(child, String::new(), true, &mut out);
        }
        out
    }
}

fn flatten_into<'a>(node: &'a XmlNode, prefix: String, parent_relevant: bool, out: &mut Vec<FlatNode<'a>>) {
    let path = if prefix.is_empty() {
        node.name.to_ascii_lowercase()
    } else {
        format!("{prefix}/{}", node.name.to_ascii_lowercase())
    };
    let relevant = parent_relevant && !node.is_irrelevant();
    out.push(FlatNode {
        path: path.clone(),
        node,
        relevant,
    });
    for child in &node.children {
        flatten_into(child, path.clone(), relevant, out);
    }
}

fn utf8(bytes: &[u8]) -> Result<&str, SpeError> {
    std::str::from_utf8(bytes).map_err(|e| SpeError::CorruptFooter(format!("invalid UTF-8 in footer: {e}")))
}

fn start_node(e: &BytesStart) -> Result<XmlNode, SpeError> {
    let name = utf8(e.local_name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = utf8(attr.key.local_name().as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlNode {
        name,
        attributes,
        ..Default::default()
    })
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<(), SpeError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        Ok(())
    } else if root.is_none() {
        *root = Some(node);
        Ok(())
    } else {
        Err(SpeError::CorruptFooter("footer has more than one root element".to_string()))
    }
}

/// Trailing NUL padding after the root element is ignored.
fn trim_footer(xml: &str) -> &str {
    xml.trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
}

/// Parses footer text into a tree rooted at the document element
pub fn parse_xml_tree(xml: &str) -> Result<XmlNode, SpeError> {
    let mut reader = Reader::from_str(trim_footer(xml));
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => stack.push(start_node(e)?),
            Event::Empty(ref e) => {
                let node = start_node(e)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(ref t) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(ref t) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(utf8(t)?);
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| SpeError::CorruptFooter("unbalanced closing tag".to_string()))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(SpeError::CorruptFooter(format!("element <{}> is never closed", open.name)));
    }
    root.ok_or_else(|| SpeError::CorruptFooter("footer contains no root element".to_string()))
}

/// Re-indents footer text for display
pub fn pretty_print(xml: &str) -> Result<String, SpeError> {
    let mut reader = Reader::from_str(trim_footer(xml));
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| SpeError::CorruptFooter(format!("invalid UTF-8 in footer: {e}")))
}
