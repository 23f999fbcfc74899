//! # Content Model
//!
//! The input representation for the layout engine: a tree of text and
//! element nodes with optional style properties. Designed to be easily
//! produced by an HTML-ish parser, direct JSON construction, or the
//! [`from_markup`] frontend.
//!
//! The engine only reads this tree; it never mutates it. Element tags are
//! opaque strings; what a tag *means* is decided by the layout registry
//! (`ruby` gets the ruby strategy, `br` forces a line break, anything else
//! is a transparent inline container).

use crate::error::LayoutError;
use crate::style::Style;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

/// A complete document ready for layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Root content nodes, laid out as one block.
    pub children: Vec<Node>,

    /// Base style the root nodes resolve against.
    #[serde(default)]
    pub style: Style,
}

/// A node in the content tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// What kind of node this is.
    pub kind: NodeKind,

    /// Style properties for this node.
    #[serde(default)]
    pub style: Style,

    /// Child nodes. Always empty for text nodes.
    #[serde(default)]
    pub children: Vec<Node>,
}

/// The kinds of nodes in the content tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    /// A run of text.
    Text { content: String },

    /// An element with a tag name and child content.
    Element { tag: String },
}

impl Node {
    /// Create a text node.
    pub fn text(content: &str) -> Self {
        Self {
            kind: NodeKind::Text {
                content: content.to_string(),
            },
            style: Style::default(),
            children: vec![],
        }
    }

    /// Create an element node with children.
    pub fn element(tag: &str, children: Vec<Node>) -> Self {
        Self {
            kind: NodeKind::Element {
                tag: tag.to_string(),
            },
            style: Style::default(),
            children,
        }
    }

    /// Attach a style to this node.
    pub fn styled(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

/// Parse a well-formed markup fragment into content nodes.
///
/// Accepts a flat fragment (no single root required): text, elements such as
/// `<ruby>`, `<rt>`, `<rb>`, `<rp>`, and self-closing `<br/>`. Attributes
/// are ignored; nesting is preserved.
pub fn from_markup(markup: &str) -> Result<Vec<Node>, LayoutError> {
    let mut reader = Reader::from_str(markup);
    let mut buf = Vec::new();

    // The parse stack: index 0 is a synthetic root collecting top-level nodes.
    let mut stack: Vec<Node> = vec![Node::element("#fragment", vec![])];

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.push(Node::element(&tag, vec![]));
            }
            Ok(Event::Empty(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let node = Node::element(&tag, vec![]);
                stack
                    .last_mut()
                    .expect("parse stack holds the synthetic root")
                    .children
                    .push(node);
            }
            Ok(Event::End(_)) => {
                // Name mismatches already error out of read_event_into; a
                // stray end tag that would pop the synthetic root is skipped.
                if stack.len() > 1 {
                    let node = stack.pop().expect("length checked");
                    stack
                        .last_mut()
                        .expect("length checked")
                        .children
                        .push(node);
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(quick_xml::Error::from)?;
                if !text.is_empty() {
                    stack
                        .last_mut()
                        .expect("parse stack holds the synthetic root")
                        .children
                        .push(Node::text(&text));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e.into()),
        }
        buf.clear();
    }

    let root = stack.pop().expect("parse stack holds the synthetic root");
    Ok(root.children)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_plain_text() {
        let nodes = from_markup("hello world").unwrap();
        assert_eq!(nodes.len(), 1);
        match &nodes[0].kind {
            NodeKind::Text { content } => assert_eq!(content, "hello world"),
            other => panic!("expected text node, got {other:?}"),
        }
    }

    #[test]
    fn test_markup_ruby_structure() {
        let nodes = from_markup("<ruby>漢字<rt>かんじ</rt></ruby>").unwrap();
        assert_eq!(nodes.len(), 1);
        let ruby = &nodes[0];
        match &ruby.kind {
            NodeKind::Element { tag } => assert_eq!(tag, "ruby"),
            other => panic!("expected element, got {other:?}"),
        }
        assert_eq!(ruby.children.len(), 2);
        match &ruby.children[1].kind {
            NodeKind::Element { tag } => assert_eq!(tag, "rt"),
            other => panic!("expected rt element, got {other:?}"),
        }
    }

    #[test]
    fn test_markup_self_closing_br() {
        let nodes = from_markup("one<br/>two").unwrap();
        assert_eq!(nodes.len(), 3);
        match &nodes[1].kind {
            NodeKind::Element { tag } => assert_eq!(tag, "br"),
            other => panic!("expected br element, got {other:?}"),
        }
    }

    #[test]
    fn test_markup_mismatched_end_tag_is_error() {
        assert!(from_markup("<ruby>x</span>").is_err());
    }

    #[test]
    fn test_json_document_round_trip() {
        let doc = Document {
            children: vec![
                Node::text("abc"),
                Node::element("ruby", vec![Node::text("基"), Node::element("rt", vec![Node::text("き")])]),
            ],
            style: Style {
                font_size: Some(16.0),
                ..Style::default()
            },
        };
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back.children.len(), 2);
        assert_eq!(back.style.font_size, Some(16.0));
    }
}
