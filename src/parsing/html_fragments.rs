use html5ever::parse_document;
use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use std::io;

/// A child of the content root, serialized back to HTML.
#[derive(Debug, Clone, PartialEq)]
pub struct TopLevelNode {
    pub html: String,
    /// Whitespace-only text between elements.
    pub is_blank: bool,
}

/// Parse `html` and return the top-level nodes of its body, in document order.
///
/// Comments and processing instructions are dropped; everything else is kept
/// intact so that markup is never split inside an element.
pub fn split_top_level(html: &str) -> io::Result<Vec<TopLevelNode>> {
    let dom = parse_fragment_root(html);
    let Some(body) = find_element(&dom.document, "body") else {
        return Ok(Vec::new());
    };

    let mut nodes = Vec::new();
    for child in body.children.borrow().iter() {
        let is_blank = match child.data {
            NodeData::Text { ref contents } => contents.borrow().trim().is_empty(),
            NodeData::Element { .. } => false,
            _ => continue,
        };
        nodes.push(TopLevelNode {
            html: serialize_node(child)?,
            is_blank,
        });
    }
    Ok(nodes)
}

/// All text in `html`, one space between words, markup ignored.
pub fn extract_text(html: &str) -> String {
    let dom = parse_fragment_root(html);
    let mut words = Vec::new();
    if let Some(body) = find_element(&dom.document, "body") {
        collect_words(&body, &mut words);
    }
    words.join(" ")
}

pub(crate) fn parse_fragment_root(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

pub(crate) fn find_element(node: &Handle, local: &str) -> Option<Handle> {
    if let NodeData::Element { ref name, .. } = node.data {
        if name.local.as_ref() == local {
            return Some(node.clone());
        }
    }
    node.children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, local))
}

fn collect_words(node: &Handle, words: &mut Vec<String>) {
    match node.data {
        NodeData::Text { ref contents } => {
            words.extend(contents.borrow().split_whitespace().map(str::to_string));
        }
        NodeData::Element { ref name, .. }
            if matches!(name.local.as_ref(), "script" | "style" | "template") => {}
        _ => {
            for child in node.children.borrow().iter() {
                collect_words(child, words);
            }
        }
    }
}

fn serialize_node(node: &Handle) -> io::Result<String> {
    let mut bytes = Vec::new();
    let handle: SerializableHandle = node.clone().into();
    serialize(
        &mut bytes,
        &handle,
        SerializeOpts {
            traversal_scope: TraversalScope::IncludeNode,
            ..Default::default()
        },
    )?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
