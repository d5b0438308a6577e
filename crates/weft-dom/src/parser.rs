//! HTML parsing on top of html5ever.
//!
//! html5ever runs the HTML5 tree construction algorithm over the input and
//! builds an `RcDom`, which is then copied into the arena [`Document`].
//! Whatever the input, html5ever recovers a tree; the only failure is a tree
//! nested deeper than [`MAX_NESTING_DEPTH`].
//!
//! Entities in text and attribute values are decoded; the serializer
//! escapes them again on the way out.

use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::error::ParseError;
use crate::tree::{Document, Element, NodeData, NodeId};

/// Deepest element nesting a parsed tree may have.
pub const MAX_NESTING_DEPTH: usize = 512;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Elements that never have content.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose content is raw text, not markup.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

/// Whether `tag` is an HTML void element.
#[must_use]
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Whether the text inside `tag` is written without escaping.
#[must_use]
pub fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// Parse a whole document.
///
/// Missing `html`, `head` and `body` elements are implied, so the tree always
/// has them; a fragment ends up inside `body`.
///
/// # Errors
///
/// Returns [`ParseError::TooDeep`] when elements nest deeper than
/// [`MAX_NESTING_DEPTH`].
pub fn parse(markup: &str) -> Result<Document, ParseError> {
    let dom = html5ever::parse_document(RcDom::default(), options()).one(markup);
    let mut builder = TreeBuilder::new();
    let root = builder.doc.root();
    builder.copy_children(&dom.document, root, 0)?;
    Ok(builder.doc)
}

/// Parse markup as the content of a `context` element.
///
/// The top-level nodes of the input become children of the root, as they
/// would be if the markup were assigned to the context element's
/// `innerHTML`. Used for listener replacement markup.
///
/// # Errors
///
/// Returns [`ParseError::TooDeep`] when elements nest deeper than
/// [`MAX_NESTING_DEPTH`].
pub fn parse_fragment(markup: &str, context: &str) -> Result<Document, ParseError> {
    let context = QualName::new(
        None,
        Namespace::from(HTML_NAMESPACE),
        LocalName::from(context.to_ascii_lowercase()),
    );
    let dom = html5ever::parse_fragment(RcDom::default(), options(), context, Vec::new(), false)
        .one(markup);

    let mut builder = TreeBuilder::new();
    let root = builder.doc.root();
    // The fragment's nodes sit under a single synthetic `html` element.
    let children = dom.document.children.borrow();
    for html in children.iter() {
        builder.copy_children(html, root, 0)?;
    }
    Ok(builder.doc)
}

fn options() -> ParseOpts {
    ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..TreeBuilderOpts::default()
        },
        ..ParseOpts::default()
    }
}

struct TreeBuilder {
    doc: Document,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            doc: Document::new(),
        }
    }

    fn copy_children(
        &mut self,
        handle: &Handle,
        parent: NodeId,
        depth: usize,
    ) -> Result<(), ParseError> {
        for child in handle.children.borrow().iter() {
            self.copy_node(child, parent, depth)?;
        }
        Ok(())
    }

    fn copy_node(&mut self, handle: &Handle, parent: NodeId, depth: usize) -> Result<(), ParseError> {
        match &handle.data {
            RcNodeData::Document => self.copy_children(handle, parent, depth)?,
            RcNodeData::Doctype {
                name,
                public_id,
                system_id,
            } => {
                let doctype = doctype(name, public_id, system_id);
                self.doc.append(parent, NodeData::Doctype(doctype));
            }
            RcNodeData::Text { contents } => {
                self.doc.append_text(parent, &contents.borrow());
            }
            RcNodeData::Comment { contents } => {
                self.doc.append(parent, NodeData::Comment(contents.to_string()));
            }
            RcNodeData::ProcessingInstruction { target, contents } => {
                self.doc
                    .append(parent, NodeData::Raw(format!("<?{target} {contents}?>")));
            }
            RcNodeData::Element {
                name,
                attrs,
                template_contents,
                ..
            } => {
                let depth = depth + 1;
                if depth > MAX_NESTING_DEPTH {
                    return Err(ParseError::TooDeep {
                        limit: MAX_NESTING_DEPTH,
                    });
                }

                let mut element = Element::new(&name.local);
                for attr in attrs.borrow().iter() {
                    let key = match &attr.name.prefix {
                        Some(prefix) => format!("{prefix}:{}", attr.name.local),
                        None => attr.name.local.to_string(),
                    };
                    element.set_attr(&key, attr.value.to_string());
                }
                let id = self.doc.append(parent, NodeData::Element(element));

                // `template` keeps its content in a separate fragment.
                match template_contents.borrow().as_ref() {
                    Some(contents) => self.copy_children(contents, id, depth)?,
                    None => self.copy_children(handle, id, depth)?,
                }
            }
        }
        Ok(())
    }
}

fn doctype(name: &str, public_id: &str, system_id: &str) -> String {
    let mut doctype = format!("<!DOCTYPE {name}");
    if !public_id.is_empty() {
        doctype.push_str(&format!(r#" PUBLIC "{public_id}""#));
        if !system_id.is_empty() {
            doctype.push_str(&format!(r#" "{system_id}""#));
        }
    } else if !system_id.is_empty() {
        doctype.push_str(&format!(r#" SYSTEM "{system_id}""#));
    }
    doctype.push('>');
    doctype
}
