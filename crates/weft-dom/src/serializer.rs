//! Tree serialization and output fixups.

use std::fmt::Write;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::parser::{is_raw_text, is_void};
use crate::tree::{Document, NodeData, NodeId};

/// Self-closed elements that browsers do not treat as closed.
static SELF_CLOSED_CONTAINERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<(a|script|noscript|table|iframe|noframes|canvas|style|div|span|textarea|title|video|audio)(\s[^>]*?)?\s*/>",
    )
    .expect("invalid self-closed container regex")
});

/// `source` elements written as an open/close pair.
static PAIRED_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<source(\s[^>]*?)?\s*>\s*</source\s*>").expect("invalid source pair regex")
});

/// `script` and `style` elements with their bodies.
static RAW_TEXT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b(?:[^>]*[^/>])?>.*?</script\s*>|<style\b(?:[^>]*[^/>])?>.*?</style\s*>")
        .expect("invalid raw text block regex")
});

/// Serialize the whole tree.
#[must_use]
pub fn to_html(doc: &Document) -> String {
    inner_html(doc, doc.root())
}

/// Serialize the children of `id`.
#[must_use]
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::with_capacity(4096);
    let raw = doc.element(id).is_some_and(|el| is_raw_text(el.tag()));
    for &child in doc.children(id) {
        serialize_node(doc, child, raw, &mut out);
    }
    out
}

/// Serialize `id` itself, including its own tag.
#[must_use]
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let raw = doc
        .parent(id)
        .and_then(|parent| doc.element(parent))
        .is_some_and(|el| is_raw_text(el.tag()));
    let mut out = String::new();
    serialize_node(doc, id, raw, &mut out);
    out
}

/// Serialize only the children of the first `body` element.
///
/// Falls back to the whole tree when the markup has no `body`.
#[must_use]
pub fn body_html(doc: &Document) -> String {
    match doc.find_element("body") {
        Some(body) => inner_html(doc, body),
        None => to_html(doc),
    }
}

/// Rewrite self-closing tags into the form browsers expect.
///
/// Container elements written as `<div />` become `<div></div>`, and
/// `<source ...></source>` becomes `<source ... />`. The bodies of
/// `script` and `style` elements are left untouched.
///
/// The serializer never produces either form itself; they come from
/// text hooks and other markup spliced in as text.
#[must_use]
pub fn apply_fixups(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for block in RAW_TEXT_BLOCK.find_iter(html) {
        out.push_str(&fix_markup(&html[last..block.start()]));
        out.push_str(block.as_str());
        last = block.end();
    }
    out.push_str(&fix_markup(&html[last..]));
    out
}

fn fix_markup(html: &str) -> String {
    let html = SELF_CLOSED_CONTAINERS.replace_all(html, |caps: &Captures| {
        let attrs = caps.get(2).map_or("", |m| m.as_str().trim_end());
        format!("<{}{attrs}></{}>", &caps[1], &caps[1])
    });
    PAIRED_SOURCE
        .replace_all(&html, |caps: &Captures| {
            let attrs = caps.get(1).map_or("", |m| m.as_str().trim_end());
            format!("<source{attrs} />")
        })
        .into_owned()
}

/// Serialize a single node recursively.
///
/// Void elements are written self-closed, every other element as an
/// open/close pair. `raw` is set for the children of raw-text elements,
/// whose text is written unescaped.
fn serialize_node(doc: &Document, id: NodeId, raw: bool, out: &mut String) {
    match doc.data(id) {
        NodeData::Root => {
            for &child in doc.children(id) {
                serialize_node(doc, child, false, out);
            }
        }
        NodeData::Element(element) => {
            out.push('<');
            out.push_str(element.tag());
            for (key, value) in element.attrs() {
                write!(out, r#" {key}="{}""#, escape_attr(value)).unwrap();
            }

            if is_void(element.tag()) {
                out.push_str(" />");
                return;
            }
            out.push('>');
            let raw = is_raw_text(element.tag());
            for &child in doc.children(id) {
                serialize_node(doc, child, raw, out);
            }
            write!(out, "</{}>", element.tag()).unwrap();
        }
        NodeData::Text(text) if raw => out.push_str(text),
        NodeData::Text(text) => escape_text(text, out),
        NodeData::Comment(body) => write!(out, "<!--{body}-->").unwrap(),
        NodeData::Doctype(verbatim) | NodeData::Raw(verbatim) => out.push_str(verbatim),
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

/// Escape an attribute value for a double-quoted attribute.
fn escape_attr(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '\u{a0}' => result.push_str("&nbsp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(ch),
        }
    }
    result
}
