//! Event keys and the event passed to listeners.

use std::fmt;
use std::sync::Arc;

use weft_site::{Asset, Page};
use weft_url::ContextStack;

use crate::bus::EventBus;
use crate::error::ListenerError;
use crate::serializer::outer_html;
use crate::tree::{Document, Element, NodeData, NodeId};

/// What a transform produces: a whole document or the body content only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Document,
    Fragment,
}

impl Mode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Fragment => "fragment",
        }
    }
}

/// Node kind an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// An element with this (lowercase) tag.
    Element(String),
    Text,
    Comment,
}

/// Which event for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Fired for every node of the target kind.
    Base,
    /// Fired right after [`Variant::Base`], only in the given mode.
    Mode(Mode),
    /// A link on the element resolved to a page.
    Page,
    /// A link on the element resolved to an asset.
    Asset,
    /// A link on the element resolved to an image asset.
    Image,
}

/// Typed name of an event.
///
/// ```
/// use weft_dom::{EventKey, Mode};
///
/// assert_eq!(EventKey::element("A").to_string(), "element:a");
/// assert_eq!(EventKey::text().in_mode(Mode::Fragment).to_string(), "text:fragment");
/// assert_eq!(EventKey::image("img").to_string(), "element:img:image");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    target: Target,
    variant: Variant,
}

impl EventKey {
    /// Base event for elements with `tag`.
    #[must_use]
    pub fn element(tag: &str) -> Self {
        Self::new(Target::Element(tag.to_ascii_lowercase()), Variant::Base)
    }

    #[must_use]
    pub fn text() -> Self {
        Self::new(Target::Text, Variant::Base)
    }

    #[must_use]
    pub fn comment() -> Self {
        Self::new(Target::Comment, Variant::Base)
    }

    /// Page-link event for `tag`.
    #[must_use]
    pub fn page(tag: &str) -> Self {
        Self::element(tag).with_variant(Variant::Page)
    }

    /// Asset-link event for `tag`.
    #[must_use]
    pub fn asset(tag: &str) -> Self {
        Self::element(tag).with_variant(Variant::Asset)
    }

    /// Image-link event for `tag`.
    #[must_use]
    pub fn image(tag: &str) -> Self {
        Self::element(tag).with_variant(Variant::Image)
    }

    /// Mode-qualified variant of this key.
    #[must_use]
    pub fn in_mode(self, mode: Mode) -> Self {
        self.with_variant(Variant::Mode(mode))
    }

    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Keys dispatched for a node during a walk: base first, then the
    /// mode-qualified one. Empty for nodes that get no events.
    pub(crate) fn for_node(data: &NodeData, mode: Mode) -> Option<[Self; 2]> {
        let base = match data {
            NodeData::Element(element) => Self::element(element.tag()),
            NodeData::Text(_) => Self::text(),
            NodeData::Comment(_) => Self::comment(),
            NodeData::Root | NodeData::Doctype(_) | NodeData::Raw(_) => return None,
        };
        let qualified = base.clone().in_mode(mode);
        Some([base, qualified])
    }

    fn new(target: Target, variant: Variant) -> Self {
        Self { target, variant }
    }

    fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Element(tag) => write!(f, "element:{tag}")?,
            Target::Text => f.write_str("text")?,
            Target::Comment => f.write_str("comment")?,
        }
        match self.variant {
            Variant::Base => Ok(()),
            Variant::Mode(mode) => write!(f, ":{}", mode.as_str()),
            Variant::Page => f.write_str(":page"),
            Variant::Asset => f.write_str(":asset"),
            Variant::Image => f.write_str(":image"),
        }
    }
}

/// What a link on the event's element resolved to.
#[derive(Debug, Clone)]
pub enum Source {
    Page(Arc<Page>),
    Asset(Arc<Asset>),
}

impl Source {
    #[must_use]
    pub fn as_page(&self) -> Option<&Page> {
        match self {
            Self::Page(page) => Some(page),
            Self::Asset(_) => None,
        }
    }

    #[must_use]
    pub fn as_asset(&self) -> Option<&Asset> {
        match self {
            Self::Asset(asset) => Some(asset),
            Self::Page(_) => None,
        }
    }

    /// Whether this is an asset with the image capability.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.as_asset().is_some_and(|asset| asset.as_image().is_some())
    }
}

/// Event handed to listeners for one node.
///
/// Listeners may edit the node in place through [`element_mut`](Self::element_mut)
/// or [`document_mut`](Self::document_mut), or ask the engine to delete or
/// replace it once the dispatch returns.
pub struct DomEvent<'a> {
    doc: &'a mut Document,
    node: NodeId,
    bus: &'a EventBus,
    contexts: &'a ContextStack,
    mode: Mode,
    source: Option<Source>,
    replacement: Option<String>,
    delete: bool,
}

impl<'a> DomEvent<'a> {
    /// Create an event for `node`.
    pub fn new(
        doc: &'a mut Document,
        node: NodeId,
        bus: &'a EventBus,
        contexts: &'a ContextStack,
        mode: Mode,
    ) -> Self {
        Self {
            doc,
            node,
            bus,
            contexts,
            mode,
            source: None,
            replacement: None,
            delete: false,
        }
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &*self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut *self.doc
    }

    #[must_use]
    pub fn data(&self) -> &NodeData {
        self.doc.data(self.node)
    }

    /// The target element, `None` for text and comment events.
    #[must_use]
    pub fn element(&self) -> Option<&Element> {
        self.doc.element(self.node)
    }

    pub fn element_mut(&mut self) -> Option<&mut Element> {
        self.doc.element_mut(self.node)
    }

    /// Tag of the target element, empty for non-elements.
    #[must_use]
    pub fn tag(&self) -> &str {
        self.element().map_or("", Element::tag)
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element().and_then(|el| el.attr(name))
    }

    /// Set an attribute on the target element. No-op for non-elements.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        if let Some(element) = self.element_mut() {
            element.set_attr(name, value);
        }
    }

    /// Serialized markup of the target node.
    #[must_use]
    pub fn outer_html(&self) -> String {
        outer_html(&*self.doc, self.node)
    }

    /// Resolution contexts active at this node.
    #[must_use]
    pub fn contexts(&self) -> &'a ContextStack {
        self.contexts
    }

    /// Bus the event came from, for dispatching follow-up events.
    #[must_use]
    pub fn bus(&self) -> &'a EventBus {
        self.bus
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn set_source(&mut self, source: Source) {
        self.source = Some(source);
    }

    /// Replace the node with `markup` once dispatch returns.
    pub fn set_replacement(&mut self, markup: impl Into<String>) {
        self.replacement = Some(markup.into());
    }

    #[must_use]
    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }

    /// Remove the node and its subtree once dispatch returns.
    pub fn set_delete(&mut self, delete: bool) {
        self.delete = delete;
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.delete
    }

    /// Dispatch `key` to its listeners with this same event.
    ///
    /// # Errors
    ///
    /// Returns the first listener failure.
    pub fn dispatch(&mut self, key: &EventKey) -> Result<(), ListenerError> {
        let bus = self.bus;
        bus.dispatch(key, self)
    }

    /// Consume the event, returning the delete flag and any replacement.
    pub(crate) fn into_outcome(self) -> (bool, Option<String>) {
        (self.delete, self.replacement)
    }
}

impl fmt::Debug for DomEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomEvent")
            .field("node", &self.node)
            .field("mode", &self.mode)
            .field("source", &self.source)
            .field("replacement", &self.replacement)
            .field("delete", &self.delete)
            .finish_non_exhaustive()
    }
}
