//! Document transformation.
//!
//! [`Transformer::transform`] parses markup, walks the tree depth-first
//! dispatching events for every element, text and comment node, applies the
//! deletions and replacements listeners ask for, and serializes the result.
//!
//! While walking, two kinds of markup change the resolution context:
//! - an element carrying the context attribute (`data-url-context` by
//!   default) is walked, with its subtree, inside a frame for that URL
//! - a `<!--@beginContext: URL-->` comment opens a frame for the siblings
//!   that follow it, closed by `<!--@endContext-->` or when the parent's
//!   children run out
//!
//! An element whose events attribute (`data-dom-events`) is `off` is left
//! alone along with everything inside it.

use std::sync::LazyLock;

use regex::Regex;
use weft_url::{ContextGuard, ContextStack, Url};

use crate::bus::{EventBus, HookPoint};
use crate::error::TransformError;
use crate::event::{DomEvent, EventKey, Mode};
use crate::parser::{parse, parse_fragment};
use crate::serializer::{apply_fixups, body_html, to_html};
use crate::tree::{Document, Element, NodeData, NodeId};

/// `@beginContext: URL` comment body.
static BEGIN_CONTEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@beginContext:(.+)$").expect("invalid begin context regex"));

/// `@endContext` comment body.
const END_CONTEXT: &str = "@endContext";

/// Default limit on nested replacements.
const DEFAULT_MAX_REPLACEMENT_DEPTH: usize = 10;

/// Value of the events attribute that disables a subtree.
const EVENTS_OFF: &str = "off";

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformConfig {
    /// How many times replacement markup may itself be replaced.
    ///
    /// Nodes from the input are at depth 0; markup a listener puts in their
    /// place is at depth 1, and so on. Replacement markup beyond the limit
    /// is inserted without being walked.
    ///
    /// Default: 10
    pub max_replacement_depth: usize,
    /// Attribute that disables events for a subtree when set to `off`.
    ///
    /// Default: `data-dom-events`
    pub events_attribute: String,
    /// Attribute declaring the resolution context of a subtree.
    ///
    /// Default: `data-url-context`
    pub context_attribute: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            max_replacement_depth: DEFAULT_MAX_REPLACEMENT_DEPTH,
            events_attribute: "data-dom-events".to_owned(),
            context_attribute: "data-url-context".to_owned(),
        }
    }
}

impl TransformConfig {
    #[must_use]
    pub fn with_max_replacement_depth(mut self, depth: usize) -> Self {
        self.max_replacement_depth = depth;
        self
    }

    #[must_use]
    pub fn with_events_attribute(mut self, name: impl Into<String>) -> Self {
        self.events_attribute = name.into();
        self
    }

    #[must_use]
    pub fn with_context_attribute(mut self, name: impl Into<String>) -> Self {
        self.context_attribute = name.into();
        self
    }
}

/// Markup transformation engine.
///
/// Holds the listeners and settings; each [`transform`](Self::transform)
/// call owns its own tree, so one transformer can serve many documents.
///
/// # Example
///
/// ```
/// use weft_dom::{EventBus, EventKey, Mode, Transformer};
/// use weft_url::ContextStack;
///
/// let mut bus = EventBus::new();
/// bus.on(EventKey::element("em"), |event| {
///     event.set_replacement(format!("<i>{}</i>", event.document().text_content(event.node())));
///     Ok(())
/// });
///
/// let transformer = Transformer::new(bus);
/// let html = transformer
///     .transform(&ContextStack::new(), "<p>a <em>b</em></p>", Mode::Fragment)
///     .unwrap();
/// assert_eq!(html, "<p>a <i>b</i></p>");
/// ```
#[derive(Debug)]
pub struct Transformer {
    bus: EventBus,
    config: TransformConfig,
}

impl Transformer {
    /// Create a transformer with default settings.
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            config: TransformConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: TransformConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Transform markup under the given resolution contexts.
    ///
    /// The markup is parsed as a whole document; [`Mode::Fragment`] returns
    /// only the content of its `body`. Markup that cannot be parsed is
    /// returned as it came out of the
    /// [`HookPoint::BeforeParse`] hooks. The context stack is left as it was
    /// found, whether the transform succeeds or fails.
    ///
    /// # Errors
    ///
    /// - [`TransformError::Listener`] when a listener fails
    /// - [`TransformError::Context`] for an unusable context declaration
    pub fn transform(
        &self,
        contexts: &ContextStack,
        markup: &str,
        mode: Mode,
    ) -> Result<String, TransformError> {
        let markup = self.bus.dispatch_all(HookPoint::BeforeParse, markup.to_owned());

        let doc = match parse(&markup) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!(error = %e, "Markup not parseable, passing through");
                return Ok(markup);
            }
        };

        let mut walk = Walk {
            transformer: self,
            contexts,
            mode,
            doc,
        };
        let root = walk.doc.root();
        walk.visit_children(root, 0)?;

        let html = match mode {
            Mode::Document => to_html(&walk.doc),
            Mode::Fragment => body_html(&walk.doc),
        };
        Ok(self.bus.dispatch_all(HookPoint::AfterSerialize, apply_fixups(&html)))
    }
}

/// State of one transform.
struct Walk<'a> {
    transformer: &'a Transformer,
    contexts: &'a ContextStack,
    mode: Mode,
    doc: Document,
}

impl<'a> Walk<'a> {
    /// Visit the children of `parent` from a snapshot of the child list.
    ///
    /// Context comments among the children open frames that stay active for
    /// the following siblings and are all closed before returning.
    fn visit_children(&mut self, parent: NodeId, depth: usize) -> Result<(), TransformError> {
        let children = self.doc.children(parent).to_vec();
        let mut frames: Vec<ContextGuard<'a>> = Vec::new();

        for child in children {
            // An earlier sibling's listener may have removed or replaced it.
            if self.doc.parent(child) != Some(parent) {
                continue;
            }
            if let NodeData::Comment(body) = self.doc.data(child) {
                match context_marker(body) {
                    Some(Marker::Begin(url)) => {
                        let url = self.parse_context(&url)?;
                        let contexts = self.contexts;
                        frames.push(contexts.enter(url));
                    }
                    Some(Marker::End) => drop(frames.pop()),
                    None => {}
                }
            }
            self.visit(child, depth)?;
        }
        Ok(())
    }

    fn visit(&mut self, id: NodeId, depth: usize) -> Result<(), TransformError> {
        let mut frame = None;
        if let Some(element) = self.doc.element(id) {
            let config = &self.transformer.config;
            if element.attr(&config.events_attribute) == Some(EVENTS_OFF) {
                return Ok(());
            }
            if let Some(context) = element.attr(&config.context_attribute) {
                let context = context.to_owned();
                let url = self.parse_context(&context)?;
                let contexts = self.contexts;
                frame = Some(contexts.enter(url));
            }
        }

        let result = self.dispatch_node(id, depth);
        drop(frame);
        result
    }

    /// Dispatch the node's events, apply the outcome, then walk its children.
    fn dispatch_node(&mut self, id: NodeId, depth: usize) -> Result<(), TransformError> {
        let Some(keys) = EventKey::for_node(self.doc.data(id), self.mode) else {
            return Ok(());
        };
        let bus = &self.transformer.bus;

        for key in keys {
            let mut event = DomEvent::new(&mut self.doc, id, bus, self.contexts, self.mode);
            bus.dispatch(&key, &mut event)
                .map_err(|source| TransformError::Listener {
                    key: key.to_string(),
                    source,
                })?;
            let (delete, replacement) = event.into_outcome();

            if delete {
                self.doc.detach(id);
                return Ok(());
            }
            // Unparseable replacement markup leaves the node as it was and
            // dispatch carries on with the next key.
            let fragment = replacement.and_then(|markup| self.parse_replacement(id, &key, &markup));
            if let Some(fragment) = fragment {
                return self.replace(id, &key, fragment, depth);
            }
        }

        self.visit_children(id, depth)
    }

    /// Parse replacement markup as content of the node's parent.
    fn parse_replacement(&self, id: NodeId, key: &EventKey, markup: &str) -> Option<Document> {
        let context = self
            .doc
            .parent(id)
            .and_then(|parent| self.doc.element(parent))
            .map_or("body", Element::tag);
        match parse_fragment(markup, context) {
            Ok(fragment) => Some(fragment),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding unparseable replacement");
                None
            }
        }
    }

    /// Swap `id` for `fragment` and walk the new nodes one level deeper.
    fn replace(
        &mut self,
        id: NodeId,
        key: &EventKey,
        fragment: Document,
        depth: usize,
    ) -> Result<(), TransformError> {
        let inserted = self.doc.replace_with(id, fragment);
        let depth = depth + 1;
        if depth > self.transformer.config.max_replacement_depth {
            tracing::warn!(
                key = %key,
                depth,
                max = self.transformer.config.max_replacement_depth,
                "Replacement depth limit reached, not walking replacement"
            );
            return Ok(());
        }

        for node in inserted {
            if self.doc.is_attached(node) {
                self.visit(node, depth)?;
            }
        }
        Ok(())
    }

    fn parse_context(&self, url: &str) -> Result<Url, TransformError> {
        Url::parse(url, self.contexts).map_err(|source| TransformError::Context {
            url: url.to_owned(),
            source,
        })
    }
}

enum Marker {
    Begin(String),
    End,
}

fn context_marker(comment: &str) -> Option<Marker> {
    let body = comment.trim();
    if body == END_CONTEXT {
        return Some(Marker::End);
    }
    BEGIN_CONTEXT
        .captures(body)
        .map(|caps| Marker::Begin(caps[1].trim().to_owned()))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::ListenerError;
    use crate::parser::MAX_NESTING_DEPTH;
    use pretty_assertions::assert_eq;
    use static_assertions::assert_impl_all;

    assert_impl_all!(Transformer: Send, Sync);

    type Log = Arc<Mutex<Vec<String>>>;

    fn transform(bus: EventBus, markup: &str, mode: Mode) -> String {
        Transformer::new(bus)
            .transform(&ContextStack::new(), markup, mode)
            .unwrap()
    }

    fn site_contexts() -> ContextStack {
        let site = Url::parse("https://example.com/", &ContextStack::new()).unwrap();
        ContextStack::new().with_site(site)
    }

    /// Record `label` plus the tag or text of every dispatch of `key`.
    fn record(bus: &mut EventBus, log: &Log, key: EventKey, label: &'static str) {
        let log = Arc::clone(log);
        bus.on(key, move |event| {
            let what = match event.data() {
                NodeData::Element(el) => el.tag().to_owned(),
                NodeData::Text(text) => text.clone(),
                NodeData::Comment(body) => body.clone(),
                _ => String::new(),
            };
            log.lock().unwrap().push(format!("{label}:{what}"));
            Ok(())
        });
    }

    #[test]
    fn test_fragment_returns_body_content() {
        let html = transform(
            EventBus::new(),
            r#"<html><body>Hi <a href="/x">x</a></body></html>"#,
            Mode::Fragment,
        );
        assert_eq!(html, r#"Hi <a href="/x">x</a>"#);
    }

    #[test]
    fn test_document_returns_whole_tree() {
        let html = transform(
            EventBus::new(),
            r#"<!DOCTYPE html><html><head><title>T</title></head><body>Hi <a href="/x">x</a></body></html>"#,
            Mode::Document,
        );
        assert_eq!(
            html,
            r#"<!DOCTYPE html><html><head><title>T</title></head><body>Hi <a href="/x">x</a></body></html>"#
        );
    }

    #[test]
    fn test_unparseable_markup_passes_through() {
        let markup = "<div>".repeat(MAX_NESTING_DEPTH + 1);
        assert_eq!(transform(EventBus::new(), &markup, Mode::Fragment), markup);
    }

    #[test]
    fn test_less_than_in_text_keeps_following_markup() {
        let html = transform(
            EventBus::new(),
            r#"<p>1 < 2 and <a href="/x">x</a></p>"#,
            Mode::Fragment,
        );
        assert_eq!(html, r#"<p>1 &lt; 2 and <a href="/x">x</a></p>"#);
    }

    #[test]
    fn test_empty_elements_are_not_self_closed() {
        let html = transform(
            EventBus::new(),
            r#"<p>icon <i class="fa fa-home"></i> home</p><table><tr><td></td></tr></table>"#,
            Mode::Fragment,
        );
        assert_eq!(
            html,
            r#"<p>icon <i class="fa fa-home"></i> home</p><table><tbody><tr><td></td></tr></tbody></table>"#
        );
    }

    #[test]
    fn test_fragment_mode_accepts_bare_fragments() {
        let html = transform(EventBus::new(), "<p>a</p>text", Mode::Fragment);
        assert_eq!(html, "<p>a</p>text");
    }

    #[test]
    fn test_events_are_pre_order_with_mode_variant_second() {
        let log = Log::default();
        let mut bus = EventBus::new();
        record(&mut bus, &log, EventKey::element("p"), "p");
        record(&mut bus, &log, EventKey::element("p").in_mode(Mode::Fragment), "p-frag");
        record(&mut bus, &log, EventKey::element("p").in_mode(Mode::Document), "p-doc");
        record(&mut bus, &log, EventKey::element("b"), "b");
        record(&mut bus, &log, EventKey::text(), "text");
        record(&mut bus, &log, EventKey::comment(), "comment");

        transform(bus, "<p>one<b>two</b><!--c--></p>", Mode::Fragment);
        assert_eq!(
            *log.lock().unwrap(),
            ["p:p", "p-frag:p", "text:one", "b:b", "text:two", "comment:c"]
        );
    }

    #[test]
    fn test_delete_removes_subtree() {
        let log = Log::default();
        let mut bus = EventBus::new();
        bus.on(EventKey::element("aside"), |event| {
            event.set_delete(true);
            Ok(())
        });
        record(&mut bus, &log, EventKey::element("p"), "p");

        let html = transform(bus, "<div><aside><p>gone</p></aside><p>kept</p></div>", Mode::Fragment);
        assert_eq!(html, "<div><p>kept</p></div>");
        assert_eq!(*log.lock().unwrap(), ["p:p"]);
    }

    #[test]
    fn test_delete_stops_mode_variant() {
        let log = Log::default();
        let mut bus = EventBus::new();
        bus.on(EventKey::element("span"), |event| {
            event.set_delete(true);
            Ok(())
        });
        record(&mut bus, &log, EventKey::element("span").in_mode(Mode::Fragment), "late");

        let html = transform(bus, "<p>a<span>b</span></p>", Mode::Fragment);
        assert_eq!(html, "<p>a</p>");
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_replacement_nodes_are_dispatched() {
        let log = Log::default();
        let mut bus = EventBus::new();
        bus.on(EventKey::element("widget"), |event| {
            event.set_replacement("<section><h2>Title</h2></section><p>after</p>");
            Ok(())
        });
        record(&mut bus, &log, EventKey::element("h2"), "h2");
        record(&mut bus, &log, EventKey::element("p"), "p");

        let html = transform(bus, "<div><widget/></div>", Mode::Fragment);
        assert_eq!(html, "<div><section><h2>Title</h2></section><p>after</p></div>");
        assert_eq!(*log.lock().unwrap(), ["h2:h2", "p:p"]);
    }

    #[test]
    fn test_replacement_in_mode_variant() {
        let mut bus = EventBus::new();
        bus.on(EventKey::element("x").in_mode(Mode::Document), |event| {
            event.set_replacement("<y></y>");
            Ok(())
        });
        let html = transform(bus, "<x></x>", Mode::Document);
        assert_eq!(html, "<html><head></head><body><y></y></body></html>");
    }

    #[test]
    fn test_empty_replacement_removes_node() {
        let mut bus = EventBus::new();
        bus.on(EventKey::element("b"), |event| {
            event.set_replacement("");
            Ok(())
        });
        let html = transform(bus, "<div><b>x</b></div>", Mode::Fragment);
        assert_eq!(html, "<div></div>");
    }

    #[test]
    fn test_unparseable_replacement_keeps_node() {
        let log = Log::default();
        let mut bus = EventBus::new();
        bus.on(EventKey::element("b"), |event| {
            event.set_replacement("<div>".repeat(MAX_NESTING_DEPTH + 1));
            Ok(())
        });
        record(&mut bus, &log, EventKey::text(), "text");

        let html = transform(bus, "<p><b>bold</b></p>", Mode::Fragment);
        assert_eq!(html, "<p><b>bold</b></p>");
        assert_eq!(*log.lock().unwrap(), ["text:bold"]);
    }

    #[test]
    fn test_unparseable_replacement_still_dispatches_mode_variant() {
        let log = Log::default();
        let mut bus = EventBus::new();
        bus.on(EventKey::element("b"), |event| {
            event.set_replacement("<div>".repeat(MAX_NESTING_DEPTH + 1));
            Ok(())
        });
        record(&mut bus, &log, EventKey::element("b").in_mode(Mode::Fragment), "b-frag");
        bus.on(EventKey::element("b").in_mode(Mode::Fragment), |event| {
            event.set_replacement("<strong>bold</strong>");
            Ok(())
        });

        let html = transform(bus, "<p><b>bold</b></p>", Mode::Fragment);
        assert_eq!(html, "<p><strong>bold</strong></p>");
        assert_eq!(*log.lock().unwrap(), ["b-frag:b"]);
    }

    #[test]
    fn test_replacement_is_parsed_in_parent_context() {
        let mut bus = EventBus::new();
        bus.on(EventKey::element("td"), |event| {
            if event.attr("class") == Some("split") {
                event.set_replacement("<td>a</td><td>b</td>");
            }
            Ok(())
        });
        let html = transform(
            bus,
            r#"<table><tr><td class="split"></td></tr></table>"#,
            Mode::Fragment,
        );
        assert_eq!(html, "<table><tbody><tr><td>a</td><td>b</td></tr></tbody></table>");
    }

    #[test]
    fn test_replacement_depth_is_bounded() {
        let count = Arc::new(Mutex::new(0_usize));
        let seen = Arc::clone(&count);
        let mut bus = EventBus::new();
        bus.on(EventKey::element("loop"), move |event| {
            *seen.lock().unwrap() += 1;
            event.set_replacement("<loop></loop>");
            Ok(())
        });

        let transformer = Transformer::new(bus)
            .with_config(TransformConfig::default().with_max_replacement_depth(3));
        let html = transformer
            .transform(&ContextStack::new(), "<loop></loop>", Mode::Fragment)
            .unwrap();

        // Depth 0 plus three nested replacements get dispatched.
        assert_eq!(*count.lock().unwrap(), 4);
        assert_eq!(html, "<loop></loop>");
    }

    #[test]
    fn test_sibling_snapshot_survives_mutation() {
        let log = Log::default();
        let mut bus = EventBus::new();
        // The first item deletes its next sibling; the walk must skip it.
        bus.on(EventKey::element("li"), |event| {
            if event.attr("id") == Some("first") {
                let node = event.node();
                let doc = event.document_mut();
                let parent = doc.parent(node).unwrap();
                let next = doc.children(parent)[1];
                doc.detach(next);
            }
            Ok(())
        });
        record(&mut bus, &log, EventKey::text(), "text");

        let html = transform(
            bus,
            r#"<ul><li id="first">1</li><li>2</li><li>3</li></ul>"#,
            Mode::Fragment,
        );
        assert_eq!(html, r#"<ul><li id="first">1</li><li>3</li></ul>"#);
        assert_eq!(*log.lock().unwrap(), ["text:1", "text:3"]);
    }

    #[test]
    fn test_events_off_skips_subtree() {
        let log = Log::default();
        let mut bus = EventBus::new();
        record(&mut bus, &log, EventKey::element("p"), "p");

        transform(
            bus,
            r#"<div data-dom-events="off"><p>skip</p></div><p>visit</p>"#,
            Mode::Fragment,
        );
        assert_eq!(*log.lock().unwrap(), ["p:p"]);
    }

    #[test]
    fn test_custom_events_attribute() {
        let log = Log::default();
        let mut bus = EventBus::new();
        record(&mut bus, &log, EventKey::element("p"), "p");

        let transformer = Transformer::new(bus)
            .with_config(TransformConfig::default().with_events_attribute("data-skip"));
        transformer
            .transform(&ContextStack::new(), r#"<div data-skip="off"><p>x</p></div>"#, Mode::Fragment)
            .unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_listener_error_aborts_transform() {
        let mut bus = EventBus::new();
        bus.on(EventKey::element("b"), |_| Err(ListenerError::new("nope")));

        let contexts = ContextStack::new();
        let err = Transformer::new(bus)
            .transform(&contexts, "<p><b>x</b></p>", Mode::Fragment)
            .unwrap_err();
        assert!(matches!(err, TransformError::Listener { ref key, .. } if key == "element:b"));
    }

    /// Record the resolved path of each anchor's href.
    fn record_hrefs(bus: &mut EventBus, log: &Log) {
        let log = Arc::clone(log);
        bus.on(EventKey::element("a"), move |event| {
            let href = event.attr("href").unwrap_or_default().to_owned();
            let url = Url::parse(&href, event.contexts())
                .map_err(|e| ListenerError::new("bad href").with_source(e))?;
            log.lock().unwrap().push(url.path().to_owned());
            Ok(())
        });
    }

    #[test]
    fn test_context_attribute_scopes_subtree() {
        let log = Log::default();
        let mut bus = EventBus::new();
        record_hrefs(&mut bus, &log);

        let contexts = site_contexts();
        contexts.begin_context(Url::parse("https://example.com/page/", &contexts).unwrap());
        Transformer::new(bus)
            .transform(
                &contexts,
                r#"<div data-url-context="https://example.com/blog/post/"><a href="img.png">i</a></div><a href="x">x</a>"#,
                Mode::Fragment,
            )
            .unwrap();

        assert_eq!(*log.lock().unwrap(), ["/blog/post/img.png", "/page/x"]);
        assert_eq!(contexts.depth(), 1);
    }

    #[test]
    fn test_context_comments_scope_following_siblings() {
        let log = Log::default();
        let mut bus = EventBus::new();
        record_hrefs(&mut bus, &log);

        let contexts = site_contexts();
        contexts.begin_context(Url::parse("https://example.com/", &contexts).unwrap());
        Transformer::new(bus)
            .transform(
                &contexts,
                concat!(
                    r#"<div><a href="a">1</a>"#,
                    "<!--@beginContext: https://example.com/docs/-->",
                    r#"<a href="b">2</a><p><a href="c">3</a></p>"#,
                    "<!--@endContext-->",
                    r#"<a href="d">4</a></div>"#,
                ),
                Mode::Fragment,
            )
            .unwrap();

        assert_eq!(*log.lock().unwrap(), ["/a", "/docs/b", "/docs/c", "/d"]);
        assert_eq!(contexts.depth(), 1);
    }

    #[test]
    fn test_unclosed_context_comment_ends_with_parent() {
        let log = Log::default();
        let mut bus = EventBus::new();
        record_hrefs(&mut bus, &log);

        let contexts = site_contexts();
        contexts.begin_context(Url::parse("https://example.com/", &contexts).unwrap());
        Transformer::new(bus)
            .transform(
                &contexts,
                r#"<div><!--@beginContext: /inner/--><a href="a">1</a></div><a href="b">2</a>"#,
                Mode::Fragment,
            )
            .unwrap();

        assert_eq!(*log.lock().unwrap(), ["/inner/a", "/b"]);
        assert_eq!(contexts.depth(), 1);
    }

    #[test]
    fn test_stray_end_context_comment_does_not_pop_outer_frames() {
        let contexts = site_contexts();
        contexts.begin_context(Url::parse("https://example.com/", &contexts).unwrap());
        Transformer::new(EventBus::new())
            .transform(&contexts, "<p><!--@endContext--></p>", Mode::Fragment)
            .unwrap();
        assert_eq!(contexts.depth(), 1);
    }

    #[test]
    fn test_invalid_context_is_an_error_and_stack_is_restored() {
        let contexts = site_contexts();
        let err = Transformer::new(EventBus::new())
            .transform(
                &contexts,
                r#"<div data-url-context="https://example.com/a/"><p data-url-context="ftp://nope/">x</p></div>"#,
                Mode::Fragment,
            )
            .unwrap_err();
        assert!(matches!(err, TransformError::Context { ref url, .. } if url == "ftp://nope/"));
        assert_eq!(contexts.depth(), 0);
    }

    #[test]
    fn test_listener_error_restores_context_stack() {
        let mut bus = EventBus::new();
        bus.on(EventKey::element("b"), |_| Err(ListenerError::new("fail")));
        let contexts = site_contexts();
        let result = Transformer::new(bus).transform(
            &contexts,
            r#"<div data-url-context="/x/"><!--@beginContext: /y/--><b>x</b></div>"#,
            Mode::Fragment,
        );
        assert!(result.is_err());
        assert_eq!(contexts.depth(), 0);
    }

    #[test]
    fn test_text_hooks_wrap_the_transform() {
        let mut bus = EventBus::new();
        bus.on_text(HookPoint::BeforeParse, |text| text.replace("{{name}}", "Weft"))
            .on_text(HookPoint::AfterSerialize, |text| format!("{text}<!-- done -->"));
        let html = transform(bus, "<p>{{name}}</p>", Mode::Fragment);
        assert_eq!(html, "<p>Weft</p><!-- done -->");
    }

    #[test]
    fn test_output_fixups_applied() {
        let html = transform(EventBus::new(), r#"<a id="top"></a><div></div><br>"#, Mode::Fragment);
        assert_eq!(html, r#"<a id="top"></a><div></div><br />"#);
    }
}
