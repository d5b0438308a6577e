//! Nested resolution contexts.
//!
//! A [`ContextStack`] holds the frames that relative references resolve
//! against. Each [`Frame`] pairs the current context URL with the site root
//! that bounds in-site membership while the frame is active. The site root
//! is fixed when the frame is pushed: either passed explicitly or taken from
//! the stack's configured default.

use std::cell::RefCell;

use crate::url::Url;

/// One pushed resolution scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Base URL for relative and partial references.
    pub context: Url,
    /// Site root active while this frame is on top.
    pub site: Option<Url>,
}

/// Stack of resolution scopes for one logical call stack.
///
/// Uses interior mutability so that URL parsing (which only reads the
/// stack) can happen while a [`ContextGuard`] is alive. The stack is not
/// `Sync`; each thread owns its own.
#[derive(Debug, Default)]
pub struct ContextStack {
    frames: RefCell<Vec<Frame>>,
    default_site: Option<Url>,
    server_port: Option<u16>,
}

impl ContextStack {
    /// Create an empty stack with no site root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the site root used by frames pushed without an explicit one, and
    /// when no frame is active.
    #[must_use]
    pub fn with_site(mut self, site: Url) -> Self {
        self.default_site = Some(site);
        self
    }

    /// Set the port the server listens on, used for URLs with no scheme.
    #[must_use]
    pub fn with_server_port(mut self, port: u16) -> Self {
        self.server_port = Some(port);
        self
    }

    /// Push a frame whose site root is the stack's default site.
    pub fn begin_context(&self, context: Url) {
        let site = self.default_site.clone();
        self.begin_context_with_site(context, site);
    }

    /// Push a frame with an explicit site root.
    pub fn begin_context_with_site(&self, context: Url, site: Option<Url>) {
        tracing::trace!(context = %context, depth = self.depth() + 1, "Begin URL context");
        self.frames.borrow_mut().push(Frame { context, site });
    }

    /// Pop the top frame. Returns `None` when the stack is already empty.
    pub fn end_context(&self) -> Option<Frame> {
        let frame = self.frames.borrow_mut().pop();
        if let Some(frame) = &frame {
            tracing::trace!(context = %frame.context, depth = self.depth(), "End URL context");
        }
        frame
    }

    /// Push a frame that is popped when the returned guard drops.
    #[must_use = "the context is popped as soon as the guard is dropped"]
    pub fn enter(&self, context: Url) -> ContextGuard<'_> {
        self.begin_context(context);
        ContextGuard { stack: self }
    }

    /// Like [`enter`](Self::enter), with an explicit site root.
    #[must_use = "the context is popped as soon as the guard is dropped"]
    pub fn enter_with_site(&self, context: Url, site: Option<Url>) -> ContextGuard<'_> {
        self.begin_context_with_site(context, site);
        ContextGuard { stack: self }
    }

    /// URL of the top frame.
    #[must_use]
    pub fn context(&self) -> Option<Url> {
        self.frames.borrow().last().map(|f| f.context.clone())
    }

    /// Site root of the top frame, or the default site when no frame is active.
    #[must_use]
    pub fn site(&self) -> Option<Url> {
        match self.frames.borrow().last() {
            Some(frame) => frame.site.clone(),
            None => self.default_site.clone(),
        }
    }

    /// Configured server port.
    #[must_use]
    pub fn server_port(&self) -> Option<u16> {
        self.server_port
    }

    /// Number of active frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Compare the requested URL with the canonical form of `url`.
    ///
    /// The canonical form applies the trailing-slash policy
    /// ([`Url::fix_slashes`]), drops the fragment and removes empty `~/`
    /// namespace segments. The requested URL is the current context, or
    /// `url` itself when no frame is active. Returns the canonical URL when
    /// the two differ, meaning the caller should redirect to it.
    #[must_use]
    pub fn normalize_current(&self, url: &Url) -> Option<Url> {
        let mut canonical = url.clone().with_fragment("");
        canonical.strip_empty_namespaces();
        canonical.fix_slashes();

        let requested = self
            .context()
            .unwrap_or_else(|| url.clone())
            .with_fragment("");

        (requested != canonical).then_some(canonical)
    }
}

/// Pops its frame from the [`ContextStack`] on drop.
#[derive(Debug)]
pub struct ContextGuard<'a> {
    stack: &'a ContextStack,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.stack.end_context();
    }
}
