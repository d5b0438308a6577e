//! Ordered, typed event bus.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ListenerError;
use crate::event::{DomEvent, EventKey};

/// Handler for node events.
///
/// Closures of the form `Fn(&mut DomEvent<'_>) -> Result<(), ListenerError>`
/// implement this trait.
pub trait Listener: Send + Sync {
    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Any error aborts the transform that dispatched the event.
    fn handle(&self, event: &mut DomEvent<'_>) -> Result<(), ListenerError>;
}

impl<F> Listener for F
where
    F: Fn(&mut DomEvent<'_>) -> Result<(), ListenerError> + Send + Sync,
{
    fn handle(&self, event: &mut DomEvent<'_>) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Points in a transform where whole-text hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// On the raw input, before it is parsed.
    BeforeParse,
    /// On the final output, after serialization and fixups.
    AfterSerialize,
}

/// Whole-text hook: takes the markup and returns the new markup.
pub type TextHook = dyn Fn(String) -> String + Send + Sync;

/// Registry of listeners and text hooks.
///
/// Listeners for the same key run in registration order.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<EventKey, Vec<Arc<dyn Listener>>>,
    hooks: HashMap<HookPoint, Vec<Box<TextHook>>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure for `key`.
    pub fn on<F>(&mut self, key: EventKey, listener: F) -> &mut Self
    where
        F: Fn(&mut DomEvent<'_>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.add_listener(key, Arc::new(listener))
    }

    /// Register a listener object for `key`.
    pub fn add_listener(&mut self, key: EventKey, listener: Arc<dyn Listener>) -> &mut Self {
        self.listeners.entry(key).or_default().push(listener);
        self
    }

    /// Register a text hook.
    pub fn on_text<F>(&mut self, point: HookPoint, hook: F) -> &mut Self
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        self.hooks.entry(point).or_default().push(Box::new(hook));
        self
    }

    /// Run the listeners registered for `key`, in order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first listener failure.
    pub fn dispatch(&self, key: &EventKey, event: &mut DomEvent<'_>) -> Result<(), ListenerError> {
        let Some(listeners) = self.listeners.get(key) else {
            return Ok(());
        };
        for listener in listeners {
            listener.handle(event)?;
        }
        Ok(())
    }

    /// Thread `text` through every hook registered at `point`.
    pub fn dispatch_all(&self, point: HookPoint, text: String) -> String {
        self.hooks
            .get(&point)
            .into_iter()
            .flatten()
            .fold(text, |text, hook| hook(text))
    }

    /// Number of listeners registered for `key`.
    #[must_use]
    pub fn listener_count(&self, key: &EventKey) -> usize {
        self.listeners.get(key).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.listeners.keys().map(ToString::to_string).collect();
        keys.sort();
        f.debug_struct("EventBus")
            .field("keys", &keys)
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}
