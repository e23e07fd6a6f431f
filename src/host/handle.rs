//! Weak reference to one component instance
//!
//! Hooks receive a handle; async tasks, timers and store subscribers keep a
//! clone of it. Every method tolerates the instance being gone: reads return
//! `None`, writes and renders become logged no-ops.
//!
//! A handle given to a hook is bound to that attachment. Once the instance
//! is detached, a clone kept by a task stays inert even after the instance
//! is attached again: the new attachment hands out new handles.

use super::{DocInner, Document, Node, NodeId};
use crate::component::{Attributes, Handled, Lifecycle};
use crate::store::{Store, StoreState};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Weak;
use std::time::Duration;

#[derive(Clone)]
pub struct ComponentHandle {
    doc: Weak<RefCell<DocInner>>,
    id: NodeId,
    /// Attachment this handle belongs to; `None` follows whichever is current
    epoch: Option<u64>,
}

impl std::fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("id", &self.id)
            .field("epoch", &self.epoch)
            .field("phase", &self.phase())
            .finish()
    }
}

impl ComponentHandle {
    pub(super) fn new(doc: Weak<RefCell<DocInner>>, id: NodeId) -> Self {
        Self {
            doc,
            id,
            epoch: None,
        }
    }

    pub(super) fn bound(doc: Weak<RefCell<DocInner>>, id: NodeId, epoch: u64) -> Self {
        Self {
            doc,
            id,
            epoch: Some(epoch),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    fn document(&self) -> Option<Document> {
        self.doc.upgrade().map(Document::from_inner)
    }

    fn with_node<R>(&self, f: impl FnOnce(&DocInner, &Node) -> R) -> Option<R> {
        let doc = self.doc.upgrade()?;
        let inner = doc.borrow();
        let node = inner.nodes.get(&self.id)?;
        Some(f(&inner, node))
    }

    fn with_node_mut<R>(&self, f: impl FnOnce(&mut Node) -> R) -> Option<R> {
        let doc = self.doc.upgrade()?;
        let mut inner = doc.borrow_mut();
        inner.nodes.get_mut(&self.id).map(f)
    }

    fn belongs_to(&self, node: &Node) -> bool {
        self.epoch.map_or(true, |epoch| epoch == node.epoch)
    }

    /// False for a handle left over from an earlier attachment
    fn is_current(&self) -> bool {
        let current = self.with_node(|_, node| self.belongs_to(node)).unwrap_or(false);
        if !current {
            tracing::debug!("Stale handle for {} ignored", self.id);
        }
        current
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// `None` once the instance has been destroyed
    pub fn phase(&self) -> Option<Lifecycle> {
        self.with_node(|_, node| node.phase)
    }

    /// Whether the instance is in the document, in the same attachment
    /// this handle was handed out for.
    ///
    /// Async work must check this before writing state or rendering.
    pub fn is_attached(&self) -> bool {
        self.with_node(|_, node| node.phase == Lifecycle::Attached && self.belongs_to(node))
            .unwrap_or(false)
    }

    pub fn tag(&self) -> Option<String> {
        self.with_node(|_, node| node.tag.clone())
    }

    /// Re-render this instance (full subtree replace)
    pub fn render(&self) {
        if !self.is_current() {
            return;
        }
        match self.document() {
            Some(doc) => doc.render(self.id),
            None => tracing::debug!("Render of {} skipped: document dropped", self.id),
        }
    }

    /// Number of completed renders
    pub fn render_count(&self) -> u64 {
        self.with_node(|_, node| node.renders).unwrap_or(0)
    }

    pub fn attach(&self) {
        if !self.is_current() {
            return;
        }
        if let Some(doc) = self.document() {
            doc.attach(self.id);
        }
    }

    pub fn detach(&self) {
        if !self.is_current() {
            return;
        }
        if let Some(doc) = self.document() {
            doc.detach(self.id);
        }
    }

    /// Child instances from the last render, in document order
    pub fn children(&self) -> Vec<ComponentHandle> {
        self.with_node(|_, node| {
            node.children
                .iter()
                .map(|(c, _)| ComponentHandle::new(self.doc.clone(), *c))
                .collect()
        })
        .unwrap_or_default()
    }

    /// Deliver a user event (see [`crate::component::Component::on_event`])
    pub fn dispatch(&self, event: &str, detail: Value) -> Handled {
        if !self.is_current() {
            return Handled::No;
        }
        match self.document() {
            Some(doc) => doc.dispatch(self.id, event, &detail),
            None => Handled::No,
        }
    }

    pub fn outer_html(&self) -> Option<String> {
        self.document()?.outer_html(self.id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State
    // ─────────────────────────────────────────────────────────────────────────

    pub fn get(&self, key: &str) -> Option<Value> {
        self.with_node(|_, node| node.state.get(key).cloned())
            .flatten()
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    /// Write one state key. Does not render.
    ///
    /// Ignored (returns `false`) once the instance is detached or destroyed,
    /// and for handles from an earlier attachment.
    pub fn set(&self, key: &str, value: Value) -> bool {
        let written = self
            .with_node_mut(|node| {
                if node.phase == Lifecycle::Detached || !self.belongs_to(node) {
                    return false;
                }
                node.state.insert(key.to_string(), value);
                true
            })
            .unwrap_or(false);

        if !written {
            tracing::debug!("State write {:?} on {} ignored: not attached", key, self.id);
        }
        written
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Attributes & form controls
    // ─────────────────────────────────────────────────────────────────────────

    pub fn attributes(&self) -> Attributes {
        self.with_node(|_, node| node.attrs.clone())
            .unwrap_or_default()
    }

    pub fn attr_text(&self, name: &str) -> Option<String> {
        self.with_node(|_, node| node.attrs.text(name)).flatten()
    }

    pub fn attr_json(&self, name: &str) -> Option<Value> {
        self.with_node(|_, node| node.attrs.json(name)).flatten()
    }

    pub fn attr_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.with_node(|_, node| node.attrs.decode(name)).flatten()
    }

    pub fn attr_or<T: DeserializeOwned>(&self, name: &str, default: T) -> T {
        self.attr_as(name).unwrap_or(default)
    }

    /// Live value of a form control this instance rendered: whatever was
    /// typed since the last render, else the rendered value.
    pub fn input(&self, name: &str) -> Option<String> {
        self.with_node(|inner, node| {
            node.inputs
                .get(name)
                .cloned()
                .or_else(|| inner.scanner.form_value(node.markup.as_str(), name))
        })
        .flatten()
    }

    /// Type into a rendered form control. Lost on the next render.
    pub fn set_input(&self, name: &str, value: &str) -> bool {
        self.with_node_mut(|node| {
            if node.phase != Lifecycle::Attached || !self.belongs_to(node) {
                return false;
            }
            node.inputs.insert(name.to_string(), value.to_string());
            true
        })
        .unwrap_or(false)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Owned resources
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribe to `store` for as long as this instance stays attached.
    ///
    /// The subscription is released by the host on detach; re-subscribe in
    /// the next `on_attach`. The callback never runs for a detached instance.
    pub fn subscribe<F>(&self, store: &Store, mut callback: F)
    where
        F: FnMut(&ComponentHandle, &StoreState) + 'static,
    {
        let handle = self.clone();
        let subscription = store.subscribe(move |state| {
            if handle.is_attached() {
                callback(&handle, state);
            }
        });

        let doc = self.doc.upgrade();
        let mut inner = doc.as_ref().map(|d| d.borrow_mut());
        match inner.as_mut().and_then(|i| i.nodes.get_mut(&self.id)) {
            Some(node) if node.phase != Lifecycle::Detached && self.belongs_to(node) => {
                node.resources.subscriptions.push(subscription);
            }
            _ => {
                tracing::debug!("Subscription from detached {} dropped", self.id);
                subscription.unsubscribe();
            }
        }
    }

    /// Run `tick` every `period` while attached. Stopped on detach.
    ///
    /// Must be called from inside a tokio `LocalSet`.
    pub fn every<F>(&self, period: Duration, mut tick: F)
    where
        F: FnMut(&ComponentHandle) + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let handle = self.clone();
        let timer = tokio::task::spawn_local(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                if !handle.is_attached() {
                    break;
                }
                tick(&handle);
            }
        });

        let doc = self.doc.upgrade();
        let mut inner = doc.as_ref().map(|d| d.borrow_mut());
        match inner.as_mut().and_then(|i| i.nodes.get_mut(&self.id)) {
            Some(node) if node.phase != Lifecycle::Detached && self.belongs_to(node) => {
                node.resources.timers.push(timer)
            }
            _ => timer.abort(),
        }
    }

    /// Run async work (typically a fetch) on the local executor.
    ///
    /// There is no cancellation: the future must check
    /// [`ComponentHandle::is_attached`] on a handle cloned from the hook
    /// before touching the instance. That check also fails once the
    /// attachment which spawned the work has ended, even if the instance
    /// was attached again since. [`Document::settle`] waits for these tasks.
    pub fn spawn<Fut>(&self, future: Fut)
    where
        Fut: Future<Output = ()> + 'static,
    {
        let task = tokio::task::spawn_local(future);
        if let Some(doc) = self.doc.upgrade() {
            let mut inner = doc.borrow_mut();
            inner.tasks.retain(|t| !t.is_finished());
            inner.tasks.push(task);
        }
    }
}
