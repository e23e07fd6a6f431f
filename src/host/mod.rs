//! Headless element host
//!
//! `Document` plays the part a browser plays for custom elements: it owns
//! component instances, calls their lifecycle hooks, turns rendered markup
//! into child instances and serializes the finished tree.
//!
//! # Model
//!
//! ```text
//! mount("home-page")
//!    │  construct ─► attach ─► on_attach ─► render()
//!    │                                         │
//!    │           scan markup for registered tags (top level only)
//!    │                                         │
//!    │         destroy previous children ◄─────┤
//!    │                                         ▼
//!    │            construct + attach each child, in order
//!    ▼
//! settle().await   (waits for fetches spawned by any instance)
//! ```
//!
//! Everything runs on one thread. No `RefCell` borrow of the document is
//! held while component code runs, so hooks, subscribers and tasks may call
//! back into the document freely. A render requested while the instance's
//! own hook (or render) is still running is deferred until it returns.

mod handle;
mod scan;

#[cfg(test)]
mod tests;

pub use handle::ComponentHandle;
pub use scan::Scanner;

use crate::component::{
    Attributes, Component, ComponentState, Handled, Lifecycle, Markup, Scope,
};
use crate::store::Subscription;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;
use tokio::task::JoinHandle;

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers & errors
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of one instance. Never reused within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised by the host itself (never by component code)
#[derive(Debug)]
pub enum HostError {
    /// Tag is not a valid custom element name (needs a `-`, lowercase)
    InvalidTagName(String),
    /// Tag registered twice
    DuplicateTag(String),
    /// Mount requested for a tag nobody registered
    UnknownTag(String),
    /// Internal markup pattern failed to compile
    Pattern(regex::Error),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTagName(tag) => write!(f, "Invalid custom element name: {:?}", tag),
            Self::DuplicateTag(tag) => write!(f, "Element {:?} is already registered", tag),
            Self::UnknownTag(tag) => write!(f, "No component registered for {:?}", tag),
            Self::Pattern(e) => write!(f, "Markup pattern error: {}", e),
        }
    }
}

impl std::error::Error for HostError {}

impl From<regex::Error> for HostError {
    fn from(e: regex::Error) -> Self {
        Self::Pattern(e)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

type Factory = Rc<dyn Fn() -> Box<dyn Component>>;

/// Tag name → component constructor
#[derive(Default, Clone)]
pub struct Registry {
    factories: HashMap<String, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `tag`.
    ///
    /// Factories only build the struct; they must not touch the document.
    pub fn register<F>(&mut self, tag: &str, factory: F) -> Result<(), HostError>
    where
        F: Fn() -> Box<dyn Component> + 'static,
    {
        if !is_custom_element_name(tag) {
            return Err(HostError::InvalidTagName(tag.to_string()));
        }
        if self.factories.contains_key(tag) {
            return Err(HostError::DuplicateTag(tag.to_string()));
        }
        self.factories.insert(tag.to_string(), Rc::new(factory));
        Ok(())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    fn factory(&self, tag: &str) -> Option<Factory> {
        self.factories.get(tag).cloned()
    }
}

fn is_custom_element_name(tag: &str) -> bool {
    tag.starts_with(|c: char| c.is_ascii_lowercase())
        && tag.contains('-')
        && !tag.ends_with('-')
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

// ─────────────────────────────────────────────────────────────────────────────
// Arena
// ─────────────────────────────────────────────────────────────────────────────

/// Subscriptions and timers an instance registered through its handle
#[derive(Default)]
struct Resources {
    subscriptions: Vec<Subscription>,
    timers: Vec<JoinHandle<()>>,
}

impl Resources {
    fn release(self) -> usize {
        let count = self.subscriptions.len() + self.timers.len();
        for sub in self.subscriptions {
            sub.unsubscribe();
        }
        for timer in self.timers {
            timer.abort();
        }
        count
    }
}

struct Node {
    tag: String,
    /// `None` while one of the instance's hooks is running
    component: Option<Box<dyn Component>>,
    state: ComponentState,
    attrs: Attributes,
    phase: Lifecycle,
    /// Bumped on every attach; hook handles carry the value they saw
    epoch: u64,
    parent: Option<NodeId>,
    /// Children in document order, with their content range in `markup`
    children: Vec<(NodeId, Range<usize>)>,
    markup: Markup,
    /// Values typed into rendered form controls since the last render
    inputs: HashMap<String, String>,
    resources: Resources,
    rendering: bool,
    render_pending: bool,
    renders: u64,
}

pub(crate) struct DocInner {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
    next_id: u64,
    registry: Registry,
    scanner: Scanner,
    tasks: Vec<JoinHandle<()>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Document
// ─────────────────────────────────────────────────────────────────────────────

/// The element host. Clones share the same tree.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocInner>>,
}

impl Document {
    pub fn new(registry: Registry) -> Result<Self, HostError> {
        Ok(Self {
            inner: Rc::new(RefCell::new(DocInner {
                nodes: HashMap::new(),
                roots: Vec::new(),
                next_id: 1,
                registry,
                scanner: Scanner::new()?,
                tasks: Vec::new(),
            })),
        })
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<DocInner>>) -> Self {
        Self { inner }
    }

    /// Construct a top-level instance of `tag` and attach it
    pub fn mount(&self, tag: &str, attrs: Attributes) -> Result<ComponentHandle, HostError> {
        let factory = self
            .inner
            .borrow()
            .registry
            .factory(tag)
            .ok_or_else(|| HostError::UnknownTag(tag.to_string()))?;

        let id = self.insert(tag, factory(), attrs, None);
        self.inner.borrow_mut().roots.push(id);
        tracing::debug!("Mounted <{}> as {}", tag, id);

        self.attach(id);
        Ok(self.handle(id))
    }

    /// Detach and drop a top-level (or any) instance with its subtree
    pub fn unmount(&self, id: NodeId) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.roots.retain(|r| *r != id);
            let parent = inner.nodes.get(&id).and_then(|n| n.parent);
            if let Some(parent) = parent.and_then(|p| inner.nodes.get_mut(&p)) {
                parent.children.retain(|(c, _)| *c != id);
            }
        }
        self.destroy(id);
    }

    pub fn handle(&self, id: NodeId) -> ComponentHandle {
        ComponentHandle::new(Rc::downgrade(&self.inner), id)
    }

    /// Handle for hooks: tied to the instance's current attachment
    fn hook_handle(&self, id: NodeId) -> ComponentHandle {
        let epoch = self
            .inner
            .borrow()
            .nodes
            .get(&id)
            .map(|n| n.epoch)
            .unwrap_or_default();
        ComponentHandle::bound(Rc::downgrade(&self.inner), id, epoch)
    }

    pub fn roots(&self) -> Vec<ComponentHandle> {
        let ids = self.inner.borrow().roots.clone();
        ids.into_iter().map(|id| self.handle(id)).collect()
    }

    /// Every live instance of `tag`, in document order
    pub fn instances_of(&self, tag: &str) -> Vec<ComponentHandle> {
        let inner = self.inner.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = inner.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = inner.nodes.get(&id) else {
                continue;
            };
            if node.tag == tag {
                out.push(id);
            }
            stack.extend(node.children.iter().rev().map(|(c, _)| *c));
        }
        drop(inner);
        out.into_iter().map(|id| self.handle(id)).collect()
    }

    /// Number of instances currently held, attached or not
    pub fn len(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert an instance into the document (again).
    ///
    /// Base bookkeeping happens first, then `on_attach`, then any render the
    /// hook asked for, then children kept from an earlier attachment are
    /// re-attached.
    pub fn attach(&self, id: NodeId) {
        let component = {
            let mut inner = self.inner.borrow_mut();
            let Some(node) = inner.nodes.get_mut(&id) else {
                return;
            };
            if node.phase == Lifecycle::Attached {
                return;
            }
            node.phase = Lifecycle::Attached;
            node.epoch += 1;
            node.component.take()
        };
        tracing::trace!("Attach {}", id);

        if let Some(mut component) = component {
            component.on_attach(&self.hook_handle(id));
            self.restore(id, component);
        }
        self.flush_render(id);

        for child in self.child_ids(id) {
            if self.phase(child) == Some(Lifecycle::Detached) && self.is_attached(id) {
                self.attach(child);
            }
        }
    }

    /// Remove an instance (and its subtree) from the document, keeping it
    /// around for a later [`Document::attach`].
    ///
    /// `on_detach` runs first; afterwards every subscription and timer the
    /// instance registered through its handle is released.
    pub fn detach(&self, id: NodeId) {
        let component = {
            let mut inner = self.inner.borrow_mut();
            let Some(node) = inner.nodes.get_mut(&id) else {
                return;
            };
            if node.phase != Lifecycle::Attached {
                return;
            }
            node.phase = Lifecycle::Detached;
            node.render_pending = false;
            node.component.take()
        };
        tracing::trace!("Detach {}", id);

        if let Some(mut component) = component {
            component.on_detach(&self.hook_handle(id));
            self.restore(id, component);
        }

        let resources = self
            .inner
            .borrow_mut()
            .nodes
            .get_mut(&id)
            .map(|node| std::mem::take(&mut node.resources));
        if let Some(resources) = resources {
            let released = resources.release();
            if released > 0 {
                tracing::trace!("Released {} resource(s) of {}", released, id);
            }
        }

        for child in self.child_ids(id) {
            self.detach(child);
        }
    }

    /// Re-materialize an instance from its current state.
    ///
    /// The previous subtree is destroyed (children detached and dropped) and
    /// rebuilt from the new markup. No-op unless attached.
    pub fn render(&self, id: NodeId) {
        enum Outcome {
            Skip(&'static str),
            Defer,
            Ready(Box<dyn Component>, ComponentState, Attributes),
        }

        // The component is taken out like for hooks, so `render` runs with
        // no borrow of the document held
        let outcome = {
            let mut inner = self.inner.borrow_mut();
            match inner.nodes.get_mut(&id) {
                None => Outcome::Skip("instance gone"),
                Some(node) if node.phase != Lifecycle::Attached => Outcome::Skip("not attached"),
                Some(node) if node.rendering => Outcome::Defer,
                Some(node) => match node.component.take() {
                    None => Outcome::Defer,
                    Some(component) => {
                        Outcome::Ready(component, node.state.clone(), node.attrs.clone())
                    }
                },
            }
        };

        let markup = match outcome {
            Outcome::Skip(reason) => {
                tracing::debug!("Render of {} skipped: {}", id, reason);
                return;
            }
            Outcome::Defer => {
                if let Some(node) = self.inner.borrow_mut().nodes.get_mut(&id) {
                    node.render_pending = true;
                }
                return;
            }
            Outcome::Ready(component, state, attrs) => {
                let markup = component.render(&Scope::new(&state, &attrs));
                self.restore(id, component);
                if !self.is_attached(id) {
                    tracing::debug!("Render of {} dropped: detached while rendering", id);
                    return;
                }
                markup
            }
        };

        let old_children: Vec<NodeId> = {
            let mut inner = self.inner.borrow_mut();
            let Some(node) = inner.nodes.get_mut(&id) else {
                return;
            };
            node.rendering = true;
            node.children.drain(..).map(|(c, _)| c).collect()
        };
        for child in old_children {
            self.destroy(child);
        }

        let found = {
            let inner = self.inner.borrow();
            inner
                .scanner
                .custom_elements(markup.as_str(), |tag| inner.registry.contains(tag))
        };

        let mut created = Vec::with_capacity(found.len());
        for element in found {
            let factory = self.inner.borrow().registry.factory(&element.tag);
            if let Some(factory) = factory {
                let child = self.insert(&element.tag, factory(), element.attrs, Some(id));
                created.push((child, element.content));
            }
        }

        let attach_order: Vec<NodeId> = created.iter().map(|(c, _)| *c).collect();
        let orphans = {
            let mut inner = self.inner.borrow_mut();
            match inner.nodes.get_mut(&id) {
                Some(node) => {
                    node.markup = markup;
                    node.children = created;
                    node.inputs.clear();
                    node.renders += 1;
                    tracing::trace!("Rendered {} (<{}>, render #{})", id, node.tag, node.renders);
                    None
                }
                None => Some(created),
            }
        };
        if let Some(orphans) = orphans {
            // Instance went away while its old subtree was being torn down
            for (child, _) in orphans {
                self.destroy(child);
            }
            return;
        }

        for child in attach_order {
            if !self.is_attached(id) {
                break;
            }
            self.attach(child);
        }

        if let Some(node) = self.inner.borrow_mut().nodes.get_mut(&id) {
            node.rendering = false;
        }
        self.flush_render(id);
    }

    /// Deliver a user event to an attached instance
    pub fn dispatch(&self, id: NodeId, event: &str, detail: &Value) -> Handled {
        let component = {
            let mut inner = self.inner.borrow_mut();
            match inner.nodes.get_mut(&id) {
                Some(node) if node.phase == Lifecycle::Attached => node.component.take(),
                _ => None,
            }
        };
        let Some(mut component) = component else {
            tracing::debug!("Event {:?} for {} dropped: not attached or busy", event, id);
            return Handled::No;
        };

        let handled = component.on_event(&self.hook_handle(id), event, detail);
        self.restore(id, component);
        self.flush_render(id);
        if handled == Handled::No {
            tracing::debug!("Event {:?} not handled by {}", event, id);
        }
        handled
    }

    /// Wait until every task spawned through a handle has finished,
    /// including tasks spawned by instances created along the way.
    ///
    /// Periodic timers are not tasks and do not hold this up.
    pub async fn settle(&self) {
        loop {
            let tasks = std::mem::take(&mut self.inner.borrow_mut().tasks);
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                if let Err(e) = task.await {
                    if e.is_panic() {
                        tracing::error!("Component task panicked: {}", e);
                    }
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Serialization
    // ─────────────────────────────────────────────────────────────────────────

    /// HTML of one instance including its own tag and the full subtree
    pub fn outer_html(&self, id: NodeId) -> Option<String> {
        let inner = self.inner.borrow();
        let node = inner.nodes.get(&id)?;

        let mut out = format!("<{}", node.tag);
        for (name, value) in node.attrs.iter() {
            if value.is_empty() {
                out.push_str(&format!(" {}", name));
            } else {
                out.push_str(&format!(" {}=\"{}\"", name, value));
            }
        }
        out.push('>');
        out.push_str(&inner_html(&inner, id));
        out.push_str(&format!("</{}>", node.tag));
        Some(out)
    }

    /// HTML of everything mounted, roots in mount order
    pub fn html(&self) -> String {
        let roots = self.inner.borrow().roots.clone();
        roots
            .into_iter()
            .filter_map(|id| self.outer_html(id))
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals shared with ComponentHandle
    // ─────────────────────────────────────────────────────────────────────────

    fn insert(
        &self,
        tag: &str,
        component: Box<dyn Component>,
        attrs: Attributes,
        parent: Option<NodeId>,
    ) -> NodeId {
        if component.tag() != tag {
            tracing::warn!(
                "Component registered as <{}> reports tag <{}>",
                tag,
                component.tag()
            );
        }

        let mut inner = self.inner.borrow_mut();
        let id = NodeId(inner.next_id);
        inner.next_id += 1;
        inner.nodes.insert(
            id,
            Node {
                tag: tag.to_string(),
                component: Some(component),
                state: ComponentState::new(),
                attrs,
                phase: Lifecycle::Constructed,
                epoch: 0,
                parent,
                children: Vec::new(),
                markup: Markup::new(),
                inputs: HashMap::new(),
                resources: Resources::default(),
                rendering: false,
                render_pending: false,
                renders: 0,
            },
        );
        id
    }

    /// Detach an instance and drop it together with its subtree
    fn destroy(&self, id: NodeId) {
        self.detach(id);

        let removed: Vec<Node> = {
            let mut inner = self.inner.borrow_mut();
            let mut removed = Vec::new();
            let mut stack = vec![id];
            while let Some(next) = stack.pop() {
                if let Some(node) = inner.nodes.remove(&next) {
                    stack.extend(node.children.iter().map(|(c, _)| *c));
                    removed.push(node);
                }
            }
            removed
        };

        // Dropped outside the borrow: components and their resources may own
        // handles back into this document
        for node in removed {
            let leftover = node.resources.release();
            if leftover > 0 {
                tracing::debug!("Released {} resource(s) of destroyed <{}>", leftover, node.tag);
            }
        }
    }

    fn restore(&self, id: NodeId, component: Box<dyn Component>) {
        let orphan = {
            let mut inner = self.inner.borrow_mut();
            match inner.nodes.get_mut(&id) {
                Some(node) => {
                    node.component = Some(component);
                    None
                }
                None => Some(component),
            }
        };
        if let Some(component) = orphan {
            tracing::debug!("Instance {} destroyed during its own hook", id);
            drop(component);
        }
    }

    fn flush_render(&self, id: NodeId) {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            match inner.nodes.get_mut(&id) {
                Some(node) if node.render_pending && !node.rendering => {
                    node.render_pending = false;
                    node.phase == Lifecycle::Attached
                }
                _ => false,
            }
        };
        if pending {
            self.render(id);
        }
    }

    fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .nodes
            .get(&id)
            .map(|n| n.children.iter().map(|(c, _)| *c).collect())
            .unwrap_or_default()
    }

    fn phase(&self, id: NodeId) -> Option<Lifecycle> {
        self.inner.borrow().nodes.get(&id).map(|n| n.phase)
    }

    fn is_attached(&self, id: NodeId) -> bool {
        self.phase(id) == Some(Lifecycle::Attached)
    }
}

fn inner_html(inner: &DocInner, id: NodeId) -> String {
    let Some(node) = inner.nodes.get(&id) else {
        return String::new();
    };
    let markup = node.markup.as_str();
    let mut out = String::with_capacity(markup.len());
    let mut cursor = 0;
    for (child, range) in &node.children {
        out.push_str(&markup[cursor..range.start]);
        out.push_str(&inner_html(inner, *child));
        cursor = range.end;
    }
    out.push_str(&markup[cursor..]);
    out
}
