//! Component base - the contract every page, section and dialog implements
//!
//! A component is a plain struct implementing [`Component`]. The host
//! ([`crate::host::Document`]) owns the instance and everything around it:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  Document (host adapter)                  │
//! │  per instance: ComponentState · Attributes · Lifecycle ·  │
//! │                owned subscriptions/timers · last Markup   │
//! └───────────────────────────────────────────────────────────┘
//!          │ on_attach / on_detach (&ComponentHandle)
//!          │ render(&Scope) -> Markup
//!          ▼
//!    ┌───────────┐   ┌───────────┐   ┌──────────────┐
//!    │ home-page │   │ card-grid │   │ admin-dialog │ ...
//!    └───────────┘   └───────────┘   └──────────────┘
//! ```
//!
//! # Rules
//!
//! - `set` never re-renders. Call `render()` after a batch of `set`s.
//! - `render` is a pure function of state and attributes. Its output replaces
//!   the whole subtree: child instances are detached, dropped and rebuilt, so
//!   state a child kept for itself is gone after every parent render.
//! - Base setup runs before `on_attach`, base teardown (releasing every
//!   subscription and timer registered through the handle) runs after
//!   `on_detach`. An overriding hook cannot skip either.
//! - Async work checks [`ComponentHandle::is_attached`] before writing; the
//!   handle's mutators are no-ops once the instance is detached anyway.
//!
//! [`ComponentHandle`]: crate::host::ComponentHandle
//! [`ComponentHandle::is_attached`]: crate::host::ComponentHandle::is_attached

mod attributes;
mod markup;

pub use attributes::Attributes;
pub use markup::{Markup, Tag};

use crate::host::ComponentHandle;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Per-instance state: string keys to JSON values
pub type ComponentState = Map<String, Value>;

/// Where an instance is in its life
///
/// `Constructed → Attached → Detached`, and back to `Attached` if the host
/// re-inserts the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Built, not yet in the document
    Constructed,
    /// In the document; may render
    Attached,
    /// Removed from the document; renders and writes are ignored
    Detached,
}

/// Whether a component consumed a user event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Yes,
    No,
}

impl From<bool> for Handled {
    fn from(handled: bool) -> Self {
        if handled {
            Self::Yes
        } else {
            Self::No
        }
    }
}

/// Read-only view handed to [`Component::render`]
pub struct Scope<'a> {
    state: &'a ComponentState,
    attrs: &'a Attributes,
}

impl<'a> Scope<'a> {
    pub fn new(state: &'a ComponentState, attrs: &'a Attributes) -> Self {
        Self { state, attrs }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.state.get(key)
    }

    /// State value converted to `T`, `None` if absent or a different shape
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.state
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.state.get(key).and_then(Value::as_str)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.state.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn attrs(&self) -> &'a Attributes {
        self.attrs
    }
}

/// Base trait for all UI components
///
/// # Example
///
/// ```ignore
/// struct Greeting;
///
/// impl Component for Greeting {
///     fn tag(&self) -> &'static str {
///         "site-greeting"
///     }
///
///     fn on_attach(&mut self, this: &ComponentHandle) {
///         this.set("name", json!(this.attr_text("name").unwrap_or_default()));
///         this.render();
///     }
///
///     fn render(&self, scope: &Scope) -> Markup {
///         let mut m = Markup::raw("<p>Welcome, ");
///         m.push_text(scope.get_str("name").unwrap_or("friend")).push_raw("</p>");
///         m
///     }
/// }
/// ```
pub trait Component {
    /// Custom element name this component is registered under
    fn tag(&self) -> &'static str;

    /// Called each time the instance enters the document.
    ///
    /// Typical work: read attributes, subscribe to the store, start a fetch,
    /// first `render()`.
    fn on_attach(&mut self, _this: &ComponentHandle) {}

    /// Called each time the instance leaves the document.
    ///
    /// Resources registered through the handle are released by the host
    /// right after this returns.
    fn on_detach(&mut self, _this: &ComponentHandle) {}

    /// A user event (`submit`, a button's `data-action`, ...) delivered by
    /// the host while attached. `detail` carries event data, `Null` if none.
    ///
    /// A `render()` requested here runs once the hook returns.
    fn on_event(&mut self, _this: &ComponentHandle, _event: &str, _detail: &Value) -> Handled {
        Handled::No
    }

    /// Produce the instance's entire content from current state
    fn render(&self, scope: &Scope<'_>) -> Markup;
}
