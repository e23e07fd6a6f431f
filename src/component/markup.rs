//! Markup values produced by `Component::render`
//!
//! Static template text goes in with [`Markup::raw`]/[`Markup::push_raw`];
//! anything dynamic goes through [`Markup::push_text`] (escaped) or an
//! [`Tag`] attribute setter. Structured attributes can only be written with
//! [`Tag::attr_json`], which runs the codec, so there is no way to splice raw
//! JSON into an attribute by accident.

use crate::codec::{self, AttrValue};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Rendered HTML for one component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup(String);

impl Markup {
    pub fn new() -> Self {
        Self(String::new())
    }

    /// Trusted template text, inserted verbatim
    pub fn raw(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Escaped text content
    pub fn text(text: &str) -> Self {
        Self(codec::escape_text(text))
    }

    pub fn push_raw(&mut self, text: &str) -> &mut Self {
        self.0.push_str(text);
        self
    }

    pub fn push_text(&mut self, text: &str) -> &mut Self {
        self.0.push_str(&codec::escape_text(text));
        self
    }

    pub fn push(&mut self, other: Markup) -> &mut Self {
        self.0.push_str(&other.0);
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromIterator<Markup> for Markup {
    fn from_iter<I: IntoIterator<Item = Markup>>(iter: I) -> Self {
        let mut out = Markup::new();
        for m in iter {
            out.push(m);
        }
        out
    }
}

/// Builder for one element
///
/// ```ignore
/// let card = Tag::new("card-grid")
///     .attr_text("kind", "ministry")
///     .attr_json("items", &ministries)
///     .into_markup();
/// ```
#[derive(Debug, Clone)]
pub struct Tag {
    name: String,
    open: String,
    body: Markup,
    void: bool,
}

impl Tag {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            open: format!("<{}", name),
            body: Markup::new(),
            void: false,
        }
    }

    /// Element without a closing tag (`input`, `img`, ...)
    pub fn void(name: &str) -> Self {
        Self {
            void: true,
            ..Self::new(name)
        }
    }

    /// Plain string attribute, escaped
    pub fn attr_text(mut self, name: &str, value: &str) -> Self {
        self.open
            .push_str(&format!(" {}=\"{}\"", name, codec::escape_text(value)));
        self
    }

    /// Structured attribute, encoded through the codec.
    ///
    /// Values that cannot be serialized are written as `null`.
    pub fn attr_json<T: Serialize + ?Sized>(self, name: &str, value: &T) -> Self {
        let encoded = codec::encode_or_default(value, &Value::Null);
        self.attr_encoded(name, &encoded)
    }

    /// Attribute from an already-encoded value
    pub fn attr_encoded(mut self, name: &str, value: &AttrValue) -> Self {
        self.open.push_str(&format!(" {}=\"{}\"", name, value));
        self
    }

    /// Boolean attribute (`disabled`, `hidden`, ...) when `on`
    pub fn flag(mut self, name: &str, on: bool) -> Self {
        if on {
            self.open.push(' ');
            self.open.push_str(name);
        }
        self
    }

    pub fn class(self, classes: &str) -> Self {
        self.attr_text("class", classes)
    }

    pub fn child(mut self, markup: Markup) -> Self {
        self.body.push(markup);
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.body.push_text(text);
        self
    }

    pub fn into_markup(self) -> Markup {
        let mut out = self.open;
        out.push('>');
        if !self.void {
            out.push_str(self.body.as_str());
            out.push_str(&format!("</{}>", self.name));
        }
        Markup(out)
    }
}

impl From<Tag> for Markup {
    fn from(tag: Tag) -> Self {
        tag.into_markup()
    }
}
