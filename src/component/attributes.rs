//! Attribute access for components
//!
//! Attribute values are kept exactly as they appear in the parent's markup
//! (still entity-escaped). The codec is the only place that unescapes them,
//! so a value is never decoded twice.

use crate::codec;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Attributes of one element, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from raw (escaped) name/value pairs
    pub fn from_raw<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into().to_ascii_lowercase(), v.into()))
                .collect(),
        )
    }

    /// Raw attribute text as written in markup
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.raw(name).is_some()
    }

    /// Plain string attribute with entities resolved
    pub fn text(&self, name: &str) -> Option<String> {
        self.raw(name).map(codec::unescape)
    }

    /// Structured attribute decoded through the codec
    pub fn json(&self, name: &str) -> Option<Value> {
        codec::decode(self.raw(name))
    }

    /// Structured attribute decoded into `T`
    pub fn decode<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        codec::decode_as(self.raw(name))
    }

    /// Structured attribute or `default` when missing or unreadable
    pub fn decode_or<T: DeserializeOwned>(&self, name: &str, default: T) -> T {
        self.decode(name).unwrap_or(default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
