//! Attribute codec - structured data through plain string attributes
//!
//! A parent component hands objects and arrays to a child by writing them
//! into the child's opening tag. Attributes are strings, so values travel as
//! JSON text with every character that matters to HTML attribute parsing
//! replaced by an entity:
//!
//! ```text
//! {"title":"A \"quote\" & <tag>"}
//!   → {&quot;title&quot;:&quot;A \&quot;quote\&quot; &amp; &lt;tag&gt;&quot;}
//! ```
//!
//! The encoded form contains no `"`, `'`, `<`, `>` or bare `&`, so it can sit
//! inside either quote style and cannot close the attribute or open a tag.
//!
//! Decoding never fails loudly: missing, empty or malformed attributes come
//! back as `None` and a warning is logged. A child treats `None` exactly like
//! "no data yet".

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Characters escaped on the way out, with their entity.
///
/// `&` must stay first so already-produced entities are not re-escaped.
const ESCAPES: [(char, &str); 5] = [
    ('&', "&amp;"),
    ('"', "&quot;"),
    ('\'', "&#39;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
];

/// An encoded attribute value.
///
/// Only [`encode`] and friends produce one, so any `AttrValue` is known to be
/// safe to place between attribute quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrValue(String);

impl AttrValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value could not be turned into JSON text
#[derive(Debug)]
pub struct SerializationError(serde_json::Error);

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot serialize attribute value: {}", self.0)
    }
}

impl std::error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Why an attribute could not be decoded
#[derive(Debug)]
pub enum DecodeError {
    /// Attribute absent from the tag
    Missing,
    /// Attribute present but empty (or whitespace only)
    Empty,
    /// Unescaped text is not valid JSON (malformed or truncated)
    Json(serde_json::Error),
    /// Valid JSON, but not the shape the caller asked for
    Shape(serde_json::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "attribute missing"),
            Self::Empty => write!(f, "attribute empty"),
            Self::Json(e) => write!(f, "invalid JSON: {}", e),
            Self::Shape(e) => write!(f, "unexpected shape: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Escape text for use in markup, attribute or element content
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match ESCAPES.iter().find(|(ch, _)| *ch == c) {
            Some((_, entity)) => out.push_str(entity),
            None => out.push(c),
        }
    }
    out
}

/// Reverse entity escaping.
///
/// Understands the entities [`escape_text`] produces plus any decimal
/// (`&#60;`) or hex (`&#x3C;`) numeric reference. Anything else that starts
/// with `&` is left as-is.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        match decode_entity(rest) {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

const MAX_ENTITY_LEN: usize = 11;

/// Decode the entity at the start of `s`, returning the char and bytes consumed
fn decode_entity(s: &str) -> Option<(char, usize)> {
    // Longest reference we accept is "&#x10FFFF;"
    let end = s.bytes().take(MAX_ENTITY_LEN).position(|b| b == b';')?;
    let body = &s[1..end];

    let c = match body {
        "amp" => '&',
        "quot" => '"',
        "apos" => '\'',
        "lt" => '<',
        "gt" => '>',
        _ => {
            let digits = body.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            char::from_u32(code)?
        }
    };

    Some((c, end + 1))
}

/// Encode a value into the attribute wire format
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<AttrValue, SerializationError> {
    let json = serde_json::to_string(value).map_err(SerializationError)?;
    Ok(AttrValue(escape_text(&json)))
}

/// Encode a value, falling back to `fallback` when it cannot be serialized.
///
/// Rendering must not fail because one slice of data is unserializable, so
/// the error is logged and the fallback encoded instead (`null` if even the
/// fallback fails).
pub fn encode_or_default<T, F>(value: &T, fallback: &F) -> AttrValue
where
    T: Serialize + ?Sized,
    F: Serialize + ?Sized,
{
    match encode(value) {
        Ok(encoded) => encoded,
        Err(e) => {
            tracing::warn!("{}; using fallback", e);
            encode(fallback).unwrap_or_else(|_| AttrValue("null".to_string()))
        }
    }
}

/// Decode an attribute into a JSON value, `None` on anything unusable
pub fn decode(raw: Option<&str>) -> Option<Value> {
    match try_decode(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            report(&e, raw);
            None
        }
    }
}

/// Decode an attribute straight into a typed value
pub fn decode_as<T: DeserializeOwned>(raw: Option<&str>) -> Option<T> {
    let result = try_decode(raw)
        .and_then(|value| serde_json::from_value(value).map_err(DecodeError::Shape));

    match result {
        Ok(value) => Some(value),
        Err(e) => {
            report(&e, raw);
            None
        }
    }
}

/// Fallible core of [`decode`], for callers that want the reason
pub fn try_decode(raw: Option<&str>) -> Result<Value, DecodeError> {
    let raw = raw.ok_or(DecodeError::Missing)?;
    if raw.trim().is_empty() {
        return Err(DecodeError::Empty);
    }
    serde_json::from_str(&unescape(raw)).map_err(DecodeError::Json)
}

fn report(error: &DecodeError, raw: Option<&str>) {
    match error {
        // Absent attributes are routine before a parent has data
        DecodeError::Missing => tracing::debug!("Attribute decode skipped: {}", error),
        _ => {
            let preview: String = raw.unwrap_or_default().chars().take(48).collect();
            tracing::warn!("Attribute decode failed: {} (value: {:?})", error, preview);
        }
    }
}
