//! Markup scanning
//!
//! Finds the custom elements a render produced and reads form values out of
//! rendered inputs. This is not an HTML parser: it understands exactly the
//! markup components build with `Markup`/`Tag`, where attribute values never
//! contain a raw `>` or quote.

use crate::component::Attributes;
use crate::codec;
use regex::Regex;
use std::ops::Range;

/// A registered element found in a render, in document order
#[derive(Debug, Clone, PartialEq)]
pub struct FoundElement {
    pub tag: String,
    pub attrs: Attributes,
    /// Byte range of the element's content (between its opening and closing
    /// tag) in the scanned markup. Empty when the element has no closing tag.
    pub content: Range<usize>,
}

struct ScannedTag<'a> {
    closing: bool,
    name: &'a str,
    attrs: &'a str,
    self_closing: bool,
    whole: Range<usize>,
}

pub struct Scanner {
    tag: Regex,
    attr: Regex,
    input: Regex,
    textarea: Regex,
}

impl Scanner {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            tag: Regex::new(r"<(/?)([a-z][a-z0-9]*(?:-[a-z0-9]*)+)(\s[^>]*)?>")?,
            attr: Regex::new(
                r#"([^\s"'=<>/]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
            )?,
            input: Regex::new(r"(?i)<input\b([^>]*)>")?,
            textarea: Regex::new(r"(?is)<textarea\b([^>]*)>(.*?)</textarea>")?,
        })
    }

    /// Parse the attribute section of an opening tag
    pub fn attributes(&self, source: &str) -> Attributes {
        let source = source.trim().trim_end_matches('/');
        Attributes::from_raw(self.attr.captures_iter(source).map(|c| {
            let name = c[1].to_string();
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            (name, value)
        }))
    }

    /// Top-level elements whose tag satisfies `is_registered`.
    ///
    /// Registered elements nested inside another registered element belong
    /// to that element's own render and are skipped. An opening tag that is
    /// never closed is treated as empty, like a self-closing one.
    pub fn custom_elements(
        &self,
        markup: &str,
        is_registered: impl Fn(&str) -> bool,
    ) -> Vec<FoundElement> {
        let tags: Vec<ScannedTag<'_>> = self
            .tag
            .captures_iter(markup)
            .filter(|caps| is_registered(&caps[2]))
            .map(|caps| {
                let attrs = caps.get(3).map(|m| m.as_str()).unwrap_or("");
                ScannedTag {
                    closing: !caps[1].is_empty(),
                    name: caps.get(2).map(|m| m.as_str()).unwrap_or(""),
                    whole: caps.get(0).map(|m| m.range()).unwrap_or_default(),
                    self_closing: attrs.trim_end().ends_with('/'),
                    attrs,
                }
            })
            .collect();

        // Pair closing tags with the nearest unmatched opening tag of the same name
        let mut partner: Vec<Option<usize>> = vec![None; tags.len()];
        let mut unmatched: Vec<usize> = Vec::new();
        for (i, tag) in tags.iter().enumerate() {
            if !tag.closing {
                if !tag.self_closing {
                    unmatched.push(i);
                }
            } else if let Some(pos) = unmatched.iter().rposition(|&o| tags[o].name == tag.name) {
                let open = unmatched.remove(pos);
                partner[open] = Some(i);
                partner[i] = Some(open);
            }
        }
        for &i in &unmatched {
            tracing::debug!("<{}> is never closed; treating it as empty", tags[i].name);
        }

        let mut found: Vec<FoundElement> = Vec::new();
        let mut open: Vec<usize> = Vec::new();
        for (i, tag) in tags.iter().enumerate() {
            if tag.closing {
                let Some(start) = partner[i] else { continue };
                if let Some(depth) = open.iter().position(|&o| o == start) {
                    open.truncate(depth);
                    if open.is_empty() {
                        if let Some(el) = found.last_mut() {
                            el.content = el.content.start..tag.whole.start;
                        }
                    }
                }
                continue;
            }

            if open.is_empty() {
                found.push(FoundElement {
                    tag: tag.name.to_string(),
                    attrs: self.attributes(tag.attrs),
                    content: tag.whole.end..tag.whole.end,
                });
            }
            if partner[i].is_some() {
                open.push(i);
            }
        }

        found
    }

    /// Current value of the named form control in `markup`, entities resolved
    pub fn form_value(&self, markup: &str, name: &str) -> Option<String> {
        for caps in self.input.captures_iter(markup) {
            let attrs = self.attributes(&caps[1]);
            if attrs.text("name").as_deref() == Some(name) {
                return Some(attrs.text("value").unwrap_or_default());
            }
        }
        for caps in self.textarea.captures_iter(markup) {
            let attrs = self.attributes(&caps[1]);
            if attrs.text("name").as_deref() == Some(name) {
                return Some(codec::unescape(&caps[2]));
            }
        }
        None
    }
}
