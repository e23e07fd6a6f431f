//! `card-grid`: a grid of content cards
//!
//! ```html
//! <card-grid kind="event" items="[{&quot;title&quot;:...}]"></card-grid>
//! ```

use super::model::{Event, LifeGroup, Ministry, Testimonial};
use crate::component::{Component, Markup, Scope, Tag};
use crate::host::ComponentHandle;
use crate::util::excerpt;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Longest description shown on a card
const EXCERPT_BYTES: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Ministry,
    Event,
    LifeGroup,
    Testimonial,
}

impl CardKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim() {
            "ministry" => Some(Self::Ministry),
            "event" => Some(Self::Event),
            "life-group" => Some(Self::LifeGroup),
            "testimonial" => Some(Self::Testimonial),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Ministry => "ministry",
            Self::Event => "event",
            Self::LifeGroup => "life-group",
            Self::Testimonial => "testimonial",
        }
    }

    fn empty_text(self) -> &'static str {
        match self {
            Self::Ministry => "Ministries will be listed here soon.",
            Self::Event => "No upcoming events right now. Check back soon!",
            Self::LifeGroup => "New groups are forming. Ask us about joining one.",
            Self::Testimonial => "",
        }
    }

    fn card(self, item: &Value) -> Option<Markup> {
        match self {
            Self::Ministry => record::<Ministry>(item).map(|m| ministry_card(&m)),
            Self::Event => record::<Event>(item).map(|e| event_card(&e)),
            Self::LifeGroup => record::<LifeGroup>(item).map(|g| life_group_card(&g)),
            Self::Testimonial => record::<Testimonial>(item).map(|t| testimonial_card(&t)),
        }
    }
}

pub struct CardGrid;

impl Component for CardGrid {
    fn tag(&self) -> &'static str {
        "card-grid"
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        let kind = this.attr_text("kind").unwrap_or_default();
        let items = match this.attr_json("items") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                tracing::warn!("card-grid items is not a list: {}", other);
                Vec::new()
            }
            None => Vec::new(),
        };
        this.set("kind", json!(kind));
        this.set("items", Value::Array(items));
        this.render();
    }

    fn render(&self, scope: &Scope<'_>) -> Markup {
        let raw_kind = scope.get_str("kind").unwrap_or_default();
        let Some(kind) = CardKind::parse(raw_kind) else {
            tracing::warn!("card-grid has unknown kind {:?}", raw_kind);
            return Markup::new();
        };

        let cards: Markup = scope
            .get("items")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|item| kind.card(item))
            .collect();

        if cards.is_empty() {
            let empty = kind.empty_text();
            if empty.is_empty() {
                return Markup::new();
            }
            return Tag::new("p").class("empty").text(empty).into_markup();
        }

        Tag::new("div")
            .class(&format!("cards cards-{}", kind.as_str()))
            .child(cards)
            .into_markup()
    }
}

fn record<T: DeserializeOwned>(item: &Value) -> Option<T> {
    match serde_json::from_value(item.clone()) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::debug!("Skipping unreadable card: {}", e);
            None
        }
    }
}

fn meta(parts: &[&str]) -> Markup {
    let parts: Vec<&str> = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        return Markup::new();
    }
    Tag::new("p").class("meta").text(&parts.join(" · ")).into_markup()
}

fn description(text: &str) -> Markup {
    if text.trim().is_empty() {
        return Markup::new();
    }
    Tag::new("p").text(&excerpt(text, EXCERPT_BYTES)).into_markup()
}

fn ministry_card(m: &Ministry) -> Markup {
    let mut card = Tag::new("article").class("card ministry");
    if let Some(image) = m.image.as_deref().filter(|i| !i.is_empty()) {
        card = card.child(
            Tag::void("img")
                .attr_text("src", image)
                .attr_text("alt", &m.name)
                .into_markup(),
        );
    }
    let leader = if m.leader.is_empty() {
        String::new()
    } else {
        format!("Led by {}", m.leader)
    };
    card.child(Tag::new("h3").text(&m.name).into_markup())
        .child(description(&m.description))
        .child(meta(&[&leader]))
        .into_markup()
}

fn event_card(e: &Event) -> Markup {
    Tag::new("article")
        .class("card event")
        .child(Tag::new("h3").text(&e.title).into_markup())
        .child(meta(&[&e.date, &e.time, &e.location]))
        .child(description(&e.description))
        .into_markup()
}

fn life_group_card(g: &LifeGroup) -> Markup {
    let leader = if g.leader.is_empty() {
        String::new()
    } else {
        format!("Leader: {}", g.leader)
    };
    Tag::new("article")
        .class("card life-group")
        .child(Tag::new("h3").text(&g.name).into_markup())
        .child(meta(&[&g.day, &g.location]))
        .child(meta(&[&leader]))
        .child(description(&g.description))
        .into_markup()
}

fn testimonial_card(t: &Testimonial) -> Markup {
    Tag::new("blockquote")
        .class("card testimonial")
        .child(Tag::new("p").text(&t.quote).into_markup())
        .child(Tag::new("footer").text(&t.name).into_markup())
        .into_markup()
}
