//! Top-level pages
//!
//! Every page follows the same cycle: on attach it shows a placeholder and
//! fetches `pages/<slug>`; when the data arrives (and the page is still in
//! the document) it stores it and renders its sections, handing each one a
//! slice of the data through an encoded attribute.

use super::model::SiteSummary;
use super::STORE_SITE_KEY;
use crate::api::Api;
use crate::component::{Component, Markup, Scope, Tag};
use crate::host::ComponentHandle;
use crate::store::Store;
use serde_json::{json, Value};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Home,
    About,
    Ministries,
    Events,
    Give,
    LifeGroups,
}

impl PageKind {
    pub const ALL: [PageKind; 6] = [
        Self::Home,
        Self::About,
        Self::Ministries,
        Self::Events,
        Self::Give,
        Self::LifeGroups,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::About => "about",
            Self::Ministries => "ministries",
            Self::Events => "events",
            Self::Give => "give",
            Self::LifeGroups => "life-groups",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Home => "home-page",
            Self::About => "about-page",
            Self::Ministries => "ministries-page",
            Self::Events => "events-page",
            Self::Give => "give-page",
            Self::LifeGroups => "life-groups-page",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.slug() == slug)
    }

    pub fn api_path(self) -> String {
        format!("pages/{}", self.slug())
    }

    /// Heading used when the page data has no title
    pub fn title(self) -> &'static str {
        match self {
            Self::Home => "Welcome",
            Self::About => "About Us",
            Self::Ministries => "Ministries",
            Self::Events => "Upcoming Events",
            Self::Give => "Give",
            Self::LifeGroups => "Life Groups",
        }
    }

    /// Page content for loaded `data`
    fn body(self, data: &Value) -> Markup {
        let title = match text(data, "title") {
            "" => self.title(),
            title => title,
        };
        let mut m = Tag::new("h1").text(title).into_markup();

        match self {
            Self::Home => {
                m.push(paragraph("tagline", text(data, "tagline")));
                m.push(
                    Tag::new("hero-carousel")
                        .attr_json("slides", &list(data, "slides"))
                        .into_markup(),
                );
                m.push(section("Our Ministries", grid("ministry", &list(data, "ministries"))));
                m.push(section("Stories", grid("testimonial", &list(data, "testimonials"))));
            }
            Self::About => {
                for para in text(data, "story").split("\n\n") {
                    m.push(paragraph("story", para));
                }
                let beliefs = strings(data, "beliefs");
                if !beliefs.is_empty() {
                    let items: Markup = beliefs
                        .iter()
                        .map(|b| Tag::new("li").text(b).into_markup())
                        .collect();
                    m.push(section("What We Believe", Tag::new("ul").child(items).into_markup()));
                }
                let staff: Markup = list(data, "staff")
                    .as_array()
                    .into_iter()
                    .flatten()
                    .map(|person| {
                        Tag::new("li")
                            .child(Tag::new("strong").text(text(person, "name")).into_markup())
                            .child(Markup::text(&format!(" {}", text(person, "role"))))
                            .into_markup()
                    })
                    .collect();
                if !staff.is_empty() {
                    m.push(section(
                        "Our Team",
                        Tag::new("ul").class("staff").child(staff).into_markup(),
                    ));
                }
            }
            Self::Ministries => {
                m.push(paragraph("intro", text(data, "intro")));
                m.push(grid("ministry", &list(data, "ministries")));
            }
            Self::Events => {
                m.push(paragraph("intro", text(data, "intro")));
                m.push(grid("event", &list(data, "events")));
            }
            Self::Give => {
                m.push(paragraph("intro", text(data, "intro")));
                m.push(
                    Tag::new("give-options")
                        .attr_json("options", &list(data, "options"))
                        .into_markup(),
                );
            }
            Self::LifeGroups => {
                m.push(paragraph("intro", text(data, "intro")));
                m.push(grid("life-group", &list(data, "groups")));
            }
        }
        m
    }
}

pub struct Page {
    kind: PageKind,
    api: Rc<dyn Api>,
    store: Store,
}

impl Page {
    pub fn new(kind: PageKind, api: Rc<dyn Api>, store: Store) -> Self {
        Self { kind, api, store }
    }
}

impl Component for Page {
    fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        this.set("loading", json!(true));
        this.set("error", Value::Null);
        this.render();

        let kind = self.kind;
        let request = self.api.get(&kind.api_path());
        let store = self.store.clone();
        let task = this.clone();
        this.spawn(async move {
            let result = request.await;
            if !task.is_attached() {
                tracing::debug!("<{}> left the document before its data arrived", kind.tag());
                return;
            }

            task.set("loading", json!(false));
            match result {
                Ok(data) => {
                    if kind == PageKind::Home {
                        publish_site(&store, &data);
                    }
                    task.set("error", Value::Null);
                    task.set("data", data);
                }
                Err(e) => {
                    tracing::warn!("Loading {} failed: {}", kind.api_path(), e);
                    task.set("error", json!(e.user_message()));
                }
            }
            task.render();
        });
    }

    fn render(&self, scope: &Scope<'_>) -> Markup {
        let body = if scope.flag("loading") {
            Tag::new("p").class("loading").text("Loading…").into_markup()
        } else if let Some(message) = scope.get_str("error") {
            Tag::new("p")
                .class("error")
                .attr_text("role", "alert")
                .text(message)
                .into_markup()
        } else {
            scope
                .get("data")
                .map(|data| self.kind.body(data))
                .unwrap_or_default()
        };

        let mut m = Tag::new("site-banner").into_markup();
        m.push(
            Tag::new("main")
                .class(&format!("page page-{}", self.kind.slug()))
                .child(body)
                .into_markup(),
        );
        m
    }
}

/// Make the church's name and service times available to every banner
fn publish_site(store: &Store, data: &Value) {
    let mut summary: SiteSummary = match serde_json::from_value(data.clone()) {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!("Home page data has no usable site summary: {}", e);
            return;
        }
    };
    if summary.name.is_empty() {
        summary.name = text(data, "title").to_string();
    }
    match serde_json::to_value(&summary) {
        Ok(value) => store.set(STORE_SITE_KEY, value),
        Err(e) => tracing::warn!("Could not publish site summary: {}", e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Markup helpers
// ─────────────────────────────────────────────────────────────────────────────

fn text<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("")
}

fn list(data: &Value, key: &str) -> Value {
    match data.get(key) {
        Some(items @ Value::Array(_)) => items.clone(),
        _ => Value::Array(Vec::new()),
    }
}

fn strings(data: &Value, key: &str) -> Vec<String> {
    data.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn paragraph(class: &str, content: &str) -> Markup {
    let content = content.trim();
    if content.is_empty() {
        return Markup::new();
    }
    Tag::new("p").class(class).text(content).into_markup()
}

fn section(heading: &str, content: Markup) -> Markup {
    Tag::new("section")
        .child(Tag::new("h2").text(heading).into_markup())
        .child(content)
        .into_markup()
}

fn grid(kind: &str, items: &Value) -> Markup {
    Tag::new("card-grid")
        .attr_text("kind", kind)
        .attr_json("items", items)
        .into_markup()
}
