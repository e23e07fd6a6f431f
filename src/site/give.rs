//! `give-options`: ways to give, from the give page's `options` attribute

use super::model::GiveOption;
use crate::component::{Component, Markup, Scope, Tag};
use crate::host::ComponentHandle;
use serde_json::Value;

pub struct GiveOptions;

impl Component for GiveOptions {
    fn tag(&self) -> &'static str {
        "give-options"
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        let options: Vec<GiveOption> = this.attr_as("options").unwrap_or_default();
        this.set(
            "options",
            serde_json::to_value(&options).unwrap_or(Value::Array(Vec::new())),
        );
        this.render();
    }

    fn render(&self, scope: &Scope<'_>) -> Markup {
        let options: Vec<GiveOption> = scope.get_as("options").unwrap_or_default();
        if options.is_empty() {
            return Tag::new("p")
                .class("empty")
                .text("Online giving is not available right now.")
                .into_markup();
        }

        let items: Markup = options
            .iter()
            .map(|option| {
                let mut item = Tag::new("li").class("give-option");
                item = if option.url.is_empty() {
                    item.child(Tag::new("strong").text(&option.label).into_markup())
                } else {
                    item.child(
                        Tag::new("a")
                            .attr_text("href", &option.url)
                            .attr_text("rel", "noopener")
                            .text(&option.label)
                            .into_markup(),
                    )
                };
                if !option.description.is_empty() {
                    item = item.child(Tag::new("p").text(&option.description).into_markup());
                }
                item.into_markup()
            })
            .collect();

        Tag::new("ul").class("give-options").child(items).into_markup()
    }
}
