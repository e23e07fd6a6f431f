//! `hero-carousel`: rotating banner slides on the home page
//!
//! Decodes its `slides` attribute once attached and advances `index` on a
//! timer owned by the instance. An `interval` attribute (milliseconds)
//! overrides the configured rotation period.

use super::model::Slide;
use crate::component::{Component, Markup, Scope, Tag};
use crate::host::ComponentHandle;
use serde_json::{json, Value};
use std::time::Duration;

pub struct HeroCarousel {
    interval: Duration,
}

impl HeroCarousel {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Component for HeroCarousel {
    fn tag(&self) -> &'static str {
        "hero-carousel"
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        let slides: Vec<Slide> = this.attr_as("slides").unwrap_or_default();
        let count = slides.len();
        this.set("slides", serde_json::to_value(&slides).unwrap_or(Value::Null));
        this.set("index", json!(0));
        this.render();

        if count < 2 {
            return;
        }
        let period = this
            .attr_as::<u64>("interval")
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(self.interval);
        this.every(period, move |this| {
            let index = this.get_as::<usize>("index").unwrap_or(0);
            this.set("index", json!((index + 1) % count));
            this.render();
        });
    }

    fn render(&self, scope: &Scope<'_>) -> Markup {
        let slides: Vec<Slide> = scope.get_as("slides").unwrap_or_default();
        if slides.is_empty() {
            return Markup::new();
        }
        let active = scope.get_as::<usize>("index").unwrap_or(0) % slides.len();

        let figures: Markup = slides
            .iter()
            .enumerate()
            .map(|(i, slide)| slide_figure(slide, i == active))
            .collect();

        let mut section = Tag::new("section")
            .class("hero")
            .attr_text("aria-roledescription", "carousel")
            .child(figures);

        if slides.len() > 1 {
            let dots: Markup = (0..slides.len())
                .map(|i| {
                    let class = if i == active { "dot active" } else { "dot" };
                    Tag::new("span").class(class).into_markup()
                })
                .collect();
            section = section.child(Tag::new("nav").class("dots").child(dots).into_markup());
        }
        section.into_markup()
    }
}

fn slide_figure(slide: &Slide, active: bool) -> Markup {
    let mut caption = Tag::new("figcaption")
        .child(Tag::new("h2").text(&slide.heading).into_markup());
    if !slide.caption.is_empty() {
        caption = caption.child(Tag::new("p").text(&slide.caption).into_markup());
    }
    if let Some(link) = slide.link.as_deref().filter(|l| !l.is_empty()) {
        caption = caption.child(
            Tag::new("a")
                .attr_text("href", link)
                .text("Learn more")
                .into_markup(),
        );
    }

    let mut figure = Tag::new("figure").class(if active { "slide active" } else { "slide" });
    figure = figure.flag("hidden", !active);
    if !slide.image.is_empty() {
        figure = figure.child(
            Tag::void("img")
                .attr_text("src", &slide.image)
                .attr_text("alt", &slide.heading)
                .into_markup(),
        );
    }
    figure.child(caption.into_markup()).into_markup()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use crate::codec;
    use crate::component::Attributes;
    use crate::site::testing;
    use tokio::task::LocalSet;

    fn slides(n: usize) -> String {
        let slides: Vec<Value> = (0..n)
            .map(|i| json!({"heading": format!("Slide {}", i), "image": format!("/img/{}.jpg", i)}))
            .collect();
        codec::encode(&slides).unwrap().into_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_advances_and_wraps() {
        LocalSet::new()
            .run_until(async {
                let (doc, _) = testing::site(MemoryApi::new());
                let carousel = doc
                    .mount(
                        "hero-carousel",
                        Attributes::from_raw([("slides", slides(3)), ("interval", "1000".into())]),
                    )
                    .unwrap();
                assert_eq!(carousel.get("index"), Some(json!(0)));

                tokio::time::sleep(Duration::from_millis(1500)).await;
                assert_eq!(carousel.get("index"), Some(json!(1)));

                tokio::time::sleep(Duration::from_millis(2000)).await;
                assert_eq!(carousel.get("index"), Some(json!(0)));
                assert!(carousel
                    .outer_html()
                    .unwrap()
                    .contains("<figure class=\"slide active\"><img src=\"/img/0.jpg\""));

                carousel.detach();
                let renders = carousel.render_count();
                tokio::time::sleep(Duration::from_millis(5000)).await;
                assert_eq!(carousel.render_count(), renders);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_slide_does_not_rotate() {
        LocalSet::new()
            .run_until(async {
                let (doc, _) = testing::site(MemoryApi::new());
                let carousel = doc
                    .mount("hero-carousel", Attributes::from_raw([("slides", slides(1))]))
                    .unwrap();

                tokio::time::sleep(Duration::from_secs(60)).await;
                assert_eq!(carousel.render_count(), 1);
                assert!(!carousel.outer_html().unwrap().contains("class=\"dots\""));
            })
            .await;
    }

    #[test]
    fn test_bad_slides_attribute_renders_nothing() {
        let (doc, _) = testing::site(MemoryApi::new());
        let carousel = doc
            .mount("hero-carousel", Attributes::from_raw([("slides", "{broken")]))
            .unwrap();
        assert_eq!(
            carousel.outer_html().unwrap(),
            "<hero-carousel slides=\"{broken\"></hero-carousel>"
        );
    }

    #[test]
    fn test_inactive_slides_are_hidden() {
        let slide = Slide {
            heading: "Easter".into(),
            ..Slide::default()
        };
        let html = slide_figure(&slide, false).into_string();
        assert_eq!(
            html,
            "<figure class=\"slide\" hidden><figcaption><h2>Easter</h2></figcaption></figure>"
        );
    }
}
