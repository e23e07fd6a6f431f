//! `site-banner`: church name and service times shown atop every page
//!
//! Reads the `site` summary from the store and follows it, so a banner
//! rendered before the home page's data arrived updates in place.

use super::model::SiteSummary;
use super::STORE_SITE_KEY;
use crate::component::{Component, Markup, Scope, Tag};
use crate::host::ComponentHandle;
use crate::store::Store;

pub struct SiteBanner {
    store: Store,
}

impl SiteBanner {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl Component for SiteBanner {
    fn tag(&self) -> &'static str {
        "site-banner"
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        if let Some(site) = self.store.get(STORE_SITE_KEY) {
            this.set("site", site);
        }
        this.subscribe(&self.store, |this, state| {
            let Some(site) = state.get(STORE_SITE_KEY) else {
                return;
            };
            if this.get("site").as_ref() != Some(site) {
                this.set("site", site.clone());
                this.render();
            }
        });
        this.render();
    }

    fn render(&self, scope: &Scope<'_>) -> Markup {
        let site: SiteSummary = scope.get_as("site").unwrap_or_default();
        let name = if site.name.is_empty() {
            "Welcome"
        } else {
            site.name.as_str()
        };

        let mut header = Tag::new("header")
            .class("site-banner")
            .child(Tag::new("strong").text(name).into_markup());
        if !site.tagline.is_empty() {
            header = header.child(Tag::new("span").text(&site.tagline).into_markup());
        }
        if !site.service_times.is_empty() {
            let times: Markup = site
                .service_times
                .iter()
                .map(|t| Tag::new("li").text(t).into_markup())
                .collect();
            header = header.child(Tag::new("ul").class("service-times").child(times).into_markup());
        }
        header.into_markup()
    }
}
