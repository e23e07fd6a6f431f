//! The church site built on the component layer
//!
//! ```text
//! <home-page>                      pages fetch pages/<slug>
//!   <site-banner>                  follows store key `site`
//!   <main>
//!     <hero-carousel slides=…>     rotation timer
//!     <card-grid kind=… items=…>   ministry / event / life-group / testimonial
//!     <give-options options=…>
//! <admin-dialog resource=…>        CRUD, list in store key `admin.<resource>`
//! ```

mod admin;
mod banner;
mod cards;
mod carousel;
mod give;
pub mod model;
mod page;

pub use admin::AdminDialog;
pub use banner::SiteBanner;
pub use cards::CardGrid;
pub use carousel::HeroCarousel;
pub use give::GiveOptions;
pub use page::{Page, PageKind};

use crate::api::Api;
use crate::host::{HostError, Registry};
use crate::store::Store;
use std::rc::Rc;
use std::time::Duration;

/// Store key holding the [`model::SiteSummary`] published by the home page
pub const STORE_SITE_KEY: &str = "site";

/// What the site's components are built with
#[derive(Clone)]
pub struct SiteContext {
    pub api: Rc<dyn Api>,
    pub store: Store,
    /// Default hero carousel rotation period
    pub carousel_interval: Duration,
}

/// Register every site element
pub fn registry(ctx: &SiteContext) -> Result<Registry, HostError> {
    let mut registry = Registry::new();

    for kind in PageKind::ALL {
        let (api, store) = (ctx.api.clone(), ctx.store.clone());
        registry.register(kind.tag(), move || {
            Box::new(Page::new(kind, api.clone(), store.clone()))
        })?;
    }

    let interval = ctx.carousel_interval;
    registry.register("hero-carousel", move || Box::new(HeroCarousel::new(interval)))?;
    registry.register("card-grid", || Box::new(CardGrid))?;
    registry.register("give-options", || Box::new(GiveOptions))?;

    let store = ctx.store.clone();
    registry.register("site-banner", move || Box::new(SiteBanner::new(store.clone())))?;

    let (api, store) = (ctx.api.clone(), ctx.store.clone());
    registry.register("admin-dialog", move || {
        Box::new(AdminDialog::new(api.clone(), store.clone()))
    })?;

    tracing::debug!("Registered {} site elements", registry.tags().len());
    Ok(registry)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_element() {
        let ctx = SiteContext {
            api: Rc::new(crate::api::MemoryApi::new()),
            store: Store::new(),
            carousel_interval: Duration::from_secs(1),
        };
        let registry = registry(&ctx).unwrap();
        assert_eq!(
            registry.tags(),
            vec![
                "about-page",
                "admin-dialog",
                "card-grid",
                "events-page",
                "give-options",
                "give-page",
                "hero-carousel",
                "home-page",
                "life-groups-page",
                "ministries-page",
                "site-banner",
            ]
        );
    }
}
