//! Chapel - static renderer for a church website
//!
//! Pages are reactive components mounted in a headless document. Each one
//! fetches its content from the site's API, renders into nested components
//! (banner, hero carousel, card grids, give options) and is written out as
//! a standalone HTML file once every fetch has settled.
//!
//! ```text
//! codec       HTML-entity-escaped JSON for passing data through attributes
//! store       shared state with shallow-merge writes and subscriptions
//! component   the Component trait, attributes and markup building
//! host        component lifecycle, rendering and child mounting
//! api         content API client (HTTP, or an in-memory fixture when offline)
//! site        the church's pages, components and admin dialog
//! render      mounts pages in a document and writes their HTML
//! storage     writes rendered pages
//! ```
//!
//! The `chapel` binary is a thin CLI over [`render::render_site`].

pub mod api;
pub mod codec;
pub mod component;
pub mod config;
pub mod host;
pub mod logging;
pub mod render;
pub mod site;
pub mod storage;
pub mod store;
pub mod util;
