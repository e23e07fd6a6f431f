// Render run - mounts pages in a headless document and writes their HTML
//
// Must be driven inside a tokio LocalSet: page fetches and carousel timers
// are spawned with spawn_local.

use crate::api::{Api, HttpApi, MemoryApi};
use crate::component::Attributes;
use crate::config::Config;
use crate::host::Document;
use crate::site::{self, PageKind, SiteContext};
use crate::storage::SiteWriter;
use crate::store::Store;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// What a render run produced
#[derive(Debug, Default)]
pub struct RenderReport {
    pub written: Vec<PathBuf>,
    /// Pages that rendered their error state, with the visible message
    pub failed: Vec<(String, String)>,
}

/// Build the content source: a fixture file when offline, the API otherwise
pub fn api_for(config: &Config, offline: Option<&Path>) -> Result<Rc<dyn Api>> {
    match offline {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read fixture {:?}", path))?;
            let fixture: Value = serde_json::from_str(&text)
                .with_context(|| format!("Fixture {:?} is not valid JSON", path))?;
            let api = MemoryApi::from_fixture(fixture)
                .with_context(|| format!("Fixture {:?} is not usable", path))?;
            tracing::info!("Serving content from fixture {}", path.display());
            Ok(Rc::new(api))
        }
        None => {
            let api = HttpApi::new(&config.api_url, config.request_timeout())
                .context("Failed to create API client")?;
            tracing::info!("Serving content from {}", api.base_url());
            Ok(Rc::new(api))
        }
    }
}

/// Render `kinds` into `out`, or the configured output directory
pub async fn render_site(
    config: &Config,
    kinds: &[PageKind],
    out: Option<&Path>,
    offline: Option<&Path>,
) -> Result<RenderReport> {
    let api = api_for(config, offline)?;
    let out_dir = out.unwrap_or(&config.out_dir);
    render_pages(api, kinds, config, out_dir).await
}

pub async fn render_pages(
    api: Rc<dyn Api>,
    kinds: &[PageKind],
    config: &Config,
    out_dir: &Path,
) -> Result<RenderReport> {
    let ctx = SiteContext {
        api,
        store: Store::new(),
        carousel_interval: config.carousel.interval(),
    };
    let doc = Document::new(site::registry(&ctx)?)?;
    let writer = SiteWriter::new(out_dir)?;
    tracing::debug!("Writing pages to {}", writer.out_dir().display());

    let mut pages = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let page = doc.mount(kind.tag(), Attributes::new())?;
        tracing::debug!("Mounted <{}>", kind.tag());
        pages.push((*kind, page));
    }

    doc.settle().await;

    let mut report = RenderReport::default();
    for (kind, page) in &pages {
        let body = page
            .outer_html()
            .with_context(|| format!("<{}> is no longer in the document", kind.tag()))?;
        if let Some(message) = page.get("error").and_then(|e| e.as_str().map(String::from)) {
            report.failed.push((kind.slug().to_string(), message));
        }
        report.written.push(writer.write_page(kind.slug(), kind.title(), &body)?);
    }

    // Stops carousel timers and releases store subscriptions
    for (_, page) in pages {
        doc.unmount(page.id());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::testing;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::task::LocalSet;

    fn scratch_dir() -> PathBuf {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        std::env::temp_dir().join(format!(
            "chapel-render-{}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::SeqCst)
        ))
    }

    #[tokio::test]
    async fn test_render_all_pages_from_fixture() {
        LocalSet::new()
            .run_until(async {
                let dir = scratch_dir();
                let api = testing::fixture();
                let report = render_pages(
                    Rc::new(api.clone()),
                    &PageKind::ALL,
                    &Config::default(),
                    &dir,
                )
                .await
                .unwrap();

                assert_eq!(report.written.len(), 6);
                assert!(report.failed.is_empty());

                let home = std::fs::read_to_string(dir.join("home.html")).unwrap();
                assert!(home.contains("<title>Welcome</title>"));
                assert!(home.contains("<strong>Grace Chapel</strong>"));
                assert!(home.contains("<h1>Sunday Gathering &amp; More</h1>"));

                // Banners on other pages follow the home page's summary
                let about = std::fs::read_to_string(dir.join("about.html")).unwrap();
                assert!(about.contains("<strong>Grace Chapel</strong>"));
                assert!(about.contains("<h1>Our Story</h1>"));

                assert_eq!(api.requests().len(), 6);
                std::fs::remove_dir_all(&dir).unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_failed_page_is_reported_and_still_written() {
        LocalSet::new()
            .run_until(async {
                let dir = scratch_dir();
                let api = testing::fixture();
                api.fail("pages/events", "Calendar offline");

                let report = render_pages(
                    Rc::new(api),
                    &[PageKind::Events],
                    &Config::default(),
                    &dir,
                )
                .await
                .unwrap();

                assert_eq!(
                    report.failed,
                    vec![("events".to_string(), "Calendar offline".to_string())]
                );
                let events = std::fs::read_to_string(dir.join("events.html")).unwrap();
                assert!(events.contains("role=\"alert\">Calendar offline</p>"));
                std::fs::remove_dir_all(&dir).unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_bundled_fixture_serves_every_page() {
        let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site.json");
        let api = api_for(&Config::default(), Some(fixture.as_path())).unwrap();
        for kind in PageKind::ALL {
            assert!(api.get(&kind.api_path()).await.is_ok(), "{}", kind.slug());
        }
    }

    #[test]
    fn test_missing_fixture_is_an_error() {
        let err = api_for(&Config::default(), Some(Path::new("/nonexistent/site.json")))
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to read fixture"));
    }
}
