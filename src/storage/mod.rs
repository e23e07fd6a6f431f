// Storage module - writes rendered pages to disk
//
// Each page lands at <out_dir>/<slug>.html wrapped in a minimal document.
// Alongside them, render-log.jsonl gets one JSON object per written page,
// appended across runs so successive renders can be compared:
//   jq 'select(.slug == "home")' site/render-log.jsonl

use crate::codec;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const RENDER_LOG: &str = "render-log.jsonl";

/// One line of the render log
#[derive(Debug, Serialize)]
pub struct PageRecord {
    pub slug: String,
    pub path: PathBuf,
    pub bytes: usize,
    pub rendered_at: DateTime<Utc>,
}

/// Writes rendered pages into an output directory
pub struct SiteWriter {
    out_dir: PathBuf,
}

impl SiteWriter {
    /// Create the writer, creating the output directory if needed
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create output directory {:?}", out_dir))?;
        Ok(Self { out_dir })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn page_path(&self, slug: &str) -> PathBuf {
        self.out_dir.join(format!("{}.html", slug))
    }

    /// Write one page's document and record it in the render log
    pub fn write_page(&self, slug: &str, title: &str, body: &str) -> Result<PathBuf> {
        let path = self.page_path(slug);
        let html = document(title, body);
        fs::write(&path, &html).with_context(|| format!("Failed to write {:?}", path))?;

        self.record(&PageRecord {
            slug: slug.to_string(),
            path: path.clone(),
            bytes: html.len(),
            rendered_at: Utc::now(),
        })?;

        tracing::info!("Wrote {} ({} bytes)", path.display(), html.len());
        Ok(path)
    }

    fn record(&self, record: &PageRecord) -> Result<()> {
        let log_path = self.out_dir.join(RENDER_LOG);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .context("Failed to open render log")?;

        let json = serde_json::to_string(record).context("Failed to serialize page record")?;
        writeln!(file, "{}", json).context("Failed to write to render log")?;
        Ok(())
    }
}

/// Wrap rendered body markup in a standalone HTML document
pub fn document(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        codec::escape_text(title),
        body
    )
}
