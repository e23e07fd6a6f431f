// Chapel - static renderer for a church website
//
// Pages are reactive components mounted in a headless document. Each one
// fetches its content from the site's API, renders into nested components
// (banner, hero carousel, card grids, give options) and is written out as
// a standalone HTML file once every fetch has settled.
//
// The library does the work; this binary parses arguments, installs
// logging and prints the outcome of a render run.

mod cli;

use anyhow::Result;
use chapel::config::{self, Config};
use chapel::logging::{self, LogBuffer};
use chapel::render;
use tokio::task::LocalSet;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Handle CLI commands first (config --show, --reset, --path)
    let Some(args) = cli::handle_cli() else {
        return Ok(());
    };

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();
    let config = Config::from_env();

    // Warnings and errors are kept for the end-of-run summary
    let diagnostics = LogBuffer::new();
    let _file_guard = logging::init(&config.logging, diagnostics.clone());

    tracing::debug!("chapel {} starting", config::VERSION);

    let pages = args.page_kinds()?;

    // Components share state through Rc, so everything runs on one LocalSet
    let report = LocalSet::new()
        .run_until(render::render_site(
            &config,
            &pages,
            args.out.as_deref(),
            args.offline.as_deref(),
        ))
        .await?;

    for path in &report.written {
        println!("{}", path.display());
    }
    for (slug, message) in &report.failed {
        eprintln!("{}: {}", slug, message);
    }
    if let Some(summary) = diagnostics.summary() {
        eprintln!("Finished with {}", summary);
        for entry in diagnostics.get_all() {
            eprintln!("  {}", entry);
        }
    }

    tracing::info!(
        "Rendered {} page(s), {} with errors",
        report.written.len(),
        report.failed.len()
    );
    Ok(())
}
