// CLI module - command-line argument parsing and handlers
//
// Subcommands:
// - render [PAGE...]: render pages to static HTML (the default)
// - config --show: Display effective configuration
// - config --path: Show config file path
// - config --reset: Regenerate config file with defaults

use anyhow::{bail, Result};
use chapel::config::{Config, VERSION};
use chapel::site::PageKind;
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

/// Chapel - church site renderer
#[derive(Parser, Debug)]
#[command(name = "chapel")]
#[command(version = VERSION)]
#[command(about = "Render the church site's pages from its content API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render pages to static HTML
    Render(RenderArgs),

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct RenderArgs {
    /// Pages to render (home, about, ministries, events, give, life-groups).
    /// Renders every page when omitted.
    pub pages: Vec<String>,

    /// Output directory (overrides config and CHAPEL_OUT_DIR)
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Serve content from a JSON fixture instead of the API
    #[arg(long, value_name = "FIXTURE")]
    pub offline: Option<PathBuf>,
}

impl RenderArgs {
    /// Requested pages in site order, home first, each once
    pub fn page_kinds(&self) -> Result<Vec<PageKind>> {
        if self.pages.is_empty() {
            return Ok(PageKind::ALL.to_vec());
        }

        let mut requested = Vec::with_capacity(self.pages.len());
        for slug in &self.pages {
            match PageKind::from_slug(slug.trim()) {
                Some(kind) => requested.push(kind),
                None => {
                    let known: Vec<&str> = PageKind::ALL.iter().map(|k| k.slug()).collect();
                    bail!("Unknown page {:?} (expected one of: {})", slug, known.join(", "));
                }
            }
        }
        Ok(PageKind::ALL
            .into_iter()
            .filter(|kind| requested.contains(kind))
            .collect())
    }
}

/// Handle CLI commands. Returns the render request when there is one to run.
pub fn handle_cli() -> Option<RenderArgs> {
    match Cli::parse().command {
        Some(Commands::Render(args)) => Some(args),
        None => Some(RenderArgs::default()),
        Some(Commands::Config { show, reset, path }) => {
            if path {
                handle_config_path();
            } else if show {
                handle_config_show();
            } else if reset {
                handle_config_reset();
            } else {
                println!("Usage: chapel config [--show|--reset|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --reset   Reset config file to defaults");
                println!("  --path    Show config file path");
            }
            None
        }
    }
}

fn handle_config_path() {
    match Config::config_path() {
        Some(path) => println!("{}", path.display()),
        None => {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
    }
}

fn handle_config_show() {
    let config = Config::from_env();

    println!("# Effective configuration (env > file > defaults)");
    println!();
    print!("{}", config.to_toml());

    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
}

fn handle_config_reset() {
    let Some(path) = Config::config_path() else {
        eprintln!("Error: Could not determine config path");
        std::process::exit(1);
    };

    if path.exists() {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        let _ = std::io::stderr().flush();

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input).is_err()
            || !input.trim().eq_ignore_ascii_case("y")
        {
            println!("Aborted.");
            return;
        }
    }

    if let Err(e) = Config::default().save() {
        eprintln!("Error writing config: {}", e);
        std::process::exit(1);
    }

    println!("Config reset to defaults: {}", path.display());
}
