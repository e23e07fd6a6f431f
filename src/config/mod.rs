//! Configuration for the site renderer
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/chapel/config.toml)
//! 3. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod logging;
mod serialization;
mod site;

#[cfg(test)]
mod tests;

pub use logging::{FileLogging, LogRotation, LoggingConfig};
pub use site::{CarouselConfig, FileCarousel};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const ENV_API_URL: &str = "CHAPEL_API_URL";
const ENV_OUT_DIR: &str = "CHAPEL_OUT_DIR";
const ENV_REQUEST_TIMEOUT: &str = "CHAPEL_REQUEST_TIMEOUT_SECS";

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the content API (`pages/<slug>`, `admin/<resource>`)
    pub api_url: String,

    /// Directory rendered pages are written to
    pub out_dir: PathBuf,

    /// Per-request timeout for the content API
    pub request_timeout_secs: u64,

    /// Hero carousel settings
    pub carousel: CarouselConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000/api".to_string(),
            out_dir: PathBuf::from("./site"),
            request_timeout_secs: 10,
            carousel: CarouselConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Config as loaded from TOML file (all fields optional)
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub out_dir: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub carousel: Option<FileCarousel>,
    pub logging: Option<FileLogging>,
}

impl Config {
    /// Get the config file path: ~/.config/chapel/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("chapel").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Config is optional
            }
        }

        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load file config if it exists
    ///
    /// Exits the process if the file exists but cannot be read or parsed.
    /// A broken config fails fast rather than falling back to defaults.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                    eprintln!("║  CONFIG ERROR - Failed to parse configuration file          ║");
                    eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                    eprintln!("  File: {}\n", path.display());
                    eprintln!("  Error: {}\n", e);
                    eprintln!("  To reset, run `chapel config --reset`.\n");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                eprintln!("║  CONFIG ERROR - Cannot read configuration file              ║");
                eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                eprintln!("  File: {}\n", path.display());
                eprintln!("  Error: {}\n", e);
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: env vars > file > defaults
    pub fn from_env() -> Self {
        Self::resolve(Self::load_file_config(), |key| std::env::var(key).ok())
    }

    /// Layer environment lookups over a parsed file
    pub(crate) fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let api_url = env(ENV_API_URL)
            .filter(|v| !v.trim().is_empty())
            .or(file.api_url)
            .unwrap_or(defaults.api_url);

        let out_dir = env(ENV_OUT_DIR)
            .filter(|v| !v.trim().is_empty())
            .or(file.out_dir)
            .map(PathBuf::from)
            .unwrap_or(defaults.out_dir);

        // Unparseable env values fall through to the file
        let request_timeout_secs = env(ENV_REQUEST_TIMEOUT)
            .and_then(|v| v.trim().parse().ok())
            .or(file.request_timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or(defaults.request_timeout_secs);

        Self {
            api_url,
            out_dir,
            request_timeout_secs,
            carousel: CarouselConfig::from_file(file.carousel),
            logging: LoggingConfig::from_file(file.logging),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
