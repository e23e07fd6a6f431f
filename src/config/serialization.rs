//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Render the config as a commented TOML file
    pub fn to_toml(&self) -> String {
        format!(
            r#"# chapel configuration

# Content API base URL (CHAPEL_API_URL overrides)
api_url = "{api_url}"

# Where rendered pages are written (CHAPEL_OUT_DIR overrides)
out_dir = "{out_dir}"

# Per-request timeout in seconds
request_timeout_secs = {timeout}

# Hero carousel rotation
[carousel]
interval_ms = {interval_ms}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = "{log_level}"
# File logging (in addition to stderr)
file_enabled = {log_file_enabled}
file_dir = "{log_file_dir}"
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = "{log_file_prefix}"
"#,
            api_url = escape(&self.api_url),
            out_dir = escape(&self.out_dir.display().to_string()),
            timeout = self.request_timeout_secs,
            interval_ms = self.carousel.interval_ms,
            log_level = escape(&self.logging.level),
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = escape(&self.logging.file_dir.display().to_string()),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = escape(&self.logging.file_prefix),
        )
    }

    /// Write the current config to the config file
    pub fn save(&self) -> Result<(), std::io::Error> {
        let Some(path) = Self::config_path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config path",
            ));
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, self.to_toml())
    }
}

/// Escape a value for a TOML basic string (Windows paths carry backslashes)
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
