//! Site component settings

use serde::Deserialize;
use std::time::Duration;

/// Hero carousel rotation
#[derive(Debug, Clone, PartialEq)]
pub struct CarouselConfig {
    /// Milliseconds each slide stays visible
    pub interval_ms: u64,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self { interval_ms: 6000 }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileCarousel {
    pub interval_ms: Option<u64>,
}

impl CarouselConfig {
    /// Create from file config with defaults. A zero interval falls back
    /// to the default since a timer cannot tick at zero.
    pub fn from_file(file: Option<FileCarousel>) -> Self {
        let file = file.unwrap_or_default();
        Self {
            interval_ms: file
                .interval_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(Self::default().interval_ms),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
