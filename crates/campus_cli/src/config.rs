//! campus.toml handling
//!
//! ```toml
//! [selector]
//! debounce_ms = 250
//! blur_grace_ms = 150
//!
//! [demo]
//! search_latency_ms = 80
//! ```

use anyhow::{Context, Result};
use campus_select::SelectorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration file
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CampusConfig {
    #[serde(default)]
    pub selector: SelectorConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Artificial latency of the mock services
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemoConfig {
    /// Base latency of the student directory
    #[serde(default = "default_search_latency_ms")]
    pub search_latency_ms: u64,
    /// Latency of the grading service
    #[serde(default = "default_grading_latency_ms")]
    pub grading_latency_ms: u64,
    /// Latency of the room slot listing
    #[serde(default = "default_slots_latency_ms")]
    pub slots_latency_ms: u64,
    /// Latency of the booking lookup
    #[serde(default = "default_bookings_latency_ms")]
    pub bookings_latency_ms: u64,
}

fn default_search_latency_ms() -> u64 {
    120
}

fn default_grading_latency_ms() -> u64 {
    200
}

fn default_slots_latency_ms() -> u64 {
    40
}

fn default_bookings_latency_ms() -> u64 {
    90
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            search_latency_ms: default_search_latency_ms(),
            grading_latency_ms: default_grading_latency_ms(),
            slots_latency_ms: default_slots_latency_ms(),
            bookings_latency_ms: default_bookings_latency_ms(),
        }
    }
}

impl CampusConfig {
    /// Load from `path`, or use defaults if no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse and validate TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let config: CampusConfig = toml::from_str(content)?;
        config.selector.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = CampusConfig::parse("").unwrap();
        assert_eq!(config.selector, SelectorConfig::default());
        assert_eq!(config.demo.search_latency_ms, 120);
    }

    #[test]
    fn test_partial_tables() {
        let config = CampusConfig::parse(
            r#"
            [selector]
            debounce_ms = 250

            [demo]
            grading_latency_ms = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.selector.debounce_ms, 250);
        assert_eq!(config.selector.blur_grace_ms, 150);
        assert_eq!(config.demo.grading_latency_ms, 10);
        assert_eq!(config.demo.bookings_latency_ms, 90);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = CampusConfig::parse("[selector]\nblur_grace_ms = 9000\n").unwrap_err();
        assert!(err.to_string().contains("blur"));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = CampusConfig::load(Some(Path::new("/nonexistent/campus.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/campus.toml"));
    }
}
