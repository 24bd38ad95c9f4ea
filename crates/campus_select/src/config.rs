//! Selector configuration
//!
//! Every timing constant a selector uses lives here, so call sites can tune
//! them per form. Student lookup uses `debounce_ms` and GPA what-if requests
//! use `simulation_debounce_ms`. Hosts usually load this from the `[selector]`
//! table of `campus.toml`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectError};

/// Longest blur grace period accepted; anything longer reads as a hang
const MAX_BLUR_GRACE_MS: u64 = 2_000;

/// Longest quiet period accepted
const MAX_DEBOUNCE_MS: u64 = 10_000;

/// How the selector closes when its input loses focus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlurPolicy {
    /// Keep the panel open for this many milliseconds after blur so a
    /// pointer-down inside the panel can still commit
    GraceDelay(u64),
    /// The host delivers pointer-down before blur in the same turn, so blur
    /// can close immediately
    CommitBeforeClose,
}

/// Timing and gating configuration for one selector instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Quiet period before a remote search fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Quiet period before a what-if simulation request fires
    #[serde(default = "default_simulation_debounce_ms")]
    pub simulation_debounce_ms: u64,

    /// Grace period between blur and close
    #[serde(default = "default_blur_grace_ms")]
    pub blur_grace_ms: u64,

    /// Close on blur immediately; pointer-down is guaranteed to arrive first
    #[serde(default)]
    pub commit_before_close: bool,

    /// Remote queries shorter than this are not sent
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_simulation_debounce_ms() -> u64 {
    500
}

fn default_blur_grace_ms() -> u64 {
    150
}

fn default_min_query_len() -> usize {
    1
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            simulation_debounce_ms: default_simulation_debounce_ms(),
            blur_grace_ms: default_blur_grace_ms(),
            commit_before_close: false,
            min_query_len: default_min_query_len(),
        }
    }
}

impl SelectorConfig {
    /// Blur policy derived from `commit_before_close` and `blur_grace_ms`
    pub fn blur_policy(&self) -> BlurPolicy {
        if self.commit_before_close {
            BlurPolicy::CommitBeforeClose
        } else {
            BlurPolicy::GraceDelay(self.blur_grace_ms)
        }
    }

    /// Check that every timing value is within range
    pub fn validate(&self) -> Result<()> {
        if self.blur_grace_ms > MAX_BLUR_GRACE_MS {
            return Err(SelectError::InvalidConfig(format!(
                "blur_grace_ms must be at most {MAX_BLUR_GRACE_MS}, got {}",
                self.blur_grace_ms
            )));
        }
        for (name, value) in [
            ("debounce_ms", self.debounce_ms),
            ("simulation_debounce_ms", self.simulation_debounce_ms),
        ] {
            if value > MAX_DEBOUNCE_MS {
                return Err(SelectError::InvalidConfig(format!(
                    "{name} must be at most {MAX_DEBOUNCE_MS}, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SelectorConfig::default();
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.simulation_debounce_ms, 500);
        assert_eq!(config.blur_policy(), BlurPolicy::GraceDelay(150));
        assert_eq!(config.min_query_len, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SelectorConfig = toml::from_str("debounce_ms = 450").unwrap();
        assert_eq!(config.debounce_ms, 450);
        assert_eq!(config.blur_grace_ms, 150);

        let config: SelectorConfig = toml::from_str("commit_before_close = true").unwrap();
        assert_eq!(config.blur_policy(), BlurPolicy::CommitBeforeClose);
    }

    #[test]
    fn test_validate_rejects_long_grace() {
        let config = SelectorConfig {
            blur_grace_ms: 5_000,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SelectError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_long_debounce() {
        let config = SelectorConfig {
            simulation_debounce_ms: 60_000,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("simulation_debounce_ms"));
    }
}
