//! Settings Models
//!
//! Configuration stored in `<root>/config.json`.

use serde::{Deserialize, Serialize};

/// Application configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Network fetch behaviour
    #[serde(default)]
    pub fetch: FetchSettings,
    /// Skill activation behaviour
    #[serde(default)]
    pub matcher: MatcherSettings,
}

/// Retry and timeout policy for fetching indexes and bundles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Total attempts for a transient failure (first try included)
    pub max_attempts: u32,
    /// Delay before the first retry, doubled each attempt
    pub initial_backoff_ms: u64,
    /// Upper bound on a single retry delay
    pub max_backoff_ms: u64,
    /// Per-request HTTP timeout
    pub timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            timeout_secs: 30,
        }
    }
}

/// Relevance threshold and output budget for skill matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherSettings {
    /// Minimum relevance score for a skill to activate
    pub min_score: f32,
    /// Max skills injected per task (0 = unlimited)
    pub top_k: usize,
    /// Max lines per skill body in the injected context
    pub max_content_lines: usize,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            min_score: skillmart_core::DEFAULT_MIN_SCORE,
            top_k: 3,
            max_content_lines: 200,
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub max_attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub min_score: Option<f32>,
    pub top_k: Option<usize>,
    pub max_content_lines: Option<usize>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(attempts) = update.max_attempts {
            self.fetch.max_attempts = attempts;
        }
        if let Some(ms) = update.initial_backoff_ms {
            self.fetch.initial_backoff_ms = ms;
        }
        if let Some(ms) = update.max_backoff_ms {
            self.fetch.max_backoff_ms = ms;
        }
        if let Some(secs) = update.timeout_secs {
            self.fetch.timeout_secs = secs;
        }
        if let Some(score) = update.min_score {
            self.matcher.min_score = score;
        }
        if let Some(k) = update.top_k {
            self.matcher.top_k = k;
        }
        if let Some(lines) = update.max_content_lines {
            self.matcher.max_content_lines = lines;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.fetch.max_attempts == 0 || self.fetch.max_attempts > 10 {
            return Err(format!(
                "fetch.max_attempts must be between 1 and 10, got {}",
                self.fetch.max_attempts
            ));
        }

        if self.fetch.initial_backoff_ms > self.fetch.max_backoff_ms {
            return Err("fetch.initial_backoff_ms cannot exceed fetch.max_backoff_ms".to_string());
        }

        if self.fetch.timeout_secs == 0 {
            return Err("fetch.timeout_secs must be at least 1".to_string());
        }

        if !self.matcher.min_score.is_finite() || self.matcher.min_score < 0.0 {
            return Err(format!(
                "matcher.min_score must be a non-negative number, got {}",
                self.matcher.min_score
            ));
        }

        if self.matcher.max_content_lines == 0 {
            return Err("matcher.max_content_lines must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.fetch.max_attempts, 3);
        assert_eq!(config.matcher.top_k, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_update() {
        let mut config = AppConfig::default();
        config.apply_update(SettingsUpdate {
            max_attempts: Some(5),
            min_score: Some(0.5),
            ..Default::default()
        });
        assert_eq!(config.fetch.max_attempts, 5);
        assert_eq!(config.matcher.min_score, 0.5);
        assert_eq!(config.matcher.top_k, 3);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = AppConfig::default();
        config.fetch.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_score() {
        let mut config = AppConfig::default();
        config.matcher.min_score = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"fetch": {"max_attempts": 2}}"#).unwrap();
        assert_eq!(config.fetch.max_attempts, 2);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.matcher, MatcherSettings::default());
    }
}
