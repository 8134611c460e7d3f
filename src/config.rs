use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Tunables for the extraction pipeline.
///
/// The budget policy (overall deadline, growing per-candidate allowance,
/// early stop) is fixed in code; the numbers behind it are configuration.
/// Defaults reflect what worked in practice, not a contract.
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Per-URL fetch timeout in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Stop reading a response body after this many bytes
    #[serde(default = "default_fetch_max_bytes")]
    pub fetch_max_bytes: usize,
    /// Extra attempts after the first failed fetch (403/5xx/transport only)
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,
    /// Base backoff between fetch attempts in milliseconds (linear)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Cache entry time-to-live in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Wall-clock ceiling for a whole batch in seconds
    #[serde(default = "default_overall_budget_secs")]
    pub overall_budget_secs: u64,
    /// Per-candidate allowance before growth, in seconds
    #[serde(default = "default_candidate_base_secs")]
    pub candidate_base_secs: u64,
    /// Allowance growth per already-processed candidate, in seconds
    #[serde(default = "default_candidate_growth_secs")]
    pub candidate_growth_secs: u64,
    /// Minimum remaining batch budget before the assistant tier is allowed
    #[serde(default = "default_assistant_min_slack_secs")]
    pub assistant_min_slack_secs: u64,
    /// Per-call assistant timeout in seconds
    #[serde(default = "default_assistant_timeout_secs")]
    pub assistant_timeout_secs: u64,
    /// Hard cap on the text excerpt handed to the assistant
    #[serde(default = "default_excerpt_max_chars")]
    pub excerpt_max_chars: usize,
    /// Maximum candidate links taken from a search-results page
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Concurrent candidates in flight
    #[serde(default = "default_worker_limit")]
    pub worker_limit: usize,
    /// Default target result count when the caller passes 0
    #[serde(default = "default_target_results")]
    pub target_results: usize,
    /// Language-assistant settings
    #[serde(default)]
    pub assistant: AssistantConfig,
}

/// Settings for the external language assistant (last-resort tier).
#[derive(Debug, Deserialize, Clone)]
pub struct AssistantConfig {
    /// Whether the assistant tier is used at all
    #[serde(default)]
    pub enabled: bool,
    /// API key; falls back to the OPENAI_API_KEY environment variable
    pub api_key: Option<String>,
    /// Endpoint base URL (overridable for tests and proxies)
    #[serde(default = "default_assistant_base_url")]
    pub base_url: String,
    /// Model identifier
    #[serde(default = "default_assistant_model")]
    pub model: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            base_url: default_assistant_base_url(),
            model: default_assistant_model(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            fetch_max_bytes: default_fetch_max_bytes(),
            fetch_retries: default_fetch_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            overall_budget_secs: default_overall_budget_secs(),
            candidate_base_secs: default_candidate_base_secs(),
            candidate_growth_secs: default_candidate_growth_secs(),
            assistant_min_slack_secs: default_assistant_min_slack_secs(),
            assistant_timeout_secs: default_assistant_timeout_secs(),
            excerpt_max_chars: default_excerpt_max_chars(),
            max_candidates: default_max_candidates(),
            worker_limit: default_worker_limit(),
            target_results: default_target_results(),
            assistant: AssistantConfig::default(),
        }
    }
}

// Default value functions
fn default_fetch_timeout_secs() -> u64 {
    15
}

fn default_fetch_max_bytes() -> usize {
    300_000
}

fn default_fetch_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_overall_budget_secs() -> u64 {
    30
}

fn default_candidate_base_secs() -> u64 {
    8
}

fn default_candidate_growth_secs() -> u64 {
    2
}

fn default_assistant_min_slack_secs() -> u64 {
    3
}

fn default_assistant_timeout_secs() -> u64 {
    8
}

fn default_excerpt_max_chars() -> usize {
    2_500
}

fn default_max_candidates() -> usize {
    10
}

fn default_worker_limit() -> usize {
    2
}

fn default_target_results() -> usize {
    3
}

fn default_assistant_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_assistant_model() -> String {
    "gpt-4o-mini".to_string()
}

impl PipelineConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables with HARVEST__ prefix
    ///    (e.g. HARVEST__ASSISTANT__API_KEY)
    /// 2. harvest.toml in the current directory
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("harvest").required(false))
            .add_source(Environment::with_prefix("HARVEST").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn overall_budget(&self) -> Duration {
        Duration::from_secs(self.overall_budget_secs)
    }

    /// Allowance for the `index`-th candidate: grows with each processed
    /// item so one slow page cannot starve the rest of the batch.
    pub fn candidate_allowance(&self, index: usize) -> Duration {
        Duration::from_secs(self.candidate_base_secs + self.candidate_growth_secs * index as u64)
    }

    pub fn assistant_min_slack(&self) -> Duration {
        Duration::from_secs(self.assistant_min_slack_secs)
    }

    pub fn assistant_timeout(&self) -> Duration {
        Duration::from_secs(self.assistant_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.fetch_max_bytes, 300_000);
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(86_400));
        assert_eq!(cfg.overall_budget(), Duration::from_secs(30));
        assert!(!cfg.assistant.enabled);
    }

    #[test]
    fn candidate_allowance_grows() {
        let cfg = PipelineConfig::default();
        assert!(cfg.candidate_allowance(3) > cfg.candidate_allowance(0));
        assert_eq!(cfg.candidate_allowance(0), Duration::from_secs(8));
        assert_eq!(cfg.candidate_allowance(2), Duration::from_secs(12));
    }
}
