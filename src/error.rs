use thiserror::Error;

/// Errors that can escape the public API.
///
/// Per-candidate extraction failure never appears here: a candidate that
/// cannot be extracted is skipped or replaced by the synthetic fallback, and
/// the batch call still succeeds.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A search term produced an unusable search URL
    #[error("Invalid search URL: {0}")]
    InvalidSearchUrl(#[from] url::ParseError),

    /// Builder misconfiguration
    #[error("Builder error: {0}")]
    Builder(String),
}

/// Fetch failure taxonomy. The orchestrator only distinguishes permanent
/// from transient; everything else is detail for the log.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP 404 — permanent, never retried
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success status on the final attempt
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// Transport-level failure on the final attempt
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// All attempts failed with retryable errors
    #[error("Gave up on {url} after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },
}

impl FetchError {
    /// Permanent failures are skipped immediately by the orchestrator;
    /// transient ones already went through the fetcher's retry loop.
    pub fn is_permanent(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}
