//! Bounded HTTP fetching.
//!
//! The fetcher trades completeness for predictability: it stops reading a
//! body at a byte ceiling, gives every attempt a hard timeout, and retries
//! transient failures with a different browser header profile each time.

use crate::config::PipelineConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seam for injecting test doubles (slow fetchers, canned bodies) into the
/// orchestrator.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Realistic browser header profiles rotated across attempts. A 403 retried
/// with the same profile tends to 403 again.
const HEADER_PROFILES: &[(&str, &str, &str)] = &[
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        "en-US,en;q=0.9",
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        "en-US,en;q=0.8",
    ),
    (
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        "en-GB,en;q=0.7",
    ),
];

pub struct HttpFetcher {
    client: Client,
    max_bytes: usize,
    retries: u32,
    backoff: Duration,
    profile_seed: usize,
}

impl HttpFetcher {
    pub fn new(config: &PipelineConfig) -> Self {
        let client = Client::builder()
            .timeout(config.fetch_timeout())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to create HTTP client");

        // Seed the profile rotation from the wall clock so different runs
        // start from different profiles; retries advance from the seed.
        let profile_seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as usize)
            .unwrap_or(0);

        Self {
            client,
            max_bytes: config.fetch_max_bytes,
            retries: config.fetch_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
            profile_seed,
        }
    }

    fn headers_for(&self, attempt: u32) -> HeaderMap {
        let (agent, accept, language) =
            HEADER_PROFILES[(self.profile_seed + attempt as usize) % HEADER_PROFILES.len()];
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(agent));
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(language));
        headers
    }

    /// One GET. Streams the body and stops at the byte ceiling, returning the
    /// truncated content; bounded memory matters more than completeness here.
    async fn attempt(&self, url: &str, attempt: u32) -> Result<String, FetchError> {
        debug!("fetching {url} (attempt {})", attempt + 1);
        let response = self
            .client
            .get(url)
            .headers(self.headers_for(attempt))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut body: Vec<u8> = Vec::with_capacity(self.max_bytes.min(64 * 1024));
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let remaining = self.max_bytes - body.len();
            if chunk.len() >= remaining {
                body.extend_from_slice(&chunk[..remaining]);
                debug!("truncating {url} at {} bytes", self.max_bytes);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        // Lossy decoding absorbs both non-UTF-8 charsets and a multi-byte
        // sequence split by the truncation point.
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let attempts = self.retries + 1;
        for attempt in 0..attempts {
            match self.attempt(url, attempt).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_permanent() => return Err(err),
                Err(err) => {
                    warn!("fetch attempt {} for {url} failed: {err}", attempt + 1);
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.backoff * (attempt + 1)).await;
                    }
                }
            }
        }
        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts,
        })
    }
}
