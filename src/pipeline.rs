//! The per-batch driver: search, candidate discovery, tiered extraction,
//! normalization, caching, and the two nested time budgets.
//!
//! The batch contract is "always return at least one recipe-shaped object
//! within the deadline". Failure never propagates; it is encoded in the
//! outcome variant and the record's notes.

use crate::assist::{LanguageAssistant, OpenAiAssistant};
use crate::cache::RecipeCache;
use crate::config::PipelineConfig;
use crate::error::HarvestError;
use crate::extractors::{
    AssistedExtractor, HeuristicHtmlExtractor, StructuredDataExtractor, TierExtractor,
};
use crate::fallback::build_fallback;
use crate::fetch::{Fetch, HttpFetcher};
use crate::ingredient::normalize_lines;
use crate::model::{
    clamp_servings, site_of, ExtractionMethod, ExtractionOutcome, RecipeDraft, RecipeRecord,
    DEFAULT_SERVINGS,
};
use crate::sites::SiteStrategy;
use futures::StreamExt;
use log::{debug, warn};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use url::Url;

pub struct RecipePipeline {
    config: PipelineConfig,
    strategy: SiteStrategy,
    fetcher: Arc<dyn Fetch>,
    cache: Arc<RecipeCache>,
    assisted: Option<AssistedExtractor>,
}

/// Builder for a pipeline with injectable parts. Everything not supplied
/// falls back to a sensible default: HTTP fetcher, fresh cache, built-in
/// default strategy, assistant only if configured.
#[derive(Default)]
pub struct RecipePipelineBuilder {
    config: Option<PipelineConfig>,
    strategy: Option<SiteStrategy>,
    fetcher: Option<Arc<dyn Fetch>>,
    cache: Option<Arc<RecipeCache>>,
    assistant: Option<Arc<dyn LanguageAssistant>>,
}

impl RecipePipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn strategy(mut self, strategy: SiteStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn Fetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn cache(mut self, cache: Arc<RecipeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn assistant(mut self, assistant: Arc<dyn LanguageAssistant>) -> Self {
        self.assistant = Some(assistant);
        self
    }

    pub fn build(self) -> Result<RecipePipeline, HarvestError> {
        let mut config = self.config.unwrap_or_default();
        if config.worker_limit == 0 {
            config.worker_limit = 1;
        }

        let assistant = match self.assistant {
            Some(assistant) => Some(assistant),
            None if config.assistant.enabled => {
                match OpenAiAssistant::new(&config.assistant, config.assistant_timeout()) {
                    Ok(assistant) => Some(Arc::new(assistant) as Arc<dyn LanguageAssistant>),
                    Err(err) => {
                        // A misconfigured assistant disables the tier, it
                        // does not break the pipeline.
                        warn!("assistant tier disabled: {err}");
                        None
                    }
                }
            }
            None => None,
        };
        let assisted = assistant
            .map(|assistant| AssistedExtractor::new(assistant, config.excerpt_max_chars));

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(&config)),
        };
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(RecipeCache::new(config.cache_ttl())));
        let strategy = self.strategy.unwrap_or_else(SiteStrategy::default_strategy);
        if !strategy.search_url_template.contains("{query}") {
            return Err(HarvestError::Builder(format!(
                "strategy {} has no {{query}} slot in its search URL template",
                strategy.name
            )));
        }

        Ok(RecipePipeline {
            config,
            strategy,
            fetcher,
            cache,
            assisted,
        })
    }
}

impl RecipePipeline {
    pub fn builder() -> RecipePipelineBuilder {
        RecipePipelineBuilder::default()
    }

    pub fn cache(&self) -> &Arc<RecipeCache> {
        &self.cache
    }

    /// Search the strategy's site and extract up to `max_results` recipes
    /// within the overall batch budget. Never empty, never an error for
    /// extraction reasons: total failure yields one synthetic fallback.
    pub async fn search_recipes(
        &self,
        term: &str,
        max_results: usize,
    ) -> Result<Vec<ExtractionOutcome>, HarvestError> {
        let target = if max_results == 0 {
            self.config.target_results
        } else {
            max_results
        };
        let deadline = Instant::now() + self.config.overall_budget();

        let search_url = self.strategy.search_url(term)?;
        debug!("searching {} for \"{term}\"", search_url);

        let candidates = match timeout_at(deadline, self.fetcher.fetch(search_url.as_str())).await
        {
            Ok(Ok(html)) => collect_candidates(
                &html,
                &search_url,
                &self.strategy,
                self.config.max_candidates,
            ),
            Ok(Err(err)) => {
                warn!("search page fetch failed: {err}");
                Vec::new()
            }
            Err(_) => {
                warn!("search page fetch blew the batch budget");
                Vec::new()
            }
        };
        debug!("{} candidate links for \"{term}\"", candidates.len());

        let mut outcomes = Vec::new();
        if !candidates.is_empty() {
            let stream = futures::stream::iter(
                candidates
                    .into_iter()
                    .enumerate()
                    .map(|(index, url)| self.process_candidate(url, index, deadline)),
            )
            .buffer_unordered(self.config.worker_limit);
            tokio::pin!(stream);

            while outcomes.len() < target {
                match timeout_at(deadline, stream.next()).await {
                    Ok(Some(Some(outcome))) => outcomes.push(outcome),
                    Ok(Some(None)) => continue,
                    Ok(None) => break,
                    Err(_) => {
                        // Deadline passed; dropping the stream abandons any
                        // in-flight fetches rather than awaiting them.
                        debug!("batch deadline reached with {} results", outcomes.len());
                        break;
                    }
                }
            }
        }

        if outcomes.is_empty() {
            debug!("no candidate produced a record; returning synthetic fallback");
            outcomes.push(ExtractionOutcome::SyntheticFallback(build_fallback(
                None,
                search_url.as_str(),
                term,
            )));
        }
        Ok(outcomes)
    }

    /// One candidate URL, bounded by the smaller of its own allowance and
    /// the batch deadline.
    async fn process_candidate(
        &self,
        url: String,
        index: usize,
        deadline: Instant,
    ) -> Option<ExtractionOutcome> {
        if let Some(record) = self.cache.get(&url) {
            return Some(ExtractionOutcome::from_record(record));
        }

        let allowance = Instant::now() + self.config.candidate_allowance(index);
        let candidate_deadline = allowance.min(deadline);

        match timeout_at(candidate_deadline, self.extract_candidate(&url, deadline)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!("candidate {url} exceeded its time allowance, skipping");
                None
            }
        }
    }

    async fn extract_candidate(&self, url: &str, deadline: Instant) -> Option<ExtractionOutcome> {
        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(err) if err.is_permanent() => {
                debug!("skipping {url}: {err}");
                return None;
            }
            Err(err) => {
                warn!("skipping {url} after retries: {err}");
                return None;
            }
        };

        let (draft, method) = self.tiered_extract(&html, url, deadline).await;
        let record = match draft {
            Some(draft) => {
                let record = self.finalize(draft, url, method);
                if record.is_validated() {
                    record
                } else {
                    build_fallback(Some(&html), url, "")
                }
            }
            None => build_fallback(Some(&html), url, ""),
        };

        // Only real extractions are worth remembering; a placeholder would
        // pin a failure for the whole TTL.
        if record.extraction_method != ExtractionMethod::BasicFallback {
            self.cache.set(url, record.clone());
        }
        Some(ExtractionOutcome::from_record(record))
    }

    /// The tier ladder: structured data, then selector heuristics, then the
    /// assistant if there is enough budget slack left for it.
    async fn tiered_extract(
        &self,
        html: &str,
        url: &str,
        deadline: Instant,
    ) -> (Option<RecipeDraft>, ExtractionMethod) {
        if let Some(draft) = StructuredDataExtractor.extract(html, url) {
            return (Some(draft), ExtractionMethod::StructuredData);
        }
        if let Some(draft) = HeuristicHtmlExtractor.extract(html, url) {
            return (Some(draft), ExtractionMethod::EnhancedParsing);
        }

        if let Some(assisted) = &self.assisted {
            let slack = deadline.saturating_duration_since(Instant::now());
            if slack >= self.config.assistant_min_slack() {
                if let Some(draft) = assisted.extract(html, url).await {
                    return (Some(draft), ExtractionMethod::AiParsing);
                }
            } else {
                debug!("skipping assistant for {url}: only {slack:?} budget left");
            }
        }

        (None, ExtractionMethod::BasicFallback)
    }

    /// Turn a draft into the canonical record: normalize ingredient lines,
    /// merge substitution notes, fill defaults, stamp the source.
    fn finalize(&self, draft: RecipeDraft, url: &str, method: ExtractionMethod) -> RecipeRecord {
        let (ingredients, unit_notes) = normalize_lines(&draft.ingredient_lines);
        let mut notes = draft.notes;
        notes.extend(unit_notes);

        RecipeRecord {
            name: draft.name.trim().to_string(),
            description: draft.description.filter(|d| !d.trim().is_empty()),
            ingredients,
            instructions: draft
                .instructions
                .into_iter()
                .map(|step| step.trim().to_string())
                .filter(|step| !step.is_empty())
                .collect(),
            serving_size: draft
                .serving_size
                .map(clamp_servings)
                .unwrap_or(DEFAULT_SERVINGS),
            prep_time_minutes: draft.prep_time_minutes.unwrap_or(0),
            cook_time_minutes: draft.cook_time_minutes.unwrap_or(0),
            genre: draft.genre.unwrap_or_default(),
            notes,
            dietary_restrictions: draft.dietary_restrictions,
            source_url: url.to_string(),
            source_site: site_of(url),
            extraction_method: method,
        }
    }
}

/// Candidate links from a search-results page: selector match, pattern
/// filter, absolutized against the page URL, same-host only, deduped,
/// capped.
fn collect_candidates(
    html: &str,
    base: &Url,
    strategy: &SiteStrategy,
    cap: usize,
) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse(&strategy.candidate_selector) {
        Ok(selector) => selector,
        Err(err) => {
            warn!(
                "strategy {} has a bad candidate selector: {err:?}",
                strategy.name
            );
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for link in document.select(&selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !strategy.link_matches(href) {
            continue;
        }
        let Ok(absolute) = base.join(href) else {
            continue;
        };
        if !matches!(absolute.scheme(), "http" | "https") {
            continue;
        }
        if absolute.host_str() != base.host_str() {
            continue;
        }
        if absolute.as_str() == base.as_str() {
            continue;
        }
        let mut normalized = absolute;
        normalized.set_fragment(None);
        let url = normalized.to_string();
        if seen.insert(url.clone()) {
            candidates.push(url);
            if candidates.len() >= cap {
                break;
            }
        }
    }
    candidates
}
