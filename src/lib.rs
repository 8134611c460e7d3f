//! recipe-harvest: a multi-tier recipe extraction pipeline.
//!
//! Given a search term, the pipeline finds candidate recipe pages, tries
//! extraction tiers in priority order (embedded structured data, selector
//! heuristics, a language assistant) and always returns at least one
//! recipe-shaped record within a bounded amount of time. Placeholder
//! records are distinguished from real extractions by the
//! [`ExtractionOutcome`] variant.

pub mod assist;
pub mod cache;
pub mod config;
pub mod error;
pub mod extractors;
pub mod fallback;
pub mod fetch;
pub mod ingredient;
pub mod model;
pub mod pipeline;
pub mod sites;

pub use crate::config::PipelineConfig;
pub use crate::error::{FetchError, HarvestError};
pub use crate::model::{
    ExtractionMethod, ExtractionOutcome, Genre, Ingredient, RecipeRecord, Unit,
};
pub use crate::pipeline::{RecipePipeline, RecipePipelineBuilder};
pub use crate::sites::SiteStrategy;

/// Search with a default pipeline built from `harvest.toml` / environment
/// configuration. Convenience wrapper for callers that do not need to
/// inject anything.
pub async fn search_recipes(
    term: &str,
    max_results: usize,
) -> Result<Vec<ExtractionOutcome>, HarvestError> {
    let config = PipelineConfig::load()?;
    let pipeline = RecipePipeline::builder().config(config).build()?;
    pipeline.search_recipes(term, max_results).await
}
