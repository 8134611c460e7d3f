use async_trait::async_trait;
use recipe_harvest::error::FetchError;
use recipe_harvest::fetch::Fetch;
use recipe_harvest::{PipelineConfig, RecipePipeline, SiteStrategy};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

fn test_strategy() -> SiteStrategy {
    SiteStrategy {
        name: "Scripted".to_string(),
        search_url_template: "https://cook.test/search?q={query}".to_string(),
        candidate_selector: "a.result".to_string(),
        link_pattern: "/recipe/".to_string(),
    }
}

/// Fetcher with canned bodies and a per-URL artificial delay. Pages not in
/// the script 404.
struct ScriptedFetcher {
    pages: HashMap<String, String>,
    delay: Duration,
}

#[async_trait]
impl Fetch for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tokio::time::sleep(self.delay).await;
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}

const RECIPE_PAGE: &str = r#"<html><head><script type="application/ld+json">
{
    "@type": "Recipe",
    "name": "Quick Toast",
    "recipeIngredient": ["2 slices bread"],
    "recipeInstructions": ["Toast the bread."]
}
</script></head><body></body></html>"#;

fn search_page(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a class="result" href="{href}">r</a>"#))
        .collect();
    format!("<html><body>{anchors}</body></html>")
}

#[tokio::test(start_paused = true)]
async fn stalled_search_fetch_cannot_exceed_the_batch_budget() {
    let fetcher = ScriptedFetcher {
        pages: HashMap::new(),
        delay: Duration::from_secs(300),
    };

    let pipeline = RecipePipeline::builder()
        .config(PipelineConfig::default())
        .strategy(test_strategy())
        .fetcher(std::sync::Arc::new(fetcher))
        .build()
        .unwrap();

    let started = Instant::now();
    let outcomes = pipeline.search_recipes("anything", 3).await.unwrap();
    let elapsed = started.elapsed();

    // The 300s stall is abandoned at the 30s batch deadline.
    assert!(elapsed <= Duration::from_secs(31), "took {elapsed:?}");
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_synthetic());
}

#[tokio::test(start_paused = true)]
async fn slow_candidate_is_skipped_not_awaited() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://cook.test/search?q=toast".to_string(),
        search_page(&["/recipe/slow"]),
    );
    pages.insert(
        "https://cook.test/recipe/slow".to_string(),
        RECIPE_PAGE.to_string(),
    );

    // Every fetch takes 60s: the search page is allowed (inside the 5min
    // budget below), but the candidate's own 8s allowance cuts it off.
    let mut config = PipelineConfig::default();
    config.overall_budget_secs = 300;
    let pipeline = RecipePipeline::builder()
        .config(config)
        .strategy(test_strategy())
        .fetcher(std::sync::Arc::new(ScriptedFetcher {
            pages,
            delay: Duration::from_secs(60),
        }))
        .build()
        .unwrap();

    let started = Instant::now();
    let outcomes = pipeline.search_recipes("toast", 1).await.unwrap();
    let elapsed = started.elapsed();

    // One 60s search fetch plus one 8s candidate allowance, nowhere near
    // another full fetch.
    assert!(elapsed <= Duration::from_secs(70), "took {elapsed:?}");
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_synthetic());
}

#[tokio::test(start_paused = true)]
async fn fast_candidates_complete_well_inside_the_budget() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://cook.test/search?q=toast".to_string(),
        search_page(&["/recipe/fast"]),
    );
    pages.insert(
        "https://cook.test/recipe/fast".to_string(),
        RECIPE_PAGE.to_string(),
    );

    let pipeline = RecipePipeline::builder()
        .config(PipelineConfig::default())
        .strategy(test_strategy())
        .fetcher(std::sync::Arc::new(ScriptedFetcher {
            pages,
            delay: Duration::from_millis(50),
        }))
        .build()
        .unwrap();

    let started = Instant::now();
    let outcomes = pipeline.search_recipes("toast", 1).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].is_synthetic());
    assert_eq!(outcomes[0].record().name, "Quick Toast");
}
