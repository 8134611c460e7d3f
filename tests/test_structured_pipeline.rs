use recipe_harvest::model::ExtractionMethod;
use recipe_harvest::{PipelineConfig, RecipePipeline, SiteStrategy, Unit};

fn test_strategy(server_url: &str) -> SiteStrategy {
    SiteStrategy {
        name: "Test Site".to_string(),
        search_url_template: format!("{server_url}/search?q={{query}}"),
        candidate_selector: "a.result".to_string(),
        link_pattern: "/recipe/".to_string(),
    }
}

fn quick_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.fetch_timeout_secs = 5;
    config.fetch_retries = 0;
    config.retry_backoff_ms = 1;
    config
}

fn search_page(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a class="result" href="{href}">link</a>"#))
        .collect();
    format!("<html><body><ul>{anchors}</ul></body></html>")
}

fn recipe_page(json_ld: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
        <html>
        <head>
            <title>Recipe Page</title>
            <script type="application/ld+json">
                {json_ld}
            </script>
        </head>
        <body><h1>Recipe</h1></body>
        </html>"#
    )
}

const GARLIC_BUTTER_NOODLES: &str = r#"
{
    "@context": "https://schema.org",
    "@type": "Recipe",
    "name": "Garlic Butter Noodles",
    "description": "Weeknight noodles.",
    "recipeIngredient": [
        "1 pound egg noodles",
        "3 cloves garlic",
        "1/2 cup butter"
    ],
    "recipeInstructions": [
        {"@type": "HowToStep", "text": "Boil the noodles."},
        {"@type": "HowToStep", "text": "Melt butter with garlic and toss."}
    ],
    "prepTime": "PT5M",
    "cookTime": "PT10M",
    "recipeYield": "4 servings",
    "recipeCategory": "Dinner"
}
"#;

#[tokio::test]
async fn structured_data_page_yields_validated_record() {
    let mut server = mockito::Server::new_async().await;
    let _search = server
        .mock("GET", "/search?q=noodles")
        .with_status(200)
        .with_body(search_page(&["/recipe/garlic-noodles"]))
        .create_async()
        .await;
    let _recipe = server
        .mock("GET", "/recipe/garlic-noodles")
        .with_status(200)
        .with_body(recipe_page(GARLIC_BUTTER_NOODLES))
        .create_async()
        .await;

    let pipeline = RecipePipeline::builder()
        .config(quick_config())
        .strategy(test_strategy(&server.url()))
        .build()
        .unwrap();

    let outcomes = pipeline.search_recipes("noodles", 3).await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].is_synthetic());

    let record = outcomes[0].record();
    assert_eq!(record.name, "Garlic Butter Noodles");
    assert_eq!(record.extraction_method, ExtractionMethod::StructuredData);
    assert!(record.is_validated());
    assert_eq!(record.prep_time_minutes, 5);
    assert_eq!(record.cook_time_minutes, 10);
    assert_eq!(record.serving_size, 4);
    assert!(record.source_url.ends_with("/recipe/garlic-noodles"));
}

#[tokio::test]
async fn ingredients_are_normalized_with_substitution_notes() {
    let mut server = mockito::Server::new_async().await;
    let _search = server
        .mock("GET", "/search?q=noodles")
        .with_status(200)
        .with_body(search_page(&["/recipe/garlic-noodles"]))
        .create_async()
        .await;
    let _recipe = server
        .mock("GET", "/recipe/garlic-noodles")
        .with_status(200)
        .with_body(recipe_page(GARLIC_BUTTER_NOODLES))
        .create_async()
        .await;

    let pipeline = RecipePipeline::builder()
        .config(quick_config())
        .strategy(test_strategy(&server.url()))
        .build()
        .unwrap();

    let outcomes = pipeline.search_recipes("noodles", 1).await.unwrap();
    let record = outcomes[0].record();

    let noodles = &record.ingredients[0];
    assert_eq!(noodles.quantity, 1.0);
    assert_eq!(noodles.unit, Unit::Pounds);
    assert_eq!(noodles.name, "egg noodles");

    let garlic = &record.ingredients[1];
    assert_eq!(garlic.quantity, 3.0);
    assert_eq!(garlic.unit, Unit::Pieces);
    assert_eq!(garlic.name, "garlic");

    let butter = &record.ingredients[2];
    assert_eq!(butter.quantity, 0.5);
    assert_eq!(butter.unit, Unit::Cups);

    // Exactly one note for the clove substitution.
    let substitution_notes: Vec<_> = record
        .notes
        .iter()
        .filter(|note| note.contains("cloves"))
        .collect();
    assert_eq!(substitution_notes.len(), 1);
    assert!(substitution_notes[0].contains("pieces"));
}

#[tokio::test]
async fn stops_at_requested_result_count() {
    let mut server = mockito::Server::new_async().await;
    let _search = server
        .mock("GET", "/search?q=noodles")
        .with_status(200)
        .with_body(search_page(&["/recipe/a", "/recipe/b", "/recipe/c"]))
        .create_async()
        .await;
    for path in ["/recipe/a", "/recipe/b", "/recipe/c"] {
        let _m = server
            .mock("GET", path)
            .with_status(200)
            .with_body(recipe_page(GARLIC_BUTTER_NOODLES))
            .create_async()
            .await;
    }

    let mut config = quick_config();
    config.worker_limit = 1;
    let pipeline = RecipePipeline::builder()
        .config(config)
        .strategy(test_strategy(&server.url()))
        .build()
        .unwrap();

    let outcomes = pipeline.search_recipes("noodles", 2).await.unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| !o.is_synthetic()));
}
