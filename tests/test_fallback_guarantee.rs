use recipe_harvest::model::ExtractionMethod;
use recipe_harvest::{PipelineConfig, RecipePipeline, SiteStrategy};

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

#[tokio::test]
async fn unreachable_search_page_still_returns_a_record() {
    let mut server = mockito::Server::new_async().await;
    let _search = server
        .mock("GET", "/search?q=lasagna")
        .with_status(500)
        .create_async()
        .await;

    let pipeline = RecipePipeline::builder()
        .config(quick_config())
        .strategy(test_strategy(&server.url()))
        .build()
        .unwrap();

    let outcomes = pipeline.search_recipes("lasagna", 3).await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_synthetic());

    let record = outcomes[0].record();
    assert_eq!(record.extraction_method, ExtractionMethod::BasicFallback);
    assert!(record.is_validated());
    assert_eq!(record.name, "Lasagna Recipe");
}

#[tokio::test]
async fn all_candidates_missing_still_returns_a_record() {
    let mut server = mockito::Server::new_async().await;
    let _search = server
        .mock("GET", "/search?q=pie")
        .with_status(200)
        .with_body(
            r#"<html><body>
                <a class="result" href="/recipe/one">one</a>
                <a class="result" href="/recipe/two">two</a>
            </body></html>"#,
        )
        .create_async()
        .await;
    for path in ["/recipe/one", "/recipe/two"] {
        let _m = server
            .mock("GET", path)
            .with_status(404)
            .create_async()
            .await;
    }

    let pipeline = RecipePipeline::builder()
        .config(quick_config())
        .strategy(test_strategy(&server.url()))
        .build()
        .unwrap();

    let outcomes = pipeline.search_recipes("pie", 3).await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_synthetic());
    assert!(outcomes[0].record().is_validated());
}

#[tokio::test]
async fn reachable_but_unreadable_page_becomes_labeled_placeholder() {
    let mut server = mockito::Server::new_async().await;
    let _search = server
        .mock("GET", "/search?q=pie")
        .with_status(200)
        .with_body(r#"<html><body><a class="result" href="/recipe/opaque">x</a></body></html>"#)
        .create_async()
        .await;
    let _recipe = server
        .mock("GET", "/recipe/opaque")
        .with_status(200)
        .with_body(
            r#"<html><head><title>Secret Family Pie | Paywalled Kitchen</title></head>
            <body><p>Subscribe to see this recipe.</p></body></html>"#,
        )
        .create_async()
        .await;

    let pipeline = RecipePipeline::builder()
        .config(quick_config())
        .strategy(test_strategy(&server.url()))
        .build()
        .unwrap();

    let outcomes = pipeline.search_recipes("pie", 1).await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_synthetic());

    let record = outcomes[0].record();
    assert_eq!(record.name, "Secret Family Pie");
    assert_eq!(record.extraction_method, ExtractionMethod::BasicFallback);
    assert!(record.instructions[0].contains("/recipe/opaque"));
    assert!(record
        .notes
        .iter()
        .any(|note| note.contains("extraction failed")));

    // Placeholders are not cached; a later attempt may do better.
    assert!(pipeline.cache().is_empty());
}
