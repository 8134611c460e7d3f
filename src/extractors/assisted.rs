//! Last-resort tier: hand a cleaned, hard-capped text excerpt to the
//! language assistant and validate whatever comes back.
//!
//! Slowest and least deterministic tier, so the orchestrator only invokes
//! it when both structured and heuristic extraction failed and the batch
//! budget still has slack. One call per candidate, never retried.

use crate::assist::{LanguageAssistant, RECIPE_SCHEMA_PROMPT};
use crate::model::{clamp_servings, Genre, RecipeDraft};
use log::{debug, warn};
use scraper::{ElementRef, Html, Node, Selector};
use serde::Deserialize;
use std::sync::Arc;

pub struct AssistedExtractor {
    assistant: Arc<dyn LanguageAssistant>,
    excerpt_max_chars: usize,
}

/// The shape the assistant is instructed to return. Everything optional:
/// explicit nulls and absent fields are both acceptable, validation happens
/// against the resulting draft.
#[derive(Debug, Deserialize)]
struct AssistantRecipe {
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    ingredients: Vec<String>,
    #[serde(default)]
    instructions: Vec<String>,
    servings: Option<u32>,
    prep_time_minutes: Option<u32>,
    cook_time_minutes: Option<u32>,
    genre: Option<String>,
    #[serde(default)]
    dietary_restrictions: Vec<String>,
}

impl AssistedExtractor {
    pub fn new(assistant: Arc<dyn LanguageAssistant>, excerpt_max_chars: usize) -> Self {
        Self {
            assistant,
            excerpt_max_chars,
        }
    }

    /// One assistant call for one page. `None` for any failure: transport,
    /// malformed JSON, wrong shape, or a result below the validated bar.
    pub async fn extract(&self, html: &str, url: &str) -> Option<RecipeDraft> {
        let excerpt = build_excerpt(html, self.excerpt_max_chars);
        if excerpt.len() < 50 {
            debug!("excerpt for {url} too thin to be worth an assistant call");
            return None;
        }

        let content = match self
            .assistant
            .complete(RECIPE_SCHEMA_PROMPT, &excerpt)
            .await
        {
            Ok(content) => content,
            Err(err) => {
                warn!("assistant call for {url} failed: {err}");
                return None;
            }
        };

        let parsed: AssistantRecipe = match serde_json::from_str(strip_code_fence(&content)) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("assistant returned unparseable JSON for {url}: {err}");
                return None;
            }
        };

        let draft = RecipeDraft {
            name: parsed.name.unwrap_or_default(),
            description: parsed.description.filter(|d| !d.trim().is_empty()),
            ingredient_lines: parsed.ingredients,
            instructions: parsed.instructions,
            serving_size: parsed.servings.map(clamp_servings),
            prep_time_minutes: parsed.prep_time_minutes,
            cook_time_minutes: parsed.cook_time_minutes,
            genre: parsed.genre.as_deref().and_then(Genre::from_text),
            notes: Vec::new(),
            dietary_restrictions: parsed.dietary_restrictions,
        };

        if draft.is_viable() {
            debug!("assistant extraction succeeded for {url}");
            Some(draft)
        } else {
            debug!("assistant result for {url} failed validation");
            None
        }
    }
}

/// Assistants love markdown fences even when told not to use them.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Page tags whose subtrees are chrome, not content.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "form", "noscript", "iframe", "svg",
];

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                if SKIPPED_TAGS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

/// Reduce a page to the text excerpt handed to the assistant: prefer a
/// recipe-flavored container, strip page chrome, collapse whitespace, cap
/// hard at `max_chars`.
pub fn build_excerpt(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let preferred = [
        "[class*='recipe']",
        "[id*='recipe']",
        "[itemtype*='Recipe']",
        "article",
        "main",
        "body",
    ];

    let mut raw = String::new();
    for selector_text in preferred {
        let selector = match Selector::parse(selector_text) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if let Some(container) = document.select(&selector).next() {
            collect_text(container, &mut raw);
            // A container that matched but holds next to nothing is a false
            // positive; keep widening.
            if raw.split_whitespace().count() > 30 {
                break;
            }
            raw.clear();
        }
    }
    if raw.is_empty() {
        collect_text(document.root_element(), &mut raw);
    }

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed
        .char_indices()
        .nth(max_chars)
        .map(|(byte_index, _)| byte_index)
    {
        Some(cut) => collapsed[..cut].to_string(),
        None => collapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assist::{AssistantError, LanguageAssistant};
    use async_trait::async_trait;

    struct CannedAssistant {
        response: String,
    }

    #[async_trait]
    impl LanguageAssistant for CannedAssistant {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String, AssistantError> {
            Ok(self.response.clone())
        }
    }

    struct FailingAssistant;

    #[async_trait]
    impl LanguageAssistant for FailingAssistant {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String, AssistantError> {
            Err(AssistantError::MalformedResponse("boom".to_string()))
        }
    }

    fn long_page() -> String {
        format!(
            "<html><body><div class='content'>{}</div></body></html>",
            "A proper recipe paragraph with flour sugar butter and eggs. ".repeat(10)
        )
    }

    #[tokio::test]
    async fn parses_well_formed_assistant_output() {
        let response = r#"{
            "name": "Rescue Risotto",
            "description": "Assistant-extracted.",
            "ingredients": ["1 cup arborio rice", "4 cups stock"],
            "instructions": ["Toast the rice.", "Add stock slowly."],
            "servings": 2,
            "prep_time_minutes": 10,
            "cook_time_minutes": 30,
            "genre": "dinner",
            "dietary_restrictions": []
        }"#;
        let extractor = AssistedExtractor::new(
            Arc::new(CannedAssistant {
                response: response.to_string(),
            }),
            2_500,
        );
        let draft = extractor
            .extract(&long_page(), "https://example.com")
            .await
            .expect("draft");
        assert_eq!(draft.name, "Rescue Risotto");
        assert_eq!(draft.ingredient_lines.len(), 2);
        assert_eq!(draft.serving_size, Some(2));
        assert_eq!(draft.genre, Some(Genre::Dinner));
    }

    #[tokio::test]
    async fn fenced_output_is_unwrapped() {
        let response = "```json\n{\"name\": \"Fenced Focaccia\", \"ingredients\": [\"1 dough\"], \"instructions\": [\"Bake.\"]}\n```";
        let extractor = AssistedExtractor::new(
            Arc::new(CannedAssistant {
                response: response.to_string(),
            }),
            2_500,
        );
        let draft = extractor
            .extract(&long_page(), "https://example.com")
            .await
            .expect("draft");
        assert_eq!(draft.name, "Fenced Focaccia");
    }

    #[tokio::test]
    async fn null_fields_fail_validation_quietly() {
        let response = r#"{"name": null, "ingredients": [], "instructions": []}"#;
        let extractor = AssistedExtractor::new(
            Arc::new(CannedAssistant {
                response: response.to_string(),
            }),
            2_500,
        );
        assert!(extractor
            .extract(&long_page(), "https://example.com")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn assistant_failure_is_extraction_failure() {
        let extractor = AssistedExtractor::new(Arc::new(FailingAssistant), 2_500);
        assert!(extractor
            .extract(&long_page(), "https://example.com")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn thin_page_skips_the_call() {
        let extractor = AssistedExtractor::new(Arc::new(FailingAssistant), 2_500);
        assert!(extractor
            .extract("<html><body>hi</body></html>", "https://example.com")
            .await
            .is_none());
    }

    #[test]
    fn excerpt_strips_chrome_and_caps_length() {
        let html = format!(
            r#"<html><body>
                <nav>Home Recipes About</nav>
                <script>var tracking = true;</script>
                <div class="recipe-body">{}</div>
                <footer>All rights reserved</footer>
            </body></html>"#,
            "flour and water make bread when you wait long enough ".repeat(100)
        );
        let excerpt = build_excerpt(&html, 2_500);
        assert!(excerpt.len() <= 2_500);
        assert!(excerpt.contains("flour and water"));
        assert!(!excerpt.contains("tracking"));
        assert!(!excerpt.contains("All rights reserved"));
    }

    #[test]
    fn excerpt_falls_back_to_whole_page() {
        let html = "<html><body><p>Just a paragraph about dinner plans that goes on long enough to matter for the excerpt threshold in the assisted tier of the pipeline.</p></body></html>";
        let excerpt = build_excerpt(html, 2_500);
        assert!(excerpt.contains("dinner plans"));
    }
}
