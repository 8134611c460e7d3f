//! Selector-guess fallback for pages with no machine-readable metadata.
//!
//! An ordered list of CSS selectors per field, starting with the class names
//! the big WordPress recipe plugins emit and ending with generic guesses.
//! The first selector that clears the bar (two ingredients, one
//! instruction) wins.

use super::{clean_text, first_integer, parse_duration_minutes, TierExtractor};
use crate::model::{clamp_servings, RecipeDraft};
use log::debug;
use scraper::{ElementRef, Html, Selector};

pub struct HeuristicHtmlExtractor;

/// Ordered title guesses. Plugin-specific classes first, generic last.
const TITLE_SELECTORS: &[&str] = &[
    ".wprm-recipe-name",
    ".tasty-recipes-title",
    ".mv-create-title",
    ".recipe-title",
    ".recipe-name",
    ".recipe-card-title",
    ".recipe-header h1",
    "h1.entry-title",
    "h1",
];

const INGREDIENT_SELECTORS: &[&str] = &[
    ".wprm-recipe-ingredient",
    ".wprm-recipe-ingredients-container li",
    ".tasty-recipes-ingredients li",
    ".mv-create-ingredients li",
    ".recipe-ingredients li",
    ".recipe-ingredient-list li",
    ".recipe-card-ingredients li",
    ".ingredients-section li",
    ".ingredient-list li",
    "ul.ingredients li",
    "[class*='ingredient'] li",
    "li[class*='ingredient']",
];

const INSTRUCTION_SELECTORS: &[&str] = &[
    ".wprm-recipe-instruction",
    ".wprm-recipe-instructions-container li",
    ".tasty-recipes-instructions li",
    ".mv-create-instructions li",
    ".recipe-instructions li",
    ".recipe-instruction-list li",
    ".recipe-card-instructions li",
    ".directions li",
    ".recipe-directions li",
    "ol.instructions li",
    "[class*='instruction'] li",
    "[class*='direction'] li",
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    ".wprm-recipe-summary",
    ".tasty-recipes-description",
    ".mv-create-description",
    ".recipe-summary",
    ".recipe-description",
];

const PREP_TIME_SELECTORS: &[&str] = &[
    ".wprm-recipe-prep-time",
    ".tasty-recipes-prep-time",
    ".recipe-prep-time",
    ".prep-time",
];

const COOK_TIME_SELECTORS: &[&str] = &[
    ".wprm-recipe-cook-time",
    ".tasty-recipes-cook-time",
    ".recipe-cook-time",
    ".cook-time",
];

const SERVING_SELECTORS: &[&str] = &[
    ".wprm-recipe-servings",
    ".tasty-recipes-yield",
    ".recipe-servings",
    ".recipe-yield",
    ".servings",
];

/// Containers whose class/id marks them as the recipe part of the page.
/// Field selectors are scoped here first to dodge sidebar and footer noise.
const CONTAINER_SELECTORS: &[&str] = &[
    ".wprm-recipe-container",
    ".tasty-recipes",
    ".mv-create-card",
    "[class*='recipe-card']",
    "[class*='recipe-container']",
    "[id*='recipe']",
    "[class*='recipe']",
    "article",
];

fn element_text(element: ElementRef) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn first_match(scope: ElementRef, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let selector = match Selector::parse(raw) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if let Some(text) = scope
            .select(&selector)
            .map(element_text)
            .find(|t| !t.is_empty())
        {
            return Some(text);
        }
    }
    None
}

/// First selector producing at least `min` non-empty items wins; order and
/// duplicates within the winning selector are preserved (ingredient lists
/// legitimately repeat).
fn first_list(scope: ElementRef, selectors: &[&str], min: usize) -> Vec<String> {
    for raw in selectors {
        let selector = match Selector::parse(raw) {
            Ok(s) => s,
            Err(_) => continue,
        };
        let items: Vec<String> = scope
            .select(&selector)
            .map(element_text)
            .filter(|t| !t.is_empty() && t.len() < 500)
            .collect();
        if items.len() >= min {
            return items;
        }
    }
    Vec::new()
}

impl TierExtractor for HeuristicHtmlExtractor {
    fn name(&self) -> &'static str {
        "enhanced_parsing"
    }

    fn extract(&self, html: &str, url: &str) -> Option<RecipeDraft> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        // Prefer a recipe-ish container scope; fall back to the whole page.
        let scope = CONTAINER_SELECTORS
            .iter()
            .filter_map(|raw| Selector::parse(raw).ok())
            .find_map(|selector| document.select(&selector).next())
            .unwrap_or(root);

        let mut ingredient_lines = first_list(scope, INGREDIENT_SELECTORS, 2);
        let mut instructions = first_list(scope, INSTRUCTION_SELECTORS, 1);
        if ingredient_lines.is_empty() || instructions.is_empty() {
            // The container guess can be wrong; one retry against the page.
            if ingredient_lines.is_empty() {
                ingredient_lines = first_list(root, INGREDIENT_SELECTORS, 2);
            }
            if instructions.is_empty() {
                instructions = first_list(root, INSTRUCTION_SELECTORS, 1);
            }
        }

        if ingredient_lines.len() < 2 || instructions.is_empty() {
            debug!("heuristic extraction found nothing usable on {url}");
            return None;
        }

        let name = first_match(scope, TITLE_SELECTORS)
            .or_else(|| first_match(root, TITLE_SELECTORS))
            .unwrap_or_default();

        let draft = RecipeDraft {
            name,
            description: first_match(scope, DESCRIPTION_SELECTORS),
            ingredient_lines,
            instructions,
            serving_size: first_match(scope, SERVING_SELECTORS)
                .and_then(|t| first_integer(&t))
                .map(clamp_servings),
            prep_time_minutes: first_match(scope, PREP_TIME_SELECTORS)
                .and_then(|t| parse_duration_minutes(&t)),
            cook_time_minutes: first_match(scope, COOK_TIME_SELECTORS)
                .and_then(|t| parse_duration_minutes(&t)),
            genre: None,
            notes: Vec::new(),
            dietary_restrictions: Vec::new(),
        };

        if draft.is_viable() {
            debug!("heuristic extraction succeeded on {url}");
            Some(draft)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WPRM_PAGE: &str = r#"
    <html><body>
        <div class="wprm-recipe-container">
            <h2 class="wprm-recipe-name">Skillet Cornbread</h2>
            <div class="wprm-recipe-summary">Crisp edges, soft middle.</div>
            <ul>
                <li class="wprm-recipe-ingredient">1 cup cornmeal</li>
                <li class="wprm-recipe-ingredient">1 cup buttermilk</li>
                <li class="wprm-recipe-ingredient">2 eggs</li>
            </ul>
            <ul>
                <li class="wprm-recipe-instruction">Heat the skillet.</li>
                <li class="wprm-recipe-instruction">Pour and bake.</li>
            </ul>
            <span class="wprm-recipe-prep-time">10 minutes</span>
            <span class="wprm-recipe-cook-time">25 minutes</span>
            <span class="wprm-recipe-servings">8</span>
        </div>
    </body></html>"#;

    #[test]
    fn extracts_wprm_markup() {
        let draft = HeuristicHtmlExtractor
            .extract(WPRM_PAGE, "https://example.com/cornbread")
            .expect("recipe");
        assert_eq!(draft.name, "Skillet Cornbread");
        assert_eq!(draft.description.as_deref(), Some("Crisp edges, soft middle."));
        assert_eq!(draft.ingredient_lines.len(), 3);
        assert_eq!(draft.instructions.len(), 2);
        assert_eq!(draft.prep_time_minutes, Some(10));
        assert_eq!(draft.cook_time_minutes, Some(25));
        assert_eq!(draft.serving_size, Some(8));
    }

    #[test]
    fn generic_classes_still_match() {
        let html = r#"
        <html><body>
            <article>
                <h1>Weeknight Chili</h1>
                <ul class="ingredients">
                    <li>1 pound ground beef</li>
                    <li>1 can tomatoes</li>
                </ul>
                <ol class="instructions">
                    <li>Brown the beef.</li>
                    <li>Simmer everything.</li>
                </ol>
            </article>
        </body></html>"#;
        let draft = HeuristicHtmlExtractor
            .extract(html, "https://example.com/chili")
            .expect("recipe");
        assert_eq!(draft.name, "Weeknight Chili");
        assert_eq!(draft.ingredient_lines.len(), 2);
    }

    #[test]
    fn one_ingredient_is_not_enough() {
        let html = r#"
        <html><body>
            <h1>Not Really A Recipe</h1>
            <ul class="ingredients"><li>1 thing</li></ul>
            <ol class="instructions"><li>Do it.</li></ol>
        </body></html>"#;
        assert!(HeuristicHtmlExtractor
            .extract(html, "https://example.com")
            .is_none());
    }

    #[test]
    fn plain_article_page_yields_nothing() {
        let html = r#"
        <html><body>
            <article><h1>Ten Thoughts About Soup</h1><p>Prose only.</p></article>
        </body></html>"#;
        assert!(HeuristicHtmlExtractor
            .extract(html, "https://example.com")
            .is_none());
    }
}
