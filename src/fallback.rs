//! The tier that cannot fail: a clearly labeled placeholder record for a
//! page (or search) nothing else could extract. Keeps the batch contract of
//! "always at least one recipe-shaped object"; the `basic_fallback` method
//! tag and the note carry the failure signal.

use crate::extractors::clean_text;
use crate::model::{
    site_of, ExtractionMethod, Genre, Ingredient, RecipeRecord, Unit, DEFAULT_SERVINGS,
};
use scraper::{Html, Selector};

/// Strip site-name suffixes from a page title: "Best Brownies | Baker's
/// Blog" becomes "Best Brownies". The longest leading segment wins so a
/// hyphenated dish name is not cut at its own hyphen.
fn strip_site_suffix(title: &str) -> String {
    let cleaned = clean_text(title);
    for separator in [" | ", " – ", " — ", " - ", " :: "] {
        if let Some((head, _)) = cleaned.split_once(separator) {
            let head = head.trim();
            if head.len() > 3 {
                return head.to_string();
            }
        }
    }
    cleaned
}

fn title_case(term: &str) -> String {
    term.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derive a human-readable recipe name from the page title, or synthesize
/// one from the search term when there is no usable title.
fn derive_name(html: Option<&str>, search_term: &str) -> String {
    if let Some(html) = html {
        let document = Html::parse_document(html);
        let selector = Selector::parse("title").unwrap();
        if let Some(title) = document
            .select(&selector)
            .next()
            .map(|el| strip_site_suffix(&el.text().collect::<String>()))
            .filter(|t| t.len() > 3)
        {
            return title;
        }
    }
    let term = title_case(search_term.trim());
    if term.len() > 2 {
        format!("{term} Recipe")
    } else {
        "Recipe".to_string()
    }
}

/// Build the placeholder record. Never fails and always clears the
/// validated bar, so the orchestrator can rely on it unconditionally.
pub fn build_fallback(html: Option<&str>, url: &str, search_term: &str) -> RecipeRecord {
    let name = derive_name(html, search_term);

    RecipeRecord {
        name,
        description: Some(format!(
            "Automatic extraction could not read this recipe; the original is at {url}"
        )),
        ingredients: vec![Ingredient {
            name: format!("See the original recipe at {url}"),
            quantity: 1.0,
            unit: Unit::Pieces,
        }],
        instructions: vec![format!(
            "Visit {url} in a browser for the full ingredient list and instructions."
        )],
        serving_size: DEFAULT_SERVINGS,
        prep_time_minutes: 0,
        cook_time_minutes: 0,
        genre: Genre::default(),
        notes: vec![
            "Automatic extraction failed for this page; this is a placeholder entry.".to_string(),
        ],
        dietary_restrictions: Vec::new(),
        source_url: url.to_string(),
        source_site: site_of(url),
        extraction_method: ExtractionMethod::BasicFallback,
    }
}
