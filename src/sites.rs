//! Per-site search strategy records.
//!
//! A strategy is data, not code: a search-URL template and a selector for
//! candidate recipe links on the results page. New sites are new table
//! rows, not new types.

use serde::Deserialize;
use url::Url;

/// How to search one recipe site and recognize recipe links in its results.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteStrategy {
    /// Display name, also used as the default source_site
    pub name: String,
    /// Search URL template with `{query}` standing in for the encoded term
    pub search_url_template: String,
    /// CSS selector matching candidate recipe links on the results page
    pub candidate_selector: String,
    /// Substring a candidate href must contain to count as a recipe link
    /// (empty string accepts everything the selector matched)
    #[serde(default)]
    pub link_pattern: String,
}

impl SiteStrategy {
    /// Built-in strategy table. First entry is the default.
    pub fn builtin() -> Vec<SiteStrategy> {
        vec![
            SiteStrategy {
                name: "AllRecipes".to_string(),
                search_url_template: "https://www.allrecipes.com/search?q={query}".to_string(),
                candidate_selector: "a[href*='/recipe/']".to_string(),
                link_pattern: "/recipe/".to_string(),
            },
            SiteStrategy {
                name: "Food Network".to_string(),
                search_url_template:
                    "https://www.foodnetwork.com/search/{query}-".to_string(),
                candidate_selector: "a[href*='/recipes/']".to_string(),
                link_pattern: "/recipes/".to_string(),
            },
            SiteStrategy {
                name: "Simply Recipes".to_string(),
                search_url_template: "https://www.simplyrecipes.com/search?q={query}".to_string(),
                candidate_selector: "a.card".to_string(),
                link_pattern: "".to_string(),
            },
        ]
    }

    pub fn default_strategy() -> SiteStrategy {
        Self::builtin().remove(0)
    }

    /// Render the search URL for a term. The term is percent-encoded into
    /// the `{query}` slot.
    pub fn search_url(&self, term: &str) -> Result<Url, url::ParseError> {
        let encoded: String =
            url::form_urlencoded::byte_serialize(term.trim().as_bytes()).collect();
        Url::parse(&self.search_url_template.replace("{query}", &encoded))
    }

    /// Whether a candidate href fits this strategy's link pattern.
    pub fn link_matches(&self, href: &str) -> bool {
        self.link_pattern.is_empty() || href.contains(&self.link_pattern)
    }
}
