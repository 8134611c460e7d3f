use serde::{Deserialize, Serialize};

/// Closed set of measurement units a normalized ingredient may carry.
///
/// Anything outside this set goes through the alias table in
/// `crate::ingredient` and collapses to `Pieces` when no alias matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Cups,
    Tablespoons,
    Teaspoons,
    Ounces,
    Pounds,
    Grams,
    Kilograms,
    Liters,
    Milliliters,
    Pieces,
    Whole,
    Sticks,
    Pinch,
    Dash,
}

impl Unit {
    /// Human-readable label used in notes and text output.
    pub fn label(&self) -> &'static str {
        match self {
            Unit::Cups => "cups",
            Unit::Tablespoons => "tablespoons",
            Unit::Teaspoons => "teaspoons",
            Unit::Ounces => "ounces",
            Unit::Pounds => "pounds",
            Unit::Grams => "grams",
            Unit::Kilograms => "kilograms",
            Unit::Liters => "liters",
            Unit::Milliliters => "milliliters",
            Unit::Pieces => "pieces",
            Unit::Whole => "whole",
            Unit::Sticks => "sticks",
            Unit::Pinch => "pinch",
            Unit::Dash => "dash",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Meal category of a recipe. Defaults to `Dinner` when the page gives no
/// usable category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Breakfast,
    Lunch,
    #[default]
    Dinner,
    Snack,
    Dessert,
    Appetizer,
}

impl Genre {
    /// Best-effort mapping from free category/keyword text.
    pub fn from_text(text: &str) -> Option<Genre> {
        let lower = text.to_lowercase();
        if lower.contains("breakfast") || lower.contains("brunch") {
            Some(Genre::Breakfast)
        } else if lower.contains("lunch") {
            Some(Genre::Lunch)
        } else if lower.contains("dessert")
            || lower.contains("cake")
            || lower.contains("cookie")
            || lower.contains("sweet")
        {
            Some(Genre::Dessert)
        } else if lower.contains("appetizer") || lower.contains("starter") || lower.contains("side")
        {
            Some(Genre::Appetizer)
        } else if lower.contains("snack") {
            Some(Genre::Snack)
        } else if lower.contains("dinner") || lower.contains("main") || lower.contains("entree") {
            Some(Genre::Dinner)
        } else {
            None
        }
    }
}

/// Which tier of the pipeline produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    StructuredData,
    EnhancedParsing,
    AiParsing,
    BasicFallback,
}

/// A single normalized ingredient line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
}

pub const DEFAULT_SERVINGS: u32 = 4;
pub const MIN_SERVINGS: u32 = 1;
pub const MAX_SERVINGS: u32 = 50;

/// Clamp a serving yield into the accepted range.
pub fn clamp_servings(value: u32) -> u32 {
    value.clamp(MIN_SERVINGS, MAX_SERVINGS)
}

/// The canonical output of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub serving_size: u32,
    pub prep_time_minutes: u32,
    pub cook_time_minutes: u32,
    pub genre: Genre,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    pub source_url: String,
    pub source_site: String,
    pub extraction_method: ExtractionMethod,
}

impl RecipeRecord {
    /// Minimum bar for a record to count as a real extraction: a name longer
    /// than two characters, at least one ingredient and one instruction.
    /// Callers treat anything below this as a failed tier, not a recipe.
    pub fn is_validated(&self) -> bool {
        self.name.trim().len() > 2 && !self.ingredients.is_empty() && !self.instructions.is_empty()
    }
}

/// Intermediate shape produced by every extractor tier.
///
/// Ingredients are still raw text lines here; the orchestrator runs them
/// through the normalizer once, so structured-data, heuristic and assisted
/// output all take the same path into `RecipeRecord`.
#[derive(Debug, Clone, Default)]
pub struct RecipeDraft {
    pub name: String,
    pub description: Option<String>,
    pub ingredient_lines: Vec<String>,
    pub instructions: Vec<String>,
    pub serving_size: Option<u32>,
    pub prep_time_minutes: Option<u32>,
    pub cook_time_minutes: Option<u32>,
    pub genre: Option<Genre>,
    pub notes: Vec<String>,
    pub dietary_restrictions: Vec<String>,
}

impl RecipeDraft {
    /// The draft-level counterpart of `RecipeRecord::is_validated`.
    pub fn is_viable(&self) -> bool {
        self.name.trim().len() > 2
            && !self.ingredient_lines.is_empty()
            && !self.instructions.is_empty()
    }
}

/// Result variant for a finished extraction.
///
/// Downstream code distinguishes real recipes from placeholders through this
/// type rather than by inspecting `extraction_method` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// A record that cleared the validated bar through a real extractor tier.
    Validated(RecipeRecord),
    /// The always-available placeholder pointing the consumer at the source.
    SyntheticFallback(RecipeRecord),
}

impl ExtractionOutcome {
    /// Wrap a record in the variant its extraction method implies.
    pub fn from_record(record: RecipeRecord) -> Self {
        match record.extraction_method {
            ExtractionMethod::BasicFallback => ExtractionOutcome::SyntheticFallback(record),
            _ => ExtractionOutcome::Validated(record),
        }
    }

    pub fn record(&self) -> &RecipeRecord {
        match self {
            ExtractionOutcome::Validated(r) => r,
            ExtractionOutcome::SyntheticFallback(r) => r,
        }
    }

    pub fn into_record(self) -> RecipeRecord {
        match self {
            ExtractionOutcome::Validated(r) => r,
            ExtractionOutcome::SyntheticFallback(r) => r,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, ExtractionOutcome::SyntheticFallback(_))
    }
}

/// Derive a display-friendly site name from a URL host ("www.example.com"
/// becomes "example.com").
pub fn site_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}
