//! Structured-data extraction: JSON-LD first, inline microdata second.
//!
//! JSON-LD in the wild is unreliable in every way that matters: broken JSON,
//! missing `@type` tags, recipes buried under `@graph` or `mainEntity`,
//! instructions in half a dozen shapes. This tier repairs what it can,
//! searches with a bounded recursion, and maps whatever recipe-shaped object
//! it finds into the canonical draft.

use super::{
    clean_text, first_integer, parse_duration_minutes, split_total_time, TierExtractor,
};
use crate::model::{clamp_servings, Genre, RecipeDraft};
use log::{debug, warn};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

/// Recursion ceiling for the search through untrusted JSON. Real recipe
/// markup nests two or three levels deep; anything past five is noise.
const MAX_SEARCH_DEPTH: usize = 5;

pub struct StructuredDataExtractor;

impl TierExtractor for StructuredDataExtractor {
    fn name(&self) -> &'static str {
        "structured_data"
    }

    fn extract(&self, html: &str, url: &str) -> Option<RecipeDraft> {
        let document = Html::parse_document(html);

        for block in candidate_json_blocks(&document) {
            let repaired = repair_json(&block);
            let parsed: Value = match serde_json::from_str(&repaired) {
                Ok(value) => value,
                Err(err) => {
                    debug!("skipping unparseable metadata block on {url}: {err}");
                    continue;
                }
            };

            let recipe_node = find_typed_recipe(&parsed, 0)
                .or_else(|| find_shaped_recipe(&parsed, 0));

            if let Some(node) = recipe_node {
                let draft = map_recipe(node);
                if draft.is_viable() {
                    debug!("JSON-LD recipe found on {url}");
                    return Some(draft);
                }
                debug!("JSON-LD candidate on {url} failed validation");
            }
        }

        // No usable script block; scan for inline microdata annotations.
        let draft = extract_microdata(&document)?;
        if draft.is_viable() {
            debug!("microdata recipe found on {url}");
            Some(draft)
        } else {
            None
        }
    }
}

/// All script blocks worth attempting: explicitly typed JSON-LD, plus any
/// script whose content looks recipe-shaped. The latter is a defensive net
/// for pages that forget the type attribute.
fn candidate_json_blocks(document: &Html) -> Vec<String> {
    let mut blocks = Vec::new();

    let ld_selector = Selector::parse("script[type='application/ld+json']").unwrap();
    for script in document.select(&ld_selector) {
        blocks.push(script.inner_html());
    }

    let any_script = Selector::parse("script:not([src])").unwrap();
    for script in document.select(&any_script) {
        let content = script.inner_html();
        if script.value().attr("type") == Some("application/ld+json") {
            continue;
        }
        if content.contains("recipeIngredient") || content.contains("recipeInstructions") {
            blocks.push(content);
        }
    }

    blocks
}

/// Repair the formatting defects that keep otherwise-good JSON-LD from
/// parsing: HTML comment wrappers, CDATA, junk before the first brace,
/// trailing commas, raw control characters.
fn repair_json(raw: &str) -> String {
    static TRAILING_COMMA: OnceLock<Regex> = OnceLock::new();
    let trailing_comma = TRAILING_COMMA.get_or_init(|| Regex::new(r",\s*([}\]])").unwrap());

    let mut cleaned: String = raw
        .replace("<!--", "")
        .replace("-->", "")
        .replace("//<![CDATA[", "")
        .replace("//]]>", "")
        .chars()
        .map(|c| if c.is_control() && c != '\n' && c != '\t' { ' ' } else { c })
        .collect();

    cleaned = cleaned.trim().to_string();
    if !cleaned.starts_with('{') && !cleaned.starts_with('[') {
        if let Some(start) = cleaned.find(['{', '[']) {
            cleaned = cleaned[start..].to_string();
        }
    }

    trailing_comma.replace_all(&cleaned, "$1").into_owned()
}

fn type_is_recipe(type_value: &Value) -> bool {
    match type_value {
        Value::String(s) => {
            let tail = s.rsplit('/').next().unwrap_or(s);
            tail.eq_ignore_ascii_case("recipe")
        }
        Value::Array(items) => items.iter().any(type_is_recipe),
        _ => false,
    }
}

/// Keys under which structured-data vocabularies routinely nest the real
/// payload. Checked before the brute-force descent.
const NESTING_KEYS: &[&str] = &[
    "@graph",
    "mainEntity",
    "mainEntityOfPage",
    "itemListElement",
    "hasPart",
    "about",
    "item",
];

/// Find an object explicitly typed as a Recipe, depth-capped.
fn find_typed_recipe(value: &Value, depth: usize) -> Option<&Value> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            if let Some(type_value) = map.get("@type").or_else(|| map.get("type")) {
                if type_is_recipe(type_value) {
                    return Some(value);
                }
            }
            for key in NESTING_KEYS {
                if let Some(nested) = map.get(*key) {
                    if let Some(found) = find_typed_recipe(nested, depth + 1) {
                        return Some(found);
                    }
                }
            }
            map.values()
                .find_map(|nested| find_typed_recipe(nested, depth + 1))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| find_typed_recipe(item, depth + 1)),
        _ => None,
    }
}

/// Fallback for markup with no type tags at all: accept any object that
/// merely looks like a recipe (ingredient-shaped and instruction-shaped
/// fields side by side).
fn find_shaped_recipe(value: &Value, depth: usize) -> Option<&Value> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            let has_ingredients =
                map.contains_key("recipeIngredient") || map.contains_key("ingredients");
            let has_instructions =
                map.contains_key("recipeInstructions") || map.contains_key("instructions");
            if has_ingredients && has_instructions {
                return Some(value);
            }
            map.values()
                .find_map(|nested| find_shaped_recipe(nested, depth + 1))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| find_shaped_recipe(item, depth + 1)),
        _ => None,
    }
}

/// Pull a display string out of the heterogeneous value shapes JSON-LD
/// uses: plain string, `{text:}`, `{"@value":}`, `{name:}`, or a list whose
/// first non-empty element is any of those.
fn text_of(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::String(s) => {
            let cleaned = clean_text(s);
            (!cleaned.is_empty()).then_some(cleaned)
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => ["text", "@value", "name"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|nested| text_of(nested, depth + 1)),
        Value::Array(items) => items.iter().find_map(|item| text_of(item, depth + 1)),
        _ => None,
    }
}

/// First present key from an ordered fallback list, rendered as text.
fn first_text(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(|value| text_of(value, 0))
}

/// Ingredient values are usually a list of strings, but single strings and
/// object lists occur. Strings with embedded newlines are split.
fn string_list_of(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split('\n')
            .map(clean_text)
            .filter(|line| !line.is_empty())
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| text_of(item, 0))
            .filter(|line| !line.is_empty())
            .collect(),
        other => text_of(other, 0).into_iter().collect(),
    }
}

/// Flatten the instruction shapes schema.org allows: a single string, a
/// string list, `HowToStep` objects, and `HowToSection` groups with
/// `itemListElement` children.
fn instruction_list_of(value: &Value, depth: usize) -> Vec<String> {
    if depth > MAX_SEARCH_DEPTH {
        return Vec::new();
    }
    match value {
        Value::String(s) => s
            .split('\n')
            .map(clean_text)
            .filter(|step| !step.is_empty())
            .collect(),
        Value::Array(items) => items
            .iter()
            .flat_map(|item| instruction_list_of(item, depth + 1))
            .collect(),
        Value::Object(map) => {
            if let Some(children) = map.get("itemListElement") {
                let mut steps = instruction_list_of(children, depth + 1);
                if steps.is_empty() {
                    if let Some(text) = first_text(map, &["text", "description", "name"]) {
                        steps.push(text);
                    }
                }
                return steps;
            }
            first_text(map, &["text", "description", "name"])
                .into_iter()
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Reduce a `suitableForDiet` entry to readable words:
/// `https://schema.org/GlutenFreeDiet` -> `gluten free`.
fn diet_label(raw: &str) -> String {
    let tail = raw.rsplit('/').next().unwrap_or(raw);
    let tail = tail.strip_suffix("Diet").unwrap_or(tail);
    let mut label = String::new();
    for c in tail.chars() {
        if c.is_uppercase() && !label.is_empty() {
            label.push(' ');
        }
        label.extend(c.to_lowercase());
    }
    label
}

/// Map a raw recipe-shaped JSON object into the canonical draft.
fn map_recipe(node: &Value) -> RecipeDraft {
    let empty = serde_json::Map::new();
    let map = node.as_object().unwrap_or(&empty);

    let name = first_text(map, &["name", "headline", "title", "recipeName"]).unwrap_or_default();
    let description = first_text(map, &["description", "summary", "about"]);

    let ingredient_lines = ["recipeIngredient", "recipeIngredients", "ingredients"]
        .iter()
        .filter_map(|key| map.get(*key))
        .map(string_list_of)
        .find(|lines| !lines.is_empty())
        .unwrap_or_default();

    let instructions = ["recipeInstructions", "instructions", "steps"]
        .iter()
        .filter_map(|key| map.get(*key))
        .map(|value| instruction_list_of(value, 0))
        .find(|steps| !steps.is_empty())
        .unwrap_or_default();

    let mut prep_time_minutes = map
        .get("prepTime")
        .and_then(|v| text_of(v, 0))
        .and_then(|t| parse_duration_minutes(&t));
    let mut cook_time_minutes = map
        .get("cookTime")
        .and_then(|v| text_of(v, 0))
        .and_then(|t| parse_duration_minutes(&t));

    if prep_time_minutes.is_none() && cook_time_minutes.is_none() {
        if let Some(total) = map
            .get("totalTime")
            .and_then(|v| text_of(v, 0))
            .and_then(|t| parse_duration_minutes(&t))
        {
            let (prep, cook) = split_total_time(total);
            prep_time_minutes = Some(prep);
            cook_time_minutes = Some(cook);
        }
    }

    let serving_size = ["recipeYield", "yield", "servings"]
        .iter()
        .filter_map(|key| map.get(*key))
        .filter_map(|value| text_of(value, 0))
        .find_map(|text| first_integer(&text))
        .map(clamp_servings);

    let genre = first_text(map, &["recipeCategory", "keywords", "recipeCuisine"])
        .and_then(|text| Genre::from_text(&text));

    let dietary_restrictions = map
        .get("suitableForDiet")
        .map(string_list_of)
        .unwrap_or_default()
        .iter()
        .map(|raw| diet_label(raw))
        .filter(|label| !label.is_empty())
        .collect();

    RecipeDraft {
        name,
        description,
        ingredient_lines,
        instructions,
        serving_size,
        prep_time_minutes,
        cook_time_minutes,
        genre,
        notes: Vec::new(),
        dietary_restrictions,
    }
}

/// Inline microdata fallback, scoped to a Recipe itemscope to avoid picking
/// up unrelated page furniture.
fn extract_microdata(document: &Html) -> Option<RecipeDraft> {
    let scope_selector = Selector::parse("[itemscope]").unwrap();
    let container = document.select(&scope_selector).find(|element| {
        element
            .value()
            .attr("itemtype")
            .map(|t| t.contains("Recipe"))
            .unwrap_or(false)
    })?;

    let name = itemprop_text(container, "name")?;
    let ingredient_lines = {
        let modern = itemprop_texts(container, "recipeIngredient");
        if modern.is_empty() {
            // data-vocabulary.org era markup
            itemprop_texts(container, "ingredients")
        } else {
            modern
        }
    };
    let instructions = itemprop_texts(container, "recipeInstructions");

    let mut prep_time_minutes = itemprop_text(container, "prepTime")
        .and_then(|t| parse_duration_minutes(&t));
    let mut cook_time_minutes = itemprop_text(container, "cookTime")
        .and_then(|t| parse_duration_minutes(&t));
    if prep_time_minutes.is_none() && cook_time_minutes.is_none() {
        if let Some(total) =
            itemprop_text(container, "totalTime").and_then(|t| parse_duration_minutes(&t))
        {
            let (prep, cook) = split_total_time(total);
            prep_time_minutes = Some(prep);
            cook_time_minutes = Some(cook);
        }
    }

    Some(RecipeDraft {
        name,
        description: itemprop_text(container, "description"),
        ingredient_lines,
        instructions,
        serving_size: itemprop_text(container, "recipeYield")
            .and_then(|t| first_integer(&t))
            .map(clamp_servings),
        prep_time_minutes,
        cook_time_minutes,
        genre: itemprop_text(container, "recipeCategory")
            .and_then(|text| Genre::from_text(&text)),
        notes: Vec::new(),
        dietary_restrictions: Vec::new(),
    })
}

/// A microdata property value: `content` attribute when present (meta tags,
/// ISO durations), element text otherwise.
fn itemprop_value(element: ElementRef) -> String {
    if let Some(content) = element.value().attr("content") {
        return clean_text(content);
    }
    if let Some(datetime) = element.value().attr("datetime") {
        return clean_text(datetime);
    }
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn itemprop_text(root: ElementRef, prop: &str) -> Option<String> {
    let selector = match Selector::parse(&format!("[itemprop='{prop}']")) {
        Ok(selector) => selector,
        Err(err) => {
            warn!("bad itemprop selector for {prop}: {err:?}");
            return None;
        }
    };
    root.select(&selector)
        .map(itemprop_value)
        .find(|text| !text.is_empty())
}

fn itemprop_texts(root: ElementRef, prop: &str) -> Vec<String> {
    let selector = match Selector::parse(&format!("[itemprop='{prop}']")) {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };
    root.select(&selector)
        .map(itemprop_value)
        .filter(|text| !text.is_empty())
        .collect()
}
