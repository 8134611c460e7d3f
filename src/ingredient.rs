//! Free-text ingredient line normalization.
//!
//! `"1 1/2 cups flour, sifted"` becomes `{ name: "flour, sifted",
//! quantity: 1.5, unit: cups }`. Lines from structured data, heuristic
//! scraping and the assistant all pass through here so every tier produces
//! the same ingredient shape.

use crate::model::{Ingredient, Unit};
use log::debug;
use regex::Regex;
use std::sync::OnceLock;

/// Leading quantity: mixed fraction, simple fraction, decimal or integer,
/// optionally a unicode vulgar fraction; then an optional unit token; then
/// the rest of the line.
fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?x)^\s*
              (?P<qty>\d+\s+\d+/\d+ | \d+\s*[½⅓⅔¼¾⅛] | \d+/\d+ | \d+\.\d+ | \d+ | [½⅓⅔¼¾⅛])?
              \s*
              (?P<rest>.*)$",
        )
        .expect("ingredient pattern is valid")
    })
}

fn vulgar_value(c: char) -> Option<f64> {
    match c {
        '½' => Some(0.5),
        '⅓' => Some(1.0 / 3.0),
        '⅔' => Some(2.0 / 3.0),
        '¼' => Some(0.25),
        '¾' => Some(0.75),
        '⅛' => Some(0.125),
        _ => None,
    }
}

/// Parse a quantity token the grammar matched. Unresolvable input falls back
/// to 1.0 rather than failing the whole line.
fn parse_quantity(token: &str) -> f64 {
    let token = token.trim();
    if let Some(c) = token.chars().last().and_then(|c| vulgar_value(c).map(|_| c)) {
        let whole: f64 = token[..token.len() - c.len_utf8()]
            .trim()
            .parse()
            .unwrap_or(0.0);
        return whole + vulgar_value(c).unwrap_or(0.0);
    }
    if let Some((whole, frac)) = token.split_once(' ') {
        let whole: f64 = whole.trim().parse().unwrap_or(0.0);
        return whole + parse_fraction(frac.trim()).unwrap_or(0.0);
    }
    if let Some(value) = parse_fraction(token) {
        return value;
    }
    token.parse().unwrap_or(1.0)
}

fn parse_fraction(token: &str) -> Option<f64> {
    let (num, den) = token.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Canonical spellings and abbreviations for the closed unit set. Matching a
/// token here is not a substitution and produces no note.
fn canonical_unit(token: &str) -> Option<Unit> {
    match token {
        "cup" | "cups" | "c" => Some(Unit::Cups),
        "tablespoon" | "tablespoons" | "tbsp" | "tbs" | "tbsps" => Some(Unit::Tablespoons),
        "teaspoon" | "teaspoons" | "tsp" | "tsps" => Some(Unit::Teaspoons),
        "ounce" | "ounces" | "oz" => Some(Unit::Ounces),
        "pound" | "pounds" | "lb" | "lbs" => Some(Unit::Pounds),
        "gram" | "grams" | "g" | "gr" => Some(Unit::Grams),
        "kilogram" | "kilograms" | "kg" | "kgs" => Some(Unit::Kilograms),
        "liter" | "liters" | "litre" | "litres" | "l" => Some(Unit::Liters),
        "milliliter" | "milliliters" | "millilitre" | "millilitres" | "ml" => {
            Some(Unit::Milliliters)
        }
        "piece" | "pieces" | "pc" | "pcs" => Some(Unit::Pieces),
        "whole" => Some(Unit::Whole),
        "stick" | "sticks" => Some(Unit::Sticks),
        "pinch" | "pinches" => Some(Unit::Pinch),
        "dash" | "dashes" => Some(Unit::Dash),
        _ => None,
    }
}

/// Units recipes actually use that fall outside the closed set. These map to
/// an in-set unit and the substitution is surfaced as a note.
fn alias_unit(token: &str) -> Option<Unit> {
    match token {
        "clove" | "cloves" => Some(Unit::Pieces),
        "package" | "packages" | "pkg" | "pkgs" | "packet" | "packets" => Some(Unit::Pieces),
        "can" | "cans" | "jar" | "jars" | "bottle" | "bottles" => Some(Unit::Pieces),
        "slice" | "slices" | "strip" | "strips" => Some(Unit::Pieces),
        "bunch" | "bunches" | "head" | "heads" | "stalk" | "stalks" | "sprig" | "sprigs" => {
            Some(Unit::Pieces)
        }
        "quart" | "quarts" | "qt" => Some(Unit::Liters),
        "pint" | "pints" | "pt" => Some(Unit::Milliliters),
        "gallon" | "gallons" => Some(Unit::Liters),
        _ => None,
    }
}

/// Outcome of normalizing one line: the ingredient plus an optional
/// substitution note when the written unit fell outside the closed set.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLine {
    pub ingredient: Ingredient,
    pub note: Option<String>,
}

/// Parse one free-text ingredient line.
///
/// Missing quantity defaults to 1.0, missing unit to pieces. Never fails:
/// the worst case is the whole line becoming the name.
pub fn parse_line(line: &str) -> NormalizedLine {
    let cleaned = line.trim();
    let captures = line_pattern()
        .captures(cleaned)
        .expect("pattern matches any string");

    let quantity = captures
        .name("qty")
        .map(|m| parse_quantity(m.as_str()))
        .unwrap_or(1.0);

    let rest = captures.name("rest").map(|m| m.as_str()).unwrap_or("");

    // First token of the remainder may be a unit. "of" after it is filler.
    let mut words = rest.split_whitespace();
    let first = words.next().unwrap_or("");
    let token = first
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();

    let (unit, consumed, note) = if let Some(unit) = canonical_unit(&token) {
        (unit, true, None)
    } else if let Some(unit) = alias_unit(&token) {
        let note = format!("Unit \"{}\" recorded as {}", token, unit.label());
        debug!("substituted unit {token} -> {unit}");
        (unit, true, Some(note))
    } else {
        (Unit::Pieces, false, None)
    };

    let mut name: String = if consumed {
        let remainder: Vec<&str> = words.collect();
        remainder.join(" ")
    } else {
        rest.trim().to_string()
    };
    if let Some(stripped) = name.strip_prefix("of ") {
        name = stripped.to_string();
    }
    let name = name.trim().to_string();

    NormalizedLine {
        ingredient: Ingredient {
            name: if name.is_empty() {
                cleaned.to_string()
            } else {
                name
            },
            quantity,
            unit,
        },
        note,
    }
}

/// Normalize a batch of lines, collecting substitution notes. Blank lines
/// are dropped.
pub fn normalize_lines(lines: &[String]) -> (Vec<Ingredient>, Vec<String>) {
    let mut ingredients = Vec::with_capacity(lines.len());
    let mut notes = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let normalized = parse_line(line);
        ingredients.push(normalized.ingredient);
        if let Some(note) = normalized.note {
            notes.push(note);
        }
    }
    (ingredients, notes)
}
