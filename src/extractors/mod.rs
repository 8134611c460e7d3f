//! Extraction tiers, tried in priority order by the orchestrator.
//!
//! Every tier has the same contract: given the page HTML and its URL,
//! return a draft or nothing. Parse and shape failures are `None`, never
//! errors; a failing tier simply promotes the page to the next one.

use crate::model::RecipeDraft;
use html_escape::decode_html_entities;

mod assisted;
mod html_class;
mod structured;

pub use self::assisted::{build_excerpt, AssistedExtractor};
pub use self::html_class::HeuristicHtmlExtractor;
pub use self::structured::StructuredDataExtractor;

/// A synchronous extraction tier working on already-fetched HTML.
pub trait TierExtractor {
    fn name(&self) -> &'static str;
    fn extract(&self, html: &str, url: &str) -> Option<RecipeDraft>;
}

/// Decode HTML entities and collapse whitespace runs. Entities are decoded
/// twice because pages routinely double-encode (`&amp;amp;`).
pub(crate) fn clean_text(text: &str) -> String {
    let decoded = decode_html_entities(&decode_html_entities(text)).into_owned();
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a duration into whole minutes from either ISO-8601 (`PT1H30M`) or
/// free text (`1 hour 30 minutes`, `45 min`, `90`).
pub(crate) fn parse_duration_minutes(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('P') || trimmed.starts_with('p') {
        return parse_iso8601_minutes(trimmed);
    }
    parse_spelled_minutes(trimmed)
}

/// Minimal ISO-8601 duration scan covering the shapes recipe markup uses:
/// `PT20M`, `PT1H30M`, `PT1H`, `P0DT1H10M`. Days and seconds are folded in;
/// seconds round down.
fn parse_iso8601_minutes(text: &str) -> Option<u32> {
    let upper = text.to_uppercase();
    let mut minutes: u64 = 0;
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;

    for c in upper.chars().skip(1) {
        match c {
            'T' => in_time = true,
            '0'..='9' => number.push(c),
            '.' | ',' => number.push('.'),
            'D' if !in_time => {
                minutes += number.parse::<f64>().ok()? as u64 * 24 * 60;
                number.clear();
                saw_component = true;
            }
            'H' => {
                minutes += (number.parse::<f64>().ok()? * 60.0) as u64;
                number.clear();
                saw_component = true;
            }
            'M' if in_time => {
                minutes += number.parse::<f64>().ok()? as u64;
                number.clear();
                saw_component = true;
            }
            'M' => {
                // Months in a recipe duration are nonsense; bail out.
                return None;
            }
            'S' => {
                number.clear();
                saw_component = true;
            }
            'W' | 'Y' => return None,
            _ => return None,
        }
    }

    if !saw_component {
        return None;
    }
    Some(minutes.min(u32::MAX as u64) as u32)
}

fn parse_spelled_minutes(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    let mut total: u64 = 0;
    let mut found = false;

    let mut number = String::new();
    let mut pending: Option<u64> = None;
    for token in lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        if token.chars().all(|c| c.is_ascii_digit()) {
            // Two numbers in a row: the first had no unit, drop it.
            number = token.to_string();
            pending = number.parse().ok();
        } else if let Some(value) = pending.take() {
            if token.starts_with("hour") || token.starts_with("hr") || token == "h" {
                total += value * 60;
                found = true;
            } else if token.starts_with("min") || token == "m" {
                total += value;
                found = true;
            } else if token.starts_with("sec") || token == "s" {
                found = true;
            } else {
                // Unit we don't recognize; keep the number in case a real
                // unit follows ("15 whole minutes" won't, but "1 1/2 hours"
                // style noise is common).
                pending = Some(value);
            }
        }
    }

    if found {
        return Some(total.min(u32::MAX as u64) as u32);
    }
    // A bare number reads as minutes.
    number.parse::<u32>().ok().filter(|_| !number.is_empty())
}

/// First integer appearing in a yield value ("Serves 4 to 6" -> 4).
pub(crate) fn first_integer(text: &str) -> Option<u32> {
    let mut digits = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if !digits.is_empty() {
            break;
        }
    }
    digits.parse().ok()
}

/// When only a total time is known, split it 1:2 between prep and cook.
pub(crate) fn split_total_time(total: u32) -> (u32, u32) {
    let prep = total / 3;
    (prep, total - prep)
}
