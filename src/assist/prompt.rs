/// System prompt holding the strict output schema for recipe extraction.
///
/// Loaded from `prompt.txt` at compile time so the wording can be edited
/// without touching Rust string syntax.
pub const RECIPE_SCHEMA_PROMPT: &str = include_str!("prompt.txt");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_embedded_and_strict() {
        assert!(!RECIPE_SCHEMA_PROMPT.is_empty());
        assert!(RECIPE_SCHEMA_PROMPT.contains("ONLY a JSON object"));
        assert!(RECIPE_SCHEMA_PROMPT.contains("\"ingredients\""));
        assert!(RECIPE_SCHEMA_PROMPT.contains("\"instructions\""));
        assert!(RECIPE_SCHEMA_PROMPT.contains("Never invent"));
    }
}
