use std::fs;
use std::path::PathBuf;

use precivox_core::recommendation::RecommendationInput;

use crate::commands::{with_engine_suite, CommandResult};

/// Where the shopping list JSON comes from.
#[derive(Debug, Clone)]
pub enum RecommendSource {
    File(PathBuf),
    Inline(String),
}

pub fn run(source: RecommendSource) -> CommandResult {
    let input = match parse_input(&source) {
        Ok(input) => input,
        Err(message) => return CommandResult::failure("recommend", "invalid_input", message, 7),
    };

    with_engine_suite("recommend", |suite, _config| async move {
        let result = suite.grooc.recommend(input).await;
        CommandResult::envelope("recommend", &result)
    })
}

fn parse_input(source: &RecommendSource) -> Result<RecommendationInput, String> {
    let raw = match source {
        RecommendSource::File(path) => fs::read_to_string(path)
            .map_err(|error| format!("could not read `{}`: {error}", path.display()))?,
        RecommendSource::Inline(raw) => raw.clone(),
    };
    serde_json::from_str(&raw).map_err(|error| format!("invalid recommendation input: {error}"))
}

#[cfg(test)]
mod tests {
    use super::{parse_input, RecommendSource};

    #[test]
    fn inline_shopping_list_parses_with_defaults() {
        let input = parse_input(&RecommendSource::Inline(
            r#"{"products":[{"name":"Arroz"}]}"#.to_string(),
        ))
        .expect("parse");

        assert_eq!(input.products.len(), 1);
        assert_eq!(input.products[0].quantity, 1);
        assert!(input.location.is_none());
    }

    #[test]
    fn malformed_json_is_reported() {
        let error = parse_input(&RecommendSource::Inline("{".to_string())).expect_err("invalid");
        assert!(error.starts_with("invalid recommendation input"));
    }

    #[test]
    fn missing_file_is_reported() {
        let error = parse_input(&RecommendSource::File("does/not/exist.json".into()))
            .expect_err("missing");
        assert!(error.contains("does/not/exist.json"));
    }
}
