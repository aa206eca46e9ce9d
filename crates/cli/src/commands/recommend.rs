use autorec_core::config::{AppConfig, LoadOptions};
use autorec_core::errors::{InterfaceError, RecommendError};
use autorec_core::{Recommender, VehicleAttributes};
use serde_json::Value;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_INPUT, EXIT_STARTUP, EXIT_UNAVAILABLE};

const COMMAND: &str = "recommend";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecommendQuery {
    /// Collaborative query for an item the model was trained on.
    Item(String),
    /// Content-based query; raw JSON object as typed on the command line.
    Attributes(String),
}

pub fn run(query: RecommendQuery, k: Option<usize>) -> CommandResult {
    if k == Some(0) {
        return CommandResult::failure(
            COMMAND,
            "invalid_input",
            "k must be a positive integer",
            EXIT_INPUT,
        );
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(COMMAND, "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };

    let recommender = match Recommender::load(&config.artifacts, config.recommender) {
        Ok(recommender) => recommender,
        Err(error) => {
            return CommandResult::failure(COMMAND, "startup", error.to_string(), EXIT_STARTUP)
        }
    };

    let k = match recommender.resolve_k(k) {
        Ok(k) => k,
        Err(error) => return recommend_failure(error),
    };

    match query {
        RecommendQuery::Item(item_id) => run_collaborative(&recommender, &item_id, k),
        RecommendQuery::Attributes(raw) => run_content_based(&recommender, &raw, k),
    }
}

fn run_collaborative(recommender: &Recommender, item_id: &str, k: usize) -> CommandResult {
    if item_id.trim().is_empty() {
        return CommandResult::failure(
            COMMAND,
            "invalid_input",
            "item_id parameter is required",
            EXIT_INPUT,
        );
    }

    match recommender.recommend_collaborative(item_id, k) {
        Ok(Some(recommendations)) => CommandResult::recommendations(
            COMMAND,
            format!("{} collaborative recommendations for `{item_id}`", recommendations.len()),
            recommendations,
        ),
        Ok(None) => CommandResult::failure(
            COMMAND,
            "not_found",
            InterfaceError::item_not_found(item_id).message(),
            EXIT_INPUT,
        ),
        Err(error) => recommend_failure(error),
    }
}

fn run_content_based(recommender: &Recommender, raw: &str, k: usize) -> CommandResult {
    let attributes = serde_json::from_str::<Value>(raw)
        .map_err(|_| autorec_core::AttributeError::NotAnObject)
        .and_then(|value| VehicleAttributes::from_json(&value));
    let attributes = match attributes {
        Ok(attributes) => attributes,
        Err(error) => {
            return CommandResult::failure(COMMAND, "invalid_input", error.to_string(), EXIT_INPUT)
        }
    };

    match recommender.recommend_content_based(&attributes, k) {
        Ok(recommendations) => CommandResult::recommendations(
            COMMAND,
            format!(
                "{} content-based recommendations for `{}`",
                recommendations.len(),
                attributes.item_id()
            ),
            recommendations,
        ),
        Err(error) => recommend_failure(error),
    }
}

fn recommend_failure(error: RecommendError) -> CommandResult {
    match error {
        RecommendError::ContentEngineUnavailable => CommandResult::failure(
            COMMAND,
            "engine_unavailable",
            error.to_string(),
            EXIT_UNAVAILABLE,
        ),
        RecommendError::InvalidK { .. } => {
            CommandResult::failure(COMMAND, "invalid_input", error.to_string(), EXIT_INPUT)
        }
    }
}
