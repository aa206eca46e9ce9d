use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use autorec_cli::commands::recommend::{self, RecommendQuery};
use autorec_cli::commands::{config, doctor};
use serde_json::Value;
use tempfile::TempDir;

const ARTIFACT_JSON: &str = r#"{
    "model": {"metric": "cosine"},
    "item_user_matrix": {
        "n_rows": 3,
        "n_cols": 3,
        "indptr": [0, 2, 3, 4],
        "indices": [0, 1, 0, 2],
        "data": [1.0, 1.0, 1.0, 1.0]
    },
    "item_to_row": {"2020_toyota_camry_le": 0, "2019_toyota_corolla_l": 1, "2021_honda_accord_sport": 2},
    "row_to_item": {"0": "2020_toyota_camry_le", "1": "2019_toyota_corolla_l", "2": "2021_honda_accord_sport"}
}"#;

const INVENTORY_CSV: &str = "\
YearOfMaking,Price,Horsepower,Make,Model,Trim
2020,25000,203,Toyota,Camry,LE
2019,20000,139,Toyota,Corolla,L
2021,27000,192,Honda,Accord,Sport
2022,30000,203,Toyota,RAV4,XLE
";

struct Fixture {
    _dir: TempDir,
    model_path: String,
    inventory_path: String,
}

fn fixture(with_inventory: bool) -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    let model_path = dir.path().join("artifacts.json");
    let inventory_path = dir.path().join("inventory.csv");

    fs::write(&model_path, ARTIFACT_JSON).expect("write artifact");
    if with_inventory {
        fs::write(&inventory_path, INVENTORY_CSV).expect("write inventory");
    }

    Fixture {
        model_path: path_string(&model_path),
        inventory_path: path_string(&inventory_path),
        _dir: dir,
    }
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn recommend_item_returns_neighbors() {
    let fixture = fixture(true);
    with_env(
        &[
            ("AUTOREC_ARTIFACTS_MODEL_PATH", fixture.model_path.as_str()),
            ("AUTOREC_ARTIFACTS_INVENTORY_PATH", fixture.inventory_path.as_str()),
        ],
        || {
            let result =
                recommend::run(RecommendQuery::Item("2020_toyota_camry_le".to_string()), Some(1));
            assert_eq!(result.exit_code, 0, "expected successful recommendation");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "recommend");
            assert_eq!(payload["status"], "ok");
            assert_eq!(payload["recommendations"], serde_json::json!(["2019_toyota_corolla_l"]));
        },
    );
}

#[test]
fn recommend_unknown_item_is_not_found() {
    let fixture = fixture(true);
    with_env(
        &[
            ("AUTOREC_ARTIFACTS_MODEL_PATH", fixture.model_path.as_str()),
            ("AUTOREC_ARTIFACTS_INVENTORY_PATH", fixture.inventory_path.as_str()),
        ],
        || {
            let result = recommend::run(RecommendQuery::Item("1999_lada_niva_base".to_string()), None);
            assert_eq!(result.exit_code, 4);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "not_found");
            assert_eq!(payload["message"], "Item '1999_lada_niva_base' not found in the dataset");
        },
    );
}

#[test]
fn recommend_attributes_uses_content_engine() {
    let fixture = fixture(true);
    with_env(
        &[
            ("AUTOREC_ARTIFACTS_MODEL_PATH", fixture.model_path.as_str()),
            ("AUTOREC_ARTIFACTS_INVENTORY_PATH", fixture.inventory_path.as_str()),
        ],
        || {
            let attributes =
                r#"{"YearOfMaking": 2020, "Make": "Toyota", "Model": "Camry", "Trim": "SE"}"#;
            let result = recommend::run(RecommendQuery::Attributes(attributes.to_string()), Some(2));
            assert_eq!(result.exit_code, 0, "output: {}", result.output);

            let payload = parse_payload(&result.output);
            let recommendations = payload["recommendations"].as_array().expect("array");
            assert_eq!(recommendations.len(), 2);
            assert_eq!(recommendations[0], "2020_toyota_camry_le");
        },
    );
}

#[test]
fn recommend_attributes_missing_trim_is_invalid_input() {
    let fixture = fixture(true);
    with_env(
        &[
            ("AUTOREC_ARTIFACTS_MODEL_PATH", fixture.model_path.as_str()),
            ("AUTOREC_ARTIFACTS_INVENTORY_PATH", fixture.inventory_path.as_str()),
        ],
        || {
            let attributes = r#"{"YearOfMaking": 2020, "Make": "Toyota", "Model": "Camry"}"#;
            let result = recommend::run(RecommendQuery::Attributes(attributes.to_string()), None);
            assert_eq!(result.exit_code, 4);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "invalid_input");
            assert_eq!(payload["message"], "missing required fields: Trim");
        },
    );
}

#[test]
fn recommend_attributes_without_inventory_reports_unavailable() {
    let fixture = fixture(false);
    with_env(
        &[
            ("AUTOREC_ARTIFACTS_MODEL_PATH", fixture.model_path.as_str()),
            ("AUTOREC_ARTIFACTS_INVENTORY_PATH", fixture.inventory_path.as_str()),
        ],
        || {
            let attributes =
                r#"{"YearOfMaking": 2020, "Make": "Toyota", "Model": "Camry", "Trim": "SE"}"#;
            let result = recommend::run(RecommendQuery::Attributes(attributes.to_string()), None);
            assert_eq!(result.exit_code, 5);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "engine_unavailable");
        },
    );
}

#[test]
fn recommend_rejects_k_above_limit() {
    let fixture = fixture(true);
    with_env(
        &[
            ("AUTOREC_ARTIFACTS_MODEL_PATH", fixture.model_path.as_str()),
            ("AUTOREC_ARTIFACTS_INVENTORY_PATH", fixture.inventory_path.as_str()),
            ("AUTOREC_RECOMMENDER_MAX_K", "20"),
        ],
        || {
            let result =
                recommend::run(RecommendQuery::Item("2020_toyota_camry_le".to_string()), Some(21));
            assert_eq!(result.exit_code, 4);
            assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
        },
    );
}

#[test]
fn recommend_rejects_zero_k() {
    let fixture = fixture(true);
    with_env(
        &[
            ("AUTOREC_ARTIFACTS_MODEL_PATH", fixture.model_path.as_str()),
            ("AUTOREC_ARTIFACTS_INVENTORY_PATH", fixture.inventory_path.as_str()),
        ],
        || {
            let result =
                recommend::run(RecommendQuery::Item("2020_toyota_camry_le".to_string()), Some(0));
            assert_eq!(result.exit_code, 4);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "invalid_input");
            assert_eq!(payload["message"], "k must be a positive integer");
        },
    );
}

#[test]
fn recommend_returns_startup_failure_without_artifact() {
    let fixture = fixture(true);
    with_env(
        &[
            ("AUTOREC_ARTIFACTS_MODEL_PATH", "/nonexistent/autorec/artifacts.bin"),
            ("AUTOREC_ARTIFACTS_INVENTORY_PATH", fixture.inventory_path.as_str()),
        ],
        || {
            let result =
                recommend::run(RecommendQuery::Item("2020_toyota_camry_le".to_string()), None);
            assert_eq!(result.exit_code, 3);
            assert_eq!(parse_payload(&result.output)["error_class"], "startup");
        },
    );
}

#[test]
fn recommend_returns_config_failure_for_invalid_env() {
    with_env(&[("AUTOREC_RECOMMENDER_DEFAULT_K", "zero")], || {
        let result = recommend::run(RecommendQuery::Item("2020_toyota_camry_le".to_string()), None);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_json_passes_with_artifact_and_inventory() {
    let fixture = fixture(true);
    with_env(
        &[
            ("AUTOREC_ARTIFACTS_MODEL_PATH", fixture.model_path.as_str()),
            ("AUTOREC_ARTIFACTS_INVENTORY_PATH", fixture.inventory_path.as_str()),
        ],
        || {
            let report: Value =
                serde_json::from_str(&doctor::run(true)).expect("doctor output should be JSON");

            assert_eq!(report["overall_status"], "pass");
            let names: Vec<&str> = report["checks"]
                .as_array()
                .expect("checks array")
                .iter()
                .filter_map(|check| check["name"].as_str())
                .collect();
            assert_eq!(names, vec!["config_validation", "auth_readiness", "artifact_load", "inventory_load"]);
        },
    );
}

#[test]
fn doctor_flags_missing_inventory_and_misconfigured_auth() {
    let fixture = fixture(false);
    with_env(
        &[
            ("AUTOREC_ARTIFACTS_MODEL_PATH", fixture.model_path.as_str()),
            ("AUTOREC_ARTIFACTS_INVENTORY_PATH", fixture.inventory_path.as_str()),
            ("AUTOREC_AUTH_ENABLED", "true"),
        ],
        || {
            let output = doctor::run(false);

            assert!(output.starts_with("doctor: one or more readiness checks failed"));
            assert!(output.contains("- [ok] artifact_load"));
            assert!(output.contains("- [fail] inventory_load"));
            assert!(output.contains("- [fail] auth_readiness"));
        },
    );
}

#[test]
fn doctor_skips_checks_when_config_fails() {
    with_env(&[("AUTOREC_SERVER_PORT", "not-a-port")], || {
        let report: Value =
            serde_json::from_str(&doctor::run(true)).expect("doctor output should be JSON");

        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][0]["status"], "fail");
        assert_eq!(report["checks"][1]["status"], "skipped");
        assert_eq!(report["checks"][3]["status"], "skipped");
    });
}

#[test]
fn config_output_attributes_sources_and_redacts_key() {
    with_env(
        &[("AUTOREC_RECOMMENDER_MAX_K", "50"), ("API_KEY", "super-secret-value")],
        || {
            let output = config::run();

            assert!(output.contains("- recommender.max_k = 50 (source: env (AUTOREC_RECOMMENDER_MAX_K))"));
            assert!(output.contains("- recommender.default_k = 10 (source: default)"));
            assert!(output.contains("- auth.api_key = <redacted> (source: env (API_KEY))"));
            assert!(!output.contains("super-secret-value"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "AUTOREC_ARTIFACTS_MODEL_PATH",
        "AUTOREC_ARTIFACTS_INVENTORY_PATH",
        "AUTOREC_RECOMMENDER_DEFAULT_K",
        "AUTOREC_RECOMMENDER_MAX_K",
        "AUTOREC_RECOMMENDER_CANDIDATE_OVERSAMPLE",
        "AUTOREC_SERVER_BIND_ADDRESS",
        "AUTOREC_SERVER_PORT",
        "AUTOREC_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "AUTOREC_AUTH_ENABLED",
        "AUTOREC_AUTH_API_KEY",
        "API_KEY",
        "AUTOREC_LOGGING_LEVEL",
        "AUTOREC_LOGGING_FORMAT",
        "AUTOREC_LOG_LEVEL",
        "AUTOREC_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
