use autorec_core::collaborative::{CollaborativeEngine, TrainedArtifact};
use autorec_core::config::{AppConfig, LoadOptions};
use autorec_core::ContentEngine;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_auth(&config));
            checks.push(check_artifact(&config));
            checks.push(check_inventory(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["auth_readiness", "artifact_load", "inventory_load"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_auth(config: &AppConfig) -> DoctorCheck {
    let (status, details) = if !config.auth.enabled {
        (CheckStatus::Pass, "API key gate disabled".to_string())
    } else if config.auth.is_misconfigured() {
        (
            CheckStatus::Fail,
            "auth.enabled is true but no API key is set; recommendation routes would answer 500"
                .to_string(),
        )
    } else {
        (CheckStatus::Pass, "API key gate enabled with a configured key".to_string())
    };

    DoctorCheck { name: "auth_readiness", status, details }
}

fn check_artifact(config: &AppConfig) -> DoctorCheck {
    let path = &config.artifacts.model_path;
    let engine = TrainedArtifact::load(path).and_then(CollaborativeEngine::from_artifact);

    match engine {
        Ok(engine) => DoctorCheck {
            name: "artifact_load",
            status: CheckStatus::Pass,
            details: format!(
                "loaded `{}` ({} items, {} users)",
                path.display(),
                engine.item_count(),
                engine.user_count()
            ),
        },
        Err(error) => {
            DoctorCheck { name: "artifact_load", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn check_inventory(config: &AppConfig) -> DoctorCheck {
    let path = &config.artifacts.inventory_path;

    match ContentEngine::load(path, config.recommender.candidate_oversample) {
        Ok(engine) => DoctorCheck {
            name: "inventory_load",
            status: CheckStatus::Pass,
            details: format!(
                "loaded `{}` ({} rows, {} feature columns)",
                path.display(),
                engine.rows(),
                engine.columns().len()
            ),
        },
        Err(error) => DoctorCheck {
            name: "inventory_load",
            status: CheckStatus::Fail,
            details: format!("{error}; content-based recommendations would be unavailable"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
