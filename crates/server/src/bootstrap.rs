use std::sync::Arc;

use autorec_core::config::AppConfig;
use autorec_core::errors::ArtifactError;
use autorec_core::Recommender;
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub recommender: Arc<Recommender>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("recommender initialization failed: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("recommender initialization task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        model_path = %config.artifacts.model_path.display(),
        inventory_path = %config.artifacts.inventory_path.display(),
        "starting application bootstrap"
    );

    if config.auth.is_misconfigured() {
        warn!(
            event_name = "system.bootstrap.auth_misconfigured",
            correlation_id = "bootstrap",
            "auth is enabled but no API key is set; gated routes will answer 500"
        );
    }

    let artifacts = config.artifacts.clone();
    let settings = config.recommender;
    let recommender =
        tokio::task::spawn_blocking(move || Recommender::load(&artifacts, settings)).await??;

    info!(
        event_name = "system.bootstrap.recommender_ready",
        correlation_id = "bootstrap",
        status = recommender.status().as_str(),
        "recommender initialized"
    );

    Ok(Application { config, recommender: Arc::new(recommender) })
}
