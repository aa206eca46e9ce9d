use serde::Serialize;
use tracing::{info, warn};

use crate::collaborative::{CollaborativeEngine, TrainedArtifact};
use crate::config::{ArtifactsConfig, RecommenderConfig};
use crate::content::ContentEngine;
use crate::domain::vehicle::VehicleAttributes;
use crate::errors::{ArtifactError, RecommendError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// Both paths are serving.
    Ready,
    /// The inventory could not be loaded; only the collaborative path serves.
    Degraded,
}

impl EngineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Degraded => "degraded",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecommenderSummary {
    pub status: EngineStatus,
    pub items: usize,
    pub users: usize,
    pub inventory_rows: usize,
    pub feature_columns: usize,
}

/// Both recommendation paths, built once at startup and read-only afterwards.
pub struct Recommender {
    collaborative: CollaborativeEngine,
    content: Option<ContentEngine>,
    settings: RecommenderConfig,
}

impl Recommender {
    /// A bad artifact is fatal. A bad inventory only disables the content path.
    pub fn load(
        artifacts: &ArtifactsConfig,
        settings: RecommenderConfig,
    ) -> Result<Self, ArtifactError> {
        let artifact = TrainedArtifact::load(&artifacts.model_path)?;
        let collaborative = CollaborativeEngine::from_artifact(artifact)?;

        let content = match ContentEngine::load(&artifacts.inventory_path, settings.candidate_oversample)
        {
            Ok(engine) => Some(engine),
            Err(error) => {
                warn!(
                    event_name = "recommender.content.unavailable",
                    correlation_id = "bootstrap",
                    path = %artifacts.inventory_path.display(),
                    error = %error,
                    "content-based recommendations disabled"
                );
                None
            }
        };

        let recommender = Self::new(collaborative, content, settings);
        let summary = recommender.summary();
        info!(
            event_name = "recommender.initialized",
            correlation_id = "bootstrap",
            status = summary.status.as_str(),
            items = summary.items,
            users = summary.users,
            inventory_rows = summary.inventory_rows,
            feature_columns = summary.feature_columns,
            "recommender initialized"
        );

        Ok(recommender)
    }

    pub fn new(
        collaborative: CollaborativeEngine,
        content: Option<ContentEngine>,
        settings: RecommenderConfig,
    ) -> Self {
        Self { collaborative, content, settings }
    }

    pub fn status(&self) -> EngineStatus {
        if self.content.is_some() {
            EngineStatus::Ready
        } else {
            EngineStatus::Degraded
        }
    }

    pub fn content_available(&self) -> bool {
        self.content.is_some()
    }

    pub fn summary(&self) -> RecommenderSummary {
        RecommenderSummary {
            status: self.status(),
            items: self.collaborative.item_count(),
            users: self.collaborative.user_count(),
            inventory_rows: self.content.as_ref().map_or(0, ContentEngine::rows),
            feature_columns: self.content.as_ref().map_or(0, |engine| engine.columns().len()),
        }
    }

    /// Applies the configured default and upper bound to a caller-supplied `k`.
    pub fn resolve_k(&self, requested: Option<usize>) -> Result<usize, RecommendError> {
        let k = requested.unwrap_or(self.settings.default_k);
        if k > self.settings.max_k {
            return Err(RecommendError::InvalidK { requested: k, max: self.settings.max_k });
        }
        Ok(k)
    }

    /// `Ok(None)` when the item is unknown to the trained model.
    pub fn recommend_collaborative(
        &self,
        item_id: &str,
        k: usize,
    ) -> Result<Option<Vec<String>>, RecommendError> {
        let k = self.resolve_k(Some(k))?;
        Ok(self.collaborative.recommend(item_id, k))
    }

    pub fn recommend_content_based(
        &self,
        attributes: &VehicleAttributes,
        k: usize,
    ) -> Result<Vec<String>, RecommendError> {
        let k = self.resolve_k(Some(k))?;
        let engine = self.content.as_ref().ok_or(RecommendError::ContentEngineUnavailable)?;
        Ok(engine.recommend(attributes, k))
    }
}
