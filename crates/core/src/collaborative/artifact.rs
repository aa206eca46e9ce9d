use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::index::DistanceMetric;
use super::sparse::CsrMatrix;
use crate::errors::ArtifactError;

/// Parameters the nearest-neighbor model was fitted with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NearestNeighborsModel {
    #[serde(default)]
    pub metric: DistanceMetric,
}

/// Output of the offline training pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainedArtifact {
    pub model: NearestNeighborsModel,
    pub item_user_matrix: CsrMatrix,
    pub item_to_row: HashMap<String, usize>,
    pub row_to_item: HashMap<usize, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Bincode,
}

impl ArtifactFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some(extension) if extension.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Bincode,
        }
    }
}

impl TrainedArtifact {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.to_path_buf()));
        }

        let bytes = fs::read(path)
            .map_err(|source| ArtifactError::Read { path: path.to_path_buf(), source })?;
        let artifact = Self::decode(&bytes, ArtifactFormat::from_path(path)).map_err(|message| {
            ArtifactError::Decode { path: path.to_path_buf(), message }
        })?;
        artifact.validate()?;

        info!(
            event_name = "recommender.artifact.loaded",
            correlation_id = "bootstrap",
            path = %path.display(),
            items = artifact.item_user_matrix.n_rows,
            users = artifact.item_user_matrix.n_cols,
            interactions = artifact.item_user_matrix.nnz(),
            metric = ?artifact.model.metric,
            "trained artifact loaded"
        );

        Ok(artifact)
    }

    pub fn decode(bytes: &[u8], format: ArtifactFormat) -> Result<Self, String> {
        match format {
            ArtifactFormat::Json => serde_json::from_slice(bytes).map_err(|error| error.to_string()),
            ArtifactFormat::Bincode => bincode::deserialize(bytes).map_err(|error| error.to_string()),
        }
    }

    pub fn encode(&self, format: ArtifactFormat) -> Result<Vec<u8>, String> {
        match format {
            ArtifactFormat::Json => serde_json::to_vec(self).map_err(|error| error.to_string()),
            ArtifactFormat::Bincode => bincode::serialize(self).map_err(|error| error.to_string()),
        }
    }

    /// Every matrix row must have exactly one forward and one inverse entry,
    /// and both mappings must agree.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        self.item_user_matrix.validate().map_err(ArtifactError::Invalid)?;

        let n_rows = self.item_user_matrix.n_rows;
        if self.item_to_row.len() != n_rows || self.row_to_item.len() != n_rows {
            return Err(ArtifactError::Invalid(format!(
                "matrix has {n_rows} rows but mappings have {} forward and {} inverse entries",
                self.item_to_row.len(),
                self.row_to_item.len()
            )));
        }

        for (item_id, &row) in &self.item_to_row {
            if row >= n_rows {
                return Err(ArtifactError::Invalid(format!(
                    "item `{item_id}` maps to row {row} outside the matrix"
                )));
            }
            if self.row_to_item.get(&row) != Some(item_id) {
                return Err(ArtifactError::Invalid(format!(
                    "item `{item_id}` maps to row {row} but row {row} does not map back"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::fs;

    use tempfile::TempDir;

    use super::{ArtifactFormat, NearestNeighborsModel, TrainedArtifact};
    use crate::collaborative::index::DistanceMetric;
    use crate::collaborative::sparse::CsrMatrix;
    use crate::errors::ArtifactError;

    pub(crate) fn artifact_fixture(ids: &[&str], rows: &[Vec<f32>]) -> TrainedArtifact {
        let item_to_row: HashMap<String, usize> =
            ids.iter().enumerate().map(|(row, id)| ((*id).to_owned(), row)).collect();
        let row_to_item: HashMap<usize, String> =
            ids.iter().enumerate().map(|(row, id)| (row, (*id).to_owned())).collect();

        TrainedArtifact {
            model: NearestNeighborsModel { metric: DistanceMetric::Cosine },
            item_user_matrix: CsrMatrix::from_dense(rows),
            item_to_row,
            row_to_item,
        }
    }

    #[test]
    fn json_and_bincode_files_load_the_same_artifact() {
        let artifact = artifact_fixture(
            &["2020_honda_civic_ex", "2021_toyota_corolla_le"],
            &[vec![1.0, 0.0, 3.0], vec![0.0, 2.0, 1.0]],
        );
        let dir = TempDir::new().expect("temp dir");

        let json_path = dir.path().join("artifacts.json");
        let bin_path = dir.path().join("artifacts.bin");
        fs::write(&json_path, artifact.encode(ArtifactFormat::Json).expect("json"))
            .expect("write json");
        fs::write(&bin_path, artifact.encode(ArtifactFormat::Bincode).expect("bincode"))
            .expect("write bincode");

        assert_eq!(TrainedArtifact::load(&json_path).expect("json load"), artifact);
        assert_eq!(TrainedArtifact::load(&bin_path).expect("bincode load"), artifact);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().expect("temp dir");
        let error = TrainedArtifact::load(&dir.path().join("absent.bin"))
            .expect_err("missing artifact must fail");

        assert!(matches!(error, ArtifactError::NotFound(_)));
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("artifacts.json");
        fs::write(&path, b"{ not json").expect("write");

        let error = TrainedArtifact::load(&path).expect_err("corrupt artifact must fail");
        assert!(matches!(error, ArtifactError::Decode { .. }));
    }

    #[test]
    fn disagreeing_mappings_are_rejected() {
        let mut artifact = artifact_fixture(&["a", "b"], &[vec![1.0], vec![2.0]]);
        artifact.row_to_item.insert(1, "c".to_owned());

        assert!(matches!(artifact.validate(), Err(ArtifactError::Invalid(_))));
    }

    #[test]
    fn unmapped_rows_are_rejected() {
        let mut artifact = artifact_fixture(&["a", "b"], &[vec![1.0], vec![2.0]]);
        artifact.item_to_row.remove("b");

        let error = artifact.validate().expect_err("unmapped row must fail");
        assert!(error.to_string().contains("2 rows"));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            ArtifactFormat::from_path(std::path::Path::new("model.JSON")),
            ArtifactFormat::Json
        );
        assert_eq!(
            ArtifactFormat::from_path(std::path::Path::new("model.pkl")),
            ArtifactFormat::Bincode
        );
    }
}
